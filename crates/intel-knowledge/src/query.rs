//! FT.SEARCH query string construction (§4.9 `search_keyword`/`search_semantic`).

/// `text` plus `@tags:{<tag>}` per tag, AND semantics via RediSearch's
/// default space-separated clause conjunction.
pub(crate) fn keyword_query(text: &str, tags: &[String]) -> String {
    let mut query = text.to_string();
    for tag in tags {
        query.push_str(&format!(" @tags:{{{tag}}}"));
    }
    query
}

/// `*=>[KNN <limit> @embedding_vector $vec AS score]` (§4.9 `search_semantic`).
pub(crate) fn knn_query(limit: u32) -> String {
    format!("*=>[KNN {limit} @embedding_vector $vec AS score]")
}
