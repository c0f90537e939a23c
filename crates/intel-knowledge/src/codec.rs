//! Binary vector codec and hash-field mapping for [`crate::KnowledgeRecord`]
//! (§4.9 step 3: "embedding_vector (binary: IEEE-754 32-bit LE)").

use crate::record::KnowledgeRecord;

pub(crate) fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub(crate) fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().expect("chunks_exact(4) yields 4 bytes")))
        .collect()
}

/// Flattens a record into the `(field, value)` pairs an `HSET` stores it as.
pub(crate) fn to_hash_fields(record: &KnowledgeRecord) -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("query_id", record.query_id.clone().into_bytes()),
        ("correlation_id", record.correlation_id.clone().into_bytes()),
        ("merged_text", record.merged_text.clone().into_bytes()),
        ("embedding_vector", encode_vector(&record.embedding_vector)),
        ("source_names", record.source_names.join(",").into_bytes()),
        ("depth_used", record.depth_used.clone().into_bytes()),
        ("total_cost_usd", format!("{:.6}", record.total_cost_usd).into_bytes()),
        ("tags", record.tags.join(",").into_bytes()),
        (
            "metadata",
            serde_json::to_string(&record.metadata).unwrap_or_else(|_| "{}".to_string()).into_bytes(),
        ),
        ("created_at", record.created_at.clone().into_bytes()),
    ]
}

/// Rebuilds a [`KnowledgeRecord`] from the raw `HGETALL`-style field map an
/// `FT.SEARCH` reply carries per document. `id` comes from the key, not a
/// field. `include_embedding` is false for search results (§4.9).
pub(crate) fn from_hash_fields(
    id: &str,
    fields: &std::collections::HashMap<String, Vec<u8>>,
    include_embedding: bool,
) -> KnowledgeRecord {
    let text_field = |name: &str| -> String {
        fields
            .get(name)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    };

    let csv_field = |name: &str| -> Vec<String> {
        let raw = text_field(name);
        if raw.is_empty() {
            Vec::new()
        } else {
            raw.split(',').map(str::to_string).collect()
        }
    };

    let embedding_vector = if include_embedding {
        fields
            .get("embedding_vector")
            .map(|bytes| decode_vector(bytes))
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    KnowledgeRecord {
        id: id.to_string(),
        query_id: text_field("query_id"),
        correlation_id: text_field("correlation_id"),
        merged_text: text_field("merged_text"),
        embedding_vector,
        source_names: csv_field("source_names"),
        depth_used: text_field("depth_used"),
        total_cost_usd: text_field("total_cost_usd").parse().unwrap_or(0.0),
        tags: csv_field("tags"),
        metadata: serde_json::from_str(&text_field("metadata")).unwrap_or(serde_json::Value::Null),
        created_at: text_field("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_roundtrips_through_bytes() {
        let original = vec![0.1_f32, -2.5, 768.0, 0.0];
        let bytes = encode_vector(&original);
        assert_eq!(bytes.len(), original.len() * 4);
        let decoded = decode_vector(&bytes);
        assert_eq!(decoded, original);
    }

    #[test]
    fn hash_fields_roundtrip_record() {
        let record = KnowledgeRecord::new(
            "q1",
            "req-abc",
            "merged text",
            vec![1.0, 2.0, 3.0],
            vec!["exa".to_string(), "tavily".to_string()],
            "standard",
            0.0105,
            vec!["crypto".to_string()],
            serde_json::json!({"k": "v"}),
        );

        let fields: std::collections::HashMap<String, Vec<u8>> = to_hash_fields(&record)
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let restored = from_hash_fields(&record.id, &fields, true);
        assert_eq!(restored.merged_text, "merged text");
        assert_eq!(restored.source_names, vec!["exa", "tavily"]);
        assert_eq!(restored.embedding_vector, vec![1.0, 2.0, 3.0]);
        assert!((restored.total_cost_usd - 0.0105).abs() < 1e-9);
        assert_eq!(restored.tags, vec!["crypto"]);
    }

    #[test]
    fn embedding_is_empty_when_excluded() {
        let record = KnowledgeRecord::new(
            "q1",
            "req-abc",
            "merged text",
            vec![1.0, 2.0],
            vec!["exa".to_string()],
            "standard",
            0.001,
            vec![],
            serde_json::json!({}),
        );
        let fields: std::collections::HashMap<String, Vec<u8>> = to_hash_fields(&record)
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let restored = from_hash_fields(&record.id, &fields, false);
        assert!(restored.embedding_vector.is_empty());
    }
}
