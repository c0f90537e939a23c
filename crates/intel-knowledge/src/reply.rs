//! `FT.SEARCH` reply parsing. RediSearch replies with a flat array:
//! `[total, doc_id, [field, value, field, value, ...], doc_id, [...], ...]`.

use std::collections::HashMap;

fn value_to_bytes(value: &redis::Value) -> Vec<u8> {
    match value {
        redis::Value::BulkString(bytes) => bytes.clone(),
        redis::Value::SimpleString(s) => s.clone().into_bytes(),
        redis::Value::Int(n) => n.to_string().into_bytes(),
        redis::Value::Double(d) => d.to_string().into_bytes(),
        _ => Vec::new(),
    }
}

fn value_to_field_map(value: &redis::Value) -> HashMap<String, Vec<u8>> {
    let redis::Value::Array(entries) = value else {
        return HashMap::new();
    };
    entries
        .chunks_exact(2)
        .map(|pair| {
            let key = String::from_utf8_lossy(&value_to_bytes(&pair[0])).into_owned();
            (key, value_to_bytes(&pair[1]))
        })
        .collect()
}

/// Parses an `FT.SEARCH` reply into `(doc_id, field_map)` pairs, skipping the
/// leading total-results count. Any reply shape RediSearch wouldn't send
/// (e.g. a connection error already mapped elsewhere) yields an empty list.
pub(crate) fn parse_search_reply(value: redis::Value) -> Vec<(String, HashMap<String, Vec<u8>>)> {
    let redis::Value::Array(items) = value else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut i = 1;
    while i + 1 < items.len() {
        let id = String::from_utf8_lossy(&value_to_bytes(&items[i])).into_owned();
        let fields = value_to_field_map(&items[i + 1]);
        out.push((id, fields));
        i += 2;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::Value;

    #[test]
    fn parses_total_then_id_field_pairs() {
        let reply = Value::Array(vec![
            Value::Int(1),
            Value::BulkString(b"intel:knowledge:abc".to_vec()),
            Value::Array(vec![
                Value::BulkString(b"merged_text".to_vec()),
                Value::BulkString(b"hello world".to_vec()),
            ]),
        ]);
        let docs = parse_search_reply(reply);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, "intel:knowledge:abc");
        assert_eq!(docs[0].1.get("merged_text").unwrap(), b"hello world");
    }

    #[test]
    fn non_array_reply_yields_empty() {
        assert!(parse_search_reply(Value::Nil).is_empty());
    }
}
