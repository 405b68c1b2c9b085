use serde_json::{Map, Value};

const VERBATIM_KEY: &str = "query_params";

/// Rewrite every object key in `value` to snake_case, recursively.
///
/// Total over any JSON value and idempotent: keys that are already snake_case are
/// kept as-is and win over a converted key that collides with them.
///
/// Objects under a `query_params` key are left untouched: those names are echoed
/// back to the platform on the next fetch.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(normalize_object(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

fn normalize_object(map: Map<String, Value>) -> Map<String, Value> {
    let mut normalized = Map::with_capacity(map.len());
    let mut converted = Vec::new();
    for (key, value) in map {
        let snake = to_snake_case(&key);
        if snake == key {
            let value = normalize_child(&key, value);
            normalized.insert(key, value);
        } else {
            converted.push((snake, value));
        }
    }
    for (key, value) in converted {
        if !normalized.contains_key(&key) {
            let value = normalize_child(&key, value);
            normalized.insert(key, value);
        }
    }
    normalized
}

fn normalize_child(key: &str, value: Value) -> Value {
    if key == VERBATIM_KEY {
        value
    } else {
        normalize_keys(value)
    }
}

/// `blogName` -> `blog_name`, `HTMLBody` -> `html_body`, `id_string` unchanged.
pub fn to_snake_case(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    for (idx, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let prev = idx.checked_sub(1).map(|i| chars[i]);
            let next = chars.get(idx + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
