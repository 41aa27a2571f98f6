//! Cache key definitions.

use serde_json::Value;
use std::fmt;

/// Identifies one cache entry: an endpoint plus its serialized arguments.
///
/// Arguments are rendered as canonical JSON (object keys sorted at every
/// depth), so `{"a":1,"b":2}` and `{"b":2,"a":1}` share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    endpoint: &'static str,
    args: String,
}

impl QueryKey {
    pub fn new(endpoint: &'static str, args: &Value) -> Self {
        let mut rendered = String::new();
        write_canonical(args, &mut rendered);
        Self {
            endpoint,
            args: rendered,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    pub fn args(&self) -> &str {
        &self.args
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.endpoint, self.args)
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(inner) = map.get(key) {
                    write_canonical(inner, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_ignores_object_key_order() {
        let a = QueryKey::new("getAccounts", &json!({ "page": 1, "search": "acme", "filter": { "x": 1, "y": [2, 3] } }));
        let b = QueryKey::new("getAccounts", &json!({ "filter": { "y": [2, 3], "x": 1 }, "search": "acme", "page": 1 }));
        assert_eq!(a, b);
        assert_eq!(a.args(), r#"{"filter":{"x":1,"y":[2,3]},"page":1,"search":"acme"}"#);
    }

    #[test]
    fn key_distinguishes_endpoints_and_args() {
        let args = json!("a1");
        assert_ne!(QueryKey::new("getAccount", &args), QueryKey::new("getAccountMetrics", &args));
        assert_ne!(QueryKey::new("getAccount", &json!("a1")), QueryKey::new("getAccount", &json!("a2")));
        assert_eq!(QueryKey::new("getAccount", &args).to_string(), r#"getAccount("a1")"#);
    }
}
