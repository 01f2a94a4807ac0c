use std::fmt;

use serde::de;
use serde::Deserializer;
use serde_json::Value;

use crate::structs::Link;

/// Accepts `_links` as either `[{"rel": .., "href": ..}]` or `{"<rel>": {"href": ..}}`.
pub fn deserialize_links<'d, D>(deserializer: D) -> Result<Vec<Link>, D::Error>
where
    D: Deserializer<'d>,
{
    struct V;
    impl<'d> de::Visitor<'d> for V {
        type Value = Vec<Link>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(formatter, "an array of links or a map of relation to link")
        }

        fn visit_unit<E>(self) -> Result<Vec<Link>, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Vec<Link>, A::Error>
        where
            A: de::SeqAccess<'d>,
        {
            let mut links = Vec::new();
            while let Some(value) = seq.next_element::<Value>()? {
                let rel = value.get("rel").and_then(Value::as_str);
                let href = value.get("href").and_then(Value::as_str);
                if let (Some(rel), Some(href)) = (rel, href) {
                    links.push(Link { rel: rel.to_string(), href: href.to_string() });
                }
            }
            Ok(links)
        }

        fn visit_map<A>(self, mut map: A) -> Result<Vec<Link>, A::Error>
        where
            A: de::MapAccess<'d>,
        {
            let mut links = Vec::new();
            while let Some((rel, value)) = map.next_entry::<String, Value>()? {
                let href = match &value {
                    Value::String(href) => Some(href.as_str()),
                    Value::Object(_) => value.get("href").and_then(Value::as_str),
                    _ => None,
                };
                if let Some(href) = href {
                    links.push(Link { rel, href: href.to_string() });
                }
            }
            Ok(links)
        }
    }
    deserializer.deserialize_any(V)
}

/// Renders scalars as text: strings as-is, numbers and booleans via `to_string`.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(values) => {
            let parts: Vec<String> = values.iter().filter_map(value_to_string).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        _ => None,
    }
}

/// Like [`value_to_string`] but treats empty and whitespace-only text as absent.
pub fn value_to_text(value: &Value) -> Option<String> {
    value_to_string(value).filter(|s| !s.trim().is_empty())
}

pub fn value_to_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_i64().map(|i| i.max(0) as u64))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
