//! Uniform access to parsed key/value sources.
//!
//! Clash YAML maps and vendor JSON objects both arrive as a
//! `serde_json::Map`; YAML is converted on the way in. Surge proxy lines are
//! split into positional and `key=value` parts by [`SurgeLine`].

use linked_hash_map::LinkedHashMap;
use serde_json::{Map, Value};

use super::error::{parse_port, ParseError, ParseResult};

/// Read-only view over a JSON object with lenient scalar coercion
#[derive(Debug, Clone, Copy)]
pub struct FieldMap<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> FieldMap<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        FieldMap { map }
    }

    pub fn from_value(value: &'a Value) -> Option<Self> {
        value.as_object().map(FieldMap::new)
    }

    pub fn inner(&self) -> &'a Map<String, Value> {
        self.map
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Scalar value as a string; numbers and booleans are stringified, anything else is empty
    pub fn str(&self, key: &str) -> String {
        self.map.get(key).map(value_to_string).unwrap_or_default()
    }

    /// First non-empty value among `keys`
    pub fn first(&self, keys: &[&str]) -> String {
        keys.iter()
            .map(|k| self.str(k))
            .find(|v| !v.is_empty())
            .unwrap_or_default()
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.map.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(n.as_i64().unwrap_or(0) != 0),
            Value::String(s) => crate::utils::string::parse_bool(s),
            _ => None,
        }
    }

    pub fn u32(&self, key: &str) -> u32 {
        self.str(key).trim().parse().unwrap_or(0)
    }

    pub fn port(&self, key: &str) -> ParseResult<u16> {
        parse_port(&self.str(key))
    }

    pub fn obj(&self, key: &str) -> Option<FieldMap<'a>> {
        self.map.get(key).and_then(FieldMap::from_value)
    }

    /// A list written either as an array or as a comma-separated string
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.map.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .map(value_to_string)
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Nested string map such as `plugin-opts`
    pub fn string_map(&self, key: &str) -> LinkedHashMap<String, String> {
        let mut out = LinkedHashMap::new();
        if let Some(obj) = self.map.get(key).and_then(Value::as_object) {
            for (k, v) in obj {
                out.insert(k.clone(), value_to_string(v));
            }
        }
        out
    }
}

pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Converts a YAML value into the JSON model used by [`FieldMap`]
pub fn yaml_to_json(value: &serde_yaml::Value) -> ParseResult<Value> {
    serde_json::to_value(value).map_err(|e| ParseError::Yaml(e.to_string()))
}

/// A Surge-style proxy line: `type, server, port, key=value, ...`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurgeLine {
    pub kind: String,
    /// Bare values after the type token, in order
    pub positional: Vec<String>,
    pub args: LinkedHashMap<String, String>,
}

impl SurgeLine {
    pub fn parse(value: &str) -> ParseResult<SurgeLine> {
        let mut parts = value.split(',').map(str::trim);
        let kind = parts
            .next()
            .filter(|k| !k.is_empty())
            .ok_or(ParseError::Malformed("surge"))?
            .to_ascii_lowercase();

        let mut line = SurgeLine {
            kind,
            ..Default::default()
        };
        for part in parts {
            if part.is_empty() {
                continue;
            }
            match part.split_once('=') {
                Some((k, v)) => {
                    line.args
                        .insert(k.trim().to_ascii_lowercase(), crate::utils::string::trim_of(v, '"').to_string());
                }
                None => line.positional.push(part.to_string()),
            }
        }
        Ok(line)
    }

    pub fn arg(&self, key: &str) -> String {
        self.args.get(key).cloned().unwrap_or_default()
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.args.get(key).and_then(|v| crate::utils::string::parse_bool(v))
    }

    /// Server and port from the first two positional values
    pub fn endpoint(&self) -> ParseResult<(String, u16)> {
        let server = self.positional.first().ok_or(ParseError::Malformed("surge"))?;
        let port = self.positional.get(1).ok_or(ParseError::Malformed("surge"))?;
        let server = super::error::require_server(server)?;
        Ok((server.to_string(), parse_port(port)?))
    }

    pub fn positional(&self, idx: usize) -> String {
        self.positional.get(idx).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_map_coercion() {
        let value = json!({"port": 443, "tls": "true", "alpn": "h2,http/1.1", "name": "n"});
        let fields = FieldMap::from_value(&value).unwrap();
        assert_eq!(fields.str("port"), "443");
        assert_eq!(fields.port("port"), Ok(443));
        assert_eq!(fields.bool("tls"), Some(true));
        assert_eq!(fields.list("alpn"), vec!["h2", "http/1.1"]);
        assert_eq!(fields.first(&["servername", "name"]), "n");
        assert_eq!(fields.str("missing"), "");
    }

    #[test]
    fn test_surge_line() {
        let line = SurgeLine::parse("ss, 1.2.3.4, 8388, encrypt-method=aes-128-gcm, password=\"pw\"").unwrap();
        assert_eq!(line.kind, "ss");
        assert_eq!(line.endpoint().unwrap(), ("1.2.3.4".to_string(), 8388));
        assert_eq!(line.arg("encrypt-method"), "aes-128-gcm");
        assert_eq!(line.arg("password"), "pw");
    }
}
