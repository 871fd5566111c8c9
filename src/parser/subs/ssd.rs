use log::debug;
use serde_json::{Map, Value};

use crate::models::SubscriptionResult;
use crate::parser::error::{ParseError, ParseResult};
use crate::parser::explodes::ss;
use crate::parser::fields::FieldMap;
use crate::parser::registry::Registry;
use crate::utils::base64::try_base64_decode;

/// Top-level keys a server inherits when it leaves them out
const INHERITED: &[&str] = &["port", "encryption", "password", "plugin", "plugin_options"];

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// Decodes an `ssd://` subscription: url-safe base64 of a JSON document whose
/// `servers` (array or map) inherit the airport-wide defaults
pub fn explode_ssd(content: &str, registry: &Registry) -> ParseResult<SubscriptionResult> {
    let payload = content.trim().strip_prefix("ssd://").ok_or(ParseError::Malformed("ssd"))?;
    let text = try_base64_decode(payload).ok_or(ParseError::InvalidBase64)?;
    let root = match serde_json::from_str::<Value>(&text)? {
        Value::Object(map) => map,
        _ => return Err(ParseError::Malformed("ssd")),
    };

    let servers: Vec<&Value> = match root.get("servers") {
        Some(Value::Array(list)) => list.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        _ => return Err(ParseError::MissingField("servers".to_string())),
    };
    let airport = root.get("airport").cloned().unwrap_or(Value::Null);

    let mut proxies = Vec::new();
    for server in servers {
        let Some(entry) = server.as_object() else {
            continue;
        };
        let mut merged: Map<String, Value> = entry.clone();
        for key in INHERITED {
            if is_blank(merged.get(*key)) {
                if let Some(default) = root.get(*key) {
                    merged.insert(key.to_string(), default.clone());
                }
            }
        }
        merged.insert("airport".to_string(), airport.clone());

        match ss::from_json(&FieldMap::new(&merged)) {
            Ok(proxy) => proxies.push(registry.validate(proxy).proxy),
            Err(err) => debug!("skip ssd server: {}", err),
        }
    }
    Ok(SubscriptionResult::from_proxies(proxies))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProxyKind;
    use crate::parser::registry::default_registry;
    use crate::utils::base64::url_safe_base64_encode;

    #[test]
    fn test_servers_inherit_defaults() {
        let doc = r#"{
            "airport": "Sky", "port": 8388, "encryption": "aes-128-gcm", "password": "shared",
            "servers": [
                {"server": "a.example.com", "remarks": "A"},
                {"server": "b.example.com", "port": 9000, "password": "own", "remarks": "B"}
            ]
        }"#;
        let content = format!("ssd://{}", url_safe_base64_encode(doc));
        let result = explode_ssd(&content, default_registry()).unwrap();
        assert_eq!(result.proxies.len(), 2);

        let a = &result.proxies[0];
        assert_eq!((a.remark.as_str(), a.port, a.group.as_str()), ("A", 8388, "Sky"));
        let b = &result.proxies[1];
        assert_eq!(b.port, 9000);
        match &b.kind {
            ProxyKind::Shadowsocks(info) => {
                assert_eq!(info.password, "own");
                assert_eq!(info.method, "aes-128-gcm");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bad_payload() {
        assert_eq!(explode_ssd("ssd://@@@", default_registry()), Err(ParseError::InvalidBase64));
    }
}
