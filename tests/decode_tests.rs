use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use subcodec::generator::proxy_to_link;
use subcodec::models::{ExtraSettings, ProxyKind, ProxyType};
use subcodec::parser::{default_registry, detect_format, explode_conf_content, SubFormat};

#[test]
fn test_ss_link_round_trip() {
    let registry = default_registry();
    let link = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:8388#Test";
    let first = registry.decode_link(link).unwrap().into_proxy();
    assert_eq!(first.proxy_type, ProxyType::Shadowsocks);
    assert_eq!(first.remark, "Test");

    let encoded = proxy_to_link(&first, &ExtraSettings::default()).unwrap();
    let second = registry.decode_link(&encoded).unwrap().into_proxy();
    assert_eq!(second.proxy_type, ProxyType::Shadowsocks);
    assert_eq!(second.hostname, "example.com");
    assert_eq!(second.port, 8388);
    match (&first.kind, &second.kind) {
        (ProxyKind::Shadowsocks(a), ProxyKind::Shadowsocks(b)) => {
            assert_eq!(a.method, "aes-256-gcm");
            assert_eq!(a.method, b.method);
            assert_eq!(a.password, b.password);
        }
        other => panic!("unexpected kinds {:?}", other),
    }
}

#[test]
fn test_plain_ssr_downgrades_to_ss() {
    let body = format!("example.com:8388:origin:aes-256-gcm:plain:{}", STANDARD.encode("password"));
    let link = format!("ssr://{}", STANDARD.encode(body));
    let proxy = default_registry().decode_link(&link).unwrap().into_proxy();
    assert_eq!(proxy.proxy_type, ProxyType::Shadowsocks);
    match proxy.kind {
        ProxyKind::Shadowsocks(info) => {
            assert_eq!(info.method, "aes-256-gcm");
            assert_eq!(info.password, "password");
        }
        other => panic!("expected shadowsocks, got {:?}", other),
    }
}

#[test]
fn test_version_key_wins_over_clash_signature() {
    let doc = r#"{"version": 1, "note": "proxies: []", "configs": []}"#;
    assert_eq!(detect_format(doc), SubFormat::SsJson);
    assert_eq!(detect_format("proxies:\n  - {name: a, type: ss}\n"), SubFormat::Clash);
}

#[test]
fn test_malformed_line_is_skipped() {
    let lines = [
        "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@a.example.com:8388#A",
        "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@b.example.com:8389#B",
        "ss://not-a-valid-link",
        "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@c.example.com:8390#C",
    ];
    let body = STANDARD.encode(lines.join("\n"));
    let result = explode_conf_content(&body, default_registry()).unwrap();
    let remarks: Vec<&str> = result.proxies.iter().map(|p| p.remark.as_str()).collect();
    assert_eq!(remarks, vec!["A", "B", "C"]);
}
