use subcodec::generator::group_generate;
use subcodec::models::{Proxy, ProxyKind, ProxyType, RegexMatchConfig, ShadowsocksInfo, VMessInfo};
use subcodec::parser::{preprocess_nodes, TransformOptions};
use subcodec::utils::{apply_matcher, match_range};

fn ss(remark: &str, port: u16) -> Proxy {
    Proxy::new(ProxyKind::Shadowsocks(ShadowsocksInfo::default()), remark, "ss.example.com", port)
}

#[test]
fn test_match_range() {
    assert!(match_range("8000-9000,443", 8388));
    assert!(match_range("8000-9000,443", 443));
    assert!(!match_range("8000-9000,443", 80));
    for port in [0, 1, 65535] {
        assert!(match_range("", port));
    }
}

#[test]
fn test_type_matcher_consumes_rule() {
    let node = ss("HK 01", 8388);
    let mut real_rule = String::from("unchanged");
    assert!(apply_matcher("!!TYPE=SS|VMess", &mut real_rule, &node));
    assert_eq!(real_rule, "");
}

#[test]
fn test_group_without_matches_falls_back_to_direct() {
    let nodes = vec![ss("HK 01", 8388)];
    let members = group_generate(&["!!TYPE=Trojan".to_string()], &nodes);
    assert_eq!(members, vec!["DIRECT"]);
}

#[test]
fn test_pipeline_order() {
    let mut nodes = vec![
        ss("🇯🇵 Tokyo 02", 8388),
        Proxy::new(ProxyKind::VMess(VMessInfo::default()), "Tokyo 01", "jp.example.com", 443),
        ss("Expire 2030-01-01", 1),
    ];
    let opts = TransformOptions {
        exclude_remarks: vec!["Expire".to_string()],
        rename_rules: vec![RegexMatchConfig::new("Tokyo", "JP")],
        emoji_rules: vec![RegexMatchConfig::new("JP", "🇯🇵")],
        add_emoji: true,
        remove_old_emoji: true,
        sort: true,
        ..Default::default()
    };
    preprocess_nodes(&mut nodes, &opts);
    let remarks: Vec<&str> = nodes.iter().map(|p| p.remark.as_str()).collect();
    assert_eq!(remarks, vec!["🇯🇵 JP 01", "🇯🇵 JP 02"]);
    assert_eq!(nodes[0].proxy_type, ProxyType::VMess);
}
