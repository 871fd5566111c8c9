use std::fs;

use subcodec::generator::{render, ruleset_to_rules, RenderInput, RuleFlavor, Target};
use subcodec::models::{
    ExtraSettings, Proxy, ProxyGroupConfig, ProxyGroupType, ProxyKind, RulesetBody, RulesetConfig, RulesetContent,
    ShadowsocksInfo, VlessInfo,
};
use subcodec::rulesets::{refresh_rulesets, RulesetFetcher};

fn inline(group: &str, rule: &str) -> RulesetContent {
    RulesetContent {
        group: group.to_string(),
        body: RulesetBody::Inline(rule.to_string()),
    }
}

fn ss(remark: &str) -> Proxy {
    Proxy::new(
        ProxyKind::Shadowsocks(ShadowsocksInfo {
            method: "aes-128-gcm".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        }),
        remark,
        "ss.example.com",
        8388,
    )
}

#[test]
fn test_inline_final_replaces_default_match() {
    let with_final = ruleset_to_rules(
        &[],
        &[inline("Proxy", "GEOIP,CN"), inline("Proxy", "FINAL")],
        RuleFlavor::Clash,
    );
    assert_eq!(with_final.rules, vec!["GEOIP,CN,Proxy", "MATCH,Proxy"]);

    let without = ruleset_to_rules(&[], &[inline("Proxy", "GEOIP,CN")], RuleFlavor::Clash);
    assert_eq!(without.rules.iter().filter(|r| r.starts_with("MATCH,")).count(), 1);
    assert_eq!(without.rules.last().map(String::as_str), Some("MATCH,DIRECT"));
}

#[test]
fn test_clash_group_fallback_member() {
    let proxies = vec![ss("HK 01")];
    let mut group = ProxyGroupConfig::new("Streaming", ProxyGroupType::Select);
    group.proxies = vec!["!!TYPE=VMess".to_string()];
    let groups = vec![group];
    let input = RenderInput {
        proxies: &proxies,
        groups: &groups,
        raw_rules: &[],
        rulesets: &[],
        base: "",
    };
    let output = render(Target::Clash, &input, &ExtraSettings::default()).unwrap();
    let doc: serde_yaml::Value = serde_yaml::from_str(&output.text).unwrap();
    let members = &doc["proxy-groups"][0]["proxies"];
    assert_eq!(members, &serde_yaml::to_value(vec!["DIRECT"]).unwrap());
}

#[test]
fn test_unsupported_proxy_is_reported() {
    let proxies = vec![
        ss("HK 01"),
        Proxy::new(ProxyKind::Vless(VlessInfo::default()), "JP 01", "jp.example.com", 443),
    ];
    let input = RenderInput {
        proxies: &proxies,
        groups: &[],
        raw_rules: &[],
        rulesets: &[],
        base: "",
    };
    let output = render(Target::QuanX, &input, &ExtraSettings::default()).unwrap();
    assert_eq!(output.skipped.len(), 1);
    assert_eq!(output.skipped[0].0, "JP 01");
    assert!(output.text.contains("tag=HK 01"));
    assert!(!output.text.contains("JP 01"));
}

#[test]
fn test_unreachable_ruleset_degrades_to_reference() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("lan.list"), "IP-CIDR,192.168.0.0/16\n# comment\n").unwrap();
    let base_path = dir.path().to_string_lossy().to_string();
    let fetcher = RulesetFetcher {
        base_path: &base_path,
        ..Default::default()
    };
    let configs = vec![
        RulesetConfig::from_ini("DIRECT,lan.list").unwrap(),
        RulesetConfig::from_ini("Proxy,clash-domain:http://127.0.0.1:9/gfw.yaml").unwrap(),
    ];
    let rulesets = refresh_rulesets(&configs, &fetcher);

    let proxies = vec![ss("HK 01")];
    let input = RenderInput {
        proxies: &proxies,
        groups: &[],
        raw_rules: &[],
        rulesets: &rulesets,
        base: "",
    };
    let output = render(Target::Clash, &input, &ExtraSettings::default()).unwrap();
    let doc: serde_yaml::Value = serde_yaml::from_str(&output.text).unwrap();
    let rules: Vec<String> = serde_yaml::from_value(doc["rules"].clone()).unwrap();
    assert_eq!(rules[0], "IP-CIDR,192.168.0.0/16,DIRECT");
    assert!(rules[1].starts_with("RULE-SET,"));
    assert!(rules[1].ends_with(",Proxy"));
    assert_eq!(rules[2], "MATCH,DIRECT");
    assert!(doc["rule-providers"].is_mapping());
}

#[test]
fn test_ruleset_interval_reaches_providers() {
    let fetcher = RulesetFetcher::default();
    let configs = vec![RulesetConfig::from_ini("Proxy,clash-domain:http://127.0.0.1:9/gfw.yaml,3600").unwrap()];
    let rulesets = refresh_rulesets(&configs, &fetcher);

    let proxies = vec![ss("HK 01")];
    let input = RenderInput {
        proxies: &proxies,
        groups: &[],
        raw_rules: &[],
        rulesets: &rulesets,
        base: "",
    };
    let output = render(Target::Clash, &input, &ExtraSettings::default()).unwrap();
    let doc: serde_yaml::Value = serde_yaml::from_str(&output.text).unwrap();
    let provider = &doc["rule-providers"]["gfw"];
    assert_eq!(provider["interval"].as_u64(), Some(3600));
    assert_eq!(provider["behavior"].as_str(), Some("domain"));

    let quanx = render(Target::QuanX, &input, &ExtraSettings::default()).unwrap();
    assert!(quanx.text.contains("update-interval=3600"));
}

#[test]
fn test_raw_final_is_not_moved() {
    let raw = vec!["DOMAIN-SUFFIX,a.com,Proxy".to_string(), "MATCH,Proxy".to_string()];
    let rendered = ruleset_to_rules(&raw, &[inline("Proxy", "GEOIP,CN")], RuleFlavor::Clash);
    assert_eq!(rendered.rules[1], "MATCH,Proxy");
    assert_eq!(rendered.rules.last().map(String::as_str), Some("MATCH,DIRECT"));

    let with_final = ruleset_to_rules(&raw, &[inline("DIRECT", "FINAL")], RuleFlavor::Clash);
    assert_eq!(with_final.rules, vec!["DOMAIN-SUFFIX,a.com,Proxy", "MATCH,Proxy", "MATCH,DIRECT"]);
}
