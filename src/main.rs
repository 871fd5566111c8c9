use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use subcodec::{
    add_all_nodes, preprocess_nodes, refresh_rulesets, render, RenderInput, Settings, Target,
};

/// Convert proxy share-links and subscriptions into client configurations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Share-links, subscription URLs or local files, read in order
    #[arg(required = true, value_name = "SOURCE")]
    sources: Vec<String>,

    /// Output format: clash, surge, loon, quanx, singbox, ss, ssr, v2ray, trojan or mixed
    #[arg(short, long, default_value = "clash")]
    target: String,

    /// Path to the settings file (YAML, TOML or INI)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Base document the generated sections are merged into
    #[arg(short, long, value_name = "FILE")]
    base: Option<PathBuf>,

    /// Write the result here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Surge major version to target
    #[arg(long, value_name = "VER")]
    surge_ver: Option<i32>,

    /// Skip rule generation
    #[arg(long)]
    no_rules: bool,

    /// Sort proxies by remark
    #[arg(long)]
    sort: bool,

    /// Keep only proxies whose remark matches (repeatable)
    #[arg(long, value_name = "PATTERN")]
    include: Vec<String>,

    /// Drop proxies whose remark matches (repeatable)
    #[arg(long, value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Log filter, e.g. info or subcodec=debug
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::init_from_env(Env::default().default_filter_or(args.log_level.as_str()));

    let Some(target) = Target::from_str(&args.target) else {
        bail!("unknown target `{}`", args.target);
    };

    let mut settings = match &args.config {
        Some(path) => Settings::load(path).with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    settings.include_remarks.extend(args.include.iter().cloned());
    settings.exclude_remarks.extend(args.exclude.iter().cloned());
    if args.sort {
        settings.enable_sort = true;
    }
    if args.no_rules {
        settings.enable_rule_gen = false;
    }

    let base = match &args.base {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading base {}", path.display()))?,
        None => settings.load_base(target)?,
    };

    let mut subscription = add_all_nodes(&args.sources, &settings.parse_settings());
    if subscription.proxies.is_empty() {
        bail!("no proxies could be read from the given sources");
    }
    preprocess_nodes(&mut subscription.proxies, &settings.transform_options());

    let groups = if settings.custom_proxy_groups.is_empty() {
        subscription.groups.clone()
    } else {
        settings.custom_proxy_groups.clone()
    };
    let rulesets = if settings.enable_rule_gen {
        refresh_rulesets(&settings.custom_rulesets, &settings.ruleset_fetcher())
    } else {
        Vec::new()
    };

    let mut ext = settings.extra_settings();
    if let Some(ver) = args.surge_ver {
        ext.surge_ver = ver;
    }

    let input = RenderInput {
        proxies: &subscription.proxies,
        groups: &groups,
        raw_rules: &subscription.raw_rules,
        rulesets: &rulesets,
        base: &base,
    };
    let output = render(target, &input, &ext)?;
    for (remark, reason) in &output.skipped {
        warn!("Skipped {}: {}", remark, reason);
    }

    match &args.output {
        Some(path) => {
            fs::write(path, &output.text).with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote {} configuration to {}", target, path.display());
        }
        None => print!("{}", output.text),
    }
    Ok(())
}
