// src/main.rs
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use url::Url;

use aegis::config::AppConfig;
use aegis::consent::{ConsentManager, ConsentProvider};
use aegis::plugin::{PluginExecutor, PluginRegistry, SafetyLevel, Severity};
use aegis::plugins;
use aegis::scanner::{ScanConfiguration, ScanEngine, ScanResult};

#[derive(Parser)]
#[command(name = "aegis")]
#[command(about = "A protection-first web vulnerability scanner")]
struct Args {
    #[command(subcommand)]
    command: Cli,

    #[arg(long, short, global = true, help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, short = 'p', global = true, help = "Scan profile to use")]
    profile: Option<String>,
}

#[derive(Subcommand)]
enum Cli {
    /// Execute a security scan on a target URL
    Scan {
        #[arg(short, long, help = "Target URL to scan")]
        target: String,

        #[arg(short, long, help = "Maximum crawl depth")]
        depth: Option<usize>,

        #[arg(short, long, help = "Request rate limit (req/s)")]
        rate: Option<f64>,

        #[arg(short, long, help = "Maximum safety level: passive, active, expert")]
        safety: Option<String>,

        #[arg(long, help = "Crawler concurrency")]
        concurrency: Option<usize>,

        #[arg(short = 'C', long, help = "Path to consent document")]
        consent: Option<PathBuf>,

        #[arg(short, long, help = "Output file for the scan report (JSON)")]
        output: Option<PathBuf>,

        #[arg(long, help = "Ignore robots.txt")]
        no_robots: bool,

        #[arg(long, help = "Enable expert mode")]
        expert_mode: bool,
    },

    /// List available plugins
    Plugins {
        #[arg(long, help = "Only plugins at or below this safety level")]
        max_safety: Option<String>,
    },

    /// Check whether a consent document authorizes a target
    Consent {
        #[arg(short, long, help = "Target URL")]
        target: String,

        #[arg(short = 'C', long, help = "Path to consent document")]
        consent: PathBuf,
    },

    /// Write the default configuration to ~/.aegis/config.toml
    Init {
        #[arg(short, long, help = "Force overwrite existing configuration")]
        force: bool,
    },
}

fn parse_safety(value: &str) -> Result<SafetyLevel> {
    value
        .parse::<SafetyLevel>()
        .map_err(|e| anyhow::anyhow!(e))
}

fn parse_target(target: &str) -> Result<Url> {
    Url::parse(target)
        .or_else(|_| Url::parse(&format!("https://{}", target)))
        .context("Invalid target URL")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let app_config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            exit(1);
        }
    };

    let outcome = match args.command {
        Cli::Scan {
            target,
            depth,
            rate,
            safety,
            concurrency,
            consent,
            output,
            no_robots,
            expert_mode,
        } => {
            run_scan(
                &app_config,
                args.profile.as_deref(),
                ScanArgs {
                    target,
                    depth,
                    rate,
                    safety,
                    concurrency,
                    consent,
                    output,
                    no_robots,
                    expert_mode,
                },
            )
            .await
        }
        Cli::Plugins { max_safety } => list_plugins(max_safety.as_deref()),
        Cli::Consent { target, consent } => check_consent(&target, &consent),
        Cli::Init { force } => init_config(&app_config, force),
    };

    if let Err(e) = outcome {
        error!("Command failed: {}", e);
        exit(1);
    }

    Ok(())
}

struct ScanArgs {
    target: String,
    depth: Option<usize>,
    rate: Option<f64>,
    safety: Option<String>,
    concurrency: Option<usize>,
    consent: Option<PathBuf>,
    output: Option<PathBuf>,
    no_robots: bool,
    expert_mode: bool,
}

async fn run_scan(config: &AppConfig, profile_name: Option<&str>, args: ScanArgs) -> Result<()> {
    let target = parse_target(&args.target)?;
    let profile = config.profile(profile_name)?;

    let safety = match &args.safety {
        Some(value) => parse_safety(value)?,
        None => profile.max_safety_level,
    };

    let consent_manager = Arc::new(ConsentManager::new());
    if let Some(path) = &args.consent {
        info!("Loading consent from: {}", path.display());
        consent_manager.load_consent_from_file(path)?;
    }

    let registry = Arc::new(PluginRegistry::new());
    plugins::register_builtins(&registry)?;
    println!("Loaded {} plugins", registry.plugin_count());

    let scan_config = ScanConfiguration::builder(target)
        .max_safety_level(safety)
        .max_crawl_depth(args.depth.unwrap_or(profile.max_crawl_depth))
        .rate_limit(args.rate.unwrap_or(profile.rate_limit))
        .concurrency(
            args.concurrency
                .unwrap_or(profile.concurrency)
                .min(config.global.max_concurrency),
        )
        .respect_robots_txt(!args.no_robots)
        .expert_mode(args.expert_mode)
        .build();

    println!("Target: {}", scan_config.target_url());
    println!("Safety level: {}", scan_config.max_safety_level());
    println!("Max depth: {}", scan_config.max_crawl_depth());
    println!("Rate limit: {} req/s", scan_config.rate_limit());
    println!();
    println!("Starting scan...");

    let engine = ScanEngine::new(consent_manager, registry.clone()).with_executor(
        PluginExecutor::new(4, Duration::from_secs(profile.plugin_timeout_secs)),
    );

    let scan_outcome = engine.scan(scan_config).await;
    registry.shutdown();

    let result = scan_outcome?;
    print_summary(&result);

    if let Some(path) = &args.output {
        let report = serde_json::to_string_pretty(&result.report())?;
        std::fs::write(path, report)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

fn print_summary(result: &ScanResult) {
    println!();
    println!("Scan completed!");
    println!("Duration: {} ms", result.duration_ms());
    if let Some(crawl) = result.crawl_result() {
        println!("Pages crawled: {}", crawl.page_count());
        if crawl.error_count() > 0 {
            println!("Fetch errors: {}", crawl.error_count());
        }
    }
    println!("Findings: {}", result.finding_count());

    let by_severity = result.findings_by_severity();
    for severity in [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ] {
        if let Some(count) = by_severity.get(&severity) {
            println!("  {:?}: {}", severity, count);
        }
    }

    let tally = result.tally();
    if tally.total_errors() > 0 {
        println!();
        println!("Plugin errors:");
        for (plugin_id, counts) in tally.counts() {
            if counts.error + counts.timeout > 0 {
                println!(
                    "  {}: {} errors, {} timeouts",
                    plugin_id, counts.error, counts.timeout
                );
            }
        }
    }
}

fn list_plugins(max_safety: Option<&str>) -> Result<()> {
    let registry = PluginRegistry::new();
    plugins::register_builtins(&registry)?;

    let listed = match max_safety {
        Some(value) => registry.by_max_safety_level(parse_safety(value)?),
        None => registry.all(),
    };

    println!("{} plugins available:", listed.len());
    for plugin in listed {
        let metadata = plugin.metadata();
        println!(
            "  {} v{} [{}] - {}",
            metadata.id, metadata.version, metadata.safety_level, metadata.description
        );
    }

    registry.shutdown();
    Ok(())
}

fn init_config(config: &AppConfig, force: bool) -> Result<()> {
    let path = AppConfig::default_config_path();
    if path.exists() && !force {
        anyhow::bail!(
            "Configuration already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    config.save(&path)?;
    println!("Configuration initialized at {}", path.display());

    Ok(())
}

fn check_consent(target: &str, consent_path: &PathBuf) -> Result<()> {
    let target = parse_target(target)?;

    let manager = ConsentManager::new();
    manager.load_consent_from_file(consent_path)?;

    if manager.has_valid_consent(&target) {
        println!("Valid consent found for {}", target);
    } else {
        println!("No valid consent for {}", target);
        exit(1);
    }

    Ok(())
}
