use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use faction_payout::{
    load_source, parse_us_number, rank_by_respect, report, war_source_type, ChainReport,
    ChainSummary, EarningsDistributor, NameReconciler, ParseOptions, PayoutConfig, SaveStat,
    SourceType, WarReportParser, WarRespectMerger, WarStat,
};

const USAGE: &str = "Usage:
  faction-payout earnings --chain <csv> [--war <csv|json>] [--saves <csv|xlsx>]
                          [--config <json>] [--pool <amount>] [--tax <rate>]
                          [--score-weight <n>] [--hit-weight <n>]
                          [--faction <id>] [--template <html>] [--out <dir>]
  faction-payout chain <csv> [--out <dir>]
  faction-payout war <json> --faction <id> [--out <dir>]

  -h, --help    Show this message";

fn main() -> Result<()> {
    // Initialize logging
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("--help") | Some("-h") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some("earnings") => run_earnings(&args[2..]),
        Some("chain") => run_chain(&args[2..]),
        Some("war") => run_war(&args[2..]),
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
    }
}

// ============================================================================
// ARGUMENTS
// ============================================================================

#[derive(Debug, Default)]
struct EarningsArgs {
    chain: Option<PathBuf>,
    war: Option<PathBuf>,
    saves: Option<PathBuf>,
    config: Option<PathBuf>,
    pool: Option<String>,
    tax: Option<String>,
    score_weight: Option<String>,
    hit_weight: Option<String>,
    faction: Option<String>,
    template: Option<PathBuf>,
    out: Option<PathBuf>,
}

const EARNINGS_FLAGS: &[&str] = &[
    "--chain", "--war", "--saves", "--config", "--pool", "--tax", "--score-weight",
    "--hit-weight", "--faction", "--template", "--out",
];
const CHAIN_FLAGS: &[&str] = &["--out"];
const WAR_FLAGS: &[&str] = &["--faction", "--out"];

#[derive(Debug, Default)]
struct ParsedFlags {
    flags: Vec<(String, String)>,
    positional: Vec<String>,
    help: bool,
}

impl ParsedFlags {
    fn value(&self, flag: &str) -> Option<&str> {
        self.flags
            .iter()
            .rev()
            .find(|(name, _)| name == flag)
            .map(|(_, value)| value.as_str())
    }
}

/// `--flag value` parser. `--help`/`-h` take no value; anything not in `known` is rejected.
fn parse_flags(args: &[String], known: &[&str]) -> Result<ParsedFlags> {
    let mut parsed = ParsedFlags::default();

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg == "--help" || arg == "-h" {
            parsed.help = true;
            i += 1;
        } else if arg.starts_with("--") {
            if !known.contains(&arg.as_str()) {
                anyhow::bail!("Unknown option: {}\n{}", arg, USAGE);
            }
            let value = args
                .get(i + 1)
                .filter(|value| !value.starts_with("--"))
                .with_context(|| format!("Missing value for {}", arg))?;
            parsed.flags.push((arg.clone(), value.clone()));
            i += 2;
        } else {
            parsed.positional.push(arg.clone());
            i += 1;
        }
    }

    Ok(parsed)
}

/// None when help was asked for
fn parse_earnings_args(args: &[String]) -> Result<Option<EarningsArgs>> {
    let parsed = parse_flags(args, EARNINGS_FLAGS)?;
    if parsed.help {
        return Ok(None);
    }
    let mut out = EarningsArgs::default();

    for (flag, value) in parsed.flags {
        match flag.as_str() {
            "--chain" => out.chain = Some(PathBuf::from(value)),
            "--war" => out.war = Some(PathBuf::from(value)),
            "--saves" => out.saves = Some(PathBuf::from(value)),
            "--config" => out.config = Some(PathBuf::from(value)),
            "--pool" => out.pool = Some(value),
            "--tax" => out.tax = Some(value),
            "--score-weight" => out.score_weight = Some(value),
            "--hit-weight" => out.hit_weight = Some(value),
            "--faction" => out.faction = Some(value),
            "--template" => out.template = Some(PathBuf::from(value)),
            "--out" => out.out = Some(PathBuf::from(value)),
            other => anyhow::bail!("Unknown option: {}\n{}", other, USAGE),
        }
    }

    Ok(Some(out))
}

fn parse_f64(flag: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: '{}'", flag, value))
}

/// Config file first, then command-line overrides
fn build_config(args: &EarningsArgs) -> Result<PayoutConfig> {
    let mut config = match &args.config {
        Some(path) => PayoutConfig::from_file(path)?,
        None => PayoutConfig::default(),
    };

    if let Some(pool) = &args.pool {
        config.total_pool = parse_us_number(pool)?;
    }
    if let Some(tax) = &args.tax {
        config.tax_rate = parse_f64("--tax", tax)?;
    }
    if let Some(weight) = &args.score_weight {
        config.score_weight = parse_f64("--score-weight", weight)?;
    }
    if let Some(weight) = &args.hit_weight {
        config.hit_weight = parse_f64("--hit-weight", weight)?;
    }
    if let Some(faction) = &args.faction {
        config.faction_id = Some(faction.clone());
    }
    if let Some(template) = &args.template {
        config.template = Some(template.clone());
    }

    config.validate()?;
    Ok(config)
}

// ============================================================================
// LOADERS
// ============================================================================

fn load_chain(path: &Path) -> Result<ChainReport> {
    let options = ParseOptions::default().with_source_type(SourceType::ChainReport);
    load_source(path, &options)?.into_chain()
}

/// `.json` is a ranked-war report, anything else a war_respect_data export
fn load_war(path: &Path, faction_id: Option<String>) -> Result<Vec<WarStat>> {
    let options = ParseOptions {
        faction_id,
        source_type: Some(war_source_type(path)),
    };
    load_source(path, &options)?.into_war()
}

fn load_saves(path: &Path) -> Result<Vec<SaveStat>> {
    let options = ParseOptions::default().with_source_type(SourceType::Saves);
    load_source(path, &options)?.into_saves()
}

fn output_dir(out: Option<&Path>) -> Result<PathBuf> {
    let dir = out.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    Ok(dir)
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_earnings(args: &[String]) -> Result<()> {
    let args = match parse_earnings_args(args)? {
        Some(args) => args,
        None => {
            println!("{}", USAGE);
            return Ok(());
        }
    };
    let chain_path = args
        .chain
        .clone()
        .with_context(|| format!("--chain is required\n{}", USAGE))?;
    let config = build_config(&args)?;

    println!("💰 War Earnings Calculator");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if config.total_pool == 0.0 {
        println!("⚠️  Total pool is 0, every payout will be $0.00 (set --pool or total_pool)");
    }

    // 1. Load sources
    println!("\n📂 Loading sources...");
    let chain = load_chain(&chain_path)?;
    println!("✓ Chain report: {} ({} members)", chain.faction_name, chain.rows.len());

    let war_rows = match &args.war {
        Some(path) => {
            let rows = load_war(path, config.faction_id.clone())?;
            println!("✓ War scores: {} rows", rows.len());
            rows
        }
        None => {
            println!("• No war scores, chain respect is used for everyone");
            Vec::new()
        }
    };

    let save_rows = match &args.saves {
        Some(path) => {
            let rows = load_saves(path)?;
            println!("✓ Saves: {} rows", rows.len());
            rows
        }
        None => Vec::new(),
    };

    // 2. Merge
    println!("\n🔗 Merging by member name...");
    let merger = WarRespectMerger::with_reconciler(config.reconciler());
    let war_index = merger.war_index(war_rows);
    let save_index = merger.save_index(save_rows);
    let merged = merger.merge_with_report(&chain.rows, &war_index, &save_index);
    println!("✓ {}", merged.summary());
    for name in &merged.fallbacks {
        println!("   ↳ fallback: {}", name);
    }

    // 3. Distribute
    println!("\n🧮 Distributing payout...");
    let earnings = EarningsDistributor::new(config.payout_params()).distribute(&merged.members);
    let summary = &earnings.summary;
    println!("✓ Payout pool: {}", report::format_us_currency(summary.payout_pool));
    println!("✓ Pay per score: {}", report::format_us_currency(summary.pay_rate_per_score));
    println!("✓ Pay per hit: {}", report::format_us_currency(summary.pay_rate_per_hit));
    println!("✓ Distributed: {}", report::format_us_currency(earnings.total_earnings()));

    // 4. Write outputs
    println!("\n💾 Writing reports...");
    let out_dir = output_dir(args.out.as_deref())?;

    let template = match &config.template {
        Some(path) => Some(report::load_template(path)?),
        None => None,
    };

    let html_path = out_dir.join("earnings_report.html");
    report::write_earnings_html(&html_path, &earnings, template.as_deref())?;
    println!("✓ {}", html_path.display());

    let csv_path = out_dir.join("earnings_breakdown.csv");
    report::write_earnings_csv(&csv_path, &earnings)?;
    println!("✓ {}", csv_path.display());

    let json_path = out_dir.join("earnings.json");
    let json = serde_json::to_string_pretty(&earnings).context("Failed to serialize earnings")?;
    fs::write(&json_path, json)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;
    println!("✓ {}", json_path.display());

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Earnings calculated for {} members", summary.member_count);

    Ok(())
}

fn run_chain(args: &[String]) -> Result<()> {
    let parsed = parse_flags(args, CHAIN_FLAGS)?;
    if parsed.help {
        println!("{}", USAGE);
        return Ok(());
    }
    let path = parsed
        .positional
        .first()
        .map(PathBuf::from)
        .with_context(|| format!("Missing chain report path\n{}", USAGE))?;

    println!("⛓️  Chain Report");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let chain = load_chain(&path)?;
    let summary = ChainSummary::from_report(&chain);

    println!("Faction: {}", chain.faction_name);
    if let Some(id) = &chain.chain_id {
        println!("Chain:   {}", id);
    }
    println!("{}", summary.summary());
    println!("Best hit: {:.2} | Avg respect/member: {:.2}", summary.best_hit, summary.avg_respect);

    println!("\n🏆 Top members by respect:");
    for (rank, row) in rank_by_respect(&chain.rows).iter().take(10).enumerate() {
        println!(
            "{:>3}. {:<30} {:>10.2} respect {:>5} attacks ({:.1}% war)",
            rank + 1,
            row.member,
            row.respect,
            row.attacks,
            row.share_of_attacks(row.war)
        );
    }

    let out_dir = output_dir(parsed.value("--out").map(Path::new))?;
    let html_path = out_dir.join("chain_report.html");
    let html = report::render_chain_html(&chain, &NameReconciler::new(), None);
    report::write_html(&html_path, &html)?;
    println!("\n✓ {}", html_path.display());

    Ok(())
}

fn run_war(args: &[String]) -> Result<()> {
    let parsed = parse_flags(args, WAR_FLAGS)?;
    if parsed.help {
        println!("{}", USAGE);
        return Ok(());
    }
    let path = parsed
        .positional
        .first()
        .map(PathBuf::from)
        .with_context(|| format!("Missing war report path\n{}", USAGE))?;
    let faction_id = parsed
        .value("--faction")
        .map(str::to_string)
        .with_context(|| format!("--faction is required\n{}", USAGE))?;

    println!("⚔️  Ranked War Report");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let war = WarReportParser::new(Some(faction_id)).load(&path)?;

    println!("{}", war.summary());

    for side in std::iter::once(&war.ours).chain(war.enemy.iter()) {
        let stats = &side.stats;
        println!("\n🛡️  {} [{}]", stats.name, stats.faction_id);
        println!(
            "   {} attacks, score {:.0}, {:.2} hits/min",
            stats.total_attacks, stats.total_score, stats.hits_per_minute
        );
        println!(
            "   participation {:.1}% ({}/{}), avg score {:.2} ± {:.2}, consistency {:.1}%",
            stats.participation_rate,
            stats.participating_members,
            stats.total_members,
            stats.avg_score,
            stats.score_std_dev,
            stats.consistency_rating
        );

        for m in side.participants() {
            println!(
                "   {:<30} {:>4} hits {:>9.2} score {:>6.2}/hit {:>6.2}/lvl {:>+7.1}% vs avg",
                m.display_name(),
                m.attacks,
                m.score,
                m.avg_score_per_hit,
                m.score_per_level,
                m.vs_faction_avg
            );
        }
    }

    let out_dir = output_dir(parsed.value("--out").map(Path::new))?;
    let html_path = out_dir.join("war_report.html");
    report::write_html(&html_path, &report::render_war_html(&war, None))?;
    println!("\n✓ {}", html_path.display());

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
