use std::env;

use anyhow::{bail, Result};
use tracing_subscriber::EnvFilter;

use vlr_pickem::config::Config;
use vlr_pickem::export;
use vlr_pickem::fetch::Fetcher;
use vlr_pickem::merge::Analyzer;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vlr_pickem=warn")),
        )
        .init();

    let cfg = Config::from_env();
    let fetcher = Fetcher::new(&cfg.fetch, &cfg.stats_base_url)?;
    let analyzer = Analyzer::new(&fetcher, &cfg);

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("player") => {
            let name = args.collect::<Vec<_>>().join(" ");
            if name.trim().is_empty() {
                bail!("usage: export player <name>");
            }
            run_player(&analyzer, &cfg, name.trim())
        }
        Some("slate") => run_slate(&analyzer, &cfg, args.next()),
        _ => bail!("usage: export player <name> | export slate [match-url]"),
    }
}

fn run_player(analyzer: &Analyzer, cfg: &Config, name: &str) -> Result<()> {
    println!("[*] Looking up '{name}'...");
    let report = analyzer.analyze_player(name);
    if let Some(error) = &report.error {
        if report.profile_url.is_none() {
            println!("[!] Player '{name}' not found on the stats site.");
            return Ok(());
        }
        println!("[!] {error}");
    }

    println!("{}", "-".repeat(60));
    println!("Player found: {}", report.player);
    println!("Current Team: {}", report.team.as_deref().unwrap_or("N/A"));
    println!(
        "Profile: {}",
        report.profile_url.as_deref().unwrap_or("N/A")
    );
    println!("{}", "-".repeat(60));
    if report.agent_stats.is_empty() {
        println!("[!] No agent stats found.");
    } else {
        println!("[+] Agent stats scraped.");
        let path = export::export_agent_stats(&report.player, &report.agent_stats, &cfg.export_dir)?;
        println!("[+] Agent stats exported for {name} -> {}", path.display());
    }
    println!(
        "[*] Checked {} match links, scraped {} maps.",
        report.links_found, report.maps_scraped
    );
    println!(
        "[+] {} matches passed the 2-map filter.",
        report.matches_analyzed
    );

    println!("\nPlayer Summary:");
    println!(
        "  Last 5 Match Kills (Maps 1+2): {}",
        fmt_avg(report.averages.last_5)
    );
    println!(
        "  Last 10 Match Kills (Maps 1+2): {}",
        fmt_avg(report.averages.last_10)
    );
    println!(
        "  Last 25 Match Kills (Maps 1+2): {}",
        fmt_avg(report.averages.last_25)
    );

    let path = export::export_player(&report, &cfg.export_dir)?;
    println!("[+] Kills by match exported for {name} -> {}", path.display());
    Ok(())
}

fn run_slate(analyzer: &Analyzer, cfg: &Config, match_url: Option<String>) -> Result<()> {
    println!("[*] Fetching pick'em slate...");
    let analysis = match analyzer.analyze_slate(match_url.as_deref()) {
        Ok(analysis) => analysis,
        Err(err) => {
            println!("[!] No pick'em slate available: {err}");
            return Ok(());
        }
    };

    println!("\nPICK'EM LINES WITH ROLLING KILL AVERAGES");
    for group in &analysis.groups {
        println!("{}", "-".repeat(60));
        println!("{}", group.key);
        for row in &group.players {
            match &row.error {
                Some(error) => println!(
                    "  {:<20} line {:>5}  [{error}]",
                    row.player,
                    fmt_avg(row.line)
                ),
                None => println!(
                    "  {:<20} line {:>5}  L5 {:>6}  L10 {:>6}  L25 {:>6}",
                    row.player,
                    fmt_avg(row.line),
                    fmt_avg(row.avg_last_5),
                    fmt_avg(row.avg_last_10),
                    fmt_avg(row.avg_last_25)
                ),
            }
        }
    }
    println!("{}", "-".repeat(60));

    let path = export::export_slate(&analysis, &cfg.export_dir)?;
    println!("[+] Slate exported -> {}", path.display());
    Ok(())
}

fn fmt_avg(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "N/A".to_string())
}
