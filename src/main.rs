//! Fantasy IPL advisor binary entrypoint.
//! Parses flags, wires the advisor from config and runs each requested action in turn.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use fantasy_advisor::telemetry::Telemetry;
use fantasy_advisor::{Advisor, AdvisorConfig, AdvisoryResult};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "fantasy-advisor", version, about = "Fantasy IPL Cricket Advisor")]
struct Cli {
    /// Update the knowledge base with the latest news and injuries
    #[arg(long)]
    update: bool,

    /// Get a recommendation for a specific player
    #[arg(long, value_name = "NAME")]
    player: Option<String>,

    /// Get advice for picking players from a team
    #[arg(long, value_name = "NAME")]
    team: Option<String>,

    /// Get a captain recommendation from a list of players
    #[arg(long, num_args = 1.., value_name = "PLAYER")]
    captain: Option<Vec<String>>,

    /// Get match analysis for TEAM1 vs TEAM2
    #[arg(long = "match", num_args = 2, value_names = ["TEAM1", "TEAM2"])]
    match_teams: Option<Vec<String>>,

    /// Search the knowledge base
    #[arg(long, value_name = "QUERY")]
    recall: Option<String>,

    /// Number of knowledge-base hits for --recall
    #[arg(long, default_value_t = 5)]
    k: usize,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Print Prometheus metrics for this run on exit
    #[arg(long)]
    metrics: bool,

    /// Config file (defaults to $ADVISOR_CONFIG_PATH or config/advisor.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    fn has_action(&self) -> bool {
        self.update
            || self.player.is_some()
            || self.team.is_some()
            || self.captain.is_some()
            || self.match_teams.is_some()
            || self.recall.is_some()
    }
}

/// Compact logs on stderr; `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fantasy_advisor=info,monitor=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn build_advisor(cli: &Cli) -> anyhow::Result<Advisor> {
    let cfg = AdvisorConfig::load(cli.config.as_deref()).context("loading config")?;
    // Safe diagnostics: key presence only.
    info!(
        model = %cfg.llm.model,
        openai_key = cfg.llm.api_key.is_some(),
        exa_key = cfg.search.api_key.is_some(),
        tracing = cfg.monitoring.enabled,
        "config loaded"
    );
    Advisor::from_config(&cfg).context("initializing advisor")
}

fn print_result(r: &AdvisoryResult, as_json: bool) {
    if as_json {
        match serde_json::to_string_pretty(r) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("Error serializing result: {e}"),
        }
        return;
    }
    println!("\n{}:", r.kind.heading());
    println!("{}", r.answer);
    println!(
        "Confidence: {} ({:.2})",
        r.confidence.label, r.confidence.score
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    if !cli.has_action() {
        println!("No action specified. Use --help to see available options.");
        return ExitCode::SUCCESS;
    }

    let telemetry = if cli.metrics {
        match Telemetry::install() {
            Ok(t) => Some(t),
            Err(e) => {
                warn!(error = %e, "metrics disabled");
                None
            }
        }
    } else {
        None
    };

    let mut advisor = match build_advisor(&cli) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    if cli.update {
        println!("Updating knowledge base...");
        match advisor.update_knowledge_base().await {
            Ok(u) => {
                println!("Knowledge base updated successfully!");
                println!(
                    "docs_added={} stored={} total_docs={}",
                    u.docs_added, u.stored, u.total_docs
                );
            }
            Err(e) => eprintln!("Error updating knowledge base: {e}"),
        }
    }

    if let Some(player) = &cli.player {
        println!("Getting recommendation for {player}...");
        match advisor.player_recommendation(player).await {
            Ok(r) => print_result(&r, cli.json),
            Err(e) => eprintln!("Error getting player recommendation: {e}"),
        }
    }

    if let Some(team) = &cli.team {
        println!("Getting advice for team {team}...");
        match advisor.team_advice(team).await {
            Ok(r) => print_result(&r, cli.json),
            Err(e) => eprintln!("Error getting team advice: {e}"),
        }
    }

    if let Some(players) = &cli.captain {
        println!("Getting captain recommendation from {}...", players.join(", "));
        match advisor.captain_recommendation(players).await {
            Ok(r) => print_result(&r, cli.json),
            Err(e) => eprintln!("Error getting captain recommendation: {e}"),
        }
    }

    if let Some([team1, team2]) = cli.match_teams.as_deref() {
        println!("Getting match analysis for {team1} vs {team2}...");
        match advisor.match_analysis(team1, team2).await {
            Ok(r) => print_result(&r, cli.json),
            Err(e) => eprintln!("Error getting match analysis: {e}"),
        }
    }

    if let Some(query) = &cli.recall {
        match advisor.recall(query, cli.k).await {
            Ok(hits) if cli.json => match serde_json::to_string_pretty(&hits) {
                Ok(s) => println!("{s}"),
                Err(e) => eprintln!("Error serializing hits: {e}"),
            },
            Ok(hits) => {
                println!("\nKNOWLEDGE BASE ({} hits):", hits.len());
                for h in hits {
                    let title = h.metadata.get("title").map(String::as_str).unwrap_or("");
                    println!("[{:.3}] {title}", h.distance);
                }
            }
            Err(e) => eprintln!("Error searching knowledge base: {e}"),
        }
    }

    if let Some(t) = &telemetry {
        println!("\n{}", t.render());
    }

    ExitCode::SUCCESS
}
