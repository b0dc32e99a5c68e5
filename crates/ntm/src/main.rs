// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Read;

use clap::Parser;
use tracing::error;

use ntm::config::Config;
use ntm::observe::{detect_kind, parse, AgentKind, PatternTable};

#[derive(Parser)]
#[command(name = "ntm", version, about = "Multi-agent terminal orchestrator.")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Audit the state directory against the structural invariants.
    Check,
    /// Classify terminal output read from stdin.
    Parse {
        /// Agent kind (claude, codex, gemini); auto-detected when omitted.
        #[arg(long)]
        kind: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }
    init_tracing(&cli.config);

    if let Err(e) = run(cli) {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Check => {
            let report = ntm::invariants::check_invariants(&cli.config.state_dir);
            println!("{}", serde_json::to_string_pretty(&report)?);
            anyhow::ensure!(report.errors == 0, "{} invariant check(s) failed", report.errors);
            Ok(())
        }
        Commands::Parse { kind } => {
            let table = PatternTable::compile()?;
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;

            let kind = match kind.as_deref() {
                Some("claude") => AgentKind::Claude,
                Some("codex") => AgentKind::Codex,
                Some("gemini") => AgentKind::Gemini,
                Some(other) => anyhow::bail!("invalid agent kind: {other}"),
                None => detect_kind(&text, &table),
            };

            let status = parse(&text, kind, &table, &cli.config.parse_config());
            let output = serde_json::json!({
                "status": status,
                "recommendation": status.recommendation(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
