//! recc: self-referential agent launcher
//!
//! Usage:
//!   recc serve --port 18920          # gateway with WebSocket control
//!   recc run --cycles 50             # headless batch run
//!   recc dump-config                 # print default config TOML
//!   recc snapshots                   # list saved snapshots

use clap::{Parser, Subcommand};
use recc_agent::AgentConfig;
use recc_gateway::{start_gateway, GatewayConfig};
use recc_llm::{AnthropicCollaborator, Collaborator, ScriptedCollaborator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "recc", about = "Self-referential cognitive agent")]
struct Cli {
    /// Path to config file (TOML). Default: ./recc.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run without the live collaborator even if an API key is set
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the gateway with the WebSocket control surface
    Serve {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port
        #[arg(long, default_value_t = 18920)]
        port: u16,
    },
    /// Run a fixed number of cycles headless, then save
    Run {
        /// Cycles to execute
        #[arg(long, default_value_t = 25)]
        cycles: u64,
        /// Optional external input queued before the first cycle
        #[arg(long)]
        input: Option<String>,
        /// Resume from a snapshot ("latest" or snapshot id)
        #[arg(long)]
        resume: Option<String>,
    },
    /// Print the default config as TOML and exit
    DumpConfig,
    /// List snapshots in the configured snapshot directory
    Snapshots,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recc=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if matches!(cli.command, Command::DumpConfig) {
        println!("{}", AgentConfig::default().to_toml());
        return Ok(());
    }

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("recc.toml"));
    let config = AgentConfig::load(&config_path);

    match cli.command {
        Command::Serve { bind, port } => {
            let collaborator = make_collaborator(&config, cli.offline);
            start_gateway(config, GatewayConfig { bind, port }, collaborator).await?;
        }
        Command::Run {
            cycles,
            input,
            resume,
        } => {
            let collaborator = make_collaborator(&config, cli.offline);
            let mut agent = recc_agent::ReccAgent::new(config, collaborator);
            if let Some(reference) = resume {
                agent.load(&reference)?;
                info!(cycle = agent.status().cycle, "resumed from snapshot");
            }
            if let Some(text) = input {
                agent.send_external_input(text);
            }
            agent.run(cycles).await?;
            let id = agent.save()?;
            let status = agent.status();
            info!(
                snapshot = %id,
                cycle = status.cycle,
                depth = status.max_recursion_depth,
                experiences = status.experiences,
                "run complete"
            );
        }
        Command::Snapshots => {
            list_snapshots(Path::new(&config.persistence.snapshot_dir))?;
        }
        Command::DumpConfig => unreachable!(),
    }

    Ok(())
}

/// Live collaborator when a key is available, scripted fallback otherwise.
fn make_collaborator(config: &AgentConfig, offline: bool) -> Arc<dyn Collaborator> {
    if !offline {
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            info!(model = %config.collaborator.model, "using live collaborator");
            return Arc::new(
                AnthropicCollaborator::new(&key, &config.collaborator.model)
                    .with_max_tokens(config.collaborator.max_tokens),
            );
        }
        warn!("ANTHROPIC_API_KEY not set; falling back to offline collaborator");
    }
    Arc::new(ScriptedCollaborator::echoing(
        "an unhurried thought, recorded offline",
    ))
}

fn list_snapshots(dir: &Path) -> anyhow::Result<()> {
    let latest = std::fs::read_to_string(dir.join("latest"))
        .map(|s| s.trim().to_string())
        .ok();
    let mut ids: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.strip_suffix(".json").map(|s| s.to_string())
            })
            .collect(),
        Err(_) => {
            println!("no snapshots at {}", dir.display());
            return Ok(());
        }
    };
    ids.sort_by_key(|id| {
        id.strip_prefix("snapshot-")
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or(0)
    });
    for id in ids {
        let marker = if Some(&id) == latest.as_ref() { " (latest)" } else { "" };
        println!("{}{}", id, marker);
    }
    Ok(())
}
