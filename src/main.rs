//! silentrisk CLI: chat with the health-metrics assistant.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use silentrisk::config::ChatConfig;
use silentrisk::conversation::{ConversationState, Session};
use silentrisk::knowledge::TopicId;
use silentrisk::recommend::recommend;
use silentrisk::resolve::ResolutionEngine;
use silentrisk::snapshot::{HealthSnapshot, format_value};

#[derive(Parser)]
#[command(name = "silentrisk", version, about = "Health-metrics assistant")]
struct Cli {
    /// Chat config file (TOML). Falls back to $SILENTRISK_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// The user's current measurements (JSON).
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session.
    Chat {
        /// Override the configured typing delay.
        #[arg(long)]
        typing_delay_ms: Option<u64>,
    },

    /// Resolve a single utterance.
    Ask {
        utterance: String,

        /// Topic remembered from a previous turn.
        #[arg(long)]
        last_topic: Option<String>,

        /// Print the full resolution as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List knowledge-base topics in resolution order.
    Topics,

    /// Lifestyle recommendations for the snapshot.
    Recommend {
        #[arg(long)]
        json: bool,
    },

    /// Flag snapshot values outside their reference ranges.
    Check,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ChatConfig::resolve(cli.config.as_deref())?;
    let snapshot = match &cli.snapshot {
        Some(path) => HealthSnapshot::load(path)?,
        None => HealthSnapshot::default(),
    };

    match cli.command {
        Commands::Chat { typing_delay_ms } => {
            let engine = Arc::new(ResolutionEngine::from_config(&config)?);
            let delay = Duration::from_millis(typing_delay_ms.unwrap_or(config.typing_delay_ms));
            chat(Session::new(engine, config.greeting.clone()), &snapshot, delay)?;
        }

        Commands::Ask {
            utterance,
            last_topic,
            json,
        } => {
            let engine = ResolutionEngine::from_config(&config)?;
            let mut state = match last_topic {
                Some(id) => ConversationState::with_last_topic(TopicId::new(id)),
                None => ConversationState::new(),
            };
            let resolution = engine.resolve(&utterance, &mut state, &snapshot);
            if json {
                let out = serde_json::to_string_pretty(&resolution).into_diagnostic()?;
                println!("{out}");
            } else {
                println!("{}", resolution.response);
            }
        }

        Commands::Topics => {
            let engine = ResolutionEngine::from_config(&config)?;
            let knowledge = engine.knowledge();
            println!(
                "{} ({} topics{})",
                knowledge.name(),
                knowledge.len(),
                knowledge
                    .version()
                    .map(|v| format!(", v{v}"))
                    .unwrap_or_default()
            );
            for (i, topic) in knowledge.topics().enumerate() {
                println!("  {:>2}. {:<12} {}", i + 1, topic.id.as_str(), topic.keywords.join(", "));
            }
        }

        Commands::Recommend { json } => {
            let recs = recommend(&snapshot);
            if json {
                let out = serde_json::to_string_pretty(&recs).into_diagnostic()?;
                println!("{out}");
            } else {
                println!("Risk category: {}", recs.category);
                println!("Do:");
                for item in &recs.do_list {
                    println!("  + {item}");
                }
                println!("Avoid:");
                for item in &recs.avoid_list {
                    println!("  - {item}");
                }
            }
        }

        Commands::Check => {
            let flags = snapshot.out_of_range();
            if flags.is_empty() {
                println!("All measured values are within their reference ranges.");
            }
            for flag in flags {
                println!(
                    "{}: {} {} (normal {})",
                    flag.metric.label(),
                    format_value(flag.value),
                    flag.metric.unit(),
                    flag.range
                );
            }
        }
    }

    Ok(())
}

/// Read-eval-print loop over stdin. One turn at a time; `exit` or EOF ends.
fn chat(mut session: Session, snapshot: &HealthSnapshot, delay: Duration) -> Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    println!("{}", session.greeting());
    loop {
        print!("> ");
        stdout.flush().into_diagnostic()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).into_diagnostic()? == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if matches!(text, "exit" | "quit") {
            break;
        }

        let resolution = session.ask(text, snapshot);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        println!("{}\n", resolution.response);
    }
    Ok(())
}
