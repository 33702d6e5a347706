//! CLI entry point for parley

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Confirm, Input};
use parley_core::config::{Config, ConfigLoader};
use parley_core::logging::init_logging;
use parley_core::utils::{mask_secret, truncate};
use parley_providers::ProviderClient;
use parley_sessions::{SessionError, SessionReaper, SessionRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Multi-session chat on top of a single LLM completion endpoint")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an initial configuration file
    Onboard,
    /// Open a session, send one message and print the reply
    Chat {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Model to use
        #[arg(long)]
        model: Option<String>,
    },
    /// Interactive multi-turn chat
    Repl {
        /// Model to use
        #[arg(long)]
        model: Option<String>,
    },
    /// Show the effective configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Onboard => run_onboard(&config_loader)?,
        Commands::Chat { message, model } => run_chat(&config_loader, &message, model).await?,
        Commands::Repl { model } => run_repl(&config_loader, model).await?,
        Commands::Status => run_status(&config_loader)?,
    }

    Ok(())
}

fn build_client(config: &Config, model: Option<String>) -> Result<ProviderClient> {
    let client = ProviderClient::from_config(config)?;
    Ok(match model {
        Some(model) => client.with_model(model),
        None => client,
    })
}

fn run_onboard(loader: &ConfigLoader) -> Result<()> {
    println!("{}", style("Welcome to parley!").bold().cyan());
    println!("Let's set up your configuration.\n");

    let config_path = loader.config_path();
    if config_path.exists() {
        let overwrite = Confirm::new()
            .with_prompt("Configuration already exists. Overwrite?")
            .default(false)
            .interact()?;
        if !overwrite {
            println!("Onboard cancelled.");
            return Ok(());
        }
    }

    let mut config = Config::default();

    config.llm.api_key = Input::new()
        .with_prompt(format!("Enter your {} API key", config.llm.provider))
        .interact_text()?;
    config.llm.base_url = Input::new()
        .with_prompt("API base URL")
        .default(config.llm.base_url.clone())
        .interact_text()?;
    config.llm.model = Input::new()
        .with_prompt("Model")
        .default(config.llm.model.clone())
        .interact_text()?;
    config.prompt.prompt = Input::new()
        .with_prompt("System prompt")
        .default(config.prompt.prompt.clone())
        .interact_text()?;

    loader.save(&config)?;

    println!(
        "\n{}",
        style("Configuration saved successfully!").green().bold()
    );
    println!("Config location: {}", config_path.display());
    println!("\nYou can now run:");
    println!(
        "  {} - Send one message",
        style("parley chat --message 'Hello!'").cyan()
    );
    println!("  {} - Start an interactive chat", style("parley repl").cyan());

    Ok(())
}

/// One session, one turn
async fn run_chat(loader: &ConfigLoader, message: &str, model: Option<String>) -> Result<()> {
    let config = loader.load()?;
    let _guard = init_logging(&config.logging);

    let client = build_client(&config, model)?;
    let registry = SessionRegistry::from_config(&config.sessions);
    let (session_id, _) = registry.create(&client)?;
    println!("Session ID: {}", style(&session_id).dim());

    println!("{}", style("Processing...").cyan());
    let outcome = match registry.run_turn(&session_id, message).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(session_id = %session_id, "Chat failed: {}", e);
            anyhow::bail!("Failed to process message: {}", e);
        }
    };

    println!("\n{}", style("Response:").bold());
    println!("{}", outcome.reply().unwrap_or_default());
    println!(
        "\n{}",
        style(format!("tokens: {}", outcome.total_tokens())).dim()
    );

    registry.delete(&session_id);
    Ok(())
}

async fn run_repl(loader: &ConfigLoader, model: Option<String>) -> Result<()> {
    let config = loader.load()?;
    let _guard = init_logging(&config.logging);

    let client = build_client(&config, model)?;
    let registry = Arc::new(SessionRegistry::from_config(&config.sessions));
    let reaper = config.sessions.idle_ttl().map(|ttl| {
        let reaper = SessionReaper::new(
            Arc::clone(&registry),
            ttl,
            config.sessions.reap_interval(),
        );
        reaper.start();
        reaper
    });

    let (mut session_id, _) = registry.create(&client)?;
    println!("{}", style("parley interactive chat").bold().cyan());
    println!("Model: {}", client.settings().model);
    println!("Session ID: {}", style(&session_id).dim());
    println!(
        "{}",
        style("Commands: /usage /history /new /quit").dim()
    );

    loop {
        let line: String = Input::new()
            .with_prompt(style("you").green().to_string())
            .allow_empty(true)
            .interact_text()?;

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/usage" => match registry.get(&session_id) {
                Some(handle) => {
                    let session = handle.lock().await;
                    let provider = session.provider();
                    let age = chrono::Utc::now() - session.created_at();
                    println!(
                        "{} tokens over {} messages",
                        session.token_usage(),
                        session.history().len()
                    );
                    println!(
                        "{}",
                        style(format!(
                            "model {} (temperature {}, max tokens {}), open {}s",
                            provider.model(),
                            provider.temperature(),
                            provider.max_tokens(),
                            age.num_seconds()
                        ))
                        .dim()
                    );
                }
                None => println!("{}", style("Session expired").yellow()),
            },
            "/history" => match registry.get(&session_id) {
                Some(handle) => {
                    let session = handle.lock().await;
                    for message in session.history().snapshot() {
                        println!(
                            "{} {}",
                            style(format!("[{}]", message.role)).bold(),
                            truncate(&message.content, 200)
                        );
                    }
                }
                None => println!("{}", style("Session expired").yellow()),
            },
            "/new" => {
                registry.delete(&session_id);
                session_id = registry.create(&client)?.0;
                println!("New session: {}", style(&session_id).dim());
            }
            text => match registry.run_turn(&session_id, text).await {
                Ok(outcome) => {
                    println!(
                        "{} {}",
                        style("assistant:").cyan().bold(),
                        outcome.reply().unwrap_or_default()
                    );
                    if outcome.dropped > 0 {
                        println!(
                            "{}",
                            style(format!(
                                "({} malformed transcript entries skipped)",
                                outcome.dropped
                            ))
                            .yellow()
                        );
                    }
                }
                Err(SessionError::NotFound(_)) => {
                    warn!(session_id = %session_id, "Session expired, starting a new one");
                    session_id = registry.create(&client)?.0;
                    println!(
                        "{} {}",
                        style("Session expired, started").yellow(),
                        style(&session_id).dim()
                    );
                }
                Err(e) => {
                    error!(session_id = %session_id, "Turn failed: {}", e);
                    println!("{} {}", style("error:").red().bold(), e);
                }
            },
        }
    }

    if let Some(reaper) = reaper {
        reaper.stop();
    }
    registry.delete(&session_id);
    info!("Interactive chat closed");
    Ok(())
}

fn run_status(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;

    println!("{}", style("parley status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    println!();

    println!("{}", style("LLM:").bold());
    println!("  Provider: {}", config.llm.provider);
    println!("  Base URL: {}", config.llm.base_url);
    println!("  Model: {}", config.llm.model);
    println!("  Temperature: {}", config.llm.temperature);
    println!("  Max tokens: {}", config.llm.max_tokens);
    match config.llm.request_timeout() {
        Some(timeout) => println!("  Timeout: {}s", timeout.as_secs()),
        None => println!("  Timeout: {}", style("none").dim()),
    }
    println!("  API key: {}", mask_secret(&config.llm.api_key));
    println!();

    println!("{}", style("Auth:").bold());
    println!("  JWT secret: {}", mask_secret(&config.auth.jwt_secret));
    println!("  API key header: {}", config.auth.api_key_header);
    println!();

    println!("{}", style("Sessions:").bold());
    println!("  System prompt: {}", truncate(&config.prompt.prompt, 60));
    match config.sessions.capacity() {
        Some(limit) => println!("  Max sessions: {}", limit),
        None => println!("  Max sessions: {}", style("unbounded").dim()),
    }
    match config.sessions.idle_ttl() {
        Some(ttl) => println!(
            "  Idle TTL: {}s (swept every {}s)",
            ttl.as_secs(),
            config.sessions.reap_interval
        ),
        None => println!("  Idle TTL: {}", style("never expire").dim()),
    }
    println!();

    println!("{}", style("Logging:").bold());
    println!("  Level: {}", config.logging.level);
    println!("  Format: {}", config.logging.format);
    println!("  Directory: {}", config.logging.dir);

    Ok(())
}
