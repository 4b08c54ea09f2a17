use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use game_feed::Decorations;
use game_session::{
    CommandOutcome, PlainTextDecoder, Session, SessionError, SessionEvent, SessionRegistry,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::prelude::*;

mod config;
mod input;
mod surface;

use crate::config::{ClientConfig, DataDir, FileConfig, SessionTarget, load_config, parse_target};
use crate::input::Input;
use crate::surface::StdoutSurface;

#[derive(Parser)]
#[command(name = "gamefeed")]
#[command(about = "Multi-session client for tag-annotated text games")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Custom data directory (defaults to ~/.gamefeed)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to games and read commands from stdin
    Run(RunArgs),

    /// Print the resolved configuration as TOML
    Config,
}

#[derive(Parser)]
struct RunArgs {
    /// Game to connect to, as host:port or host:port=name (repeatable)
    #[arg(short, long, value_parser = parse_target)]
    connect: Vec<SessionTarget>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let data_dir = DataDir::new(cli.data_dir.clone())?;
    let file_config: FileConfig = load_config(&data_dir.path).extract().with_context(|| {
        format!(
            "Failed to load configuration from {}",
            data_dir.config_toml_path().display()
        )
    })?;

    match cli.command {
        Commands::Config => {
            let rendered =
                toml::to_string_pretty(&file_config).context("Failed to render configuration")?;
            print!("{rendered}");
            Ok(())
        }
        Commands::Run(args) => {
            let mut config = ClientConfig::from_file(&file_config);
            config.sessions.extend(args.connect);
            run(config).await
        }
    }
}

/// Logs go to stderr; stdout carries the transcript.
fn init_logging(debug: bool) {
    let default_directive = if debug {
        "gamefeed=debug,game_session=debug,game_feed=debug,info"
    } else {
        "gamefeed=info,game_session=info,game_feed=warn,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

async fn run(config: ClientConfig) -> Result<()> {
    let registry = Arc::new(SessionRegistry::new(
        Arc::new(StdoutSurface::stdout()),
        Decorations::new(),
    ));
    tokio::spawn(log_events(registry.subscribe()));

    for target in &config.sessions {
        if let Err(e) = connect(&registry, &config, target).await {
            warn!("{:#}", e);
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match Input::parse(&line) {
            Ok(Input::Quit) => break,
            Ok(input) => {
                if let Err(e) = handle(&registry, &config, input).await {
                    warn!("{:#}", e);
                }
            }
            Err(e) => warn!("{:#}", e),
        }
    }

    registry.shutdown().await;
    Ok(())
}

async fn handle(registry: &Arc<SessionRegistry>, config: &ClientConfig, input: Input) -> Result<()> {
    match input {
        Input::Send(line) => match registry.send_to_focused(&line).await {
            Ok(CommandOutcome::Sent | CommandOutcome::Empty) => Ok(()),
            Err(SessionError::NoFocus) => {
                anyhow::bail!("No session has focus; /connect or /focus one first")
            }
            Err(e) => Err(e.into()),
        },
        Input::List => {
            let focused = registry.focused().await;
            for session in registry.list().await {
                let marker = match &focused {
                    Some(f) if Arc::ptr_eq(f, &session) => "*",
                    _ => " ",
                };
                let status = if session.is_broken() { " (closed)" } else { "" };
                println!(
                    "{marker} {} {}:{}{status}",
                    session.name(),
                    session.host(),
                    session.port()
                );
            }
            Ok(())
        }
        Input::Focus(query) => {
            let session = registry
                .fuzzy_find(&query)
                .await
                .into_iter()
                .next()
                .with_context(|| format!("No session matches '{query}'"))?;
            registry.activate(&session).await;
            Ok(())
        }
        Input::Rename(name) => {
            let session = focused(registry).await?;
            if !registry.rename(&session, &name).await {
                anyhow::bail!("Session '{}' is no longer registered", session.name());
            }
            Ok(())
        }
        Input::Close => {
            let session = focused(registry).await?;
            registry.destroy(&session).await;
            Ok(())
        }
        Input::Connect(target) => connect(registry, config, &target).await,
        Input::Quit => Ok(()),
    }
}

async fn focused(registry: &SessionRegistry) -> Result<Arc<Session>> {
    registry
        .focused()
        .await
        .context("No session has focus")
}

/// Open a session and give it the focus.
async fn connect(
    registry: &SessionRegistry,
    config: &ClientConfig,
    target: &SessionTarget,
) -> Result<()> {
    let session = registry
        .connect(config.session(target), Box::new(PlainTextDecoder::new()))
        .await?;
    registry.activate(&session).await;
    Ok(())
}

async fn log_events(mut events: tokio::sync::broadcast::Receiver<SessionEvent>) {
    use tokio::sync::broadcast::error::RecvError;

    loop {
        match events.recv().await {
            Ok(SessionEvent::Routed {
                session, report, ..
            }) => {
                for tag in &report.unrecognized {
                    debug!("Session '{}' sent unrecognized <{}>", session, tag);
                }
            }
            Ok(SessionEvent::Error { session, message }) => {
                warn!("Session '{}' connection error: {}", session, message);
            }
            Ok(SessionEvent::Closed { session }) => {
                info!("Session '{}' closed; /close to remove it", session);
            }
            Err(RecvError::Lagged(n)) => debug!("Event log lagged by {} events", n),
            Err(RecvError::Closed) => break,
        }
    }
}
