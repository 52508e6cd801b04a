mod sinks;
mod store;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use plexnp_core::{
    ActionSink, ChannelRef, CommandReport, DebugSink, NowPlayingCommand, PreferenceStore,
    SharedClientDirectory, COMMAND_NAME, NO_CLIENTS_PLACEHOLDER,
};
use plexnp_device_plex::PlexController;
use plexnp_persistence::PreferenceRepository;
use sinks::{ChangedOnlySink, StderrDebugSink, StdoutActionSink, TracingDebugSink};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use store::{OverrideStore, ServerOverrides};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "plexnp", version, about = "Announce what is playing on a Plex server")]
struct Cli {
    /// Preference database (defaults to the platform config directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log resolution details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Default)]
struct ServerArgs {
    /// Server host for this run only
    #[arg(long)]
    host: Option<String>,

    /// Server port for this run only
    #[arg(long)]
    port: Option<String>,

    /// Request timeout in seconds for this run only
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Args, Clone)]
struct ChatArgs {
    /// Channel the action is posted to
    #[arg(long, default_value = "#plex")]
    channel: String,

    /// Nick shown in front of the action
    #[arg(long, default_value = "me")]
    nick: String,
}

#[derive(Subcommand)]
enum Command {
    /// Post the current now-playing line once
    Plex {
        #[command(flatten)]
        chat: ChatArgs,
        #[command(flatten)]
        server: ServerArgs,
    },
    /// List players with an active session
    Clients {
        #[command(flatten)]
        server: ServerArgs,
    },
    /// Show or change stored preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
    /// Poll the server and post whenever the now-playing line changes
    Watch {
        /// Seconds between polls
        #[arg(long, default_value_t = 30)]
        interval: u64,
        #[command(flatten)]
        chat: ChatArgs,
        #[command(flatten)]
        server: ServerArgs,
    },
}

#[derive(Subcommand)]
enum PrefsAction {
    Show,
    SetHost { host: String },
    SetPort { port: String },
    /// Pick the preferred player by label ("Living Room (Roku)") or machine id
    SetClient { client: String },
    ClearClient,
    /// Treat a lone session as the preferred player's
    Fallback { mode: Toggle },
    /// Request timeout in seconds
    Timeout { secs: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose {
        "info,plexnp=debug,plexnp_core=debug,plexnp_device_plex=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let db_path = match cli.db {
        Some(path) => path,
        None => get_db_path()?,
    };
    tracing::debug!("Database path: {}", db_path.display());

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pool = plexnp_persistence::init_db(&db_path).await?;
    let repo = Arc::new(PreferenceRepository::new(pool));
    let controller = Arc::new(PlexController::new()?);

    match cli.command {
        Command::Plex { chat, server } => {
            let actions: Arc<dyn ActionSink> = Arc::new(StdoutActionSink::new(chat.nick));
            let command =
                build_command(repo, controller, &server, actions, Arc::new(StderrDebugSink))?;

            tracing::debug!("Running /{}", COMMAND_NAME);
            let report = command.invoke(ChannelRef::new(chat.channel)).await;
            tracing::debug!("Command finished: {:?}", report);
        }
        Command::Clients { server } => {
            let actions: Arc<dyn ActionSink> = Arc::new(StdoutActionSink::new("me"));
            let command = build_command(
                repo.clone(),
                controller,
                &server,
                actions,
                Arc::new(StderrDebugSink),
            )?;
            list_clients(&command, repo.as_ref()).await?;
        }
        Command::Prefs { action } => {
            let actions: Arc<dyn ActionSink> = Arc::new(StdoutActionSink::new("me"));
            let command = build_command(
                repo.clone(),
                controller,
                &ServerArgs::default(),
                actions,
                Arc::new(StderrDebugSink),
            )?;
            update_prefs(action, &command, repo.as_ref()).await?;
        }
        Command::Watch {
            interval,
            chat,
            server,
        } => {
            let stdout = Arc::new(StdoutActionSink::new(chat.nick));
            let changed_only = Arc::new(ChangedOnlySink::new(stdout));
            let command = build_command(
                repo,
                controller,
                &server,
                changed_only.clone(),
                Arc::new(TracingDebugSink),
            )?;
            watch(
                &command,
                &changed_only,
                ChannelRef::new(chat.channel),
                Duration::from_secs(interval.max(1)),
            )
            .await;
        }
    }

    Ok(())
}

fn build_command(
    repo: Arc<PreferenceRepository>,
    controller: Arc<PlexController>,
    server: &ServerArgs,
    actions: Arc<dyn ActionSink>,
    debug: Arc<dyn DebugSink>,
) -> Result<NowPlayingCommand> {
    let overrides = ServerOverrides::parse(
        server.host.as_deref(),
        server.port.as_deref(),
        server.timeout,
    )?;
    let store = Arc::new(OverrideStore::new(repo, overrides));
    Ok(NowPlayingCommand::new(store, controller, actions, debug))
}

async fn list_clients(command: &NowPlayingCommand, store: &dyn PreferenceStore) -> Result<()> {
    let prefs = store.load().await?;
    let directory = command.fetch_clients().await?;

    if directory.is_empty() {
        println!("{}", NO_CLIENTS_PLACEHOLDER);
        return Ok(());
    }

    for (label, id) in directory.iter() {
        let marker = if prefs.preferred_client() == Some(id) { "*" } else { " " };
        println!("{} {}  {}", marker, label, id);
    }
    Ok(())
}

async fn update_prefs(
    action: PrefsAction,
    command: &NowPlayingCommand,
    store: &dyn PreferenceStore,
) -> Result<()> {
    let mut prefs = store.load().await?;

    match action {
        PrefsAction::Show => {
            println!("host:                  {}", prefs.host);
            println!("port:                  {}", prefs.port);
            println!(
                "preferred client:      {}",
                prefs.preferred_client().unwrap_or("(none)")
            );
            println!("single-session match:  {}", prefs.single_session_fallback);
            println!("request timeout:       {}s", prefs.request_timeout_secs);
            return Ok(());
        }
        PrefsAction::SetHost { host } => prefs.set_host(&host)?,
        PrefsAction::SetPort { port } => prefs.set_port(&port)?,
        PrefsAction::SetClient { client } => {
            prefs.preferred_client_id = resolve_client(command, &client).await;
        }
        PrefsAction::ClearClient => prefs.preferred_client_id.clear(),
        PrefsAction::Fallback { mode } => {
            prefs.single_session_fallback = matches!(mode, Toggle::On);
        }
        PrefsAction::Timeout { secs } => prefs.set_request_timeout(&secs)?,
    }

    store.save(&prefs).await.context("Failed to store preferences")?;
    println!("Saved.");
    Ok(())
}

/// Map a client label to its machine id; anything else is taken as an id
async fn resolve_client(command: &NowPlayingCommand, client: &str) -> String {
    match command.fetch_clients().await {
        Ok(directory) => match directory.lookup(client) {
            Some(id) => {
                tracing::info!("Preferred client {} -> {}", client, id);
                id.to_string()
            }
            None => {
                if directory.label_for(client).is_none() {
                    tracing::warn!(
                        "'{}' is not an active client, storing it as a machine id",
                        client
                    );
                }
                client.to_string()
            }
        },
        Err(e) => {
            tracing::warn!(
                "Could not list clients ({}), storing '{}' as a machine id",
                e,
                client
            );
            client.to_string()
        }
    }
}

async fn watch(
    command: &NowPlayingCommand,
    changed_only: &ChangedOnlySink,
    channel: ChannelRef,
    every: Duration,
) {
    let directory = SharedClientDirectory::new();
    let mut ticker = tokio::time::interval(every);
    tracing::info!("Watching every {}s, posting to {}", every.as_secs(), channel);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping");
                return;
            }
        }

        match command.poll(&directory, channel.clone()).await {
            CommandReport::Sent { .. } => {
                tracing::debug!("{} client(s) active", directory.snapshot().await.len());
            }
            report => {
                tracing::debug!("Nothing to post: {:?}", report);
                changed_only.reset();
            }
        }
    }
}

/// Get the database path (platform-specific)
fn get_db_path() -> Result<PathBuf> {
    let config_dir = if cfg!(target_os = "macos") {
        dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Failed to get home directory"))?
            .join("Library")
            .join("Application Support")
            .join("plexnp")
    } else {
        dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Failed to get config directory"))?
            .join("plexnp")
    };

    Ok(config_dir.join("plexnp.db"))
}
