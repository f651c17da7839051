use std::sync::Arc;

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    tokio::io::{AsyncBufReadExt, AsyncWriteExt},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    parlor_broker::{MemoryBroker, builtin_registry},
    parlor_channels::{ChannelRelay, builtin_agents, render_text},
    parlor_chat::{ChatBot, builtin_policies},
    parlor_config::Settings,
    parlor_messages::RequestMessage,
    parlor_runtime::{Component, Runnable, WorkerPool},
};

#[derive(Parser)]
#[command(name = "parlor", about = "Parlor — broker-mediated chat dispatch")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the TOML settings file.
    #[arg(long, global = true, env = "PARLOR_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chat dispatcher workers (default when no subcommand given).
    Serve {
        /// Number of concurrent worker tasks (overrides the settings file).
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Run the channel relay that delivers responses back to the platform.
    Channel {
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Chat with the configured policy directly from the terminal.
    Chat,
    /// Print the effective settings.
    Config,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    match &cli.config {
        Some(path) => {
            Settings::load(path).with_context(|| format!("loading {}", path.display()))
        }
        None => Ok(Settings::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);
    let settings = load_settings(&cli)?;

    match cli.command {
        None | Some(Commands::Serve { workers: None }) => serve(&settings, settings.workers).await,
        Some(Commands::Serve {
            workers: Some(workers),
        }) => serve(&settings, workers).await,
        Some(Commands::Channel { workers }) => {
            channel(&settings, workers.unwrap_or(settings.workers)).await
        }
        Some(Commands::Chat) => chat(&settings).await,
        Some(Commands::Config) => {
            let rendered = toml::to_string_pretty(&settings)?;
            print!("{rendered}");
            Ok(())
        }
    }
}

/// Resolve broker + policy and drive the dispatcher until a signal drains
/// the pool.
async fn serve(settings: &Settings, workers: usize) -> anyhow::Result<()> {
    let broker = builtin_registry().resolve(&settings.broker.name, &settings.broker.args)?;
    let policy = builtin_policies().resolve(&settings.policy.name, &settings.policy.args)?;
    info!(
        broker = %settings.broker.name,
        policy = %settings.policy.name,
        workers,
        "starting chat dispatcher"
    );

    let bot = Arc::new(ChatBot::new(broker, policy));
    WorkerPool::new(workers).run(bot as Arc<dyn Runnable>).await?;
    Ok(())
}

/// Resolve broker + channel agent and drain responses until drained.
async fn channel(settings: &Settings, workers: usize) -> anyhow::Result<()> {
    let broker = builtin_registry().resolve(&settings.broker.name, &settings.broker.args)?;
    let agent = builtin_agents().resolve(&settings.channel.name, &settings.channel.args)?;
    info!(
        broker = %settings.broker.name,
        channel = %settings.channel.name,
        workers,
        "starting channel relay"
    );

    let relay = Arc::new(ChannelRelay::new(broker, agent));
    WorkerPool::new(workers).run(relay as Arc<dyn Runnable>).await?;
    Ok(())
}

/// Standalone REPL: stdin → policy → stdout, no broker round-trip.
async fn chat(settings: &Settings) -> anyhow::Result<()> {
    let policy = builtin_policies().resolve(&settings.policy.name, &settings.policy.args)?;
    policy.initialize().await?;

    // The direct-call path never touches the broker; a default memory
    // broker satisfies the constructor without being initialized.
    let bot = ChatBot::new(Arc::new(MemoryBroker::default()), Arc::clone(&policy));

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let message = RequestMessage::text("cli_user", line);
        let response = bot.chat(&message.conversation_key(), &message).await;
        if let Some(text) = render_text(&response) {
            stdout.write_all(text.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
        }
    }

    policy.finalize().await?;
    Ok(())
}
