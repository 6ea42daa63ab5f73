mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parley_context::{
    count_tokens, with_system_message, ConversationTurn, HeuristicTokenCounter, HistoryWindower,
    InMemoryAttachments, SharedTokenCounter, TiktokenCounter, WindowOptions,
};
use parley_llm::{ChatClient, ChatRequest, DecoderOptions, SseChatClient};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Stream chat completions with a windowed conversation history")]
#[command(version)]
struct Cli {
    /// Conversation history as a JSON array of turns
    #[arg(long, short)]
    conversation: Option<PathBuf>,

    /// Attachment store as a JSON object of reference -> URL list
    #[arg(long)]
    attachments: Option<PathBuf>,

    /// Override the configured model
    #[arg(long, short)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token budget for a pending message
    Budget {
        /// Message content
        message: String,
    },
    /// Send a message and stream the reply
    Send {
        /// Message content
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(model) = cli.model.clone() {
        config.chat.model = model;
    }

    init_logging(&config);
    tracing::info!(model = %config.chat.model, "Starting parley");

    let history = match &cli.conversation {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };
    let windower = build_windower(&config, cli.attachments.as_deref()).await?;

    match cli.command {
        Commands::Budget { message } => {
            let report = count_tokens(&windower, &pending(&history), &message, &config.chat).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Send { message } => {
            let report = count_tokens(&windower, &pending(&history), &message, &config.chat).await;
            if report.is_over_budget() {
                tracing::warn!(remain = report.remain, "Sending an over-budget conversation");
            }

            let mut turns = history;
            turns.push(ConversationTurn::user(message));
            turns.push(ConversationTurn::loading());
            let window = windower.select_window(&turns).await;

            let client = SseChatClient::new(config.server_config())?.with_decoder_options(
                DecoderOptions::default().with_max_embedded_lines(config.server.max_embedded_lines),
            );
            let request = ChatRequest::new(
                config.chat.clone(),
                with_system_message(&config.chat, &window.messages),
            );
            stream_reply(&client, request).await?;
        }
    }

    Ok(())
}

/// History plus the placeholder slot of the response being prepared
fn pending(history: &[ConversationTurn]) -> Vec<ConversationTurn> {
    let mut turns = history.to_vec();
    turns.push(ConversationTurn::loading());
    turns
}

async fn stream_reply(client: &SseChatClient, request: ChatRequest) -> Result<()> {
    let (mut events, abort) = client.chat_stream_abortable(request);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Cancelled by user");
            abort.abort();
        }
    });

    let mut stdout = io::stdout();
    let mut finished = false;
    while let Some(item) = events.next().await {
        let delta = item.context("Chat stream failed")?;
        write!(stdout, "{}", delta.text)?;
        stdout.flush()?;
        finished = delta.is_finish;
    }
    writeln!(stdout)?;

    if !finished {
        tracing::warn!("Stream ended without a finish signal");
    }
    Ok(())
}

async fn build_windower(config: &Config, attachments: Option<&Path>) -> Result<HistoryWindower> {
    let counter: SharedTokenCounter = if config.window.tiktoken {
        Arc::new(TiktokenCounter::new().context("Failed to load tokenizer")?)
    } else {
        Arc::new(HeuristicTokenCounter::default())
    };

    let store = InMemoryAttachments::new();
    if let Some(path) = attachments {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read attachments from {}", path.display()))?;
        let entries: HashMap<String, Vec<String>> =
            serde_json::from_str(&raw).context("Attachment file must map references to URL lists")?;
        for (reference, urls) in entries {
            store.insert_urls(reference, &urls).await?;
        }
        tracing::debug!(count = store.len().await, "Loaded attachments");
    }

    let options = WindowOptions::new(config.chat.talk_count).reserved_tail(config.window.reserved_tail);
    Ok(HistoryWindower::new(options)
        .with_counter(counter)
        .with_resolver(Arc::new(store)))
}

fn load_history(path: &Path) -> Result<Vec<ConversationTurn>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read conversation from {}", path.display()))?;
    let turns: Vec<ConversationTurn> =
        serde_json::from_str(&raw).context("Conversation must be a JSON array of turns")?;
    tracing::debug!(turns = turns.len(), "Loaded conversation");
    Ok(turns)
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Logs go to stderr so streamed text on stdout stays clean
    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(io::stderr))
                .init();
        }
    }
}
