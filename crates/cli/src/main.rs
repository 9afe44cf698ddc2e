//! Expense agent command line
//!
//! `chat` runs an interactive session against an organization directory;
//! `say` sends one message and prints the reply as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use expense_agent_agent::{AgentReply, ExpenseAgent};
use expense_agent_config::AgentSettings;
use expense_agent_core::OrgDirectory;
use expense_agent_llm::{OllamaCompletionService, OllamaConfig};
use expense_agent_persistence::{InMemoryConversationStore, InMemoryTransactionSink};

const DEFAULT_DIRECTORY_PATH: &str = "config/directory.json";

#[derive(Parser, Debug)]
#[command(name = "expense-agent")]
#[command(author, version, about = "Record expenses from Portuguese chat messages", long_about = None)]
struct Cli {
    /// Settings file (YAML or TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Organization directory (JSON)
    #[arg(short, long, global = true, default_value = DEFAULT_DIRECTORY_PATH)]
    directory: PathBuf,

    /// Conversation key, usually the sender's phone number
    #[arg(short, long, global = true, default_value = "local")]
    user: String,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive session (default)
    Chat,
    /// Send one message and print the reply
    Say {
        /// Message text
        message: String,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "expense_agent=info,warn".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_directory(path: &Path) -> Result<OrgDirectory> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading directory {}", path.display()))?;
    let directory: OrgDirectory = serde_json::from_str(&content)
        .with_context(|| format!("parsing directory {}", path.display()))?;
    tracing::info!(
        cost_centers = directory.cost_centers.len(),
        cards = directory.cards.len(),
        categories = directory.categories.len(),
        "Loaded directory"
    );
    Ok(directory)
}

fn build_agent(settings: &AgentSettings) -> Result<ExpenseAgent> {
    let store = Arc::new(InMemoryConversationStore::new(settings.dialogue.ttl()));
    let sink = Arc::new(InMemoryTransactionSink::new());
    let agent = ExpenseAgent::new(settings, store, sink)?;

    if !settings.completion.enabled {
        return Ok(agent);
    }
    let service = OllamaCompletionService::new(OllamaConfig::from(&settings.completion))?;
    tracing::info!(
        endpoint = %service.config().endpoint,
        model = %service.config().model,
        "Completion service enabled"
    );
    Ok(agent.with_completion(Arc::new(service)))
}

fn print_reply(reply: &AgentReply) {
    println!("< {}", reply.text);
}

async fn chat(agent: &ExpenseAgent, user: &str, directory: &OrgDirectory) -> Result<()> {
    println!("Descreva uma despesa. Ctrl-D ou :q para sair.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == ":q" || line == ":quit" {
            break;
        }
        match agent.handle_message(user, line, directory).await {
            Ok(reply) => print_reply(&reply),
            Err(e) => tracing::error!(error = %e, "Turn failed"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let settings = AgentSettings::load(cli.config.as_deref())?;
    let directory = load_directory(&cli.directory)?;
    let agent = build_agent(&settings)?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(&agent, &cli.user, &directory).await?,
        Command::Say { message } => {
            let reply = agent.handle_message(&cli.user, &message, &directory).await?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
    }

    Ok(())
}
