use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use motomi_core::client::ChatCompletionsClient;
use motomi_core::context::token_counter::{token_limit, TokenCounter, DEFAULT_MODEL};
use motomi_core::context::{ChatMessage, ContextFitter};
use motomi_core::observability::setup_logging;
use motomi_core::{Agent, AgentKind, MotomiConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

#[derive(Parser)]
#[command(name = "motomi", about = "Token-budgeted conversations for the Mo-To-Mi agents")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count the tokens of a file (or stdin)
    Count {
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
        file: Option<PathBuf>,
    },
    /// Print the context window of a model
    Limit { model: String },
    /// Fit a JSON array of {role, content} messages into a token ceiling
    Fit {
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
        #[arg(long)]
        ceiling: usize,
        #[arg(long, default_value_t = 4)]
        recent: usize,
        file: Option<PathBuf>,
    },
    /// Show the token budget the config resolves to
    Status,
    /// Chat with one agent on stdin
    Chat {
        #[arg(long, default_value = "architect")]
        agent: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => MotomiConfig::load(path)
            .await
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => MotomiConfig::default(),
    };

    setup_logging(config.logging.format, &config.logging.filter);

    match cli.command {
        Command::Count { model, file } => {
            let text = read_input(file.as_deref()).await?;
            println!("{}", TokenCounter::new(&model).count_text(&text));
        }
        Command::Limit { model } => {
            println!("{}", token_limit(&model));
        }
        Command::Fit {
            model,
            ceiling,
            recent,
            file,
        } => {
            let input = read_input(file.as_deref()).await?;
            let messages: Vec<ChatMessage> =
                serde_json::from_str(&input).context("expected a JSON array of messages")?;
            let fitter = ContextFitter::new(recent, config.fitter.min_truncation_budget);
            let fitted = fitter.fit(&messages, ceiling, &model);
            println!("{}", serde_json::to_string_pretty(&fitted)?);
        }
        Command::Status => {
            let budget = config.budget.to_budget()?;
            println!("model: {}", budget.model());
            println!("max tokens: {}", budget.max_tokens());
            println!("usable tokens: {}", budget.usable_tokens());
            println!("warning at: {:.0}%", budget.warning_threshold() * 100.0);
            println!("summarize at: {:.0}%", budget.summarize_threshold() * 100.0);
        }
        Command::Chat { agent } => {
            let kind: AgentKind = agent.parse()?;
            let client = Arc::new(ChatCompletionsClient::from_config(&config.client)?);
            let agent = Agent::from_config(&config, kind, client)?;
            chat(agent).await?;
        }
    }

    Ok(())
}

async fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut input = String::new();
            tokio::io::stdin().read_to_string(&mut input).await?;
            Ok(input)
        }
    }
}

async fn chat(mut agent: Agent) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(
            format!(
                "{} ready. Type 'exit' to quit, 'status' for token usage, 'clear' to reset.\n",
                agent.profile().name
            )
            .as_bytes(),
        )
        .await?;

    loop {
        stdout.write_all(b"You: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit" | "bye") {
            break;
        }

        let output = match agent.handle_command(input) {
            Some(reply) => reply,
            None => match agent.respond(input).await {
                Ok(reply) => format!("Assistant: {}", reply),
                Err(e) => format!("Error: {}", e),
            },
        };
        stdout.write_all(format!("\n{}\n\n", output).as_bytes()).await?;
    }

    Ok(())
}
