use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use collaboard_agent::label::label_for;
use collaboard_agent::llm::stream::NoopCallbacks;
use collaboard_agent::llm::types::LlmError;
use collaboard_agent::llm::{LlmChat, LlmClient, StreamCallbacks};
use collaboard_agent::services::{Agent, AgentConfig, AgentError, Summarizer, ToolExecutor};
use collaboard_agent::state::{BoardObject, MemoryStore, Rect};
use collaboard_agent::template::{TemplateCatalog, TemplateError, YamlCatalog, parse_dsl};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("LLM client not configured: {0}")]
    Llm(#[from] LlmError),
    #[error("agent failed: {0}")]
    Agent(#[from] AgentError),
    #[error("template catalog failed to load: {0}")]
    Catalog(#[from] TemplateError),
    #[error("cannot read board file {path}: {source}")]
    BoardFile { path: PathBuf, source: std::io::Error },
    #[error("invalid board JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid viewport `{0}`; expected x,y,width,height")]
    InvalidViewport(String),
    #[error("`{0}` is not a UUID")]
    InvalidUuid(String),
}

#[derive(Parser, Debug)]
#[command(name = "collaboard-agent", about = "Drive a CollabBoard with natural language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one prompt against an in-memory board and print the result.
    Prompt {
        text: String,
        /// JSON array of board objects to seed the board with.
        #[arg(long)]
        board: Option<PathBuf>,
        /// Visible window as x,y,width,height.
        #[arg(long)]
        viewport: Option<String>,
        /// Extra context appended to the system prompt.
        #[arg(long)]
        context: Option<String>,
        /// Use the non-streaming endpoint (no extended thinking).
        #[arg(long)]
        no_stream: bool,
    },
    /// Apply template DSL to an in-memory board without a model.
    Dsl {
        text: String,
        /// Print the parsed operations instead of applying them.
        #[arg(long)]
        parse_only: bool,
    },
    /// Search the template catalog.
    Templates { query: Option<String> },
    /// Print the three-word label for an object id.
    Label { id: String },
}

/// Echoes streamed text to stdout as it arrives.
struct PrintCallbacks;

impl StreamCallbacks for PrintCallbacks {
    fn on_text(&mut self, _index: usize, delta: &str) {
        print!("{delta}");
        if let Err(e) = std::io::stdout().flush() {
            tracing::debug!(error = %e, "stdout flush failed");
        }
    }

    fn on_tool_start(&mut self, _index: usize, _id: &str, name: &str) {
        eprintln!("[tool] {name}");
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "no .env file loaded");
    }

    let cli = Cli::parse();
    match cli.command {
        Command::Prompt { text, board, viewport, context, no_stream } => {
            run_prompt(&text, board, viewport.as_deref(), context.as_deref(), no_stream).await
        }
        Command::Dsl { text, parse_only } => run_dsl(&text, parse_only).await,
        Command::Templates { query } => run_templates(query.as_deref()),
        Command::Label { id } => {
            let label = label_for(&id).ok_or(CliError::InvalidUuid(id))?;
            println!("{label}");
            Ok(())
        }
    }
}

async fn run_prompt(
    text: &str,
    board: Option<PathBuf>,
    viewport: Option<&str>,
    context: Option<&str>,
    no_stream: bool,
) -> Result<(), CliError> {
    let objects: Vec<BoardObject> = match board {
        Some(path) => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| CliError::BoardFile { path, source })?;
            serde_json::from_str(&raw)?
        }
        None => Vec::new(),
    };
    let store = Arc::new(MemoryStore::with_objects(objects));
    if let Some(raw) = viewport {
        store.set_viewport(Some(parse_viewport(raw)?)).await;
    }

    let client = LlmClient::from_env()?;
    tracing::info!(model = client.model(), "LLM client initialized");
    let mut config = AgentConfig::from_env();
    if no_stream {
        config.stream = false;
    }

    let summary_model = client.summary_model().to_owned();
    let llm: Arc<dyn LlmChat> = Arc::new(client);
    let summarizer = Summarizer { llm: llm.clone(), model: summary_model, max_tokens: config.summary_max_tokens };
    let executor = ToolExecutor::new(store.clone(), Arc::new(YamlCatalog::builtin()?)).with_summarizer(summarizer);
    let stream = config.stream;
    let agent = Agent::new(llm, executor, config);

    let reply = if stream {
        let reply = agent.handle_prompt(text, Vec::new(), context, &mut PrintCallbacks).await?;
        println!();
        reply
    } else {
        let reply = agent.handle_prompt(text, Vec::new(), context, &mut NoopCallbacks).await?;
        println!("{}", reply.text);
        reply
    };

    let summary = json!({
        "rounds": reply.rounds,
        "toolCalls": reply.tool_calls,
        "inputTokens": reply.input_tokens,
        "outputTokens": reply.output_tokens,
        "objects": store.sorted_objects().await,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn run_dsl(text: &str, parse_only: bool) -> Result<(), CliError> {
    if parse_only {
        for op in parse_dsl(text) {
            println!("{op:?}");
        }
        return Ok(());
    }
    let store = Arc::new(MemoryStore::new());
    let executor = ToolExecutor::new(store.clone(), Arc::new(YamlCatalog::builtin()?));
    let result = match executor.execute("applyTemplate", &json!({ "dsl": text, "x": 0, "y": 0 })).await {
        Ok(result) => result,
        Err(e) => e.to_result(),
    };
    let summary = json!({ "result": result, "objects": store.sorted_objects().await });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_templates(query: Option<&str>) -> Result<(), CliError> {
    let catalog = YamlCatalog::builtin()?;
    let entries = match query {
        Some(q) => collaboard_agent::template::catalog::search(&catalog, q),
        None => catalog.entries().iter().collect(),
    };
    for entry in entries {
        println!("{:<16} {}", entry.name, entry.description);
    }
    Ok(())
}

fn parse_viewport(raw: &str) -> Result<Rect, CliError> {
    let parts: Result<Vec<f64>, _> = raw.split(',').map(|p| p.trim().parse::<f64>()).collect();
    match parts.as_deref() {
        Ok([x, y, width, height]) if *width > 0.0 && *height > 0.0 => {
            Ok(Rect { x: *x, y: *y, width: *width, height: *height })
        }
        _ => Err(CliError::InvalidViewport(raw.to_owned())),
    }
}
