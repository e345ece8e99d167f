mod api;
mod backend;
mod config;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use runtime::{Agent, Message, ToolOutcome, arithmetic_registry};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backend::ModelBackend;
use config::Config;
use error::Result;

const CONFIG_FILE: &str = "abacus.toml";

#[derive(Parser)]
#[command(name = "abacus")]
#[command(about = "A tool-calling arithmetic agent served over HTTP", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the agent over HTTP
    Serve,
    /// Run the agent once and print its answer
    Ask {
        /// The question to ask
        input: String,
        /// Also print every message of the run
        #[arg(short, long)]
        transcript: bool,
    },
    /// Print the registered tool schemas
    Tools,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=info,runtime=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Some(Commands::Serve) | None => cmd_serve(config).await,
        Some(Commands::Ask { input, transcript }) => cmd_ask(config, &input, transcript).await,
        Some(Commands::Tools) => cmd_tools(),
    }
}

fn build_agent(config: &Config) -> Result<Agent<ModelBackend>> {
    let backend = ModelBackend::from_config(config)?;
    info!(
        %backend,
        max_rounds = config.agent.max_rounds,
        prompt_version = runtime::prompt::PROMPT_VERSION,
        "agent configured"
    );
    Ok(Agent::builder(backend, arithmetic_registry().map_err(runtime::Error::from)?)
        .max_rounds(config.agent.max_rounds)
        .build())
}

async fn cmd_serve(config: Config) -> Result<()> {
    let agent = build_agent(&config)?;
    let shutdown = CancellationToken::new();
    let app = api::router(api::AppState::new(agent, shutdown.clone()));

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutting down");
                shutdown.cancel();
            }
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

async fn cmd_ask(config: Config, input: &str, show_transcript: bool) -> Result<()> {
    let agent = build_agent(&config)?;
    let outcome = agent.run(input).await?;

    if show_transcript {
        for message in outcome.transcript.messages() {
            print_message(message);
        }
        println!();
    }
    println!("{}", outcome.output);
    Ok(())
}

fn cmd_tools() -> Result<()> {
    let registry = arithmetic_registry().map_err(runtime::Error::from)?;
    let schemas = api::tool_schemas(&registry);
    println!("{}", serde_json::to_string_pretty(&schemas)?);
    Ok(())
}

fn print_message(message: &Message) {
    match message {
        Message::User { content } => println!("USER: {content}"),
        Message::Assistant {
            content,
            tool_calls,
        } => {
            if !content.is_empty() {
                println!("ASSISTANT: {content}");
            }
            for call in tool_calls {
                let arguments = serde_json::Value::Object(call.arguments.clone());
                println!("TOOL CALL [{}]: {} {arguments}", call.id, call.tool_name);
            }
        }
        Message::ToolResult(result) => {
            let label = match result.outcome {
                ToolOutcome::Success { .. } => "TOOL RESULT",
                ToolOutcome::Error { .. } => "TOOL ERROR",
            };
            println!("{label} [{}]: {}", result.call_id, result.outcome.content());
        }
    }
}
