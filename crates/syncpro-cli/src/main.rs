mod chat;
mod config;

use chat::{
    describe_error, export_to, render_exchange, render_history, render_models, ChatLoop,
};
use clap::{Parser, Subcommand};
use config::SyncproConfig;
use std::path::PathBuf;
use std::sync::Arc;
use syncpro_agent::{
    ChatService, GeminiBackend, GoogleTranslateClient, ModelCatalog, ModelOption, Orchestrator,
    RetryingBackend, MISSING_API_KEY,
};
use syncpro_core::SyncproError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "syncpro", about = "SyncPro: multilingual chat over Gemini")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "syncpro.toml")]
    config: PathBuf,

    /// Transcript database (overrides config and DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Keep the transcript in memory only; nothing is read or written on disk
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat
    Chat {
        /// Model label (see `syncpro models`)
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Send one message and print the answer
    Send {
        text: String,
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Print the stored transcript
    History,
    /// Write the transcript to a text file
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete the stored transcript
    Clear,
    /// List the available models
    Models,
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// The pipeline, or `None` when no API key is configured.
fn build_orchestrator(config: &SyncproConfig) -> anyhow::Result<Option<Orchestrator>> {
    let Some(api_key) = config.generation.api_key() else {
        return Ok(None);
    };
    let gemini = GeminiBackend::new(api_key, &config.generation)?;
    let policy = config.generation.retry_policy.clone().unwrap_or_default();
    let generator = Arc::new(RetryingBackend::new(Box::new(gemini), policy));
    let translate = Arc::new(GoogleTranslateClient::new(&config.translation)?);
    Ok(Some(Orchestrator::new(translate.clone(), translate, generator)))
}

fn resolve_model(
    requested: Option<&str>,
    config: &SyncproConfig,
    catalog: &ModelCatalog,
) -> anyhow::Result<ModelOption> {
    let model = match requested {
        Some(label) => catalog.get(label)?,
        None => config.default_model(catalog)?,
    };
    Ok(model.clone())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env may carry RUST_LOG, so it is loaded before tracing starts.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = SyncproConfig::load(&cli.config)?;
    config.apply_env(|k| std::env::var(k).ok());
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    let catalog = config.catalog()?;
    let store = config.open_store(cli.ephemeral)?;

    match cli.command {
        Commands::Chat { model } => {
            let model = resolve_model(model.as_deref(), &config, &catalog)?;
            let orchestrator = build_orchestrator(&config)?;
            let service = ChatService::open(orchestrator, store, catalog).await?;
            if !service.is_configured() {
                eprintln!("{MISSING_API_KEY}");
            }
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            ChatLoop::new(service, model)
                .run(stdin, &mut std::io::stdout())
                .await?;
        }
        Commands::Send { text, model } => {
            let model = resolve_model(model.as_deref(), &config, &catalog)?;
            let orchestrator = build_orchestrator(&config)?;
            let mut service = ChatService::open(orchestrator, store, catalog).await?;
            match service.send(&text, &model.label).await {
                Ok(exchange) => print!("{}", render_exchange(&exchange)),
                Err(e) => {
                    if let (SyncproError::Persistence(_), Some(last)) =
                        (&e, service.history().last())
                    {
                        print!("{}", render_exchange(last));
                    }
                    eprintln!("{}", describe_error(&e));
                    std::process::exit(1);
                }
            }
        }
        Commands::History => {
            print!("{}", render_history(&store.list_all().await?));
        }
        Commands::Export { output } => {
            let service = ChatService::open(None, store, catalog).await?;
            match export_to(&service, output.as_deref())? {
                Some(path) => println!("Exported to {}", path.display()),
                None => eprintln!("{}", chat::NOTHING_TO_EXPORT),
            }
        }
        Commands::Clear => {
            store.clear_all().await?;
            println!("Chat cleared.");
        }
        Commands::Models => {
            let default = config.default_model(&catalog)?;
            print!("{}", render_models(&catalog, &default.label));
        }
    }

    Ok(())
}
