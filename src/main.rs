use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use legal_qa::{
    cli::{execute_command, Cli, Commands},
    config::{Config, LogFormat},
    langbase::LangbaseClient,
    storage::SqliteStorage,
    Assistant,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "legal-qa starting");

    // Initialize storage
    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            Arc::new(s)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    // Initialize Langbase client
    let langbase = match LangbaseClient::new(
        &config.langbase,
        &config.assistant.pipe,
        config.request.clone(),
    ) {
        Ok(c) => {
            info!(
                base_url = %config.langbase.base_url,
                pipe = %c.pipe_name(),
                api_key_set = config.langbase.api_key.is_some(),
                "Langbase client initialized"
            );
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Langbase client");
            return Err(e.into());
        }
    };

    // Only commands that talk to the model need the pipe
    if matches!(cli.command, Commands::Ask { .. } | Commands::Chat) {
        if let Err(e) = langbase.ensure_pipe(&config.assistant).await {
            error!(error = %e, "Failed to ensure answering pipe exists");
            return Err(e.into());
        }
    }

    let mut assistant = Assistant::new(Arc::new(langbase), storage.clone(), &config.assistant.pipe)
        .with_invocation_log(storage);
    if let Err(e) = assistant.load().await {
        error!(error = %e, "Failed to load documents");
        return Err(e.into());
    }

    let result = execute_command(cli.command, &mut assistant).await;
    if !result.message.is_empty() {
        if result.exit_code == 0 {
            println!("{}", result.message);
        } else {
            eprintln!("{}", result.message);
        }
    }
    std::process::exit(result.exit_code);
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
