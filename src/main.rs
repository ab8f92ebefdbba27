//! prompt-enhancer - enhance prompts by category from the terminal

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use prompt_enhancer::app::EnhancerApp;
use prompt_enhancer::category::CategoryCatalog;
use prompt_enhancer::config::{load_api_token, Config, ConfigOptions};
use prompt_enhancer::enhancer::EnhancementClient;
use prompt_enhancer::http_logger::LOG_DIR;
use prompt_enhancer::{interactive, logging};
use tokio::io::BufReader;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "prompt-enhancer")]
#[command(about = "Enhance prompts with a text-generation API, one category at a time")]
struct Args {
    /// Config file (created with defaults if missing)
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Category definitions document
    #[arg(long, default_value = "config/prompts.json")]
    prompts: PathBuf,

    /// File providing API_TOKEN
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Override the API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Override requests per minute (0 disables rate limiting)
    #[arg(long)]
    rate_limit: Option<u32>,

    /// Override the number of attempts per request
    #[arg(long)]
    max_retries: Option<u32>,

    /// Override the request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Skip TLS certificate validation
    #[arg(long)]
    no_verify_tls: bool,

    /// Category to use (defaults to the first one in the prompts document)
    #[arg(long)]
    category: Option<String>,

    /// Enhance this prompt once, print the result and exit
    #[arg(long)]
    prompt: Option<String>,

    /// Print the available categories and exit
    #[arg(long)]
    list_categories: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOptions {
        ConfigOptions {
            base_url: self.base_url.clone(),
            rate_limit: self.rate_limit,
            max_retries: self.max_retries,
            timeout_secs: self.timeout,
            validate_ssl: self.no_verify_tls.then_some(false),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Dropped when main returns, which flushes the log file
    let _log_guard = match logging::init(Path::new(LOG_DIR), "prompt-enhancer") {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("A critical error occurred: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let catalog = CategoryCatalog::load(&args.prompts)
        .with_context(|| format!("error reading prompts file {:?}", args.prompts))?;

    if args.list_categories {
        for category in catalog.iter() {
            println!("{:<12} {}", category.key(), category.description());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let token = load_api_token(&args.env_file)?;
    let config = Config::load(&args.config, args.overrides())?;
    let max_history = config.max_history;

    let client = Arc::new(EnhancementClient::new(config, Arc::new(catalog))?);
    let mut app = EnhancerApp::new(client.clone(), token.clone(), max_history);

    if let Some(category) = &args.category {
        app.select_category(category)?;
    }

    info!("Using endpoint {}", client.endpoint_url());

    match &args.prompt {
        Some(prompt) => {
            let outcome = client
                .enhance(prompt, &token, app.active_category())
                .await;
            app.shutdown();
            match outcome.into_result() {
                Ok(text) => {
                    println!("{}", text);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    error!("Enhancement failed: {}", e);
                    eprintln!("Enhancement failed: {}", e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            interactive::run(app, stdin, &mut std::io::stdout()).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
