//! Sift command-line interface.
//!
//! Usage:
//!   sift [repl]                          Interactive question loop
//!   sift ask "<query>" [--format json]   Answer one question and exit
//!   sift serve [--bind 0.0.0.0:5000]     HTTP API with query routing

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sift_runtime::{
    CompletionClient, GoogleScraper, GroqClient, ProgressSink, QueryDispatcher, SearchFanout,
    Settings, SettingsOverrides, WorkflowEngine,
};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod repl;
mod server;

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Answer questions by iteratively searching the web")]
#[command(version)]
struct Cli {
    /// Groq API key (overrides GROQ_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Maximum answer attempts per query
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// Search results fetched per generated query
    #[arg(long, global = true)]
    results_per_query: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<f64>,

    /// Completion model
    #[arg(long, global = true)]
    model: Option<String>,

    /// Sampling temperature
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Maximum tokens per completion
    #[arg(long, global = true)]
    max_tokens: Option<u32>,

    /// YAML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive question loop (default)
    Repl,

    /// Answer a single question
    Ask {
        /// The question
        query: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl Cli {
    fn overrides(&self) -> Result<SettingsOverrides> {
        let request_timeout = match self.timeout {
            Some(secs) => match Duration::try_from_secs_f64(secs) {
                Ok(timeout) if !timeout.is_zero() => Some(timeout),
                _ => anyhow::bail!("--timeout must be a positive number of seconds, got {}", secs),
            },
            None => None,
        };

        Ok(SettingsOverrides {
            api_key: self.api_key.clone(),
            debug: self.debug.then_some(true),
            max_attempts: self.max_retries,
            search_results_per_query: self.results_per_query,
            request_timeout,
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tolerant_evaluation: None,
            bind_addr: match &self.command {
                Some(Commands::Serve { bind }) => *bind,
                _ => None,
            },
        })
    }
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())
        .context("Failed to load settings")?
        .with_overrides(cli.overrides()?);
    settings.validate()?;

    let serving = matches!(cli.command, Some(Commands::Serve { .. }));
    init_tracing(settings.verbose, serving);

    let client: Arc<dyn CompletionClient> = Arc::new(GroqClient::new(
        settings.require_api_key()?.clone(),
        settings.completion_config(),
    )?);
    let scraper = GoogleScraper::from_settings(&settings)?;
    let search = SearchFanout::from_settings(Arc::new(scraper), &settings);
    let engine = WorkflowEngine::from_settings(client.clone(), search, &settings);

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            repl::run(&engine, None, stdin, &mut stdout).await?;
        }
        Commands::Ask { query, format } => {
            let query = query.trim();
            anyhow::ensure!(!query.is_empty(), "Query must not be empty");

            let progress: Option<&dyn ProgressSink> = match format {
                OutputFormat::Text => Some(&repl::print_attempt),
                OutputFormat::Json | OutputFormat::Yaml => None,
            };
            let result = engine.answer(query, None, progress).await;
            let mut stdout = std::io::stdout();
            match format {
                OutputFormat::Text => writeln!(stdout, "{}", repl::render_result(&result))?,
                OutputFormat::Json => writeln!(stdout, "{}", serde_json::to_string_pretty(&result)?)?,
                OutputFormat::Yaml => write!(stdout, "{}", serde_yaml::to_string(&result)?)?,
            }
        }
        Commands::Serve { .. } => {
            let dispatcher = QueryDispatcher::new(client, engine);
            server::serve(settings.bind_addr, Arc::new(dispatcher)).await?;
        }
    }

    Ok(())
}

/// `RUST_LOG` wins. Otherwise verbose means debug; the server logs at info
/// and the console commands stay quiet at warn.
fn init_tracing(verbose: bool, serving: bool) {
    let default = match (verbose, serving) {
        (true, _) => "sift=debug,sift_runtime=debug,sift_core=debug,tower_http=debug",
        (false, true) => "sift=info,sift_runtime=info,tower_http=info",
        (false, false) => "warn",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_repl() {
        let cli = Cli::parse_from(["sift"]);
        assert!(cli.command.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn test_global_flags_become_overrides() {
        let cli = Cli::parse_from([
            "sift",
            "ask",
            "capital of France",
            "--max-retries",
            "5",
            "--timeout",
            "2.5",
            "--debug",
            "--format",
            "json",
        ]);
        let overrides = cli.overrides().unwrap();

        assert_eq!(overrides.max_attempts, Some(5));
        assert_eq!(overrides.request_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(overrides.debug, Some(true));
        assert!(matches!(
            cli.command,
            Some(Commands::Ask { format: OutputFormat::Json, .. })
        ));
    }

    #[test]
    fn test_serve_bind_override() {
        let cli = Cli::parse_from(["sift", "serve", "--bind", "0.0.0.0:8080"]);
        let overrides = cli.overrides().unwrap();
        assert_eq!(overrides.bind_addr, Some("0.0.0.0:8080".parse().unwrap()));
    }

    #[test]
    fn test_rejects_non_positive_timeout() {
        for timeout in ["0", "-1", "1e300", "inf"] {
            let flag = format!("--timeout={}", timeout);
            let cli = Cli::parse_from(["sift", flag.as_str()]);
            assert!(cli.overrides().is_err(), "accepted --timeout {}", timeout);
        }
    }
}
