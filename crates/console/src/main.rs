use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared::Language;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod assist;
mod clipboard;
mod config;
mod connection;
mod editor;
mod endpoints;
mod exec;
mod panel;
mod reconnect;
mod router;
mod segment;
mod sink;
mod tui;

use api::ApiClient;
use assist::{AiAssistClient, GenerateOutcome};
use clipboard::SystemClipboard;
use config::Config;
use connection::ConnectionManager;
use editor::{BufferEditor, Editor, LanguageSelect};
use endpoints::Endpoints;
use exec::{ExecutionClient, RunOutcome};
use panel::{format_content, RenderedResponse, ResponsePanel, ResponseSink};
use router::MessageRouter;
use sink::{OutputBuffer, PrintSink};

#[derive(Parser)]
#[command(name = "codecraft")]
#[command(about = "Console client for the CodeCraft code runner and AI assistant")]
#[command(version)]
struct Cli {
    /// Server origin, e.g. https://play.example.com (overrides config)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Language (python, javascript, html, css; overrides config)
    #[arg(short, long, global = true)]
    language: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive console: editor, output, and AI panes (default)
    Console {
        /// File to load into the editor and save with Ctrl+S
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Run a file (or stdin) once and print the output
    Run {
        /// Source file; reads stdin when omitted
        file: Option<PathBuf>,
    },
    /// Ask the AI for code and print the segmented response
    Generate {
        /// What to generate
        prompt: String,
        /// Current code sent as context
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Append every returned code block to --file
        #[arg(long, requires = "file")]
        insert_all: bool,
    },
    /// Print server-pushed output until interrupted
    Listen,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a configuration value
    Set {
        /// Configuration key (server, language, reconnect.strategy, ...)
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Show all configuration
    Show,
    /// Get the config file path
    Path,
}

const DEFAULT_FILTER: &str = "codecraft=info";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let console_mode = matches!(cli.command, None | Some(Commands::Console { .. }));
    let _log_guard = init_tracing(console_mode)?;

    if let Some(Commands::Config { action }) = cli.command {
        return handle_config_command(action);
    }

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable config: {}", e);
        Config::default()
    });
    let origin = cli.server.clone().unwrap_or_else(|| config.server.origin.clone());
    let endpoints = Endpoints::from_origin(&origin)?;
    let explicit_language = cli.language.as_deref().map(str::parse::<Language>).transpose()?;

    match cli.command {
        None => run_console(&config, endpoints, explicit_language, None).await,
        Some(Commands::Console { file }) => {
            run_console(&config, endpoints, explicit_language, file).await
        }
        Some(Commands::Run { file }) => {
            let language = pick_language(explicit_language, file.as_deref(), &config);
            run_once(endpoints, language, file).await
        }
        Some(Commands::Generate {
            prompt,
            file,
            insert_all,
        }) => {
            let language = pick_language(explicit_language, file.as_deref(), &config);
            generate_once(endpoints, language, &prompt, file, insert_all).await
        }
        Some(Commands::Listen) => listen(&config, endpoints).await,
        Some(Commands::Config { .. }) => Ok(()),
    }
}

/// Logs go to stderr, or to a file while the console owns the terminal
fn init_tracing(to_file: bool) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    if to_file {
        let appender = tracing_appender::rolling::never(Config::log_dir()?, "codecraft.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        Ok(None)
    }
}

/// Explicit flag, then the file extension, then config
fn pick_language(explicit: Option<Language>, file: Option<&Path>, config: &Config) -> Language {
    explicit
        .or_else(|| {
            file.and_then(|p| p.extension())
                .and_then(|ext| Language::from_extension(&ext.to_string_lossy()))
        })
        .unwrap_or(config.editor.language)
}

fn read_source(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path.exists() => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        Some(_) => Ok(String::new()),
        None => Ok(String::new()),
    }
}

async fn run_console(
    config: &Config,
    endpoints: Endpoints,
    explicit_language: Option<Language>,
    file: Option<PathBuf>,
) -> Result<()> {
    let language = pick_language(explicit_language, file.as_deref(), config);
    let api = ApiClient::new(endpoints.clone());

    let editor = Arc::new(BufferEditor::new(read_source(file.as_deref())?));
    let language = Arc::new(LanguageSelect::new(language));
    let output = Arc::new(OutputBuffer::new());
    let panel = Arc::new(ResponsePanel::new());

    let exec = ExecutionClient::new(api.clone(), editor.clone(), language.clone(), output.clone());
    let assist = AiAssistClient::new(
        api,
        editor.clone(),
        language.clone(),
        panel.clone(),
        Arc::new(SystemClipboard),
    );

    // Push channel -> router -> panes
    let manager = connection_manager(config, &endpoints);
    let connection = manager.state();
    let (event_tx, event_rx) = mpsc::channel(256);
    let connection_task = manager.spawn(event_tx);
    let router = MessageRouter::new(output.clone(), panel.clone());
    let router_task = tokio::spawn(router.pump(event_rx));

    tracing::info!("Starting console against {}", endpoints.run);

    let ctx = tui::AppContext {
        editor,
        language,
        output,
        panel,
        exec,
        assist,
        connection,
        file,
    };
    let mut app = tui::App::new(ctx, tokio::runtime::Handle::current());
    let result = tokio::task::spawn_blocking(move || app.run()).await?;

    connection_task.abort();
    router_task.abort();

    result.context("Console terminal error")
}

async fn run_once(endpoints: Endpoints, language: Language, file: Option<PathBuf>) -> Result<()> {
    let code = match &file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut code = String::new();
            std::io::stdin().read_to_string(&mut code)?;
            code
        }
    };

    let output = Arc::new(OutputBuffer::new());
    let exec = ExecutionClient::new(
        ApiClient::new(endpoints),
        Arc::new(BufferEditor::new(code)),
        Arc::new(LanguageSelect::new(language)),
        output.clone(),
    );

    let outcome = exec.run_code().await;
    let text = output.text();
    if outcome == RunOutcome::Output {
        print!("{}", text);
        if !text.ends_with('\n') {
            println!();
        }
        Ok(())
    } else {
        eprint!("{}", text);
        std::process::exit(1);
    }
}

async fn generate_once(
    endpoints: Endpoints,
    language: Language,
    prompt: &str,
    file: Option<PathBuf>,
    insert_all: bool,
) -> Result<()> {
    let editor = Arc::new(BufferEditor::new(read_source(file.as_deref())?));
    let panel = Arc::new(ResponsePanel::new());
    let assist = AiAssistClient::new(
        ApiClient::new(endpoints),
        editor.clone(),
        Arc::new(LanguageSelect::new(language)),
        panel.clone(),
        Arc::new(SystemClipboard),
    );

    let outcome = assist.generate_code(prompt).await;
    if outcome == GenerateOutcome::Skipped {
        anyhow::bail!("Prompt is empty");
    }

    print!("{}", format_content(&panel.content()));

    match outcome {
        GenerateOutcome::Rendered => {
            if let (true, Some(path)) = (insert_all, file) {
                if assist.insert_all() {
                    std::fs::write(&path, editor.text())
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Inserted code into {}", path.display());
                } else {
                    eprintln!("No code blocks to insert");
                }
            }
            Ok(())
        }
        _ => std::process::exit(1),
    }
}

fn connection_manager(config: &Config, endpoints: &Endpoints) -> ConnectionManager {
    ConnectionManager::new(
        endpoints.channel.clone(),
        reconnect::from_config(&config.reconnect),
    )
    .with_connect_timeout(Duration::from_secs(config.reconnect.connect_timeout_secs))
}

/// Prints pushed AI responses as plain text
struct PrintResponses;

impl ResponseSink for PrintResponses {
    fn show_response(&self, response: &str) {
        let rendered = RenderedResponse::from_response(response);
        print!("{}", format_content(&panel::PanelContent::Rendered(rendered)));
    }

    fn show_error(&self, message: &str) {
        println!("{}", message);
    }
}

async fn listen(config: &Config, endpoints: Endpoints) -> Result<()> {
    let manager = connection_manager(config, &endpoints);
    let (event_tx, event_rx) = mpsc::channel(256);
    let connection_task = manager.spawn(event_tx);
    let router = MessageRouter::new(Arc::new(PrintSink), Arc::new(PrintResponses));

    eprintln!("Listening on {} (Ctrl+C to stop)", endpoints.channel);
    tokio::select! {
        _ = router.pump(event_rx) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
        }
    }

    connection_task.abort();
    Ok(())
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            let mut config = Config::load().unwrap_or_default();
            config.set(&key, &value)?;
            config.save()?;
            println!("Configuration saved");
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Show => {
            let config = Config::load()?;
            for key in config::KEYS {
                println!("{}: {}", key, config.get(key)?);
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
