use super::repl::{parse_line, render, ReplInput};
use crate::client::HttpSearchClient;
use crate::config::SearchConfig;
use crate::controller::{SearchController, SearchHandle};
use crate::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::types::ViewMode;
use anyhow::{Context, Result};
use clap::Parser;
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

/// storefront-search - incremental product search from the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Search API root, e.g. https://shop.example/api/
    #[arg(long)]
    pub base_url: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// File holding recent searches and view mode
    #[arg(long, conflicts_with = "no_persist")]
    pub state_file: Option<PathBuf>,

    /// Keep recent searches and view mode in memory only
    #[arg(long)]
    pub no_persist: bool,

    /// Initial URL query string, e.g. "q=lamp&sort=price_asc"
    #[arg(long)]
    pub query: Option<String>,

    /// Delay between simulated keystrokes for `:type`
    #[arg(long, default_value_t = 60)]
    pub keystroke_ms: u64,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    fn resolve_config(&self) -> Result<SearchConfig> {
        let mut config =
            SearchConfig::load(self.config.as_deref()).context("Failed to load configuration")?;
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(state_file) = &self.state_file {
            config.state_file = Some(state_file.clone());
        }
        if self.no_persist {
            config.state_file = None;
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

/// CLI entry point
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level.as_str()))
        .init();

    let config = cli.resolve_config()?;
    debug!("Using configuration: {:?}", config);

    let storage: Arc<dyn KeyValueStore> = match &config.state_file {
        Some(path) => {
            debug!("Persisting client state to {}", path.display());
            Arc::new(FileStore::new(path.clone()))
        }
        None => Arc::new(MemoryStore::new()),
    };
    let api = Arc::new(
        HttpSearchClient::new(&config.base_url)
            .with_context(|| format!("Invalid base url {}", config.base_url))?,
    );

    let (controller, inbox) = SearchController::new(config, api, storage);
    let handle = SearchHandle::spawn(controller, inbox);

    let printer = tokio::spawn(print_views(handle.subscribe()));
    if let Some(query) = &cli.query {
        handle.navigate(query.clone())?;
    }

    let result = read_commands(&handle, Duration::from_millis(cli.keystroke_ms)).await;

    handle.shutdown().await?;
    printer.abort();
    result
}

async fn read_commands(handle: &SearchHandle, keystroke: Duration) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let input = match parse_line(&line) {
            Ok(input) => input,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        match input {
            ReplInput::Quit => break,
            ReplInput::Command(command) => handle.send(command)?,
            ReplInput::Type(text) => {
                // One SetTerm per keystroke, like a text box would emit
                let mut typed = String::new();
                for ch in text.chars() {
                    typed.push(ch);
                    handle.set_term(typed.clone())?;
                    tokio::time::sleep(keystroke).await;
                }
            }
            ReplInput::ToggleView => {
                let view = handle.snapshot().await?;
                let next = match view.view_mode {
                    ViewMode::Grid => ViewMode::List,
                    ViewMode::List => ViewMode::Grid,
                };
                handle.set_view_mode(next)?;
                println!("view: {}", next.as_str());
            }
            ReplInput::ShowRecent => {
                let view = handle.snapshot().await?;
                if view.recent.is_empty() {
                    println!("no recent searches");
                }
                for (i, term) in view.recent.iter().enumerate() {
                    println!("{:>2}. {}", i + 1, term);
                }
            }
            ReplInput::ShowUrl => {
                let view = handle.snapshot().await?;
                println!("?{}", view.query_string);
            }
            ReplInput::ShowView => {
                let view = handle.snapshot().await?;
                for line in render(&view) {
                    println!("{}", line);
                }
            }
        }
    }
    Ok(())
}

/// Print the rendered view whenever it changes
async fn print_views(mut views: tokio::sync::watch::Receiver<crate::controller::view::SearchView>) {
    let mut last: Vec<String> = Vec::new();
    while views.changed().await.is_ok() {
        let rendered = render(&views.borrow_and_update());
        if rendered != last {
            for line in &rendered {
                println!("{}", line);
            }
            println!();
            last = rendered;
        }
    }
}
