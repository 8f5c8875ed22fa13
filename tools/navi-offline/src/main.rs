//! Command-line host for the Navi offline cache router.
//!
//! Wires the router to the real network so its decisions can be inspected
//! from a terminal.
//!
//! ## Usage
//!
//! ```bash
//! # Show how URLs are classified
//! navi-offline classify http://localhost:3000/api/jobs /assets/app.css
//!
//! # Serve URLs through the router, then again with the network cut
//! navi-offline fetch --offline-after / /api/jobs
//!
//! # Install, activate, and print cache status
//! navi-offline status --config navi.json
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use navi_common::{init_logging, LogConfig, LogFormat};
use navi_net::{Fetch, HttpFetcher, LoaderConfig, NetError, Request, Response};
use navi_sw::{Classifier, OfflineRouter, RouterConfig, SW_CACHED_HEADER};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "navi-offline")]
#[command(about = "Offline cache router for the Navi career assistant", version)]
struct Cli {
    /// Router configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the request class of each URL
    Classify {
        /// Absolute URLs or paths relative to the configured origin
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Install, activate, and serve each URL through the router
    Fetch {
        /// Absolute URLs or paths relative to the configured origin
        #[arg(required = true)]
        urls: Vec<String>,
        /// Serve every URL a second time with the network disabled
        #[arg(long)]
        offline_after: bool,
    },

    /// Install, activate, and print cache status as JSON
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(log_config(cli.verbose, cli.json_logs));

    let config = match &cli.config {
        Some(path) => RouterConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RouterConfig::default(),
    };

    match cli.command {
        Commands::Classify { urls } => {
            config.validate()?;
            let classifier = Classifier::from_config(&config);
            for raw in &urls {
                let url = config.resolve(raw)?;
                println!("{:<10} {}", classifier.classify(&url).as_str(), url);
            }
        }

        Commands::Fetch {
            urls,
            offline_after,
        } => {
            let (router, network) = build_router(config)?;
            start(&router).await?;

            for raw in &urls {
                print_outcome(&serve(&router, &network, raw).await?);
            }

            if offline_after {
                network.set_online(false);
                println!("-- network disabled --");
                for raw in &urls {
                    print_outcome(&serve(&router, &network, raw).await?);
                }
            }
        }

        Commands::Status => {
            let (router, _) = build_router(config)?;
            start(&router).await?;
            let status = router.cache_status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

fn log_config(verbose: bool, json: bool) -> LogConfig {
    let format = if json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    if verbose {
        // Router crates at debug; HTTP client internals stay quiet.
        LogConfig {
            level: Level::DEBUG,
            format,
            include_location: true,
            ..Default::default()
        }
        .with_filter("debug,hyper=info,hyper_util=info,reqwest=info")
    } else {
        LogConfig {
            level: Level::WARN,
            format,
            ..Default::default()
        }
    }
}

fn build_router(config: RouterConfig) -> Result<(OfflineRouter, Arc<Switchable>)> {
    let http = HttpFetcher::new(LoaderConfig::default()).context("building HTTP client")?;
    let network = Arc::new(Switchable::new(http));
    let router = OfflineRouter::in_memory(config, network.clone())?;
    Ok((router, network))
}

/// Run install and, once it succeeds, activation.
async fn start(router: &OfflineRouter) -> Result<()> {
    router.on_install().await.context("install failed")?;
    if router.should_activate_immediately() {
        let report = router.on_activate().await;
        info!(deleted = ?report.deleted, claimed = report.claimed, "Activated");
    }
    Ok(())
}

/// Where a response came from.
#[derive(Debug, Clone, Copy)]
enum Source {
    Network,
    Cache,
    Fallback,
    Passthrough,
    Error,
}

impl Source {
    fn as_str(self) -> &'static str {
        match self {
            Source::Network => "network",
            Source::Cache => "cache",
            Source::Fallback => "fallback",
            Source::Passthrough => "passthrough",
            Source::Error => "error",
        }
    }
}

#[derive(Debug)]
struct Outcome {
    url: String,
    class: String,
    status: Option<u16>,
    source: Source,
    bytes: usize,
}

async fn serve(router: &OfflineRouter, network: &Switchable, raw: &str) -> Result<Outcome> {
    let url = router.config().resolve(raw)?;
    let class = router.classify(&url).as_str().to_string();
    let request = Request::get(url.clone());

    let before = network.counts();
    let result = router.on_fetch(&request).await;
    router.background().wait_idle().await;
    let (attempts, failures) = network.counts_since(before);

    let outcome = match result {
        Ok(Some(response)) => Outcome {
            url: url.to_string(),
            class,
            status: Some(response.status.as_u16()),
            source: source_of(&response, attempts, failures),
            bytes: response.body.len(),
        },
        Ok(None) => Outcome {
            url: url.to_string(),
            class,
            status: None,
            source: Source::Passthrough,
            bytes: 0,
        },
        Err(e) => {
            info!(url = %url, error = %e, "Request failed");
            Outcome {
                url: url.to_string(),
                class,
                status: None,
                source: Source::Error,
                bytes: 0,
            }
        }
    };
    Ok(outcome)
}

fn source_of(response: &Response, attempts: usize, failures: usize) -> Source {
    if attempts == 0 {
        Source::Cache
    } else if failures == 0 {
        Source::Network
    } else if response.header(SW_CACHED_HEADER).is_some() {
        Source::Cache
    } else {
        Source::Fallback
    }
}

fn print_outcome(outcome: &Outcome) {
    let status = outcome
        .status
        .map_or_else(|| "---".to_string(), |s| s.to_string());
    println!(
        "{:<10} {:>3} {:<11} {:>8}B  {}",
        outcome.class,
        status,
        outcome.source.as_str(),
        outcome.bytes,
        outcome.url
    );
}

/// Network that can be cut off, counting attempts and failures.
struct Switchable {
    inner: HttpFetcher,
    online: AtomicBool,
    attempts: AtomicUsize,
    failures: AtomicUsize,
}

impl Switchable {
    fn new(inner: HttpFetcher) -> Self {
        Self {
            inner,
            online: AtomicBool::new(true),
            attempts: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn counts(&self) -> (usize, usize) {
        (
            self.attempts.load(Ordering::SeqCst),
            self.failures.load(Ordering::SeqCst),
        )
    }

    fn counts_since(&self, (attempts, failures): (usize, usize)) -> (usize, usize) {
        let (now_attempts, now_failures) = self.counts();
        (now_attempts - attempts, now_failures - failures)
    }
}

#[async_trait]
impl Fetch for Switchable {
    async fn fetch(&self, request: &Request) -> std::result::Result<Response, NetError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let result = if self.online.load(Ordering::SeqCst) {
            self.inner.fetch(request).await
        } else {
            Err(NetError::RequestFailed("network disabled".to_string()))
        };
        if result.is_err() {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        result
    }
}
