use anyhow::{Context, Result};
use clap::Parser;
use rss_aggregator::config::Config;
use rss_aggregator::i18n::Messages;
use rss_aggregator::render::{OutputFormat, TerminalRenderer};
use rss_aggregator::Aggregator;
use std::path::PathBuf;
use std::rc::Rc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::LocalSet;
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser, Debug)]
#[command(
    name = "rss-aggregator",
    about = "Subscribe to RSS/Atom feeds and print new posts as they appear"
)]
struct Args {
    /// Feed URLs to subscribe to at startup
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Config file (default: ~/.config/rss-aggregator/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seconds between refresh cycles (overrides config)
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,

    /// Message language, "en" or "ru" (overrides config)
    #[arg(long)]
    locale: Option<String>,

    /// Print one JSON object per line instead of text
    #[arg(long)]
    json: bool,

    /// Do not read further feed URLs from stdin
    #[arg(long)]
    no_stdin: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rss_aggregator=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    // Single-threaded: the store is shared via Rc between local tasks
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let result = LocalSet::new().block_on(&rt, run(args, config));

    // A blocking stdin read may still be parked; don't wait for it
    rt.shutdown_background();
    result
}

fn load_config(args: &Args) -> Result<Config> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };

    let mut config = Config::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    if let Some(secs) = args.interval {
        config.refresh_interval_secs = secs;
    }
    if let Some(locale) = &args.locale {
        config.locale = locale.clone();
    }
    config.validate().context("Invalid configuration")?;

    Ok(config)
}

async fn run(args: Args, config: Config) -> Result<()> {
    let messages = Messages::new(config.locale()?);
    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let aggregator = Rc::new(Aggregator::from_config(&config).context("Invalid user_agent")?);

    let mut renderer = TerminalRenderer::new(std::io::stdout(), messages, format);
    aggregator.subscribe(move |path, state| {
        if let Err(e) = renderer.render(path, state) {
            tracing::warn!(error = %e, "Failed to render state change");
        }
    });

    // Failures are rendered from form state; nothing more to do here
    for url in config.feeds.iter().chain(&args.urls) {
        let _ = aggregator.submit(url).await;
    }

    let scheduler = Rc::new(aggregator.scheduler(config.refresh_interval()));
    let poller = tokio::task::spawn_local({
        let scheduler = Rc::clone(&scheduler);
        async move { scheduler.run(None).await }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = !args.no_stdin;

    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        let reader = stdin_open.then_some(&mut lines);
        let next_line = async move {
            match reader {
                Some(lines) => lines.next_line().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            line = next_line => match line {
                Ok(Some(line)) => {
                    let url = line.trim().to_owned();
                    if url.is_empty() {
                        continue;
                    }
                    let aggregator = Rc::clone(&aggregator);
                    tokio::task::spawn_local(async move {
                        let _ = aggregator.submit(&url).await;
                    });
                }
                Ok(None) => {
                    tracing::debug!("stdin closed, no further submissions");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin");
                    stdin_open = false;
                }
            }
        }
    }

    scheduler.stop();
    let cycles = poller.await.context("Polling task failed")?;

    let state = aggregator.snapshot();
    tracing::info!(
        cycles,
        feeds = state.feeds.len(),
        posts = state.posts.len(),
        "Stopped"
    );
    Ok(())
}
