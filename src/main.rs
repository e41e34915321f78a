//! `leafpress` CLI: a thin composition root around the content graph
//! pipeline in `lib.rs`.
//!
//! `build` runs the full pipeline once (C8). `watch` runs it once, then
//! starts a file watcher feeding the incremental rebuilder (C9) and a
//! minimal static file server with a live-reload SSE endpoint — both
//! external collaborators the core pipeline neither knows about nor
//! depends on.

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use clap::{Parser, Subcommand};
use leafpress::incremental::FileChange;
use leafpress::{BuildOptions, Config};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

mod watcher;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the garden's `leafpress.json`. The content root is its
    /// parent directory.
    #[arg(short, long, default_value = "leafpress.json")]
    config: PathBuf,

    /// Include pages whose frontmatter sets `draft: true`.
    #[arg(long)]
    include_drafts: bool,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full build pipeline once and exit.
    Build {
        /// Override the configured output directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build once, then watch the content root and rebuild incrementally,
    /// serving the output over HTTP with live reload.
    Watch {
        /// Override the configured output directory.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the configured port.
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        match &cli.command {
            Command::Build { output } => run_build(&cli, output.clone()),
            Command::Watch { output, port } => run_watch(&cli, output.clone(), *port).await,
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn setup_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| format!("leafpress={default_level}").into());

    let formatter = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339())
        .with_span_events(FmtSpan::CLOSE);

    if cfg!(debug_assertions) {
        formatter.pretty().init();
    } else {
        formatter.init();
    }
}

/// The content root is the directory containing the config file.
fn resolve_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn log_report(report: &leafpress::BuildReport) {
    info!(pages_written = report.pages_written, warnings = report.warnings.len(), "build complete");
    for warning in &report.warnings {
        warn!("{warning}");
    }
}

fn run_build(cli: &Cli, output_override: Option<PathBuf>) -> leafpress::Result<()> {
    let root = resolve_root(&cli.config);
    let config = Config::load_and_validate(&cli.config)?;
    let output_dir = output_override.unwrap_or_else(|| root.join(&config.output_dir));

    let opts = BuildOptions { include_drafts: cli.include_drafts };
    let (report, _cache) = leafpress::build(&root, &output_dir, config, opts)?;
    log_report(&report);
    Ok(())
}

async fn run_watch(cli: &Cli, output_override: Option<PathBuf>, port_override: Option<u16>) -> leafpress::Result<()> {
    let root = resolve_root(&cli.config);
    let config = Config::load_and_validate(&cli.config)?;
    let output_dir = output_override.unwrap_or_else(|| root.join(&config.output_dir));
    let port = port_override.unwrap_or(config.port);

    let opts = BuildOptions { include_drafts: cli.include_drafts };
    let (report, mut cache) = leafpress::build(&root, &output_dir, config, opts)?;
    cache.config_path = Some(cli.config.clone());
    log_report(&report);

    let mut fs_watcher = watcher::Watcher::new();
    fs_watcher.start(&root)?;
    let mut changes = fs_watcher.subscribe();

    let (reload_tx, _) = broadcast::channel::<()>(16);
    let reload_tx_for_rebuilds = reload_tx.clone();

    let rebuild_task = tokio::task::spawn_blocking(move || {
        loop {
            match changes.blocking_recv() {
                Ok(change) => apply_change(&mut cache, change, &reload_tx_for_rebuilds),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "watcher fell behind, some changes were coalesced");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let app = Router::new()
        .route("/__livereload", get(move || livereload_handler(reload_tx.clone())))
        .fallback_service(tower_http::services::ServeDir::new(&output_dir));

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|e| leafpress::LeafpressError::io(Path::new(&format!("127.0.0.1:{port}")), e))?;
    info!(port, output = %output_dir.display(), "dev server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| leafpress::LeafpressError::io(Path::new("dev server"), std::io::Error::other(e)))?;

    rebuild_task.abort();
    Ok(())
}

fn apply_change(cache: &mut leafpress::BuildCache, change: FileChange, reload_tx: &broadcast::Sender<()>) {
    match leafpress::rebuild(cache, change) {
        Ok(report) => {
            log_report(&report);
            let _ = reload_tx.send(());
        }
        Err(err) => error!("incremental rebuild failed: {err}"),
    }
}

async fn livereload_handler(reload_tx: broadcast::Sender<()>) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = reload_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| msg.ok().map(|_| Ok(Event::default().data("reload"))));
    Sse::new(stream).keep_alive(KeepAlive::default())
}
