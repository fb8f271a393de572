use crate::app::{App, Core};
use crate::runtime_config::Options;
use crate::server;
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Command-line interface for chainrouter
#[derive(Parser, Debug)]
#[command(name = "chainrouter")]
#[command(about = "chainrouter demo server", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Serve the demo application
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: String,

        /// YAML options file; replaces CHAINR_* environment options
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Template directory
        #[arg(long)]
        views: Option<PathBuf>,

        /// Log every request and print the route table
        #[arg(long, default_value_t = false)]
        debug: bool,

        /// Enable ETag generation
        #[arg(long, default_value_t = false)]
        etag: bool,
    },
    /// Print the demo route table and auto-registration banner
    Routes {
        /// YAML options file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Options from the config file (or the environment), then CLI overrides
///
/// # Errors
///
/// Returns an error when the config file cannot be read or parsed.
pub fn resolve_options(
    config: Option<&Path>,
    views: Option<&Path>,
    debug: bool,
    etag: bool,
) -> anyhow::Result<Options> {
    let mut options = match config {
        Some(path) => Options::from_yaml_file(path)?,
        None => Options::from_env(),
    };
    if let Some(views) = views {
        options.views_dir = Some(views.to_path_buf());
    }
    options.debug |= debug;
    options.etag |= etag;
    Ok(options)
}

/// Run a parsed command line against the application built by `build_app`
///
/// # Errors
///
/// Propagates configuration, build and bind failures.
pub fn run_cli<F>(cli: Cli, build_app: F) -> anyhow::Result<()>
where
    F: Fn(Options) -> App,
{
    match cli.command {
        Commands::Serve {
            addr,
            config,
            views,
            debug,
            etag,
        } => {
            let options = resolve_options(config.as_deref(), views.as_deref(), debug, etag)?;
            may::config().set_stack_size(options.stack_size);
            let core = build_app(options).build().context("failed to build router")?;
            print_routes(&core);
            serve(Arc::new(core), &addr)
        }
        Commands::Routes { config } => {
            let options = resolve_options(config.as_deref(), None, false, false)?;
            let core = build_app(options).build().context("failed to build router")?;
            print!("{}", core.banner());
            core.routes().dump_routes();
            Ok(())
        }
    }
}

fn print_routes(core: &Core) {
    if !core.auto_routes().is_empty() {
        print!("{}", core.banner());
    }
    if core.options().debug {
        core.routes().dump_routes();
    }
}

fn serve(core: Arc<Core>, addr: &str) -> anyhow::Result<()> {
    let handle = server::serve(Arc::clone(&core), addr)
        .with_context(|| format!("failed to bind {addr}"))?;
    println!("Started server on {}", handle.addr());

    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals =
            Signals::new([SIGINT, SIGTERM]).context("failed to install signal handlers")?;
        if let Some(signal) = signals.forever().next() {
            info!(
                signal = signal,
                requests = core.metrics().request_count(),
                not_found = core.metrics().not_found_count(),
                errors = core.metrics().error_count(),
                "Shutting down"
            );
        }
        handle.stop();
        Ok(())
    }

    #[cfg(not(unix))]
    {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("server coroutine panicked"))
    }
}
