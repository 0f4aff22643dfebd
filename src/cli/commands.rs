use crate::config::{MvcConfig, RuntimeConfig};
use crate::mvc::MvcBuilder;
use crate::server::{AppService, HttpServer, ServerHandle};
use crate::view::{ViewFolderParser, Views, DEFAULT_VIEWS_SUFFIX};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Command-line interface for brrtmvc
#[derive(Parser)]
#[command(name = "brrtmvc", version)]
#[command(about = "Controller/action MVC dispatch on may_minihttp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the views folder and static mount from a config file
    ///
    /// No controllers are bound, so every page answers with the configured
    /// not-found view. Useful to check layouts and static assets.
    Serve {
        /// YAML config file; `BRRTMVC_*` variables override it
        #[arg(short, long, env = "BRRTMVC_CONFIG")]
        config: Option<PathBuf>,

        /// Address and port to bind, overrides the config
        #[arg(long)]
        addr: Option<String>,
    },
    /// Print the Controller → Action → view table of a views folder
    Views {
        /// Views root, one subdirectory per controller
        dir: PathBuf,

        /// View file suffix
        #[arg(long, default_value = DEFAULT_VIEWS_SUFFIX)]
        suffix: String,
    },
}

pub fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { config, addr } => serve(config.as_deref(), addr),
        Commands::Views { dir, suffix } => {
            let views = ViewFolderParser::new(dir.clone())
                .with_suffix(suffix)
                .parse()
                .with_context(|| format!("cannot parse views folder {}", dir.display()))?;
            let stdout = io::stdout();
            print_views(&views, &mut stdout.lock())?;
            Ok(())
        }
    }
}

fn serve(config_path: Option<&Path>, addr: Option<String>) -> Result<()> {
    let mut config = MvcConfig::load(config_path).context("cannot load configuration")?;
    if let Some(addr) = addr {
        config.server.addr = addr;
    }

    let runtime = RuntimeConfig::from_env();
    may::config().set_stack_size(runtime.stack_size);
    info!(stack_size = runtime.stack_size, "Coroutine runtime configured");

    let mut builder = MvcBuilder::new();
    builder.apply_config(&config)?;
    let mvc = Arc::new(builder.build());

    let handle = HttpServer(AppService::new(mvc))
        .start(config.server.addr.as_str())
        .with_context(|| format!("cannot bind {}", config.server.addr))?;
    wait_for_shutdown(handle)
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("cannot install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutting down");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> Result<()> {
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("server coroutine panicked"))
}

/// Write one line per view: `Controller/Action  content  [master]  [+include ..]`.
pub fn print_views(views: &Views, out: &mut impl Write) -> io::Result<()> {
    for (controller, action, descriptor) in views.entries() {
        write!(
            out,
            "{controller}/{action}\t{}",
            descriptor.content.display()
        )?;
        if let Some(master) = &descriptor.master_page {
            write!(out, "\tmaster={}", master.display())?;
        }
        for include in &descriptor.additional {
            write!(out, "\t+{}", include.display())?;
        }
        writeln!(out)?;
    }
    Ok(())
}
