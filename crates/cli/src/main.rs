//! pageveil CLI - replay a loading-overlay session against a simulated page.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use pageveil_core::{LibraryEvent, LoaderConfig, PageSignal, SessionOutcome};
use pageveil_overlay::{construct, Construction, LoaderHandle, SessionRegistry};
use pageveil_sim::SimPage;
use tokio::time::sleep;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pageveil")]
#[command(about = "Loading overlay session simulator", long_about = None)]
struct Cli {
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario and print the effect timeline
    Run(RunArgs),
    /// Print the default configuration as JSON
    Config,
}

#[derive(Args)]
struct RunArgs {
    /// Simulate the landing page (fixed-duration mode)
    #[arg(long)]
    landing: bool,

    /// Emit a library `done` event at this many milliseconds
    #[arg(long = "done-at", value_name = "MS")]
    done_at: Vec<u64>,

    /// Emit a library `start` event at this many milliseconds
    #[arg(long = "start-at", value_name = "MS")]
    start_at: Vec<u64>,

    /// Fire `pagehide` at this many milliseconds
    #[arg(long = "pagehide-at", value_name = "MS")]
    pagehide_at: Option<u64>,

    /// Remove the overlay element behind the loader's back
    #[arg(long = "remove-overlay-at", value_name = "MS")]
    remove_overlay_at: Option<u64>,

    /// Install the progress library late
    #[arg(long = "library-delay", value_name = "MS")]
    library_delay: Option<u64>,

    /// Insert the progress container late
    #[arg(long = "container-delay", value_name = "MS")]
    container_delay: Option<u64>,

    /// Load timings from a JSON file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    overrides: Overrides,
}

/// Per-run overrides applied on top of the loaded configuration.
#[derive(Args)]
struct Overrides {
    /// Readiness poll interval
    #[arg(long = "poll-ms", value_name = "MS")]
    poll: Option<u64>,

    /// Landing-page display duration
    #[arg(long = "primary-ms", value_name = "MS")]
    primary: Option<u64>,

    /// Grace between the landing-page duration and its fallback
    #[arg(long = "fallback-grace-ms", value_name = "MS")]
    fallback_grace: Option<u64>,

    /// Fallback deadline on regular pages
    #[arg(long = "completion-fallback-ms", value_name = "MS")]
    completion_fallback: Option<u64>,

    /// Fade-out length
    #[arg(long = "fade-ms", value_name = "MS")]
    fade: Option<u64>,

    /// Selector of the progress container
    #[arg(long = "container-selector", value_name = "SELECTOR")]
    container_selector: Option<String>,
}

impl Overrides {
    fn apply(&self, mut config: LoaderConfig) -> LoaderConfig {
        let millis = Duration::from_millis;
        if let Some(poll) = self.poll {
            config = config.with_poll_interval(millis(poll));
        }
        if let Some(primary) = self.primary {
            config = config.with_primary_duration(millis(primary));
        }
        if let Some(grace) = self.fallback_grace {
            config = config.with_fallback_grace(millis(grace));
        }
        if let Some(deadline) = self.completion_fallback {
            config = config.with_completion_fallback(millis(deadline));
        }
        if let Some(fade) = self.fade {
            config = config.with_fade_duration(millis(fade));
        }
        if let Some(selector) = &self.container_selector {
            config = config.with_container_selector(selector.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => run(args).await?,
        Commands::Config => println!("{}", LoaderConfig::default().to_json()?),
    }

    Ok(())
}

async fn run(args: RunArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => LoaderConfig::from_json_file(path)?,
        None => LoaderConfig::default(),
    };
    let config = args.overrides.apply(config);
    let fade = config.fade_duration;

    let page = Arc::new(
        SimPage::builder()
            .landing(args.landing)
            .container_selector(config.container_selector.clone())
            .library_installed(args.library_delay.is_none())
            .container_present(args.container_delay.is_none())
            .build(),
    );
    let registry = SessionRegistry::new();

    let (handle, task) = match construct(page.clone(), &registry, config) {
        Construction::Created { handle, task } => (handle, task),
        Construction::Existing(handle) => bail!("session {} already running", handle.id()),
    };
    info!(session = %handle.id(), landing = args.landing, "session constructed");

    schedule(&page, &handle, &args);

    if args.pagehide_at.is_none() {
        // Let the fade finish, then leave the page.
        if handle.hidden().await.is_some() {
            sleep(fade + Duration::from_millis(50)).await;
        }
        leave(&page, &handle, PageSignal::PageHide);
    }

    let outcome = task.await?;

    println!("Timeline:");
    for recorded in page.effects() {
        println!("  {}", recorded);
    }
    print_outcome(outcome, args.json)?;

    Ok(())
}

fn schedule(page: &Arc<SimPage>, handle: &LoaderHandle, args: &RunArgs) {
    for &at in &args.start_at {
        after(at, {
            let page = page.clone();
            move || {
                page.emit(LibraryEvent::Start);
            }
        });
    }
    for &at in &args.done_at {
        after(at, {
            let page = page.clone();
            move || {
                page.emit(LibraryEvent::Done);
            }
        });
    }
    if let Some(at) = args.remove_overlay_at {
        after(at, {
            let page = page.clone();
            move || {
                page.remove_overlay();
            }
        });
    }
    if let Some(at) = args.library_delay {
        after(at, {
            let page = page.clone();
            move || page.install_library()
        });
    }
    if let Some(at) = args.container_delay {
        after(at, {
            let page = page.clone();
            move || page.insert_container()
        });
    }
    if let Some(at) = args.pagehide_at {
        after(at, {
            let page = page.clone();
            let handle = handle.clone();
            move || leave(&page, &handle, PageSignal::PageHide)
        });
    }
}

fn after(millis: u64, action: impl FnOnce() + Send + 'static) {
    tokio::spawn(async move {
        sleep(Duration::from_millis(millis)).await;
        action();
    });
}

/// Page listeners exist only after setup, so fall back to the handle.
fn leave(page: &SimPage, handle: &LoaderHandle, signal: PageSignal) {
    if page.signal(signal) == 0 {
        debug!(%signal, "no page listeners yet, notifying session directly");
        handle.notify_page(signal);
    }
}

fn print_outcome(outcome: Option<SessionOutcome>, json: bool) -> Result<()> {
    let Some(outcome) = outcome else {
        println!("Session ended without hiding");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("Outcome:");
    println!("  Cause: {}", outcome.cause);
    println!("  Elapsed: {}ms", outcome.elapsed.as_millis());
    println!("  Forced: {}", outcome.forced);
    Ok(())
}
