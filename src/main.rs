use anyhow::{Context, Result};
use clap::Parser;
use sloth_tracker::aggregator::Aggregator;
use sloth_tracker::cli::{Cli, ReportFormat};
use sloth_tracker::config::TrackerConfig;
use sloth_tracker::observer::{ReplayObserver, XdotoolObserver};
use sloth_tracker::persistence::ForestStore;
use sloth_tracker::render;
use sloth_tracker::scheduler::{RunSummary, Scheduler};
use sloth_tracker::segmenter::TitleSegmenter;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` forces trace level
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Print the stored forest, sorted, in the requested format
fn print_report(store: &ForestStore, format: ReportFormat) -> Result<()> {
    let mut forest = store
        .load()
        .with_context(|| format!("Failed to load {}", store.path().display()))?;
    forest.sort_descending_by_time();

    match format {
        ReportFormat::Text => print!("{}", render::render_text(&forest)),
        ReportFormat::Json => println!("{}", render::render_json(&forest)?),
    }
    Ok(())
}

/// Resolves once Ctrl-C is received
async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Cannot listen for Ctrl-C; stop the process to exit");
        std::future::pending::<()>().await;
    }
}

fn track(args: &Cli, config: &TrackerConfig, store: &ForestStore) -> Result<RunSummary> {
    let forest = store
        .load_or_recover()
        .with_context(|| format!("Failed to load {}", store.path().display()))?;
    let mut aggregator = Aggregator::new(
        forest,
        TitleSegmenter::new(&config.noise_tokens),
        config.attribution,
    );
    tracing::info!(
        path = %store.path().display(),
        roots = aggregator.forest().roots().len(),
        interval_ms = config.sample_interval_ms,
        autosave_ticks = config.autosave_ticks,
        attribution = ?aggregator.attribution(),
        "Tracking started"
    );
    let scheduler = Scheduler::from_config(config).with_show_tree(args.show_tree);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start scheduler runtime")?;

    let summary = match &args.replay {
        Some(path) => {
            let mut observer = ReplayObserver::from_file(path)?;
            runtime.block_on(scheduler.run(&mut aggregator, &mut observer, store, ctrl_c()))
        }
        None => {
            let mut observer = XdotoolObserver::new();
            runtime.block_on(scheduler.run(&mut aggregator, &mut observer, store, ctrl_c()))
        }
    };
    Ok(summary)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let mut config = match &args.config {
        Some(path) => TrackerConfig::from_toml(path)?,
        None => TrackerConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.validate().map_err(anyhow::Error::msg)?;

    let store = config.store()?;

    if args.report {
        return print_report(&store, args.format);
    }

    let summary = track(&args, &config, &store)?;
    tracing::info!(
        ticks = summary.ticks,
        recorded = summary.recorded,
        skipped = summary.skipped,
        saves = summary.saves,
        failed_saves = summary.failed_saves,
        final_save_ok = summary.final_save_ok,
        "Tracking stopped"
    );

    if !summary.final_save_ok {
        anyhow::bail!("Final save to {} failed", store.path().display());
    }

    Ok(())
}
