//! LCSX command-line entry point.

mod cli;
mod console;
mod logging;
mod prompt;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use console::ConsoleProgress;
use lcsx::net::Fetcher;
use lcsx::runtime::LcsxContext;
use lcsx::{
    Architecture, AutoSetup, Configuration, DataLayout, LcsxRuntime, PrepareOutcome, SetupSource,
};
use prompt::{Announce, ConsolePrompt};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Keep guard alive until the end of main so buffered records are flushed
    let _log_guard = match logging::init(cli.log_level, cli.log_file.as_deref()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            console::error(format!("Logging disabled: {e:#}"));
            None
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            console::error(format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let options = cli.run_options();
    let default_layout = DataLayout::new(DataLayout::default_data_dir());
    let layout = options
        .data_dir
        .clone()
        .map(DataLayout::new)
        .unwrap_or_else(|| default_layout.clone());

    let fetcher = Fetcher::with_defaults()
        .context("Failed to initialize HTTP client")?
        .with_observer(Arc::new(ConsoleProgress::new()));
    let ctx = LcsxContext::new(layout, fetcher, Architecture::host()?);
    tracing::info!(
        data_dir = %ctx.layout().data_dir().display(),
        arch = %ctx.arch(),
        "LCSX starting"
    );

    let mut source: Box<dyn SetupSource> = if cli.auto {
        Box::new(Announce::new(
            AutoSetup,
            "No configuration found. Running automatic setup...",
        ))
    } else {
        Box::new(Announce::new(
            ConsolePrompt::stdio(),
            "No configuration found. Starting interactive setup...",
        ))
    };

    let mut runtime = LcsxRuntime::new(ctx, default_layout, options);
    let config = runtime.prepare(source.as_mut())?;
    report(runtime.outcome(), &config);

    let status = runtime.launch(&config)?;
    tracing::info!(%status, "LCSX finished");
    Ok(())
}

/// Tell the operator which path `prepare` actually took.
fn report(outcome: Option<PrepareOutcome>, config: &Configuration) {
    let terminal_changed = match outcome {
        Some(PrepareOutcome::Created) => {
            console::status("Setup complete. Starting LCSX...");
            return;
        }
        Some(PrepareOutcome::Migrated { terminal_changed }) => {
            console::status(format!(
                "Configuration migrated to {}.",
                config.data_dir.display()
            ));
            terminal_changed
        }
        Some(PrepareOutcome::Existing { terminal_changed }) => terminal_changed,
        None => return,
    };
    if let Some(kind) = terminal_changed {
        console::status(format!("Terminal service updated to {kind}."));
    }
    console::status(format!(
        "Configuration found. Starting LCSX for user '{}' on '{}'...",
        config.user, config.hostname
    ));
}
