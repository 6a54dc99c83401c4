//! Inliner - compose, CSS-inline and minify HTML email templates.

use anyhow::{Context, Result, bail};
use clap::Parser;
use inliner::{
    app::AppContext,
    cli::{Cli, Commands},
    config::InlinerConfig,
    inline::Inliner,
    live::LogSink,
    log,
    merge::MergerRegistry,
    pipeline::Pipeline,
    utils::category::{is_source_file, normalize_path},
    watch,
};
use rayon::prelude::*;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, mpsc},
};
use walkdir::WalkDir;

/// Infix for outputs written next to their source.
const OUT_INFIX: &str = "out";

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = InlinerConfig::load(&cli)?;

    match &cli.command {
        Commands::Build { files } => build_all(&config, files),
        Commands::Watch => watch_all(config),
    }
}

/// Inline every requested template once, in parallel.
fn build_all(config: &InlinerConfig, files: &[PathBuf]) -> Result<()> {
    let sources = if files.is_empty() {
        collect_sources(&config.build.source)
    } else {
        files.iter().map(|file| normalize_path(file)).collect()
    };

    let inliner = Inliner::new();
    let failed = sources
        .par_iter()
        .filter(|source| {
            let destination = destination(config, source);
            match inliner.process(source, Some(&destination)) {
                Ok(_) => {
                    log!("build"; "{}", rel_path(&destination, &config.root));
                    false
                }
                Err(e) => {
                    log!("error"; "{}: {e}", rel_path(source, &config.root));
                    true
                }
            }
        })
        .count();

    if failed > 0 {
        bail!("{failed} of {} templates failed", sources.len());
    }
    log!("build"; "inlined {} templates", sources.len());
    Ok(())
}

/// Every `*.html` directly inside `dir`, skipping earlier `.out.html` results.
fn collect_sources(dir: &Path) -> Vec<PathBuf> {
    let out_suffix = format!(".{OUT_INFIX}.html");
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file() && is_source_file(entry.path()))
        .filter(|entry| !entry.file_name().to_string_lossy().ends_with(&out_suffix))
        .map(|entry| normalize_path(entry.path()))
        .collect()
}

/// `<output>/<name>`, or `<stem>.out.html` beside the source.
fn destination(config: &InlinerConfig, source: &Path) -> PathBuf {
    match (&config.build.output, source.file_name()) {
        (Some(output), Some(name)) => output.join(name),
        _ => source.with_extension(format!("{OUT_INFIX}.html")),
    }
}

/// Format path as relative to root for log display.
fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

/// Load everything, then rebuild on change until Ctrl+C.
fn watch_all(config: InlinerConfig) -> Result<()> {
    let app = AppContext::new(config, &MergerRegistry::with_builtin(), Arc::new(LogSink))?;
    let mut pipeline = Pipeline::new(app);
    pipeline.initial_load();
    let handle = watch::spawn(pipeline)?;

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        log!("watch"; "shutting down...");
        let _ = tx.send(());
    })
    .context("Failed to set Ctrl+C handler")?;

    // Either a signal or a dropped handler ends the wait.
    let _ = rx.recv();
    handle.stop()?;
    Ok(())
}
