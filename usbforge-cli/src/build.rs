use crate::{probe, recipes};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use usbforge_build::{
    BuildOutcome, BuildRequest, PipelineRunner, ProgressUpdate, SourceFileSet,
};
use usbforge_hal::LinuxHal;

pub fn run(
    recipe_arg: &str,
    device_path: &PathBuf,
    source_args: &[String],
    dry_run: bool,
    yes_i_know: bool,
) -> Result<()> {
    let recipe = recipes::load(recipe_arg)?;
    let sources = parse_sources(source_args)?;
    let device = probe::probe_device(device_path)?;

    if !dry_run && !yes_i_know {
        bail!(
            "building onto {} wipes it completely; re-run with --yes-i-know to confirm",
            device_path.display()
        );
    }

    let runner = PipelineRunner::new(Arc::new(LinuxHal::new()));
    let handle = runner
        .submit(BuildRequest {
            device,
            recipe,
            sources,
            profile: None,
            dry_run,
            confirmed: yes_i_know,
        })
        .context("spawn build worker")?;

    while let Ok(update) = handle.progress().recv() {
        match update {
            ProgressUpdate::StateStarted {
                state, step, total, ..
            } => println!("[{}/{}] {}", step, total, state),
            ProgressUpdate::Status(line) => println!("    {}", line),
            ProgressUpdate::StateCompleted { .. } => {}
            ProgressUpdate::Completed => println!("done."),
            ProgressUpdate::Failed(reason) => println!("failed: {}", reason),
            ProgressUpdate::Cancelled => println!("cancelled."),
        }
    }

    match handle.await_outcome() {
        BuildOutcome::Completed { .. } => Ok(()),
        BuildOutcome::Cancelled { .. } => bail!("build cancelled"),
        BuildOutcome::Failed(report) => {
            for line in &report.log_tail {
                log::error!("{}", line);
            }
            for line in &report.rollback_failures {
                log::error!("rollback incomplete: {}", line);
            }
            bail!("build failed during {}: {}", report.state, report.error)
        }
    }
}

fn parse_sources(args: &[String]) -> Result<SourceFileSet> {
    let mut sources = SourceFileSet::new();
    for arg in args {
        let (key, path) = arg
            .split_once('=')
            .with_context(|| format!("bad --source '{}', expected KEY=PATH", arg))?;
        if key.is_empty() || path.is_empty() {
            bail!("bad --source '{}', expected KEY=PATH", arg);
        }
        sources.insert(key, PathBuf::from(path));
    }
    Ok(sources)
}
