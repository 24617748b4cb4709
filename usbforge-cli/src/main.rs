use clap::Parser;

mod build;
mod cli;
mod logging;
mod plan;
mod probe;
mod recipes;

fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = cli::Cli::parse();
    match &cli.command {
        cli::Command::Recipes => recipes::run()?,
        cli::Command::Plan {
            recipe,
            size_mib,
            device,
            json,
        } => plan::run(recipe, *size_mib, device.as_ref(), *json)?,
        cli::Command::Build {
            recipe,
            device,
            sources,
            dry_run,
            yes_i_know,
        } => build::run(recipe, device, sources, *dry_run, *yes_i_know)?,
    }
    Ok(())
}
