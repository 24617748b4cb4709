use crate::{probe, recipes};
use anyhow::{bail, Result};
use std::path::PathBuf;
use usbforge_build::planner::{plan, DEFAULT_START_OFFSET_MIB};

pub fn run(
    recipe_arg: &str,
    size_mib: Option<u64>,
    device: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let recipe = recipes::load(recipe_arg)?;
    let size_bytes = match (size_mib, device) {
        (Some(mib), _) => mib * 1024 * 1024,
        (None, Some(dev)) => probe::probe_device(dev)?.size_bytes,
        (None, None) => bail!("pass either --size-mib or --device"),
    };

    let layout = plan(&recipe.partitions, size_bytes, DEFAULT_START_OFFSET_MIB)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&layout)?);
        return Ok(());
    }

    println!(
        "{} on a {} MiB device ({} table):",
        recipe.name,
        size_bytes / (1024 * 1024),
        recipe.scheme
    );
    for p in &layout {
        println!(
            "  {}. {:<16} {:>8} MiB  [{:>6}..{:>6}]  {}{}",
            p.number,
            p.name,
            p.size_mib(),
            p.start_mib,
            p.end_mib,
            p.fs,
            if p.bootable { "  *boot*" } else { "" }
        );
    }
    Ok(())
}
