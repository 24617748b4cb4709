use anyhow::{bail, Result};
use std::path::Path;
use usbforge_build::{DeploymentRecipe, PartitionSize};

/// Resolve a recipe argument: a path to a JSON file, or a built-in
/// matched by (case-insensitive) name or deployment type.
pub fn load(arg: &str) -> Result<DeploymentRecipe> {
    let path = Path::new(arg);
    if path.exists() {
        return DeploymentRecipe::load(path);
    }
    let wanted = arg.to_lowercase();
    for recipe in DeploymentRecipe::builtin() {
        if recipe.name.to_lowercase().contains(&wanted)
            || recipe.deployment_type.to_string().to_lowercase().replace(' ', "-") == wanted
        {
            return Ok(recipe);
        }
    }
    bail!(
        "no recipe matches '{}'; use `usbforge recipes` to list the built-ins",
        arg
    );
}

pub fn run() -> Result<()> {
    for recipe in DeploymentRecipe::builtin() {
        println!("{} [{}]", recipe.name, recipe.deployment_type);
        println!("  {}", recipe.description);
        for part in &recipe.partitions {
            let size = match part.size {
                PartitionSize::Mib(mib) => format!("{} MiB", mib),
                PartitionSize::Remaining => "remaining space".to_string(),
            };
            println!(
                "  - {} ({}, {}{})",
                part.name,
                part.fs,
                size,
                if part.bootable { ", boot" } else { "" }
            );
        }
        println!("  required sources: {}", recipe.required_files.join(", "));
        if !recipe.optional_files.is_empty() {
            println!("  optional sources: {}", recipe.optional_files.join(", "));
        }
        println!();
    }
    Ok(())
}
