use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "usbforge - bootable deployment media builder")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the built-in deployment recipes.
    Recipes,

    /// Show the partition layout a recipe would produce on a device.
    Plan {
        /// Built-in recipe name or path to a recipe JSON file.
        #[arg(long)]
        recipe: String,
        /// Device capacity in MiB (skips probing a real device).
        #[arg(long, conflicts_with = "device")]
        size_mib: Option<u64>,
        /// Whole-disk device node to probe, e.g. /dev/sdb.
        #[arg(long)]
        device: Option<PathBuf>,
        /// Emit the plan as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Build deployment media onto a device.
    Build {
        /// Built-in recipe name or path to a recipe JSON file.
        #[arg(long)]
        recipe: String,
        /// Whole-disk device node, e.g. /dev/sdb.
        #[arg(long)]
        device: PathBuf,
        /// Payload source as key=path; repeatable.
        #[arg(long = "source", value_name = "KEY=PATH")]
        sources: Vec<String>,
        /// Log the operations without touching the device.
        #[arg(long)]
        dry_run: bool,
        /// Confirm that the target device may be wiped.
        #[arg(long)]
        yes_i_know: bool,
    },
}
