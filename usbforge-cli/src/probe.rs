//! Minimal sysfs/procfs device probing for the CLI.
//!
//! The build library takes a filled-in [`TargetDevice`] and never
//! probes on its own; this is where the CLI gathers those facts.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use usbforge_build::TargetDevice;

pub fn probe_device(path: &Path) -> Result<TargetDevice> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("bad device path {}", path.display()))?;
    let sys = Path::new("/sys/class/block").join(name);
    if !sys.exists() {
        bail!("{} is not a block device", path.display());
    }

    let sectors: u64 = read_trimmed(&sys.join("size"))?
        .parse()
        .with_context(|| format!("unreadable size for {}", name))?;
    let removable = read_trimmed(&sys.join("removable")).map(|v| v == "1").unwrap_or(false);
    let write_protected = read_trimmed(&sys.join("ro")).map(|v| v == "1").unwrap_or(false);

    Ok(TargetDevice {
        path: path.to_path_buf(),
        size_bytes: sectors * 512,
        removable,
        system_disk: holds_root_filesystem(path)?,
        write_protected,
    })
}

fn read_trimmed(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?
        .trim()
        .to_string())
}

/// Whether the root filesystem lives on this disk or one of its
/// partitions.
fn holds_root_filesystem(disk: &Path) -> Result<bool> {
    let mounts = fs::read_to_string("/proc/mounts").context("read /proc/mounts")?;
    Ok(root_device(&mounts)
        .map(|dev| dev.starts_with(&disk.to_string_lossy().to_string()))
        .unwrap_or(false))
}

fn root_device(mounts: &str) -> Option<&str> {
    mounts
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let dev = fields.next()?;
            let mp = fields.next()?;
            (mp == "/").then_some(dev)
        })
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_device_is_found_in_proc_mounts() {
        let mounts = "proc /proc proc rw 0 0\n/dev/sda2 / ext4 rw 0 0\n/dev/sdb1 /mnt vfat rw 0 0\n";
        assert_eq!(root_device(mounts), Some("/dev/sda2"));
    }

    #[test]
    fn no_root_line_yields_none() {
        let mounts = "proc /proc proc rw 0 0\n";
        assert_eq!(root_device(mounts), None);
    }
}
