//! Linux HAL implementation backed by the standard partitioning tools.

use super::format_ops::{FormatOps, FormatOptions, FsKind};
use super::mount_ops::{MountOps, MountOptions};
use super::partition_ops::{PartedOp, PartedOptions, PartitionOps, WipeOptions};
use super::probe_ops::ProbeOps;
use super::system_ops::SystemOps;
use crate::{HalError, HalResult};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Real HAL implementation for Linux hosts.
#[derive(Debug, Clone, Default)]
pub struct LinuxHal;

impl LinuxHal {
    pub fn new() -> Self {
        Self
    }
}

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const SYNC_TIMEOUT: Duration = Duration::from_secs(60);
const FORMAT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const WIPEFS_TIMEOUT: Duration = Duration::from_secs(60);
const PARTED_TIMEOUT: Duration = Duration::from_secs(5 * 60);

fn map_command_err(program: &str, err: std::io::Error) -> HalError {
    if err.kind() == std::io::ErrorKind::NotFound {
        return HalError::CommandNotFound(program.to_string());
    }
    HalError::Io(err)
}

fn output_failed(program: &str, output: &Output) -> HalError {
    HalError::CommandFailed {
        program: program.to_string(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

fn output_with_timeout(program: &str, cmd: &mut Command, timeout: Duration) -> HalResult<Output> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| map_command_err(program, e))?;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    // Drain pipes concurrently to avoid deadlocks on large output.
    let stdout_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout.take() {
            let _ = out.read_to_end(&mut buf);
        }
        buf
    });
    let stderr_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr.take() {
            let _ = err.read_to_end(&mut buf);
        }
        buf
    });

    let status = match child.wait_timeout(timeout).map_err(HalError::Io)? {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_handle.join();
            let _ = stderr_handle.join();
            return Err(HalError::CommandTimeout {
                program: program.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

fn status_with_timeout(program: &str, cmd: &mut Command, timeout: Duration) -> HalResult<()> {
    let output = output_with_timeout(program, cmd, timeout)?;
    if !output.status.success() {
        return Err(output_failed(program, &output));
    }
    Ok(())
}

fn map_nix_err(err: nix::errno::Errno) -> HalError {
    use nix::errno::Errno;
    match err {
        Errno::EBUSY => HalError::DiskBusy,
        Errno::EACCES | Errno::EPERM => HalError::PermissionDenied,
        other => HalError::Nix(other),
    }
}

impl PartitionOps for LinuxHal {
    fn wipefs_all(&self, device: &Path, opts: &WipeOptions) -> HalResult<()> {
        if opts.dry_run {
            log::info!("DRY RUN: wipefs -a {}", device.display());
            return Ok(());
        }
        if !opts.confirmed {
            return Err(HalError::SafetyLock);
        }

        let mut cmd = Command::new("wipefs");
        cmd.arg("-a").arg(device);
        status_with_timeout("wipefs", &mut cmd, WIPEFS_TIMEOUT)
    }

    fn parted(&self, disk: &Path, op: &PartedOp, opts: &PartedOptions) -> HalResult<String> {
        if opts.dry_run {
            log::info!("DRY RUN: parted -s {} {:?}", disk.display(), op);
            return Ok(String::new());
        }
        if !opts.confirmed {
            return Err(HalError::SafetyLock);
        }

        let mut args: Vec<String> = vec!["-s".to_string(), disk.display().to_string()];
        match op {
            PartedOp::MkLabel { kind } => {
                args.push("mklabel".to_string());
                args.push(kind.parted_label().to_string());
            }
            PartedOp::MkPart {
                fs_type,
                start_mib,
                end_mib,
            } => {
                args.push("-a".to_string());
                args.push("optimal".to_string());
                args.push("mkpart".to_string());
                args.push("primary".to_string());
                args.push(fs_type.clone());
                args.push(format!("{}MiB", start_mib));
                args.push(match end_mib {
                    Some(end) => format!("{}MiB", end),
                    None => "100%".to_string(),
                });
            }
            PartedOp::SetBoot { part_num, on } => {
                args.push("set".to_string());
                args.push(part_num.to_string());
                args.push("boot".to_string());
                args.push(if *on { "on" } else { "off" }.to_string());
            }
        }

        let mut cmd = Command::new("parted");
        cmd.args(&args);
        let output = output_with_timeout("parted", &mut cmd, PARTED_TIMEOUT)?;
        if !output.status.success() {
            return Err(output_failed("parted", &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl FormatOps for LinuxHal {
    fn format(
        &self,
        device: &Path,
        fs: FsKind,
        label: &str,
        opts: &FormatOptions,
    ) -> HalResult<()> {
        if opts.dry_run {
            log::info!("DRY RUN: mkfs ({}) {} [{}]", fs, device.display(), label);
            return Ok(());
        }
        if !opts.confirmed {
            return Err(HalError::SafetyLock);
        }

        let (program, mut args): (&str, Vec<String>) = match fs {
            FsKind::Fat32 => (
                "mkfs.vfat",
                vec![
                    "-F".to_string(),
                    "32".to_string(),
                    "-n".to_string(),
                    label.to_string(),
                ],
            ),
            FsKind::Ntfs => (
                "mkfs.ntfs",
                vec!["-f".to_string(), "-L".to_string(), label.to_string()],
            ),
            FsKind::ExFat => ("mkfs.exfat", vec!["-n".to_string(), label.to_string()]),
            FsKind::Ext4 => (
                "mkfs.ext4",
                vec!["-q".to_string(), "-L".to_string(), label.to_string()],
            ),
            FsKind::HfsPlus => ("mkfs.hfsplus", vec!["-v".to_string(), label.to_string()]),
        };
        args.extend(opts.extra_args.iter().cloned());
        args.push(device.display().to_string());

        let mut cmd = Command::new(program);
        cmd.args(&args);
        status_with_timeout(program, &mut cmd, FORMAT_TIMEOUT)
    }
}

impl MountOps for LinuxHal {
    fn mount_device(
        &self,
        device: &Path,
        target: &Path,
        fstype: Option<&str>,
        options: MountOptions,
        dry_run: bool,
    ) -> HalResult<()> {
        if dry_run {
            log::info!(
                "DRY RUN: mount {} -> {}",
                device.display(),
                target.display()
            );
            return Ok(());
        }

        let flags = nix::mount::MsFlags::empty();
        let data = options.options.as_deref();
        nix::mount::mount(Some(device), target, fstype, flags, data).map_err(map_nix_err)?;
        Ok(())
    }

    fn unmount(&self, target: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("DRY RUN: unmount {}", target.display());
            return Ok(());
        }

        nix::mount::umount2(target, nix::mount::MntFlags::empty()).map_err(map_nix_err)?;
        Ok(())
    }

    fn is_mounted(&self, path: &Path) -> HalResult<bool> {
        let content = std::fs::read_to_string("/proc/self/mountinfo")?;
        let needle = path.to_string_lossy();
        Ok(content
            .lines()
            .filter_map(|line| line.split_whitespace().nth(4))
            .any(|mp| mp == needle))
    }
}

impl SystemOps for LinuxHal {
    fn sync(&self) -> HalResult<()> {
        let mut cmd = Command::new("sync");
        status_with_timeout("sync", &mut cmd, SYNC_TIMEOUT)
    }

    fn partprobe(&self, disk: &Path) -> HalResult<()> {
        let mut cmd = Command::new("partprobe");
        cmd.arg(disk);
        status_with_timeout("partprobe", &mut cmd, PROBE_TIMEOUT)
    }

    fn udev_settle(&self) -> HalResult<()> {
        let mut cmd = Command::new("udevadm");
        cmd.arg("settle");
        status_with_timeout("udevadm", &mut cmd, SYNC_TIMEOUT)
    }
}

impl ProbeOps for LinuxHal {
    fn lsblk_mountpoints(&self, disk: &Path) -> HalResult<Vec<PathBuf>> {
        let mut cmd = Command::new("lsblk");
        cmd.args(["-lnpo", "MOUNTPOINT"]).arg(disk);
        let output = output_with_timeout("lsblk", &mut cmd, PROBE_TIMEOUT)?;

        if !output.status.success() {
            return Err(output_failed("lsblk", &output));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wipefs_requires_confirmation() {
        let hal = LinuxHal::new();
        let err = hal
            .wipefs_all(Path::new("/dev/null"), &WipeOptions::new(false, false))
            .unwrap_err();
        assert!(matches!(err, HalError::SafetyLock));
    }

    #[test]
    fn format_requires_confirmation() {
        let hal = LinuxHal::new();
        let err = hal
            .format(
                Path::new("/dev/null"),
                FsKind::Ext4,
                "DATA",
                &FormatOptions::new(false, false),
            )
            .unwrap_err();
        assert!(matches!(err, HalError::SafetyLock));
    }

    #[test]
    fn parted_requires_confirmation() {
        let hal = LinuxHal::new();
        let err = hal
            .parted(
                Path::new("/dev/null"),
                &PartedOp::SetBoot {
                    part_num: 1,
                    on: true,
                },
                &PartedOptions::new(false, false),
            )
            .unwrap_err();
        assert!(matches!(err, HalError::SafetyLock));
    }

    #[test]
    fn dry_run_skips_execution() {
        let hal = LinuxHal::new();
        // Would fail against /dev/null if actually executed.
        hal.wipefs_all(Path::new("/dev/null"), &WipeOptions::new(true, false))
            .unwrap();
        hal.format(
            Path::new("/dev/null"),
            FsKind::Fat32,
            "EFI",
            &FormatOptions::new(true, false),
        )
        .unwrap();
    }
}
