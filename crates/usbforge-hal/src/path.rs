use std::path::{Path, PathBuf};

/// Partition path for a whole-disk device node. Handles the nvme/mmcblk
/// `pN` postfix convention.
pub fn partition_path(disk: &Path, num: u32) -> PathBuf {
    let disk_str = disk.to_string_lossy();
    if disk_str.contains("nvme") || disk_str.contains("mmcblk") || disk_str.contains("loop") {
        PathBuf::from(format!("{}p{}", disk_str, num))
    } else {
        PathBuf::from(format!("{}{}", disk_str, num))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sd_devices_append_number() {
        assert_eq!(
            partition_path(Path::new("/dev/sdb"), 2),
            PathBuf::from("/dev/sdb2")
        );
    }

    #[test]
    fn nvme_and_mmcblk_use_p_postfix() {
        assert_eq!(
            partition_path(Path::new("/dev/nvme0n1"), 1),
            PathBuf::from("/dev/nvme0n1p1")
        );
        assert_eq!(
            partition_path(Path::new("/dev/mmcblk0"), 3),
            PathBuf::from("/dev/mmcblk0p3")
        );
    }
}
