use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// 单个文件的上传上限，5000MB
pub const MAX_UPLOAD_SIZE: u64 = 5000 * MIB;

/// 根据文件大小确定请求超时
pub fn timeout_for_size(file_size: u64) -> Duration {
    let minutes = if file_size < 10 * MIB {
        5
    } else if file_size < 100 * MIB {
        15
    } else if file_size < 500 * MIB {
        30
    } else {
        60
    };
    Duration::from_secs(minutes * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_tiers() {
        assert_eq!(timeout_for_size(0), Duration::from_secs(300));
        assert_eq!(timeout_for_size(10 * MIB - 1), Duration::from_secs(300));
        assert_eq!(timeout_for_size(10 * MIB), Duration::from_secs(900));
        assert_eq!(timeout_for_size(100 * MIB), Duration::from_secs(1800));
        assert_eq!(timeout_for_size(499 * MIB), Duration::from_secs(1800));
        assert_eq!(timeout_for_size(500 * MIB), Duration::from_secs(3600));
        assert_eq!(timeout_for_size(MAX_UPLOAD_SIZE), Duration::from_secs(3600));
    }
}
