//! 数据集操作.
//!
//! 1. 体数据源 (`.npy`, NIfTI, 内存).
//! 2. 参考特征库.
//! 3. 各阶段结果表与群体熵值表的 CSV 读写.

use std::path::{Path, PathBuf};

mod corpus;
pub mod table;
mod volume;

pub use corpus::{reference_file_name, CsvReferenceCorpus, MemoryCorpus, ReferenceCorpus};
pub use volume::{open_volume, NiftiVolume, NpyVolume, VolumeSource, VoxelType};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 由体数据文件路径得到样本名: 去掉目录与扩展名 (`.nii.gz` 视为一个扩展名).
pub fn sample_name_from_path<P: AsRef<Path>>(path: P) -> Option<String> {
    let name = path.as_ref().file_name()?.to_str()?;
    let stem = name
        .strip_suffix(".nii.gz")
        .or_else(|| name.rsplit_once('.').map(|(s, _)| s))
        .unwrap_or(name);
    (!stem.is_empty()).then(|| stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_name() {
        assert_eq!(sample_name_from_path("/data/EC_01.npy").as_deref(), Some("EC_01"));
        assert_eq!(sample_name_from_path("a/b/plug.v2.nii.gz").as_deref(), Some("plug.v2"));
        assert_eq!(sample_name_from_path("noext").as_deref(), Some("noext"));
        assert_eq!(sample_name_from_path("/").as_deref(), None);
    }

    #[test]
    fn test_home_dir_with() {
        if let Some(p) = home_dataset_dir_with(["features"]) {
            assert!(p.ends_with("dataset/features"));
        }
    }
}
