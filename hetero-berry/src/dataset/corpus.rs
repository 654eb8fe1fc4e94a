use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;

use crate::grid::{Feature, FeatureSet};
use crate::{HeteroError, HeteroResult};

/// 参考特征库: 每个 `(校准选项, 划分因子)` 一张子立方体特征表,
/// 用于在估计熵之前标准化特征值.
pub trait ReferenceCorpus {
    /// 读取 `(contrast_adjustment, division)` 表中 `features` 的各列.
    ///
    /// 表不存在时返回 I/O 错误, 缺少所需的列时返回输入错误.
    fn columns(
        &self,
        contrast_adjustment: bool,
        division: usize,
        features: &FeatureSet,
    ) -> HeteroResult<BTreeMap<Feature, Vec<f64>>>;
}

/// 参考特征表的文件名 `grid_features_{ajuste_surmas|sem_ajuste}_{division}.csv`.
pub fn reference_file_name(contrast_adjustment: bool, division: usize) -> String {
    let folder = if contrast_adjustment {
        "ajuste_surmas"
    } else {
        "sem_ajuste"
    };
    format!("grid_features_{folder}_{division}.csv")
}

/// 目录中的 CSV 参考特征库.
#[derive(Clone, Debug)]
pub struct CsvReferenceCorpus {
    dir: PathBuf,
}

impl CsvReferenceCorpus {
    /// 以 `dir` 为根目录创建. 目录不存在时返回错误.
    pub fn new<P: AsRef<Path>>(dir: P) -> HeteroResult<Self> {
        let dir = dir.as_ref().to_owned();
        if !dir.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("reference corpus folder {} does not exist", dir.display()),
            )
            .into());
        }
        Ok(Self { dir })
    }

    /// 根目录.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ReferenceCorpus for CsvReferenceCorpus {
    fn columns(
        &self,
        contrast_adjustment: bool,
        division: usize,
        features: &FeatureSet,
    ) -> HeteroResult<BTreeMap<Feature, Vec<f64>>> {
        let path = self.dir.join(reference_file_name(contrast_adjustment, division));
        let mut reader = csv::Reader::from_path(&path)?;

        let mut index = BTreeMap::new();
        for (i, h) in reader.headers()?.iter().enumerate() {
            if let Ok(f) = h.parse::<Feature>() {
                if features.contains(f) {
                    index.insert(f, i);
                }
            }
        }
        if let Some(missing) = features.iter().find(|f| !index.contains_key(f)) {
            return Err(HeteroError::validation(format!(
                "column `{missing}` is missing in {}",
                path.display()
            )));
        }

        let mut out: BTreeMap<Feature, Vec<f64>> =
            index.keys().map(|&f| (f, Vec::new())).collect();
        for row in reader.records() {
            let row = row?;
            for (f, &i) in &index {
                let v = row
                    .get(i)
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .unwrap_or(f64::NAN);
                if let Some(col) = out.get_mut(f) {
                    col.push(v);
                }
            }
        }
        debug!(
            "Loaded {} reference columns from {}",
            out.len(),
            path.display()
        );
        Ok(out)
    }
}

/// 内存中的参考特征库.
#[derive(Clone, Debug, Default)]
pub struct MemoryCorpus {
    columns: BTreeMap<(bool, usize), BTreeMap<Feature, Vec<f64>>>,
}

impl MemoryCorpus {
    /// 设置一列.
    pub fn insert(&mut self, contrast_adjustment: bool, division: usize, feature: Feature, values: Vec<f64>) {
        self.columns
            .entry((contrast_adjustment, division))
            .or_default()
            .insert(feature, values);
    }
}

impl ReferenceCorpus for MemoryCorpus {
    fn columns(
        &self,
        contrast_adjustment: bool,
        division: usize,
        features: &FeatureSet,
    ) -> HeteroResult<BTreeMap<Feature, Vec<f64>>> {
        let table = self.columns.get(&(contrast_adjustment, division)).ok_or_else(|| {
            HeteroError::validation(format!(
                "no reference table for contrast_adjustment = {contrast_adjustment}, division = {division}"
            ))
        })?;
        features
            .iter()
            .map(|f| {
                table
                    .get(&f)
                    .map(|c| (f, c.clone()))
                    .ok_or_else(|| HeteroError::validation(format!("column `{f}` is missing")))
            })
            .collect()
    }
}
