//! 特征熵.
//!
//! 对每个 `(校准选项, 划分因子, 特征)`, 取样本所有特征值均有限的子立方体上该特征的值,
//! (可选地) 按参考特征库标准化后估计其分布的熵:
//!
//! 1. 离散特征 (max, min, median): Shannon 熵.
//! 2. 连续特征: Gaussian KDE 微分熵.
//!
//! 熵无定义 (例如常数分布上的 KDE) 属于可恢复错误, 只影响对应的特征.

use std::collections::BTreeMap;
use std::fmt;

use log::{info, warn};

use crate::consts::entropy::GRID_POINTS;
use crate::dataset::ReferenceCorpus;
use crate::grid::{Feature, FeatureSet, FeatureTable, GridKey};
use crate::parallel::{run_keyed, TaskFailure, TaskFailures};
use crate::{HeteroError, HeteroResult};

mod discrete;
mod kde;
mod scaler;

pub use discrete::shannon_entropy;
pub use kde::{differential_entropy, linspace, trapezoid, Bandwidth, GaussianKde};
pub use scaler::StandardScaler;

/// 熵任务键.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntropyTaskKey {
    /// 是否经过对比度校准.
    pub contrast_adjustment: bool,
    /// 划分因子.
    pub division: usize,
    /// 特征.
    pub feature: Feature,
}

impl fmt::Display for EntropyTaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(contrast_adjustment = {}, division = {}, feature = {})",
            self.contrast_adjustment, self.division, self.feature
        )
    }
}

/// 熵估计参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntropyParams {
    /// 是否先按参考特征库标准化.
    pub standardize: bool,
    /// KDE 带宽.
    pub bandwidth: Bandwidth,
    /// 积分网格点数.
    pub grid_points: usize,
}

impl Default for EntropyParams {
    fn default() -> Self {
        Self {
            standardize: true,
            bandwidth: Bandwidth::default(),
            grid_points: GRID_POINTS,
        }
    }
}

/// 单个样本在一个 `(划分因子, 校准选项)` 下的各特征熵.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntropyRecord {
    /// 样本名.
    pub sample: String,
    /// 划分因子.
    pub division: usize,
    /// 是否经过对比度校准.
    pub contrast_adjustment: bool,
    /// 各特征的熵.
    pub values: BTreeMap<Feature, f64>,
}

/// 熵估计结果.
#[derive(Debug)]
pub struct EntropyOutcome {
    /// 按 `(划分因子, 校准选项)` 排序的记录. 所有特征都失败的组合不产生记录.
    pub records: Vec<EntropyRecord>,
    /// 可恢复的失败任务.
    pub failed: Vec<TaskFailure<EntropyTaskKey>>,
}

/// 计算单个特征值分布的熵.
pub fn feature_entropy(feature: Feature, values: &[f64], params: &EntropyParams) -> HeteroResult<f64> {
    if feature.is_discrete() {
        shannon_entropy(values)
            .ok_or_else(|| HeteroError::computation("no finite value to count"))
    } else {
        differential_entropy(values, params.bandwidth, params.grid_points)
    }
}

/// 特征熵估计器.
#[derive(Clone, Debug, Default)]
pub struct EntropyEstimator {
    params: EntropyParams,
    workers: Option<usize>,
}

impl EntropyEstimator {
    /// 以给定参数创建估计器.
    #[inline]
    pub fn new(params: EntropyParams) -> Self {
        Self {
            params,
            workers: None,
        }
    }

    /// 限制线程数.
    #[inline]
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    /// 获取参数.
    #[inline]
    pub fn params(&self) -> &EntropyParams {
        &self.params
    }

    /// 按参考特征库拟合每个任务的标准化变换. 在任务分发前一次性构建.
    ///
    /// 某个网格的参考列无法读取时, 以该网格的第一个任务键报告失败.
    fn fit_scalers(
        &self,
        grids: &[GridKey],
        features: &FeatureSet,
        corpus: Option<&dyn ReferenceCorpus>,
    ) -> Result<BTreeMap<EntropyTaskKey, Option<StandardScaler>>, TaskFailures<EntropyTaskKey>> {
        let mut scalers = BTreeMap::new();
        let mut failed = Vec::new();
        let Some(lead) = features.iter().next() else {
            return Ok(scalers);
        };
        for grid in grids {
            let key = |feature| EntropyTaskKey {
                contrast_adjustment: grid.contrast_adjustment,
                division: grid.division,
                feature,
            };
            let columns = match corpus {
                Some(c) => c.columns(grid.contrast_adjustment, grid.division, features),
                None => Err(HeteroError::validation(
                    "standardization requires a reference corpus",
                )),
            };
            let columns = match columns {
                Ok(columns) => columns,
                Err(error) => {
                    failed.push(TaskFailure {
                        key: key(lead),
                        error,
                    });
                    continue;
                }
            };
            for f in features.iter() {
                let finite: Vec<f64> = columns
                    .get(&f)
                    .map(|c| c.iter().copied().filter(|v| v.is_finite()).collect())
                    .unwrap_or_default();
                scalers.insert(key(f), StandardScaler::fit(&finite));
            }
        }
        match TaskFailures::collect(failed) {
            Some(f) => Err(f),
            None => Ok(scalers),
        }
    }

    /// 估计 `sample` 在 `table` 中所有网格上的各特征熵.
    ///
    /// 任一特征值非有限的子立方体整行舍弃. 启用标准化时必须提供 `corpus`.
    /// I/O 与输入错误对样本是致命的, 以 `Err` 返回所有致命的失败任务;
    /// 计算错误只记录在结果中.
    pub fn estimate(
        &self,
        sample: &str,
        table: &FeatureTable,
        corpus: Option<&dyn ReferenceCorpus>,
    ) -> Result<EntropyOutcome, TaskFailures<EntropyTaskKey>> {
        let features = table.features();
        let grids: Vec<GridKey> = table
            .grids()
            .into_iter()
            .filter(|g| g.sample == sample)
            .collect();
        let keys: Vec<EntropyTaskKey> = grids
            .iter()
            .flat_map(|g| {
                features.iter().map(move |feature| EntropyTaskKey {
                    contrast_adjustment: g.contrast_adjustment,
                    division: g.division,
                    feature,
                })
            })
            .collect();

        let scalers = if self.params.standardize {
            Some(self.fit_scalers(&grids, features, corpus)?)
        } else {
            None
        };

        let batch = run_keyed(&keys, self.workers, |key| {
            let grid = GridKey {
                sample: sample.to_string(),
                contrast_adjustment: key.contrast_adjustment,
                division: key.division,
            };
            let mut values = table.complete_values(&grid, key.feature);
            if let Some(scalers) = scalers.as_ref() {
                let scaler = scalers.get(key).copied().flatten().ok_or_else(|| {
                    HeteroError::computation(format!(
                        "reference column for {key} has no finite value"
                    ))
                })?;
                scaler.transform(&mut values);
            }
            feature_entropy(key.feature, &values, &self.params)
        });
        let batch = batch.into_fatal()?;
        for f in batch.failed.iter() {
            warn!("Entropy of {} skipped for {sample}: {}", f.key, f.error);
        }

        let mut grouped: BTreeMap<(usize, bool), BTreeMap<Feature, f64>> = BTreeMap::new();
        for (key, h) in batch.done {
            grouped
                .entry((key.division, key.contrast_adjustment))
                .or_default()
                .insert(key.feature, h);
        }
        let records: Vec<EntropyRecord> = grouped
            .into_iter()
            .map(|((division, contrast_adjustment), values)| EntropyRecord {
                sample: sample.to_string(),
                division,
                contrast_adjustment,
                values,
            })
            .collect();
        info!(
            "Entropy estimated for {sample}: {} records, {} failed tasks",
            records.len(),
            batch.failed.len()
        );
        Ok(EntropyOutcome {
            records,
            failed: batch.failed,
        })
    }
}
