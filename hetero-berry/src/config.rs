//! 单次运行的配置.

use crate::bounds::DetectorParams;
use crate::calibrate::CalibrationParams;
use crate::consts::{DEFAULT_ADJUSTMENTS, DEFAULT_DIVISIONS};
use crate::entropy::EntropyParams;
use crate::grid::FeatureSet;
use crate::{HeteroError, HeteroResult};

/// 流水线配置. 路径不在此处, 由调用方解析.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunConfig {
    /// 网格划分因子.
    pub divisions: Vec<usize>,
    /// 对比度校准选项, 按给定顺序处理.
    pub contrast_adjustments: Vec<bool>,
    /// 特征集合.
    pub features: FeatureSet,
    /// 显式 z 范围 `[z_ini, z_fin)`.
    pub z_range: Option<(usize, usize)>,
    /// ROI 定位参数.
    pub detector: DetectorParams,
    /// 校准参数.
    pub calibration: CalibrationParams,
    /// 熵估计参数.
    pub entropy: EntropyParams,
    /// 线程数上限. `None` 表示使用所有可用核心.
    pub workers: Option<usize>,
    /// 随机数种子. `None` 表示使用系统熵源.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            divisions: DEFAULT_DIVISIONS.to_vec(),
            contrast_adjustments: DEFAULT_ADJUSTMENTS.to_vec(),
            features: FeatureSet::all(),
            z_range: None,
            detector: DetectorParams::default(),
            calibration: CalibrationParams::default(),
            entropy: EntropyParams::default(),
            workers: None,
            seed: None,
        }
    }
}

impl RunConfig {
    /// 检查配置. 所有问题都属于输入错误.
    pub fn validate(&self) -> HeteroResult<()> {
        if self.divisions.is_empty() {
            return Err(HeteroError::validation("no division given"));
        }
        if let Some(d) = self.divisions.iter().find(|&&d| d < 2) {
            return Err(HeteroError::validation(format!(
                "division {d} is invalid, divisions must be at least 2"
            )));
        }
        if self.contrast_adjustments.is_empty() {
            return Err(HeteroError::validation("no contrast adjustment option given"));
        }
        if self.features.is_empty() {
            return Err(HeteroError::validation("no feature given"));
        }
        if let Some((ini, fin)) = self.z_range {
            if ini >= fin {
                return Err(HeteroError::validation(format!(
                    "z range [{ini}, {fin}) is empty"
                )));
            }
        }
        if self.workers == Some(0) {
            return Err(HeteroError::validation("at least one worker is required"));
        }
        if self.entropy.grid_points < 2 {
            return Err(HeteroError::validation(
                "integration grid needs at least 2 points",
            ));
        }
        let (lo, hi) = self.detector.z_fraction;
        if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo > hi {
            return Err(HeteroError::validation(format!(
                "z fraction ({lo}, {hi}) is not an interval inside [0, 1]"
            )));
        }
        Ok(())
    }

    /// 去重后的校准选项, 保留首次出现的顺序.
    pub fn adjustments(&self) -> Vec<bool> {
        let mut v: Vec<bool> = Vec::with_capacity(2);
        for &a in &self.contrast_adjustments {
            if !v.contains(&a) {
                v.push(a);
            }
        }
        v
    }
}
