//! 对比度校准.
//!
//! 随机抽取若干切片, 用与 ROI 定位相同的掩膜区分孔隙与岩石, 得到
//! `voidmean` (孔隙平均强度) 和 `rockmedian` (扣除孔隙均值后的岩石强度中位数).
//! 校准把孔隙映射到 0, 岩石中位数映射到 32768.

use std::ops::Range;

use log::{info, warn};
use ndarray::{Array3, ArrayView3};
use rand::Rng;

use crate::consts::contrast::*;
use crate::data::MaskParams;
use crate::stats::median;
use crate::{Bounds, HeteroError, HeteroResult, Volume, VolumeSlice};

/// 校准参数.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationParams {
    /// 最多抽取的切片数.
    pub slices: usize,
    /// 切片掩膜参数.
    pub mask: MaskParams,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            slices: SAMPLED_SLICES,
            mask: MaskParams::default(),
        }
    }
}

/// 校准参考值.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContrastReference {
    voidmean: f64,
    rockmedian: f64,
}

impl ContrastReference {
    /// 构建参考值. `rockmedian` 必须为有限正数, `voidmean` 必须有限.
    pub fn new(voidmean: f64, rockmedian: f64) -> HeteroResult<Self> {
        if !voidmean.is_finite() {
            return Err(HeteroError::computation(format!(
                "voidmean {voidmean} is not finite"
            )));
        }
        if !(rockmedian.is_finite() && rockmedian > 0.0) {
            return Err(HeteroError::computation(format!(
                "rockmedian {rockmedian} is not a positive finite value"
            )));
        }
        Ok(Self {
            voidmean,
            rockmedian,
        })
    }

    /// 孔隙平均强度.
    #[inline]
    pub fn voidmean(&self) -> f64 {
        self.voidmean
    }

    /// 岩石强度中位数 (已扣除孔隙均值).
    #[inline]
    pub fn rockmedian(&self) -> f64 {
        self.rockmedian
    }

    /// 校准单个强度值: `clip((raw - voidmean) * 32768 / rockmedian, 0, 65535)`.
    #[inline]
    pub fn scale(&self, raw: f64) -> f32 {
        ((raw - self.voidmean) * ROCK_TARGET / self.rockmedian).clamp(0.0, MAX_INTENSITY) as f32
    }

    /// 校准整个 ROI.
    pub fn apply(&self, roi: ArrayView3<u16>) -> Array3<f32> {
        roi.mapv(|v| self.scale(v as f64))
    }
}

/// 对比度校准器.
#[derive(Clone, Debug, Default)]
pub struct ContrastCalibrator {
    params: CalibrationParams,
}

impl ContrastCalibrator {
    /// 以给定参数创建校准器.
    #[inline]
    pub fn new(params: CalibrationParams) -> Self {
        Self { params }
    }

    /// 单个切片的 `(voidmean, rockmedian)`. 没有孔隙或没有岩石像素时返回 `None`.
    fn slice_reference(&self, slice: &VolumeSlice) -> Option<(f64, f64)> {
        let mask = slice.plug_mask(&self.params.mask)?;
        let (mut void_sum, mut void_n) = (0.0, 0usize);
        for (&rock, &v) in mask.iter().zip(slice.iter()) {
            if !rock {
                void_sum += v as f64;
                void_n += 1;
            }
        }
        if void_n == 0 || void_n == slice.size() {
            return None;
        }
        let voidmean = void_sum / void_n as f64;

        let mut rock: Vec<f64> = mask
            .iter()
            .zip(slice.iter())
            .filter(|(r, _)| **r)
            .map(|(_, &v)| (v as f64 - voidmean).max(0.0))
            .collect();
        Some((voidmean, median(&mut rock)?))
    }

    /// 在 `z_range` 内随机抽取 `min(slices, 区间长度)` 个不同切片, 估计校准参考值.
    pub fn reference<R: Rng + ?Sized>(
        &self,
        volume: &Volume,
        z_range: Range<usize>,
        rng: &mut R,
    ) -> HeteroResult<ContrastReference> {
        if z_range.is_empty() || z_range.end > volume.len_z() {
            return Err(HeteroError::validation(format!(
                "calibration range {z_range:?} is not inside the volume depth {}",
                volume.len_z()
            )));
        }
        let span = z_range.len();
        let mut picked: Vec<usize> =
            rand::seq::index::sample(rng, span, self.params.slices.min(span))
                .into_iter()
                .map(|i| z_range.start + i)
                .collect();
        picked.sort_unstable();

        let per_slice = crate::parallel::map_ordered(&picked, |&z| {
            self.slice_reference(&volume.slice_at(z))
        });
        let (mut voids, mut rocks) = (Vec::new(), Vec::new());
        for (z, r) in picked.iter().zip(per_slice) {
            match r {
                Some((v, r)) => {
                    voids.push(v);
                    rocks.push(r);
                }
                None => warn!("Slice {z} skipped during calibration: no void or no rock pixels"),
            }
        }
        info!(
            "Calibration used {} of {} sampled slices",
            voids.len(),
            picked.len()
        );

        let (Some(voidmean), Some(rockmedian)) = (median(&mut voids), median(&mut rocks)) else {
            return Err(HeteroError::detection(format!(
                "no sampled slice in {z_range:?} separates void from rock"
            )));
        };
        ContrastReference::new(voidmean, rockmedian)
    }

    /// 裁剪 ROI 并转换为 `f32`. 给定 `reference` 时同时做对比度校准.
    pub fn prepare(
        volume: &Volume,
        bounds: &Bounds,
        reference: Option<&ContrastReference>,
    ) -> HeteroResult<Array3<f32>> {
        if !bounds.is_within(volume.shape()) {
            return Err(HeteroError::validation(format!(
                "bounds {bounds:?} exceed volume shape {:?}",
                volume.shape()
            )));
        }
        let roi = volume.crop(bounds);
        Ok(match reference {
            Some(r) => r.apply(roi),
            None => roi.mapv(|v| v as f32),
        })
    }
}
