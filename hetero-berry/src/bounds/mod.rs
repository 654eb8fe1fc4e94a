//! 基于逐切片圆检测的立方体 ROI 定位.
//!
//! 每个采样切片独立地生成岩心掩膜, 检测截面圆并取其内接正方形.
//! 所有正方形求交, 向内收缩容差并裁成正方形后, 再按策略确定 z 方向范围.

use log::{debug, info, warn};
use rand::Rng;

use crate::consts::bounds::*;
use crate::data::MaskParams;
use crate::{Bounds, HeteroError, HeteroResult, Volume};

pub mod hough;
pub mod square;

pub use hough::{detect_circle, Circle, HoughParams};
pub use square::{geometric_z, Rect};

/// 参与圆检测的切片选择方式.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SliceSelection {
    /// 以 z 中点为中心, 向两侧各取 `half_width` 层, 每隔 `stride` 层取一层.
    /// `half_width` 为 `None` 时覆盖整个深度.
    Window {
        /// 半窗宽.
        half_width: Option<usize>,
        /// 步长.
        stride: usize,
    },
    /// 随机抽取 `count` 个不同的切片.
    Random {
        /// 抽取个数.
        count: usize,
    },
}

impl Default for SliceSelection {
    fn default() -> Self {
        Self::Window {
            half_width: Some(HALF_WINDOW),
            stride: STRIDE,
        }
    }
}

impl SliceSelection {
    /// 给定深度 `len_z` 时选中的切片下标, 升序.
    pub fn indices<R: Rng + ?Sized>(&self, len_z: usize, rng: &mut R) -> Vec<usize> {
        match *self {
            Self::Window { half_width, stride } => {
                let mid = len_z / 2;
                let half = half_width.unwrap_or(mid);
                let start = mid.saturating_sub(half);
                let end = (mid + half).min(len_z);
                (start..end).step_by(stride.max(1)).collect()
            }
            Self::Random { count } => {
                let mut v = rand::seq::index::sample(rng, len_z, count.min(len_z)).into_vec();
                v.sort_unstable();
                v
            }
        }
    }
}

/// ROI 定位参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectorParams {
    /// 切片选择方式.
    pub selection: SliceSelection,
    /// 求交后每条边向内收缩的像素数.
    pub tolerance: usize,
    /// 切片掩膜参数.
    pub mask: MaskParams,
    /// 圆检测参数.
    pub hough: HoughParams,
    /// 未给定 z 范围时默认保留的深度比例.
    pub z_fraction: (f64, f64),
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            selection: SliceSelection::default(),
            tolerance: TOLERANCE,
            mask: MaskParams::default(),
            hough: HoughParams::default(),
            z_fraction: DEFAULT_Z_FRACTION,
        }
    }
}

/// 单个切片检测失败的原因.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SliceMiss {
    EmptySlice,
    NoCircle,
    OutsideSlice,
}

impl std::fmt::Display for SliceMiss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::EmptySlice => "slice statistics are undefined",
            Self::NoCircle => "no circle above the accumulator threshold",
            Self::OutsideSlice => "inscribed square falls outside the slice",
        })
    }
}

/// 立方体 ROI 定位器.
#[derive(Clone, Debug, Default)]
pub struct BoundsDetector {
    params: DetectorParams,
}

impl BoundsDetector {
    /// 以给定参数创建定位器.
    #[inline]
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    /// 获取参数.
    #[inline]
    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// 第 `z` 层切片的内接正方形.
    fn slice_square(&self, volume: &Volume, z: usize) -> Result<Rect, SliceMiss> {
        let slice = volume.slice_at(z);
        let mask = slice
            .plug_mask(&self.params.mask)
            .ok_or(SliceMiss::EmptySlice)?;
        let circle = detect_circle(&mask, &self.params.hough).ok_or(SliceMiss::NoCircle)?;
        debug!(
            "slice {z}: circle at (row {:.1}, col {:.1}), r = {:.1}",
            circle.cy, circle.cx, circle.r
        );
        Rect::inscribed(&circle, slice.shape()).ok_or(SliceMiss::OutsideSlice)
    }

    /// 定位 `volume` 的立方体 ROI.
    ///
    /// `z_range` 给定时直接使用, 但必须位于体数据内且不短于 ROI 边长;
    /// 否则按默认比例自动推导. `rng` 仅在随机切片选择时使用.
    pub fn detect<R: Rng + ?Sized>(
        &self,
        volume: &Volume,
        z_range: Option<(usize, usize)>,
        rng: &mut R,
    ) -> HeteroResult<Bounds> {
        if volume.is_empty() {
            return Err(HeteroError::validation("volume is empty"));
        }
        let len_z = volume.len_z();
        let indices = self.params.selection.indices(len_z, rng);
        if indices.is_empty() {
            return Err(HeteroError::detection("no slice selected for detection"));
        }

        let squares = crate::parallel::map_ordered(&indices, |&z| self.slice_square(volume, z));
        let mut found = Vec::with_capacity(squares.len());
        for (z, sq) in indices.iter().zip(squares) {
            match sq {
                Ok(r) => found.push(r),
                Err(e) => warn!("Slice {z} skipped during bounds detection: {e}"),
            }
        }
        info!(
            "Plug circle detected in {} of {} sampled slices",
            found.len(),
            indices.len()
        );

        let (first, rest) = found.split_first().ok_or_else(|| {
            HeteroError::detection(format!(
                "no plug circle detected in any of the {} sampled slices",
                indices.len()
            ))
        })?;
        let common = rest
            .iter()
            .try_fold(*first, |acc, r| acc.intersect(r))
            .ok_or_else(|| HeteroError::detection("inscribed squares do not intersect"))?;
        let square = common
            .shrink(self.params.tolerance)
            .ok_or_else(|| {
                HeteroError::detection(format!(
                    "common square {common:?} vanishes after shrinking by {}",
                    self.params.tolerance
                ))
            })?
            .squarify();
        let side = square.height() as usize;

        let (z_ini, z_fin) = resolve_z(len_z, side, z_range, self.params.z_fraction)?;
        let bounds = Bounds {
            z_ini,
            z_fin,
            x_ini: square.rows.0 as usize,
            x_fin: square.rows.1 as usize,
            y_ini: square.cols.0 as usize,
            y_fin: square.cols.1 as usize,
        };
        debug_assert!(bounds.is_within(volume.shape()));
        Ok(bounds)
    }
}

/// 确定 z 方向范围.
///
/// 1. 显式给定 `explicit` 时, 要求 `0 <= ini < fin <= len_z` 且长度不小于 `side`.
/// 2. 否则取 `[⌊lo · len_z⌋, ⌊hi · len_z⌋)`, 并在几何范围 (见 [`geometric_z`])
///    更大的一端放宽到几何范围. 几何范围越界, 或最终长度小于 `side` 时报错.
pub fn resolve_z(
    len_z: usize,
    side: usize,
    explicit: Option<(usize, usize)>,
    (lo, hi): (f64, f64),
) -> HeteroResult<(usize, usize)> {
    if let Some((ini, fin)) = explicit {
        if !(ini < fin && fin <= len_z) {
            return Err(HeteroError::validation(format!(
                "z range [{ini}, {fin}) is not inside the volume depth {len_z}"
            )));
        }
        if fin - ini < side {
            return Err(HeteroError::validation(format!(
                "sample is too small: z range [{ini}, {fin}) is shorter than the minimum {side}"
            )));
        }
        return Ok((ini, fin));
    }

    info!("z_ini and z_fin guessed automatically");
    let (gi, gf) = geometric_z(len_z, side);
    if gi < 0 || gf > len_z as i64 {
        return Err(HeteroError::validation(format!(
            "sample is too small: depth {len_z} cannot hold a cube of side {side}"
        )));
    }
    let z_ini = ((lo * len_z as f64) as usize).min(gi as usize);
    let z_fin = ((hi * len_z as f64) as usize).max(gf as usize).min(len_z);
    if z_fin <= z_ini || z_fin - z_ini < side {
        return Err(HeteroError::validation(format!(
            "sample is too small: z range [{z_ini}, {z_fin}) is shorter than the minimum {side}"
        )));
    }
    Ok((z_ini, z_fin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::plug_volume;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn detect(vol: &Volume, z: Option<(usize, usize)>) -> HeteroResult<Bounds> {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        BoundsDetector::default().detect(vol, z, &mut rng)
    }

    #[test]
    fn test_slice_selection() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let w = SliceSelection::default();
        assert_eq!(
            w.indices(200, &mut rng),
            vec![50, 60, 70, 80, 90, 100, 110, 120, 130, 140]
        );
        // 窗口两端截断到体数据内.
        assert_eq!(w.indices(30, &mut rng), vec![0, 10, 20]);
        let full = SliceSelection::Window {
            half_width: None,
            stride: 5,
        };
        assert_eq!(full.indices(20, &mut rng), vec![0, 5, 10, 15]);

        let r = SliceSelection::Random { count: 8 }.indices(50, &mut rng);
        assert_eq!(r.len(), 8);
        assert!(r.windows(2).all(|p| p[0] < p[1]));
        assert!(r.iter().all(|&z| z < 50));
        assert_eq!(SliceSelection::Random { count: 80 }.indices(5, &mut rng).len(), 5);
    }

    #[test]
    fn test_resolve_z() {
        // 默认 [10, 90), 几何 [30, 70).
        assert_eq!(resolve_z(100, 40, None, DEFAULT_Z_FRACTION).unwrap(), (10, 90));
        // 几何范围 [5, 95) 更大.
        assert_eq!(resolve_z(100, 90, None, DEFAULT_Z_FRACTION).unwrap(), (5, 95));
        // 几何范围越界.
        assert!(matches!(
            resolve_z(100, 120, None, DEFAULT_Z_FRACTION),
            Err(HeteroError::Validation(_))
        ));

        assert_eq!(resolve_z(100, 40, Some((0, 40)), DEFAULT_Z_FRACTION).unwrap(), (0, 40));
        assert!(matches!(
            resolve_z(100, 40, Some((0, 39)), DEFAULT_Z_FRACTION),
            Err(HeteroError::Validation(_))
        ));
        assert!(matches!(
            resolve_z(100, 40, Some((50, 101)), DEFAULT_Z_FRACTION),
            Err(HeteroError::Validation(_))
        ));
        assert!(matches!(
            resolve_z(100, 4, Some((9, 9)), DEFAULT_Z_FRACTION),
            Err(HeteroError::Validation(_))
        ));
    }

    #[test]
    fn test_detect_plug() {
        let vol = plug_volume(96, 96, 40.0, 20000, 1000);
        let b = detect(&vol, None).unwrap();
        assert!(b.is_within(vol.shape()));
        let (z, x, y) = b.extents();
        assert_eq!(x, y);
        assert!(x >= 20, "{b:?}");
        assert!(z >= x);

        // ROI 位于岩心截面内部.
        let cx = (b.x_ini + b.x_fin) as f64 / 2.0;
        let cy = (b.y_ini + b.y_fin) as f64 / 2.0;
        assert!((cx - 48.0).abs() < 6.0, "{b:?}");
        assert!((cy - 48.0).abs() < 6.0, "{b:?}");
        assert!(x <= 60, "{b:?}");
    }

    #[test]
    fn test_detect_random_selection() {
        let vol = plug_volume(60, 96, 40.0, 20000, 1000);
        let params = DetectorParams {
            selection: SliceSelection::Random { count: 4 },
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let a = BoundsDetector::new(params).detect(&vol, None, &mut rng).unwrap();
        let b = detect(&vol, None).unwrap();
        // 每层切片都相同, 选择方式不影响平面 ROI.
        assert_eq!(a.x_range(), b.x_range());
        assert_eq!(a.y_range(), b.y_range());
    }

    #[test]
    fn test_detect_explicit_z() {
        let vol = plug_volume(96, 96, 40.0, 20000, 1000);
        let b = detect(&vol, Some((0, 96))).unwrap();
        assert_eq!(b.z_range(), 0..96);
        assert!(matches!(
            detect(&vol, Some((40, 50))),
            Err(HeteroError::Validation(_))
        ));
    }

    #[test]
    fn test_detect_no_plug() {
        let constant = Volume::new(ndarray::Array3::from_elem((20, 64, 64), 5000u16));
        assert!(matches!(
            detect(&constant, None),
            Err(HeteroError::Detection(_))
        ));
        let empty = Volume::new(ndarray::Array3::zeros((0, 64, 64)));
        assert!(matches!(detect(&empty, None), Err(HeteroError::Validation(_))));
    }
}
