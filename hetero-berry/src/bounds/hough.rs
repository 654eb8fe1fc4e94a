//! 二值掩膜上的 Hough 梯度圆检测.
//!
//! 每个梯度非零的像素沿 `±` 梯度方向, 在 `[r_min, r_max]` 距离上投票.
//! 岩心截面边界的梯度汇聚于圆心, 因此累加器峰值即为圆心.
//! 半径再由边缘像素到圆心距离的众数给出.

use ndarray::Array2;

use crate::consts::bounds::{HOUGH_ACCUMULATOR_THRESHOLD, HOUGH_DP};
use crate::{Idx2d, PlugMask};

/// Hough 圆检测参数.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HoughParams {
    /// 累加器分辨率的倒数. 累加器每格对应 `dp x dp` 像素.
    pub dp: usize,
    /// 圆心峰值 (3x3 邻域票数和) 必须严格大于该值.
    pub accumulator_threshold: u32,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            dp: HOUGH_DP,
            accumulator_threshold: HOUGH_ACCUMULATOR_THRESHOLD,
        }
    }
}

/// 检测到的圆. `cx` 为列坐标, `cy` 为行坐标, 像素 `i` 占据 `[i, i + 1)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Circle {
    /// 圆心列坐标.
    pub cx: f64,
    /// 圆心行坐标.
    pub cy: f64,
    /// 半径.
    pub r: f64,
}

/// 给定切片形状 `(h, w)` 时的搜索半径范围 `[min(h, w) / 3, max(h, w) / 2]`.
#[inline]
pub fn radius_range((h, w): Idx2d) -> (usize, usize) {
    (h.min(w) / 3, h.max(w) / 2)
}

/// 3x3 Scharr 梯度 `(gx, gy)`, 边界像素复制延拓.
fn scharr(mask: &PlugMask, (r, c): Idx2d) -> (f64, f64) {
    let (h, w) = mask.shape();
    let at = |dr: isize, dc: isize| -> f64 {
        let rr = (r as isize + dr).clamp(0, h as isize - 1) as usize;
        let cc = (c as isize + dc).clamp(0, w as isize - 1) as usize;
        if mask[(rr, cc)] {
            1.0
        } else {
            0.0
        }
    };
    let gx = 3.0 * (at(-1, 1) - at(-1, -1))
        + 10.0 * (at(0, 1) - at(0, -1))
        + 3.0 * (at(1, 1) - at(1, -1));
    let gy = 3.0 * (at(1, -1) - at(-1, -1))
        + 10.0 * (at(1, 0) - at(-1, 0))
        + 3.0 * (at(1, 1) - at(-1, 1));
    (gx, gy)
}

/// 梯度投票, 返回累加器. 同一条射线连续落入同一格时只计一票.
fn vote(mask: &PlugMask, dp: usize, (r_min, r_max): (usize, usize)) -> Array2<u32> {
    let (h, w) = mask.shape();
    let mut acc = Array2::<u32>::zeros(((h + dp - 1) / dp, (w + dp - 1) / dp));

    for r in 0..h {
        for c in 0..w {
            let (gx, gy) = scharr(mask, (r, c));
            let mag = gx.hypot(gy);
            if mag == 0.0 {
                continue;
            }
            let (ux, uy) = (gx / mag, gy / mag);
            let (x0, y0) = (c as f64 + 0.5, r as f64 + 0.5);

            for sign in [1.0, -1.0] {
                let mut last = None;
                for rad in r_min..=r_max {
                    let x = x0 + sign * rad as f64 * ux;
                    let y = y0 + sign * rad as f64 * uy;
                    if x < 0.0 || y < 0.0 || x >= w as f64 || y >= h as f64 {
                        break;
                    }
                    let bin = (y as usize / dp, x as usize / dp);
                    if last != Some(bin) {
                        acc[bin] += 1;
                        last = Some(bin);
                    }
                }
            }
        }
    }
    acc
}

/// 累加器中 3x3 邻域票数和最大的格. 并列时取行优先顺序的第一个.
fn peak(acc: &Array2<u32>) -> Option<(Idx2d, u32)> {
    let (ah, aw) = acc.dim();
    let mut best: Option<(Idx2d, u32)> = None;
    for r in 0..ah {
        for c in 0..aw {
            if acc[(r, c)] == 0 {
                continue;
            }
            let mut sum = 0;
            for rr in r.saturating_sub(1)..(r + 2).min(ah) {
                for cc in c.saturating_sub(1)..(c + 2).min(aw) {
                    sum += acc[(rr, cc)];
                }
            }
            if best.map_or(true, |(_, s)| sum > s) {
                best = Some(((r, c), sum));
            }
        }
    }
    best
}

/// 在峰值格的 3x3 邻域内按票数加权求圆心坐标 `(cx, cy)`.
fn refine_center(acc: &Array2<u32>, (r, c): Idx2d, dp: usize) -> (f64, f64) {
    let (ah, aw) = acc.dim();
    let dp = dp as f64;
    let (mut sx, mut sy, mut sw) = (0.0, 0.0, 0.0);
    for rr in r.saturating_sub(1)..(r + 2).min(ah) {
        for cc in c.saturating_sub(1)..(c + 2).min(aw) {
            let v = acc[(rr, cc)] as f64;
            sx += v * (cc as f64 + 0.5) * dp;
            sy += v * (rr as f64 + 0.5) * dp;
            sw += v;
        }
    }
    (sx / sw, sy / sw)
}

/// 由边缘像素到圆心的距离估计半径: 取整数距离直方图的众数,
/// 再对众数及其相邻两格内的距离求平均.
fn estimate_radius(
    mask: &PlugMask,
    (cx, cy): (f64, f64),
    (r_min, r_max): (usize, usize),
) -> Option<f64> {
    let dists: Vec<f64> = mask
        .edge_positions()
        .into_iter()
        .map(|(r, c)| (c as f64 + 0.5 - cx).hypot(r as f64 + 0.5 - cy))
        .filter(|d| (r_min as f64..=r_max as f64).contains(d))
        .collect();
    if dists.is_empty() {
        return None;
    }

    let mut hist = vec![0usize; r_max - r_min + 1];
    for d in dists.iter() {
        hist[d.floor() as usize - r_min] += 1;
    }
    // 并列时取较小半径.
    let (best, _) = hist
        .iter()
        .enumerate()
        .fold((0, 0), |acc, (i, &n)| if n > acc.1 { (i, n) } else { acc });
    let lo = (best + r_min).saturating_sub(1) as f64;
    let hi = (best + r_min + 2) as f64;

    let (sum, n) = dists
        .iter()
        .filter(|&&d| lo <= d && d < hi)
        .fold((0.0, 0usize), |(s, n), d| (s + d, n + 1));
    Some(sum / n as f64)
}

/// 在二值掩膜上检测最强的圆. 没有满足阈值的圆心时返回 `None`.
pub fn detect_circle(mask: &PlugMask, params: &HoughParams) -> Option<Circle> {
    let (h, w) = mask.shape();
    if h < 3 || w < 3 {
        return None;
    }
    let dp = params.dp.max(1);
    let radii = radius_range((h, w));
    if radii.0 == 0 || radii.1 < radii.0 {
        return None;
    }

    let acc = vote(mask, dp, radii);
    let (bin, votes) = peak(&acc)?;
    if votes <= params.accumulator_threshold {
        return None;
    }
    let (cx, cy) = refine_center(&acc, bin, dp);
    let r = estimate_radius(mask, (cx, cy), radii)?;
    Some(Circle { cx, cy, r })
}
