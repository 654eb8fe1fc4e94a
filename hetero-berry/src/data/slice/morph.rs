//! 8-bit 灰度图与二值图上的形态学原语.

use ndarray::{Array2, ArrayView2};

/// 灰度直方图.
pub fn histogram(gray: ArrayView2<u8>) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in gray.iter() {
        hist[v as usize] += 1;
    }
    hist
}

/// 由直方图求 Otsu 阈值 `t`, 使类间方差最大. 像素满足 `v > t` 时属于前景.
///
/// 方差相同的候选阈值取最小者. 直方图只有一个非零灰度级时返回 0.
pub fn otsu_threshold(hist: &[u32; 256]) -> u8 {
    let total: u64 = hist.iter().map(|&c| c as u64).sum();
    if total == 0 {
        return 0;
    }
    let scale = 1.0 / total as f64;
    let mu: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum::<f64>()
        * scale;

    let (mut q1, mut mu1) = (0.0f64, 0.0f64);
    let (mut max_sigma, mut max_val) = (0.0f64, 0u8);
    for (i, &c) in hist.iter().enumerate() {
        let p_i = c as f64 * scale;
        mu1 *= q1;
        q1 += p_i;
        let q2 = 1.0 - q1;

        if q1.min(q2) < f32::EPSILON as f64 || q1.max(q2) > 1.0 - f32::EPSILON as f64 {
            continue;
        }

        mu1 = (mu1 + i as f64 * p_i) / q1;
        let mu2 = (mu - q1 * mu1) / q2;
        let sigma = q1 * q2 * (mu1 - mu2) * (mu1 - mu2);
        if sigma > max_sigma {
            max_sigma = sigma;
            max_val = i as u8;
        }
    }
    max_val
}

/// 用 `kernel x kernel` 的全 1 方形核对二值图做 `iterations` 次膨胀.
///
/// 锚点位于核中心 (`kernel / 2`), 因此边长为 2 的核覆盖偏移 `{-1, 0}`.
/// 越界邻居不参与计算.
pub fn dilate(src: ArrayView2<bool>, kernel: usize, iterations: usize) -> Array2<bool> {
    let mut cur = src.to_owned();
    if kernel == 0 {
        return cur;
    }
    let (h, w) = cur.dim();
    let lo = -((kernel / 2) as isize);
    let hi = lo + kernel as isize - 1;

    for _ in 0..iterations {
        let prev = cur.clone();
        for ((r, c), dst) in cur.indexed_iter_mut() {
            if *dst {
                continue;
            }
            'kernel: for dr in lo..=hi {
                let rr = r as isize + dr;
                if rr < 0 || rr >= h as isize {
                    continue;
                }
                for dc in lo..=hi {
                    let cc = c as isize + dc;
                    if cc < 0 || cc >= w as isize {
                        continue;
                    }
                    if prev[(rr as usize, cc as usize)] {
                        *dst = true;
                        break 'kernel;
                    }
                }
            }
        }
    }
    cur
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_otsu_bimodal() {
        let mut hist = [0u32; 256];
        hist[10] = 100;
        hist[200] = 50;
        let t = otsu_threshold(&hist);
        assert!((10..200).contains(&(t as usize)));
        // 第一个使类间方差最大的阈值.
        assert_eq!(t, 10);
    }

    #[test]
    fn test_otsu_degenerate() {
        assert_eq!(otsu_threshold(&[0; 256]), 0);
        let mut hist = [0u32; 256];
        hist[42] = 9;
        assert_eq!(otsu_threshold(&hist), 0);
    }

    #[test]
    fn test_histogram() {
        let g = array![[0u8, 1, 1], [255, 1, 0]];
        let h = histogram(g.view());
        assert_eq!(h[0], 2);
        assert_eq!(h[1], 3);
        assert_eq!(h[255], 1);
    }

    #[test]
    fn test_dilate_anchor() {
        let mut src = Array2::from_elem((5, 5), false);
        src[(2, 2)] = true;

        // 偏移 {-1, 0}: dst(r, c) = OR src(r + dr, c + dc), 因此向右下扩张.
        let once = dilate(src.view(), 2, 1);
        let set: Vec<_> = once
            .indexed_iter()
            .filter(|(_, &v)| v)
            .map(|(p, _)| p)
            .collect();
        assert_eq!(set, vec![(2, 2), (2, 3), (3, 2), (3, 3)]);

        let twice = dilate(src.view(), 2, 2);
        assert_eq!(twice.iter().filter(|&&v| v).count(), 9);
        assert!(twice[(4, 4)]);
        assert!(!twice[(1, 1)]);
    }

    #[test]
    fn test_dilate_border_ignored() {
        let mut src = Array2::from_elem((3, 3), false);
        src[(2, 2)] = true;
        let out = dilate(src.view(), 2, 7);
        assert_eq!(out.iter().filter(|&&v| v).count(), 1);
        assert_eq!(dilate(src.view(), 2, 0), src);
    }
}
