use std::f64::consts::{LN_2, PI};

use crate::stats::Moments;
use crate::{HeteroError, HeteroResult};

/// Gaussian KDE 的带宽选择.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Bandwidth {
    /// 固定带宽.
    Fixed(f64),
    /// Scott 规则 `n^(-1/5) · std`.
    Scott,
    /// Silverman 规则 `(3n/4)^(-1/5) · std`.
    Silverman,
}

impl Default for Bandwidth {
    fn default() -> Self {
        Self::Fixed(crate::consts::entropy::DEFAULT_BANDWIDTH)
    }
}

impl Bandwidth {
    /// 对 `n` 个标准差为 `std` 的样本给出带宽.
    pub fn resolve(&self, n: usize, std: f64) -> f64 {
        let n = n as f64;
        match *self {
            Self::Fixed(h) => h,
            Self::Scott => n.powf(-0.2) * std,
            Self::Silverman => (n * 0.75).powf(-0.2) * std,
        }
    }
}

/// 一维 Gaussian 核密度估计.
#[derive(Clone, Debug)]
pub struct GaussianKde {
    points: Vec<f64>,
    h: f64,
    /// `ln(n) + ln(h) + ln(2π) / 2`.
    log_norm: f64,
}

impl GaussianKde {
    /// 以带宽 `h` 拟合. 输入为空或带宽不是有限正数时返回 `None`.
    pub fn fit(points: &[f64], h: f64) -> Option<Self> {
        if points.is_empty() || !(h.is_finite() && h > 0.0) {
            return None;
        }
        let log_norm = (points.len() as f64).ln() + h.ln() + 0.5 * (2.0 * PI).ln();
        Some(Self {
            points: points.to_vec(),
            h,
            log_norm,
        })
    }

    /// 带宽.
    #[inline]
    pub fn bandwidth(&self) -> f64 {
        self.h
    }

    /// `x` 处的对数密度, 以 log-sum-exp 形式计算.
    pub fn log_density(&self, x: f64) -> f64 {
        let inv = 1.0 / (2.0 * self.h * self.h);
        let max = self
            .points
            .iter()
            .map(|&p| -(x - p) * (x - p) * inv)
            .fold(f64::NEG_INFINITY, f64::max);
        let sum: f64 = self
            .points
            .iter()
            .map(|&p| (-(x - p) * (x - p) * inv - max).exp())
            .sum();
        max + sum.ln() - self.log_norm
    }
}

/// 在 `[lo, hi]` 上生成 `n` 个等距点 (含端点).
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            (0..n).map(|i| lo + step * i as f64).collect()
        }
    }
}

/// 梯形积分.
pub fn trapezoid(ys: &[f64], xs: &[f64]) -> f64 {
    xs.windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
        .sum()
}

/// 以 Gaussian KDE 估计 `values` 的微分熵 (bit).
///
/// 在 `[min - std, max + std]` 上取 `grid_points` 个等距点, 对 `-p·log2 p` 做梯形积分.
/// 输入为空或标准差为 0 时熵无定义, 返回计算错误.
pub fn differential_entropy(
    values: &[f64],
    bandwidth: Bandwidth,
    grid_points: usize,
) -> HeteroResult<f64> {
    if grid_points < 2 {
        return Err(HeteroError::validation(format!(
            "integration grid needs at least 2 points, got {grid_points}"
        )));
    }
    let m = Moments::from_slice(values)
        .ok_or_else(|| HeteroError::computation("no finite value to estimate a density from"))?;
    let std = m.std();
    if std == 0.0 || !std.is_finite() {
        return Err(HeteroError::computation(format!(
            "{} values share the same value, the density is degenerate",
            values.len()
        )));
    }

    let h = bandwidth.resolve(values.len(), std);
    let kde = GaussianKde::fit(values, h)
        .ok_or_else(|| HeteroError::computation(format!("bandwidth {h} is not positive")))?;

    let xs = linspace(m.min() - std, m.max() + std, grid_points);
    let integrand: Vec<f64> = xs
        .iter()
        .map(|&x| {
            let log_pdf = kde.log_density(x);
            let pdf = log_pdf.exp();
            if pdf == 0.0 {
                0.0
            } else {
                -pdf * log_pdf / LN_2
            }
        })
        .collect();
    Ok(trapezoid(&integrand, &xs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_trapezoid() {
        let xs = linspace(0.0, 2.0, 3);
        assert_eq!(trapezoid(&[0.0, 1.0, 2.0], &xs), 2.0);
    }

    #[test]
    fn test_density_normalized() {
        let kde = GaussianKde::fit(&[0.0, 3.0, 4.0], 1.0).unwrap();
        let xs = linspace(-12.0, 16.0, 4001);
        let ys: Vec<f64> = xs.iter().map(|&x| kde.log_density(x).exp()).collect();
        assert!((trapezoid(&ys, &xs) - 1.0).abs() < 1e-6);
        assert!(GaussianKde::fit(&[], 1.0).is_none());
        assert!(GaussianKde::fit(&[1.0], 0.0).is_none());
    }

    #[test]
    fn test_separated_mixture_entropy() {
        // 两个相距很远的单位 Gaussian 等权混合: H = log2(2πe) / 2 + 1.
        let expected = 0.5 * (2.0 * PI * std::f64::consts::E).log2() + 1.0;
        let h = differential_entropy(&[0.0, 100.0], Bandwidth::default(), 1000).unwrap();
        assert!((h - expected).abs() < 1e-3, "{h} vs {expected}");
    }

    #[test]
    fn test_degenerate_input() {
        assert!(matches!(
            differential_entropy(&[2.0; 5], Bandwidth::default(), 1000),
            Err(HeteroError::Computation(_))
        ));
        assert!(matches!(
            differential_entropy(&[], Bandwidth::default(), 1000),
            Err(HeteroError::Computation(_))
        ));
        assert!(differential_entropy(&[1.0, 2.0], Bandwidth::default(), 1).is_err());
    }

    #[test]
    fn test_bandwidth_rules() {
        assert_eq!(Bandwidth::Fixed(0.5).resolve(100, 3.0), 0.5);
        assert!((Bandwidth::Scott.resolve(32, 2.0) - 1.0).abs() < 1e-12);
        assert!(Bandwidth::Silverman.resolve(32, 2.0) > 1.0);
    }
}
