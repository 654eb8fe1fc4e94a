//! 一维样本的基础统计量.
//!
//! 所有累加都按输入顺序串行进行, 因此同样的输入总是得到逐位相同的结果.

/// 一组样本的中心矩与极值.
///
/// 中心矩均为有偏 (除以 `n`) 估计.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Moments {
    n: usize,
    mean: f64,
    m2: f64,
    m3: f64,
    m4: f64,
    min: f64,
    max: f64,
}

impl Moments {
    /// 两遍扫描计算中心矩. 输入为空时返回 `None`.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len();
        let nf = n as f64;

        let (mut sum, mut min, mut max) = (0.0, f64::INFINITY, f64::NEG_INFINITY);
        for &v in values {
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        let mean = sum / nf;

        let (mut s2, mut s3, mut s4) = (0.0, 0.0, 0.0);
        for &v in values {
            let d = v - mean;
            let d2 = d * d;
            s2 += d2;
            s3 += d2 * d;
            s4 += d2 * d2;
        }

        Some(Self {
            n,
            mean,
            m2: s2 / nf,
            m3: s3 / nf,
            m4: s4 / nf,
            min,
            max,
        })
    }

    /// 样本个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    /// 构造保证 `n > 0`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 均值.
    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// 总体方差.
    #[inline]
    pub fn variance(&self) -> f64 {
        self.m2
    }

    /// 总体标准差.
    #[inline]
    pub fn std(&self) -> f64 {
        self.m2.sqrt()
    }

    /// 最小值.
    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值.
    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// 方差相对均值是否小到可以视作零 (此时高阶矩无定义).
    #[inline]
    fn is_degenerate(&self) -> bool {
        self.m2 <= (f64::EPSILON * self.mean).powi(2)
    }

    /// 有偏 Fisher-Pearson 偏度 `m3 / m2^1.5`. 方差退化时为 NaN.
    pub fn skewness(&self) -> f64 {
        if self.is_degenerate() {
            f64::NAN
        } else {
            self.m3 / self.m2.powf(1.5)
        }
    }

    /// 有偏超额峰度 `m4 / m2^2 - 3`. 方差退化时为 NaN.
    pub fn kurtosis(&self) -> f64 {
        if self.is_degenerate() {
            f64::NAN
        } else {
            self.m4 / (self.m2 * self.m2) - 3.0
        }
    }

    /// 变异系数 `std / mean`. 均值为零时为 NaN.
    pub fn variation(&self) -> f64 {
        if self.mean == 0.0 {
            f64::NAN
        } else {
            self.std() / self.mean
        }
    }
}

/// 中位数. 偶数个样本时取中间两个值的平均. 会就地重排 `values`.
///
/// 输入为空时返回 `None`. NaN 按 `total_cmp` 排在最后.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// 均值与总体标准差. 输入为空时返回 `None`.
pub fn mean_std<I: IntoIterator<Item = f64>>(it: I) -> Option<(f64, f64)> {
    let values: Vec<f64> = it.into_iter().collect();
    Moments::from_slice(&values).map(|m| (m.mean(), m.std()))
}
