use crate::stats::Moments;

/// 按参考样本拟合的标准化变换 `(v - mean) / scale`.
///
/// `scale` 为参考样本的总体标准差; 标准差为 0 时取 1, 只做平移.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StandardScaler {
    mean: f64,
    scale: f64,
}

impl StandardScaler {
    /// 在 `reference` 上拟合. 输入为空时返回 `None`.
    pub fn fit(reference: &[f64]) -> Option<Self> {
        let m = Moments::from_slice(reference)?;
        let std = m.std();
        let scale = if std == 0.0 || !std.is_finite() { 1.0 } else { std };
        Some(Self {
            mean: m.mean(),
            scale,
        })
    }

    /// 均值.
    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// 缩放系数.
    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// 就地变换.
    pub fn transform(&self, values: &mut [f64]) {
        for v in values.iter_mut() {
            *v = (*v - self.mean) / self.scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StandardScaler;

    #[test]
    fn test_fit_transform() {
        let s = StandardScaler::fit(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(s.mean(), 5.0);
        assert_eq!(s.scale(), 2.0);
        let mut v = [5.0, 9.0, 1.0];
        s.transform(&mut v);
        assert_eq!(v, [0.0, 2.0, -2.0]);
    }

    #[test]
    fn test_constant_reference() {
        let s = StandardScaler::fit(&[3.0; 4]).unwrap();
        assert_eq!(s.scale(), 1.0);
        let mut v = [4.0];
        s.transform(&mut v);
        assert_eq!(v, [1.0]);
        assert!(StandardScaler::fit(&[]).is_none());
    }
}
