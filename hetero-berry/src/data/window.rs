use crate::consts::mask::GRAY_DIVISOR;

/// 强度截断窗口 `[lower, upper]`.
///
/// 切片的窗口由其 `mean ± std` 给出, 下限不低于 0.
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClipWindow {
    lower: f64,
    upper: f64,
}

impl ClipWindow {
    /// 构建截断窗口.
    ///
    /// 上下限必须有限且 `lower <= upper`, 否则返回 `None`.
    pub fn new(lower: f64, upper: f64) -> Option<Self> {
        if lower.is_finite() && upper.is_finite() && lower <= upper {
            Some(Self { lower, upper })
        } else {
            None
        }
    }

    /// 由切片的均值与总体标准差构建窗口 `[max(mean - std, 0), mean + std]`.
    ///
    /// 统计量无意义 (inf, NaN, 负标准差) 时返回 `None`.
    pub fn from_mean_std(mean: f64, std: f64) -> Option<Self> {
        if std < 0.0 {
            return None;
        }
        Self::new((mean - std).max(0.0), mean + std)
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f64 {
        self.lower
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f64 {
        self.upper
    }

    /// 截断后写回 `u16` 体素时得到的整数强度.
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn clip(&self, v: f64) -> Option<u16> {
        if !v.is_finite() {
            return None;
        }
        // 截断到窗口后向零取整, 与写回整型数组一致.
        Some(v.clamp(self.lower, self.upper).floor().min(u16::MAX as f64) as u16)
    }

    /// 求 `v` 截断并量化后的 8-bit 灰度值. 整数除以 255, 结果饱和到 255.
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, v: f64) -> Option<u8> {
        let clipped = self.clip(v)? as u32;
        Some((clipped / GRAY_DIVISOR).min(u8::MAX as u32) as u8)
    }
}

#[cfg(test)]
mod tests {
    use crate::ClipWindow;

    fn is_valid_init(lower: f64, upper: f64) -> bool {
        ClipWindow::new(lower, upper).is_some()
    }

    #[test]
    fn test_clip_window_invalid_input() {
        assert!(!is_valid_init(1.0, 0.0));
        assert!(!is_valid_init(f64::NAN, 1.0));
        assert!(!is_valid_init(0.0, f64::INFINITY));
        assert!(is_valid_init(3.0, 3.0));
        assert!(ClipWindow::from_mean_std(10.0, -1.0).is_none());
    }

    #[test]
    fn test_clip_window_lower_floor() {
        let w = ClipWindow::from_mean_std(100.0, 300.0).unwrap();
        assert_eq!(w.lower_bound(), 0.0);
        assert_eq!(w.upper_bound(), 400.0);
    }

    #[test]
    fn test_clip_window_generic() {
        // [1000, 3000]
        let w = ClipWindow::from_mean_std(2000.0, 1000.0).unwrap();
        assert_eq!(w.eval(f64::NAN), None);
        assert_eq!(w.clip(0.0), Some(1000));
        assert_eq!(w.clip(65535.0), Some(3000));
        assert_eq!(w.clip(1234.9), Some(1234));

        // 1000 / 255 == 3
        assert_eq!(w.eval(0.0), Some(3));
        // 3000 / 255 == 11
        assert_eq!(w.eval(60000.0), Some(11));
        assert_eq!(w.eval(2039.0), Some(7));
        assert_eq!(w.eval(2040.0), Some(8));
    }

    #[test]
    fn test_clip_window_saturates() {
        let w = ClipWindow::new(0.0, 65535.0).unwrap();
        // 65535 / 255 == 257, 饱和到 255.
        assert_eq!(w.eval(65535.0), Some(u8::MAX));
        assert_eq!(w.eval(65025.0), Some(u8::MAX));
        assert_eq!(w.eval(65024.0), Some(254));
    }
}
