//! 切片平面上的轴对齐矩形, 以及 z 方向范围的推导.

use super::hough::Circle;
use crate::Idx2d;

/// 半开轴对齐矩形 `rows.0..rows.1` x `cols.0..cols.1`.
///
/// 坐标使用有符号整数, 中间计算可能短暂越界.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rect {
    /// 行区间.
    pub rows: (i64, i64),
    /// 列区间.
    pub cols: (i64, i64),
}

impl Rect {
    /// 圆的内接正方形 `[c - r/√2, c + r/√2]`, 端点向零取整后截断到切片 `(h, w)` 内.
    ///
    /// 截断后为空时返回 `None`.
    pub fn inscribed(circle: &Circle, (h, w): Idx2d) -> Option<Self> {
        let half = circle.r / std::f64::consts::SQRT_2;
        let cols = (
            ((circle.cx - half) as i64).max(0),
            ((circle.cx + half) as i64).min(w as i64),
        );
        let rows = (
            ((circle.cy - half) as i64).max(0),
            ((circle.cy + half) as i64).min(h as i64),
        );
        Self { rows, cols }.non_empty()
    }

    #[inline]
    fn non_empty(self) -> Option<Self> {
        (self.rows.0 < self.rows.1 && self.cols.0 < self.cols.1).then_some(self)
    }

    /// 行方向边长.
    #[inline]
    pub fn height(&self) -> i64 {
        self.rows.1 - self.rows.0
    }

    /// 列方向边长.
    #[inline]
    pub fn width(&self) -> i64 {
        self.cols.1 - self.cols.0
    }

    /// 求交. 交集为空时返回 `None`.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        Self {
            rows: (self.rows.0.max(other.rows.0), self.rows.1.min(other.rows.1)),
            cols: (self.cols.0.max(other.cols.0), self.cols.1.min(other.cols.1)),
        }
        .non_empty()
    }

    /// 每条边向内收缩 `tol`. 结果为空时返回 `None`.
    pub fn shrink(&self, tol: usize) -> Option<Self> {
        let t = tol as i64;
        Self {
            rows: (self.rows.0 + t, self.rows.1 - t),
            cols: (self.cols.0 + t, self.cols.1 - t),
        }
        .non_empty()
    }

    /// 居中裁去较长边的多余部分, 得到正方形.
    /// 多余量为奇数时, 终点一侧多裁一个像素.
    pub fn squarify(&self) -> Self {
        let side = self.height().min(self.width());
        let crop = |(lo, hi): (i64, i64)| {
            let diff = hi - lo - side;
            (lo + diff / 2, hi - (diff + 1) / 2)
        };
        Self {
            rows: crop(self.rows),
            cols: crop(self.cols),
        }
    }
}

/// 以 `len_z / 2` 为中点, 边长为 `side` 的 z 区间. 可能越界.
pub fn geometric_z(len_z: usize, side: usize) -> (i64, i64) {
    let mid = (len_z / 2) as i64;
    let half = (side / 2) as i64;
    (mid - half, mid + half + (side % 2) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inscribed() {
        let c = Circle {
            cx: 50.0,
            cy: 40.0,
            r: 28.4,
        };
        let r = Rect::inscribed(&c, (100, 100)).unwrap();
        // r / √2 ≈ 20.08
        assert_eq!(r.cols, (29, 70));
        assert_eq!(r.rows, (19, 60));

        let clamped = Rect::inscribed(&c, (50, 60)).unwrap();
        assert_eq!(clamped.rows, (19, 50));
        assert_eq!(clamped.cols, (29, 60));

        let outside = Circle {
            cx: -100.0,
            cy: 10.0,
            r: 5.0,
        };
        assert!(Rect::inscribed(&outside, (100, 100)).is_none());
    }

    #[test]
    fn test_intersect_shrink() {
        let a = Rect {
            rows: (0, 50),
            cols: (10, 60),
        };
        let b = Rect {
            rows: (20, 80),
            cols: (0, 40),
        };
        let i = a.intersect(&b).unwrap();
        assert_eq!(i.rows, (20, 50));
        assert_eq!(i.cols, (10, 40));

        let far = Rect {
            rows: (60, 70),
            cols: (0, 10),
        };
        assert!(a.intersect(&far).is_none());

        let s = i.shrink(10).unwrap();
        assert_eq!(s.rows, (30, 40));
        assert_eq!(s.cols, (20, 30));
        assert!(i.shrink(15).is_none());
    }

    #[test]
    fn test_squarify() {
        let r = Rect {
            rows: (0, 10),
            cols: (0, 15),
        };
        let s = r.squarify();
        assert_eq!(s.rows, (0, 10));
        // diff 5: 起点 +2, 终点 -3.
        assert_eq!(s.cols, (2, 12));
        assert_eq!(s.height(), s.width());
    }

    #[test]
    fn test_geometric_z() {
        assert_eq!(geometric_z(100, 40), (30, 70));
        assert_eq!(geometric_z(100, 41), (30, 71));
        assert_eq!(geometric_z(101, 41), (30, 71));
        assert_eq!(geometric_z(20, 40), (-10, 30));
    }
}
