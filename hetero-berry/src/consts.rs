//! 通用常量.

/// ROI 定位与对比度校准共用的切片掩膜参数.
pub mod mask {
    /// 膨胀核的边长 (全 1 方形核).
    pub const DILATE_KERNEL: usize = 2;

    /// 膨胀迭代次数.
    pub const DILATE_ITERATIONS: usize = 7;

    /// 8-bit 量化时的整数除数. `u16` 体素值除以它后饱和到 `u8`.
    pub const GRAY_DIVISOR: u32 = 255;
}

/// ROI 定位参数的默认值.
pub mod bounds {
    /// 以 z 中点为中心, 向两侧各取多少层切片参与检测.
    pub const HALF_WINDOW: usize = 50;

    /// 检测窗口内的切片步长.
    pub const STRIDE: usize = 10;

    /// 求交后每条边向内收缩的像素数.
    pub const TOLERANCE: usize = 10;

    /// Hough 累加器分辨率的倒数 (累加器每格对应 `DP x DP` 像素).
    pub const HOUGH_DP: usize = 2;

    /// Hough 累加器中心票数阈值.
    pub const HOUGH_ACCUMULATOR_THRESHOLD: u32 = 30;

    /// 未指定 z 范围时, 默认保留的深度比例 `[lo, hi)`.
    pub const DEFAULT_Z_FRACTION: (f64, f64) = (0.1, 0.9);
}

/// 对比度校准参数.
pub mod contrast {
    /// 用于估计 voidmean / rockmedian 的随机切片数.
    pub const SAMPLED_SLICES: usize = 100;

    /// 校准后岩石中位数被映射到的强度.
    pub const ROCK_TARGET: f64 = 32768.0;

    /// 校准结果的上限.
    pub const MAX_INTENSITY: f64 = 65535.0;
}

/// 熵估计参数.
pub mod entropy {
    /// 连续特征的积分网格点数.
    pub const GRID_POINTS: usize = 1000;

    /// 默认 KDE 带宽.
    pub const DEFAULT_BANDWIDTH: f64 = 1.0;
}

/// 百分位排名的上限.
pub const RANK_SCALE: f64 = 100.0;

/// 默认的网格划分因子.
pub const DEFAULT_DIVISIONS: [usize; 9] = [2, 3, 4, 5, 6, 7, 8, 9, 10];

/// 默认的对比度校准选项: 先校准, 再原样.
pub const DEFAULT_ADJUSTMENTS: [bool; 2] = [true, false];
