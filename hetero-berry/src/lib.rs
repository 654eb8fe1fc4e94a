#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 对 3D 岩心 (plug) CT 扫描进行纹理异质性分析,
//! 并在不断增长的样本群体中给出每个样本的百分位排名.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 只接受 16-bit 无符号整数体素 (`u16`) 的 3D 扫描,
//!   其它类型的输入在进入流水线之前就会被拒绝.
//! 2. 体数据一律按 `(z, x, y)` 组织. 其中 `x` 对应水平切片的行 (高),
//!   `y` 对应水平切片的列 (宽).
//! 3. 群体熵值表是整个系统中唯一持久化、可变的共享状态,
//!   其更新对单个样本而言是原子的 (要么全部生效, 要么完全不变).
//!
//! # 开发计划
//!
//! ### 基于逐切片圆检测的立方体 ROI 自动定位 ✅
//!
//! 每个采样切片依次做 `mean ± std` 截断, 8-bit 量化, Otsu 二值化,
//! 2x2 膨胀, 然后用 Hough 梯度投票找到岩心圆截面. 所有切片的内接正方形求交,
//! 再收缩容差并裁成正方形, 最后推导 z 方向范围.
//!
//! 实现位于 `hetero-berry/src/bounds`.
//!
//! ### 对比度校准 (voidmean / rockmedian) ✅
//!
//! 随机抽取至多 100 个切片, 以与 ROI 定位完全相同的掩膜流程区分孔隙和岩石,
//! 取各切片统计量的中位数.
//!
//! 实现位于 `hetero-berry/src/calibrate`.
//!
//! ### 多分辨率网格特征 ✅
//!
//! 按 `division` 把 ROI 划分为等边子立方体, 逐个计算均值, 标准差, 极值,
//! 偏度, 峰度, 变异系数, 中位数.
//!
//! 实现位于 `hetero-berry/src/grid`.
//!
//! ### 特征熵 (离散 Shannon 熵 / 连续 KDE 微分熵) ✅
//!
//! 实现位于 `hetero-berry/src/entropy`.
//!
//! ### 群体百分位排名 ✅
//!
//! 同名样本重复提交时原子替换旧行; 并列值取平均名次.
//!
//! 实现位于 `hetero-berry/src/rank`.
//!
//! ### 外部接口 ✅
//!
//! 1. 体数据源: `.npy` 与 NIfTI. ✅
//! 2. 参考特征库 (用于熵计算前的标准化): CSV. ✅
//! 3. 各阶段结果表与群体熵值表的 CSV 持久化. ✅
//!
//! 实现位于 `hetero-berry/src/dataset`.
//!
//! ### 完善代码文档 ✅
//!
//! 给每个 public API 提供文档, 并视情况给 private
//! API 提供文档.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 3D 体数据基础结构.
mod data;

pub use data::{Bounds, ClipWindow, MaskParams, PlugMask, Volume, VolumeSlice};

pub mod bounds;
pub mod calibrate;
pub mod config;
pub mod consts;
pub mod dataset;
pub mod entropy;
mod error;
pub mod grid;
pub mod parallel;
pub mod pipeline;
pub mod prelude;
pub mod rank;
pub mod stats;

pub use error::{HeteroError, HeteroResult};

#[cfg(test)]
pub(crate) mod test_utils;
