use super::morph;
use crate::consts::mask::*;
use crate::data::ClipWindow;
use crate::Idx2d;
use ndarray::iter::Iter;
use ndarray::{Array2, ArrayView2, Ix2};
use std::ops::Index;

/// 切片二值化参数.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaskParams {
    /// 膨胀核边长.
    pub dilate_kernel: usize,
    /// 膨胀迭代次数.
    pub dilate_iterations: usize,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            dilate_kernel: DILATE_KERNEL,
            dilate_iterations: DILATE_ITERATIONS,
        }
    }
}

/// 不可变、借用的二维水平扫描切片.
#[derive(Clone)]
pub struct VolumeSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::Volume`].
    data: ArrayView2<'a, u16>,
}

impl Index<Idx2d> for VolumeSlice<'_> {
    type Output = u16;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl<'a> VolumeSlice<'a> {
    /// 直接初始化.
    #[inline]
    pub(crate) fn new(data: ArrayView2<'a, u16>) -> Self {
        Self { data }
    }

    /// 获得 **底层** 数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<u16> {
        self.data.view()
    }

    /// 获取可以迭代图像像素的迭代器.
    #[inline]
    pub fn iter(&self) -> Iter<'_, u16, Ix2> {
        self.data.iter()
    }

    /// 获取切片形状 `(x, y)`.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 获取像素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 像素强度的均值与总体标准差. 切片为空时返回 `None`.
    pub fn mean_std(&self) -> Option<(f64, f64)> {
        crate::stats::mean_std(self.data.iter().map(|&v| v as f64))
    }

    /// 由 `mean ± std` 得到的截断窗口.
    #[inline]
    pub fn clip_window(&self) -> Option<ClipWindow> {
        let (mean, std) = self.mean_std()?;
        ClipWindow::from_mean_std(mean, std)
    }

    /// 截断并量化为 8-bit 灰度图.
    pub fn to_gray(&self) -> Option<Array2<u8>> {
        let window = self.clip_window()?;
        let mut gray = Array2::zeros(self.shape());
        for (dst, &v) in gray.iter_mut().zip(self.data.iter()) {
            *dst = window.eval(v as f64)?;
        }
        Some(gray)
    }

    /// 计算岩心掩膜: 截断, 量化, Otsu 二值化, 膨胀.
    ///
    /// 切片为空时返回 `None`.
    pub fn plug_mask(&self, params: &MaskParams) -> Option<PlugMask> {
        let gray = self.to_gray()?;
        let t = morph::otsu_threshold(&morph::histogram(gray.view()));
        let binary = gray.mapv(|v| v > t);
        let data = morph::dilate(
            binary.view(),
            params.dilate_kernel,
            params.dilate_iterations,
        );
        Some(PlugMask { data })
    }
}

/// 二值岩心掩膜. `true` 表示岩石像素, `false` 表示孔隙 (背景) 像素.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlugMask {
    data: Array2<bool>,
}

impl Index<Idx2d> for PlugMask {
    type Output = bool;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl From<Array2<bool>> for PlugMask {
    #[inline]
    fn from(data: Array2<bool>) -> Self {
        Self { data }
    }
}

impl PlugMask {
    /// 获得 **底层** 数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<bool> {
        self.data.view()
    }

    /// 获取掩膜形状.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 获取给定位置是否为岩石. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<bool> {
        self.data.get(pos).copied()
    }

    /// 按行优先顺序迭代掩膜.
    #[inline]
    pub fn iter(&self) -> Iter<'_, bool, Ix2> {
        self.data.iter()
    }

    /// 岩石像素个数.
    pub fn rock_count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// 孔隙像素个数.
    #[inline]
    pub fn void_count(&self) -> usize {
        self.data.len() - self.rock_count()
    }

    /// 该位置是否有 4-邻接的孔隙邻居. 越界邻居不计.
    pub fn has_n4_void(&self, (h, w): Idx2d) -> bool {
        let (mh, mw) = self.shape();
        (h > 0 && !self.data[(h - 1, w)])
            || (h + 1 < mh && !self.data[(h + 1, w)])
            || (w > 0 && !self.data[(h, w - 1)])
            || (w + 1 < mw && !self.data[(h, w + 1)])
    }

    /// 是否为边缘像素: 岩石像素, 且存在 4-邻接的孔隙邻居.
    #[inline]
    pub fn is_edge(&self, pos: Idx2d) -> bool {
        self.data[pos] && self.has_n4_void(pos)
    }

    /// 按行优先顺序收集所有边缘像素.
    pub fn edge_positions(&self) -> Vec<Idx2d> {
        self.data
            .indexed_iter()
            .filter(|&(pos, &v)| v && self.has_n4_void(pos))
            .map(|(pos, _)| pos)
            .collect()
    }
}
