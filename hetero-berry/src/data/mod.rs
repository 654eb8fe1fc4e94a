use std::ops::{Index, Range};

use ndarray::{s, Array3, ArrayView3, Axis};

use crate::{Idx2d, Idx3d};

pub mod slice;
pub mod window;

pub use slice::{MaskParams, PlugMask, VolumeSlice};
pub use window::ClipWindow;

/// 3D 岩心扫描体数据, 按 `(z, x, y)` 组织, 体素为 `u16` 强度值.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    data: Array3<u16>,
}

impl Index<Idx3d> for Volume {
    type Output = u16;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl From<Array3<u16>> for Volume {
    #[inline]
    fn from(data: Array3<u16>) -> Self {
        Self::new(data)
    }
}

impl Volume {
    /// 直接由 `(z, x, y)` 数组创建.
    #[inline]
    pub fn new(data: Array3<u16>) -> Self {
        Self { data }
    }

    /// 获取数据形状 `(z, x, y)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获取水平切片形状 `(x, y)`.
    #[inline]
    pub fn slice_shape(&self) -> Idx2d {
        let (_, x, y) = self.shape();
        (x, y)
    }

    /// 获取水平切片个数.
    #[inline]
    pub fn len_z(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// 体数据是否不含任何体素.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 获取第 `z_index` 层水平切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> VolumeSlice<'_> {
        VolumeSlice::new(self.data.index_axis(Axis(0), z_index))
    }

    /// 获取能按升序迭代水平切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = VolumeSlice> {
        self.data.axis_iter(Axis(0)).map(VolumeSlice::new)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, u16> {
        self.data.view()
    }

    /// 取出底层数组.
    #[inline]
    pub fn into_data(self) -> Array3<u16> {
        self.data
    }

    /// 按 `bounds` 裁剪出 ROI 视图.
    ///
    /// 当 `bounds` 超出体数据范围时 panic. 调用方应先用 [`Bounds::is_within`] 检查.
    pub fn crop(&self, bounds: &Bounds) -> ArrayView3<'_, u16> {
        self.data.slice(s![
            bounds.z_range(),
            bounds.x_range(),
            bounds.y_range()
        ])
    }
}

/// 立方体 ROI. 三个方向均为半开区间 `[ini, fin)`.
///
/// `x` 对应数组第 1 维 (切片的行), `y` 对应数组第 2 维 (切片的列).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    /// z 起点.
    pub z_ini: usize,
    /// z 终点 (不含).
    pub z_fin: usize,
    /// x (行) 起点.
    pub x_ini: usize,
    /// x (行) 终点 (不含).
    pub x_fin: usize,
    /// y (列) 起点.
    pub y_ini: usize,
    /// y (列) 终点 (不含).
    pub y_fin: usize,
}

impl Bounds {
    /// z 方向区间.
    #[inline]
    pub fn z_range(&self) -> Range<usize> {
        self.z_ini..self.z_fin
    }

    /// x 方向区间.
    #[inline]
    pub fn x_range(&self) -> Range<usize> {
        self.x_ini..self.x_fin
    }

    /// y 方向区间.
    #[inline]
    pub fn y_range(&self) -> Range<usize> {
        self.y_ini..self.y_fin
    }

    /// 三个方向的边长 `(z, x, y)`. 区间颠倒时对应边长为 0.
    #[inline]
    pub fn extents(&self) -> Idx3d {
        (
            self.z_fin.saturating_sub(self.z_ini),
            self.x_fin.saturating_sub(self.x_ini),
            self.y_fin.saturating_sub(self.y_ini),
        )
    }

    /// ROI 内体素个数.
    #[inline]
    pub fn voxels(&self) -> usize {
        let (z, x, y) = self.extents();
        z * x * y
    }

    /// 三个方向是否都满足 `0 <= ini < fin <= 对应维度`.
    pub fn is_within(&self, (z, x, y): Idx3d) -> bool {
        self.z_ini < self.z_fin
            && self.z_fin <= z
            && self.x_ini < self.x_fin
            && self.x_fin <= x
            && self.y_ini < self.y_fin
            && self.y_fin <= y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_bounds_geometry() {
        let b = Bounds {
            z_ini: 2,
            z_fin: 10,
            x_ini: 1,
            x_fin: 5,
            y_ini: 3,
            y_fin: 7,
        };
        assert_eq!(b.extents(), (8, 4, 4));
        assert_eq!(b.voxels(), 128);
        assert!(b.is_within((10, 5, 7)));
        assert!(!b.is_within((9, 5, 7)));
        assert!(!b.is_within((10, 4, 7)));

        let flipped = Bounds { z_fin: 1, ..b };
        assert_eq!(flipped.extents().0, 0);
        assert!(!flipped.is_within((10, 5, 7)));
    }

    #[test]
    fn test_volume_crop_and_index() {
        let data = Array3::from_shape_fn((4, 5, 6), |(z, x, y)| (z * 100 + x * 10 + y) as u16);
        let vol = Volume::new(data);
        assert_eq!(vol.shape(), (4, 5, 6));
        assert_eq!(vol.slice_shape(), (5, 6));
        assert_eq!(vol.len_z(), 4);
        assert_eq!(vol[(3, 2, 1)], 321);
        assert_eq!(vol.slice_iter().len(), 4);
        assert_eq!(vol.slice_at(2).array_view()[(4, 5)], 245);

        let b = Bounds {
            z_ini: 1,
            z_fin: 3,
            x_ini: 2,
            x_fin: 4,
            y_ini: 0,
            y_fin: 2,
        };
        let roi = vol.crop(&b);
        assert_eq!(roi.dim(), (2, 2, 2));
        assert_eq!(roi[(0, 0, 0)], 120);
        assert_eq!(roi[(1, 1, 1)], 231);
    }
}
