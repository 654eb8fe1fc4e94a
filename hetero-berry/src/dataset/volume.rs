use std::fmt;
use std::ops::Range;
use std::path::Path;

use ndarray::{s, Array3, ArrayView3, Ix3};
use ndarray_npy::ReadNpyError;
use nifti::{IntoNdArray, NiftiObject, NiftiType, ReaderOptions};

use crate::{HeteroError, HeteroResult, Idx3d, Volume};

/// 体素的存储类型.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoxelType {
    /// 16-bit 无符号整数, 唯一被接受的类型.
    U16,
    /// 其它类型, 附带文件中记录的类型描述.
    Other(String),
}

impl fmt::Display for VoxelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U16 => f.write_str("u16"),
            Self::Other(d) => f.write_str(d),
        }
    }
}

/// 3D 体数据源. 所有数据按 `(z, x, y)` 组织.
pub trait VolumeSource {
    /// 体素存储类型.
    fn dtype(&self) -> VoxelType;

    /// 形状 `(z, x, y)`. 体素类型不被接受时为 `(0, 0, 0)`.
    fn shape(&self) -> Idx3d;

    /// 读取子体数据.
    fn read_subvolume(
        &self,
        z: Range<usize>,
        x: Range<usize>,
        y: Range<usize>,
    ) -> HeteroResult<Array3<u16>>;

    /// 读取完整体数据.
    fn read_all(&self) -> HeteroResult<Volume> {
        let (z, x, y) = self.shape();
        self.read_subvolume(0..z, 0..x, 0..y).map(Volume::from)
    }
}

fn check_dtype(dtype: &VoxelType) -> HeteroResult<()> {
    match dtype {
        VoxelType::U16 => Ok(()),
        VoxelType::Other(d) => Err(HeteroError::validation(format!(
            "voxel type {d} is not supported, expected u16"
        ))),
    }
}

fn sub(
    data: ArrayView3<u16>,
    z: Range<usize>,
    x: Range<usize>,
    y: Range<usize>,
) -> HeteroResult<Array3<u16>> {
    let (lz, lx, ly) = data.dim();
    let ok = |r: &Range<usize>, len: usize| r.start <= r.end && r.end <= len;
    if !(ok(&z, lz) && ok(&x, lx) && ok(&y, ly)) {
        return Err(HeteroError::validation(format!(
            "subvolume {z:?} x {x:?} x {y:?} is out of a {lz}x{lx}x{ly} volume"
        )));
    }
    Ok(data.slice(s![z, x, y]).to_owned())
}

impl VolumeSource for Volume {
    #[inline]
    fn dtype(&self) -> VoxelType {
        VoxelType::U16
    }

    #[inline]
    fn shape(&self) -> Idx3d {
        Volume::shape(self)
    }

    fn read_subvolume(
        &self,
        z: Range<usize>,
        x: Range<usize>,
        y: Range<usize>,
    ) -> HeteroResult<Array3<u16>> {
        sub(self.data(), z, x, y)
    }

    fn read_all(&self) -> HeteroResult<Volume> {
        Ok(self.clone())
    }
}

/// `.npy` 体数据. 文件在打开时整体读入内存.
#[derive(Debug)]
pub struct NpyVolume {
    dtype: VoxelType,
    data: Array3<u16>,
}

impl NpyVolume {
    /// 打开 `.npy` 文件. 数组维数不为 3 时返回错误;
    /// 元素类型不是 `u16` 时仍然成功打开, 但读取数据时返回错误.
    pub fn open<P: AsRef<Path>>(path: P) -> HeteroResult<Self> {
        match ndarray_npy::read_npy::<_, Array3<u16>>(path.as_ref()) {
            Ok(data) => Ok(Self {
                dtype: VoxelType::U16,
                data,
            }),
            Err(e @ ReadNpyError::WrongDescriptor(_)) => Ok(Self {
                dtype: VoxelType::Other(e.to_string()),
                data: Array3::zeros((0, 0, 0)),
            }),
            Err(e @ ReadNpyError::WrongNdim(..)) => Err(HeteroError::validation(e.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

impl VolumeSource for NpyVolume {
    #[inline]
    fn dtype(&self) -> VoxelType {
        self.dtype.clone()
    }

    #[inline]
    fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    fn read_subvolume(
        &self,
        z: Range<usize>,
        x: Range<usize>,
        y: Range<usize>,
    ) -> HeteroResult<Array3<u16>> {
        check_dtype(&self.dtype)?;
        sub(self.data.view(), z, x, y)
    }
}

/// NIfTI (`.nii`, `.nii.gz`) 体数据.
///
/// NIfTI 按 `[W, H, z]` 存储, 打开时转换为 `(z, H, W)`,
/// 即原第一维向下增长 (行, `x`), 原第二维向右增长 (列, `y`).
#[derive(Debug)]
pub struct NiftiVolume {
    dtype: VoxelType,
    data: Array3<u16>,
}

impl NiftiVolume {
    /// 打开 NIfTI 文件. 元素类型不是 `u16` 时仍然成功打开, 但读取数据时返回错误.
    pub fn open<P: AsRef<Path>>(path: P) -> HeteroResult<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let datatype = obj.header().data_type()?;
        if datatype != NiftiType::Uint16 {
            return Ok(Self {
                dtype: VoxelType::Other(format!("{datatype:?}")),
                data: Array3::zeros((0, 0, 0)),
            });
        }

        let data = obj
            .into_volume()
            .into_ndarray::<u16>()?
            .into_dimensionality::<Ix3>()
            .map_err(|e| HeteroError::validation(format!("NIfTI volume is not 3-d: {e}")))?
            .permuted_axes([2, 1, 0]);
        Ok(Self {
            dtype: VoxelType::U16,
            data,
        })
    }
}

impl VolumeSource for NiftiVolume {
    #[inline]
    fn dtype(&self) -> VoxelType {
        self.dtype.clone()
    }

    #[inline]
    fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    fn read_subvolume(
        &self,
        z: Range<usize>,
        x: Range<usize>,
        y: Range<usize>,
    ) -> HeteroResult<Array3<u16>> {
        check_dtype(&self.dtype)?;
        sub(self.data.view(), z, x, y)
    }
}

/// 按扩展名打开体数据: `.npy`, `.nii`, `.nii.gz`.
pub fn open_volume<P: AsRef<Path>>(path: P) -> HeteroResult<Box<dyn VolumeSource + Send + Sync>> {
    let path = path.as_ref();
    let name = path.to_string_lossy();
    if name.ends_with(".npy") {
        Ok(Box::new(NpyVolume::open(path)?))
    } else if name.ends_with(".nii") || name.ends_with(".nii.gz") {
        Ok(Box::new(NiftiVolume::open(path)?))
    } else {
        Err(HeteroError::validation(format!(
            "unknown volume format: {}",
            path.display()
        )))
    }
}
