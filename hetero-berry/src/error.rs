//! 运行时错误.

use thiserror::Error;

/// 流水线各阶段的错误分类.
///
/// 除 [`HeteroError::Computation`] 以外, 所有错误对当前样本都是致命的.
#[derive(Debug, Error)]
pub enum HeteroError {
    /// 输入不合法: 体素类型不是 `u16`, 给定的 z 范围不足以容纳 ROI,
    /// 未知特征名, 网格划分过细等.
    #[error("validation error: {0}")]
    Validation(String),

    /// 所有采样切片都没能检测到岩心圆截面, ROI 无法确定.
    #[error("detection error: {0}")]
    Detection(String),

    /// 统计量退化 (例如常数分布上的 KDE), 熵无定义.
    #[error("computation error: {0}")]
    Computation(String),

    /// 底层 I/O 错误 (缺失参考特征库, 数据集路径不存在等).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV 表读写错误.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// `.npy` 文件读取错误.
    #[error("npy error: {0}")]
    Npy(#[from] ndarray_npy::ReadNpyError),

    /// NIfTI 文件读取错误.
    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::NiftiError),
}

impl HeteroError {
    /// 是否会中止当前样本的处理.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Computation(_))
    }

    /// 是否属于 I/O 类错误.
    #[inline]
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Csv(_) | Self::Npy(_) | Self::Nifti(_)
        )
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn detection(msg: impl Into<String>) -> Self {
        Self::Detection(msg.into())
    }

    pub(crate) fn computation(msg: impl Into<String>) -> Self {
        Self::Computation(msg.into())
    }
}

/// 本 crate 通用的 `Result`.
pub type HeteroResult<T> = Result<T, HeteroError>;

#[cfg(test)]
mod tests {
    use super::HeteroError;

    #[test]
    fn test_only_computation_is_recoverable() {
        assert!(!HeteroError::computation("kde").is_fatal());
        assert!(HeteroError::validation("dtype").is_fatal());
        assert!(HeteroError::detection("circle").is_fatal());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "corpus");
        let e = HeteroError::from(io);
        assert!(e.is_fatal());
        assert!(e.is_io());
    }
}
