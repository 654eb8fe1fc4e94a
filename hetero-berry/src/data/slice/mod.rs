//! 水平切片对象及其二值化操作.

mod core;
mod morph;

pub use core::{MaskParams, PlugMask, VolumeSlice};

pub use morph::{dilate, histogram, otsu_threshold};
