//! 测试用合成体数据.

use ndarray::Array3;

use crate::Volume;

/// 每层都相同的圆柱岩心: 以切片中心为圆心、半径 `radius` 的圆内为 `rock`, 其余为 `void`.
pub fn plug_volume(depth: usize, size: usize, radius: f64, rock: u16, void: u16) -> Volume {
    let c = size as f64 / 2.0;
    Volume::new(Array3::from_shape_fn((depth, size, size), |(_, x, y)| {
        if (x as f64 + 0.5 - c).hypot(y as f64 + 0.5 - c) <= radius {
            rock
        } else {
            void
        }
    }))
}

/// 确定性的纹理体数据, 强度随位置变化且各处不同.
pub fn textured_volume((z, x, y): (usize, usize, usize), base: u16) -> Array3<f32> {
    Array3::from_shape_fn((z, x, y), |(i, j, k)| {
        let wave = ((i * 7 + j * 13 + k * 29) % 97) as f32;
        let ramp = (i * x * y + j * y + k) as f32 * 0.01;
        base as f32 + wave * 10.0 + ramp
    })
}

/// 带纹理的圆柱岩心: 岩石强度随位置起伏, 并沿 z 方向缓慢增加; 孔隙强度恒为 1000.
pub fn textured_plug(depth: usize, size: usize, radius: f64) -> Volume {
    let c = size as f64 / 2.0;
    Volume::new(Array3::from_shape_fn((depth, size, size), |(z, x, y)| {
        if (x as f64 + 0.5 - c).hypot(y as f64 + 0.5 - c) <= radius {
            let wave = ((z * 7 + x * 13 + y * 29) % 97) as u16;
            19000 + wave * 5 + z as u16 * 20
        } else {
            1000
        }
    }))
}
