//! 各向同性高斯去噪.

use ndarray::{Array2, ArrayView2};

use crate::consts::GAUSS_TRUNCATE;

/// 一维归一化高斯核. 半径取 `ceil(GAUSS_TRUNCATE * sigma)`, 系数和为 1.
fn gaussian_taps(sigma: f32) -> Vec<f32> {
    debug_assert!(sigma > 0.0);
    let r = (GAUSS_TRUNCATE * sigma).ceil() as isize;
    let denom = 2.0 * sigma * sigma;
    let mut taps: Vec<f32> = (-r..=r)
        .map(|d| {
            let d2 = (d * d) as f32;
            (-d2 / denom).exp()
        })
        .collect();
    let sum: f32 = taps.iter().sum();
    taps.iter_mut().for_each(|t| *t /= sum);
    taps
}

/// reflect 边界索引映射, 边缘样本重复: `d c b a | a b c d | d c b a`.
/// 核半径大于图像时通过多次折返收敛.
#[inline]
fn reflect(mut i: isize, len: isize) -> usize {
    debug_assert!(len > 0);
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= len {
            i = 2 * len - i - 1;
        } else {
            return i as usize;
        }
    }
}

/// 对 2D 图像做各向同性高斯卷积, 返回同形状的新图像.
///
/// 卷积按水平、垂直两趟可分离实现, 边界按 reflect 方式延拓
/// (边缘样本重复). `sigma == 0` 时为恒等变换.
///
/// # 注意
///
/// `sigma` 必须非负且非 NaN, 否则程序 panic.
pub fn gaussian_blur(img: ArrayView2<'_, f32>, sigma: f32) -> Array2<f32> {
    assert!(sigma >= 0.0, "sigma 必须非负");
    if sigma == 0.0 {
        return img.to_owned();
    }

    let taps = gaussian_taps(sigma);
    let r = (taps.len() / 2) as isize;
    let (h, w) = img.dim();

    // 水平方向.
    let mut tmp = Array2::<f32>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, tap) in taps.iter().enumerate() {
                let sx = reflect(x as isize + k as isize - r, w as isize);
                acc += tap * img[(y, sx)];
            }
            tmp[(y, x)] = acc;
        }
    }

    // 垂直方向.
    let mut out = Array2::<f32>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, tap) in taps.iter().enumerate() {
                let sy = reflect(y as isize + k as isize - r, h as isize);
                acc += tap * tmp[(sy, x)];
            }
            out[(y, x)] = acc;
        }
    }
    out
}
