//! Otsu 全局阈值分割.

use itertools::izip;
use ndarray::ArrayView2;
use ordered_float::NotNan;

use crate::consts::{ElemType, OTSU_BINS};
use crate::error::{PipelineError, PipelineResult};
use crate::BinaryMask;

/// 在 `[min, max]` 上以 [`OTSU_BINS`] 个 bin 的直方图计算 Otsu 全局阈值,
/// 即最大化前景/背景两类间方差的切分点, 返回获胜 bin 的中心值.
/// 多个 bin 并列最优时取最低的那个.
///
/// - 图像包含非有限值 (NaN / inf) 时返回 [`PipelineError::DegenerateFrame`];
/// - 常数图像 (或空图像) 不存在可用切分点, 返回 `Ok(None)`,
///   由调用方决定回退策略. 流水线采用的回退见 [`otsu_mask`].
pub fn otsu_level(img: ArrayView2<'_, f32>) -> PipelineResult<Option<f32>> {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in img.iter() {
        if !v.is_finite() {
            return Err(PipelineError::DegenerateFrame);
        }
        min = min.min(v);
        max = max.max(v);
    }
    if !(min < max) {
        return Ok(None);
    }

    let span = (max - min) as f64;
    let width = span / OTSU_BINS as f64;
    let mut hist = [0u64; OTSU_BINS];
    for &v in img.iter() {
        let bin = ((v - min) as f64 / span * OTSU_BINS as f64) as usize;
        hist[bin.min(OTSU_BINS - 1)] += 1;
    }

    // 以 bin 中心为强度代表值.
    let centers: Vec<f64> = (0..OTSU_BINS)
        .map(|i| min as f64 + (i as f64 + 0.5) * width)
        .collect();
    let total = img.len() as f64;
    let total_sum: f64 = izip!(&hist, &centers).map(|(&n, &c)| n as f64 * c).sum();

    // 在 bin i 之后切分时的两类间方差. 空类记 -inf, 不参与选取.
    let mut weight_b = 0.0f64;
    let mut sum_b = 0.0f64;
    let mut scores = Vec::with_capacity(OTSU_BINS - 1);
    for i in 0..OTSU_BINS - 1 {
        weight_b += hist[i] as f64;
        sum_b += hist[i] as f64 * centers[i];
        let weight_f = total - weight_b;
        if weight_b == 0.0 || weight_f == 0.0 {
            scores.push(f64::NEG_INFINITY);
            continue;
        }
        let mean_b = sum_b / weight_b;
        let mean_f = (total_sum - sum_b) / weight_f;
        let diff = mean_b - mean_f;
        scores.push(weight_b * weight_f * diff * diff);
    }

    // 从高位向低位扫描, 使并列最优时选中最低 bin.
    // 方差在此处总是有限值, `NotNan` 构造不会失败, 可直接 unwrap.
    let (best, _) = scores
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|(_, s)| NotNan::new(**s).unwrap())
        .unwrap();

    Ok(Some(centers[best] as f32))
}

/// 按阈值将单个像素归类. 严格大于 `level` 为前景.
#[inline]
pub fn classify(value: f32, level: f32) -> ElemType {
    if value > level {
        ElemType::Foreground
    } else {
        ElemType::Background
    }
}

/// 以 `level` 为阈值生成前景掩膜: 像素值严格大于 `level` 时为前景.
pub fn binarize(img: ArrayView2<'_, f32>, level: f32) -> BinaryMask {
    img.mapv(|v| classify(v, level).is_foreground())
}

/// 对单帧图像执行完整的阈值分割: 计算 Otsu 阈值并生成前景掩膜.
///
/// 常数图像没有可用阈值, 回退策略为全背景掩膜. 该回退是确定性的,
/// 不产生错误; 调用方通过掩膜统计即可识别空结果.
pub fn otsu_mask(img: ArrayView2<'_, f32>) -> PipelineResult<BinaryMask> {
    match otsu_level(img)? {
        Some(level) => Ok(binarize(img, level)),
        None => {
            log::warn!("constant frame, falling back to empty mask");
            Ok(BinaryMask::from_elem(img.dim(), false))
        }
    }
}
