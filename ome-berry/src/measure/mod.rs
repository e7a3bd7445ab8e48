//! 区域度量与感染分类.
//!
//! 对单帧标签图和第二通道强度图做逐像素单趟扫描, 产出固定 schema
//! 的区域度量表; 再由 [`classify_infected`] 以单帧自适应阈值标记
//! 感染区域.

use std::ops::Index;

use itertools::izip;
use ndarray::ArrayView2;
use serde::Serialize;

use crate::consts;
use crate::data::LabelMap;
use crate::error::{PipelineError, PipelineResult};
use crate::Idx2dF;

mod classify;
mod table;

pub use classify::classify_infected;

/// 单个连通区域的度量记录, 一行对应一个标签.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionRecord {
    /// 区域标签值.
    pub label: u32,

    /// 区域面积 (像素数).
    pub area: u64,

    /// 第二通道强度在区域内的平均值.
    pub mean_intensity: f64,

    /// 第二通道强度在区域内的最大值.
    pub max_intensity: f32,

    /// 区域质心的行坐标 (像素坐标系).
    pub centroid_row: f64,

    /// 区域质心的列坐标 (像素坐标系).
    pub centroid_col: f64,

    /// 感染判定结果. 由 [`classify_infected`] 填写, 初始为 `false`.
    pub infected: bool,
}

impl RegionRecord {
    /// 获取质心坐标 `(row, col)`.
    #[inline]
    pub fn centroid(&self) -> Idx2dF {
        (self.centroid_row, self.centroid_col)
    }
}

/// 单帧区域度量表. 行按标签升序排列, schema 固定.
///
/// 零行是合法结果 (标签图全背景), 不是错误.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementTable {
    rows: Vec<RegionRecord>,
}

impl Index<usize> for MeasurementTable {
    type Output = RegionRecord;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.rows[index]
    }
}

impl From<Vec<RegionRecord>> for MeasurementTable {
    #[inline]
    fn from(rows: Vec<RegionRecord>) -> Self {
        Self { rows }
    }
}

impl MeasurementTable {
    /// 获取表内行数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 表是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 以切片形式获取所有行.
    #[inline]
    pub fn rows(&self) -> &[RegionRecord] {
        &self.rows
    }

    /// 获取能按标签升序迭代所有行的迭代器.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &RegionRecord> {
        self.rows.iter()
    }

    /// 获取被标记为感染的行数.
    #[inline]
    pub fn infected_count(&self) -> usize {
        self.rows.iter().filter(|r| r.infected).count()
    }
}

/// 对标签图和同形状的强度图做区域统计, 每个正标签产出一行:
/// 面积、强度均值/最大值、质心. 行按标签升序排列.
///
/// `intensity` 通常是第二通道 (如病毒信号) 的投影图.
/// 形状与标签图不一致时返回 [`PipelineError::ShapeMismatch`];
/// 标签图全背景时返回空表 (`Ok`).
pub fn measure_regions(
    map: &LabelMap,
    intensity: ArrayView2<'_, f32>,
) -> PipelineResult<MeasurementTable> {
    if map.shape() != intensity.dim() {
        return Err(PipelineError::ShapeMismatch(map.shape(), intensity.dim()));
    }

    // 以标签值为下标的累加器组. 0 号位属于背景, 不输出.
    let n = map.max_label() as usize;
    let mut areas = vec![0u64; n + 1];
    let mut sums = vec![0f64; n + 1];
    let mut maxes = vec![f32::NEG_INFINITY; n + 1];
    let mut row_sums = vec![0f64; n + 1];
    let mut col_sums = vec![0f64; n + 1];

    for ((y, x), &label) in map.indexed_iter() {
        if consts::is_background(label) {
            continue;
        }
        let v = intensity[(y, x)];
        let k = label as usize;
        areas[k] += 1;
        sums[k] += v as f64;
        maxes[k] = maxes[k].max(v);
        row_sums[k] += y as f64;
        col_sums[k] += x as f64;
    }

    let rows: Vec<RegionRecord> = izip!(
        1u32..,
        &areas[1..],
        &sums[1..],
        &maxes[1..],
        &row_sums[1..],
        &col_sums[1..]
    )
    .filter(|(_, &area, ..)| area > 0)
    .map(|(label, &area, &sum, &max, &rs, &cs)| {
        let area_f = area as f64;
        RegionRecord {
            label,
            area,
            mean_intensity: sum / area_f,
            max_intensity: max,
            centroid_row: rs / area_f,
            centroid_col: cs / area_f,
            infected: false,
        }
    })
    .collect();

    Ok(MeasurementTable::from(rows))
}
