//! 单帧分割链与多帧编排.
//!
//! 单帧处理链: [`project_mean`] -> [`gaussian_blur`] -> [`otsu_mask`] ->
//! [`label_components`]. 多帧入口按请求顺序展开时间索引并聚合结果.
//! 每帧只读取体数据中自己的切片, 帧间没有共享可变状态,
//! 因此时间索引是天然的并行单位.

use std::sync::atomic::{AtomicBool, Ordering};

use either::Either;
use ndarray::Array2;

use crate::consts;
use crate::data::{LabelMap, MaskStack, Volume};
use crate::error::{PipelineError, PipelineResult};
use crate::measure::{self, MeasurementTable};

mod label;
mod project;
mod smooth;
mod threshold;

pub use label::label_components;
pub use project::project_mean;
pub use smooth::gaussian_blur;
pub use threshold::{binarize, classify, otsu_level, otsu_mask};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 一次分割请求的时间索引集合.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeSelection {
    /// 体数据时间轴上的全部索引, 按升序展开.
    All,

    /// 显式给定的索引列表. 保序, 允许重复.
    Indices(Vec<usize>),
}

impl Default for TimeSelection {
    #[inline]
    fn default() -> Self {
        Self::All
    }
}

impl From<Vec<usize>> for TimeSelection {
    #[inline]
    fn from(indices: Vec<usize>) -> Self {
        Self::Indices(indices)
    }
}

impl FromIterator<usize> for TimeSelection {
    #[inline]
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::Indices(iter.into_iter().collect())
    }
}

impl TimeSelection {
    /// 在时间轴长度为 `len_t` 的体数据上展开为具体索引序列.
    ///
    /// 仅做展开, 不做越界检查; 越界索引由分割入口统一报告.
    pub fn resolve(&self, len_t: usize) -> impl Iterator<Item = usize> + '_ {
        match self {
            Self::All => Either::Left(0..len_t),
            Self::Indices(v) => Either::Right(v.iter().copied()),
        }
    }
}

/// 对 `(t, channel)` 单帧执行完整分割链:
/// 均值投影 -> 高斯去噪 -> Otsu 阈值 -> 连通域标记.
pub fn segment_frame(
    volume: &Volume,
    t: usize,
    channel: usize,
    sigma: f32,
) -> PipelineResult<LabelMap> {
    let stack = volume.frame(t, channel)?;
    let projection = project_mean(stack);
    let blurred = gaussian_blur(projection.view(), sigma);
    let mask = otsu_mask(blurred.view())?;
    let map = label_components(&mask);
    log::debug!("frame t={t}: {} region(s)", map.label_count());
    Ok(map)
}

/// 对 `(t, c)` 帧仅执行深度方向均值投影.
///
/// 感染度量以此获取第二通道的强度图; 可视化叠加也复用该入口.
#[inline]
pub fn project_frame(volume: &Volume, t: usize, c: usize) -> PipelineResult<Array2<f32>> {
    Ok(project_mean(volume.frame(t, c)?))
}

/// 按请求顺序对 `times` 展开的每个时间索引执行单帧分割,
/// 结果聚合为 [`MaskStack`].
///
/// - 空的请求集合产生空栈 (`Ok`);
/// - 任一索引越界或任一帧失败时整个请求失败, 不返回部分结果.
///   单帧计算是确定性的, 重试没有意义.
///
/// # Examples
///
/// ```no_run
/// use ome_berry::{segment, TimeSelection};
///
/// simple_logger::init_with_level(log::Level::Debug).unwrap();
///
/// let volume = ome_berry::store::load_volume("plate.zarr", "0")?;
/// let stack = segment(&volume, 1, 2.0, &TimeSelection::All)?;
/// println!("segmented {} frame(s)", stack.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn segment(
    volume: &Volume,
    channel: usize,
    sigma: f32,
    times: &TimeSelection,
) -> PipelineResult<MaskStack> {
    volume.check_channel(channel)?;
    log::info!(
        "segmenting {} frame(s): channel {channel}, sigma {sigma}",
        times.resolve(volume.len_t()).count()
    );
    times
        .resolve(volume.len_t())
        .map(|t| segment_frame(volume, t, channel, sigma).map(|map| (t, map)))
        .collect()
}

/// 与 [`segment`] 一致, 但在每帧开始前检查协作取消信号.
///
/// `cancel` 置位后整个请求以 [`PipelineError::Cancelled`] 中止,
/// 已算出的帧被丢弃.
pub fn segment_with_cancel(
    volume: &Volume,
    channel: usize,
    sigma: f32,
    times: &TimeSelection,
    cancel: &AtomicBool,
) -> PipelineResult<MaskStack> {
    volume.check_channel(channel)?;
    times
        .resolve(volume.len_t())
        .map(|t| {
            if cancel.load(Ordering::Acquire) {
                return Err(PipelineError::Cancelled);
            }
            segment_frame(volume, t, channel, sigma).map(|map| (t, map))
        })
        .collect()
}

/// 借助 `rayon`, 并行地完成与 [`segment`] 相同的工作.
///
/// 各帧只读共享体数据, 输出相互独立; 由 indexed collect 保证
/// 栈内顺序与请求顺序一致, 与线程完成顺序无关.
/// 任一帧失败时整个请求失败.
#[cfg(feature = "rayon")]
pub fn par_segment(
    volume: &Volume,
    channel: usize,
    sigma: f32,
    times: &TimeSelection,
) -> PipelineResult<MaskStack> {
    volume.check_channel(channel)?;
    let ts: Vec<usize> = times.resolve(volume.len_t()).collect();
    log::info!(
        "segmenting {} frame(s) in parallel: channel {channel}, sigma {sigma}",
        ts.len()
    );
    let frames: Vec<(usize, LabelMap)> = ts
        .into_par_iter()
        .map(|t| segment_frame(volume, t, channel, sigma).map(|map| (t, map)))
        .collect::<PipelineResult<_>>()?;
    Ok(MaskStack::from(frames))
}

/// 感染度量入口: 对 `(time, nuclei_channel)` 帧分割得到标签图,
/// 以 `signal_channel` 的投影为强度图做区域统计, 并按单帧自适应阈值
/// 标记感染区域.
///
/// 分割使用 [`consts::DEFAULT_SIGMA`]. 任一索引越界时返回对应错误;
/// 没有检测到区域时返回空表 (`Ok`).
pub fn measure_infection(
    volume: &Volume,
    time: usize,
    nuclei_channel: usize,
    signal_channel: usize,
) -> PipelineResult<MeasurementTable> {
    let map = segment_frame(volume, time, nuclei_channel, consts::DEFAULT_SIGMA)?;
    let signal = project_frame(volume, time, signal_channel)?;
    let mut table = measure::measure_regions(&map, signal.view())?;
    let threshold = measure::classify_infected(&mut table);
    log::info!(
        "t={time}: {} region(s), {} infected (threshold {threshold:?})",
        table.len(),
        table.infected_count()
    );
    Ok(table)
}
