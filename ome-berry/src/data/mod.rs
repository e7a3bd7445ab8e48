use std::ops::Index;

use ndarray::{Array5, ArrayView, ArrayView3, Axis, Ix5};

use crate::error::{PipelineError, PipelineResult};
use crate::{Idx2d, Shape5d};

mod label_map;
mod mask_stack;

pub use label_map::LabelMap;
pub use mask_stack::MaskStack;

/// OME 风格 5D 荧光显微体数据, 轴序 `(time, channel, depth, height, width)`.
/// 强度值以 `f32` 保存.
///
/// 体数据一经构造即对流水线只读. 多帧并行时各 worker 共享同一份只读视图,
/// 不存在共享可变状态.
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array5<f32>,
}

impl Index<Shape5d> for Volume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Shape5d) -> &Self::Output {
        &self.data[index]
    }
}

impl Volume {
    /// 由裸 5D 数组创建体数据, 轴序必须为 `(time, channel, depth, height, width)`.
    ///
    /// 所有轴的长度都必须非零, 否则返回 [`PipelineError::EmptyAxis`],
    /// 其参数为第一个长度为零的轴下标.
    pub fn new(data: Array5<f32>) -> PipelineResult<Self> {
        if let Some(axis) = data.shape().iter().position(|&len| len == 0) {
            return Err(PipelineError::EmptyAxis(axis));
        }
        Ok(Self { data })
    }

    /// 获取数据形状大小.
    #[inline]
    pub fn shape(&self) -> Shape5d {
        self.data.dim()
    }

    /// 获取时间轴长度.
    #[inline]
    pub fn len_t(&self) -> usize {
        self.shape().0
    }

    /// 获取通道轴长度.
    #[inline]
    pub fn len_c(&self) -> usize {
        self.shape().1
    }

    /// 获取深度轴长度.
    #[inline]
    pub fn len_z(&self) -> usize {
        self.shape().2
    }

    /// 获取单帧 2D 图像的形状大小.
    #[inline]
    pub fn frame_shape(&self) -> Idx2d {
        let (_, _, _, h, w) = self.shape();
        (h, w)
    }

    /// 获取数据体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 检查时间索引是否合法.
    #[inline]
    pub fn check_time(&self, t: usize) -> PipelineResult<()> {
        if t < self.len_t() {
            Ok(())
        } else {
            Err(PipelineError::TimeOutOfRange(t, self.len_t()))
        }
    }

    /// 检查通道索引是否合法.
    #[inline]
    pub fn check_channel(&self, c: usize) -> PipelineResult<()> {
        if c < self.len_c() {
            Ok(())
        } else {
            Err(PipelineError::ChannelOutOfRange(c, self.len_c()))
        }
    }

    /// 获取 `(t, c)` 帧的 3D 深度栈视图, 轴序 `(depth, height, width)`.
    ///
    /// 任一索引越界时返回对应的 `*OutOfRange` 错误.
    #[inline]
    pub fn frame(&self, t: usize, c: usize) -> PipelineResult<ArrayView3<'_, f32>> {
        self.check_time(t)?;
        self.check_channel(c)?;
        Ok(self.data.index_axis(Axis(0), t).index_axis_move(Axis(0), c))
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix5> {
        self.data.view()
    }
}
