//! 运行时错误.

use crate::Idx2d;
use std::error::Error;
use std::fmt;

/// 流水线计算结果.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// 分割与度量流水线的运行时错误.
///
/// 单帧计算是确定性的纯函数, 相同输入必然产生相同错误,
/// 因此任一帧失败都会中止整个请求, 不存在重试语义.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// 请求的时间索引不在体数据时间轴范围内.
    ///
    /// 第一个参数是请求值, 第二个参数是时间轴长度.
    TimeOutOfRange(usize, usize),

    /// 请求的通道索引不在体数据通道轴范围内.
    ///
    /// 第一个参数是请求值, 第二个参数是通道轴长度.
    ChannelOutOfRange(usize, usize),

    /// 标签图与强度图的形状不一致.
    ShapeMismatch(Idx2d, Idx2d),

    /// 体数据在构造时发现长度为零的轴. 参数为轴下标 (0 起).
    EmptyAxis(usize),

    /// 帧内出现非有限值 (NaN / inf), 阈值分析无法继续.
    ///
    /// 常数帧不属于该错误: 它走文档化的空掩膜回退路径.
    DegenerateFrame,

    /// 协作取消信号被触发, 请求整体中止.
    Cancelled,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeOutOfRange(idx, len) => {
                write!(f, "time index {idx} out of range (volume has {len})")
            }
            Self::ChannelOutOfRange(idx, len) => {
                write!(f, "channel index {idx} out of range (volume has {len})")
            }
            Self::ShapeMismatch(a, b) => {
                write!(f, "shape mismatch: {a:?} vs {b:?}")
            }
            Self::EmptyAxis(axis) => {
                write!(f, "volume axis {axis} has zero length")
            }
            Self::DegenerateFrame => {
                write!(f, "frame contains non-finite values")
            }
            Self::Cancelled => write!(f, "request cancelled"),
        }
    }
}

impl Error for PipelineError {}
