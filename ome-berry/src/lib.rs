#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供 OME 风格 zarr 存储中 5D 荧光显微体数据的结构化信息,
//! 以及细胞核分割与感染分类的基础处理算法.
//!
//! 体数据轴序约定为 `(time, channel, depth, height, width)`.
//! 单帧处理链为: 深度方向均值投影 -> 高斯去噪 -> Otsu 阈值分割 ->
//! 连通域标记; 在此之上对第二通道做区域强度统计并判定感染.
//!
//! 该 crate 目前仅提供 `safe` 接口. 将来可能为部分高性能场景关键路径提供 `unsafe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 目前主要负责处理按 OME 模式组织的 zarr v2 数组
//!   (时间在前, 通道次之), 没有对其它轴序的数据进行直接适配
//!   (但如果新数据按照该轴序组织, 也可以工作).
//! 2. 索引越界等调用方错误通过 [`PipelineError`] 返回; 违反文档约定的
//!   编程错误会直接 panic, 而不会导致内存错误. As what Rust promises.
//!
//! # 开发计划
//!
//! ### 单帧分割流水线 ✅
//!
//! 均值投影、可分离高斯卷积 (reflect 边界)、Otsu 全局阈值、
//! 行优先 8-邻域连通域标记.
//!
//! 实现位于 `ome-berry/src/pipeline`.
//!
//! ### 区域度量与感染分类 ✅
//!
//! 对每个标签统计面积、第二通道强度均值/最大值与质心;
//! 以 "均值 + 样本标准差" 作为单帧自适应阈值判定感染.
//!
//! 实现位于 `ome-berry/src/measure`.
//!
//! ### 多帧编排 ✅
//!
//! 按请求顺序对一组时间索引展开分割, 结果聚合为 [`MaskStack`].
//! 帧之间相互独立, 可选 rayon 并行; 并行时由 indexed collect
//! 保证输出顺序与请求顺序一致.
//!
//! 实现位于 `ome-berry/src/pipeline` (见 `segment` 系列函数).
//!
//! ### zarr v2 子集存储 ✅
//!
//! 读取 `|u1`/`<u2`/`<u4`/`<f4` 的 5D 数组 (支持 zlib 压缩与缺失 chunk
//! 填充), 将标签体数据以 `<u4` 写回存储层级.
//!
//! 实现位于 `ome-berry/src/store`.
//!
//! ### 可视化导出 ✅
//!
//! 标签伪彩色渲染、原始标签 16-bit 灰度导出、强度窗口 (含 gamma)、
//! 感染质心标注图与逐帧动画编码.
//!
//! 实现位于 `ome-berry/src/render`.
//!
//! ### 度量表导出 ✅
//!
//! 固定 schema 的区域度量表, 序列化为 CSV.
//!
//! 实现位于 `ome-berry/src/measure/table.rs`.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 5D 体数据形状: `(time, channel, depth, height, width)`.
pub type Shape5d = (usize, usize, usize, usize, usize);

/// 二维布尔前景掩膜. `true` 为前景.
pub type BinaryMask = ndarray::Array2<bool>;

/// 高精度通用索引 / 向量.
type Idx2dF = (f64, f64);

type LabelPredicate = fn(u32) -> bool;

/// 5D 体数据与 2D 标签图的基础数据结构.
mod data;

pub use data::{LabelMap, MaskStack, Volume};

/// 运行时错误.
mod error;

pub use error::{PipelineError, PipelineResult};

pub mod consts;

pub mod pipeline;

pub use pipeline::{
    measure_infection, segment, segment_frame, segment_with_cancel, TimeSelection,
};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        pub use pipeline::par_segment;
    }
}

pub mod measure;

pub use measure::{classify_infected, measure_regions, MeasurementTable, RegionRecord};

pub mod render;

pub mod store;

pub mod prelude;
