//! 通用常量.

/// 通道索引约定.
///
/// 来自采集协议: 通道 0 为透射光, 通道 1 为细胞核荧光染色,
/// 通道 2 为病毒信号荧光. 新数据若按此约定组织即可直接使用默认值.
pub mod channel {
    /// 透射光 (brightfield) 通道, 流水线默认不使用.
    pub const BRIGHTFIELD: usize = 0;

    /// 细胞核荧光通道, 分割的默认输入.
    pub const NUCLEI: usize = 1;

    /// 病毒信号荧光通道, 感染度量的默认强度来源.
    pub const VIRUS: usize = 2;
}

/// 单通道颜色.
pub mod gray {
    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;
}

/// 标签图中背景的标签值.
pub const BACKGROUND_LABEL: u32 = 0;

/// 去噪的默认高斯半径 (sigma).
pub const DEFAULT_SIGMA: f32 = 2.0;

/// Otsu 阈值计算使用的直方图 bin 数.
pub const OTSU_BINS: usize = 256;

/// 高斯核截断倍率. 核半径取 `ceil(GAUSS_TRUNCATE * sigma)`.
pub const GAUSS_TRUNCATE: f32 = 4.0;

/// 标签值是否是背景?
#[inline]
pub const fn is_background(label: u32) -> bool {
    label == BACKGROUND_LABEL
}

/// 标签值是否指向一个连通区域?
#[inline]
pub const fn is_region(label: u32) -> bool {
    label != BACKGROUND_LABEL
}

/// 像素类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ElemType {
    /// 阈值之下, 代表背景.
    Background,

    /// 严格高于阈值, 代表前景.
    Foreground,
}

impl ElemType {
    /// 是否为前景.
    #[inline]
    pub fn is_foreground(&self) -> bool {
        matches!(self, Self::Foreground)
    }

    /// 是否为背景.
    #[inline]
    pub fn is_background(&self) -> bool {
        !self.is_foreground()
    }
}
