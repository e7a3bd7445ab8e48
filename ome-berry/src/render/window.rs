use ndarray::ArrayView2;

/// 强度显示窗口, 包含显示下限、显示上限与伽马校正指数.
///
/// 荧光强度没有统一的物理标度, 窗口通常由单帧数据的值域给出,
/// 见 [`DisplayWindow::from_image`]. 该窗口是只读的.
/// 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug)]
pub struct DisplayWindow {
    lower: f32,
    upper: f32,
    gamma: f32,
}

impl DisplayWindow {
    /// 荧光强度底图的经验伽马指数. 幂次大于 1 时中低强度被压暗,
    /// 弱背景荧光被抑制, 高于背景的信号更突出.
    pub const FLUORESCENCE_GAMMA: f32 = 1.97;

    /// 构建显示窗口, 伽马指数为 1 (线性).
    ///
    /// `lower` 和 `upper` 必须有限且 `lower < upper`, 否则返回 `None`.
    pub fn new(lower: f32, upper: f32) -> Option<DisplayWindow> {
        if lower.is_finite() && upper.is_finite() && lower < upper {
            Some(Self {
                lower,
                upper,
                gamma: 1.0,
            })
        } else {
            None
        }
    }

    /// 以图像中有限值的最小/最大值构建显示窗口.
    ///
    /// 图像没有可用的值域 (空图、全非有限值、常数图) 时返回 `None`.
    pub fn from_image(img: ArrayView2<'_, f32>) -> Option<DisplayWindow> {
        let mut lower = f32::INFINITY;
        let mut upper = f32::NEG_INFINITY;
        for &v in img.iter().filter(|v| v.is_finite()) {
            lower = lower.min(v);
            upper = upper.max(v);
        }
        Self::new(lower, upper)
    }

    /// 以给定的伽马指数替换当前值.
    ///
    /// `gamma` 必须在 `(0, 100]` 范围内, 否则返回 `None`.
    pub fn with_gamma(self, gamma: f32) -> Option<DisplayWindow> {
        if 0.0 < gamma && gamma <= 100.0 {
            Some(Self { gamma, ..self })
        } else {
            None
        }
    }

    /// 窗下限.
    #[inline]
    pub fn lower(&self) -> f32 {
        self.lower
    }

    /// 窗上限.
    #[inline]
    pub fn upper(&self) -> f32 {
        self.upper
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.upper - self.lower
    }

    /// 伽马指数.
    #[inline]
    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    /// 求在当前窗口设置下, 强度 `value` 对应的灰度图像素整数值
    /// (0 <= value <= 255).
    ///
    /// 如果 `value` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, value: f32) -> Option<u8> {
        // 255, not 256.
        self.eval_f32(value).map(|v| v as u8)
    }

    /// 求在当前窗口设置下, 强度 `value` 对应的灰度图像素分布点
    /// (0.0 <= value <= 255.0).
    ///
    /// 如果 `value` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval_f32(&self, value: f32) -> Option<f32> {
        if !value.is_finite() {
            return None;
        }
        if value <= self.lower {
            Some(0.0)
        } else if value >= self.upper {
            Some(255.0)
        } else {
            let normalized = (value - self.lower) / self.width();
            Some(normalized.powf(self.gamma) * 255.0)
        }
    }
}
