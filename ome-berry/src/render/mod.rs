//! 分割结果与强度投影的可视化.
//!
//! 标签图渲染为彩色图像 (背景黑色, 标签循环取调色板颜色),
//! 强度投影经 [`DisplayWindow`] 映射为灰度底图并叠加感染区域标记.
//! 导出侧提供单帧 PNG ([`ImgWriteVis`] / [`ImgWriteRaw`]) 与
//! GIF 动画 ([`encode_video`]).

use image::{Rgb, RgbImage};
use ndarray::ArrayView2;
use once_cell::sync::Lazy;
use palette::{Hsl, IntoColor, Srgb};

use crate::consts;
use crate::data::LabelMap;
use crate::measure::MeasurementTable;

mod save;
mod video;
mod window;

pub use save::{ImgWriteRaw, ImgWriteVis};
pub use video::{encode_video, save_video};
pub use window::DisplayWindow;

/// 调色板颜色个数. 标签超出时循环取色.
const PALETTE_LEN: usize = 64;

/// 感染区域标记的十字臂长 (像素).
const MARK_ARM: i64 = 3;

/// 感染区域标记颜色.
const MARK_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// 标签可视化调色板: 均匀采样 HSL 色环.
static PALETTE: Lazy<Vec<Rgb<u8>>> = Lazy::new(|| {
    (0..PALETTE_LEN)
        .map(|i| {
            let hue = (i as f32 / PALETTE_LEN as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Rgb([
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            ])
        })
        .collect()
});

/// 获取标签 `label` 的渲染颜色. 背景为黑色.
#[inline]
pub fn label_color(label: u32) -> Rgb<u8> {
    if consts::is_background(label) {
        Rgb([consts::gray::BLACK; 3])
    } else {
        PALETTE[(label as usize - 1) % PALETTE_LEN]
    }
}

/// 将标签图渲染为彩色图像.
pub fn render_frame(map: &LabelMap) -> RgbImage {
    let (height, width) = map.shape();
    let mut buf = RgbImage::new(width as u32, height as u32);
    for ((h, w), &label) in map.indexed_iter() {
        buf.put_pixel(w as u32, h as u32, label_color(label));
    }
    buf
}

/// 将强度投影渲染为灰度底图, 并以红色十字标注被判定为感染的区域质心.
///
/// 底图使用由投影值域构建的显示窗口与
/// [`DisplayWindow::FLUORESCENCE_GAMMA`] 伽马校正;
/// 投影没有可用值域 (常数图等) 时底图保持全黑, 标记照常叠加.
pub fn annotate_infected(projection: ArrayView2<'_, f32>, table: &MeasurementTable) -> RgbImage {
    let (height, width) = projection.dim();
    let mut buf = RgbImage::new(width as u32, height as u32);

    let window = DisplayWindow::from_image(projection)
        .and_then(|w| w.with_gamma(DisplayWindow::FLUORESCENCE_GAMMA));
    if let Some(window) = window {
        for ((h, w), &v) in projection.indexed_iter() {
            let gray = window.eval(v).unwrap_or(consts::gray::BLACK);
            buf.put_pixel(w as u32, h as u32, Rgb([gray; 3]));
        }
    }

    for row in table.iter().filter(|row| row.infected) {
        let (r, c) = row.centroid();
        draw_cross(&mut buf, r.round() as i64, c.round() as i64);
    }
    buf
}

/// 在 `(row, col)` 处画一个红色十字. 越界部分直接丢弃.
fn draw_cross(buf: &mut RgbImage, row: i64, col: i64) {
    let (width, height) = (buf.width() as i64, buf.height() as i64);
    let mut paint = |r: i64, c: i64| {
        if (0..height).contains(&r) && (0..width).contains(&c) {
            buf.put_pixel(c as u32, r as u32, MARK_COLOR);
        }
    };
    for d in -MARK_ARM..=MARK_ARM {
        paint(row + d, col);
        paint(row, col + d);
    }
}
