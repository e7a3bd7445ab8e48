//! 标签图的持久化存储.

use std::path::Path;

use image::{ImageBuffer, ImageResult, Luma};

use crate::data::LabelMap;

/// 表明一个可以通过 **可视化友好** 模式持久化存储的图像对象.
///
/// `ImgWriteVis` trait 的意图是, 图像将以 "可视化友好" 的方式保存,
/// 而不是 "as is" 的方式. 这意味着, 对于 `LabelMap` 这类以任意正整数
/// 标签存储的图像, 在保存时会映射到肉眼较易区分的调色板颜色.
pub trait ImgWriteVis {
    /// 按照一定的可视化规则将图片保存到 `path` 路径.
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// 表明一个可以通过 **按原样** 模式持久化存储的图像对象.
///
/// `ImgWriteRaw` trait 的额外意图是, 图像将按原样保存, 保留标签数值本身,
/// 供下游工具继续处理而不是供人查看.
pub trait ImgWriteRaw {
    /// 按原样将图片保存到 `path` 路径.
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// 背景为黑色, 标签按调色板循环取色.
impl ImgWriteVis for LabelMap {
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        super::render_frame(self).save(path)
    }
}

/// 以 16 位灰度图存储, 标签值超出 `u16` 时饱和截断.
/// 目标格式必须支持 16 位位深 (如 PNG).
impl ImgWriteRaw for LabelMap {
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        let (height, width) = self.shape();
        let mut buf = ImageBuffer::<Luma<u16>, Vec<u16>>::new(width as u32, height as u32);
        for ((h, w), &label) in self.indexed_iter() {
            let pix = u16::try_from(label).unwrap_or(u16::MAX);
            buf.put_pixel(w as u32, h as u32, Luma([pix]));
        }
        buf.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::fs;
    use std::path::PathBuf;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ome-berry-{}-{tag}", std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir).unwrap();
        }
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn raw_png_keeps_label_values() {
        let dir = scratch_dir("save-raw");
        let path = dir.join("labels.png");
        let map = LabelMap::from(array![[0u32, 1, 70000], [2, 0, 2]]);
        map.save_raw(&path).unwrap();

        let read = image::open(&path).unwrap().into_luma16();
        assert_eq!(read.dimensions(), (3, 2));
        assert_eq!(read.get_pixel(0, 0).0, [0]);
        assert_eq!(read.get_pixel(1, 0).0, [1]);
        // 超出 u16 的标签饱和.
        assert_eq!(read.get_pixel(2, 0).0, [u16::MAX]);
        assert_eq!(read.get_pixel(0, 1).0, [2]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn vis_png_separates_labels_from_background() {
        let dir = scratch_dir("save-vis");
        let path = dir.join("labels.png");
        let map = LabelMap::from(array![[0u32, 1], [2, 0]]);
        map.save(&path).unwrap();

        let read = image::open(&path).unwrap().into_rgb8();
        assert_eq!(read.get_pixel(0, 0).0, [0, 0, 0]);
        assert_ne!(read.get_pixel(1, 0).0, [0, 0, 0]);
        assert_ne!(read.get_pixel(0, 1).0, [0, 0, 0]);
        assert_ne!(read.get_pixel(1, 0).0, read.get_pixel(0, 1).0);

        fs::remove_dir_all(&dir).unwrap();
    }
}
