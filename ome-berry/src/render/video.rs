//! 分割序列的动画导出.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, ImageResult, RgbImage};

/// 将帧序列编码为循环播放的 GIF 动画并写入 `w`.
///
/// 每帧停留 `1000 / fps` 毫秒. `fps` 为 0 时 panic.
pub fn encode_video<I, W>(frames: I, fps: u32, w: W) -> ImageResult<()>
where
    I: IntoIterator<Item = RgbImage>,
    W: Write,
{
    assert_ne!(fps, 0, "fps 不能为 0");

    let mut encoder = GifEncoder::new(w);
    encoder.set_repeat(Repeat::Infinite)?;
    let delay = Delay::from_numer_denom_ms(1000, fps);
    for image in frames {
        let rgba = DynamicImage::ImageRgb8(image).into_rgba8();
        encoder.encode_frame(Frame::from_parts(rgba, 0, 0, delay))?;
    }
    Ok(())
}

/// 将帧序列编码为循环播放的 GIF 动画并保存到 `path`.
pub fn save_video<I, P>(frames: I, fps: u32, path: P) -> ImageResult<()>
where
    I: IntoIterator<Item = RgbImage>,
    P: AsRef<Path>,
{
    let file = File::create(path)?;
    encode_video(frames, fps, BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn gif_stream_layout() {
        let mut red = RgbImage::new(4, 4);
        for p in red.pixels_mut() {
            *p = Rgb([255, 0, 0]);
        }
        let black = RgbImage::new(4, 4);

        let mut buf = Vec::new();
        encode_video([red, black], 4, &mut buf).unwrap();

        assert!(buf.len() > 6);
        assert_eq!(&buf[..6], b"GIF89a");
    }

    #[test]
    #[should_panic(expected = "fps 不能为 0")]
    fn zero_fps_panics() {
        encode_video([RgbImage::new(2, 2)], 0, Vec::new()).unwrap();
    }
}
