//! zarr v2 数组存储.
//!
//! 读写 OME 风格成像数据常用的 zarr v2 目录布局的一个子集:
//!
//! - 5 维数组, 行优先 (`order = "C"`), 元素类型 `|u1` / `<u2` / `<u4` / `<f4`;
//! - 区块不压缩或以 zlib 压缩, 键分隔符 `.` (缺省) 或 `/`;
//! - 边缘区块按整块长度存储, 缺失的区块按 `fill_value` 填充;
//! - 过滤器链与大端数据不受支持.
//!
//! 读入的数组统一转换为 `f32` 体数据. 标签图以 `<u4` 写出,
//! 层级中的每级目录补齐 `.zgroup`, 便于其他 zarr 工具直接打开.
//! 通用的 OME 元数据检视不在本存储层职责内.

use std::error::Error;
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use itertools::iproduct;
use ndarray::{s, Array5};
use num::ToPrimitive;

use crate::data::{MaskStack, Volume};
use crate::error::PipelineError;

mod meta;

pub use meta::{parse_fill_value, ArrayMeta, CompressorMeta, Dtype, GroupMeta};

/// 存储层错误.
#[derive(Debug)]
pub enum StoreError {
    /// 底层 I/O 错误.
    Io(io::Error),

    /// 元数据 JSON 解析错误.
    Meta(serde_json::Error),

    /// 不支持的 zarr 格式版本.
    UnsupportedFormat(u32),

    /// 不支持的元素类型描述符.
    UnsupportedDtype(String),

    /// 不支持的区块压缩器.
    UnsupportedCompressor(String),

    /// 不支持的区块内存储序.
    UnsupportedOrder(String),

    /// 数组声明了过滤器链.
    UnsupportedFilters,

    /// 无法识别的 `fill_value`. 参数为原始 JSON 文本.
    UnsupportedFill(String),

    /// 数组维度不是 5. 参数为声明的维度.
    WrongDimension(usize),

    /// 区块形状含 0.
    ZeroChunk,

    /// 区块文件长度与元数据不符. 参数为 (区块键, 期望字节数, 实际字节数).
    ChunkLength(String, usize, usize),

    /// 读出的数组无法构成合法体数据.
    Volume(PipelineError),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "store I/O error: {e}"),
            Self::Meta(e) => write!(f, "bad array metadata: {e}"),
            Self::UnsupportedFormat(v) => write!(f, "unsupported zarr format {v}"),
            Self::UnsupportedDtype(d) => write!(f, "unsupported dtype {d:?}"),
            Self::UnsupportedCompressor(id) => write!(f, "unsupported compressor {id:?}"),
            Self::UnsupportedOrder(o) => write!(f, "unsupported storage order {o:?}"),
            Self::UnsupportedFilters => write!(f, "filters are not supported"),
            Self::UnsupportedFill(v) => write!(f, "unsupported fill_value {v}"),
            Self::WrongDimension(n) => write!(f, "expected a 5D array, got {n} axis(es)"),
            Self::ZeroChunk => write!(f, "chunk shape contains zero"),
            Self::ChunkLength(key, expect, got) => {
                write!(f, "chunk {key}: expected {expect} byte(s), got {got}")
            }
            Self::Volume(e) => write!(f, "loaded array is not a valid volume: {e}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Meta(e) => Some(e),
            Self::Volume(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Meta(e)
    }
}

impl From<PipelineError> for StoreError {
    fn from(e: PipelineError) -> Self {
        Self::Volume(e)
    }
}

/// 区块编解码方式. 由元数据的 `compressor` 字段确定.
#[derive(Debug, Clone, Copy)]
enum ChunkCodec {
    Raw,
    Zlib,
}

/// 获取数组目录: `group` 为空时数组就在 `root` 自身.
fn group_dir(root: &Path, group: &str) -> PathBuf {
    if group.is_empty() {
        root.to_path_buf()
    } else {
        root.join(group)
    }
}

/// 将区块字节解码为 `f32` 序列. 长度已在上游对齐校验.
fn decode_chunk(dtype: Dtype, bytes: &[u8]) -> Vec<f32> {
    fn lanes<T: ToPrimitive, const N: usize>(bytes: &[u8], from: fn([u8; N]) -> T) -> Vec<f32> {
        bytes
            .chunks_exact(N)
            // 块长为 N 的整数倍, 两处转换都不会失败, 可直接 unwrap.
            .map(|lane| from(lane.try_into().unwrap()).to_f32().unwrap())
            .collect()
    }

    match dtype {
        Dtype::U8 => lanes(bytes, u8::from_le_bytes),
        Dtype::U16 => lanes(bytes, u16::from_le_bytes),
        Dtype::U32 => lanes(bytes, u32::from_le_bytes),
        Dtype::F32 => lanes(bytes, f32::from_le_bytes),
    }
}

/// 从 zarr 目录 `root` 下的数组 `group` 读取完整 5D 体数据.
///
/// `group` 是以 `/` 分级的组内路径 (如 `"0"` 或 `"labels/0"`),
/// 空字符串表示 `root` 自身就是数组目录. 所有元素统一转换为 `f32`;
/// `<u4` 的大数值在转换中可能损失精度.
///
/// 数组落在支持子集之外时返回对应的 `Unsupported*` 错误, 不做部分读取.
pub fn load_volume<P: AsRef<Path>>(root: P, group: &str) -> Result<Volume, StoreError> {
    let dir = group_dir(root.as_ref(), group);
    let meta: ArrayMeta = serde_json::from_slice(&fs::read(dir.join(".zarray"))?)?;

    if meta.zarr_format != 2 {
        return Err(StoreError::UnsupportedFormat(meta.zarr_format));
    }
    if meta.order != "C" {
        return Err(StoreError::UnsupportedOrder(meta.order));
    }
    if meta.filters.as_ref().is_some_and(|v| !v.is_null()) {
        return Err(StoreError::UnsupportedFilters);
    }
    if meta.shape.len() != 5 {
        return Err(StoreError::WrongDimension(meta.shape.len()));
    }
    if meta.chunks.len() != 5 {
        return Err(StoreError::WrongDimension(meta.chunks.len()));
    }
    if meta.chunks.contains(&0) {
        return Err(StoreError::ZeroChunk);
    }
    let dtype =
        Dtype::parse(&meta.dtype).ok_or_else(|| StoreError::UnsupportedDtype(meta.dtype.clone()))?;
    let codec = match &meta.compressor {
        None => ChunkCodec::Raw,
        Some(c) if c.id == "zlib" => ChunkCodec::Zlib,
        Some(c) => return Err(StoreError::UnsupportedCompressor(c.id.clone())),
    };
    let fill = parse_fill_value(&meta.fill_value)
        .ok_or_else(|| StoreError::UnsupportedFill(meta.fill_value.to_string()))?;

    let shape = (
        meta.shape[0],
        meta.shape[1],
        meta.shape[2],
        meta.shape[3],
        meta.shape[4],
    );
    let (c0, c1, c2, c3, c4) = (
        meta.chunks[0],
        meta.chunks[1],
        meta.chunks[2],
        meta.chunks[3],
        meta.chunks[4],
    );
    let chunk_len = c0 * c1 * c2 * c3 * c4;
    let grid = |len: usize, chunk: usize| len.div_ceil(chunk);

    let mut raw = Array5::from_elem(shape, fill);
    let it = iproduct!(
        0..grid(shape.0, c0),
        0..grid(shape.1, c1),
        0..grid(shape.2, c2),
        0..grid(shape.3, c3),
        0..grid(shape.4, c4)
    );
    for (i0, i1, i2, i3, i4) in it {
        let key = [i0, i1, i2, i3, i4].map(|i| i.to_string()).join(meta.separator());
        let bytes = match fs::read(dir.join(&key)) {
            Ok(b) => b,
            // 缺失区块保持 fill_value.
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        let bytes = match codec {
            ChunkCodec::Raw => bytes,
            ChunkCodec::Zlib => {
                let mut out = Vec::new();
                ZlibDecoder::new(bytes.as_slice()).read_to_end(&mut out)?;
                out
            }
        };
        let expect = chunk_len * dtype.item_size();
        if bytes.len() != expect {
            return Err(StoreError::ChunkLength(key, expect, bytes.len()));
        }

        // 区块按 C 序整块存储; 形状已对齐, 可直接 unwrap.
        let chunk = Array5::from_shape_vec((c0, c1, c2, c3, c4), decode_chunk(dtype, &bytes))
            .unwrap();
        let origin = (i0 * c0, i1 * c1, i2 * c2, i3 * c3, i4 * c4);
        // 边缘区块按整块长度存储, 只取落在数组内的部分.
        let take = (
            c0.min(shape.0 - origin.0),
            c1.min(shape.1 - origin.1),
            c2.min(shape.2 - origin.2),
            c3.min(shape.3 - origin.3),
            c4.min(shape.4 - origin.4),
        );
        raw.slice_mut(s![
            origin.0..origin.0 + take.0,
            origin.1..origin.1 + take.1,
            origin.2..origin.2 + take.2,
            origin.3..origin.3 + take.3,
            origin.4..origin.4 + take.4
        ])
        .assign(&chunk.slice(s![..take.0, ..take.1, ..take.2, ..take.3, ..take.4]));
    }

    log::debug!("loaded {:?} from {}", shape, dir.display());
    Ok(Volume::new(raw)?)
}

/// 将分割结果栈以 `<u4` zarr 数组写到 `root` 下的 `group`.
///
/// 数组形状为 `(栈长, 1, 1, height, width)`, 每帧一个 zlib 压缩区块;
/// `root` 与 `group` 的每级父目录都补齐 `.zgroup`. 空栈不产生任何文件.
///
/// 栈内各帧形状不一致时 panic, 见 [`MaskStack::to_label_volume`].
pub fn write_label_volume<P: AsRef<Path>>(
    root: P,
    group: &str,
    stack: &MaskStack,
) -> Result<(), StoreError> {
    let Some(volume) = stack.to_label_volume() else {
        log::warn!("empty mask stack, nothing to write");
        return Ok(());
    };
    let root = root.as_ref();
    let dir = group_dir(root, group);
    fs::create_dir_all(&dir)?;

    if !group.is_empty() {
        let group_meta = serde_json::to_vec_pretty(&GroupMeta { zarr_format: 2 })?;
        let mut cur = root.to_path_buf();
        fs::write(cur.join(".zgroup"), &group_meta)?;
        let parts: Vec<&str> = group.split('/').filter(|p| !p.is_empty()).collect();
        for part in &parts[..parts.len() - 1] {
            cur.push(part);
            fs::write(cur.join(".zgroup"), &group_meta)?;
        }
    }

    let (len, _, _, h, w) = volume.dim();
    let meta = ArrayMeta {
        zarr_format: 2,
        shape: vec![len, 1, 1, h, w],
        chunks: vec![1, 1, 1, h, w],
        dtype: Dtype::U32.descr().to_owned(),
        compressor: Some(CompressorMeta {
            id: "zlib".to_owned(),
            level: Some(9),
        }),
        fill_value: serde_json::Value::from(0),
        order: "C".to_owned(),
        filters: None,
        dimension_separator: None,
    };
    fs::write(dir.join(".zarray"), serde_json::to_vec_pretty(&meta)?)?;

    for i in 0..len {
        let frame = volume.slice(s![i, 0, 0, .., ..]);
        let mut bytes = Vec::with_capacity(frame.len() * Dtype::U32.item_size());
        for v in frame.iter() {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&bytes)?;
        fs::write(dir.join(format!("{i}.0.0.0.0")), encoder.finish()?)?;
    }

    log::info!("wrote {len} label frame(s) to {}", dir.display());
    Ok(())
}

/// 递归收集 `root` 下所有数组的组内路径, 按字典序排列.
///
/// 目录一旦含有 `.zarray` 即视为数组, 不再向下探查.
pub fn list_arrays<P: AsRef<Path>>(root: P) -> Result<Vec<String>, StoreError> {
    fn walk(dir: &Path, prefix: String, out: &mut Vec<String>) -> Result<(), StoreError> {
        if dir.join(".zarray").is_file() {
            out.push(prefix);
            return Ok(());
        }
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let child = if prefix.is_empty() {
                name.to_owned()
            } else {
                format!("{prefix}/{name}")
            };
            walk(&entry.path(), child, out)?;
        }
        Ok(())
    }

    let mut out = Vec::new();
    walk(root.as_ref(), String::new(), &mut out)?;
    out.sort();
    Ok(out)
}

/// 获取 `{用户主目录}/microscopy` 目录.
pub fn home_store_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("microscopy");
    Some(ans)
}

/// 获取 `{用户主目录}/microscopy` 目录下给定继续项组成的全路径.
pub fn home_store_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("microscopy");
    ans.extend(it);
    Some(ans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LabelMap;
    use ndarray::array;
    use serde_json::json;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ome-berry-{}-{tag}", std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir).unwrap();
        }
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn label_round_trip() {
        let dir = scratch_dir("round-trip");
        let mut stack = MaskStack::new();
        stack.push(0, LabelMap::from(array![[0u32, 1, 1], [0, 2, 0]]));
        stack.push(3, LabelMap::from(array![[5u32, 0, 0], [0, 0, 9]]));
        write_label_volume(&dir, "labels/0", &stack).unwrap();

        assert!(dir.join(".zgroup").is_file());
        assert!(dir.join("labels/.zgroup").is_file());
        assert!(dir.join("labels/0/.zarray").is_file());
        assert_eq!(list_arrays(&dir).unwrap(), vec!["labels/0".to_owned()]);

        let volume = load_volume(&dir, "labels/0").unwrap();
        assert_eq!(volume.shape(), (2, 1, 1, 2, 3));
        assert_eq!(volume[(0, 0, 0, 0, 1)], 1.0);
        assert_eq!(volume[(0, 0, 0, 1, 1)], 2.0);
        assert_eq!(volume[(0, 0, 0, 0, 0)], 0.0);
        assert_eq!(volume[(1, 0, 0, 0, 0)], 5.0);
        assert_eq!(volume[(1, 0, 0, 1, 2)], 9.0);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_stack_writes_nothing() {
        let dir = scratch_dir("empty");
        write_label_volume(&dir, "labels/0", &MaskStack::new()).unwrap();
        assert!(!dir.join("labels").exists());
        assert!(list_arrays(&dir).unwrap().is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn raw_u16_array_loads() {
        let dir = scratch_dir("u16");
        let meta = json!({
            "zarr_format": 2,
            "shape": [1, 1, 1, 2, 3],
            "chunks": [1, 1, 1, 2, 3],
            "dtype": "<u2",
            "compressor": null,
            "fill_value": 0,
            "order": "C",
            "filters": null,
        });
        fs::write(dir.join(".zarray"), meta.to_string()).unwrap();
        let mut bytes = Vec::new();
        for v in [10u16, 20, 30, 40, 50, 60] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        fs::write(dir.join("0.0.0.0.0"), bytes).unwrap();

        let volume = load_volume(&dir, "").unwrap();
        assert_eq!(volume.shape(), (1, 1, 1, 2, 3));
        assert_eq!(volume[(0, 0, 0, 0, 0)], 10.0);
        assert_eq!(volume[(0, 0, 0, 1, 2)], 60.0);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_chunks_keep_fill_value() {
        let dir = scratch_dir("fill");
        let meta = json!({
            "zarr_format": 2,
            "shape": [1, 1, 1, 2, 2],
            "chunks": [1, 1, 1, 2, 2],
            "dtype": "<f4",
            "compressor": null,
            "fill_value": 7.5,
            "order": "C",
            "filters": null,
        });
        fs::write(dir.join(".zarray"), meta.to_string()).unwrap();

        let volume = load_volume(&dir, "").unwrap();
        assert!(volume.data().iter().all(|&v| v == 7.5));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn padded_edge_chunks_are_clipped() {
        let dir = scratch_dir("edges");
        let meta = json!({
            "zarr_format": 2,
            "shape": [1, 1, 1, 3, 3],
            "chunks": [1, 1, 1, 2, 2],
            "dtype": "<f4",
            "compressor": null,
            "fill_value": 0,
            "order": "C",
            "filters": null,
            "dimension_separator": "/",
        });
        fs::write(dir.join(".zarray"), meta.to_string()).unwrap();

        // 目标 3x3 网格 1..=9; 边缘区块以 0 补齐到 2x2.
        fs::create_dir_all(dir.join("0/0/0/0")).unwrap();
        fs::create_dir_all(dir.join("0/0/0/1")).unwrap();
        fs::write(dir.join("0/0/0/0/0"), f32_bytes(&[1.0, 2.0, 4.0, 5.0])).unwrap();
        fs::write(dir.join("0/0/0/0/1"), f32_bytes(&[3.0, 0.0, 6.0, 0.0])).unwrap();
        fs::write(dir.join("0/0/0/1/0"), f32_bytes(&[7.0, 8.0, 0.0, 0.0])).unwrap();
        fs::write(dir.join("0/0/0/1/1"), f32_bytes(&[9.0, 0.0, 0.0, 0.0])).unwrap();

        let volume = load_volume(&dir, "").unwrap();
        for r in 0..3 {
            for c in 0..3 {
                let expect = (r * 3 + c + 1) as f32;
                assert_eq!(volume[(0, 0, 0, r, c)], expect, "({r}, {c})");
            }
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn out_of_subset_arrays_are_rejected() {
        let dir = scratch_dir("reject");
        let base = json!({
            "zarr_format": 2,
            "shape": [1, 1, 1, 2, 2],
            "chunks": [1, 1, 1, 2, 2],
            "dtype": "<f4",
            "compressor": null,
            "fill_value": 0,
            "order": "C",
            "filters": null,
        });

        let cases = [
            ("dtype", json!("<f8")),
            ("order", json!("F")),
            ("zarr_format", json!(3)),
            ("compressor", json!({"id": "blosc"})),
            ("filters", json!([{"id": "delta"}])),
            ("shape", json!([2, 2])),
            ("fill_value", json!("zero")),
        ];
        for (field, value) in cases {
            let mut meta = base.clone();
            meta[field] = value;
            fs::write(dir.join(".zarray"), meta.to_string()).unwrap();
            let err = load_volume(&dir, "").unwrap_err();
            match field {
                "dtype" => assert!(matches!(err, StoreError::UnsupportedDtype(_))),
                "order" => assert!(matches!(err, StoreError::UnsupportedOrder(_))),
                "zarr_format" => assert!(matches!(err, StoreError::UnsupportedFormat(3))),
                "compressor" => assert!(matches!(err, StoreError::UnsupportedCompressor(_))),
                "filters" => assert!(matches!(err, StoreError::UnsupportedFilters)),
                "shape" => assert!(matches!(err, StoreError::WrongDimension(2))),
                "fill_value" => assert!(matches!(err, StoreError::UnsupportedFill(_))),
                _ => unreachable!(),
            }
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn truncated_chunk_is_reported() {
        let dir = scratch_dir("truncated");
        let meta = json!({
            "zarr_format": 2,
            "shape": [1, 1, 1, 2, 2],
            "chunks": [1, 1, 1, 2, 2],
            "dtype": "<f4",
            "compressor": null,
            "fill_value": 0,
            "order": "C",
            "filters": null,
        });
        fs::write(dir.join(".zarray"), meta.to_string()).unwrap();
        fs::write(dir.join("0.0.0.0.0"), [0u8; 7]).unwrap();

        let err = load_volume(&dir, "").unwrap_err();
        assert!(matches!(err, StoreError::ChunkLength(_, 16, 7)));

        fs::remove_dir_all(&dir).unwrap();
    }
}
