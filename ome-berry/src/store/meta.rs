//! `.zarray` / `.zgroup` 元数据的序列化表示.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 数组元素类型. 仅覆盖荧光显微流水线实际出现的类型.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    /// 8 位无符号整数 (`|u1`).
    U8,
    /// 16 位无符号整数, 小端 (`<u2`). 相机原始数据的常见类型.
    U16,
    /// 32 位无符号整数, 小端 (`<u4`). 标签图的写出类型.
    U32,
    /// 32 位浮点数, 小端 (`<f4`).
    F32,
}

impl Dtype {
    /// 由 NumPy 风格类型描述符解析. 接受显式小端与无字节序两种写法,
    /// 大端数据不受支持.
    pub fn parse(descr: &str) -> Option<Self> {
        match descr {
            "|u1" | "u1" => Some(Self::U8),
            "<u2" | "u2" => Some(Self::U16),
            "<u4" | "u4" => Some(Self::U32),
            "<f4" | "f4" => Some(Self::F32),
            _ => None,
        }
    }

    /// 规范类型描述符. 写出元数据时总是显式小端.
    #[inline]
    pub fn descr(self) -> &'static str {
        match self {
            Self::U8 => "|u1",
            Self::U16 => "<u2",
            Self::U32 => "<u4",
            Self::F32 => "<f4",
        }
    }

    /// 单元素字节数.
    #[inline]
    pub fn item_size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }
}

/// `.zarray` 文件内容 (zarr v2).
///
/// 字段集合覆盖本存储层读写的子集; 反序列化时未知字段被忽略.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayMeta {
    /// 格式版本. 本存储层只接受 2.
    pub zarr_format: u32,

    /// 数组形状, 轴序 `(time, channel, depth, height, width)`.
    pub shape: Vec<usize>,

    /// 区块形状, 与 `shape` 等长.
    pub chunks: Vec<usize>,

    /// 元素类型描述符, 见 [`Dtype::parse`].
    pub dtype: String,

    /// 区块压缩器. `null` 表示不压缩.
    pub compressor: Option<CompressorMeta>,

    /// 缺失区块的填充值. 数值、`null` (等价于 0) 或
    /// `"NaN"` / `"Infinity"` / `"-Infinity"` 字符串.
    pub fill_value: Value,

    /// 区块内存储序. 本存储层只接受行优先 (`"C"`).
    pub order: String,

    /// 元素过滤器链. 本存储层不支持过滤器, 读写都要求 `null`.
    pub filters: Option<Value>,

    /// 区块键分隔符, 缺省为 `"."`. 写出时省略该字段.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension_separator: Option<String>,
}

impl ArrayMeta {
    /// 获取区块键分隔符.
    #[inline]
    pub fn separator(&self) -> &str {
        self.dimension_separator.as_deref().unwrap_or(".")
    }
}

/// `.zarray` 的 `compressor` 字段.
///
/// 其余压缩器 (如 blosc) 的附加字段在反序列化时被忽略,
/// 由存储层按 `id` 统一拒绝.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressorMeta {
    /// numcodecs 编解码器名.
    pub id: String,

    /// 压缩级别. 写出时仅在有值时出现.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

/// `.zgroup` 文件内容 (zarr v2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMeta {
    /// 格式版本.
    pub zarr_format: u32,
}

/// 解析 `.zarray` 的 `fill_value` 字段. `null` 等价于 0,
/// 无法识别的形式返回 `None`.
pub fn parse_fill_value(value: &Value) -> Option<f32> {
    match value {
        Value::Null => Some(0.0),
        Value::Number(n) => n.as_f64().map(|v| v as f32),
        Value::String(s) => match s.as_str() {
            "NaN" => Some(f32::NAN),
            "Infinity" => Some(f32::INFINITY),
            "-Infinity" => Some(f32::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dtype_descriptors() {
        assert_eq!(Dtype::parse("<u2"), Some(Dtype::U16));
        assert_eq!(Dtype::parse("u4"), Some(Dtype::U32));
        assert_eq!(Dtype::parse("|u1"), Some(Dtype::U8));
        assert_eq!(Dtype::parse(">u2"), None);
        assert_eq!(Dtype::parse("<f8"), None);

        assert_eq!(Dtype::U32.descr(), "<u4");
        assert_eq!(Dtype::parse(Dtype::F32.descr()), Some(Dtype::F32));
        assert_eq!(Dtype::U16.item_size(), 2);
        assert_eq!(Dtype::F32.item_size(), 4);
    }

    #[test]
    fn fill_value_forms() {
        assert_eq!(parse_fill_value(&json!(null)), Some(0.0));
        assert_eq!(parse_fill_value(&json!(6.5)), Some(6.5));
        assert_eq!(parse_fill_value(&json!(-3)), Some(-3.0));
        assert!(parse_fill_value(&json!("NaN")).unwrap().is_nan());
        assert_eq!(parse_fill_value(&json!("Infinity")), Some(f32::INFINITY));
        assert_eq!(parse_fill_value(&json!("-Infinity")), Some(f32::NEG_INFINITY));
        assert_eq!(parse_fill_value(&json!("zero")), None);
        assert_eq!(parse_fill_value(&json!([1, 2])), None);
    }

    #[test]
    fn array_meta_json_layout() {
        let meta = ArrayMeta {
            zarr_format: 2,
            shape: vec![4, 1, 1, 8, 8],
            chunks: vec![1, 1, 1, 8, 8],
            dtype: Dtype::U32.descr().to_owned(),
            compressor: Some(CompressorMeta {
                id: "zlib".to_owned(),
                level: Some(9),
            }),
            fill_value: json!(0),
            order: "C".to_owned(),
            filters: None,
            dimension_separator: None,
        };

        // filters 写出为显式 null, 缺省分隔符整个字段省略.
        let text = serde_json::to_string(&meta).unwrap();
        assert!(text.contains("\"filters\":null"));
        assert!(!text.contains("dimension_separator"));

        let parsed: ArrayMeta = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.separator(), ".");
        assert_eq!(parsed.shape, vec![4, 1, 1, 8, 8]);
        assert_eq!(parsed.compressor.unwrap().level, Some(9));

        // 其他实现写出的未知字段不影响解析.
        let foreign: ArrayMeta = serde_json::from_value(json!({
            "zarr_format": 2,
            "shape": [1, 1, 1, 4, 4],
            "chunks": [1, 1, 1, 4, 4],
            "dtype": "<u2",
            "compressor": {"id": "blosc", "cname": "lz4", "clevel": 5, "shuffle": 1},
            "fill_value": null,
            "order": "C",
            "filters": null,
            "dimension_separator": "/",
            "zarr_consolidated_format": 1,
        }))
        .unwrap();
        assert_eq!(foreign.separator(), "/");
        assert_eq!(foreign.compressor.unwrap().id, "blosc");
    }
}
