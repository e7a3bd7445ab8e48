//! 度量表的 CSV 序列化.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::MeasurementTable;

/// CSV 固定表头. 与 [`super::RegionRecord`] 字段一一对应.
const CSV_HEADER: [&str; 7] = [
    "label",
    "area",
    "mean_intensity",
    "max_intensity",
    "centroid_row",
    "centroid_col",
    "infected",
];

impl MeasurementTable {
    /// 将表序列化为 CSV 并写入 `w`. 空表也会写出表头.
    pub fn write_csv<W: Write>(&self, w: W) -> csv::Result<()> {
        let mut writer = csv::Writer::from_writer(w);
        if self.is_empty() {
            // serialize 依靠首行记录推导表头, 空表需要手动补上.
            writer.write_record(CSV_HEADER)?;
        }
        for row in self.rows() {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// 将表保存为 CSV 文件. 目标文件已存在时会被覆盖.
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> csv::Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_csv(file)
    }
}
