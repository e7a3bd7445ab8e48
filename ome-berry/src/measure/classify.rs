//! 感染分类: 单帧自适应强度阈值.

use super::MeasurementTable;

/// 对度量表就地标记感染区域, 返回实际使用的阈值.
///
/// 阈值取全表 `mean_intensity` 的 "均值 + 样本标准差 (ddof = 1)",
/// 严格大于阈值的行标记为感染. 阈值只依赖当帧的表内容,
/// 每帧独立重算, 不存在跨帧状态.
///
/// # 回退约定
///
/// 不足两行时样本标准差无定义: 此时不标记任何行并返回 `None`.
/// 均匀信号下所有行的 `mean_intensity` 等于阈值, 由于比较是严格大于,
/// 同样没有行被标记.
///
/// 该操作只读取 `mean_intensity`, 因此是幂等的:
/// 重复应用得到相同的标记结果.
pub fn classify_infected(table: &mut MeasurementTable) -> Option<f64> {
    let n = table.len();
    if n < 2 {
        table.rows.iter_mut().for_each(|r| r.infected = false);
        return None;
    }

    let mean = table.rows.iter().map(|r| r.mean_intensity).sum::<f64>() / n as f64;
    let var = table
        .rows
        .iter()
        .map(|r| {
            let d = r.mean_intensity - mean;
            d * d
        })
        .sum::<f64>()
        / (n - 1) as f64;
    let threshold = mean + var.sqrt();

    for row in table.rows.iter_mut() {
        row.infected = row.mean_intensity > threshold;
    }
    Some(threshold)
}
