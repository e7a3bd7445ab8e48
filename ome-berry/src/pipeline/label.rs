//! 前景掩膜的连通域标记.

use std::collections::VecDeque;

use ndarray::Array2;

use crate::data::LabelMap;
use crate::{BinaryMask, Idx2d};

/// 获得 `(h, w)` 的 8-邻居索引. 不检查越界.
#[inline]
fn neighbour8((h, w): Idx2d) -> [Idx2d; 8] {
    [
        (h.wrapping_sub(1), w.wrapping_sub(1)),
        (h.wrapping_sub(1), w),
        (h.wrapping_sub(1), w.saturating_add(1)),
        (h, w.wrapping_sub(1)),
        (h, w.saturating_add(1)),
        (h.saturating_add(1), w.wrapping_sub(1)),
        (h.saturating_add(1), w),
        (h.saturating_add(1), w.saturating_add(1)),
    ]
}

/// 对前景掩膜做 8-邻域连通域标记.
///
/// 标签从 1 起, 按行优先扫描中各区域首像素的出现顺序分配; 背景为 0.
/// 8-邻域意味着对角接触的前景像素属于同一区域. 连通性是固定的文档约定,
/// 改动它会改变标记结果.
pub fn label_components(mask: &BinaryMask) -> LabelMap {
    let (h, w) = mask.dim();
    let mut labels = Array2::<u32>::zeros((h, w));
    let mut next = 1u32;
    let mut queue: VecDeque<Idx2d> = VecDeque::new();

    for ((y, x), &fg) in mask.indexed_iter() {
        if !fg || labels[(y, x)] != 0 {
            continue;
        }

        // 新区域: 从首像素 BFS 扩散.
        labels[(y, x)] = next;
        queue.push_back((y, x));
        while let Some(pos) = queue.pop_front() {
            for nb in neighbour8(pos) {
                if nb.0 < h && nb.1 < w && mask[nb] && labels[nb] == 0 {
                    labels[nb] = next;
                    queue.push_back(nb);
                }
            }
        }
        next += 1;
    }

    LabelMap::from(labels)
}
