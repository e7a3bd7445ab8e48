use std::collections::BTreeSet;
use std::ops::Index;

use ndarray::{Array2, ArrayView2};

use crate::consts;
use crate::{Idx2d, LabelPredicate};

/// 单帧连通域标签图. 标签值以 `u32` 保存, `0` 为背景,
/// 每个正整数标识一个极大连通前景区域.
///
/// 标签由连通域标记算法按行优先扫描的首次出现顺序从 1 起分配,
/// 因此同一输入上的标签分配是可复现的; 但不同帧之间、或不同连通性
/// 设置之间的标签值没有对应关系.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    data: Array2<u32>,
}

impl Index<Idx2d> for LabelMap {
    type Output = u32;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl From<Array2<u32>> for LabelMap {
    /// 由裸标签数据直接创建标签图.
    ///
    /// 该方法不检查标签值的连续性, 仅应当用于互操作或实验目的;
    /// 流水线产出的标签图总是满足文档约定.
    #[inline]
    fn from(data: Array2<u32>) -> Self {
        Self { data }
    }
}

impl LabelMap {
    /// 获取数据形状大小.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 获取数据像素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 检查索引是否合法.
    #[inline]
    pub fn check(&self, (h0, w0): &Idx2d) -> bool {
        let (h, w) = self.shape();
        *h0 < h && *w0 < w
    }

    /// 获取能按行优先序迭代所有标签值的迭代器.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &u32> {
        self.data.iter()
    }

    /// 获取能按行优先序迭代所有 (索引, 标签值) 的迭代器.
    #[inline]
    pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &u32)> {
        self.data.indexed_iter()
    }

    /// 获取标签图中满足谓词 `pred` 的像素个数.
    #[inline]
    pub fn count(&self, pred: LabelPredicate) -> usize {
        self.data.iter().filter(|p| pred(**p)).count()
    }

    /// 收集满足谓词 `pred` 的所有像素对应的下标, 结果按行优先存储.
    pub fn filter_pos(&self, pred: LabelPredicate) -> Vec<Idx2d> {
        self.data
            .indexed_iter()
            .filter_map(|(pos, pixel)| pred(*pixel).then_some(pos))
            .collect()
    }

    /// 获取值为 `label` 的像素个数.
    #[inline]
    pub fn area(&self, label: u32) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 获取标签图中出现过的所有正标签值, 按升序排列.
    pub fn labels(&self) -> Vec<u32> {
        let set: BTreeSet<u32> = self
            .data
            .iter()
            .copied()
            .filter(|p| consts::is_region(*p))
            .collect();
        set.into_iter().collect()
    }

    /// 获取标签图中不同正标签的个数.
    #[inline]
    pub fn label_count(&self) -> usize {
        self.labels().len()
    }

    /// 获取标签图中的最大标签值. 全背景时为 0.
    #[inline]
    pub fn max_label(&self) -> u32 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    /// 标签图是否全为背景?
    #[inline]
    pub fn is_background(&self) -> bool {
        self.data.iter().all(|p| consts::is_background(*p))
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView2<'_, u32> {
        self.data.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> LabelMap {
        LabelMap::from(array![
            [0, 1, 1, 0],
            [0, 0, 0, 2],
            [3, 0, 0, 2],
        ])
    }

    #[test]
    fn accessor_basics() {
        let map = sample();
        assert_eq!(map.shape(), (3, 4));
        assert_eq!(map.size(), 12);
        assert!(map.check(&(2, 3)));
        assert!(!map.check(&(3, 0)));
        assert_eq!(map[(0, 1)], 1);
    }

    #[test]
    fn label_statistics() {
        let map = sample();
        assert_eq!(map.labels(), vec![1, 2, 3]);
        assert_eq!(map.label_count(), 3);
        assert_eq!(map.max_label(), 3);
        assert_eq!(map.area(2), 2);
        assert_eq!(map.count(consts::is_region), 5);
        assert_eq!(map.filter_pos(consts::is_region).len(), 5);
        assert!(!map.is_background());

        let empty = LabelMap::from(Array2::<u32>::zeros((2, 2)));
        assert!(empty.is_background());
        assert_eq!(empty.label_count(), 0);
    }
}
