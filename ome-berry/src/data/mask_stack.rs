use std::ops::Index;

use ndarray::{s, Array5};

use crate::data::LabelMap;
use crate::Idx2d;

/// 一次分割请求的结果: 按请求顺序排列的 (时间索引, 标签图) 序列.
///
/// 栈内顺序就是请求顺序, 与内部执行顺序 (串行或并行) 无关.
/// 空请求对应空栈, 这是一个合法结果而不是错误.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaskStack {
    frames: Vec<(usize, LabelMap)>,
}

impl Index<usize> for MaskStack {
    type Output = LabelMap;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.frames[index].1
    }
}

impl From<Vec<(usize, LabelMap)>> for MaskStack {
    #[inline]
    fn from(frames: Vec<(usize, LabelMap)>) -> Self {
        Self { frames }
    }
}

impl FromIterator<(usize, LabelMap)> for MaskStack {
    #[inline]
    fn from_iter<I: IntoIterator<Item = (usize, LabelMap)>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl MaskStack {
    /// 创建空栈.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取栈内帧数.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// 栈是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 在栈尾追加一帧.
    #[inline]
    pub fn push(&mut self, time: usize, map: LabelMap) {
        self.frames.push((time, map));
    }

    /// 获取栈内第 `i` 帧的标签图.
    #[inline]
    pub fn get(&self, i: usize) -> Option<&LabelMap> {
        self.frames.get(i).map(|(_, map)| map)
    }

    /// 获取栈内第 `i` 帧对应的请求时间索引.
    #[inline]
    pub fn time_at(&self, i: usize) -> Option<usize> {
        self.frames.get(i).map(|(t, _)| *t)
    }

    /// 获取能按请求顺序迭代 (时间索引, 标签图) 的迭代器.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (usize, &LabelMap)> {
        self.frames.iter().map(|(t, map)| (*t, map))
    }

    /// 获取能按请求顺序迭代时间索引的迭代器.
    #[inline]
    pub fn times(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.frames.iter().map(|(t, _)| *t)
    }

    /// 获取能按请求顺序迭代标签图的迭代器.
    #[inline]
    pub fn maps(&self) -> impl ExactSizeIterator<Item = &LabelMap> {
        self.frames.iter().map(|(_, map)| map)
    }

    /// 获取栈内标签图的公共形状. 空栈时为 `None`.
    #[inline]
    pub fn frame_shape(&self) -> Option<Idx2d> {
        self.frames.first().map(|(_, map)| map.shape())
    }

    /// 将栈转换为 `(len, 1, 1, height, width)` 的 5D 标签体数据,
    /// 以便写回存储层. 空栈时为 `None`.
    ///
    /// 栈内各帧形状不一致时 panic. 流水线产出的栈总是满足该约定.
    pub fn to_label_volume(&self) -> Option<Array5<u32>> {
        let (h, w) = self.frame_shape()?;
        let mut out = Array5::<u32>::zeros((self.len(), 1, 1, h, w));
        for (i, (_, map)) in self.frames.iter().enumerate() {
            assert_eq!(map.shape(), (h, w), "标签图形状不一致");
            out.slice_mut(s![i, 0, 0, .., ..]).assign(&map.data());
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn order_and_volume() {
        let a = LabelMap::from(array![[0u32, 1], [0, 0]]);
        let b = LabelMap::from(array![[2u32, 0], [0, 3]]);

        let mut stack = MaskStack::new();
        assert!(stack.is_empty());
        assert!(stack.to_label_volume().is_none());

        stack.push(3, a.clone());
        stack.push(1, b.clone());

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.times().collect::<Vec<_>>(), vec![3, 1]);
        assert_eq!(stack[0], a);
        assert_eq!(stack.get(1), Some(&b));
        assert_eq!(stack.time_at(1), Some(1));

        let vol = stack.to_label_volume().unwrap();
        assert_eq!(vol.dim(), (2, 1, 1, 2, 2));
        assert_eq!(vol[(0, 0, 0, 0, 1)], 1);
        assert_eq!(vol[(1, 0, 0, 1, 1)], 3);
    }
}
