//! 深度方向均值投影.

use ndarray::{Array2, ArrayView3, Axis};

/// 将 3D 深度栈 `(depth, height, width)` 沿深度方向取算术平均,
/// 获得 2D 投影图.
///
/// 纯函数, 无配置项. 对任意常数 `c`, 投影 `c * stack` 等于
/// `c` 乘以 `stack` 的投影 (浮点误差内).
///
/// # 注意
///
/// 深度轴长度必须非零, 否则程序 panic. 经 [`crate::Volume`]
/// 构造的数据在构造时已排除空轴.
pub fn project_mean(stack: ArrayView3<'_, f32>) -> Array2<f32> {
    assert_ne!(stack.len_of(Axis(0)), 0, "深度轴不能为空");
    // 深度轴非空时该操作不会生成 `None`, 可直接 unwrap.
    stack.mean_axis(Axis(0)).unwrap()
}
