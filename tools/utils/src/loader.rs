//! 对 `ome-berry::store` 的更一层封装. 提供更直接的数据加载器.

use ome_berry::store::{self, StoreError};
use ome_berry::Volume;
use std::env;
use std::path::PathBuf;

/// 获取 zarr 存储根目录.
///
/// 1. 若环境变量 `$OME_BERRY_STORE` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/microscopy`.
pub fn store_dir_from_env_or_home() -> PathBuf {
    if let Ok(d) = env::var("OME_BERRY_STORE") {
        PathBuf::from(d)
    } else {
        store::home_store_dir().unwrap()
    }
}

/// 从 `$OME_BERRY_STORE` 或者 `$HOME/microscopy` 下加载数组 `group` 的体数据.
#[inline]
pub fn volume_from_env_or_home(group: &str) -> Result<Volume, StoreError> {
    store::load_volume(store_dir_from_env_or_home(), group)
}

/// 列出 `$OME_BERRY_STORE` 或者 `$HOME/microscopy` 下的所有数组.
#[inline]
pub fn arrays_from_env_or_home() -> Result<Vec<String>, StoreError> {
    store::list_arrays(store_dir_from_env_or_home())
}
