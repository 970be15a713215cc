//! LocalStorage 封装模块
//!
//! 使用 `web_sys::Storage` 实现核心库的 `KeyValueStore`。

use battwatch::session::KeyValueStore;

/// 浏览器 LocalStorage
///
/// 取不到 storage（隐私模式等）时读返回 `None`，写静默失败。
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    /// 获取 LocalStorage 实例
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok()?
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(s) = Self::storage() {
            if s.set_item(key, value).is_err() {
                battwatch::log_warn!("[Storage] failed to write {}", key);
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Some(s) = Self::storage() {
            let _ = s.remove_item(key);
        }
    }

    fn keys(&self) -> Vec<String> {
        let Some(s) = Self::storage() else {
            return Vec::new();
        };
        let len = s.length().unwrap_or(0);
        // 先收集再删除，避免遍历时索引移动
        (0..len).filter_map(|i| s.key(i).ok().flatten()).collect()
    }
}
