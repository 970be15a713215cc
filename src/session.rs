//! 会话存储
//!
//! 持久化的键值状态：认证标志、令牌、用户资料缓存、OAuth 重试计数。
//! 存储后端通过 `KeyValueStore` 注入，浏览器里是 LocalStorage。

use std::cell::RefCell;
use std::collections::BTreeMap;

use battwatch_shared::{Role, UserProfile};

// =========================================================
// 存储键
// =========================================================

pub const KEY_IS_AUTHENTICATED: &str = "isAuthenticated";
pub const KEY_TOKEN: &str = "token";
pub const KEY_USER: &str = "user";
pub const KEY_OAUTH_RETRY_COUNT: &str = "oauth_retry_count";
pub const KEY_ROLE: &str = "role";

// =========================================================
// 存储抽象
// =========================================================

/// 整键读写的同步键值存储
///
/// 写入完成后立即可见，后续的页面加载一定能读到。
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

/// 进程内存储（测试与非浏览器环境）
#[derive(Debug, Default)]
pub struct MemoryStorage {
    map: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.map.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.map
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.map.borrow_mut().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.map.borrow().keys().cloned().collect()
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }
}

// =========================================================
// SessionStore
// =========================================================

/// 会话上下文
///
/// 只有 `token` / `isAuthenticated` 决定访问权限，`user` 仅作展示缓存。
#[derive(Debug, Clone)]
pub struct SessionStore<S> {
    storage: S,
    max_retries: u32,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(storage: S, max_retries: u32) -> Self {
        Self {
            storage,
            max_retries,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// 登录成功：写入令牌并置认证标志，可选缓存用户资料
    pub fn set_session(&self, token: &str, user: Option<&UserProfile>) {
        self.storage.set(KEY_TOKEN, token);
        self.storage.set(KEY_IS_AUTHENTICATED, "true");
        if let Some(user) = user {
            self.set_user(user);
        }
    }

    /// 删除除 `preserve` 外的所有键
    pub fn clear_session(&self, preserve: &[&str]) {
        for key in self.storage.keys() {
            if !preserve.contains(&key.as_str()) {
                self.storage.remove(&key);
            }
        }
    }

    /// 注销
    pub fn clear(&self) {
        self.clear_session(&[]);
    }

    pub fn is_authenticated(&self) -> bool {
        self.storage.get(KEY_IS_AUTHENTICATED).as_deref() == Some("true")
    }

    /// 令牌；空字符串视为不存在
    pub fn token(&self) -> Option<String> {
        self.storage.get(KEY_TOKEN).filter(|t| !t.is_empty())
    }

    /// 缓存的用户资料；损坏的 JSON 视为不存在
    pub fn user(&self) -> Option<UserProfile> {
        let raw = self.storage.get(KEY_USER)?;
        serde_json::from_str(&raw).ok()
    }

    pub fn set_user(&self, user: &UserProfile) {
        match serde_json::to_string(user) {
            Ok(json) => self.storage.set(KEY_USER, &json),
            Err(e) => crate::log_warn!("[Session] failed to cache user: {}", e),
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.storage.get(KEY_ROLE).as_deref().and_then(Role::parse)
    }

    pub fn set_role(&self, role: Role) {
        self.storage.set(KEY_ROLE, role.as_str());
    }

    // --- OAuth 重试计数 ---

    /// 读取重试计数，始终落在 `0..=max_retries`
    pub fn retry_count(&self) -> u32 {
        self.storage
            .get(KEY_OAUTH_RETRY_COUNT)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0)
            .min(self.max_retries)
    }

    pub fn set_retry_count(&self, count: u32) {
        let count = count.min(self.max_retries);
        self.storage
            .set(KEY_OAUTH_RETRY_COUNT, &count.to_string());
    }

    pub fn clear_retry_count(&self) {
        self.storage.remove(KEY_OAUTH_RETRY_COUNT);
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore<MemoryStorage> {
        SessionStore::new(MemoryStorage::new(), 1)
    }

    #[test]
    fn test_set_session_authenticates() {
        let s = store();
        assert!(!s.is_authenticated());
        assert!(s.token().is_none());

        let user = UserProfile {
            username: "amy".into(),
            email: "a@b.com".into(),
            ..Default::default()
        };
        s.set_session("tok", Some(&user));

        assert!(s.is_authenticated());
        assert_eq!(s.token().as_deref(), Some("tok"));
        assert_eq!(s.user().unwrap().username, "amy");
    }

    #[test]
    fn test_clear_session_preserves_named_keys() {
        let s = store();
        s.set_session("tok", None);
        s.set_role(Role::Admin);
        s.set_retry_count(1);
        s.storage().set("unrelated", "x");

        s.clear_session(&[KEY_OAUTH_RETRY_COUNT]);

        assert_eq!(s.storage().keys(), vec![KEY_OAUTH_RETRY_COUNT.to_string()]);
        assert_eq!(s.retry_count(), 1);
        assert!(!s.is_authenticated());
    }

    #[test]
    fn test_clear_removes_everything() {
        let s = store();
        s.set_session("tok", None);
        s.set_retry_count(1);
        s.clear();
        assert!(s.storage().keys().is_empty());
    }

    #[test]
    fn test_retry_count_is_clamped() {
        let s = store();
        assert_eq!(s.retry_count(), 0);

        s.storage().set(KEY_OAUTH_RETRY_COUNT, "7");
        assert_eq!(s.retry_count(), 1);

        s.storage().set(KEY_OAUTH_RETRY_COUNT, "-3");
        assert_eq!(s.retry_count(), 0);

        s.storage().set(KEY_OAUTH_RETRY_COUNT, "abc");
        assert_eq!(s.retry_count(), 0);

        s.set_retry_count(5);
        assert_eq!(s.storage().get(KEY_OAUTH_RETRY_COUNT).as_deref(), Some("1"));
    }

    #[test]
    fn test_flag_must_be_literal_true() {
        let s = store();
        s.storage().set(KEY_IS_AUTHENTICATED, "false");
        assert!(!s.is_authenticated());
        s.storage().set(KEY_TOKEN, "");
        assert!(s.token().is_none());
    }

    #[test]
    fn test_corrupt_user_cache_is_ignored() {
        let s = store();
        s.storage().set(KEY_USER, "{not json");
        assert!(s.user().is_none());
    }
}
