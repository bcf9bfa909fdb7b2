//! 执行上下文：单次运行内的中间结果存储
//!
//! 只追加、不删除。同一个 key 可多次 store，每次都新增一条记录，
//! resolve 返回该 key 最近一次写入的值；因此稳定别名（last_result）总是指向最新结果，
//! 而按步骤编号的 key（step_N_result）各自独立，不会被覆盖。

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// 稳定别名：最近一次成功步骤的输出
pub const LAST_RESULT: &str = "last_result";

/// 步骤专属 key，如 step_3_result
pub fn step_key(ordinal: usize) -> String {
    format!("step_{ordinal}_result")
}

/// 工具专属别名，如 last_search_web_result
pub fn tool_key(tool: &str) -> String {
    format!("last_{tool}_result")
}

#[derive(Debug, Clone)]
pub struct ContextEntry {
    pub key: String,
    pub value: String,
    pub produced_by: usize,
    pub timestamp: DateTime<Utc>,
}

/// 执行上下文：按插入顺序保存全部记录，另维护 key → 最新记录下标
#[derive(Debug, Default)]
pub struct ExecutionContext {
    entries: Vec<ContextEntry>,
    latest: HashMap<String, usize>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, key: impl Into<String>, value: impl Into<String>, ordinal: usize) {
        let key = key.into();
        let value = value.into();
        tracing::debug!(key = %key, ordinal, chars = value.chars().count(), "context store");
        self.latest.insert(key.clone(), self.entries.len());
        self.entries.push(ContextEntry {
            key,
            value,
            produced_by: ordinal,
            timestamp: Utc::now(),
        });
    }

    /// 精确匹配 key；不存在时返回 None，由调用方决定如何降级
    pub fn resolve(&self, reference: &str) -> Option<&str> {
        self.latest
            .get(reference)
            .map(|&i| self.entries[i].value.as_str())
    }

    pub fn entry(&self, reference: &str) -> Option<&ContextEntry> {
        self.latest.get(reference).map(|&i| &self.entries[i])
    }

    /// 某 key 的全部历史写入（按时间顺序）
    pub fn history<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a ContextEntry> + 'a {
        self.entries.iter().filter(move |e| e.key == key)
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let mut ctx = ExecutionContext::new();
        ctx.store("step_1_result", "quantum bits", 1);
        assert_eq!(ctx.resolve("step_1_result"), Some("quantum bits"));
    }

    #[test]
    fn test_missing_key_is_none() {
        let ctx = ExecutionContext::new();
        assert_eq!(ctx.resolve(LAST_RESULT), None);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_alias_tracks_latest_but_step_keys_stay() {
        let mut ctx = ExecutionContext::new();
        ctx.store(LAST_RESULT, "first", 1);
        ctx.store(step_key(1), "first", 1);
        ctx.store(LAST_RESULT, "second", 2);
        ctx.store(step_key(2), "second", 2);

        assert_eq!(ctx.resolve(LAST_RESULT), Some("second"));
        assert_eq!(ctx.resolve("step_1_result"), Some("first"));
        assert_eq!(ctx.resolve("step_2_result"), Some("second"));
        assert_eq!(ctx.entry(LAST_RESULT).map(|e| e.produced_by), Some(2));
        // 只追加：旧记录仍在
        assert_eq!(ctx.history(LAST_RESULT).count(), 2);
        assert_eq!(ctx.len(), 4);
    }

    #[test]
    fn test_keys_are_exact() {
        let mut ctx = ExecutionContext::new();
        ctx.store(tool_key("search_web"), "abc", 1);
        assert_eq!(ctx.resolve("last_search_web_result"), Some("abc"));
        assert_eq!(ctx.resolve("LAST_SEARCH_WEB_RESULT"), None);
    }
}
