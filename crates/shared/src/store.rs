//! 内存存储
//!
//! 使用 DashMap 实现的高并发内存存储。系统没有持久化后端，
//! 所有业务数据都放在这里，进程重启即重置。
//!
//! 除通用的 [`MemoryStore`] 外，另提供带版本号的乐观并发写入
//! [`MemoryStore::compare_and_update`]：积分账本的「读余额 — 校验 —
//! 写余额」序列必须原子，防止同一用户的并发兑换双花。

use dashmap::DashMap;
use std::sync::Arc;

/// 携带版本号的实体
///
/// 版本号由存储在每次成功写入后递增，调用方只读。
pub trait Versioned {
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
}

/// 乐观并发写入失败的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasError {
    /// key 不存在
    Missing,
    /// 版本号不匹配，说明读取快照后已有其他写入
    Conflict { actual: u64 },
}

/// 通用内存存储
///
/// 读取返回克隆，不向调用方暴露锁。
#[derive(Debug)]
pub struct MemoryStore<T> {
    data: Arc<DashMap<String, T>>,
}

impl<T: Clone> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
        }
    }

    /// 插入或更新数据，key 已存在则覆盖
    pub fn insert(&self, id: &str, value: T) {
        self.data.insert(id.to_string(), value);
    }

    /// 获取数据的克隆
    pub fn get(&self, id: &str) -> Option<T> {
        self.data.get(id).map(|v| v.clone())
    }

    /// 删除数据，返回被删除的值
    pub fn remove(&self, id: &str) -> Option<T> {
        self.data.remove(id).map(|(_, v)| v)
    }

    /// 列出所有数据
    pub fn list(&self) -> Vec<T> {
        self.data
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// 按条件筛选数据
    pub fn list_by<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.data
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// 数据总数
    pub fn count(&self) -> usize {
        self.data.len()
    }

    /// 满足条件的数据条数
    pub fn count_by<F>(&self, predicate: F) -> usize
    where
        F: Fn(&T) -> bool,
    {
        self.data
            .iter()
            .filter(|entry| predicate(entry.value()))
            .count()
    }

    /// 清空所有数据
    pub fn clear(&self) {
        self.data.clear();
    }

    /// 检查 key 是否存在
    pub fn contains(&self, id: &str) -> bool {
        self.data.contains_key(id)
    }

    /// 批量插入数据，key 由 key_fn 提取
    pub fn insert_many<I, F>(&self, items: I, key_fn: F)
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> String,
    {
        for item in items {
            let key = key_fn(&item);
            self.data.insert(key, item);
        }
    }

    /// 持有条目锁原地修改
    ///
    /// 闭包执行期间该条目对其他写入方不可见，适用于点赞计数等
    /// 无需版本校验的单字段修改。返回修改后的克隆。
    pub fn update<F>(&self, id: &str, apply: F) -> Option<T>
    where
        F: FnOnce(&mut T),
    {
        self.data.get_mut(id).map(|mut entry| {
            apply(&mut entry);
            entry.clone()
        })
    }
}

impl<T: Clone + Versioned> MemoryStore<T> {
    /// 乐观并发写入
    ///
    /// 调用方先读取快照、在锁外完成业务计算，再带着快照版本号写回。
    /// 版本不匹配说明期间已有其他写入，调用方应重新读取并重试。
    /// 成功时递增版本号并返回写入后的克隆。
    pub fn compare_and_update<F>(
        &self,
        id: &str,
        expected_version: u64,
        apply: F,
    ) -> Result<T, CasError>
    where
        F: FnOnce(&mut T),
    {
        match self.data.get_mut(id) {
            None => Err(CasError::Missing),
            Some(mut entry) => {
                let actual = entry.version();
                if actual != expected_version {
                    return Err(CasError::Conflict { actual });
                }
                apply(&mut entry);
                entry.set_version(actual + 1);
                Ok(entry.clone())
            }
        }
    }
}

impl<T: Clone> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}
