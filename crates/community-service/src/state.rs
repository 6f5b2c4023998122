//! 服务共享状态

use huru_shared::config::ModerationConfig;
use huru_shared::events::EventBus;
use huru_shared::store::MemoryStore;

use crate::models::{ChatMessage, Donation, JournalEntry, MoodEntry, Post};

/// 社区服务状态
pub struct CommunityState {
    pub posts: MemoryStore<Post>,
    pub messages: MemoryStore<ChatMessage>,
    pub journals: MemoryStore<JournalEntry>,
    pub moods: MemoryStore<MoodEntry>,
    pub donations: MemoryStore<Donation>,
    pub bus: EventBus,
    /// 已通过的帖子累计举报达到该值后回到审核队列
    pub flag_threshold: u32,
}

impl CommunityState {
    pub fn from_config(config: &ModerationConfig, bus: EventBus) -> Self {
        Self {
            posts: MemoryStore::new(),
            messages: MemoryStore::new(),
            journals: MemoryStore::new(),
            moods: MemoryStore::new(),
            donations: MemoryStore::new(),
            bus,
            flag_threshold: config.flag_threshold,
        }
    }

    /// 使用默认配置构建（测试与本地演示用）
    pub fn with_defaults(bus: EventBus) -> Self {
        Self::from_config(&ModerationConfig::default(), bus)
    }
}
