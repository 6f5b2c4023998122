//! 社区服务数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Post — 帖子与审核
// ---------------------------------------------------------------------------

/// 帖子类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Prayer,
    Discussion,
    Challenge,
    Affirmation,
}

/// 审核状态
///
/// 新帖进入 Pending；管理员批准后可见；被驳回的帖子不出现在
/// 信息流中。已通过的帖子累计举报达到阈值后回到 Pending 重审。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

/// 帖子评论
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub likes: u32,
}

/// 帖子
///
/// 祷告墙即 kind=Prayer 的帖子集合，likes 在其中表达「为你祷告」。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub kind: PostKind,
    pub timestamp: DateTime<Utc>,
    pub likes: u32,
    pub comments: Vec<Comment>,
    pub moderation_status: ModerationStatus,
    /// 累计举报次数，只增不减
    pub flag_count: u32,
    pub tags: Vec<String>,
}

impl Post {
    /// 是否对信息流可见
    pub fn is_visible(&self) -> bool {
        self.moderation_status == ModerationStatus::Approved
    }
}

// ---------------------------------------------------------------------------
// ChatMessage — 导师私聊
// ---------------------------------------------------------------------------

/// 私聊消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    /// 被举报的消息，供管理员复核
    pub is_flagged: bool,
}

impl ChatMessage {
    /// 是否属于这对会话双方
    pub fn belongs_to(&self, a: &str, b: &str) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

// ---------------------------------------------------------------------------
// Journal / Mood — 日记与心情
// ---------------------------------------------------------------------------

/// 心情
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Great,
    Good,
    Okay,
    Struggling,
    Difficult,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Great => "great",
            Self::Good => "good",
            Self::Okay => "okay",
            Self::Struggling => "struggling",
            Self::Difficult => "difficult",
        }
    }
}

/// 私密日记
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub mood: Option<Mood>,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// 心情打卡记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub id: String,
    pub user_id: String,
    pub mood: Mood,
    pub notes: Option<String>,
    pub triggers: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Donation — 捐赠
// ---------------------------------------------------------------------------

/// 支付方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Mpesa,
    Card,
}

/// 捐赠记录
///
/// 金额为肯尼亚先令整数；匿名捐赠在对外列表中隐去捐赠人。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: String,
    pub donor_id: Option<String>,
    /// KSH
    pub amount: u64,
    pub message: Option<String>,
    pub is_anonymous: bool,
    pub timestamp: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    /// M-Pesa 收款码，仅作展示字符串记录
    pub till_number: Option<String>,
}

impl Donation {
    /// 对外展示版本：匿名捐赠隐去捐赠人
    pub fn public_view(mut self) -> Self {
        if self.is_anonymous {
            self.donor_id = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_visibility() {
        let mut post = Post {
            id: "PST-1".to_string(),
            author_id: "USR-1".to_string(),
            author_name: "JohnD".to_string(),
            content: "Please pray for my exams".to_string(),
            kind: PostKind::Prayer,
            timestamp: Utc::now(),
            likes: 0,
            comments: vec![],
            moderation_status: ModerationStatus::Pending,
            flag_count: 0,
            tags: vec![],
        };
        assert!(!post.is_visible());

        post.moderation_status = ModerationStatus::Approved;
        assert!(post.is_visible());

        post.moderation_status = ModerationStatus::Rejected;
        assert!(!post.is_visible());
    }

    #[test]
    fn test_chat_message_belongs_to() {
        let message = ChatMessage {
            id: "MSG-1".to_string(),
            sender_id: "teen-1".to_string(),
            receiver_id: "mentor-1".to_string(),
            content: "hello".to_string(),
            timestamp: Utc::now(),
            is_read: false,
            is_flagged: false,
        };
        assert!(message.belongs_to("teen-1", "mentor-1"));
        assert!(message.belongs_to("mentor-1", "teen-1"));
        assert!(!message.belongs_to("teen-1", "mentor-2"));
    }

    #[test]
    fn test_anonymous_donation_public_view() {
        let donation = Donation {
            id: "DON-1".to_string(),
            donor_id: Some("USR-1".to_string()),
            amount: 500,
            message: Some("Keep it up".to_string()),
            is_anonymous: true,
            timestamp: Utc::now(),
            payment_method: PaymentMethod::Mpesa,
            till_number: Some("832909".to_string()),
        };
        assert!(donation.public_view().donor_id.is_none());
    }
}
