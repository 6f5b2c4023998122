//! 测试数据播种
//!
//! 为本地开发与演示预填充三个域的内存存储：用户账户与通知偏好、
//! 奖品目录、挑战、活动、已审核的帖子。固定内容取自产品上线时的
//! 数据集，随机部分（用户名、积分）每次生成都不同。

use chrono::{Duration, Utc};
use fake::Fake;
use fake::faker::internet::en::Username;
use rand::Rng;
use serde::Serialize;

use community_service::models::PostKind;
use notification_worker::preferences::NotificationPreferences;
use progress_service::catalog::default_rewards;
use progress_service::models::{ChallengeKind, EventKind};

use crate::app::AppStates;

/// 播种统计
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedStats {
    pub users: usize,
    pub rewards: usize,
    pub challenges: usize,
    pub events: usize,
    pub posts: usize,
}

/// 数据播种器
pub struct SeedGenerator {
    user_count: usize,
}

impl SeedGenerator {
    pub fn new(user_count: usize) -> Self {
        Self { user_count }
    }

    /// 填充全部存储
    pub fn populate(&self, states: &AppStates) -> anyhow::Result<SeedStats> {
        let user_ids = self.seed_users(states)?;
        let rewards = self.seed_rewards(states);
        let challenges = self.seed_challenges(states, &user_ids)?;
        let events = self.seed_events(states)?;
        let posts = self.seed_posts(states, &user_ids)?;

        Ok(SeedStats {
            users: user_ids.len(),
            rewards,
            challenges,
            events,
            posts,
        })
    }

    /// 创建用户账户、随机积分与默认通知偏好
    fn seed_users(&self, states: &AppStates) -> anyhow::Result<Vec<String>> {
        let mut rng = rand::thread_rng();
        let mut user_ids = Vec::with_capacity(self.user_count);

        for index in 0..self.user_count {
            let user_id = format!("USR-{:04}", index + 1);
            let display_name: String = Username().fake();

            states
                .progress
                .create_account(Some(user_id.clone()), display_name)?;

            // 积分分布覆盖三个等级段
            let points = rng.gen_range(0..2500u64);
            if points > 0 {
                states.progress.award_points(&user_id, points, "seed")?;
            }

            states
                .notifications
                .preferences
                .insert(&user_id, NotificationPreferences::default_for(&user_id));

            user_ids.push(user_id);
        }
        Ok(user_ids)
    }

    fn seed_rewards(&self, states: &AppStates) -> usize {
        let rewards = default_rewards();
        let count = rewards.len();
        states
            .progress
            .rewards
            .insert_many(rewards, |reward| reward.id.clone());
        count
    }

    fn seed_challenges(&self, states: &AppStates, user_ids: &[String]) -> anyhow::Result<usize> {
        let fixture = [
            (
                "7-Day Reading Journey",
                "Read for 20 minutes every day",
                ChallengeKind::Reading,
                7u32,
                100u64,
            ),
            (
                "Morning Walk Week",
                "Take a 30-minute walk before school",
                ChallengeKind::Walking,
                7,
                75,
            ),
            (
                "Gratitude Meditation",
                "Spend 10 quiet minutes reflecting on gratitude",
                ChallengeKind::Meditation,
                5,
                50,
            ),
            (
                "Serve Your Neighbourhood",
                "Do one act of service in your community",
                ChallengeKind::Service,
                14,
                150,
            ),
        ];

        for (title, description, kind, days, points) in fixture {
            let challenge = states.progress.create_challenge(
                title.to_string(),
                description.to_string(),
                kind,
                days,
                points,
                "mentor-1".to_string(),
            )?;

            // 前几位用户自动加入第一个挑战，演示参与者列表
            if title == "7-Day Reading Journey" {
                for user_id in user_ids.iter().take(3) {
                    states.progress.join_challenge(&challenge.id, user_id)?;
                }
            }
        }
        Ok(4)
    }

    fn seed_events(&self, states: &AppStates) -> anyhow::Result<usize> {
        let now = Utc::now();
        let fixture = [
            (
                "Mental Health Workshop",
                "Coping strategies for exam stress",
                EventKind::Workshop,
                Some(50u32),
                100u64,
                false,
            ),
            (
                "Online Bible Study",
                "Weekly webinar on faith and daily life",
                EventKind::Webinar,
                None,
                25,
                true,
            ),
            (
                "Community Prayer Night",
                "An evening of shared prayer and worship",
                EventKind::Prayer,
                Some(200),
                75,
                false,
            ),
        ];

        for (index, (title, description, kind, max, points, is_virtual)) in
            fixture.into_iter().enumerate()
        {
            let start = now + Duration::days(index as i64 + 1);
            states.progress.create_event(
                title.to_string(),
                description.to_string(),
                kind,
                start,
                start + Duration::hours(2),
                (!is_virtual).then(|| "Nairobi Community Center".to_string()),
                is_virtual,
                max,
                points,
                "admin-1".to_string(),
            )?;
        }
        Ok(3)
    }

    /// 帖子：大部分直接批准进入信息流，留一条在审核队列演示工作流
    fn seed_posts(&self, states: &AppStates, user_ids: &[String]) -> anyhow::Result<usize> {
        let author = |index: usize| {
            user_ids
                .get(index % user_ids.len().max(1))
                .cloned()
                .unwrap_or_else(|| "USR-0001".to_string())
        };

        let fixture = [
            (
                "Please pray for my family during this difficult season.",
                PostKind::Prayer,
                true,
            ),
            (
                "What helps you stay focused during exam week?",
                PostKind::Discussion,
                true,
            ),
            (
                "Just finished the reading challenge - feeling accomplished!",
                PostKind::Challenge,
                true,
            ),
            (
                "I am rooted in my heritage and growing towards my future.",
                PostKind::Affirmation,
                true,
            ),
            (
                "This post is waiting for a moderator.",
                PostKind::Discussion,
                false,
            ),
        ];

        for (index, (content, kind, approve)) in fixture.into_iter().enumerate() {
            let author_id = author(index);
            let post = states.community.create_post(
                author_id.clone(),
                author_id,
                content.to_string(),
                kind,
                Vec::new(),
            )?;
            if approve {
                states.community.moderate_post(&post.id, true)?;
            }
        }
        Ok(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huru_shared::config::AppConfig;

    #[test]
    fn test_populate_fills_all_domains() {
        let config = AppConfig::default();
        let (states, _rx) = AppStates::from_config(&config).unwrap();

        let stats = SeedGenerator::new(10).populate(&states).unwrap();

        assert_eq!(stats.users, 10);
        assert_eq!(stats.rewards, 6);
        assert_eq!(stats.challenges, 4);
        assert_eq!(stats.events, 3);
        assert_eq!(stats.posts, 5);

        assert_eq!(states.progress.accounts.count(), 10);
        assert_eq!(states.progress.rewards.count(), 6);
        // 一条帖子留在审核队列
        assert_eq!(states.community.moderation_queue().len(), 1);
        assert_eq!(states.community.feed(None).len(), 4);
        // 偏好名册与用户一致，定时广播可达所有人
        assert_eq!(states.notifications.preferences.count(), 10);
    }

    #[test]
    fn test_seeded_points_within_tier_range() {
        let config = AppConfig::default();
        let (states, _rx) = AppStates::from_config(&config).unwrap();
        SeedGenerator::new(20).populate(&states).unwrap();

        for account in states.progress.accounts.list() {
            assert!(account.points < 2500);
        }
    }
}
