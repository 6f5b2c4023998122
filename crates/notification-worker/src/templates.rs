//! 通知模板
//!
//! 根据通知类型渲染标题与正文。产品文案为英文，轮播内容
//! （肯定语、经文）随日期轮换，同一天全员看到同一条。
//! 缺失的业务字段使用占位符，上游数据不完整不会导致渲染失败。

use huru_shared::events::NotificationKind;

/// 每日肯定语轮播
pub const DAILY_AFFIRMATIONS: &[&str] = &[
    "I am rooted in my heritage and growing towards my future.",
    "Like the baobab tree, I stand strong and provide shelter for others.",
    "I carry the wisdom of my ancestors and the hope of tomorrow.",
    "My journey is unique, but I am never alone in my community.",
    "I am a bridge between tradition and progress.",
    "Every challenge is an opportunity to grow stronger, like the acacia in the savanna.",
    "I honor my past, embrace my present, and create my future.",
    "Ubuntu: I am because we are. My success lifts my community.",
];

/// 每日经文轮播
pub const BIBLE_VERSES: &[&str] = &[
    "For I know the plans I have for you, declares the Lord, plans to prosper you and not to harm you, to give you hope and a future. - Jeremiah 29:11",
    "Trust in the Lord with all your heart and lean not on your own understanding. - Proverbs 3:5",
    "I can do all things through Christ who strengthens me. - Philippians 4:13",
    "Be strong and courageous. Do not be afraid; do not be discouraged, for the Lord your God will be with you wherever you go. - Joshua 1:9",
    "The Lord your God is with you, the Mighty Warrior who saves. He will take great delight in you; in his love he will no longer rebuke you, but will rejoice over you with singing. - Zephaniah 3:17",
];

/// 通知模板引擎
///
/// 当前使用硬编码模板以降低外部依赖，未来可扩展为从配置加载。
pub struct TemplateEngine;

impl TemplateEngine {
    /// 渲染标题
    ///
    /// 标题简洁固定，不做变量替换，便于客户端聚合展示同类通知
    pub fn render_title(kind: NotificationKind, data: &serde_json::Value) -> String {
        match kind {
            NotificationKind::DailyAffirmation => "Daily Affirmation 🌟".to_string(),
            NotificationKind::DailyVerse => "Daily Verse 📖".to_string(),
            NotificationKind::Reminder => {
                extract_str(data, "title", "Reminder ⏰")
            }
            NotificationKind::Encouragement => "Encouragement 💝".to_string(),
            NotificationKind::LevelUp => "Level Up 🎉".to_string(),
            NotificationKind::RedemptionUpdate => "Rewards Update 🎁".to_string(),
            NotificationKind::ChallengeUpdate => "Challenge Update 🏆".to_string(),
            NotificationKind::EmergencyAlert => "Emergency Alert Sent 🚨".to_string(),
        }
    }

    /// 渲染正文
    pub fn render_body(kind: NotificationKind, data: &serde_json::Value) -> String {
        match kind {
            NotificationKind::DailyAffirmation => {
                extract_str(data, "body", &rotating_entry(DAILY_AFFIRMATIONS))
            }
            NotificationKind::DailyVerse => {
                extract_str(data, "body", &rotating_entry(BIBLE_VERSES))
            }
            NotificationKind::Reminder => {
                extract_str(data, "body", "You have a reminder from HURU Circle.")
            }
            NotificationKind::Encouragement => {
                encouragement_for(&extract_str(data, "mood", "")).to_string()
            }
            NotificationKind::LevelUp => {
                let tier = extract_str(data, "tierName", "a new level");
                format!("Congratulations! You've reached {tier}. Keep growing!")
            }
            NotificationKind::RedemptionUpdate => redemption_body(data),
            NotificationKind::ChallengeUpdate => {
                let title = extract_str(data, "challengeTitle", "a challenge");
                let points = extract_str(data, "points", "0");
                match extract_str(data, "action", "").as_str() {
                    "completed" => {
                        format!("You completed \"{title}\" and earned {points} points!")
                    }
                    _ => format!("You joined \"{title}\". Complete it to earn {points} points!"),
                }
            }
            NotificationKind::EmergencyAlert => {
                "Your emergency contacts have been notified. Help is on the way.".to_string()
            }
        }
    }
}

/// 按心情选择鼓励文案
fn encouragement_for(mood: &str) -> &'static str {
    match mood {
        "struggling" => {
            "Remember, tough times don't last, but tough people do. You've got this! 💪"
        }
        "difficult" => {
            "It's okay to have difficult days. Reach out to your support network. You're not alone. 🤗"
        }
        "okay" => "Every small step forward is progress. Keep going! 🌱",
        "good" => "Great to see you're doing well! Keep up the positive momentum! ✨",
        "great" => "Your positive energy is contagious! Share your joy with others! 🌟",
        _ => "You're doing great! Keep being amazing! 🌈",
    }
}

/// 兑换通知正文
///
/// 两条路径产生兑换事件：兑换提交时携带结果标签（outcome），
/// 审批终结时携带记录状态（status）。
fn redemption_body(data: &serde_json::Value) -> String {
    let reward = extract_str(data, "rewardName", "your reward");

    // 审批终结路径
    match extract_str(data, "status", "").as_str() {
        "APPROVED" => {
            return format!("Good news! Your redemption of \"{reward}\" was approved.");
        }
        "REJECTED" => {
            return format!(
                "Your redemption of \"{reward}\" was declined and your points were refunded."
            );
        }
        "FULFILLED" => {
            return format!("Your \"{reward}\" reward has been delivered. Enjoy!");
        }
        _ => {}
    }

    // 兑换提交路径：outcome 是带标签的结果对象
    let outcome = data
        .get("outcome")
        .and_then(|o| o.get("outcome"))
        .and_then(|o| o.as_str())
        .unwrap_or("");
    match outcome {
        "FULFILLED" => format!("You redeemed \"{reward}\". Enjoy!"),
        "PENDING_APPROVAL" => {
            format!("Your redemption of \"{reward}\" is awaiting admin approval.")
        }
        "REJECTED" => {
            let reason = match data
                .get("outcome")
                .and_then(|o| o.get("reason"))
                .and_then(|r| r.as_str())
            {
                Some("INSUFFICIENT_POINTS") => "you don't have enough points yet",
                Some("OUT_OF_STOCK") => "it is currently out of stock",
                _ => "it could not be processed",
            };
            format!("Your redemption of \"{reward}\" was not completed: {reason}.")
        }
        _ => format!("There's an update on your redemption of \"{reward}\"."),
    }
}

/// 按日期轮换选取一条内容
///
/// 同一天所有用户收到同一条，次日自动换下一条。
fn rotating_entry(entries: &[&str]) -> String {
    use chrono::Datelike;
    let day = chrono::Utc::now().ordinal() as usize;
    entries[day % entries.len()].to_string()
}

/// 从 JSON 对象中安全提取字符串值
///
/// 数值等非字符串类型自动转换为字符串表示，渲染不会 panic。
fn extract_str(data: &serde_json::Value, key: &str, default: &str) -> String {
    data.get(key)
        .map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_level_up() {
        let data = json!({ "tierName": "HURU Builder", "points": 600 });
        let title = TemplateEngine::render_title(NotificationKind::LevelUp, &data);
        assert_eq!(title, "Level Up 🎉");

        let body = TemplateEngine::render_body(NotificationKind::LevelUp, &data);
        assert_eq!(
            body,
            "Congratulations! You've reached HURU Builder. Keep growing!"
        );
    }

    #[test]
    fn test_render_encouragement_by_mood() {
        for (mood, fragment) in [
            ("struggling", "tough times"),
            ("difficult", "not alone"),
            ("okay", "small step"),
            ("good", "positive momentum"),
            ("great", "contagious"),
        ] {
            let data = json!({ "mood": mood });
            let body = TemplateEngine::render_body(NotificationKind::Encouragement, &data);
            assert!(body.contains(fragment), "mood={mood}: {body}");
        }

        // 未知心情回退到通用文案
        let body =
            TemplateEngine::render_body(NotificationKind::Encouragement, &json!({}));
        assert!(body.contains("doing great"));
    }

    #[test]
    fn test_render_redemption_submission_outcomes() {
        let fulfilled = json!({
            "rewardName": "Digital Badge Collection",
            "outcome": { "outcome": "FULFILLED" }
        });
        let body = TemplateEngine::render_body(NotificationKind::RedemptionUpdate, &fulfilled);
        assert!(body.contains("You redeemed"));
        assert!(body.contains("Digital Badge Collection"));

        let pending = json!({
            "rewardName": "Airtime - KSh 100",
            "outcome": { "outcome": "PENDING_APPROVAL" }
        });
        let body = TemplateEngine::render_body(NotificationKind::RedemptionUpdate, &pending);
        assert!(body.contains("awaiting admin approval"));

        let rejected = json!({
            "rewardName": "Inspirational Book",
            "outcome": { "outcome": "REJECTED", "reason": "INSUFFICIENT_POINTS" }
        });
        let body = TemplateEngine::render_body(NotificationKind::RedemptionUpdate, &rejected);
        assert!(body.contains("don't have enough points"));
    }

    #[test]
    fn test_render_redemption_resolution_statuses() {
        let approved = json!({ "rewardName": "Airtime - KSh 100", "status": "APPROVED" });
        let body = TemplateEngine::render_body(NotificationKind::RedemptionUpdate, &approved);
        assert!(body.contains("was approved"));

        let rejected = json!({ "rewardName": "Airtime - KSh 100", "status": "REJECTED" });
        let body = TemplateEngine::render_body(NotificationKind::RedemptionUpdate, &rejected);
        assert!(body.contains("refunded"));

        let fulfilled = json!({ "rewardName": "Airtime - KSh 100", "status": "FULFILLED" });
        let body = TemplateEngine::render_body(NotificationKind::RedemptionUpdate, &fulfilled);
        assert!(body.contains("delivered"));
    }

    #[test]
    fn test_render_challenge_update() {
        let joined = json!({
            "action": "joined",
            "challengeTitle": "7-Day Reading Journey",
            "points": 100
        });
        let body = TemplateEngine::render_body(NotificationKind::ChallengeUpdate, &joined);
        assert!(body.contains("You joined"));
        assert!(body.contains("100 points"));

        let completed = json!({
            "action": "completed",
            "challengeTitle": "7-Day Reading Journey",
            "points": 100
        });
        let body = TemplateEngine::render_body(NotificationKind::ChallengeUpdate, &completed);
        assert!(body.contains("You completed"));
        assert!(body.contains("earned 100 points"));
    }

    #[test]
    fn test_daily_rotation_draws_from_fixed_lists() {
        let body =
            TemplateEngine::render_body(NotificationKind::DailyAffirmation, &json!({}));
        assert!(DAILY_AFFIRMATIONS.contains(&body.as_str()));

        let body = TemplateEngine::render_body(NotificationKind::DailyVerse, &json!({}));
        assert!(BIBLE_VERSES.contains(&body.as_str()));
    }

    #[test]
    fn test_missing_data_uses_defaults() {
        let body =
            TemplateEngine::render_body(NotificationKind::RedemptionUpdate, &json!({}));
        assert!(body.contains("your reward"));

        let title = TemplateEngine::render_title(NotificationKind::Reminder, &json!({}));
        assert_eq!(title, "Reminder ⏰");
    }
}
