//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。
//! 等级阈值等可调参数以配置数据注入，不写死在代码里。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// 服务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// 等级阶梯中的一行：等级名 + 达到该等级所需的最低积分
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TierEntry {
    pub name: String,
    pub threshold: u64,
}

/// 游戏化配置
///
/// 阈值表是有序配置数据，运营可调整而无需改代码。
/// 默认值与产品定义一致：Explorer=0, Builder=500, Leader=1500。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GamificationConfig {
    pub tiers: Vec<TierEntry>,
    /// 乐观并发写入的最大重试次数
    pub redemption_max_retries: u32,
    /// 每日签到奖励积分
    pub checkin_points: u64,
}

impl Default for GamificationConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                TierEntry {
                    name: "explorer".to_string(),
                    threshold: 0,
                },
                TierEntry {
                    name: "builder".to_string(),
                    threshold: 500,
                },
                TierEntry {
                    name: "leader".to_string(),
                    threshold: 1500,
                },
            ],
            redemption_max_retries: 3,
            checkin_points: 5,
        }
    }
}

/// 内容审核配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// 已通过的帖子累计举报达到该值后回到审核队列
    pub flag_threshold: u32,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self { flag_threshold: 3 }
    }
}

/// 定时推送配置
///
/// cron 表达式（秒 分 时 日 月 星期），默认早 8 点肯定语、晚 7 点经文。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub affirmation_cron: String,
    pub verse_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            affirmation_cron: "0 0 8 * * *".to_string(),
            verse_cron: "0 0 19 * * *".to_string(),
        }
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub server: ServerConfig,
    pub gamification: GamificationConfig,
    pub moderation: ModerationConfig,
    pub scheduler: SchedulerConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的覆盖先加载的同名配置项）：
    /// 1. 结构体默认值
    /// 2. config/default.toml
    /// 3. config/{environment}.toml
    /// 4. 环境变量（HURU 前缀，如 HURU_SERVER__PORT -> server.port）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("HURU_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                Environment::with_prefix("HURU")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 获取服务地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
