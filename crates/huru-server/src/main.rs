//! HURU Circle 服务端入口
//!
//! 子命令：
//! - `server`: 启动合并了三个域的 HTTP 服务，并运行通知 worker 与
//!   每日推送调度器
//! - `populate`: 生成测试数据，可输出到 JSON 文件

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use huru_server::cli::{Cli, Commands};
use huru_server::seed::SeedGenerator;
use huru_server::{AppStates, build_app};
use huru_shared::config::AppConfig;
use notification_worker::consumer::NotificationWorker;
use notification_worker::scheduler::DailyScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load("huru-server").context("加载配置失败")?;
    // 命令行日志级别覆盖配置文件；RUST_LOG 环境变量优先级最高
    config.observability.log_level = cli.log_level.clone();
    huru_shared::observability::init(&config.observability)?;

    match cli.command {
        Commands::Server {
            port,
            populate,
            user_count,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            run_server(config, populate, user_count).await
        }
        Commands::Populate { users, output } => run_populate(config, users, output),
    }
}

/// 启动 HTTP 服务
async fn run_server(config: AppConfig, populate: bool, user_count: usize) -> anyhow::Result<()> {
    let (states, rx) = AppStates::from_config(&config)?;

    if populate {
        info!(user_count, "预填充测试数据");
        let stats = SeedGenerator::new(user_count).populate(&states)?;
        info!(
            users = stats.users,
            rewards = stats.rewards,
            challenges = stats.challenges,
            events = stats.events,
            posts = stats.posts,
            "数据预填充完成"
        );
    }

    // 通知 worker 消费事件总线
    let worker = NotificationWorker::new(Arc::clone(&states.notifications));
    tokio::spawn(worker.run(rx));

    // 每日定时推送
    if config.scheduler.enabled {
        let scheduler =
            DailyScheduler::new(Arc::clone(&states.notifications), &config.scheduler)
                .context("解析推送 cron 表达式失败")?;
        tokio::spawn(scheduler.run());
    }

    let app = build_app(&states);
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .context("解析监听地址失败")?;
    let listener = TcpListener::bind(addr).await.context("绑定端口失败")?;

    info!("HURU Circle 服务已启动: http://{}", addr);
    info!("可用端点:");
    info!("  GET  /health - 健康检查");
    info!("  GET  /users/{{id}}/level - 等级与进度");
    info!("  POST /users/{{id}}/redemptions - 兑换奖品");
    info!("  GET  /posts - 社区信息流");
    info!("  GET  /admin/redemptions/pending - 兑换审批队列");
    info!("按 Ctrl+C 停止服务");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务器运行失败")?;

    info!("HURU Circle 服务已停止");
    Ok(())
}

/// 生成测试数据
fn run_populate(config: AppConfig, users: usize, output: Option<String>) -> anyhow::Result<()> {
    let (states, _rx) = AppStates::from_config(&config)?;
    let stats = SeedGenerator::new(users).populate(&states)?;

    if let Some(ref path) = output {
        let dump = serde_json::json!({
            "accounts": states.progress.accounts.list(),
            "rewards": states.progress.rewards.list(),
            "challenges": states.progress.challenges.list(),
            "events": states.progress.events.list(),
            "posts": states.community.posts.list(),
        });
        let json = serde_json::to_string_pretty(&dump).context("序列化数据失败")?;
        std::fs::write(path, json).context("写入输出文件失败")?;
        info!(path = %path, "数据已输出到文件");
    }

    println!("\n数据生成完成:");
    println!("{}", "-".repeat(30));
    println!("用户数量: {}", stats.users);
    println!("奖品数量: {}", stats.rewards);
    println!("挑战数量: {}", stats.challenges);
    println!("活动数量: {}", stats.events);
    println!("帖子数量: {}", stats.posts);
    println!("{}", "-".repeat(30));

    Ok(())
}

/// 等待关闭信号
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("安装 CTRL+C 信号处理器失败");
    info!("收到关闭信号，正在停止服务...");
}
