//! 命令行定义

use clap::{Parser, Subcommand};

/// HURU Circle 服务端命令行
#[derive(Debug, Parser)]
#[command(name = "huru-server", about = "HURU Circle 内存态后端服务", version)]
pub struct Cli {
    /// 日志级别（被 RUST_LOG 环境变量覆盖）
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// 子命令
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// 启动 HTTP 服务
    Server {
        /// 监听端口（覆盖配置文件）
        #[arg(short, long)]
        port: Option<u16>,

        /// 启动时预填充测试数据
        #[arg(long)]
        populate: bool,

        /// 预填充的用户数量
        #[arg(long, default_value_t = 20)]
        user_count: usize,
    },

    /// 生成测试数据，可输出到 JSON 文件
    Populate {
        /// 用户数量
        #[arg(long, default_value_t = 20)]
        users: usize,

        /// 输出文件路径
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_command() {
        let cli = Cli::parse_from([
            "huru-server",
            "server",
            "--port",
            "3000",
            "--populate",
            "--user-count",
            "5",
        ]);
        match cli.command {
            Commands::Server {
                port,
                populate,
                user_count,
            } => {
                assert_eq!(port, Some(3000));
                assert!(populate);
                assert_eq!(user_count, 5);
            }
            other => panic!("期望 Server 子命令，实际: {other:?}"),
        }
    }

    #[test]
    fn test_parse_populate_defaults() {
        let cli = Cli::parse_from(["huru-server", "populate"]);
        match cli.command {
            Commands::Populate { users, output } => {
                assert_eq!(users, 20);
                assert!(output.is_none());
            }
            other => panic!("期望 Populate 子命令，实际: {other:?}"),
        }
    }
}
