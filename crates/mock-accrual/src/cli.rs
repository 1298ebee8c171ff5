//! 命令行
//!
//! ```bash
//! # 启动服务，每个订单经过 2 次 PROCESSING 后完成，每 50 次查询限流一次
//! mock-accrual server --port 8081 --processing-polls 2 --throttle-every 50
//!
//! # 向运行中的服务登记订单
//! mock-accrual register 79927398713 --accrual 500
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tracing::info;

use crate::service::{MockAccrualState, RegisterOrderRequest, router};
use crate::store::AccrualStore;

#[derive(Parser, Debug)]
#[command(name = "mock-accrual")]
#[command(version, about = "积分计算系统模拟服务")]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 启动 HTTP 服务
    Server {
        #[arg(short, long, default_value = "8081")]
        port: u16,

        /// REGISTERED 之后返回 PROCESSING 的次数
        #[arg(long, default_value = "1")]
        processing_polls: u32,

        /// 每 N 次查询返回一次 429，0 表示不限流
        #[arg(long, default_value = "0")]
        throttle_every: u64,

        /// 429 响应中的 Retry-After 秒数
        #[arg(long, default_value = "60")]
        retry_after: u64,
    },

    /// 向运行中的服务登记订单
    Register {
        number: String,

        /// 积分；不指定时订单最终为 INVALID
        #[arg(long)]
        accrual: Option<Decimal>,

        #[arg(long, default_value = "http://localhost:8081")]
        server: String,
    },
}

pub async fn run_server(
    port: u16,
    processing_polls: u32,
    throttle_every: u64,
    retry_after: u64,
) -> Result<()> {
    let state = Arc::new(MockAccrualState::new(
        AccrualStore::new(processing_polls),
        throttle_every,
        retry_after,
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await.context("绑定端口失败")?;

    info!(processing_polls, throttle_every, "Mock 积分计算系统已启动: http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("收到 Ctrl+C，停止服务");
        })
        .await
        .context("服务运行失败")?;

    Ok(())
}

pub async fn run_register(server: &str, number: &str, accrual: Option<Decimal>) -> Result<()> {
    let url = format!("{}/api/orders", server.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .post(&url)
        .json(&RegisterOrderRequest {
            order: number.to_string(),
            accrual,
        })
        .send()
        .await
        .with_context(|| format!("请求 {} 失败", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("登记订单失败: {} 返回 {}", url, status);
    }

    info!(number, ?accrual, "订单已登记");
    Ok(())
}
