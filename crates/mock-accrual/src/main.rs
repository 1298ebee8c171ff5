//! Mock 积分计算系统入口

use clap::Parser;
use mock_accrual::cli::{Cli, Commands, run_register, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 优先使用环境变量 RUST_LOG，否则使用命令行参数指定的级别
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .init();

    match cli.command {
        Commands::Server {
            port,
            processing_polls,
            throttle_every,
            retry_after,
        } => run_server(port, processing_polls, throttle_every, retry_after).await?,
        Commands::Register {
            number,
            accrual,
            server,
        } => run_register(&server, &number, accrual).await?,
    }

    Ok(())
}
