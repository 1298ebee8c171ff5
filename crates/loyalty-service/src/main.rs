//! 积分服务入口

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use loyalty_service::{
    accrual::{AccrualOracle, HttpAccrualClient},
    api::{self, AppState},
    auth::JwtManager,
    pipeline::ReconciliationPipeline,
    repository::{
        MemoryOrderRepository, MemoryUserRepository, OrderRepository, OrderRepositoryTrait,
        UserRepository, UserRepositoryTrait,
    },
    service::{LedgerService, OrderService, UserService},
};
use loyalty_shared::{config::AppConfig, database::Database, observability};
use tokio::net::TcpListener;
use tracing::{info, warn};

const SERVICE_NAME: &str = "loyalty-service";
const DEFAULT_JWT_SECRET: &str = "loyalty-dev-secret-change-me";

/// 命令行参数，优先级高于配置文件和环境变量
#[derive(Debug, Parser)]
#[command(name = "loyalty", about = "积分服务")]
struct Cli {
    /// 服务监听地址（host:port）
    #[arg(short = 'a', long = "address")]
    run_address: Option<String>,

    /// PostgreSQL 连接串
    #[arg(short = 'd', long = "database-uri")]
    database_uri: Option<String>,

    /// 积分计算系统地址
    #[arg(short = 'r', long = "accrual-address")]
    accrual_address: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut AppConfig) -> anyhow::Result<()> {
        if let Some(addr) = self.run_address {
            config.apply_run_address(&addr)?;
        }
        if let Some(uri) = self.database_uri {
            config.database.url = uri;
        }
        if let Some(addr) = self.accrual_address {
            config.accrual.base_url = addr;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(SERVICE_NAME).context("加载配置失败")?;
    cli.apply(&mut config)?;

    let _guard = observability::init(&config.service_name, &config.observability).await?;

    info!(
        environment = %config.environment,
        addr = %config.server_addr(),
        accrual = %config.accrual.base_url,
        "Starting {}",
        SERVICE_NAME
    );

    if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        if config.is_production() {
            anyhow::bail!("生产环境必须设置 LOYALTY__AUTH__JWT_SECRET");
        }
        warn!("使用默认 JWT 密钥，生产环境请设置 LOYALTY__AUTH__JWT_SECRET");
    }

    // database.url 为空时使用内存仓储，仅用于本地开发
    let (database, order_repo, user_repo): (
        Option<Database>,
        Arc<dyn OrderRepositoryTrait>,
        Arc<dyn UserRepositoryTrait>,
    ) = if config.database.url.is_empty() {
        warn!("未配置数据库，使用内存仓储，重启后数据丢失");
        (
            None,
            Arc::new(MemoryOrderRepository::new()),
            Arc::new(MemoryUserRepository::new()),
        )
    } else {
        let db = Database::connect(&config.database).await?;
        db.migrate(&sqlx::migrate!("./migrations")).await?;
        (
            Some(db.clone()),
            Arc::new(OrderRepository::new(db.pool().clone())),
            Arc::new(UserRepository::new(db.pool().clone())),
        )
    };

    let oracle: Arc<dyn AccrualOracle> = Arc::new(HttpAccrualClient::new(&config.accrual)?);
    let pipeline = ReconciliationPipeline::spawn(
        order_repo.clone(),
        oracle,
        &config.pipeline,
        &config.accrual,
    );

    let mut state = AppState::new(
        OrderService::new(order_repo.clone(), pipeline.signal()),
        LedgerService::new(order_repo),
        UserService::new(user_repo, config.auth.bcrypt_cost),
        JwtManager::new(&config.auth),
    );
    if let Some(db) = database.clone() {
        state = state.with_database(db);
    }

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, api::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pipeline.shutdown().await;
    if let Some(db) = database {
        db.close().await;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// 监听关闭信号（Ctrl+C 或 SIGTERM）
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
