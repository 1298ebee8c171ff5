//! 对账流水线集成测试
//!
//! 使用内存仓储和预设结果的计算系统，验证端到端的对账行为。

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{ScriptedOracle, pipeline_config, wait_until};
use loyalty_service::accrual::{AccrualLookup, AccrualStatus, HttpAccrualClient};
use loyalty_service::models::{Order, OrderStatus};
use loyalty_service::pipeline::ReconciliationPipeline;
use loyalty_service::repository::{MemoryOrderRepository, OrderRepositoryTrait};
use loyalty_service::service::OrderService;
use loyalty_shared::config::AccrualConfig;
use mock_accrual::{AccrualStore, MockAccrualState};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

const WAIT: Duration = Duration::from_secs(3);

async fn status_of(repo: &MemoryOrderRepository, number: &str) -> Option<OrderStatus> {
    repo.get(number).await.unwrap().map(|o| o.status)
}

#[tokio::test]
async fn test_uploaded_order_is_credited() {
    let repo = MemoryOrderRepository::new();
    let oracle = Arc::new(ScriptedOracle::new());
    oracle.respond_status("79927398713", AccrualStatus::Processed, Some(dec!(500)));

    let pipeline = ReconciliationPipeline::spawn(
        Arc::new(repo.clone()),
        oracle.clone(),
        &pipeline_config(),
        &AccrualConfig::default(),
    );
    let orders = OrderService::new(Arc::new(repo.clone()), pipeline.signal());

    let uploaded = orders
        .upload(Uuid::new_v4(), "79927398713")
        .await
        .unwrap();
    assert_eq!(uploaded.status, OrderStatus::New);
    assert_eq!(uploaded.amount, Decimal::ZERO);

    let done = wait_until(WAIT, || async {
        status_of(&repo, "79927398713").await == Some(OrderStatus::Processed)
    })
    .await;
    assert!(done, "订单未在超时内完成对账");

    let order = repo.get("79927398713").await.unwrap().unwrap();
    assert_eq!(order.amount, dec!(500));
    assert!(order.updated_at.is_some());

    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_unknown_response_leaves_order_new() {
    let repo = MemoryOrderRepository::new();
    repo.insert(Order::replenishment("2377225624", Uuid::new_v4(), Utc::now()));

    let oracle = Arc::new(ScriptedOracle::new());
    oracle.respond("2377225624", AccrualLookup::Unknown);

    // 启动时的信号会处理遗留的 NEW 订单
    let pipeline = ReconciliationPipeline::spawn(
        Arc::new(repo.clone()),
        oracle.clone(),
        &pipeline_config(),
        &AccrualConfig::default(),
    );

    assert!(wait_until(WAIT, || async { oracle.calls("2377225624") >= 1 }).await);
    pipeline.shutdown().await;

    let order = repo.get("2377225624").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::New);
    assert_eq!(order.amount, Decimal::ZERO);
}

#[tokio::test]
async fn test_terminal_orders_are_never_selected_again() {
    let repo = MemoryOrderRepository::new();
    let user = Uuid::new_v4();

    let mut processed = Order::replenishment("12345678903", user, Utc::now());
    processed.status = OrderStatus::Processed;
    processed.amount = dec!(10);
    repo.insert(processed);

    let mut invalid = Order::replenishment("49927398716", user, Utc::now());
    invalid.status = OrderStatus::Invalid;
    repo.insert(invalid);

    repo.insert(Order::withdrawal("9278923470", user, dec!(5), Utc::now()));
    repo.insert(Order::replenishment("79927398713", user, Utc::now()));

    let oracle = Arc::new(ScriptedOracle::new());
    oracle.respond_status("79927398713", AccrualStatus::Invalid, None);

    let pipeline = ReconciliationPipeline::spawn(
        Arc::new(repo.clone()),
        oracle.clone(),
        &pipeline_config(),
        &AccrualConfig::default(),
    );

    assert!(
        wait_until(WAIT, || async {
            status_of(&repo, "79927398713").await == Some(OrderStatus::Invalid)
        })
        .await
    );

    // 终态之后反复触发也不会再查询
    let signal = pipeline.signal();
    for _ in 0..5 {
        signal.raise();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    pipeline.shutdown().await;

    assert_eq!(oracle.calls("79927398713"), 1);
    assert_eq!(oracle.calls("12345678903"), 0);
    assert_eq!(oracle.calls("49927398716"), 0);
    assert_eq!(oracle.calls("9278923470"), 0);
}

#[tokio::test]
async fn test_retrigger_without_new_orders_is_noop() {
    let repo = MemoryOrderRepository::new();
    let oracle = Arc::new(ScriptedOracle::new());

    let pipeline = ReconciliationPipeline::spawn(
        Arc::new(repo.clone()),
        oracle.clone(),
        &pipeline_config(),
        &AccrualConfig::default(),
    );

    let signal = pipeline.signal();
    for _ in 0..10 {
        signal.raise();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    pipeline.shutdown().await;

    assert_eq!(oracle.total_calls(), 0);
}

#[tokio::test]
async fn test_processing_orders_are_polled_until_terminal() {
    let repo = MemoryOrderRepository::new();
    repo.insert(Order::replenishment("79927398713", Uuid::new_v4(), Utc::now()));

    let oracle = Arc::new(ScriptedOracle::new());
    oracle.respond_status("79927398713", AccrualStatus::Processing, None);

    let pipeline = ReconciliationPipeline::spawn(
        Arc::new(repo.clone()),
        oracle.clone(),
        &pipeline_config(),
        &AccrualConfig::default(),
    );

    assert!(
        wait_until(WAIT, || async {
            status_of(&repo, "79927398713").await == Some(OrderStatus::Processing)
        })
        .await
    );

    oracle.respond_status("79927398713", AccrualStatus::Processed, Some(dec!(42.5)));
    let signal = pipeline.signal();
    let done = wait_until(WAIT, || {
        signal.raise();
        async { status_of(&repo, "79927398713").await == Some(OrderStatus::Processed) }
    })
    .await;
    pipeline.shutdown().await;

    assert!(done);
    assert_eq!(
        repo.get("79927398713").await.unwrap().unwrap().amount,
        dec!(42.5)
    );
}

/// 生成 Luhn 校验通过的订单号
fn luhn_number(seed: u64) -> String {
    let digits = format!("{:010}", seed);
    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, c)| {
            let d = u32::from(c - b'0');
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    format!("{}{}", digits, (10 - sum % 10) % 10)
}

#[tokio::test]
async fn test_unknown_backlog_does_not_starve_newer_orders() {
    let config = pipeline_config();
    let repo = MemoryOrderRepository::new();
    let user = Uuid::new_v4();
    let base = Utc::now() - chrono::Duration::hours(1);

    // 一整批计算系统永远不认识的旧订单
    for i in 0..config.batch_limit {
        let created_at = base + chrono::Duration::milliseconds(i);
        repo.insert(Order::replenishment(&luhn_number(i as u64 + 1), user, created_at));
    }
    let mut stuck = Order::replenishment("12345678903", user, base);
    stuck.status = OrderStatus::Processing;
    repo.insert(stuck);

    let oracle = Arc::new(ScriptedOracle::new());
    oracle.respond_status("79927398713", AccrualStatus::Processed, Some(dec!(500)));
    oracle.respond_status("12345678903", AccrualStatus::Processed, Some(dec!(7)));

    let pipeline = ReconciliationPipeline::spawn(
        Arc::new(repo.clone()),
        oracle.clone(),
        &config,
        &AccrualConfig::default(),
    );
    let orders = OrderService::new(Arc::new(repo.clone()), pipeline.signal());
    orders.upload(user, "79927398713").await.unwrap();

    let signal = pipeline.signal();
    let done = wait_until(Duration::from_secs(5), || {
        signal.raise();
        async {
            status_of(&repo, "79927398713").await == Some(OrderStatus::Processed)
                && status_of(&repo, "12345678903").await == Some(OrderStatus::Processed)
        }
    })
    .await;
    pipeline.shutdown().await;

    assert!(done, "新订单或 PROCESSING 订单被积压的旧订单挡住");
    assert_eq!(
        repo.get("12345678903").await.unwrap().unwrap().amount,
        dec!(7)
    );
}

#[tokio::test]
async fn test_end_to_end_against_mock_accrual_server() {
    let state = Arc::new(MockAccrualState::new(AccrualStore::new(1), 0, 1));
    state.store.register("79927398713", Some(dec!(729.98)));
    state.store.register("2377225624", None);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, mock_accrual::router(state)).await.unwrap();
    });

    let config = common::accrual_config(&format!("http://{}", addr));
    let oracle = Arc::new(HttpAccrualClient::new(&config).unwrap());
    let repo = MemoryOrderRepository::new();

    let pipeline =
        ReconciliationPipeline::spawn(Arc::new(repo.clone()), oracle, &pipeline_config(), &config);
    let orders = OrderService::new(Arc::new(repo.clone()), pipeline.signal());
    let user = Uuid::new_v4();
    orders.upload(user, "79927398713").await.unwrap();
    orders.upload(user, "2377225624").await.unwrap();

    // REGISTERED -> PROCESSING -> 终态，需要多轮对账
    let signal = pipeline.signal();
    let done = wait_until(WAIT, || {
        signal.raise();
        async {
            status_of(&repo, "79927398713").await == Some(OrderStatus::Processed)
                && status_of(&repo, "2377225624").await == Some(OrderStatus::Invalid)
        }
    })
    .await;
    pipeline.shutdown().await;

    assert!(done, "订单未在超时内到达终态");
    assert_eq!(
        repo.get("79927398713").await.unwrap().unwrap().amount,
        dec!(729.98)
    );
    assert_eq!(
        repo.get("2377225624").await.unwrap().unwrap().amount,
        Decimal::ZERO
    );
}
