//! Axum 路由共享状态

use std::sync::Arc;

use loyalty_shared::database::Database;

use crate::auth::JwtManager;
use crate::service::{LedgerService, OrderService, UserService};

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub ledger: Arc<LedgerService>,
    pub users: Arc<UserService>,
    pub jwt: Arc<JwtManager>,
    /// 使用内存仓储时为 None，就绪探针跳过数据库检查
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(
        orders: OrderService,
        ledger: LedgerService,
        users: UserService,
        jwt: JwtManager,
    ) -> Self {
        Self {
            orders: Arc::new(orders),
            ledger: Arc::new(ledger),
            users: Arc::new(users),
            jwt: Arc::new(jwt),
            database: None,
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }
}
