use sqlx::PgConnection;
use tracing::{debug, instrument};

use super::LockKey;
use crate::error::Result;

impl LockKey {
    /// 在当前事务内获取 advisory lock，阻塞直到拿到锁
    ///
    /// 锁随事务提交或回滚释放，进程崩溃时连接断开同样会释放。
    #[instrument(skip(conn), fields(key = %self))]
    pub async fn acquire_xact(&self, conn: &mut PgConnection) -> Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock($1, hashtext($2))")
            .bind(self.kind.code())
            .bind(self.user_id.to_string())
            .execute(conn)
            .await?;

        debug!("已获取事务级锁");
        Ok(())
    }
}
