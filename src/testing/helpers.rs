//! # 测试辅助函数

use sea_orm::{DatabaseConnection, DbErr};
use std::sync::{Arc, Once};

use crate::config::DatabaseConfig;
use crate::database::{init_database, sync_schema};

static INIT: Once = Once::new();

/// 初始化测试日志，多次调用只生效一次
pub fn init_test_env() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// 创建已同步表结构的内存数据库
pub async fn create_test_db() -> Result<Arc<DatabaseConnection>, DbErr> {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        ..Default::default()
    };
    let db = init_database(&config).await?;
    sync_schema(&db).await?;
    Ok(Arc::new(db))
}

/// 断言包含文本
#[macro_export]
macro_rules! assert_contains {
    ($text:expr, $substring:expr) => {
        assert!(
            $text.contains($substring),
            "Text '{}' does not contain '{}'",
            $text,
            $substring
        );
    };
}
