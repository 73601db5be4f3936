//! 应用上下文（DI 容器）
//!
//! 统一持有跨模块共享的服务实例，便于在测试中注入替身实现。

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::auth::AuthorManager;
use crate::config::AppConfig;
use crate::database::{ensure_builtin_admin, init_database, sync_schema};
use crate::error::{AppError, Result};
use crate::services::AuthService;
use crate::{
    linfo,
    logging::{LogComponent, LogStage},
};

/// 共享服务集合
#[derive(Clone)]
pub struct AppContext {
    /// 应用配置
    pub config: Arc<AppConfig>,
    /// 数据库连接
    pub db: Arc<DatabaseConnection>,
    /// 提供商注册表
    pub auth_manager: Arc<AuthorManager>,
    /// 登录认证服务
    pub auth_service: Arc<AuthService>,
}

impl AppContext {
    /// 用已就绪的连接和注册表组装上下文
    pub fn new(
        config: Arc<AppConfig>,
        db: Arc<DatabaseConnection>,
        auth_manager: Arc<AuthorManager>,
    ) -> Self {
        let auth_service = Arc::new(AuthService::new(
            Arc::clone(&auth_manager),
            Arc::clone(&db),
            config.auth.clone(),
        ));
        Self {
            config,
            db,
            auth_manager,
            auth_service,
        }
    }

    /// 连接数据库、同步表结构、初始化内置管理员并加载已保存的登录方式
    pub async fn bootstrap(config: AppConfig) -> Result<Self> {
        let db = init_database(&config.database)
            .await
            .map_err(|e| AppError::database("数据库连接失败", e))?;
        sync_schema(&db)
            .await
            .map_err(|e| AppError::database("表结构同步失败", e))?;
        let db = Arc::new(db);

        ensure_builtin_admin(Arc::clone(&db), &config.admin).await?;

        let auth_manager = Arc::new(AuthorManager::from_config(&config.auth)?);
        let context = Self::new(Arc::new(config), db, auth_manager);
        context.auth_service.load().await?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "bootstrap",
            "应用上下文初始化完成"
        );
        Ok(context)
    }
}
