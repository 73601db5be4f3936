//! # 数据库模块
//!
//! 数据库连接、表结构同步和内置管理员初始化

use chrono::Utc;
use entity::{system_settings, users};
use sea_orm::sea_query::Index;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema, Set,
};
use std::path::Path;
use std::sync::Arc;

use crate::auth::AuthType;
use crate::config::{AdminConfig, DatabaseConfig};
use crate::error::{AppError, Result};
use crate::repo::Repository;
use crate::{
    ldebug, linfo,
    logging::{LogComponent, LogStage},
};

/// SQLite 文件路径，内存数据库返回 None
fn sqlite_file_path(url: &str) -> Option<&Path> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Some(Path::new(path))
}

/// 确保 SQLite 数据库文件及其目录存在
fn prepare_sqlite_file(db_path: &Path) -> std::result::Result<(), DbErr> {
    if let Some(parent_dir) = db_path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            std::fs::create_dir_all(parent_dir).map_err(|e| {
                DbErr::Custom(format!(
                    "无法创建数据库目录 {}: {}",
                    parent_dir.display(),
                    e
                ))
            })?;
            ldebug!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "create_dir",
                &format!("数据库目录创建成功: {}", parent_dir.display())
            );
        }
    }

    if !db_path.exists() {
        std::fs::File::create(db_path).map_err(|e| {
            DbErr::Custom(format!("无法创建数据库文件 {}: {}", db_path.display(), e))
        })?;
    }
    Ok(())
}

/// 初始化数据库连接
pub async fn init_database(config: &DatabaseConfig) -> std::result::Result<DatabaseConnection, DbErr> {
    if config.is_sqlite() {
        if let Some(path) = sqlite_file_path(&config.url) {
            prepare_sqlite_file(path)?;
        }
    }

    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .connect_timeout(config.connect_timeout())
        .sqlx_logging(false);
    // 内存库的每个连接都是独立的数据库
    if config.is_memory_database() {
        options.max_connections(1).min_connections(1);
    }

    let db = Database::connect(options).await?;
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "connect",
        "数据库连接成功"
    );
    Ok(db)
}

/// `users(auth_type, third_id)` 唯一索引
pub const THIRD_IDENTITY_INDEX: &str = "idx_users_auth_type_third_id";

/// 按实体定义创建缺失的表及索引
pub async fn sync_schema(db: &DatabaseConnection) -> std::result::Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut users_table = schema.create_table_from_entity(users::Entity);
    users_table.if_not_exists();
    db.execute(backend.build(&users_table)).await?;

    // 同一第三方身份只能对应一个本地用户
    let third_identity = Index::create()
        .name(THIRD_IDENTITY_INDEX)
        .table(users::Entity)
        .col(users::Column::AuthType)
        .col(users::Column::ThirdId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&third_identity)).await?;

    let mut settings_table = schema.create_table_from_entity(system_settings::Entity);
    settings_table.if_not_exists();
    db.execute(backend.build(&settings_table)).await?;

    ldebug!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "sync_schema",
        "表结构同步完成"
    );
    Ok(())
}

/// 内置管理员不存在时创建，返回当前的内置管理员
pub async fn ensure_builtin_admin(
    db: Arc<DatabaseConnection>,
    admin: &AdminConfig,
) -> Result<users::Model> {
    let repo = Repository::<users::Entity>::new(db);
    match repo.get_admin().await {
        Ok(existing) => return Ok(existing),
        Err(DbErr::RecordNotFound(_)) => {}
        Err(e) => return Err(AppError::database("查询内置管理员失败", e)),
    }

    let password_hash = bcrypt::hash(&admin.password, bcrypt::DEFAULT_COST)?;
    let now = Utc::now().naive_utc();
    let model = users::ActiveModel {
        name: Set(admin.name.clone()),
        email: Set(admin.email.clone()),
        avatar: Set(String::new()),
        role: Set(users::UserRole::Admin),
        builtin: Set(true),
        auth_type: Set(AuthType::Password.into()),
        third_id: Set(None),
        password_hash: Set(Some(password_hash)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let id = repo.create(model).await?;
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "seed_admin",
        &format!("内置管理员已创建: {} (id={id})", admin.name)
    );
    Ok(repo.get_by_id::<users::Model, _>(id, &[]).await?)
}

/// 检查数据库连通性
pub async fn ping(db: &DatabaseConnection) -> Result<()> {
    db.ping()
        .await
        .map_err(|e| AppError::database("数据库连接检查失败", e))
}
