//! # 系统设置实体定义
//!
//! 以 key/value 形式保存的系统级设置，value 为 JSON 字符串

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 登录方式设置的 key
pub const KEY_AUTH: &str = "auth";

/// 系统设置实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "system_settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub key: String,
    pub value: String, // JSON 字符串
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
