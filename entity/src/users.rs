//! # 用户实体定义
//!
//! 用户基础信息表的 Sea-ORM 实体模型，本地密码用户与第三方登录用户共用

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 用户角色
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum UserRole {
    /// 管理员
    #[sea_orm(num_value = 1)]
    Admin,
    /// 普通用户
    #[sea_orm(num_value = 2)]
    User,
}

/// 用户实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub role: UserRole,
    /// 内置账号（系统初始化时创建的管理员）
    pub builtin: bool,
    /// 注册来源，与认证类型的数值一致
    pub auth_type: i32,
    /// 第三方身份标识（OIDC `sub`）
    pub third_id: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
