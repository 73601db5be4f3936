//! # 测试数据 Fixtures

use chrono::Utc;
use entity::users::{self, UserRole};
use sea_orm::Set;

use crate::auth::AuthType;

/// 用户测试数据构建器
pub struct UserFixture {
    /// 用户名
    pub name: String,
    /// 邮箱
    pub email: String,
    /// 头像地址
    pub avatar: String,
    /// 角色
    pub role: UserRole,
    /// 是否内置账号
    pub builtin: bool,
    /// 注册来源
    pub auth_type: AuthType,
    /// 第三方身份标识
    pub third_id: Option<String>,
}

impl Default for UserFixture {
    fn default() -> Self {
        Self {
            name: "test_user".to_string(),
            email: "test@example.com".to_string(),
            avatar: String::new(),
            role: UserRole::User,
            builtin: false,
            auth_type: AuthType::Password,
            third_id: None,
        }
    }
}

impl UserFixture {
    /// 默认的本地密码用户
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置用户名
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// 设置邮箱
    #[must_use]
    pub fn email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    /// 设置为内置管理员
    #[must_use]
    pub fn builtin_admin(mut self) -> Self {
        self.role = UserRole::Admin;
        self.builtin = true;
        self
    }

    /// 设置为第三方登录用户
    #[must_use]
    pub fn third_party(mut self, auth_type: AuthType, third_id: &str) -> Self {
        self.auth_type = auth_type;
        self.third_id = Some(third_id.to_string());
        self
    }

    /// 转换为 Sea-ORM ActiveModel
    #[must_use]
    pub fn to_active_model(self) -> users::ActiveModel {
        let now = Utc::now().naive_utc();
        users::ActiveModel {
            name: Set(self.name),
            email: Set(self.email),
            avatar: Set(self.avatar),
            role: Set(self.role),
            builtin: Set(self.builtin),
            auth_type: Set(self.auth_type.into()),
            third_id: Set(self.third_id),
            password_hash: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
    }
}
