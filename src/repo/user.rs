//! 用户仓储的专有查询

use entity::users::{self, UserRole};
use sea_orm::{ColumnTrait, DbErr, EntityTrait, QueryFilter};

use super::Repository;

impl Repository<users::Entity> {
    /// 查询唯一的内置管理员，不接受额外的查询选项
    pub async fn get_admin(&self) -> Result<users::Model, DbErr> {
        users::Entity::find()
            .filter(users::Column::Builtin.eq(true))
            .filter(users::Column::Role.eq(UserRole::Admin))
            .one(self.db())
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("builtin admin not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthType;
    use crate::repo::QueryOpt;
    use crate::testing::{UserFixture, create_test_db, init_test_env};

    #[tokio::test]
    async fn test_get_admin_ignores_regular_users() {
        init_test_env();
        let repo = Repository::<users::Entity>::new(create_test_db().await.unwrap());

        repo.create(UserFixture::new().name("member").to_active_model())
            .await
            .unwrap();
        let err = repo.get_admin().await.unwrap_err();
        crate::assert_contains!(err.to_string(), "builtin admin");

        let id = repo
            .create(UserFixture::new().name("root").builtin_admin().to_active_model())
            .await
            .unwrap();
        assert_eq!(repo.get_admin().await.unwrap().id, id);
    }

    #[tokio::test]
    async fn test_third_party_lookup() {
        let repo = Repository::<users::Entity>::new(create_test_db().await.unwrap());
        repo.create(
            UserFixture::new()
                .email("oidc@example.com")
                .third_party(AuthType::Oidc, "sub-1")
                .to_active_model(),
        )
        .await
        .unwrap();

        let opts = [
            QueryOpt::equal(users::Column::AuthType, i32::from(AuthType::Oidc)),
            QueryOpt::equal(users::Column::ThirdId, "sub-1"),
        ];
        assert!(repo.exist(&opts).await.unwrap());
        let found: Vec<users::Model> = repo.list(&opts).await.unwrap();
        assert_eq!(found[0].email, "oidc@example.com");
    }
}
