//! # 通用仓储
//!
//! 对任意 Sea-ORM 实体提供统一的 List/Count/Create/Get/Exist/Update/Delete。

use std::marker::PhantomData;
use std::sync::Arc;

use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend,
    DbErr, EntityTrait, FromQueryResult, Iterable, PaginatorTrait, PrimaryKeyToColumn,
    PrimaryKeyTrait, QueryFilter, QuerySelect, QueryTrait, Select, Value,
};

use super::query::{QueryOpt, apply_filters, apply_select};
use crate::{
    lwarn,
    logging::{LogComponent, LogStage},
};

type PrimaryKeyValue<E> = <<E as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType;

/// 以实体类型为参数的通用仓储
///
/// 所有方法都直接返回存储层的 [`DbErr`]，不做任何翻译，调用方可以据此区分
/// `RecordNotFound` 与其他失败。
pub struct Repository<E: EntityTrait> {
    db: Arc<DatabaseConnection>,
    entity: PhantomData<E>,
}

impl<E: EntityTrait> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            entity: PhantomData,
        }
    }
}

impl<E> Repository<E>
where
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync,
{
    /// 创建仓储
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            entity: PhantomData,
        }
    }

    /// 底层数据库连接
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    fn table_name() -> String {
        E::default().table_name().to_string()
    }

    /// 查询全部匹配的记录。不隐含任何 limit，分页请使用 [`QueryOpt::pagination`]。
    pub async fn list<M>(&self, opts: &[QueryOpt<E>]) -> Result<Vec<M>, DbErr>
    where
        M: FromQueryResult,
    {
        apply_select(E::find(), opts)
            .into_model::<M>()
            .all(self.db())
            .await
    }

    /// 统计匹配的记录数
    pub async fn count(&self, opts: &[QueryOpt<E>]) -> Result<u64, DbErr> {
        apply_filters(E::find(), opts).count(self.db()).await
    }

    /// 插入一条记录，返回主键。唯一约束等存储层错误原样返回。
    pub async fn create<A>(&self, model: A) -> Result<PrimaryKeyValue<E>, DbErr>
    where
        A: ActiveModelTrait<Entity = E> + Send,
    {
        let result = E::insert(model).exec(self.db()).await?;
        Ok(result.last_insert_id)
    }

    /// 按主键查询，附加的查询选项在主键条件之后应用。没有匹配时返回
    /// [`DbErr::RecordNotFound`]。
    pub async fn get_by_id<M, I>(&self, id: I, opts: &[QueryOpt<E>]) -> Result<M, DbErr>
    where
        M: FromQueryResult,
        I: Into<PrimaryKeyValue<E>>,
    {
        apply_select(E::find_by_id(id), opts)
            .into_model::<M>()
            .one(self.db())
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("{} not found", Self::table_name())))
    }

    /// 是否存在匹配的记录，等价于 `count(opts) > 0`，但只执行一次 `EXISTS` 探测
    pub async fn exist(&self, opts: &[QueryOpt<E>]) -> Result<bool, DbErr> {
        self.select_exists(apply_filters(E::find(), opts)).await
    }

    /// 按主键判断是否存在
    pub async fn exist_by_id<I>(&self, id: I) -> Result<bool, DbErr>
    where
        I: Into<PrimaryKeyValue<E>>,
    {
        self.select_exists(E::find_by_id(id)).await
    }

    async fn select_exists(&self, select: Select<E>) -> Result<bool, DbErr> {
        let backend = self.db.get_database_backend();
        let inner = select.select_only().expr(Expr::cust("1")).into_query();
        let stmt = Query::select().expr(Expr::exists(inner)).to_owned();

        let row = self
            .db
            .query_one(backend.build(&stmt))
            .await?
            .ok_or_else(|| DbErr::Custom("EXISTS query returned no row".to_string()))?;

        match backend {
            DbBackend::Postgres => row.try_get_by_index::<bool>(0),
            _ => row.try_get_by_index::<i64>(0).map(|flag| flag != 0),
        }
    }

    /// 按显式的 “列 → 值” 映射更新匹配的记录，返回受影响行数
    ///
    /// 只写入映射中出现的列，与内存中实体的其他字段无关。映射为空时不访问数据库。
    pub async fn update<P>(&self, patch: P, opts: &[QueryOpt<E>]) -> Result<u64, DbErr>
    where
        P: IntoIterator<Item = (E::Column, Value)>,
    {
        let mut update = E::update_many();
        let mut changed = false;
        for (column, value) in patch {
            update = update.col_expr(column, Expr::value(value));
            changed = true;
        }
        if !changed {
            return Ok(0);
        }

        let result = apply_filters(update, opts).exec(self.db()).await?;
        Ok(result.rows_affected)
    }

    /// 部分更新：只写入 `model` 中被 `Set` 的字段
    ///
    /// 主键字段不会被写入；若 `model` 携带主键，则更新额外限定在该行上。
    pub async fn update_by_model<A>(&self, model: A, opts: &[QueryOpt<E>]) -> Result<u64, DbErr>
    where
        A: ActiveModelTrait<Entity = E> + Send,
    {
        let mut model = model;
        let mut update = E::update_many();
        for key in E::PrimaryKey::iter() {
            let column = key.into_column();
            if let ActiveValue::Set(value) | ActiveValue::Unchanged(value) = model.get(column) {
                update = update.filter(column.eq(value));
            }
            model.not_set(column);
        }
        if !model.is_changed() {
            return Ok(0);
        }

        let result = apply_filters(update.set(model), opts)
            .exec(self.db())
            .await?;
        Ok(result.rows_affected)
    }

    /// 删除匹配的记录，返回受影响行数
    ///
    /// **危险**：不传任何过滤条件会删除整张表。这里刻意不做拦截，与存储层语义
    /// 保持一致，调用方必须自己保证传入了过滤条件。
    pub async fn delete(&self, opts: &[QueryOpt<E>]) -> Result<u64, DbErr> {
        if !opts.iter().any(QueryOpt::is_filter) {
            lwarn!(
                "system",
                LogStage::Db,
                LogComponent::Database,
                "delete_without_filter",
                &format!("deleting every row of table {}", Self::table_name())
            );
        }

        let result = apply_filters(E::delete_many(), opts)
            .exec(self.db())
            .await?;
        Ok(result.rows_affected)
    }
}
