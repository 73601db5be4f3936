//! # 查询选项
//!
//! 每个 [`QueryOpt`] 是一个作用在待执行查询上的 scope，调用方传入的切片按顺序
//! 依次应用，因此 `[a, b]` 与先应用 `a` 再应用 `b` 完全等价，空切片即不做任何
//! 过滤的全量查询。

use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{ColumnTrait, Condition, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect, Select, Value};

/// 单个 scope
#[derive(Debug, Clone)]
enum Scope<E: EntityTrait> {
    Filter(Condition),
    Order(E::Column, Order),
    Limit(u64),
    Offset(u64),
}

/// 可组合的查询选项
#[derive(Debug, Clone)]
pub struct QueryOpt<E: EntityTrait> {
    scope: Scope<E>,
}

impl<E: EntityTrait> QueryOpt<E> {
    const fn new(scope: Scope<E>) -> Self {
        Self { scope }
    }

    /// `column = value`
    pub fn equal<V: Into<Value>>(column: E::Column, value: V) -> Self {
        Self::new(Scope::Filter(Condition::all().add(column.eq(value))))
    }

    /// `column IN (values)`
    pub fn is_in<V, I>(column: E::Column, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Self::new(Scope::Filter(Condition::all().add(column.is_in(values))))
    }

    /// 任意条件，例如 `Condition::any()` 组合的 OR 过滤
    pub const fn filter(condition: Condition) -> Self {
        Self::new(Scope::Filter(condition))
    }

    /// 任意表达式
    pub fn expr(expr: SimpleExpr) -> Self {
        Self::new(Scope::Filter(Condition::all().add(expr)))
    }

    /// 原生 SQL 片段过滤，由调用方保证安全
    pub fn raw(sql: &str) -> Self {
        Self::expr(Expr::cust(sql))
    }

    /// 按列排序
    pub const fn order_by(column: E::Column, order: Order) -> Self {
        Self::new(Scope::Order(column, order))
    }

    /// 按列降序
    pub const fn order_by_desc(column: E::Column) -> Self {
        Self::order_by(column, Order::Desc)
    }

    /// 限制返回条数
    pub const fn limit(limit: u64) -> Self {
        Self::new(Scope::Limit(limit))
    }

    /// 跳过前 `offset` 条
    pub const fn offset(offset: u64) -> Self {
        Self::new(Scope::Offset(offset))
    }

    /// 分页（页码从 1 开始），返回 offset 与 limit 两个 scope
    #[must_use]
    pub fn pagination(page: u64, size: u64) -> [Self; 2] {
        let page = page.max(1);
        [Self::offset((page - 1).saturating_mul(size)), Self::limit(size)]
    }

    /// 是否为过滤条件（更新、删除、计数只使用过滤条件）
    pub(crate) const fn is_filter(&self) -> bool {
        matches!(self.scope, Scope::Filter(_))
    }
}

/// 将全部 scope 按顺序应用到查询上
pub(crate) fn apply_select<E: EntityTrait>(mut select: Select<E>, opts: &[QueryOpt<E>]) -> Select<E> {
    for opt in opts {
        select = match &opt.scope {
            Scope::Filter(condition) => select.filter(condition.clone()),
            Scope::Order(column, order) => select.order_by(*column, order.clone()),
            Scope::Limit(limit) => select.limit(*limit),
            Scope::Offset(offset) => select.offset(*offset),
        };
    }
    select
}

/// 只应用过滤条件，用于计数、更新和删除
///
/// 排序与分页对这些语句没有意义（SQLite 的 UPDATE/DELETE 也不支持 LIMIT），
/// 因此被忽略。
pub(crate) fn apply_filters<Q, E>(mut query: Q, opts: &[QueryOpt<E>]) -> Q
where
    Q: QueryFilter,
    E: EntityTrait,
{
    for opt in opts {
        if let Scope::Filter(condition) = &opt.scope {
            query = query.filter(condition.clone());
        }
    }
    query
}
