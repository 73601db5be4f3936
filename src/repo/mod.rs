//! # 数据访问层
//!
//! 以实体类型为参数的通用仓储 [`Repository`]，所有过滤、分页、排序都通过
//! 可组合的 [`QueryOpt`] 表达。仓储本身不加任何进程内锁，一致性完全交给
//! 数据库：每次调用就是一次独立的存储层操作。

mod base;
mod query;
mod user;

pub use base::Repository;
pub use query::QueryOpt;
