//! One repository per table. Repositories are zero-sized and take any
//! PostgreSQL executor, so the same statements run against the pool or
//! inside a transaction.

pub mod member_repo;

pub use member_repo::MemberRepo;
