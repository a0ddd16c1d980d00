//! Domain logic for the lineage family tree.
//!
//! Everything in this crate is free of I/O: member records and their
//! validation, tree assembly, the [`store::MemberStore`] seam and the
//! mutation operations written against it, read-only query views, and the
//! chart engine that lays out and renders the tree.

pub mod bio;
pub mod chart;
pub mod crop;
pub mod error;
pub mod member;
pub mod memory;
pub mod mutation;
pub mod query;
pub mod request;
pub mod store;
pub mod tree;
pub mod types;
