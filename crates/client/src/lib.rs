//! Client side of the family tree.
//!
//! [`api::FamilyApi`] speaks the HTTP contract. [`view::FamilyView`] is the
//! session state a front end renders from: it loads the tree, runs
//! mutations followed by a full re-fetch, and carries the chart state across
//! refreshes. [`bio::HttpBioGenerator`] and [`crop::CropJob`] back the
//! profile editor.

pub mod api;
pub mod bio;
pub mod config;
pub mod crop;
pub mod error;
pub mod view;
