//! Movie review service: create, list and count reviews stored in MongoDB,
//! checking each reviewed movie against an external catalog first.

pub mod api;
pub mod catalog;
pub mod config;
pub mod storage;
