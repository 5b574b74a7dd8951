//! Operation handlers.
//!
//! Each module exports one or more `OperationDescriptor`s; `crate::catalog` orders them.

pub mod comments;
pub mod contacts;
pub mod credit_card;
pub mod datagen;
pub mod dates;
pub mod docs_index;
pub mod email;
pub mod fetch;
pub mod git;
pub mod images;
pub mod logs;
pub mod markdown;
pub mod sql;
