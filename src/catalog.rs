//! Built-in operation catalog.
//!
//! Order is precedence: when a task matches several operations, the earlier entry
//! wins. Adding an operation: append one descriptor here.

use crate::core::registry::OperationDescriptor;
use crate::operations::{
    comments, contacts, credit_card, datagen, dates, docs_index, email, fetch, git, images, logs,
    markdown, sql,
};

pub(crate) const CATALOG: &[OperationDescriptor] = &[
    datagen::DESCRIPTOR,
    markdown::FORMAT_DESCRIPTOR,
    dates::DESCRIPTOR,
    contacts::DESCRIPTOR,
    logs::DESCRIPTOR,
    docs_index::DESCRIPTOR,
    email::DESCRIPTOR,
    credit_card::DESCRIPTOR,
    comments::DESCRIPTOR,
    sql::GOLD_SALES_DESCRIPTOR,
    fetch::DESCRIPTOR,
    git::DESCRIPTOR,
    sql::QUERY_DESCRIPTOR,
    markdown::HTML_DESCRIPTOR,
    images::DESCRIPTOR,
];
