//! Core of tidepool: sandbox guard, registry, classifier, extraction and dispatch.
//!
//! Everything an operation needs at run time is reached through these modules;
//! operations themselves live in `crate::operations`.

pub mod classifier;
pub mod config;
pub mod context;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod external_action;
pub mod output;
pub mod params;
pub mod registry;
pub mod remote;
pub mod sandbox;
pub mod time;
