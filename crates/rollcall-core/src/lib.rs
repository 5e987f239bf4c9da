//! Core types and trait definitions for the Rollcall attendance engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::AttendanceStore`]; callers drive the
//! engine through [`service::Attendance`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod directory;
pub mod error;
pub mod event;
pub mod service;
pub mod store;
pub mod summary;
pub mod window;

pub use error::{Classify, Error, ErrorKind, Result};
pub use service::Attendance;
