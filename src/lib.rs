//! # fsbank
//!
//! `fsbank` analyzes FMOD sound banks and extracts their sounds as WAVE files.
//!
//! Banks are scanned for embedded FSB5 containers, every container is probed through a
//! [`ContainerEngine`](engine::ContainerEngine), and the results are arranged into a tree of
//! [`AnalysisNode`](tree::AnalysisNode)s. Selected leaves of that tree can then be written out
//! with [`Session::extract`](session::Session::extract).

#![warn(clippy::pedantic, future_incompatible)]
#![deny(
    let_underscore_drop,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_abi,
    missing_debug_implementations,
    missing_docs,
    non_ascii_idents,
    nonstandard_style,
    noop_method_call,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_op_in_unsafe_fn,
    unused,
    unused_import_braces,
    unused_lifetimes,
    unused_macro_rules,
    unused_qualifications,
    unused_results
)]

mod audit;
mod header;
mod read;

pub mod analyze;
pub mod batch;
pub mod engine;
pub mod error;
pub mod export;
pub mod extract;
pub mod model;
pub mod naming;
pub mod scan;
pub mod session;
pub mod tree;
pub mod wav;

pub use audit::{AuditLog, AuditRecord, Level as AuditLevel, AUDIT_LOG_NAME};
pub use error::{Error, Result};
pub use header::{AudioFormat, FSB5_MAGIC};
pub use session::Session;
