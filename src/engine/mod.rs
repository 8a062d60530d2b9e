//! # Dependency Engine
//!
//! Cycle prevention and status propagation over a [`GraphStore`].
//!
//! ## Components
//!
//! | Component | Role |
//! |-----------|------|
//! | [`CycleDetector`] | Rejects edges that would close a cycle; audits the whole graph |
//! | [`StatusCascader`] | Re-derives statuses and pushes changes to dependents |
//! | [`DependencyEngine`] | Serialized entry points used by the request layer |
//!
//! ## Edge Lifecycle
//!
//! ```text
//! add_dependency(task, depends_on)
//!   -> self-dependency? duplicate? unknown task?
//!   -> detect_cycle: does depends_on already reach task?
//!   -> insert_edge
//!   -> cascade wave seeded with task
//! ```
//!
//! The engine persists nothing itself; every read and write goes through
//! the store it was given.

mod store;
mod traversal;
mod cycle;
mod cascade;
mod error;
mod service;

pub use store::{GraphStore, StoreError};
pub use cycle::{format_path, CycleDetector};
pub use cascade::{
    derive_status, CascadeError, CascadeFailure, CascadeReport, StatusCascader, StatusChange,
};
pub use error::EngineError;
pub use service::DependencyEngine;
