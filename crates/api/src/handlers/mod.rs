//! Request handlers, one submodule per resource.
//!
//! Handlers delegate to the repositories in `shotforge_db` (and to the
//! dispatcher, fetcher, and reconciliation engine) and map errors via
//! [`AppError`](crate::error::AppError).

pub mod asset;
pub mod generation;
pub mod placement;
pub mod project;
pub mod track;
pub mod upload;
