//! Pure domain logic for the ShotForge generation engine.
//!
//! Everything in this crate is I/O-free: shared identifier types, the
//! error taxonomy, the filename Address codec, the workflow template
//! hydrator, and the shot/timeline vocabularies. Persistence, HTTP, and
//! storage concerns live in the sibling crates.

pub mod address;
pub mod error;
pub mod generation;
pub mod hydrate;
pub mod timeline;
pub mod types;
