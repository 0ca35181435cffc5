//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) where patching is supported

pub mod dispatch;
pub mod media_asset;
pub mod placement;
pub mod project;
pub mod track;
