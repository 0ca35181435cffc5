//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod dispatch_repo;
pub mod media_asset_repo;
pub mod placement_repo;
pub mod project_repo;
pub mod track_repo;

pub use dispatch_repo::DispatchRepo;
pub use media_asset_repo::MediaAssetRepo;
pub use placement_repo::PlacementRepo;
pub use project_repo::ProjectRepo;
pub use track_repo::TrackRepo;
