//! Object storage access and resilient asset retrieval.
//!
//! - [`ObjectStore`] -- S3-compatible bucket access: public URLs,
//!   presigned GETs, and the alternate-key probe used when an asset is
//!   not where its record says it is.
//! - [`AssetFetcher`] -- retrying HTTP retrieval of stored assets,
//!   tolerant of results that are still being written when the first
//!   request for them arrives.

pub mod fetch;
pub mod storage;

pub use fetch::{AssetFetcher, FetchError, FetchedAsset};
pub use storage::{alternate_key, ObjectStore, S3Config, StorageError};
