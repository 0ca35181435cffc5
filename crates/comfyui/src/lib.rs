//! ComfyUI integration: HTTP API client, volatile correlation store,
//! and the job dispatcher that walks a batch of shots through template
//! hydration, addressing, audit, and submission.

pub mod api;
pub mod correlation;
pub mod dispatcher;

pub use api::{ComfyUIApi, ComfyUIApiError};
pub use correlation::{CorrelationEntry, CorrelationStore, InMemoryCorrelationStore};
pub use dispatcher::{DispatchError, DispatchOutcome, InFlightCounter, JobDispatcher};
