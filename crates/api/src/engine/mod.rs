//! Result reconciliation engine.
//!
//! Contains the reconciler that routes completion notifications from
//! the render backend back onto the timeline: decoding the shot address
//! from the uploaded filename, recovering dispatch context, and placing
//! (or orphaning) the resulting media asset.

pub mod reconciler;
