//! Storage adapters.
//!
//! Storage adapters can be layered on stores.

pub mod usage_log;
