//! VolView Insight runner.
//!
//! Hosts the orchestrators behind the viewer's multimodal LLM analysis and
//! lung segmentation, and the HTTP API that exposes them.

pub mod adapters;
pub mod api;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod offload;
pub mod orchestrator;
pub mod session;
pub mod state;
pub mod store;

pub use error::{Error, Result};
