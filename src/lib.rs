// ABOUTME: Root module for selectstream - streaming response ingestion for LLM clients.
// ABOUTME: Re-exports all public types from submodules.

pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod prelude;
pub mod session;
pub mod transport;

pub use error::StreamError;
