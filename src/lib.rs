//! Client for the PRD authoring service: REST calls, the chat reply stream
//! and the transcript it drives.

pub mod api;
pub mod config;
pub mod errors;
pub mod keys;
pub mod knowledge;
pub mod models;
pub mod progress;
pub mod service;
pub mod sse;
pub mod stream;
pub mod transcript;
pub mod upload;
