//! Core components, types, and utilities for messenger-relay.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - The persona directive and fallback text for replies.
//! - Common types, typed call-boundary errors, and result handling.

pub mod config;
pub mod prompts;
pub mod types;
