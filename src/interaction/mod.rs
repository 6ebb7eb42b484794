//! HTTP handlers for the Messenger Platform webhook contract.
//!
//! This module provides:
//! - The verification handshake used when subscribing the endpoint
//! - Event reception, payload parsing, and dispatch to the reply pipeline
//! - A liveness check

pub mod health;
pub mod verification;
pub mod webhook;
