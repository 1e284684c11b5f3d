//! Integration test utilities for the beacon gateway
//!
//! This crate provides helpers for running end-to-end tests against a live gateway over
//! real WebSocket and HTTP clients.

pub mod helpers;

pub use helpers::*;
