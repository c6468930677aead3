//! Client code for shltr.
//!
//! This crate provides the HTTP origin implementation used by the gateway
//! to fill the response store from the live network.

pub mod fetch;

pub use fetch::{HttpOrigin, OriginConfig};
