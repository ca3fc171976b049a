//! HTTP API for routerctl.
//!
//! Exposes firewall, DHCP and routing control of the host as JSON endpoints
//! under `/api`.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod routes;
pub mod validate;
