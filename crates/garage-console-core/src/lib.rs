//! Core library for the Garage console.
//!
//! Contains the token cipher that protects stored cluster credentials, the
//! stateless session authenticator, credential-aware routing, and the
//! forwarding engine that relays console requests to Garage admin APIs.
//! This crate depends on `garage-console-storage` for the cluster registry
//! trait and knows nothing about HTTP routing or server configuration.

pub mod crypto;
pub mod error;
pub mod forward;
pub mod proxy;
pub mod routing;
pub mod session;
pub mod transport;
