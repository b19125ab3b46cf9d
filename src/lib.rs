//! Ratewarden - Fixed-Window Request Throttling
//!
//! This crate implements per-client, per-endpoint request throttling for
//! web applications. Requests are counted against a configured limit inside
//! fixed time windows, with counters kept in a persistent store and an
//! optional webhook alerted when a client goes over its limit.
//!
//! The host framework calls [`throttle::Guard::evaluate`] before a protected
//! handler runs and maps a denied decision to an HTTP 429 response. The crate
//! never constructs HTTP responses itself.

pub mod config;
pub mod error;
pub mod notify;
pub mod store;
pub mod throttle;
