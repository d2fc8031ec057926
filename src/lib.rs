//! zipweather library
//!
//! A client-side weather cache coordinated with a persisted list of tracked
//! zip codes: a timestamped response cache over an opaque key-value store, a
//! caching gateway interposed on outbound requests, and an aggregator that
//! keeps an observable conditions collection in sync with the tracked list.

pub mod cache;
pub mod cli;
pub mod conditions;
pub mod config;
pub mod gateway;
pub mod locations;
pub mod models;
pub mod store;
pub mod transport;
