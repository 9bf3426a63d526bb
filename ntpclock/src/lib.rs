//! Rust NTP clock
//!
//! # Overview
//!
//! This crate keeps a wall clock on devices that only have a free-running millisecond
//! counter. It periodically queries a NTP server, validates the response and
//! extrapolates the current time from the last accepted server timestamp:
//! - [`NtpClient::update`] is meant to be called from the main loop; it only contacts
//!   the server once the update interval elapsed
//! - [`NtpClient::current_epoch_seconds`], [`NtpClient::calendar_date`],
//!   [`NtpClient::formatted_date`] and friends project the synchronized time without
//!   touching the network
//!
//! # Usage
//!
//! Put this in your `Cargo.toml`:
//! ```cargo
//! [dependencies]
//! ntpclock = "0.1"
//! ```
//!
//! ## Features
//!
//! `ntpclock` supports several features:
//! - `std`: includes functionality that depends on the standard library ([`StdClock`])
//! - `log`: enables library debug output during execution
//! - `defmt`: same as `log`, through `defmt` for embedded targets
//!
//! # Details
//!
//! As `ntpclock` supports `no_std` environment, it was decided to provide a pair of
//! traits to implement for the platform:
//! - [`NtpTransport`] trait should be implemented for the UDP stack so the client is
//!   able to send a request and poll for the response
//! - [`MonotonicClock`] trait should be implemented for the tick counter of the
//!   platform, it also provides the delay between two polls
//!
//! For `std` environments the `ntpclock-net-std` crate implements [`NtpTransport`]
//! for `std::net::UdpSocket`.
//!
//! Each exchange blocks the caller for at most
//! [`ClientConfig::exchange_timeout_millis`] (one second by default) and never
//! discards a previously accepted time.
//!
//! Only NTP era 0 is supported: timestamps are interpreted as seconds since
//! 1900-01-01 until the 32-bit seconds counter wraps on 2036-02-07.
#![cfg_attr(not(feature = "std"), no_std)]

pub mod config;
pub mod packet;
pub mod projection;

mod client;
mod log;
#[cfg(test)]
mod testing;
mod types;

pub use crate::client::NtpClient;
pub use crate::config::ClientConfig;
pub use crate::packet::NtpPacket;
pub use crate::projection::{ClockTime, Date, IsoDateTime};
pub use crate::types::*;
