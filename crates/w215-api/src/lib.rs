// w215-api: Async Rust client for the D-Link DSP-W215 smart plug (HNAP)
//
// The plug speaks HNAP: SOAP 1.1 over plain HTTP with a two-step HMAC-MD5
// challenge-response handshake and a per-request signature header. The
// `plug` module is the high-level surface; everything below it implements
// the protocol mechanics.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod plug;
pub mod signing;
pub mod soap;
pub mod stats;

pub use client::HnapClient;
pub use config::PlugConfig;
pub use error::Error;
pub use plug::{SmartPlug, SwitchState};
