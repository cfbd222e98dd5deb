//! streamserver library crate.
//!
//! Tracks which channels followed by one Twitch account are live (plus
//! everything live on strims.gg) and serves the latest snapshot to local
//! clients. The binary wires these modules together; they are exposed here
//! for integration testing and for clients decoding the snapshot.

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod monitor;
pub mod panic_hook;
pub mod scheduler;
pub mod utils;

pub use error::{Error, Result};
