#![cfg_attr(not(test), no_std)]

//! # light-sensor-node
//! ## Light sensor telemetry over an XBee link
//!
//! Features:
//! - Raw light readings sent to the network coordinator every minute
//! - Optional alert text when the reading is above a threshold
//! - Four program variants selected at compile time
//! - XBee API-mode driver over any `embedded-io` serial port

mod logging;

pub mod alert;
pub mod config;
pub mod error;
pub mod radio;
pub mod sample_loop;
pub mod sensors;
pub mod timer;
pub mod xbee;

pub use error::Error;
