#![doc = include_str!("../README.md")]

mod error;

pub mod acq;
pub mod framing;
pub mod link;
pub mod monitor;
pub mod transport;

pub use error::{Error, Result};
