#![doc = include_str!("../readme.md")]

pub mod config;
pub mod dsp;
pub mod error;

pub use error::{Error, Result};
