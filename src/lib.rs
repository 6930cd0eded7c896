#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod buffer;
pub mod commands;
pub mod config;
pub mod payload;
pub mod responses;
pub mod retry;
pub mod session;
pub mod stack;
pub mod transaction;
pub mod transport;
pub mod wifi;

#[cfg(feature = "examples")]
pub mod example;

#[cfg(test)]
mod tests;
