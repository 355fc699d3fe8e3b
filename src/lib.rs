#![forbid(unsafe_code)]

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod download;
pub mod edition;
mod error;
pub mod fetch;
pub mod formats;
pub mod logging;
pub mod planner;
pub mod report;
pub mod toc;
pub mod urls;

pub use error::{Error, Result};
