#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod game;
pub mod models;
pub mod persistence;
pub mod slack;
pub mod state;
pub mod web;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
