//! Shared models and configuration for the GFS session client.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod models;
