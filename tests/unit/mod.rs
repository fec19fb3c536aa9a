// Unit tests organized by module

#[path = "../common/mod.rs"]
mod common;

pub mod auth;
pub mod loader;
pub mod services;
