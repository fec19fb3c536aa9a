// Library root for the security server

pub mod api;
pub mod auth;
pub mod config;
pub mod core;
pub mod loader;
pub mod metrics;
pub mod proxy;
pub mod services;
pub mod state;
pub mod wsdl;
