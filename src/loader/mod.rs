// YAML loaders for startup configuration

pub mod principal_loader;
pub mod serverconf_loader;
