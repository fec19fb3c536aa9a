// State: server configuration store, global configuration, key configuration

pub mod global_conf;
pub mod key_conf;
pub mod reloader;
pub mod serverconf;
pub mod store;
