pub mod test_serverconf_loader;
