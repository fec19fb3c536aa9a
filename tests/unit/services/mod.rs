pub mod test_warnings;
