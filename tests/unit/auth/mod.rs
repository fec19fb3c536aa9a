pub mod test_api_key;
pub mod test_principals;
