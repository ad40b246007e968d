pub(crate) mod errors;
pub(crate) mod private_file;

#[cfg(test)]
pub(crate) mod mock_http;
