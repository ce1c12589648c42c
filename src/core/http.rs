use reqwest::{
    blocking::Client,
    header::{
        HeaderMap,
        HeaderValue,
        USER_AGENT,
    },
};

use super::{
    config::ConnectionConfig,
    errors::AnkiflagError,
};

pub fn http_client(config: &ConnectionConfig) -> Result<Client, AnkiflagError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("ankiflag/", env!("CARGO_PKG_VERSION"), " (+reqwest)")),
    );

    Ok(Client::builder().timeout(config.timeout()).default_headers(headers).build()?)
}
