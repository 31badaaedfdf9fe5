//! Header construction for upstream requests
//!
//! Client headers are never forwarded; the upstream only ever sees the fixed
//! set built here.

use reqwest::header::{
    HeaderMap, HeaderValue, InvalidHeaderValue, AUTHORIZATION, CACHE_CONTROL, CONNECTION,
    CONTENT_TYPE,
};

/// Build the headers sent with every upstream request.
///
/// `Authorization` is only present when a token is configured.
pub fn build_upstream_headers(token: Option<&str>) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::new();

    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}
