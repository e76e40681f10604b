//! Feed transport shared by the environmental sources.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::updater::error::{ConfigError, SourceError};

/// HTTP client sending `header` with every request.
pub(super) fn http_client(header: Option<(&str, &str)>) -> Result<reqwest::Client, ConfigError> {
    let mut headers = HeaderMap::new();
    if let Some((name, value)) = header {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(name.to_string()))?;
        let value =
            HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader(value.to_string()))?;
        headers.insert(name, value);
    }
    Ok(reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(30))
        .build()?)
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Body of `url`. URLs that are not http(s) are read as local paths, with an
/// optional `file://` prefix.
pub(super) async fn fetch(http: &reqwest::Client, url: &str) -> Result<Vec<u8>, SourceError> {
    if is_remote(url) {
        let response = http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                message: body,
            });
        }
        return Ok(response.bytes().await?.to_vec());
    }
    let path = url.strip_prefix("file://").unwrap_or(url);
    tokio::fs::read(path).await.map_err(|source| SourceError::Io {
        path: path.to_string(),
        source,
    })
}
