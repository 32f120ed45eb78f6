//! Resource size discovery

use log::{debug, info};
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::Client;

use crate::core::error::{Error, Result};

/// The remote resource being fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub url: String,
    pub total_size: u64,
}

/// Ask the server for the resource length without transferring the body
///
/// Any transport error, non-success status or missing `Content-Length` is fatal for the run.
pub async fn probe(client: &Client, url: &str) -> Result<ResourceDescriptor> {
    let unavailable = |reason: String| Error::SizeUnavailable {
        url: url.to_string(),
        reason,
    };

    let response = client
        .head(url)
        .send()
        .await
        .map_err(|e| unavailable(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(unavailable(format!("server answered {status}")));
    }

    let total_size = parse_content_length(response.headers())
        .ok_or_else(|| unavailable("no usable content-length header".to_string()))?;

    debug!("HEAD {url} -> {status}, content-length {total_size}");
    info!("File size: {total_size} bytes");

    Ok(ResourceDescriptor {
        url: url.to_string(),
        total_size,
    })
}

fn parse_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_content_length() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_content_length(&headers), None);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1024"));
        assert_eq!(parse_content_length(&headers), Some(1024));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("-5"));
        assert_eq!(parse_content_length(&headers), None);
    }

    #[tokio::test]
    async fn test_probe_reads_content_length() {
        let mock_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/video.mp4"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-length", "4096"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = format!("{}/video.mp4", mock_server.uri());
        let resource = probe(&Client::new(), &url).await.unwrap();

        assert_eq!(resource.total_size, 4096);
        assert_eq!(resource.url, url);
    }

    #[tokio::test]
    async fn test_probe_non_success_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/missing.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let url = format!("{}/missing.mp4", mock_server.uri());
        let err = probe(&Client::new(), &url).await.unwrap_err();

        match err {
            Error::SizeUnavailable { reason, .. } => assert!(reason.contains("404")),
            other => panic!("Expected SizeUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_probe_against_dropped_server() {
        // The port is either closed or handed back to wiremock's pool with no mocks mounted
        let uri = {
            let mock_server = MockServer::start().await;
            mock_server.uri()
        };

        let err = probe(&Client::new(), &format!("{uri}/file.bin"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SizeUnavailable { .. }));
    }
}
