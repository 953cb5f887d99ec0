use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use tracing::debug;

use super::{ByteChunks, StreamTransport, TransportError};
use crate::config::Settings;

/// Production transport on top of a shared `reqwest` client and its
/// connection pool.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(settings: &Settings) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .connect_timeout(settings.request_timeout())
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn range_header(offset: u64, limit: Option<u64>) -> String {
        match limit {
            // A zero limit would make the closed range end before its start.
            Some(limit) if limit > 0 => format!("bytes={}-{}", offset, offset + limit - 1),
            _ => format!("bytes={}-", offset),
        }
    }

    /// Total length from a `Content-Range: bytes a-b/total` header.
    fn content_range_total(response: &reqwest::Response) -> Option<u64> {
        response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|v| v.parse::<u64>().ok())
    }

    fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        if !response.status().is_success() {
            return Err(TransportError::Status {
                status: response.status().as_u16(),
                url: response.url().to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl StreamTransport for HttpTransport {
    async fn probe(&self, url: &str) -> Result<(), TransportError> {
        let response = self.client.get(url).send().await?;
        debug!("probe {} -> {}", url, response.status());
        Self::check_status(response)?;
        Ok(())
    }

    async fn fetch(
        &self,
        url: &str,
        offset: u64,
        limit: Option<u64>,
    ) -> Result<ByteChunks, TransportError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "*/*")
            .header("Accept-Encoding", "identity")
            .header("Connection", "keep-alive")
            .header("Range", Self::range_header(offset, limit))
            .send()
            .await?;

        let response = Self::check_status(response)?;
        debug!(
            "opened fetch {} (offset={}, limit={:?}, len={:?})",
            url,
            offset,
            limit,
            response.content_length()
        );

        Ok(response.bytes_stream().map_err(TransportError::from).boxed())
    }

    async fn content_length(&self, url: &str) -> Result<u64, TransportError> {
        // HEAD first; some origins only report length on ranged GETs.
        let head = self.client.head(url).send().await?;
        if head.status().is_success() {
            if let Some(len) = head.content_length() {
                return Ok(len);
            }
        }

        let response = self
            .client
            .get(url)
            .header("Range", "bytes=0-0")
            .send()
            .await?;
        let response = Self::check_status(response)?;

        Self::content_range_total(&response)
            .ok_or_else(|| TransportError::Invalid(format!("no content length for {url}")))
    }

    async fn fetch_text(&self, url: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/x-mpegURL, */*")
            .send()
            .await?;
        let response = Self::check_status(response)?;
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::HttpTransport;

    #[test]
    fn range_header_is_inclusive_and_open_ended_without_limit() {
        assert_eq!(HttpTransport::range_header(0, None), "bytes=0-");
        assert_eq!(HttpTransport::range_header(5, Some(10)), "bytes=5-14");
        assert_eq!(HttpTransport::range_header(7, Some(1)), "bytes=7-7");
        assert_eq!(HttpTransport::range_header(7, Some(0)), "bytes=7-");
    }
}
