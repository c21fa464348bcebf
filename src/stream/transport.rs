//! Byte-stream transports for the live event feed.

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt, TryStreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Url;

use crate::error::StreamError;

pub type ByteStream = BoxStream<'static, Result<Bytes, StreamError>>;

/// Opens one connection to the event feed per call.
///
/// `Ok` means the stream is open; the returned byte stream ends or errors
/// when the connection drops.
pub trait EventTransport: Send + Sync {
    fn connect(&self) -> BoxFuture<'_, Result<ByteStream, StreamError>>;

    fn describe(&self) -> String;
}

/// Streaming `GET` against an SSE endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
}

impl HttpTransport {
    /// Fails with `StreamError::TransportInit` when the URL is unusable or the
    /// client cannot be built; those failures are permanent for the session.
    pub fn new(url: &str, connect_timeout: Duration) -> Result<Self, StreamError> {
        let url = Url::parse(url).map_err(|err| StreamError::TransportInit {
            reason: format!("invalid event stream URL {:?}: {}", url, err),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(StreamError::TransportInit {
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }

        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|err| StreamError::TransportInit {
                reason: err.to_string(),
            })?;

        Ok(Self { client, url })
    }
}

impl EventTransport for HttpTransport {
    fn connect(&self) -> BoxFuture<'_, Result<ByteStream, StreamError>> {
        async move {
            let response = self
                .client
                .get(self.url.clone())
                .header(ACCEPT, "text/event-stream")
                .header(CACHE_CONTROL, "no-cache")
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(StreamError::Status {
                    status: status.as_u16(),
                });
            }

            Ok(response.bytes_stream().map_err(StreamError::from).boxed())
        }
        .boxed()
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}
