use async_trait::async_trait;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use url::Url;

use crate::error::{CourierError, Result};
use crate::wire::{Notification, NotificationService};

/// A connection to the collector speaking the JSON-framed protocol: each call POSTs one
///  [Notification] as a JSON document and treats any non-success status as a failed call.
pub struct HttpClient {
    client: Client<HttpConnector, Full<Bytes>>,
    uri: Uri,
}

impl HttpClient {
    /// Validates the URL and sets up the HTTP transport. No network traffic happens here;
    ///  the connection is opened lazily by the first call.
    pub fn new(url: &Url) -> Result<HttpClient> {
        if url.scheme() != "http" {
            return Err(CourierError::network_without_cause(
                format!("unsupported URL scheme {:?} in {} - the JSON transport speaks plain http", url.scheme(), url),
            ));
        }

        let uri: Uri = url.as_str().parse()
            .map_err(|e| CourierError::network(format!("URL {} is not a valid request target", url), e))?;

        Ok(HttpClient {
            client: Client::builder(TokioExecutor::new()).build_http(),
            uri,
        })
    }
}

#[async_trait]
impl NotificationService for HttpClient {
    async fn send_notification(&mut self, notification: &Notification) -> Result<()> {
        let body = serde_json::to_vec(notification)
            .map_err(|e| CourierError::operation_failed(format!("failed to serialize notification: {}", e)))?;

        let request = Request::post(self.uri.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| CourierError::operation_failed(format!("failed to build collector request: {}", e)))?;

        let response = self.client.request(request).await
            .map_err(|e| CourierError::operation_failed(format!("call to the collector failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(CourierError::operation_failed(format!("collector rejected the message: HTTP {}", response.status())));
        }

        Ok(())
    }

    async fn close(&mut self) {
        // nothing to release: hyper tears the pooled connection down when the client is dropped
    }
}
