pub mod binary_client;
pub mod http_client;

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)] use mockall::automock;
use tracing::debug;

use crate::endpoint::{Endpoint, EndpointSource};
use crate::error::{CourierError, Result};
use crate::transport::binary_client::BinaryClient;
use crate::transport::http_client::HttpClient;
use crate::wire::NotificationService;

/// This trait decouples the dispatch loop from the mechanics of establishing a wire
///  connection, and it is the seam for mocking the network away in tests.
///
/// A fresh connection is resolved per dispatch and released in the same unit of work, so
///  implementations need no pooling or locking discipline.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConnectionProvider: Send + Sync + 'static {
    async fn resolve(&self) -> Result<Box<dyn NotificationService>>;
}

/// Resolves the current [Endpoint] into a live, ready-to-use connection, selecting the
///  wire variant matching the endpoint's tag.
pub struct TransportProvider {
    endpoints: Arc<dyn EndpointSource>,
}

impl TransportProvider {
    /// The endpoint source is queried once up front: a source with nothing to say is a
    ///  configuration defect and should fail the build, not the first dispatch.
    pub fn new(endpoints: Arc<dyn EndpointSource>) -> Result<TransportProvider> {
        if endpoints.endpoint().is_none() {
            return Err(CourierError::configuration("endpoint source yields no endpoint"));
        }

        Ok(TransportProvider { endpoints })
    }
}

#[async_trait]
impl ConnectionProvider for TransportProvider {
    async fn resolve(&self) -> Result<Box<dyn NotificationService>> {
        let endpoint = self.endpoints.endpoint()
            .ok_or_else(|| CourierError::operation_failed("endpoint source no longer yields an endpoint"))?;

        debug!(?endpoint, "resolving collector connection");

        match endpoint {
            Endpoint::Tcp { hostname, port } => {
                Ok(Box::new(BinaryClient::connect(&hostname, port).await?))
            }
            Endpoint::Http { url } => {
                Ok(Box::new(HttpClient::new(&url)?))
            }
        }
    }
}
