use std::fmt::{Debug, Formatter};

use url::Url;

use crate::error::{CourierError, Result};

/// Tagged description of how to reach the collector service. Exactly one variant is set,
///  and both variants are validated at construction time - an `Endpoint` value that
///  exists is well-formed.
#[derive(Clone, Eq, PartialEq)]
pub enum Endpoint {
    /// A raw TCP endpoint speaking the binary-framed protocol.
    Tcp { hostname: String, port: u16 },

    /// An HTTP endpoint speaking the JSON-framed protocol.
    Http { url: Url },
}

impl Endpoint {
    pub fn tcp(hostname: impl Into<String>, port: u16) -> Result<Endpoint> {
        let hostname = hostname.into();
        if hostname.is_empty() {
            return Err(CourierError::validation("hostname cannot be empty"));
        }
        if port == 0 {
            return Err(CourierError::validation("port cannot be 0"));
        }

        Ok(Endpoint::Tcp { hostname, port })
    }

    pub fn http(url: impl AsRef<str>) -> Result<Endpoint> {
        let url = Url::parse(url.as_ref())
            .map_err(|e| CourierError::validation(format!("invalid URL {:?}: {}", url.as_ref(), e)))?;

        Ok(Endpoint::Http { url })
    }
}

impl Debug for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Tcp { hostname, port } => write!(f, "tcp://{}:{}", hostname, port),
            Endpoint::Http { url } => write!(f, "{}", url),
        }
    }
}

/// Pluggable source of the current endpoint. The transport provider re-queries this on
///  every resolution, so the same provider instance can be pointed at different live
///  endpoints over its lifetime.
pub trait EndpointSource: Send + Sync + 'static {
    fn endpoint(&self) -> Option<Endpoint>;
}

/// An [EndpointSource] that always yields the same endpoint.
pub struct FixedEndpoint(Endpoint);

impl FixedEndpoint {
    pub fn new(endpoint: Endpoint) -> FixedEndpoint {
        FixedEndpoint(endpoint)
    }
}

impl EndpointSource for FixedEndpoint {
    fn endpoint(&self) -> Option<Endpoint> {
        Some(self.0.clone())
    }
}
