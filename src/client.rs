use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::runtime::Handle;
use tracing::{debug, error};

use crate::endpoint::{Endpoint, FixedEndpoint};
use crate::error::{CourierError, Result};
use crate::host_info::{HostInfo, SystemHostInfo};
use crate::priority::Priority;
use crate::request::{check_title, Request};
use crate::transport::{ConnectionProvider, TransportProvider};
use crate::wire::Notification;

/// Well-known production collector, used unless the builder overrides the endpoint.
pub const PRODUCTION_HOSTNAME: &str = "collector.courier.tech";
pub const PRODUCTION_PORT: u16 = 7010;

/// Client for sending messages to the collector service. Begin a new message with
///  [Courier::begin] and finish with [Request::send].
///
/// A `Courier` is cheap to clone and safe to share across threads: its token, host
///  metadata and transport provider are immutable after construction, and every dispatch
///  runs as an independent task on the runtime the client was built with. There is no
///  ordering guarantee between two dispatches - callers that need in-order delivery must
///  serialize their own `send()` calls onto a single-threaded runtime.
#[derive(Clone)]
pub struct Courier {
    inner: Arc<Inner>,
}

enum Inner {
    Active(ActiveClient),
    /// the null-object variant: accepts everything, sends nothing, never fails
    Disabled,
}

struct ActiveClient {
    token: String,
    metadata: HostMetadata,
    runtime: Handle,
    connections: Arc<dyn ConnectionProvider>,
}

/// Host metadata attached to every message, resolved once at client construction.
struct HostMetadata {
    hostname: String,
    device_name: String,
    operating_system: String,
    ipv4_address: String,
}

impl HostMetadata {
    fn resolve(host_info: &dyn HostInfo) -> HostMetadata {
        HostMetadata {
            hostname: host_info.hostname(),
            device_name: host_info.device_name(),
            operating_system: host_info.operating_system(),
            ipv4_address: host_info.ipv4_address(),
        }
    }
}

impl Courier {
    /// Create a client for the production collector with the given application token,
    ///  running its dispatches on the ambient tokio runtime.
    pub fn create(application_token: impl Into<String>) -> Result<Courier> {
        Courier::builder()
            .with_application_token(application_token)
            .build()
    }

    /// A client that accepts all calls and discards them - a drop-in switch for disabling
    ///  delivery without changing call sites. Never validates, never fails, never touches
    ///  the network.
    pub fn no_op() -> Courier {
        Courier { inner: Arc::new(Inner::Disabled) }
    }

    pub fn builder() -> CourierBuilder {
        CourierBuilder::new()
    }

    /// Begin a new message, seeded with an empty title and body and [Priority::Low].
    pub fn begin(&self) -> Request {
        Request::initial(self.clone())
    }

    pub fn send_low_priority(&self, title: &str) -> Result<()> {
        self.send_message(Priority::Low, title, "")
    }

    pub fn send_medium_priority(&self, title: &str) -> Result<()> {
        self.send_message(Priority::Medium, title, "")
    }

    pub fn send_high_priority(&self, title: &str) -> Result<()> {
        self.send_message(Priority::High, title, "")
    }

    /// Sugar over `begin()...send()` for the common one-liner call sites.
    pub fn send_message(&self, priority: Priority, title: &str, body: &str) -> Result<()> {
        self.begin()
            .with_priority(priority)
            .titled(title)?
            .with_body(body)
            .send()
    }

    pub(crate) fn is_active(&self) -> bool {
        matches!(*self.inner, Inner::Active(_))
    }

    pub(crate) fn dispatch(&self, request: &Request) -> Result<()> {
        match &*self.inner {
            Inner::Disabled => Ok(()),
            Inner::Active(client) => client.dispatch(request),
        }
    }
}

impl Debug for Courier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &*self.inner {
            Inner::Active(client) => write!(f, "Courier{{host:{:?}}}", client.metadata.hostname),
            Inner::Disabled => write!(f, "Courier{{no-op}}"),
        }
    }
}

impl ActiveClient {
    /// Merge the builder's fields with the client-held metadata and the current time,
    ///  then hand the finished message to the runtime. The caller never blocks on
    ///  network I/O - this returns as soon as the dispatch task is submitted.
    fn dispatch(&self, request: &Request) -> Result<()> {
        check_title(request.title())?;

        let notification = Notification {
            application_token: self.token.clone(),
            title: request.title().to_string(),
            body: request.body().to_string(),
            severity: request.priority().to_wire(),
            timestamp_millis: epoch_millis(),
            hostname: self.metadata.hostname.clone(),
            device_name: self.metadata.device_name.clone(),
            operating_system: self.metadata.operating_system.clone(),
            ipv4_address: self.metadata.ipv4_address.clone(),
        };

        let connections = Arc::clone(&self.connections);
        self.runtime.spawn(async move {
            deliver(connections, notification).await;
        });

        Ok(())
    }
}

/// The asynchronous unit of work behind every dispatch: resolve a fresh connection, make
///  the call, release the connection. All failures end here, logged - delivery is
///  best-effort, and a failed message must never take the sending application down
///  with it.
async fn deliver(connections: Arc<dyn ConnectionProvider>, notification: Notification) {
    let mut connection = match connections.resolve().await {
        Ok(connection) => connection,
        Err(e) => {
            error!("could not reach the collector service: {}", e);
            return;
        }
    };

    match connection.send_notification(&notification).await {
        Ok(()) => debug!("delivered {:?} to the collector service", notification),
        Err(e) => error!("failed to deliver {:?}: {}", notification, e),
    }

    connection.close().await;
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since_epoch| since_epoch.as_millis() as u64)
        .unwrap_or(0)
}

/// Step-by-step construction of a [Courier], validated when [CourierBuilder::build] is
///  called.
pub struct CourierBuilder {
    application_token: String,
    endpoint: Endpoint,
    runtime: Option<Handle>,
    host_info: Box<dyn HostInfo>,
    connections: Option<Arc<dyn ConnectionProvider>>,
}

impl CourierBuilder {
    fn new() -> CourierBuilder {
        CourierBuilder {
            application_token: String::new(),
            endpoint: Endpoint::Tcp {
                hostname: PRODUCTION_HOSTNAME.to_string(),
                port: PRODUCTION_PORT,
            },
            runtime: None,
            host_info: Box::new(SystemHostInfo),
            connections: None,
        }
    }

    /// The unique application token issued by the collector service.
    pub fn with_application_token(mut self, application_token: impl Into<String>) -> CourierBuilder {
        self.application_token = application_token.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> CourierBuilder {
        self.endpoint = endpoint;
        self
    }

    /// The runtime dispatch tasks are spawned on. Defaults to the ambient runtime of the
    ///  context that calls [CourierBuilder::build].
    pub fn with_runtime(mut self, runtime: Handle) -> CourierBuilder {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_host_info(mut self, host_info: impl HostInfo + 'static) -> CourierBuilder {
        self.host_info = Box::new(host_info);
        self
    }

    /// Replace the whole transport layer. This is how tests mock the network away; it
    ///  also supersedes any configured endpoint.
    pub fn with_connection_provider(mut self, connections: Arc<dyn ConnectionProvider>) -> CourierBuilder {
        self.connections = Some(connections);
        self
    }

    pub fn build(self) -> Result<Courier> {
        if self.application_token.is_empty() {
            return Err(CourierError::configuration("application token is missing"));
        }

        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current()
                .map_err(|_| CourierError::configuration("no tokio runtime available: build inside an async context or pass one with `with_runtime`"))?,
        };

        let connections: Arc<dyn ConnectionProvider> = match self.connections {
            Some(connections) => connections,
            None => Arc::new(TransportProvider::new(Arc::new(FixedEndpoint::new(self.endpoint)))?),
        };

        let metadata = HostMetadata::resolve(self.host_info.as_ref());

        Ok(Courier {
            inner: Arc::new(Inner::Active(ActiveClient {
                token: self.application_token,
                metadata,
                runtime,
                connections,
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;
    use crate::transport::MockConnectionProvider;
    use crate::wire::{NotificationService, Severity};

    #[derive(Debug, PartialEq)]
    enum Event {
        Sent(Notification),
        Closed,
    }

    struct RecordingService {
        events: mpsc::UnboundedSender<Event>,
    }

    #[async_trait]
    impl NotificationService for RecordingService {
        async fn send_notification(&mut self, notification: &Notification) -> Result<()> {
            self.events.send(Event::Sent(notification.clone())).unwrap();
            Ok(())
        }

        async fn close(&mut self) {
            self.events.send(Event::Closed).unwrap();
        }
    }

    fn recording_courier() -> (Courier, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut provider = MockConnectionProvider::new();
        provider.expect_resolve()
            .returning(move || {
                let events = tx.clone();
                Ok(Box::new(RecordingService { events }))
            });

        let courier = Courier::builder()
            .with_application_token("token-1234")
            .with_connection_provider(Arc::new(provider))
            .build()
            .unwrap();

        (courier, rx)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
        timeout(Duration::from_secs(5), rx.recv()).await
            .expect("no dispatch happened")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn test_end_to_end_dispatch() {
        let (courier, mut rx) = recording_courier();

        courier.begin()
            .titled("Deploy").unwrap()
            .with_body_args("v{} deployed", &[&"1.2.3"])
            .with_priority(Priority::High)
            .send()
            .unwrap();

        let Event::Sent(notification) = next_event(&mut rx).await else {
            panic!("expected the message to be sent before the connection is closed");
        };

        assert_eq!(notification.application_token, "token-1234");
        assert_eq!(notification.title, "Deploy");
        assert_eq!(notification.body, "v1.2.3 deployed");
        assert_eq!(notification.severity, Severity::High);
        assert!(epoch_millis() - notification.timestamp_millis < 5_000);

        // the connection is released in the same unit of work
        assert_eq!(next_event(&mut rx).await, Event::Closed);
    }

    #[tokio::test]
    async fn test_convenience_send_routes_through_the_builder() {
        let (courier, mut rx) = recording_courier();

        courier.send_message(Priority::Medium, "Nightly import", "4081 rows").unwrap();

        let Event::Sent(notification) = next_event(&mut rx).await else {
            panic!("expected a sent message");
        };
        assert_eq!(notification.title, "Nightly import");
        assert_eq!(notification.body, "4081 rows");
        assert_eq!(notification.severity, Severity::Medium);
    }

    #[tokio::test]
    async fn test_convenience_send_validates_the_title() {
        let (courier, _rx) = recording_courier();

        let result = courier.send_high_priority("");
        assert!(matches!(result, Err(CourierError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_connection_is_released_even_when_the_call_fails() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        struct FailingService {
            events: mpsc::UnboundedSender<Event>,
        }
        #[async_trait]
        impl NotificationService for FailingService {
            async fn send_notification(&mut self, _notification: &Notification) -> Result<()> {
                Err(CourierError::operation_failed("collector rejected the message: status 3"))
            }
            async fn close(&mut self) {
                self.events.send(Event::Closed).unwrap();
            }
        }

        let mut provider = MockConnectionProvider::new();
        provider.expect_resolve()
            .returning(move || Ok(Box::new(FailingService { events: tx.clone() })));

        let courier = Courier::builder()
            .with_application_token("token-1234")
            .with_connection_provider(Arc::new(provider))
            .build()
            .unwrap();

        // the failure is logged and swallowed - send() itself succeeds
        courier.send_low_priority("Flaky build").unwrap();

        assert_eq!(next_event(&mut rx).await, Event::Closed);
    }

    #[tokio::test]
    async fn test_build_rejects_missing_token() {
        let result = Courier::builder().build();
        assert!(matches!(result, Err(CourierError::Configuration { .. })));
    }

    #[test]
    fn test_build_outside_a_runtime_fails_fast() {
        let result = Courier::builder()
            .with_application_token("token-1234")
            .build();

        match result {
            Err(CourierError::Configuration { message }) => assert!(message.contains("runtime")),
            other => panic!("expected a configuration error, got {:?}", other.map(|_| ())),
        }
    }
}
