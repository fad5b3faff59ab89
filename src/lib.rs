//! Client library for firing application notifications at a remote collector service
//!  without blocking the caller.
//!
//! ## Design goals
//!
//! * Sending a message must never slow down or crash the sending application
//!   * builder mutation and validation run synchronously on the caller's thread; the
//!     actual network call runs as an independent task on the client's runtime
//!   * delivery is best-effort: transport and call failures are logged and swallowed,
//!     never raised to the call site. `send()` returning `Ok` means "a delivery attempt
//!     will be made", nothing more
//! * Messages are built through an immutable, chainable [Request] builder - every mutator
//!   returns a new value, so a partially-built request can be retained and branched from
//!   safely
//! * The collector is reachable over two wire variants, selected by the configured
//!   [Endpoint]: a binary-framed protocol over raw TCP, and a JSON-framed protocol over
//!   HTTP. A fresh connection is resolved per dispatch and released in the same unit of
//!   work - no pooling, no locking, at the cost of one connect per message
//! * Client code is insulated from the wire schema: it names a [Priority], and the
//!   mapping to the wire-level severity lives in exactly one place
//! * Delivery can be disabled wholesale by swapping in [Courier::no_op], which accepts
//!   the full API and does nothing
//!
//! ```no_run
//! # async fn example() -> courier::Result<()> {
//! use courier::{Courier, Priority};
//!
//! let courier = Courier::create("token-1234")?;
//!
//! courier.begin()
//!     .titled("Deployment")?
//!     .with_body_args("v{} deployed", &[&"1.2.3"])
//!     .with_priority(Priority::Medium)
//!     .send()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod endpoint;
pub mod error;
pub mod host_info;
pub mod priority;
pub mod request;
pub mod transport;
pub mod wire;

pub use client::{Courier, CourierBuilder};
pub use endpoint::{Endpoint, EndpointSource, FixedEndpoint};
pub use error::{CourierError, Result};
pub use host_info::{HostInfo, SystemHostInfo};
pub use priority::Priority;
pub use request::Request;

#[cfg(test)]
mod test {
    use tracing::Level;

    #[ctor::ctor]
    fn init_test_logging() {
        tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .try_init()
            .ok();
    }
}
