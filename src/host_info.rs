use std::net::UdpSocket;

use sysinfo::System;
use tracing::warn;

/// Source of the host metadata attached to every message. Pluggable so embedding
///  applications (and tests) can report whatever identity they want; resolved once at
///  client construction, not per message.
pub trait HostInfo: Send + Sync {
    fn hostname(&self) -> String;

    /// The device name reported to the collector. Defaults to the hostname.
    fn device_name(&self) -> String {
        self.hostname()
    }

    fn operating_system(&self) -> String;

    fn ipv4_address(&self) -> String;
}

/// Default [HostInfo] backed by the operating system. Lookups that fail degrade to an
///  empty string with a warning - host metadata is never worth failing a message over.
pub struct SystemHostInfo;

impl HostInfo for SystemHostInfo {
    fn hostname(&self) -> String {
        match System::host_name() {
            Some(hostname) => hostname,
            None => {
                warn!("could not determine hostname");
                String::new()
            }
        }
    }

    fn operating_system(&self) -> String {
        System::name().unwrap_or_default()
    }

    fn ipv4_address(&self) -> String {
        match local_ipv4() {
            Ok(address) => address,
            Err(e) => {
                warn!("could not determine IPv4 address: {}", e);
                String::new()
            }
        }
    }
}

/// Connecting a UDP socket sends nothing, but it does make the OS pick the outbound
///  interface - and with it, the address this host is reachable under.
fn local_ipv4() -> std::io::Result<String> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))?;
    socket.connect(("198.51.100.1", 80))?;
    Ok(socket.local_addr()?.ip().to_string())
}
