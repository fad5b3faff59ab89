use std::fmt::{Debug, Formatter};

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::{Buf, BufMut, BytesMut};
use bytes_varint::{VarIntSupport, VarIntSupportMut};
use crc::Crc;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Wire-level severity of a message. This is what actually crosses the wire - client code
///  uses [crate::Priority] and never touches this directly.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Severity {
    Low = 1,
    Medium = 2,
    High = 3,
}

/// The fully-populated value sent on every dispatch: the builder's fields merged with
///  client-held metadata. Built fresh per `send()` call and never mutated afterwards.
///
/// Binary frame layout (all numbers in network byte order):
/// ```ascii
/// 0:  CRC32 checksum for the rest of the frame, starting after the checksum: u32
/// 4:  protocol version (u8)
/// 5:  severity (u8)
/// 6:  timestamp, milliseconds since epoch (u64)
/// 14: application token, title, body, hostname, device name, operating system name and
///      IPv4 address as varint-length-prefixed UTF-8 strings
/// ```
///
/// The JSON rendition (HTTP transport) serializes the same fields with camelCase keys.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub application_token: String,
    pub title: String,
    pub body: String,
    pub severity: Severity,
    pub timestamp_millis: u64,
    pub hostname: String,
    pub device_name: String,
    pub operating_system: String,
    pub ipv4_address: String,
}

impl Debug for Notification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // the token is a credential - keep it out of log output
        write!(f, "Notification{{title:{:?}, severity:{:?}, timestamp:{}}}", self.title, self.severity, self.timestamp_millis)
    }
}

const CRC_32: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

impl Notification {
    pub const PROTOCOL_VERSION_1: u8 = 0;

    /// Serialize into a frame, including the leading checksum.
    pub fn ser(&self, buf: &mut BytesMut) {
        let start = buf.len();
        buf.put_u32(0); // checksum placeholder, patched below

        buf.put_u8(Self::PROTOCOL_VERSION_1);
        buf.put_u8(self.severity.into());
        buf.put_u64(self.timestamp_millis);

        put_string(buf, &self.application_token);
        put_string(buf, &self.title);
        put_string(buf, &self.body);
        put_string(buf, &self.hostname);
        put_string(buf, &self.device_name);
        put_string(buf, &self.operating_system);
        put_string(buf, &self.ipv4_address);

        let checksum = CRC_32.checksum(&buf[start + 4..]);
        buf[start..start + 4].copy_from_slice(&checksum.to_be_bytes());
    }

    /// Parse a frame, verifying the checksum first.
    pub fn try_deser(frame: &[u8]) -> anyhow::Result<Notification> {
        let buf = &mut &frame[..];

        let checksum = buf.try_get_u32()?;
        let actual = CRC_32.checksum(buf);
        if actual != checksum {
            return Err(anyhow!("checksum mismatch: frame says {:08x}, calculated {:08x}", checksum, actual));
        }

        let protocol_version = buf.try_get_u8()?;
        if protocol_version != Self::PROTOCOL_VERSION_1 {
            return Err(anyhow!("unsupported protocol version {}", protocol_version));
        }

        let severity = Severity::try_from(buf.try_get_u8()?)?;
        let timestamp_millis = buf.try_get_u64()?;

        Ok(Notification {
            severity,
            timestamp_millis,
            application_token: try_get_string(buf)?,
            title: try_get_string(buf)?,
            body: try_get_string(buf)?,
            hostname: try_get_string(buf)?,
            device_name: try_get_string(buf)?,
            operating_system: try_get_string(buf)?,
            ipv4_address: try_get_string(buf)?,
        })
    }
}

fn put_string(buf: &mut impl BufMut, s: &str) {
    buf.put_u32_varint(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

fn try_get_string(buf: &mut impl Buf) -> anyhow::Result<String> {
    let len = buf.try_get_u32_varint()? as usize;
    if buf.remaining() < len {
        return Err(anyhow!("string length {} exceeds remaining frame size {}", len, buf.remaining()));
    }
    Ok(String::from_utf8(buf.copy_to_bytes(len).to_vec())?)
}

/// The RPC contract consumed by the dispatcher: a single operation that sends one
///  notification and may fail. Implementations wrap one live wire connection, which is
///  never shared across concurrent dispatches.
#[async_trait]
pub trait NotificationService: Send + 'static {
    async fn send_notification(&mut self, notification: &Notification) -> Result<()>;

    /// Best-effort release of the underlying connection. Never fails.
    async fn close(&mut self);
}

#[cfg(test)]
pub fn test_notification() -> Notification {
    Notification {
        application_token: "token-1234".to_string(),
        title: "Deployment".to_string(),
        body: "v1.2.3 deployed".to_string(),
        severity: Severity::Medium,
        timestamp_millis: 1_700_000_000_000,
        hostname: "build-07".to_string(),
        device_name: "build-07".to_string(),
        operating_system: "Linux".to_string(),
        ipv4_address: "10.0.0.7".to_string(),
    }
}
