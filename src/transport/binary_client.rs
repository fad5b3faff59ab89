use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{CourierError, Result};
use crate::wire::{Notification, NotificationService};

/// Bound on establishing the TCP connection. Connect failures inside this window are
///  reported promptly; the timeout keeps an unresponsive collector from parking dispatch
///  workers forever.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(45);

/// status byte the collector answers for a frame it accepted
const STATUS_ACCEPTED: u8 = 0;

/// A connection to the collector speaking the binary-framed protocol: each call writes a
///  length-prefixed [Notification] frame and reads back a single status byte.
pub struct BinaryClient {
    stream: TcpStream,
}

impl BinaryClient {
    pub async fn connect(hostname: &str, port: u16) -> Result<BinaryClient> {
        match timeout(CONNECT_TIMEOUT, TcpStream::connect((hostname, port))).await {
            Ok(Ok(stream)) => Ok(BinaryClient { stream }),
            Ok(Err(e)) => Err(CourierError::network(format!("failed to connect to {}:{}", hostname, port), e)),
            Err(_) => Err(CourierError::network_without_cause(
                format!("connecting to {}:{} timed out after {:?}", hostname, port, CONNECT_TIMEOUT),
            )),
        }
    }
}

fn call_failed(e: std::io::Error) -> CourierError {
    CourierError::operation_failed(format!("call to the collector failed: {}", e))
}

#[async_trait]
impl NotificationService for BinaryClient {
    async fn send_notification(&mut self, notification: &Notification) -> Result<()> {
        let mut frame = BytesMut::new();
        notification.ser(&mut frame);

        self.stream.write_u32(frame.len() as u32).await.map_err(call_failed)?;
        self.stream.write_all(&frame).await.map_err(call_failed)?;
        self.stream.flush().await.map_err(call_failed)?;

        let status = self.stream.read_u8().await.map_err(call_failed)?;
        if status != STATUS_ACCEPTED {
            return Err(CourierError::operation_failed(format!("collector rejected the message: status {}", status)));
        }

        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!("error shutting down collector connection: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    use super::*;
    use crate::wire::test_notification;

    /// Accepts one connection, decodes one frame and answers the given status byte.
    async fn one_shot_collector(status: u8) -> (u16, mpsc::UnboundedReceiver<Notification>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            let frame_len = stream.read_u32().await.unwrap();
            let mut frame = vec![0u8; frame_len as usize];
            stream.read_exact(&mut frame).await.unwrap();

            tx.send(Notification::try_deser(&frame).unwrap()).unwrap();
            stream.write_u8(status).await.unwrap();
        });

        (port, rx)
    }

    #[tokio::test]
    async fn test_send_notification() {
        let (port, mut rx) = one_shot_collector(STATUS_ACCEPTED).await;
        let notification = test_notification();

        let mut client = BinaryClient::connect("127.0.0.1", port).await.unwrap();
        client.send_notification(&notification).await.unwrap();
        client.close().await;

        assert_eq!(rx.recv().await, Some(notification));
    }

    #[tokio::test]
    async fn test_rejected_notification_fails_the_call() {
        let (port, _rx) = one_shot_collector(3).await;

        let mut client = BinaryClient::connect("127.0.0.1", port).await.unwrap();
        let result = client.send_notification(&test_notification()).await;

        assert!(matches!(result, Err(CourierError::OperationFailed { .. })));
    }

    #[tokio::test]
    async fn test_connect_failure_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = BinaryClient::connect("127.0.0.1", port).await;
        assert!(matches!(result, Err(CourierError::Network { .. })));
    }
}
