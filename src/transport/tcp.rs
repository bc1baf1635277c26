//! Tokio TCP transport.
//!
//! Each connect spawns one I/O task on the runtime. The synchronous
//! [`Transport`] methods talk to that task over channels: writes go through
//! a bounded queue, inbound bytes and lifecycle changes come back as
//! [`TransportEvent`]s that `poll` drains without blocking.

// ============================================================================
// Imports
// ============================================================================

use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::{Endpoint, Transport, TransportEvent};

// ============================================================================
// Constants
// ============================================================================

/// Outbound writes that may queue before `write` reports the queue full.
const WRITE_QUEUE_DEPTH: usize = 16;

/// Size of each socket read.
const READ_CHUNK_SIZE: usize = 2048;

// ============================================================================
// TcpTransport
// ============================================================================

/// TCP stream driven by a task on a tokio runtime.
pub struct TcpTransport {
    runtime: Handle,
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    writer: Option<mpsc::Sender<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
}

impl TcpTransport {
    /// Creates a transport spawning its I/O on `runtime`.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            events: None,
            writer: None,
            task: None,
        }
    }

    /// Creates a transport on the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when called outside a tokio runtime.
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| Error::config(format!("TcpTransport requires a tokio runtime: {e}")))
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, endpoint: &Endpoint) -> Result<()> {
        self.close()?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (write_tx, write_rx) = mpsc::channel(WRITE_QUEUE_DEPTH);

        let task = self
            .runtime
            .spawn(run_io_loop(endpoint.clone(), write_rx, event_tx));

        self.events = Some(event_rx);
        self.writer = Some(write_tx);
        self.task = Some(task);

        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let writer = self.writer.as_ref().ok_or(Error::ConnectionClosed)?;

        writer.try_send(bytes.to_vec()).map_err(|e| match e {
            TrySendError::Full(_) => Error::write_failed("write queue full"),
            TrySendError::Closed(_) => Error::ConnectionClosed,
        })
    }

    fn close(&mut self) -> Result<()> {
        self.writer = None;
        self.events = None;
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("TCP I/O task stopped");
        }
        Ok(())
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.events.as_mut()?.try_recv().ok()
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ============================================================================
// I/O Task
// ============================================================================

async fn open_stream(endpoint: &Endpoint) -> io::Result<TcpStream> {
    match endpoint.socket_addr() {
        Some(addr) => TcpStream::connect(addr).await,
        None => TcpStream::connect((endpoint.host(), endpoint.port())).await,
    }
}

async fn run_io_loop(
    endpoint: Endpoint,
    mut write_rx: mpsc::Receiver<Vec<u8>>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
) {
    let stream = match open_stream(&endpoint).await {
        Ok(stream) => stream,
        Err(e) => {
            let _ = event_tx.send(TransportEvent::ConnectFailed {
                reason: e.to_string(),
            });
            return;
        }
    };

    let _ = stream.set_nodelay(true);
    if event_tx.send(TransportEvent::Connected).is_err() {
        return;
    }

    let (mut reader, mut writer) = stream.into_split();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    loop {
        tokio::select! {
            read = reader.read(&mut chunk) => {
                let event = match read {
                    Ok(0) => TransportEvent::Disconnected { reason: None },
                    Ok(n) => {
                        trace!(len = n, "TCP bytes received");
                        if event_tx.send(TransportEvent::Data(chunk[..n].to_vec())).is_err() {
                            break;
                        }
                        continue;
                    }
                    Err(e) => TransportEvent::Disconnected { reason: Some(e.to_string()) },
                };
                let _ = event_tx.send(event);
                break;
            }

            outgoing = write_rx.recv() => {
                match outgoing {
                    Some(bytes) => {
                        if let Err(e) = writer.write_all(&bytes).await {
                            let _ = event_tx.send(TransportEvent::Disconnected {
                                reason: Some(e.to_string()),
                            });
                            break;
                        }
                    }
                    None => {
                        let _ = writer.shutdown().await;
                        break;
                    }
                }
            }
        }
    }

    debug!("TCP I/O loop terminated");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use tokio::net::TcpListener;

    async fn next_event(transport: &mut TcpTransport) -> TransportEvent {
        for _ in 0..200 {
            if let Some(event) = transport.poll_event() {
                return event;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no transport event within 2s");
    }

    #[test]
    fn test_current_outside_runtime() {
        assert!(matches!(TcpTransport::current(), Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_write_before_connect() {
        let mut transport = TcpTransport::current().unwrap();
        assert!(matches!(transport.write(b"x"), Err(Error::ConnectionClosed)));
        assert!(transport.poll_event().is_none());
    }

    #[tokio::test]
    async fn test_loopback_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let endpoint = Endpoint::new("localhost", port)
            .unwrap()
            .with_address(IpAddr::V4(Ipv4Addr::LOCALHOST));

        let mut transport = TcpTransport::current().unwrap();
        transport.connect(&endpoint).unwrap();

        let (mut server, _) = listener.accept().await.unwrap();
        assert_eq!(next_event(&mut transport).await, TransportEvent::Connected);

        transport.write(b"ping").unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        server.write_all(b"pong").await.unwrap();
        let mut received = Vec::new();
        while received.len() < 4 {
            match next_event(&mut transport).await {
                TransportEvent::Data(bytes) => received.extend(bytes),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(received, b"pong");

        drop(server);
        assert_eq!(
            next_event(&mut transport).await,
            TransportEvent::Disconnected { reason: None }
        );
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let endpoint = Endpoint::new("localhost", port)
            .unwrap()
            .with_address(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let mut transport = TcpTransport::current().unwrap();
        transport.connect(&endpoint).unwrap();

        assert!(matches!(
            next_event(&mut transport).await,
            TransportEvent::ConnectFailed { .. }
        ));
    }
}
