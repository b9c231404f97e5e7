//! Pass-through ingestion of externally generated pulses.
//!
//! Each datagram byte is one pulse indicator; nothing is decoded and the
//! session is never consulted.

use crate::prelude::PulseSource;
use crate::telemetry::{LogManager, MetricsRecorder};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const UDP_PULSE_PORT: u16 = 30001;

/// Enough for a 1500 byte MTU.
const RECV_BUFFER_LEN: usize = 2048;

/// Upper bound on how long a stop can go unnoticed if the wake datagram is lost.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("bind {addr} failed: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
    #[error("receiver stopped")]
    Stopped,
}

pub fn default_bind_address() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, UDP_PULSE_PORT))
}

/// Blocking UDP receiver for raw pulse bytes.
pub struct UdpPulseReceiver {
    socket: UdpSocket,
    local_addr: SocketAddr,
    stopped: Arc<AtomicBool>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

/// Cloneable handle that unblocks a pending receive from another thread.
#[derive(Clone)]
pub struct StopHandle {
    local_addr: SocketAddr,
    stopped: Arc<AtomicBool>,
    logger: LogManager,
}

impl StopHandle {
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        // A datagram to ourselves wakes the blocked recv_from.
        let target = wake_target(self.local_addr);
        let woken = UdpSocket::bind(SocketAddr::new(target.ip(), 0))
            .and_then(|waker| waker.send_to(&[], target));
        if let Err(err) = woken {
            self.logger.warn(&format!(
                "wake datagram to {} failed, receiver exits on next poll: {}",
                target, err
            ));
        }
    }
}

fn wake_target(local_addr: SocketAddr) -> SocketAddr {
    if local_addr.ip().is_unspecified() {
        let ip = match local_addr {
            SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
            SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
        };
        SocketAddr::new(ip, local_addr.port())
    } else {
        local_addr
    }
}

impl UdpPulseReceiver {
    pub fn bind(addr: SocketAddr, metrics: Arc<MetricsRecorder>) -> Result<Self, IngestError> {
        let socket = UdpSocket::bind(addr).map_err(|source| IngestError::Bind { addr, source })?;
        let local_addr = socket
            .local_addr()
            .map_err(|source| IngestError::Bind { addr, source })?;
        socket
            .set_read_timeout(Some(POLL_INTERVAL))
            .map_err(|source| IngestError::Bind { addr, source })?;
        let logger = LogManager::new("ingest");
        logger.record(&format!("listening for external pulses on {}", local_addr));
        Ok(Self {
            socket,
            local_addr,
            stopped: Arc::new(AtomicBool::new(false)),
            metrics,
            logger,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            local_addr: self.local_addr,
            stopped: self.stopped.clone(),
            logger: self.logger,
        }
    }

    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Blocks until one datagram arrives and returns its bytes verbatim.
    pub fn receive_one(&self) -> Result<Vec<u8>, IngestError> {
        let mut buffer = [0u8; RECV_BUFFER_LEN];
        let len = loop {
            if self.is_stopped() {
                return Err(IngestError::Stopped);
            }
            match self.socket.recv_from(&mut buffer) {
                Ok((len, _)) => break len,
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) => {}
                Err(err) => return Err(IngestError::Receive(err)),
            }
        };

        if self.is_stopped() {
            return Err(IngestError::Stopped);
        }

        let pulses = buffer[..len].to_vec();
        for pulse in &pulses {
            self.logger.record(&format!("Pulse {}", pulse));
        }
        self.metrics.record_ingested(pulses.len());
        Ok(pulses)
    }
}

impl PulseSource for UdpPulseReceiver {
    fn next_pulse(&mut self) -> Duration {
        match self.receive_one() {
            Ok(_) | Err(IngestError::Stopped) => {}
            Err(err) => self.logger.warn(&err.to_string()),
        }
        Duration::ZERO
    }

    fn finished(&self) -> bool {
        self.is_stopped()
    }
}
