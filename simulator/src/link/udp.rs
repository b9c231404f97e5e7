use crate::workflow::config::LinkConfig;
use anyhow::Context;
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tagsimcore::prelude::LinkError;
use tagsimcore::{CommandHandler, VehicleLink};

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const MAX_DATAGRAM: usize = 2048;

/// Envelope transport to the ground station over plain UDP.
///
/// The ground-station address follows whoever last sent us an envelope.
pub struct UdpVehicleLink {
    socket: UdpSocket,
    peer: RwLock<SocketAddr>,
    running: AtomicBool,
}

impl UdpVehicleLink {
    pub fn bind(config: &LinkConfig) -> anyhow::Result<Arc<Self>> {
        let socket = UdpSocket::bind(config.bind)
            .with_context(|| format!("binding vehicle link on {}", config.bind))?;
        socket
            .set_read_timeout(Some(POLL_INTERVAL))
            .context("configuring vehicle link read timeout")?;
        Ok(Arc::new(Self {
            socket,
            peer: RwLock::new(config.ground_station),
            running: AtomicBool::new(true),
        }))
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.socket
            .local_addr()
            .context("reading vehicle link address")
    }

    pub fn peer(&self) -> SocketAddr {
        *self.peer.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn track_peer(&self, source: SocketAddr) {
        let mut peer = self.peer.write().unwrap_or_else(PoisonError::into_inner);
        if *peer != source {
            info!("ground station now at {}", source);
            *peer = source;
        }
    }

    /// Delivers every inbound datagram to the command handler until shut down.
    pub fn spawn_receiver(self: &Arc<Self>, handler: Arc<CommandHandler>) -> JoinHandle<()> {
        let link = Arc::clone(self);
        thread::spawn(move || {
            let mut buffer = [0u8; MAX_DATAGRAM];
            while link.running.load(Ordering::SeqCst) {
                match link.socket.recv_from(&mut buffer) {
                    Ok((len, source)) => {
                        link.track_peer(source);
                        if let Some(ack) = handler.handle_envelope(&buffer[..len]) {
                            debug!("acked command {} to {}", ack.command_id, source);
                        }
                    }
                    Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                    Err(err) => warn!("vehicle link receive failed: {}", err),
                }
            }
            debug!("vehicle link receiver exiting");
        })
    }

    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl VehicleLink for UdpVehicleLink {
    fn send(&self, envelope: &[u8]) -> Result<(), LinkError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(LinkError::Closed);
        }
        self.socket.send_to(envelope, self.peer())?;
        Ok(())
    }
}
