//! The discovery responder task.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{DiscoveryError, Result};
use crate::ssdp::{
    build_alive, build_search_response, parse_datagram, PeerAdvertisement, SsdpMessage,
    MAX_AGE, SSDP_MULTICAST_ADDR, SSDP_PORT,
};

/// Service identity the hub searches for.
pub const SERVICE_TYPE: &str = "urn:SmartThingsCommunity:device:SenseController";

/// Fixed device UDN advertised alongside the service type.
const DEVICE_UDN: &str = "uuid:smartthings-brbeaird-sense";

/// Deadline for the callback POST to the peer hub.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Listens on the SSDP port, announces the bridge, and calls matching peers
/// back with the bridge's HTTP port.
pub struct DiscoveryResponder {
    socket: UdpSocket,
    http: reqwest::Client,
    http_port: u16,
    location: String,
}

impl DiscoveryResponder {
    /// Bind the SSDP socket and join the multicast group.
    ///
    /// `http_port` is the bridge's bound HTTP port, advertised in the
    /// LOCATION header and posted to peers in the callback.
    pub async fn bind(http_port: u16) -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, SSDP_PORT))
            .await
            .map_err(|e| DiscoveryError::NetworkError(format!("failed to bind SSDP port: {e}")))?;
        socket
            .join_multicast_v4(SSDP_MULTICAST_ADDR, Ipv4Addr::UNSPECIFIED)
            .map_err(|e| {
                DiscoveryError::NetworkError(format!("failed to join multicast group: {e}"))
            })?;
        socket.set_multicast_loop_v4(false).map_err(|e| {
            DiscoveryError::NetworkError(format!("failed to set multicast loop: {e}"))
        })?;

        // The bridge does not know its externally-reachable address, so the
        // advertised location is deliberately 0.0.0.0; peers learn the real
        // address from the datagram source and tell us theirs in response.
        let location = format!("http://0.0.0.0:{http_port}/details");

        Ok(Self {
            socket,
            http: reqwest::Client::new(),
            http_port,
            location,
        })
    }

    /// The LOCATION URL this responder advertises.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Run the responder on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(usn = %service_usn(), "SSDP responder up and listening for broadcasts");
            self.run().await;
        })
    }

    async fn run(self) {
        let mut buf = [0u8; 2048];
        // First tick fires immediately: the initial alive announcement.
        let mut announce = tokio::time::interval(Duration::from_secs(u64::from(MAX_AGE / 2)));

        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, src)) => {
                            let text = String::from_utf8_lossy(&buf[..len]);
                            self.handle_datagram(&text, src).await;
                        }
                        Err(e) => warn!(error = %e, "SSDP read error"),
                    }
                }
                _ = announce.tick() => self.send_alive().await,
            }
        }
    }

    async fn handle_datagram(&self, text: &str, src: SocketAddr) {
        match parse_datagram(text) {
            Some(SsdpMessage::Search { st }) if search_matches(&st) => {
                debug!(%src, %st, "answering M-SEARCH");
                self.answer_search(&st, src).await;
            }
            Some(SsdpMessage::Response(peer)) if peer.st == SERVICE_TYPE => {
                self.notify_peer(&peer).await;
            }
            _ => {}
        }
    }

    async fn send_alive(&self) {
        let multicast = SocketAddr::from((SSDP_MULTICAST_ADDR, SSDP_PORT));
        for (nt, usn) in [
            (DEVICE_UDN.to_string(), DEVICE_UDN.to_string()),
            (SERVICE_TYPE.to_string(), service_usn()),
        ] {
            let msg = build_alive(&self.location, &nt, &usn);
            if let Err(e) = self.socket.send_to(msg.as_bytes(), multicast).await {
                warn!(error = %e, %usn, "failed to send NOTIFY alive");
            }
        }
    }

    async fn answer_search(&self, st: &str, src: SocketAddr) {
        let (st, usn) = if st == "ssdp:all" {
            (SERVICE_TYPE.to_string(), service_usn())
        } else if st == DEVICE_UDN {
            (DEVICE_UDN.to_string(), DEVICE_UDN.to_string())
        } else {
            (st.to_string(), service_usn())
        };

        let response = build_search_response(&st, &self.location, &usn);
        if let Err(e) = self.socket.send_to(response.as_bytes(), src).await {
            warn!(error = %e, %src, "failed to answer M-SEARCH");
        }
    }

    /// Post the bridge's port back to the peer that located us.
    ///
    /// Best-effort by design: any failure is logged and forgotten, the peer
    /// will broadcast again on its next discovery cycle.
    async fn notify_peer(&self, peer: &PeerAdvertisement) {
        let url = format!("http://{}:{}/ping", peer.server_ip, peer.server_port);
        info!(%url, "detected matching broadcast, posting connection details to hub");

        let body = serde_json::json!({
            "senseServerPort": self.http_port,
            "deviceId": peer.device_id,
        });

        let result = self
            .http
            .post(&url)
            .json(&body)
            .timeout(CALLBACK_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(%url, "hub callback delivered");
            }
            Ok(response) => {
                warn!(%url, status = %response.status(), "hub callback rejected");
            }
            Err(e) => warn!(%url, error = %e, "hub callback failed"),
        }
    }
}

fn service_usn() -> String {
    format!("{DEVICE_UDN}::{SERVICE_TYPE}")
}

fn search_matches(st: &str) -> bool {
    st == SERVICE_TYPE || st == DEVICE_UDN || st == "ssdp:all"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_matches_identity_and_wildcard() {
        assert!(search_matches(SERVICE_TYPE));
        assert!(search_matches(DEVICE_UDN));
        assert!(search_matches("ssdp:all"));
        assert!(!search_matches("urn:schemas-upnp-org:device:MediaRenderer:1"));
    }

    #[test]
    fn service_usn_combines_udn_and_service_type() {
        assert_eq!(
            service_usn(),
            "uuid:smartthings-brbeaird-sense::urn:SmartThingsCommunity:device:SenseController"
        );
    }

    #[tokio::test]
    async fn responder_advertises_details_location() {
        // Port 1900 may be unavailable in the test environment; only assert
        // on the constructed location when the bind succeeds.
        if let Ok(responder) = DiscoveryResponder::bind(9000).await {
            assert_eq!(responder.location(), "http://0.0.0.0:9000/details");
        }
    }
}
