//! SSDP wire handling: parsing incoming datagrams and building our own.
//!
//! Only two kinds of datagram matter to the responder: M-SEARCH queries we
//! answer, and 200-OK responses from the peer hub. The hub's responses carry
//! non-standard `SERVER_IP` / `SERVER_PORT` / `DEVICE_ID` headers telling us
//! where it could reach us — that is the whole point of the exchange.

use std::net::Ipv4Addr;

pub(crate) const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
pub(crate) const SSDP_PORT: u16 = 1900;
pub(crate) const MAX_AGE: u32 = 1800;

pub(crate) const SERVER_IDENT: &str =
    concat!("sense-edge/", env!("CARGO_PKG_VERSION"), " UPnP/1.1");

/// Peer-supplied reachability details from a matching broadcast response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAdvertisement {
    /// Service type the response advertises.
    pub st: String,
    /// Address the peer says it reached us from.
    pub server_ip: String,
    /// Port of the peer's own HTTP listener.
    pub server_port: u16,
    /// Opaque device identifier echoed back in the callback.
    pub device_id: Option<String>,
}

/// A parsed SSDP datagram the responder cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SsdpMessage {
    /// An M-SEARCH query with its search target.
    Search { st: String },
    /// A 200-OK response carrying peer reachability headers.
    Response(PeerAdvertisement),
}

/// Parse one datagram. Anything that is not an M-SEARCH with an ST header or
/// a complete peer response is ignored.
pub(crate) fn parse_datagram(text: &str) -> Option<SsdpMessage> {
    if text.starts_with("M-SEARCH") {
        return parse_search(text).map(|st| SsdpMessage::Search { st });
    }
    if text.starts_with("HTTP/1.1 200") {
        return parse_response(text).map(SsdpMessage::Response);
    }
    None
}

fn parse_search(text: &str) -> Option<String> {
    text.lines()
        .find_map(|line| extract_header_value(line.trim(), "ST:"))
}

fn parse_response(text: &str) -> Option<PeerAdvertisement> {
    let mut st = None;
    let mut server_ip = None;
    let mut server_port = None;
    let mut device_id = None;

    for line in text.lines() {
        let line = line.trim();

        if let Some(value) = extract_header_value(line, "ST:") {
            st = Some(value);
        } else if let Some(value) = extract_header_value(line, "SERVER_IP:") {
            server_ip = Some(value);
        } else if let Some(value) = extract_header_value(line, "SERVER_PORT:") {
            server_port = value.parse::<u16>().ok();
        } else if let Some(value) = extract_header_value(line, "DEVICE_ID:") {
            device_id = Some(value);
        }
    }

    match (st, server_ip, server_port) {
        (Some(st), Some(server_ip), Some(server_port)) => Some(PeerAdvertisement {
            st,
            server_ip,
            server_port,
            device_id,
        }),
        _ => None,
    }
}

/// Extract header value from a line like "HEADER: value"
fn extract_header_value(line: &str, header: &str) -> Option<String> {
    if line.len() > header.len() && line[..header.len()].eq_ignore_ascii_case(header) {
        Some(line[header.len()..].trim().to_string())
    } else {
        None
    }
}

/// Build a NOTIFY ssdp:alive announcement.
pub(crate) fn build_alive(location: &str, nt: &str, usn: &str) -> String {
    format!(
        "NOTIFY * HTTP/1.1\r\n\
         HOST: {SSDP_MULTICAST_ADDR}:{SSDP_PORT}\r\n\
         CACHE-CONTROL: max-age={MAX_AGE}\r\n\
         LOCATION: {location}\r\n\
         NT: {nt}\r\n\
         NTS: ssdp:alive\r\n\
         SERVER: {SERVER_IDENT}\r\n\
         USN: {usn}\r\n\
         \r\n"
    )
}

/// Build a 200-OK answer to an M-SEARCH query.
pub(crate) fn build_search_response(st: &str, location: &str, usn: &str) -> String {
    let date = chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT");
    format!(
        "HTTP/1.1 200 OK\r\n\
         CACHE-CONTROL: max-age={MAX_AGE}\r\n\
         DATE: {date}\r\n\
         EXT:\r\n\
         LOCATION: {location}\r\n\
         SERVER: {SERVER_IDENT}\r\n\
         ST: {st}\r\n\
         USN: {usn}\r\n\
         \r\n"
    )
}
