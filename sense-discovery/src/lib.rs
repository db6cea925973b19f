//! SSDP discovery for the Sense edge bridge.
//!
//! The bridge cannot know its own externally-reachable address (container
//! networking, dynamic ports), so discovery runs backwards from the usual
//! pattern: this crate announces a fixed service identity and listens for the
//! hub's broadcast traffic. When a broadcast *response* advertising our
//! identity arrives carrying the peer's own address and port, the responder
//! calls the peer back over HTTP with the bridge's listening port, closing
//! the loop without either side pre-sharing an address.

mod error;
mod responder;
mod ssdp;

pub use error::{DiscoveryError, Result};
pub use responder::{DiscoveryResponder, SERVICE_TYPE};
pub use ssdp::PeerAdvertisement;
