//! The two lookups a check-in/out depends on: the client's IP address
//! (required) and its geolocation (best effort).

use std::net::SocketAddr;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::attendance::Coordinates;

/// Display is the bare reason so it can be stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IpLookup: Send + Sync {
    async fn current_ip(&self) -> Result<String, LookupError>;
}

#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_coordinates(&self) -> Result<Coordinates, LookupError>;
}

/// Client address as seen by the HTTP layer.
#[derive(Debug, Clone)]
pub struct PeerIp(Option<String>);

impl PeerIp {
    /// `remote` is what actix reports as the real remote address: a
    /// forwarded-for value or the socket peer, possibly with a port.
    pub fn from_remote(remote: Option<&str>) -> Self {
        let ip = remote.map(|addr| match addr.parse::<SocketAddr>() {
            Ok(socket) => socket.ip().to_string(),
            Err(_) => addr.trim().to_string(),
        });
        Self(ip.filter(|ip| !ip.is_empty()))
    }
}

#[async_trait]
impl IpLookup for PeerIp {
    async fn current_ip(&self) -> Result<String, LookupError> {
        self.0
            .clone()
            .ok_or_else(|| LookupError::Network("client address unavailable".to_string()))
    }
}

/// Location the browser reported alongside the scan.
#[derive(Debug, Clone)]
pub enum ReportedLocation {
    Fixed(Coordinates),
    Failed(String),
}

impl ReportedLocation {
    /// `None` when the client reported neither coordinates nor an error,
    /// meaning the lookup was skipped.
    pub fn from_report(location: Option<Coordinates>, error: Option<String>) -> Option<Self> {
        match (location, error) {
            (Some(c), _) => Some(ReportedLocation::Fixed(c)),
            (None, Some(reason)) => Some(ReportedLocation::Failed(reason)),
            (None, None) => None,
        }
    }
}

#[async_trait]
impl Geolocator for ReportedLocation {
    async fn current_coordinates(&self) -> Result<Coordinates, LookupError> {
        match self {
            ReportedLocation::Fixed(c) => Ok(*c),
            ReportedLocation::Failed(reason) => Err(LookupError::Unavailable(reason.clone())),
        }
    }
}
