//! Node addressing and identity.
//!
//! A [`Node`] is how to reach a peer (IP + port). Its [`Nid`] is derived from
//! the address with SHA-256, so two nodes with the same address always share
//! an identity and nobody gets to pick their own.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{self, Debug, Display, Formatter};
use std::net::{AddrParseError, IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeParseError {
    #[error("Invalid node address, expected ip:port: {0}")]
    InvalidAddress(#[from] AddrParseError),
}

/// A 32-byte node identity.
///
/// Ordered lexicographically by its bytes, which gives views a canonical
/// iteration order. The all-zero value ([`Nid::NIL`]) means "no identity".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Nid([u8; 32]);

impl Nid {
    /// The nil identity.
    pub const NIL: Nid = Nid([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the nil identity.
    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }

    /// Full 64-character hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

// Short form (first two bytes) keeps logs readable
impl Display for Nid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..2]))
    }
}

impl Debug for Nid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Nid({})", self.to_hex())
    }
}

impl From<[u8; 32]> for Nid {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// How to reach another peer in the network.
///
/// Serializes as `{"ip": "127.0.0.1", "port": 8080}`.
///
/// # Examples
/// ```
/// use brahms::Node;
///
/// let node = Node::new([127, 0, 0, 1], 8080);
/// assert_eq!(node.to_string(), "127.0.0.1:8080");
/// assert_eq!(node.id(), Node::new([127, 0, 0, 1], 8080).id());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub ip: IpAddr,
    pub port: u16,
}

impl Node {
    pub fn new(ip: impl Into<IpAddr>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    /// Identity of this node: SHA-256 over the 16-byte IP form (IPv4 is
    /// mapped into IPv6) followed by the big-endian port.
    pub fn id(&self) -> Nid {
        let octets = match self.ip {
            IpAddr::V4(ip) => ip.to_ipv6_mapped().octets(),
            IpAddr::V6(ip) => ip.octets(),
        };

        let mut hasher = Sha256::new();
        hasher.update(octets);
        hasher.update(self.port.to_be_bytes());
        Nid(hasher.finalize().into())
    }

    /// Whether this node carries no address (the empty sentinel).
    pub fn is_zero(&self) -> bool {
        self.ip.is_unspecified() && self.port == 0
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new(Ipv4Addr::UNSPECIFIED, 0)
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

impl From<SocketAddr> for Node {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

impl FromStr for Node {
    type Err = NodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr: SocketAddr = s.trim().parse()?;
        Ok(addr.into())
    }
}
