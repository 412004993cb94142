//! Transport-address descriptors.
//!
//! An [`Address`] names either a Unix domain socket path or a TCP
//! `host:port`. Strings are parsed as follows:
//!
//! | Input                 | Result                          |
//! |-----------------------|---------------------------------|
//! | `unix:/run/app.sock`  | `Unix("/run/app.sock")`         |
//! | `tcp://0.0.0.0:7000`  | `Tcp("0.0.0.0:7000")`           |
//! | `7000`                | `Tcp("127.0.0.1:7000")`         |
//! | `/tmp/app.sock`       | `Unix("/tmp/app.sock")`         |

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::TransportError;

/// Host used when an address is given as a bare port number.
pub const LOCALHOST: &str = "127.0.0.1";

/// Where to listen or connect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// Filesystem path of a Unix domain socket.
    Unix(PathBuf),
    /// TCP `host:port`, resolved when binding or connecting.
    Tcp(String),
}

impl Address {
    /// A TCP address on the loopback interface.
    pub fn tcp_port(port: u16) -> Self {
        Address::Tcp(format!("{LOCALHOST}:{port}"))
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Address::Unix(_) => "unix-domain-socket",
            Address::Tcp(_) => "tcp",
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Unix(path) => write!(f, "unix:{}", path.display()),
            Address::Tcp(addr) => write!(f, "tcp://{addr}"),
        }
    }
}

impl FromStr for Address {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TransportError::InvalidAddress(input.to_string()));
        }

        if let Some(path) = input.strip_prefix("unix:") {
            let path = path.strip_prefix("//").unwrap_or(path);
            if path.is_empty() {
                return Err(TransportError::InvalidAddress(input.to_string()));
            }
            return Ok(Address::Unix(PathBuf::from(path)));
        }

        if let Some(addr) = input.strip_prefix("tcp://") {
            return match addr.rsplit_once(':') {
                Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                    Ok(Address::Tcp(addr.to_string()))
                }
                _ => Err(TransportError::InvalidAddress(input.to_string())),
            };
        }

        if input.bytes().all(|b| b.is_ascii_digit()) {
            let port = input
                .parse::<u16>()
                .map_err(|_| TransportError::InvalidAddress(input.to_string()))?;
            return Ok(Address::tcp_port(port));
        }

        Ok(Address::Unix(PathBuf::from(input)))
    }
}

impl From<u16> for Address {
    fn from(port: u16) -> Self {
        Address::tcp_port(port)
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Address::Tcp(addr.to_string())
    }
}

impl From<PathBuf> for Address {
    fn from(path: PathBuf) -> Self {
        Address::Unix(path)
    }
}

impl From<&Path> for Address {
    fn from(path: &Path) -> Self {
        Address::Unix(path.to_path_buf())
    }
}

impl From<&PathBuf> for Address {
    fn from(path: &PathBuf) -> Self {
        Address::Unix(path.clone())
    }
}

impl From<&Address> for Address {
    fn from(address: &Address) -> Self {
        address.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_forms() {
        assert_eq!(
            "unix:/run/app.sock".parse::<Address>().unwrap(),
            Address::Unix(PathBuf::from("/run/app.sock"))
        );
        assert_eq!(
            "unix:///run/app.sock".parse::<Address>().unwrap(),
            Address::Unix(PathBuf::from("/run/app.sock"))
        );
        assert_eq!(
            "tcp://0.0.0.0:7000".parse::<Address>().unwrap(),
            Address::Tcp("0.0.0.0:7000".to_string())
        );
    }

    #[test]
    fn bare_port_is_loopback_tcp() {
        assert_eq!(
            "7000".parse::<Address>().unwrap(),
            Address::Tcp("127.0.0.1:7000".to_string())
        );
        assert_eq!(Address::from(7000u16), Address::tcp_port(7000));
    }

    #[test]
    fn bare_path_is_unix() {
        assert_eq!(
            "/tmp/app.sock".parse::<Address>().unwrap(),
            Address::Unix(PathBuf::from("/tmp/app.sock"))
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            "".parse::<Address>(),
            Err(TransportError::InvalidAddress(_))
        ));
        assert!(matches!(
            "tcp://nohost".parse::<Address>(),
            Err(TransportError::InvalidAddress(_))
        ));
        assert!(matches!(
            "tcp://host:notaport".parse::<Address>(),
            Err(TransportError::InvalidAddress(_))
        ));
        assert!(matches!(
            "99999".parse::<Address>(),
            Err(TransportError::InvalidAddress(_))
        ));
    }

    #[test]
    fn display_round_trips() {
        for input in ["unix:/tmp/a.sock", "tcp://127.0.0.1:9"] {
            let parsed: Address = input.parse().unwrap();
            assert_eq!(parsed.to_string(), input);
            assert_eq!(parsed.to_string().parse::<Address>().unwrap(), parsed);
        }
    }
}
