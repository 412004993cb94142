//! Named JSON events between processes.
//!
//! A Provider emits `(event, args)` pairs over a Unix domain socket or TCP
//! connection; a Consumer accepts connections and republishes every
//! decoded message to local subscribers.
//!
//! # Crate Structure
//!
//! - [`transport`]: addresses, listeners and byte streams (UDS, TCP)
//! - [`frame`]: newline-delimited JSON framing and reassembly
//! - [`peer`]: `Provider`, `Consumer` and `EventSource` (behind `peer` feature)

/// Re-export transport types.
pub mod transport {
    pub use eventwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use eventwire_frame::*;
}

/// Re-export peer types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use eventwire_peer::*;
}

#[cfg(feature = "peer")]
pub use eventwire_peer::{Consumer, EventSource, PeerError, Provider};
pub use eventwire_frame::Message;
pub use eventwire_transport::Address;
