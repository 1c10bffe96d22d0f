//! Polling synchronization of remote queue payloads

pub mod registry;
mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use registry::{Refresher, Subscription, SynchronizationRegistry, REFRESH_INTERVAL};
pub use transport::{HttpTransport, Transport};
pub use types::{SessionState, TransportError};
