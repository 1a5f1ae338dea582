//! Serialized access to shared I2C buses.
//!
//! Every bus index owns one reentrant lock in a [`LockRegistry`]. Device
//! handles opened against the same bus route their transactions through
//! that lock, so two threads talking to different slaves on one bus never
//! interleave bytes on the wire. The registry is brought up by the first
//! open and torn down by the last close.
//!
//! The byte-level transport is supplied by the caller through the
//! [`Transport`] trait. A Linux `/dev/i2c-N` implementation is available
//! behind the `i2cdev` feature.
//!
//! Registry lifecycle transitions run inside a `critical-section` critical
//! section. The crate does not pick an implementation; binaries enable one,
//! e.g. `critical-section = { version = "1", features = ["std"] }` on a
//! hosted target.

mod config;
mod context;
mod error;
mod handle;
#[cfg(all(feature = "i2cdev", target_os = "linux"))]
mod linux;
mod registry;
mod slot;
mod transfer;
mod transport;

pub use config::{
    BusConfig, DEFAULT_MAX_BUSES, MAX_SLAVE_ADDRESS, MIN_SLAVE_ADDRESS,
};
pub use context::{ContextId, Mode};
pub use error::{BusError, LockError, RegistryError};
pub use handle::{BusHandle, BusLockGuard};
#[cfg(all(feature = "i2cdev", target_os = "linux"))]
pub use linux::{I2cDev, I2C_SLAVE};
pub use registry::{LockRegistry, Phase};
pub use transfer::{Direction, Short, Transferred};
pub use transport::Transport;
