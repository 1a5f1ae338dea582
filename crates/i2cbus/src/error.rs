use core::fmt::Debug;

use derive_more::{Display, From};

/// Errors from the registry lifecycle.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Bus `bus` was still locked when the registry was brought up.
    #[display("bus {bus} is still locked from a previous lifecycle")]
    Init { bus: usize },
    /// Bus `bus` was still locked when the last user released the registry.
    #[display("bus {bus} is still locked at teardown")]
    Teardown { bus: usize },
    /// Release without a matching acquire.
    #[display("registry released more often than acquired")]
    NotAcquired,
}

/// Errors from explicit lock control.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    #[display("bus index {index} not supported, maximum is {max}")]
    InvalidIndex { index: usize, max: usize },
    /// Index locking while the registry has no users.
    #[display("bus registry is not active")]
    Inactive,
    /// The calling thread does not hold the lock of `bus`.
    #[display("unlock of bus {bus} by a thread that does not hold it")]
    NotOwner { bus: usize },
}

/// Errors that can occur during bus operations.
///
/// `E` is the error type of the [`Transport`](crate::Transport) in use.
/// Short transfers are not errors; see
/// [`Transferred::short`](crate::Transferred::short).
#[derive(Debug, Display, From, Clone, PartialEq, Eq)]
pub enum BusError<E: Debug> {
    #[from(skip)]
    #[display("invalid argument: {_0}")]
    InvalidArgument(&'static str),
    #[from(skip)]
    #[display("bus index {index} not supported, maximum is {max}")]
    InvalidIndex { index: usize, max: usize },
    #[from(skip)]
    #[display("slave address 0x{_0:02x} is invalid")]
    InvalidAddress(u16),
    /// Explicit locking requested on a handle without a context while the
    /// registry requires one, or a context id of `0`.
    #[from(skip)]
    #[display("handle has no valid context")]
    InvalidContext,
    #[from(skip)]
    #[display("transport open failed: {_0:?}")]
    TransportOpen(E),
    #[from(skip)]
    #[display("transport I/O failed: {_0:?}")]
    TransportIo(E),
    #[from(skip)]
    #[display("transport close failed: {_0:?}")]
    TransportClose(E),
    #[display("{_0}")]
    Registry(RegistryError),
    #[display("{_0}")]
    Lock(LockError),
}

impl std::error::Error for RegistryError {}

impl std::error::Error for LockError {}

impl<E: Debug> std::error::Error for BusError<E> {}
