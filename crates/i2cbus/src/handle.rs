use core::fmt::Debug;
use core::marker::PhantomData;
use std::time::Duration;

use crate::context::{ContextId, Mode};
use crate::error::{BusError, LockError};
use crate::registry::LockRegistry;
use crate::slot::BusSlot;
use crate::transfer::Transferred;
use crate::transport::Transport;

type Result<T, E> = core::result::Result<T, BusError<E>>;

/// Connection to one slave on a shared bus.
///
/// All I/O goes through the lock of the handle's bus in the
/// [`LockRegistry`] it was opened against, so transactions from handles on
/// the same bus never interleave. The registry must outlive the handle,
/// which the `'a` borrow enforces.
///
/// Closing consumes the handle. Dropping an open handle closes it and logs
/// any failure.
pub struct BusHandle<'a, T: Transport> {
    registry: &'a LockRegistry,
    transport: &'a T,
    conn: Option<T::Handle>,
    bus: usize,
    address: u16,
    mode: Mode,
}

impl<'a, T: Transport> BusHandle<'a, T> {
    /// Open `address` on bus `bus`.
    ///
    /// The bus index and address are validated against the registry's
    /// configuration before anything else happens. If the transport fails to
    /// open, the registry user taken for this handle is given back.
    pub fn open(
        registry: &'a LockRegistry,
        transport: &'a T,
        bus: usize,
        address: u16,
    ) -> Result<Self, T::Error> {
        let config = registry.config();
        if !config.check_index(bus) {
            return Err(BusError::InvalidIndex {
                index: bus,
                max: config.max_buses,
            });
        }
        if !config.check_address(address) {
            return Err(BusError::InvalidAddress(address));
        }

        registry.acquire()?;
        let conn = match transport.open(bus, address) {
            Ok(conn) => conn,
            Err(err) => {
                if let Err(release) = registry.release() {
                    tracing::warn!(
                        %release,
                        "registry release after failed open"
                    );
                }
                return Err(BusError::TransportOpen(err));
            }
        };
        tracing::debug!(bus, address, "bus handle opened");

        Ok(Self {
            registry,
            transport,
            conn: Some(conn),
            bus,
            address,
            mode: Mode::Exclusive,
        })
    }

    /// Close the transport connection and give the registry user back.
    ///
    /// The transport error takes precedence if both steps fail.
    pub fn close(mut self) -> Result<(), T::Error> {
        self.shutdown()
    }

    pub fn bus(&self) -> usize {
        self.bus
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn context(&self) -> Option<ContextId> {
        self.mode.context()
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Join cooperating group `context`, or leave any group with `None`.
    ///
    /// Fails with [`BusError::InvalidContext`] for `Some(0)`.
    pub fn set_context(
        &mut self,
        context: Option<u64>,
    ) -> Result<(), T::Error> {
        self.mode = match context {
            None => Mode::Exclusive,
            Some(id) => Mode::CooperatingGroup(
                ContextId::new(id).ok_or(BusError::InvalidContext)?,
            ),
        };
        Ok(())
    }

    /// Write `buf` to the slave under the bus lock.
    pub fn write(&mut self, buf: &[u8]) -> Result<Transferred, T::Error> {
        if buf.is_empty() {
            return Err(BusError::InvalidArgument("empty write buffer"));
        }
        let _hold = self.enter()?;
        let written = self.transport_write(buf)?;
        if written.short().is_some() {
            tracing::debug!(
                bus = self.bus,
                address = self.address,
                requested = written.requested,
                actual = written.actual,
                "short write"
            );
        }
        Ok(written)
    }

    /// Read from the slave into `buf` under the bus lock.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<Transferred, T::Error> {
        if buf.is_empty() {
            return Err(BusError::InvalidArgument("empty read buffer"));
        }
        let _hold = self.enter()?;
        let read = self.transport_read(buf)?;
        if read.short().is_some() {
            tracing::debug!(
                bus = self.bus,
                address = self.address,
                requested = read.requested,
                actual = read.actual,
                "short read"
            );
        }
        Ok(read)
    }

    /// Write `out`, wait `delay`, then read into `input`, all under one hold
    /// of the bus lock so no other transaction lands between the phases.
    ///
    /// A short write skips the delay and the read; the returned value then
    /// describes the write phase. The delay is a plain thread sleep and
    /// cannot be interrupted.
    pub fn transfer(
        &mut self,
        out: &[u8],
        input: &mut [u8],
        delay: Duration,
    ) -> Result<Transferred, T::Error> {
        if out.is_empty() {
            return Err(BusError::InvalidArgument("empty write buffer"));
        }
        if input.is_empty() {
            return Err(BusError::InvalidArgument("empty read buffer"));
        }
        let _hold = self.enter()?;
        let written = self.send(out)?;
        if !written.is_complete() {
            return Ok(written);
        }
        self.receive(delay, input)
    }

    /// [`transfer`](Self::transfer) with one buffer for both phases: writes
    /// `buf[..out_len]`, then reads into the whole of `buf`.
    pub fn transfer_in_place(
        &mut self,
        buf: &mut [u8],
        out_len: usize,
        delay: Duration,
    ) -> Result<Transferred, T::Error> {
        if out_len == 0 || out_len > buf.len() {
            return Err(BusError::InvalidArgument("write length out of range"));
        }
        let _hold = self.enter()?;
        let written = self.send(&buf[..out_len])?;
        if !written.is_complete() {
            return Ok(written);
        }
        self.receive(delay, buf)
    }

    /// Block until this thread holds the bus.
    ///
    /// While held, other threads' exclusive transactions on the bus wait;
    /// handles in the same cooperating group skip the lock. The lock is
    /// reentrant, so this thread's own I/O proceeds. Pair every successful
    /// call with [`unlock`](Self::unlock), or use
    /// [`lock_guard`](Self::lock_guard).
    pub fn lock(&self) -> Result<(), T::Error> {
        let slot = self.explicit_slot()?;
        slot.lock(self.mode.tag());
        Ok(())
    }

    /// Non-blocking [`lock`](Self::lock). Returns `Ok(false)` if another
    /// thread holds the bus.
    pub fn try_lock(&self) -> Result<bool, T::Error> {
        let slot = self.explicit_slot()?;
        Ok(slot.try_lock(self.mode.tag()))
    }

    /// Release one hold taken with [`lock`](Self::lock) or
    /// [`try_lock`](Self::try_lock).
    ///
    /// Calling this without holding the bus is a contract violation and
    /// fails with [`LockError::NotOwner`].
    pub fn unlock(&self) -> Result<(), T::Error> {
        Ok(self.slot()?.unlock()?)
    }

    /// [`lock`](Self::lock) that releases the bus when the guard drops.
    pub fn lock_guard(&self) -> Result<BusLockGuard<'_>, T::Error> {
        let slot = self.explicit_slot()?;
        slot.lock(self.mode.tag());
        Ok(BusLockGuard { slot, _not_send: PhantomData })
    }

    fn slot(&self) -> core::result::Result<&'a BusSlot, LockError> {
        self.registry.slot(self.bus)
    }

    fn explicit_slot(&self) -> Result<&'a BusSlot, T::Error> {
        if self.registry.config().explicit_lock_requires_context
            && self.mode.context().is_none()
        {
            return Err(BusError::InvalidContext);
        }
        Ok(self.slot()?)
    }

    /// Take the bus for one transaction according to the handle's mode.
    fn enter(&self) -> Result<Hold<'a>, T::Error> {
        let slot = self.slot()?;
        let tag = self.mode.tag();
        match self.mode {
            Mode::Exclusive => slot.lock(tag),
            Mode::CooperatingGroup(_) => {
                if !slot.try_lock(tag) {
                    if slot.held_by_group(tag) {
                        tracing::trace!(
                            bus = self.bus,
                            context = tag,
                            "bus held by group, proceeding unlocked"
                        );
                        return Ok(Hold::Elided);
                    }
                    slot.lock(tag);
                }
            }
        }
        Ok(Hold::Acquired(slot))
    }

    /// Write phase of a transfer.
    fn send(&mut self, out: &[u8]) -> Result<Transferred, T::Error> {
        tracing::trace!(
            bus = self.bus,
            address = self.address,
            "-> {}",
            Hex(out)
        );
        let written = self.transport_write(out)?;
        if !written.is_complete() {
            tracing::debug!(
                bus = self.bus,
                address = self.address,
                requested = written.requested,
                actual = written.actual,
                "short write, skipping read phase"
            );
        }
        Ok(written)
    }

    /// Delay and read phase of a transfer.
    fn receive(
        &mut self,
        delay: Duration,
        input: &mut [u8],
    ) -> Result<Transferred, T::Error> {
        pause(delay);
        let read = self.transport_read(input)?;
        tracing::trace!(
            bus = self.bus,
            address = self.address,
            "<- {}",
            Hex(&input[..read.actual.min(input.len())])
        );
        Ok(read)
    }

    fn transport_write(&mut self, buf: &[u8]) -> Result<Transferred, T::Error> {
        let conn = self.conn.as_mut().ok_or(BusError::InvalidArgument(
            "handle is closed",
        ))?;
        let actual =
            self.transport.write(conn, buf).map_err(BusError::TransportIo)?;
        Ok(Transferred::written(buf.len(), actual))
    }

    fn transport_read(
        &mut self,
        buf: &mut [u8],
    ) -> Result<Transferred, T::Error> {
        let conn = self.conn.as_mut().ok_or(BusError::InvalidArgument(
            "handle is closed",
        ))?;
        let actual =
            self.transport.read(conn, buf).map_err(BusError::TransportIo)?;
        Ok(Transferred::read(buf.len(), actual))
    }

    fn shutdown(&mut self) -> Result<(), T::Error> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        let closed = self.transport.close(conn);
        let released = self.registry.release();
        tracing::debug!(
            bus = self.bus,
            address = self.address,
            "bus handle closed"
        );
        match (closed, released) {
            (Err(err), Err(release)) => {
                tracing::warn!(%release, "registry release after failed close");
                Err(BusError::TransportClose(err))
            }
            (Err(err), Ok(())) => Err(BusError::TransportClose(err)),
            (Ok(()), Err(release)) => Err(release.into()),
            (Ok(()), Ok(())) => Ok(()),
        }
    }
}

impl<T: Transport> Drop for BusHandle<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::warn!(
                bus = self.bus,
                address = self.address,
                "closing dropped bus handle: {err}"
            );
        }
    }
}

impl<T: Transport> Debug for BusHandle<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BusHandle")
            .field("bus", &self.bus)
            .field("address", &self.address)
            .field("mode", &self.mode)
            .field("open", &self.conn.is_some())
            .finish()
    }
}

/// Bus hold taken for a single transaction.
enum Hold<'a> {
    Acquired(&'a BusSlot),
    /// A member of the handle's group holds the bus.
    Elided,
}

impl Drop for Hold<'_> {
    fn drop(&mut self) {
        if let Hold::Acquired(slot) = self {
            // SAFETY: `Acquired` is only built after this thread locked the
            // slot, and a `Hold` never leaves the thread that created it.
            unsafe { slot.exit() };
        }
    }
}

/// RAII guard returned by [`BusHandle::lock_guard`].
///
/// The bus lock is owned by the thread that took it, so the guard cannot be
/// sent to another thread.
///
/// Dropping the guard after the hold was already given back with
/// [`BusHandle::unlock`] leaves the bus alone and logs a warning.
#[must_use = "the bus is unlocked as soon as the guard is dropped"]
pub struct BusLockGuard<'a> {
    slot: &'a BusSlot,
    _not_send: PhantomData<*const ()>,
}

impl BusLockGuard<'_> {
    pub fn bus(&self) -> usize {
        self.slot.index()
    }
}

impl Drop for BusLockGuard<'_> {
    fn drop(&mut self) {
        // The hold may already be gone through a manual `unlock`.
        if let Err(err) = self.slot.unlock() {
            tracing::warn!(
                bus = self.slot.index(),
                "dropping lock guard: {err}"
            );
        }
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

struct Hex<'b>(&'b [u8]);

impl core::fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for byte in self.0 {
            write!(f, " {byte:02x}h")?;
        }
        Ok(())
    }
}
