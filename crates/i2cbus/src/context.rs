use core::num::NonZeroU64;

/// Identifier of a group of handles that cooperate on one bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(NonZeroU64);

impl ContextId {
    /// Returns `None` for `0`, which is reserved for "no context".
    pub const fn new(id: u64) -> Option<Self> {
        match NonZeroU64::new(id) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

/// Locking discipline of a [`BusHandle`](crate::BusHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Every transaction blocks until it owns the bus lock.
    #[default]
    Exclusive,
    /// Handles in the same group skip the bus lock while a member of the
    /// group holds it.
    ///
    /// This mode gives weaker guarantees than [`Mode::Exclusive`]: while a
    /// group member holds the bus (see
    /// [`BusHandle::lock`](crate::BusHandle::lock)), other members issue
    /// their transactions unguarded. Ordering between members is up to the
    /// caller. Handles outside the group are still excluded.
    CooperatingGroup(ContextId),
}

impl Mode {
    pub const fn context(&self) -> Option<ContextId> {
        match self {
            Mode::Exclusive => None,
            Mode::CooperatingGroup(id) => Some(*id),
        }
    }

    /// Raw tag stored in a bus slot; `0` when exclusive.
    pub(crate) const fn tag(&self) -> u64 {
        match self {
            Mode::Exclusive => 0,
            Mode::CooperatingGroup(id) => id.get(),
        }
    }
}
