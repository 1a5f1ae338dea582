use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use once_cell::sync::OnceCell;
use portable_atomic::{AtomicUsize, Ordering};

use crate::config::BusConfig;
use crate::error::{LockError, RegistryError};
use crate::slot::BusSlot;

static GLOBAL: OnceCell<LockRegistry> = OnceCell::new();

/// Lifecycle phase of a [`LockRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No open handles; bus locks are not in service.
    Idle,
    /// At least one handle is open.
    Active,
    /// The last release found bus `bus` still locked. The next acquire
    /// retries the bring-up.
    Faulted { bus: usize },
}

/// Process-wide table of bus locks.
///
/// Holds one reentrant lock per bus index and counts the users (open
/// [`BusHandle`](crate::BusHandle)s). The first acquire brings the table
/// into service and the last release takes it out again; both transitions
/// check that no bus is left locked.
///
/// Most programs use [`LockRegistry::global`]. Independent registries can be
/// built with [`LockRegistry::new`], e.g. one per test.
pub struct LockRegistry {
    config: BusConfig,
    slots: Box<[BusSlot]>,
    phase: Mutex<CriticalSectionRawMutex, Cell<Phase>>,
    users: AtomicUsize,
}

impl LockRegistry {
    /// Create a registry with one lock per bus index in `config`.
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            slots: (0..config.max_buses).map(BusSlot::new).collect(),
            phase: Mutex::new(Cell::new(Phase::Idle)),
            users: AtomicUsize::new(0),
        }
    }

    /// The process-wide registry, built with the default configuration
    /// unless [`init_global`](Self::init_global) ran first.
    pub fn global() -> &'static LockRegistry {
        GLOBAL.get_or_init(|| LockRegistry::new(BusConfig::default()))
    }

    /// Install the process-wide registry with `config`.
    ///
    /// Returns `Err(config)` if the global registry already exists.
    pub fn init_global(
        config: BusConfig,
    ) -> Result<&'static LockRegistry, BusConfig> {
        let mut installed = false;
        let registry = GLOBAL.get_or_init(|| {
            installed = true;
            LockRegistry::new(config)
        });
        if installed {
            Ok(registry)
        } else {
            Err(config)
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Register one user. The transition from zero users brings every bus
    /// lock into service.
    pub fn acquire(&self) -> Result<(), RegistryError> {
        let outcome = self.phase.lock(|phase| {
            if self.users.fetch_add(1, Ordering::AcqRel) > 0 {
                return Ok(false);
            }
            if let Some(slot) = self.slots.iter().find(|s| s.is_locked()) {
                self.users.fetch_sub(1, Ordering::AcqRel);
                return Err(RegistryError::Init { bus: slot.index() });
            }
            phase.set(Phase::Active);
            Ok(true)
        });
        match &outcome {
            Ok(true) => {
                tracing::debug!(buses = self.slots.len(), "bus registry active")
            }
            Ok(false) => {}
            Err(err) => tracing::warn!("bus registry not brought up: {err}"),
        }
        outcome.map(drop)
    }

    /// Drop one user. The transition to zero users takes every bus lock out
    /// of service.
    ///
    /// A bus still locked at that point is reported as
    /// [`RegistryError::Teardown`] and leaves the registry
    /// [`Phase::Faulted`]; the user count still reaches zero.
    pub fn release(&self) -> Result<(), RegistryError> {
        let outcome = self.phase.lock(|phase| {
            let prev = self
                .users
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                    n.checked_sub(1)
                })
                .map_err(|_| RegistryError::NotAcquired)?;
            if prev > 1 {
                return Ok(false);
            }
            if let Some(slot) = self.slots.iter().find(|s| s.is_locked()) {
                let bus = slot.index();
                phase.set(Phase::Faulted { bus });
                return Err(RegistryError::Teardown { bus });
            }
            phase.set(Phase::Idle);
            Ok(true)
        });
        match &outcome {
            Ok(true) => tracing::debug!("bus registry idle"),
            Ok(false) => {}
            Err(err) => tracing::warn!("bus registry release: {err}"),
        }
        outcome.map(drop)
    }

    /// Returns the current number of users.
    pub fn user_count(&self) -> usize {
        self.users.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> Phase {
        self.phase.lock(|phase| phase.get())
    }

    /// Returns `true` if any thread holds the lock of bus `index`.
    pub fn is_locked(&self, index: usize) -> Result<bool, LockError> {
        Ok(self.slot(index)?.is_locked())
    }

    /// Block until the calling thread holds bus `index`.
    ///
    /// The lock is reentrant: a thread that already holds the bus returns
    /// immediately and must call [`unlock_bus`](Self::unlock_bus) once per
    /// successful lock. Fails with [`LockError::Inactive`] unless the
    /// registry is [`Phase::Active`].
    pub fn lock_bus(&self, index: usize) -> Result<(), LockError> {
        let slot = self.slot(index)?;
        self.ensure_active()?;
        slot.lock(0);
        self.recheck_active(slot)
    }

    /// Try to take bus `index` without blocking. Returns `Ok(false)` if
    /// another thread holds it.
    pub fn try_lock_bus(&self, index: usize) -> Result<bool, LockError> {
        let slot = self.slot(index)?;
        self.ensure_active()?;
        if !slot.try_lock(0) {
            return Ok(false);
        }
        self.recheck_active(slot)?;
        Ok(true)
    }

    /// Release one hold on bus `index`.
    ///
    /// Fails with [`LockError::NotOwner`] if the calling thread holds no
    /// lock on the bus.
    pub fn unlock_bus(&self, index: usize) -> Result<(), LockError> {
        self.slot(index)?.unlock()
    }

    fn ensure_active(&self) -> Result<(), LockError> {
        match self.phase() {
            Phase::Active => Ok(()),
            _ => Err(LockError::Inactive),
        }
    }

    /// Give the hold back if the last user left while it was being taken.
    fn recheck_active(&self, slot: &BusSlot) -> Result<(), LockError> {
        if let Err(err) = self.ensure_active() {
            slot.unlock()?;
            return Err(err);
        }
        Ok(())
    }

    pub(crate) fn slot(&self, index: usize) -> Result<&BusSlot, LockError> {
        self.slots
            .get(index)
            .ok_or(LockError::InvalidIndex { index, max: self.slots.len() })
    }
}

impl core::fmt::Debug for LockRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LockRegistry")
            .field("config", &self.config)
            .field("phase", &self.phase())
            .field("users", &self.user_count())
            .field("slots", &self.slots)
            .finish()
    }
}
