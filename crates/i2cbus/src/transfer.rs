/// Direction of a transport phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Write,
    Read,
}

/// Partial transfer reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Short {
    Write { requested: usize, actual: usize },
    Read { requested: usize, actual: usize },
}

/// Byte count of the last phase an I/O call performed.
///
/// For [`BusHandle::transfer`](crate::BusHandle::transfer) this is the read
/// phase, or the write phase when the write came up short and the read was
/// skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transferred {
    pub direction: Direction,
    pub requested: usize,
    pub actual: usize,
}

impl Transferred {
    pub(crate) const fn written(requested: usize, actual: usize) -> Self {
        Self { direction: Direction::Write, requested, actual }
    }

    pub(crate) const fn read(requested: usize, actual: usize) -> Self {
        Self { direction: Direction::Read, requested, actual }
    }

    /// Number of bytes actually moved.
    pub const fn len(&self) -> usize {
        self.actual
    }

    pub const fn is_empty(&self) -> bool {
        self.actual == 0
    }

    pub const fn is_complete(&self) -> bool {
        self.actual == self.requested
    }

    /// Returns the short-transfer condition, if any. The caller decides
    /// whether to retry.
    pub const fn short(&self) -> Option<Short> {
        if self.is_complete() {
            return None;
        }
        let (requested, actual) = (self.requested, self.actual);
        Some(match self.direction {
            Direction::Write => Short::Write { requested, actual },
            Direction::Read => Short::Read { requested, actual },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_transfer_has_no_short() {
        let t = Transferred::written(4, 4);
        assert!(t.is_complete());
        assert_eq!(t.short(), None);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn short_read_reports_counts() {
        let t = Transferred::read(6, 2);
        assert_eq!(t.short(), Some(Short::Read { requested: 6, actual: 2 }));
    }
}
