//! Priority-ordered table of pending interrupt requests.

use crate::MachineError;

/// Maximum number of distinct outstanding requests.
pub const INTERRUPT_TABLE_CAPACITY: usize = 8;

/// A pending device interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InterruptRequest {
    /// Even, non-zero vector address.
    pub vector: u8,
    /// Bus request level (`0..=7`).
    pub priority: u8,
}

impl InterruptRequest {
    /// Empty-slot sentinel.
    pub const NONE: Self = Self {
        vector: 0,
        priority: 0,
    };

    /// True for the empty-slot sentinel.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.vector == 0
    }
}

/// Fixed-capacity request table, kept sorted by descending priority and,
/// within one priority, ascending vector. Empty slots trail.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterruptController {
    table: [InterruptRequest; INTERRUPT_TABLE_CAPACITY],
}

impl InterruptController {
    /// Empty controller.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            table: [InterruptRequest::NONE; INTERRUPT_TABLE_CAPACITY],
        }
    }

    /// Queues a request. Re-requesting an identical pending entry is a no-op.
    ///
    /// # Errors
    ///
    /// - [`MachineError::ZeroVector`] / [`MachineError::OddVector`] for an
    ///   invalid vector.
    /// - [`MachineError::InterruptTableFull`] when no slot is free.
    pub fn interrupt(&mut self, vector: u8, priority: u8) -> Result<(), MachineError> {
        if vector == 0 {
            return Err(MachineError::ZeroVector);
        }
        if vector & 1 != 0 {
            return Err(MachineError::OddVector {
                vector: u16::from(vector),
            });
        }
        let request = InterruptRequest {
            vector,
            priority: priority & 7,
        };
        if self.table.contains(&request) {
            return Ok(());
        }
        let position = self
            .table
            .iter()
            .position(|slot| {
                slot.is_none()
                    || slot.priority < request.priority
                    || (slot.priority == request.priority && slot.vector > request.vector)
            })
            .unwrap_or(INTERRUPT_TABLE_CAPACITY);
        let full = !self.table[INTERRUPT_TABLE_CAPACITY - 1].is_none();
        if position == INTERRUPT_TABLE_CAPACITY || full {
            return Err(MachineError::InterruptTableFull {
                vector,
                priority: request.priority,
            });
        }
        self.table.copy_within(position..INTERRUPT_TABLE_CAPACITY - 1, position + 1);
        self.table[position] = request;
        log::debug!("interrupt queued: vector {vector:03o} priority {}", request.priority);
        Ok(())
    }

    /// Highest-ranked pending request regardless of processor priority.
    #[must_use]
    pub fn pending(&self) -> Option<InterruptRequest> {
        let head = self.table[0];
        (!head.is_none()).then_some(head)
    }

    /// Head request if its priority strictly exceeds `level`.
    #[must_use]
    pub fn eligible(&self, level: u8) -> Option<InterruptRequest> {
        self.pending().filter(|request| request.priority > level)
    }

    /// Removes and returns the head request.
    pub fn pop(&mut self) -> Option<InterruptRequest> {
        let head = self.pending()?;
        self.table.copy_within(1.., 0);
        self.table[INTERRUPT_TABLE_CAPACITY - 1] = InterruptRequest::NONE;
        Some(head)
    }

    /// Drops every pending request.
    pub fn clear(&mut self) {
        self.table = [InterruptRequest::NONE; INTERRUPT_TABLE_CAPACITY];
    }

    /// Number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.iter().take_while(|slot| !slot.is_none()).count()
    }

    /// True when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending().is_none()
    }

    /// Pending requests in delivery order.
    #[must_use]
    pub fn entries(&self) -> &[InterruptRequest] {
        &self.table[..self.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::{InterruptController, InterruptRequest, INTERRUPT_TABLE_CAPACITY};
    use crate::MachineError;

    fn req(vector: u8, priority: u8) -> InterruptRequest {
        InterruptRequest { vector, priority }
    }

    #[test]
    fn table_orders_by_priority_then_vector() {
        let mut pic = InterruptController::new();
        pic.interrupt(0o100, 6).unwrap();
        pic.interrupt(0o64, 4).unwrap();
        pic.interrupt(0o60, 4).unwrap();
        pic.interrupt(0o220, 5).unwrap();
        assert_eq!(
            pic.entries(),
            &[req(0o100, 6), req(0o220, 5), req(0o60, 4), req(0o64, 4)]
        );
    }

    #[test]
    fn duplicate_requests_are_coalesced() {
        let mut pic = InterruptController::new();
        pic.interrupt(0o100, 6).unwrap();
        pic.interrupt(0o100, 6).unwrap();
        assert_eq!(pic.len(), 1);
    }

    #[test]
    fn invalid_vectors_are_rejected() {
        let mut pic = InterruptController::new();
        assert_eq!(pic.interrupt(0, 4), Err(MachineError::ZeroVector));
        assert_eq!(pic.interrupt(0o61, 4), Err(MachineError::OddVector { vector: 0o61 }));
        assert!(pic.is_empty());
    }

    #[test]
    fn full_table_reports_overflow() {
        let mut pic = InterruptController::new();
        for n in 0..INTERRUPT_TABLE_CAPACITY {
            pic.interrupt(0o10 + 2 * n as u8, 4).unwrap();
        }
        assert_eq!(
            pic.interrupt(0o200, 7),
            Err(MachineError::InterruptTableFull {
                vector: 0o200,
                priority: 7
            })
        );
        assert_eq!(pic.len(), INTERRUPT_TABLE_CAPACITY);
    }

    #[test]
    fn eligibility_requires_strictly_greater_priority() {
        let mut pic = InterruptController::new();
        pic.interrupt(0o60, 4).unwrap();
        assert_eq!(pic.eligible(4), None);
        assert_eq!(pic.eligible(3), Some(req(0o60, 4)));
    }

    #[test]
    fn pop_shifts_remaining_entries_forward() {
        let mut pic = InterruptController::new();
        pic.interrupt(0o60, 4).unwrap();
        pic.interrupt(0o100, 6).unwrap();
        assert_eq!(pic.pop(), Some(req(0o100, 6)));
        assert_eq!(pic.pop(), Some(req(0o60, 4)));
        assert_eq!(pic.pop(), None);
        assert!(pic.is_empty());
    }
}
