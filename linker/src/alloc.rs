use crate::error::AddressSpaceKind;
use crate::error::LinkError;
use std::ops::Range;

/// Hands out contiguous, non-overlapping blocks of a bounded index space, in order.
#[derive(Debug, Clone)]
pub struct AddressSpace {
    kind: AddressSpaceKind,
    next: usize,
    limit: usize,
}

impl AddressSpace {
    pub fn new(kind: AddressSpaceKind, limit: usize) -> Self {
        Self {
            kind,
            next: 0,
            limit,
        }
    }

    pub fn used(&self) -> usize {
        self.next
    }

    /// Reserves the next `len` indices for `unit`. Reserving zero indices is allowed and returns
    /// an empty range at the current position.
    pub fn reserve(&mut self, unit: &str, len: usize) -> Result<Range<usize>, LinkError> {
        let end = self
            .next
            .checked_add(len)
            .filter(|end| *end <= self.limit)
            .ok_or_else(|| LinkError::AddressSpaceOverflow {
                unit: unit.to_string(),
                space: self.kind,
                used: self.next,
                requested: len,
                limit: self.limit,
            })?;

        let block = self.next..end;
        self.next = end;

        Ok(block)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn blocks_are_contiguous_and_disjoint() {
        let mut space = AddressSpace::new(AddressSpaceKind::Globals, 100);

        let a = space.reserve("A", 2).unwrap();
        let empty = space.reserve("B", 0).unwrap();
        let c = space.reserve("C", 5).unwrap();

        assert_eq!(0..2, a);
        assert_eq!(2..2, empty);
        assert_eq!(2..7, c);
        assert_eq!(7, space.used());
    }

    #[test]
    fn reserving_past_limit_fails_without_moving() {
        let mut space = AddressSpace::new(AddressSpaceKind::Code, 10);
        space.reserve("A", 8).unwrap();

        let err = space.reserve("B", 3).unwrap_err();
        match err {
            LinkError::AddressSpaceOverflow { unit, used, requested, limit, .. } => {
                assert_eq!("B", unit);
                assert_eq!(8, used);
                assert_eq!(3, requested);
                assert_eq!(10, limit);
            }
            other => panic!("expected overflow, got {:?}", other),
        }

        // exactly filling the space is fine
        assert_eq!(8..10, space.reserve("B", 2).unwrap());
    }

    #[test]
    fn arithmetic_overflow_is_reported() {
        let mut space = AddressSpace::new(AddressSpaceKind::Code, usize::MAX);
        space.reserve("A", 1).unwrap();

        assert!(space.reserve("B", usize::MAX).is_err());
    }
}
