//! Seat ledger: which seats are occupied for each (movie, session).
//!
//! Reserving never checks for conflicts; the order lifecycle does that right
//! before reserving, under the session lock. Releasing seats that are not
//! held is a no-op.

use crate::types::{MovieId, SeatNumber, SessionKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Occupied seats for one screening
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatLedgerEntry {
    /// Movie
    pub movie_id: MovieId,
    /// Screening
    pub session: SessionKey,
    /// Occupied seats
    pub occupied: BTreeSet<SeatNumber>,
    /// Last reserve/release
    pub updated_at: DateTime<Utc>,
}

impl SeatLedgerEntry {
    /// Empty entry, created on first reservation
    #[must_use]
    pub const fn new(movie_id: MovieId, session: SessionKey, at: DateTime<Utc>) -> Self {
        Self {
            movie_id,
            session,
            occupied: BTreeSet::new(),
            updated_at: at,
        }
    }

    /// Marks `seats` occupied
    pub fn reserve<'a>(&mut self, seats: impl IntoIterator<Item = &'a SeatNumber>, at: DateTime<Utc>) {
        self.occupied.extend(seats);
        self.updated_at = at;
    }

    /// Frees `seats`; seats not held are ignored
    pub fn release<'a>(&mut self, seats: impl IntoIterator<Item = &'a SeatNumber>, at: DateTime<Utc>) {
        for seat in seats {
            self.occupied.remove(seat);
        }
        self.updated_at = at;
    }
}

/// Requested seats that appear in `occupied`
#[must_use]
pub fn conflicting_seats(
    occupied: &BTreeSet<SeatNumber>,
    requested: &BTreeSet<SeatNumber>,
) -> BTreeSet<SeatNumber> {
    occupied.intersection(requested).copied().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cinema_core::environment::Clock;
    use cinema_testing::test_clock;
    use proptest::prelude::*;

    fn seat_set(raw: impl IntoIterator<Item = u8>) -> BTreeSet<SeatNumber> {
        raw.into_iter().filter_map(SeatNumber::new).collect()
    }

    fn entry() -> SeatLedgerEntry {
        SeatLedgerEntry::new(MovieId::new(1), SessionKey::new("07:30 PM"), test_clock().now())
    }

    #[test]
    fn test_conflicts_report_overlap_only() {
        let mut ledger = entry();
        ledger.reserve(&seat_set([1, 2, 3]), test_clock().now());

        assert_eq!(conflicting_seats(&ledger.occupied, &seat_set([3, 4])), seat_set([3]));
        assert!(conflicting_seats(&ledger.occupied, &seat_set([10])).is_empty());
    }

    proptest! {
        #[test]
        fn prop_reserved_seats_are_read_back(
            before in proptest::collection::btree_set(0u8..64, 0..30),
            reserved in proptest::collection::btree_set(0u8..64, 1..10),
        ) {
            let mut ledger = entry();
            ledger.reserve(&seat_set(before), test_clock().now());
            let reserved = seat_set(reserved);
            ledger.reserve(&reserved, test_clock().now());

            prop_assert!(ledger.occupied.is_superset(&reserved));
        }

        #[test]
        fn prop_releasing_absent_seats_changes_nothing(
            held in proptest::collection::btree_set(0u8..32, 0..20),
            absent in proptest::collection::btree_set(32u8..64, 0..20),
        ) {
            let mut ledger = entry();
            ledger.reserve(&seat_set(held.clone()), test_clock().now());
            ledger.release(&seat_set(absent), test_clock().now());

            prop_assert_eq!(ledger.occupied, seat_set(held));
        }
    }
}
