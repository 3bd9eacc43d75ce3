//! # Reservation Engine
//!
//! Owns every reservation of a branch. Creation runs the overlap and tier
//! checks; the lifecycle methods drive the state machine and, at check-in
//! and cancellation, the table the reservation points at.
//!
//! ## State Machine
//! ```text
//!   ┌─────────┐ confirm ┌───────────┐ check_in ┌───────────┐ complete ┌───────────┐
//!   │ Pending │ ──────► │ Confirmed │ ───────► │ CheckedIn │ ───────► │ Completed │
//!   └─────────┘         └───────────┘          └───────────┘          └───────────┘
//!        │                 │     │                   │
//!        │                 │     └─ now > start+grace ──► NoShow
//!        │                 │        (check_in or mark_no_shows)
//!        └──── cancel ─────┴──────── cancel ─────────┴──► Cancelled
//!
//!   Terminal: Completed, Cancelled, NoShow
//! ```
//!
//! ## Creation Checks (in order)
//! ```text
//!   1. slot valid (end > start), start not in the past, 1 ≤ guests ≤ capacity
//!   2. member active
//!   3. no overlap with any non-Cancelled reservation on the same table
//!        overlap ⇔ new.start < existing.end && new.end > existing.start
//!   4. active bookings (Pending + Confirmed + CheckedIn) < tier quota
//!   5. duration ≤ tier max hours, whole days until start ≤ tier max days
//! ```
//!
//! ## Late Cancellation
//! Cancelling less than two hours before the start records a penalty of 50%
//! of the table's one-hour charge (room-service fee included for VIP rooms).
//! The penalty is recorded on the cancellation only; nothing is charged.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::member::Member;
use crate::money::Money;
use crate::observer::{NoopObserver, TransitionEvent, TransitionObserver};
use crate::resource::{Floor, Table};
use crate::types::{new_id, EntityKind, Rate, TimeSlot};
use crate::validation::validate_guest_count;
use crate::{GRACE_PERIOD_MINUTES, LATE_CANCEL_PENALTY_BPS, LATE_CANCEL_WINDOW_MINUTES};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    CheckedIn,
    Completed,
    Cancelled,
    NoShow,
}

impl ReservationStatus {
    /// Counts toward the member's booking quota.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending | ReservationStatus::Confirmed | ReservationStatus::CheckedIn
        )
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Holds its slot against new bookings. Only a cancellation frees it.
    pub fn blocks_slot(self) -> bool {
        self != ReservationStatus::Cancelled
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationStatus::Pending => write!(f, "Pending"),
            ReservationStatus::Confirmed => write!(f, "Confirmed"),
            ReservationStatus::CheckedIn => write!(f, "CheckedIn"),
            ReservationStatus::Completed => write!(f, "Completed"),
            ReservationStatus::Cancelled => write!(f, "Cancelled"),
            ReservationStatus::NoShow => write!(f, "NoShow"),
        }
    }
}

/// Why and when a reservation was cancelled, and what it would cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cancellation {
    pub reason: String,
    /// Zero unless cancelled inside the late window.
    pub penalty: Money,
    #[ts(as = "String")]
    pub cancelled_at: DateTime<Utc>,
}

impl Cancellation {
    pub fn is_late(&self) -> bool {
        self.penalty.is_positive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reservation {
    pub id: String,
    pub member_id: String,
    pub table_id: String,
    pub slot: TimeSlot,
    pub guests: u32,
    status: ReservationStatus,
    cancellation: Option<Cancellation>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    /// Set only once the reservation is Cancelled.
    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.cancellation.as_ref()
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.slot.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.slot.end
    }
}

/// Time rules for the reservation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationPolicy {
    /// How long after the start a check-in is still accepted.
    pub grace_period: Duration,
    /// Cancellations closer than this to the start carry a penalty.
    pub late_cancel_window: Duration,
    /// Share of the one-hour table charge charged as penalty.
    pub penalty_rate: Rate,
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self {
            grace_period: Duration::minutes(GRACE_PERIOD_MINUTES),
            late_cancel_window: Duration::minutes(LATE_CANCEL_WINDOW_MINUTES),
            penalty_rate: Rate::from_bps(LATE_CANCEL_PENALTY_BPS),
        }
    }
}

impl ReservationPolicy {
    /// Latest accepted check-in time.
    pub fn check_in_deadline(&self, reservation: &Reservation) -> DateTime<Utc> {
        reservation.start() + self.grace_period
    }

    /// Penalty for cancelling at `now`: zero outside the late window.
    pub fn cancellation_penalty(&self, reservation: &Reservation, table: &Table, now: DateTime<Utc>) -> Money {
        if reservation.slot.lead_time(now) < self.late_cancel_window {
            table.charge_for(1).apply_rate(self.penalty_rate)
        } else {
            Money::zero()
        }
    }
}

// =============================================================================
// Reservation Book
// =============================================================================

/// The authoritative reservation set for one branch.
pub struct ReservationBook {
    reservations: HashMap<String, Reservation>,
    policy: ReservationPolicy,
    observer: Arc<dyn TransitionObserver>,
}

impl Default for ReservationBook {
    fn default() -> Self {
        Self::new(ReservationPolicy::default(), Arc::new(NoopObserver))
    }
}

impl fmt::Debug for ReservationBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReservationBook")
            .field("reservations", &self.reservations.len())
            .field("policy", &self.policy)
            .finish()
    }
}

impl ReservationBook {
    pub fn new(policy: ReservationPolicy, observer: Arc<dyn TransitionObserver>) -> Self {
        Self {
            reservations: HashMap::new(),
            policy,
            observer,
        }
    }

    pub fn policy(&self) -> &ReservationPolicy {
        &self.policy
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn get(&self, id: &str) -> CoreResult<&Reservation> {
        self.reservations
            .get(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Reservation, id))
    }

    /// Reservations on a table, earliest first.
    pub fn for_table(&self, table_id: &str) -> Vec<&Reservation> {
        let mut list: Vec<&Reservation> = self
            .reservations
            .values()
            .filter(|r| r.table_id == table_id)
            .collect();
        list.sort_by_key(|r| r.slot.start);
        list
    }

    /// Reservations of a member, earliest first.
    pub fn for_member(&self, member_id: &str) -> Vec<&Reservation> {
        let mut list: Vec<&Reservation> = self
            .reservations
            .values()
            .filter(|r| r.member_id == member_id)
            .collect();
        list.sort_by_key(|r| r.slot.start);
        list
    }

    /// Pending + Confirmed + CheckedIn reservations of a member.
    pub fn active_booking_count(&self, member_id: &str) -> usize {
        self.reservations
            .values()
            .filter(|r| r.member_id == member_id && r.status.is_active())
            .count()
    }

    /// The first non-Cancelled reservation on `table_id` overlapping `slot`.
    pub fn find_conflict(&self, table_id: &str, slot: &TimeSlot) -> Option<&Reservation> {
        self.reservations
            .values()
            .filter(|r| r.table_id == table_id && r.status.blocks_slot())
            .filter(|r| r.slot.overlaps(slot))
            .min_by_key(|r| r.slot.start)
    }

    pub fn is_table_available(&self, table_id: &str, slot: &TimeSlot) -> bool {
        self.find_conflict(table_id, slot).is_none()
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Books `table` for `member` over `[start, end)`. The reservation is
    /// created Pending.
    pub fn create(
        &mut self,
        member: &Member,
        table: &Table,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        guests: u32,
        now: DateTime<Utc>,
    ) -> CoreResult<Reservation> {
        let slot = TimeSlot::new(start, end)?;
        if start < now {
            return Err(ValidationError::StartInPast {
                start: start.to_rfc3339(),
            }
            .into());
        }
        validate_guest_count(guests, table.capacity)?;

        if !member.is_active() {
            return Err(CoreError::invalid_state(EntityKind::Member, &member.id, "inactive", "book a table"));
        }

        if let Some(existing) = self.find_conflict(&table.id, &slot) {
            return Err(CoreError::Conflict {
                table_id: table.id.clone(),
                existing_id: existing.id.clone(),
            });
        }

        let limits = member.booking_limits();
        limits.check_quota(&member.id, self.active_booking_count(&member.id))?;
        limits.check_window(&member.id, slot.duration(), slot.lead_time(now))?;

        let reservation = Reservation {
            id: new_id(),
            member_id: member.id.clone(),
            table_id: table.id.clone(),
            slot,
            guests,
            status: ReservationStatus::Pending,
            cancellation: None,
            created_at: now,
        };
        self.reservations.insert(reservation.id.clone(), reservation.clone());

        self.observer.on_transition(
            &TransitionEvent::new(
                EntityKind::Reservation,
                reservation.id.as_str(),
                None,
                ReservationStatus::Pending.to_string(),
                now,
            )
            .with_detail(format!("table {} for {} guests", reservation.table_id, guests)),
        );
        Ok(reservation)
    }

    /// Pending → Confirmed.
    pub fn confirm(&mut self, id: &str, now: DateTime<Utc>) -> CoreResult<()> {
        self.advance(id, ReservationStatus::Pending, ReservationStatus::Confirmed, "confirm", now)
    }

    /// CheckedIn → Completed. The table is left to the bill.
    pub fn complete(&mut self, id: &str, now: DateTime<Utc>) -> CoreResult<()> {
        self.advance(id, ReservationStatus::CheckedIn, ReservationStatus::Completed, "complete", now)
    }

    /// Confirmed → CheckedIn, seating the party at the reserved table. The
    /// table may be Available or already held for the booking.
    ///
    /// Past `start + grace` the reservation becomes NoShow and the call
    /// returns [`CoreError::GracePeriodExpired`]; the NoShow stays. If the
    /// table cannot be assigned the reservation stays Confirmed.
    pub fn check_in(&mut self, id: &str, floor: &mut Floor, now: DateTime<Utc>) -> CoreResult<()> {
        let reservation = self.get(id)?;
        if reservation.status != ReservationStatus::Confirmed {
            return Err(CoreError::invalid_state(
                EntityKind::Reservation,
                id,
                reservation.status,
                "check in",
            ));
        }

        let deadline = self.policy.check_in_deadline(reservation);
        let table_id = reservation.table_id.clone();
        let guests = reservation.guests;

        if now > deadline {
            self.set_status(id, ReservationStatus::NoShow, now, Some(format!("deadline {}", deadline)))?;
            return Err(CoreError::GracePeriodExpired {
                reservation_id: id.to_string(),
                deadline,
            });
        }

        floor.seat_reserved(&table_id, guests, now)?;
        self.set_status(id, ReservationStatus::CheckedIn, now, Some(format!("table {}", table_id)))
    }

    /// Cancels a Pending, Confirmed or CheckedIn reservation.
    ///
    /// A CheckedIn party's table is cleared unless an order is still open on
    /// it. An already terminal reservation is rejected and keeps its
    /// original cancellation.
    pub fn cancel(
        &mut self,
        id: &str,
        reason: &str,
        floor: &mut Floor,
        now: DateTime<Utc>,
    ) -> CoreResult<Cancellation> {
        let reservation = self.get(id)?;
        if reservation.status.is_terminal() {
            return Err(CoreError::invalid_state(
                EntityKind::Reservation,
                id,
                reservation.status,
                "cancel",
            ));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::Required {
                field: "cancellation reason".to_string(),
            }
            .into());
        }

        let table = floor.table(&reservation.table_id)?;
        let penalty = self.policy.cancellation_penalty(reservation, table, now);
        let release_table = reservation.status == ReservationStatus::CheckedIn && table.active_order().is_none();
        let table_id = reservation.table_id.clone();

        if release_table {
            floor.clear_table(&table_id, now)?;
        }

        let cancellation = Cancellation {
            reason: reason.to_string(),
            penalty,
            cancelled_at: now,
        };
        if let Some(r) = self.reservations.get_mut(id) {
            r.cancellation = Some(cancellation.clone());
        }
        self.set_status(id, ReservationStatus::Cancelled, now, Some(format!("penalty {}", penalty)))?;
        Ok(cancellation)
    }

    /// Moves every Confirmed reservation past its check-in deadline to
    /// NoShow. Returns the affected ids.
    pub fn mark_no_shows(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let grace = self.policy.grace_period;
        let mut overdue: Vec<(DateTime<Utc>, String)> = self
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Confirmed && now > r.start() + grace)
            .map(|r| (r.start(), r.id.clone()))
            .collect();
        overdue.sort();

        let mut marked = Vec::with_capacity(overdue.len());
        for (_, id) in overdue {
            if self.set_status(&id, ReservationStatus::NoShow, now, None).is_ok() {
                marked.push(id);
            }
        }
        marked
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn advance(
        &mut self,
        id: &str,
        from: ReservationStatus,
        to: ReservationStatus,
        operation: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        let current = self.get(id)?.status;
        if current != from {
            return Err(CoreError::invalid_state(EntityKind::Reservation, id, current, operation));
        }
        self.set_status(id, to, now, None)
    }

    fn set_status(
        &mut self,
        id: &str,
        to: ReservationStatus,
        now: DateTime<Utc>,
        detail: Option<String>,
    ) -> CoreResult<()> {
        let reservation = self
            .reservations
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Reservation, id))?;
        let from = reservation.status;
        reservation.status = to;

        let mut event = TransitionEvent::new(
            EntityKind::Reservation,
            id,
            Some(from.to_string()),
            to.to_string(),
            now,
        );
        event.detail = detail;
        self.observer.on_transition(&event);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::testing::RecordingObserver;
    use crate::resource::TableStatus;
    use crate::tier::BookingLimit;
    use chrono::TimeZone;

    /// 12:00 on the test day.
    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
    }

    fn member(id: &str, spend: i64) -> Member {
        Member::new(id, "Alice", noon())
            .unwrap()
            .with_history(Money::from_major(spend), 0)
            .unwrap()
    }

    fn silver() -> Member {
        member("MEM001", 2_000)
    }

    fn platinum() -> Member {
        member("MEM002", 20_000)
    }

    fn t001() -> Table {
        Table::new("T001", "Table 1", 4, Money::from_major(50)).unwrap()
    }

    fn setup() -> (ReservationBook, Floor, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        let book = ReservationBook::new(ReservationPolicy::default(), observer.clone());
        let mut floor = Floor::default();
        floor.add_table(t001()).unwrap();
        floor
            .add_table(Table::vip("VIP01", "VIP Room Alpha", 8, Money::from_major(100), Money::from_major(300)).unwrap())
            .unwrap();
        (book, floor, observer)
    }

    fn confirmed(book: &mut ReservationBook, member: &Member, table: &Table, start: u32, end: u32) -> Reservation {
        let r = book.create(member, table, at(start), at(end), 2, noon()).unwrap();
        book.confirm(&r.id, noon()).unwrap();
        r
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    #[test]
    fn test_overlap_rejected_back_to_back_allowed() {
        let (mut book, _, _) = setup();
        let existing = confirmed(&mut book, &platinum(), &t001(), 14, 16);

        let err = book.create(&platinum(), &t001(), at(15), at(17), 2, noon()).unwrap_err();
        match err {
            CoreError::Conflict { table_id, existing_id } => {
                assert_eq!(table_id, "T001");
                assert_eq!(existing_id, existing.id);
            }
            other => panic!("expected Conflict, got {other:?}"),
        }

        let next = book.create(&platinum(), &t001(), at(16), at(18), 2, noon()).unwrap();
        assert_eq!(next.status(), ReservationStatus::Pending);
    }

    #[test]
    fn test_other_table_is_independent() {
        let (mut book, floor, _) = setup();
        confirmed(&mut book, &platinum(), &t001(), 14, 16);
        let vip = floor.table("VIP01").unwrap();
        assert!(book.create(&platinum(), vip, at(14), at(16), 6, noon()).is_ok());
    }

    #[test]
    fn test_cancelled_slot_can_be_rebooked() {
        let (mut book, mut floor, _) = setup();
        let r = confirmed(&mut book, &platinum(), &t001(), 14, 16);
        book.cancel(&r.id, "Plans changed", &mut floor, noon()).unwrap();
        assert!(book.is_table_available("T001", &TimeSlot::new(at(14), at(16)).unwrap()));
        assert!(book.create(&platinum(), &t001(), at(15), at(17), 2, noon()).is_ok());
    }

    #[test]
    fn test_no_show_still_blocks_its_slot() {
        let (mut book, mut floor, _) = setup();
        let r = confirmed(&mut book, &platinum(), &t001(), 14, 16);
        assert!(book.check_in(&r.id, &mut floor, at(15)).is_err());
        assert_eq!(book.get(&r.id).unwrap().status(), ReservationStatus::NoShow);

        let err = book.create(&platinum(), &t001(), at(15), at(16), 2, at(15)).unwrap_err();
        assert!(matches!(err, CoreError::Conflict { .. }));
    }

    #[test]
    fn test_active_reservations_never_overlap() {
        let (mut book, _, _) = setup();
        let member = platinum();
        for (start, end) in [(12, 14), (13, 15), (14, 16), (15, 17), (16, 18), (17, 19)] {
            if let Ok(r) = book.create(&member, &t001(), at(start), at(end), 2, noon()) {
                book.confirm(&r.id, noon()).unwrap();
            }
        }

        let live: Vec<&Reservation> = book
            .for_table("T001")
            .into_iter()
            .filter(|r| r.status().is_active())
            .collect();
        assert_eq!(live.len(), 3);
        for (i, a) in live.iter().enumerate() {
            for b in &live[i + 1..] {
                assert!(!a.slot.overlaps(&b.slot));
            }
        }
    }

    #[test]
    fn test_guest_count_validation() {
        let (mut book, _, _) = setup();
        for capacity in 1..=10 {
            let table = Table::new("T100", "Big", capacity, Money::from_major(50)).unwrap();
            let err = book
                .create(&platinum(), &table, at(14), at(16), capacity + 1, noon())
                .unwrap_err();
            assert!(matches!(
                err,
                CoreError::Validation(ValidationError::ExceedsCapacity { .. })
            ));
        }
        assert!(matches!(
            book.create(&platinum(), &t001(), at(14), at(16), 0, noon()),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_time_range_validation() {
        let (mut book, _, _) = setup();
        assert!(matches!(
            book.create(&platinum(), &t001(), at(16), at(14), 2, noon()),
            Err(CoreError::Validation(ValidationError::InvalidTimeRange { .. }))
        ));
        assert!(matches!(
            book.create(&platinum(), &t001(), at(14), at(14), 2, noon()),
            Err(CoreError::Validation(ValidationError::InvalidTimeRange { .. }))
        ));
        assert!(matches!(
            book.create(&platinum(), &t001(), at(10), at(11), 2, noon()),
            Err(CoreError::Validation(ValidationError::StartInPast { .. }))
        ));
    }

    #[test]
    fn test_member_without_tier_cannot_book() {
        let (mut book, _, _) = setup();
        let err = book
            .create(&member("MEM009", 0), &t001(), at(14), at(15), 2, noon())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::QuotaExceeded {
                limit: BookingLimit::ActiveBookings,
                allowed: 0,
                requested: 1,
                ..
            }
        ));
        assert!(book.is_empty());
    }

    #[test]
    fn test_inactive_member_cannot_book() {
        let (mut book, _, _) = setup();
        let mut m = platinum();
        m.deactivate();
        assert!(matches!(
            book.create(&m, &t001(), at(14), at(15), 2, noon()),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_quota_counts_only_active_bookings() {
        let (mut book, mut floor, _) = setup();
        let m = silver();
        let first = book.create(&m, &t001(), at(13), at(14), 2, noon()).unwrap();
        book.create(&m, &t001(), at(14), at(15), 2, noon()).unwrap();
        assert_eq!(book.active_booking_count("MEM001"), 2);

        let err = book.create(&m, &t001(), at(15), at(16), 2, noon()).unwrap_err();
        assert!(matches!(err, CoreError::QuotaExceeded { allowed: 2, requested: 3, .. }));

        book.cancel(&first.id, "Cannot make it", &mut floor, noon()).unwrap();
        assert_eq!(book.active_booking_count("MEM001"), 1);
        assert!(book.create(&m, &t001(), at(15), at(16), 2, noon()).is_ok());
    }

    #[test]
    fn test_duration_and_advance_limits() {
        let (mut book, _, _) = setup();
        let m = silver();

        let err = book.create(&m, &t001(), at(13), at(16), 2, noon()).unwrap_err();
        assert!(matches!(err, CoreError::QuotaExceeded { limit: BookingLimit::Duration, .. }));

        let in_seven_days = noon() + Duration::days(7) + Duration::hours(1);
        assert!(book
            .create(&m, &t001(), in_seven_days, in_seven_days + Duration::hours(2), 2, noon())
            .is_ok());

        let in_eight_days = noon() + Duration::days(8);
        let err = book
            .create(&m, &t001(), in_eight_days, in_eight_days + Duration::hours(1), 2, noon())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::QuotaExceeded {
                limit: BookingLimit::AdvanceWindow,
                allowed: 7,
                requested: 8,
                ..
            }
        ));
    }

    #[test]
    fn test_duration_limit_counts_seconds() {
        let (mut book, _, _) = setup();
        let m = silver();
        let start = at(14);

        let err = book
            .create(&m, &t001(), start, start + Duration::hours(2) + Duration::seconds(59), 2, noon())
            .unwrap_err();
        assert!(matches!(err, CoreError::QuotaExceeded { limit: BookingLimit::Duration, .. }));
        assert!(book.create(&m, &t001(), start, start + Duration::hours(2), 2, noon()).is_ok());
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    #[test]
    fn test_confirm_only_from_pending() {
        let (mut book, _, _) = setup();
        let r = book.create(&platinum(), &t001(), at(14), at(16), 2, noon()).unwrap();
        book.confirm(&r.id, noon()).unwrap();
        assert!(matches!(book.confirm(&r.id, noon()), Err(CoreError::InvalidState { .. })));
        assert!(matches!(book.confirm("nope", noon()), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn test_check_in_seats_the_party() {
        let (mut book, mut floor, observer) = setup();
        let r = confirmed(&mut book, &platinum(), &t001(), 14, 16);

        book.check_in(&r.id, &mut floor, at(14) + Duration::minutes(15)).unwrap();
        assert_eq!(book.get(&r.id).unwrap().status(), ReservationStatus::CheckedIn);

        let table = floor.table("T001").unwrap();
        assert_eq!(table.status(), TableStatus::Occupied);
        assert_eq!(table.party_size(), Some(2));

        book.complete(&r.id, at(16)).unwrap();
        assert_eq!(book.get(&r.id).unwrap().status(), ReservationStatus::Completed);
        assert!(observer.targets().contains(&format!("{}:Completed", r.id)));
    }

    #[test]
    fn test_check_in_takes_a_held_table() {
        let (mut book, mut floor, _) = setup();
        let r = confirmed(&mut book, &silver(), &t001(), 14, 16);
        floor.hold("T001", at(13) + Duration::minutes(50)).unwrap();

        book.check_in(&r.id, &mut floor, at(14) + Duration::minutes(5)).unwrap();
        assert_eq!(book.get(&r.id).unwrap().status(), ReservationStatus::CheckedIn);
        assert_eq!(floor.table("T001").unwrap().status(), TableStatus::Occupied);
    }

    #[test]
    fn test_check_in_requires_confirmation() {
        let (mut book, mut floor, _) = setup();
        let r = book.create(&platinum(), &t001(), at(14), at(16), 2, noon()).unwrap();
        assert!(matches!(
            book.check_in(&r.id, &mut floor, at(14)),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(floor.table("T001").unwrap().is_available());
    }

    #[test]
    fn test_late_check_in_becomes_no_show() {
        let (mut book, mut floor, _) = setup();
        let r = confirmed(&mut book, &platinum(), &t001(), 14, 16);

        let err = book
            .check_in(&r.id, &mut floor, at(14) + Duration::minutes(16))
            .unwrap_err();
        match err {
            CoreError::GracePeriodExpired { deadline, .. } => {
                assert_eq!(deadline, at(14) + Duration::minutes(15));
            }
            other => panic!("expected GracePeriodExpired, got {other:?}"),
        }
        assert_eq!(book.get(&r.id).unwrap().status(), ReservationStatus::NoShow);
        assert!(floor.table("T001").unwrap().is_available());
        assert_eq!(book.active_booking_count("MEM002"), 0);
    }

    #[test]
    fn test_failed_table_assignment_keeps_confirmed() {
        let (mut book, mut floor, _) = setup();
        let r = confirmed(&mut book, &platinum(), &t001(), 14, 16);
        floor.seat("T001", 3, at(13)).unwrap();

        let err = book.check_in(&r.id, &mut floor, at(14)).unwrap_err();
        assert!(matches!(err, CoreError::ResourceUnavailable { .. }));
        assert_eq!(book.get(&r.id).unwrap().status(), ReservationStatus::Confirmed);
    }

    #[test]
    fn test_late_cancellation_penalty() {
        let (mut book, mut floor, _) = setup();
        let start = noon() + Duration::minutes(30);
        let r = book
            .create(&platinum(), &t001(), start, start + Duration::hours(2), 2, noon())
            .unwrap();
        book.confirm(&r.id, noon()).unwrap();

        let cancellation = book.cancel(&r.id, "Running late", &mut floor, noon()).unwrap();
        assert_eq!(cancellation.penalty, Money::from_major(25));
        assert!(cancellation.is_late());
        assert_eq!(
            book.get(&r.id).unwrap().cancellation().map(|c| c.penalty),
            Some(Money::from_major(25))
        );
    }

    #[test]
    fn test_early_cancellation_is_free() {
        let (mut book, mut floor, _) = setup();
        let r = confirmed(&mut book, &platinum(), &t001(), 14, 16);
        let cancellation = book.cancel(&r.id, "Plans changed", &mut floor, noon()).unwrap();
        assert!(cancellation.penalty.is_zero());
        assert!(!cancellation.is_late());
    }

    #[test]
    fn test_vip_penalty_includes_room_service() {
        let (mut book, mut floor, _) = setup();
        let vip = floor.table("VIP01").unwrap().clone();
        let start = noon() + Duration::hours(1);
        let r = book
            .create(&platinum(), &vip, start, start + Duration::hours(2), 6, noon())
            .unwrap();

        let cancellation = book.cancel(&r.id, "Guests sick", &mut floor, noon()).unwrap();
        // 50% of (฿100 + ฿300)
        assert_eq!(cancellation.penalty, Money::from_major(200));
    }

    #[test]
    fn test_second_cancel_fails_and_keeps_reason() {
        let (mut book, mut floor, _) = setup();
        let r = confirmed(&mut book, &platinum(), &t001(), 14, 16);
        book.cancel(&r.id, "First reason", &mut floor, noon()).unwrap();

        let err = book.cancel(&r.id, "Second reason", &mut floor, noon()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));
        let stored = book.get(&r.id).unwrap().cancellation().unwrap();
        assert_eq!(stored.reason, "First reason");
    }

    #[test]
    fn test_cancel_not_allowed_after_completion_or_no_show() {
        let (mut book, mut floor, _) = setup();
        let done = confirmed(&mut book, &platinum(), &t001(), 14, 16);
        book.check_in(&done.id, &mut floor, at(14)).unwrap();
        book.complete(&done.id, at(16)).unwrap();
        assert!(book.cancel(&done.id, "Too late now", &mut floor, at(16)).is_err());

        let missed = confirmed(&mut book, &platinum(), &t001(), 17, 18);
        book.mark_no_shows(at(18));
        assert_eq!(book.get(&missed.id).unwrap().status(), ReservationStatus::NoShow);
        assert!(book.cancel(&missed.id, "Too late now", &mut floor, at(18)).is_err());
    }

    #[test]
    fn test_cancel_requires_reason() {
        let (mut book, mut floor, _) = setup();
        let r = confirmed(&mut book, &platinum(), &t001(), 14, 16);
        assert!(matches!(
            book.cancel(&r.id, "  ", &mut floor, noon()),
            Err(CoreError::Validation(_))
        ));
        assert_eq!(book.get(&r.id).unwrap().status(), ReservationStatus::Confirmed);
    }

    #[test]
    fn test_cancel_after_check_in_frees_idle_table() {
        let (mut book, mut floor, _) = setup();
        let r = confirmed(&mut book, &platinum(), &t001(), 14, 16);
        book.check_in(&r.id, &mut floor, at(14)).unwrap();

        book.cancel(&r.id, "Party left early", &mut floor, at(14)).unwrap();
        assert!(floor.table("T001").unwrap().is_available());
    }

    #[test]
    fn test_mark_no_shows_only_touches_overdue_confirmed() {
        let (mut book, _, _) = setup();
        let m = platinum();
        let overdue = confirmed(&mut book, &m, &t001(), 13, 14);
        let future = confirmed(&mut book, &m, &t001(), 15, 16);
        let pending = book.create(&m, &t001(), at(12), at(13), 2, noon()).unwrap();

        let marked = book.mark_no_shows(at(13) + Duration::minutes(20));
        assert_eq!(marked, vec![overdue.id.clone()]);
        assert_eq!(book.get(&future.id).unwrap().status(), ReservationStatus::Confirmed);
        assert_eq!(book.get(&pending.id).unwrap().status(), ReservationStatus::Pending);
    }

    #[test]
    fn test_member_listing_is_chronological() {
        let (mut book, _, _) = setup();
        let m = platinum();
        book.create(&m, &t001(), at(16), at(17), 2, noon()).unwrap();
        book.create(&m, &t001(), at(13), at(14), 2, noon()).unwrap();
        let starts: Vec<DateTime<Utc>> = book.for_member("MEM002").iter().map(|r| r.start()).collect();
        assert_eq!(starts, vec![at(13), at(16)]);
    }
}
