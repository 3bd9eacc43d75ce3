//! # Member
//!
//! One record per loyalty member holding raw spend and points. The tier is
//! never stored: every accessor recomputes it from spend through
//! [`crate::tier`], so spend and tier cannot drift apart.
//!
//! ```text
//!  Payment completed (฿240.75, member Silver)
//!        │
//!        ▼
//!  Member::credit(total, now)
//!    ├── tier_before = tier_for_spend(spend)      ◄── multiplier taken here
//!    ├── points     += points_earned(total, tier_before.multiplier)
//!    ├── spend      += total                      ◄── tier may upgrade now
//!    └── visits.push(Visit { at: now, amount: total })
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::tier::{benefits_for, points_earned, tier_for_spend, BookingLimits, Tier, TierBenefits};
use crate::types::{EntityKind, Rate};
use crate::validation::{validate_identifier, validate_name};

/// A loyalty member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Member {
    pub id: String,
    pub name: String,
    /// Lifetime spend; only ever increases.
    lifetime_spend: Money,
    points: i64,
    active: bool,
    #[ts(as = "String")]
    pub joined_at: DateTime<Utc>,
    /// One entry per credited payment, oldest first.
    #[serde(default)]
    visits: Vec<Visit>,
}

/// A paid visit as recorded against the member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Visit {
    #[ts(as = "String")]
    pub at: DateTime<Utc>,
    pub amount: Money,
}

/// Result of crediting a completed payment to a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Credit {
    pub amount: Money,
    pub points: i64,
    pub tier_before: Option<Tier>,
    pub tier_after: Option<Tier>,
}

impl Credit {
    pub fn upgraded(&self) -> bool {
        self.tier_after > self.tier_before
    }
}

impl Member {
    pub fn new(id: impl Into<String>, name: impl Into<String>, joined_at: DateTime<Utc>) -> CoreResult<Self> {
        let id = id.into();
        let name = name.into();
        validate_identifier("member id", &id)?;
        validate_name("member name", &name)?;

        Ok(Self {
            id,
            name,
            lifetime_spend: Money::zero(),
            points: 0,
            active: true,
            joined_at,
            visits: Vec::new(),
        })
    }

    /// Seeds a member with existing history (imports, demos, tests).
    pub fn with_history(mut self, spend: Money, points: i64) -> CoreResult<Self> {
        if spend.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "lifetime spend".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }
        if points < 0 {
            return Err(ValidationError::OutOfRange {
                field: "points".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }
        self.lifetime_spend = spend;
        self.points = points;
        Ok(self)
    }

    pub fn lifetime_spend(&self) -> Money {
        self.lifetime_spend
    }

    pub fn points(&self) -> i64 {
        self.points
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    pub fn visit_count(&self) -> usize {
        self.visits.len()
    }

    pub fn last_visit(&self) -> Option<&Visit> {
        self.visits.last()
    }

    // -------------------------------------------------------------------------
    // Derived from spend
    // -------------------------------------------------------------------------

    pub fn tier(&self) -> Option<Tier> {
        tier_for_spend(self.lifetime_spend)
    }

    pub fn benefits(&self) -> TierBenefits {
        benefits_for(self.tier())
    }

    pub fn discount_rate(&self) -> Rate {
        self.benefits().discount_rate
    }

    pub fn points_multiplier(&self) -> Rate {
        self.benefits().points_multiplier
    }

    pub fn booking_limits(&self) -> BookingLimits {
        self.benefits().limits
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Credits a completed payment: points at the pre-credit tier, then spend,
    /// then a visit entry. Deactivation does not stop a bill from settling.
    pub fn credit(&mut self, amount: Money, at: DateTime<Utc>) -> CoreResult<Credit> {
        if amount.is_negative() {
            return Err(ValidationError::MustBePositive {
                field: "credit amount".to_string(),
            }
            .into());
        }

        let tier_before = self.tier();
        let points = points_earned(amount, benefits_for(tier_before).points_multiplier);
        self.points += points;
        self.lifetime_spend += amount;
        self.visits.push(Visit { at, amount });

        Ok(Credit {
            amount,
            points,
            tier_before,
            tier_after: self.tier(),
        })
    }

    /// Spends loyalty points. Returns the remaining balance.
    pub fn redeem_points(&mut self, amount: i64) -> CoreResult<i64> {
        if amount <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "redemption amount".to_string(),
            }
            .into());
        }
        if amount > self.points {
            return Err(ValidationError::OutOfRange {
                field: "redemption amount".to_string(),
                min: 1,
                max: self.points,
            }
            .into());
        }
        self.points -= amount;
        Ok(self.points)
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn reactivate(&mut self) {
        self.active = true;
    }
}

// =============================================================================
// Directory
// =============================================================================

/// The branch's members, keyed by id. Identity only; credentials live
/// elsewhere.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberDirectory {
    members: BTreeMap<String, Member>,
}

impl MemberDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, member: Member) -> CoreResult<()> {
        if self.members.contains_key(&member.id) {
            return Err(ValidationError::Duplicate {
                field: "member id".to_string(),
                value: member.id,
            }
            .into());
        }
        self.members.insert(member.id.clone(), member);
        Ok(())
    }

    pub fn get(&self, id: &str) -> CoreResult<&Member> {
        self.members
            .get(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Member, id))
    }

    pub fn get_mut(&mut self, id: &str) -> CoreResult<&mut Member> {
        self.members
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Member, id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn member(spend: i64) -> Member {
        Member::new("MEM001", "Alice", Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
            .unwrap()
            .with_history(Money::from_major(spend), 0)
            .unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_tier_is_derived_from_spend() {
        assert_eq!(member(0).tier(), None);
        assert_eq!(member(2_000).tier(), Some(Tier::Silver));
        assert_eq!(member(2_000).discount_rate().bps(), 500);
        assert_eq!(member(8_000).points_multiplier().bps(), 15_000);
        assert_eq!(member(25_000).booking_limits().max_active_bookings, 6);
        assert!(!member(0).booking_limits().allows_booking());
    }

    #[test]
    fn test_credit_uses_tier_before_the_credit() {
        // ฿7,000 spend (Silver, 1.0×) + ฿1,000 → crosses into Gold
        let mut m = member(7_000);
        let credit = m.credit(Money::from_major(1_000), at(14)).unwrap();

        assert_eq!(credit.points, 100);
        assert_eq!(credit.tier_before, Some(Tier::Silver));
        assert_eq!(credit.tier_after, Some(Tier::Gold));
        assert!(credit.upgraded());
        assert_eq!(m.points(), 100);
        assert_eq!(m.lifetime_spend(), Money::from_major(8_000));

        // next payment earns at Gold
        let credit = m.credit(Money::from_major(1_000), at(18)).unwrap();
        assert_eq!(credit.points, 150);
        assert!(!credit.upgraded());
    }

    #[test]
    fn test_inactive_member_is_still_credited() {
        let mut m = member(0);
        m.deactivate();
        let credit = m.credit(Money::from_major(100), at(14)).unwrap();

        assert_eq!(credit.points, 0);
        assert_eq!(m.lifetime_spend(), Money::from_major(100));
        assert_eq!(m.visit_count(), 1);
        assert!(!m.is_active());
    }

    #[test]
    fn test_credit_records_visits_in_order() {
        let mut m = member(2_000);
        assert!(m.visits().is_empty());
        assert!(m.last_visit().is_none());

        m.credit(Money::from_major(240), at(12)).unwrap();
        m.credit(Money::from_major(90), at(19)).unwrap();

        assert_eq!(
            m.visits(),
            &[
                Visit { at: at(12), amount: Money::from_major(240) },
                Visit { at: at(19), amount: Money::from_major(90) },
            ]
        );
        assert_eq!(m.last_visit().map(|v| v.amount), Some(Money::from_major(90)));

        // a rejected credit leaves no visit behind
        assert!(m.credit(Money::from_cents(-1), at(20)).is_err());
        assert_eq!(m.visit_count(), 2);
    }

    #[test]
    fn test_redeem_points() {
        let mut m = member(0).with_history(Money::zero(), 50).unwrap();
        assert_eq!(m.redeem_points(20).unwrap(), 30);
        assert!(m.redeem_points(31).is_err());
        assert!(m.redeem_points(0).is_err());
        assert_eq!(m.points(), 30);
    }

    #[test]
    fn test_directory() {
        let mut directory = MemberDirectory::new();
        directory.register(member(0)).unwrap();
        assert!(directory.register(member(100)).is_err());
        assert_eq!(directory.len(), 1);
        assert!(directory.get("MEM001").is_ok());
        assert!(matches!(directory.get("MEM404"), Err(CoreError::NotFound { .. })));

        directory.get_mut("MEM001").unwrap().deactivate();
        assert!(!directory.get("MEM001").unwrap().is_active());
    }

    #[test]
    fn test_history_rejects_negative_values() {
        assert!(member(0).with_history(Money::from_cents(-1), 0).is_err());
        assert!(member(0).with_history(Money::zero(), -1).is_err());
    }
}
