//! Resource ledger and the action-point budget.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named resource on the organisation ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Money,
    Compute,
    Research,
    Papers,
    Reputation,
}

impl ResourceKind {
    pub const ALL: [Self; 5] = [
        Self::Money,
        Self::Compute,
        Self::Research,
        Self::Papers,
        Self::Reputation,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Money => "money",
            Self::Compute => "compute",
            Self::Research => "research",
            Self::Papers => "papers",
            Self::Reputation => "reputation",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// Current resource totals. Money may go negative (bankruptcy check happens
/// on salary day); every other resource is floored at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Resources {
    pub money: f64,
    pub compute: f64,
    pub research: f64,
    pub papers: f64,
    pub reputation: f64,
}

impl Resources {
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Money => self.money,
            ResourceKind::Compute => self.compute,
            ResourceKind::Research => self.research,
            ResourceKind::Papers => self.papers,
            ResourceKind::Reputation => self.reputation,
        }
    }

    fn slot_mut(&mut self, kind: ResourceKind) -> &mut f64 {
        match kind {
            ResourceKind::Money => &mut self.money,
            ResourceKind::Compute => &mut self.compute,
            ResourceKind::Research => &mut self.research,
            ResourceKind::Papers => &mut self.papers,
            ResourceKind::Reputation => &mut self.reputation,
        }
    }

    /// Add a signed delta, flooring non-money resources at zero.
    pub fn adjust(&mut self, kind: ResourceKind, amount: f64) {
        let slot = self.slot_mut(kind);
        *slot += amount;
        if kind != ResourceKind::Money && *slot < 0.0 {
            *slot = 0.0;
        }
    }

    /// First resource the cost cannot be paid from, if any.
    #[must_use]
    pub fn shortfall(&self, cost: &ResourceCost) -> Option<(ResourceKind, f64, f64)> {
        ResourceKind::ALL.into_iter().find_map(|kind| {
            let needed = cost.get(kind);
            let available = self.get(kind);
            (needed > 0.0 && available < needed).then_some((kind, needed, available))
        })
    }

    /// Deduct a cost. Callers check [`Self::shortfall`] first.
    pub fn pay(&mut self, cost: &ResourceCost) {
        for kind in ResourceKind::ALL {
            let amount = cost.get(kind);
            if amount > 0.0 {
                *self.slot_mut(kind) -= amount;
            }
        }
    }

    #[must_use]
    pub fn minus(mut self, cost: &ResourceCost) -> Self {
        self.pay(cost);
        self
    }
}

/// Non-negative resource price attached to an action or event option.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ResourceCost {
    #[serde(default)]
    pub money: f64,
    #[serde(default)]
    pub compute: f64,
    #[serde(default)]
    pub research: f64,
    #[serde(default)]
    pub papers: f64,
    #[serde(default)]
    pub reputation: f64,
}

impl ResourceCost {
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Money => self.money,
            ResourceKind::Compute => self.compute,
            ResourceKind::Research => self.research,
            ResourceKind::Papers => self.papers,
            ResourceKind::Reputation => self.reputation,
        }
    }

    #[must_use]
    pub fn is_free(&self) -> bool {
        ResourceKind::ALL.into_iter().all(|kind| self.get(kind) <= 0.0)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        ResourceKind::ALL
            .into_iter()
            .all(|kind| self.get(kind).is_finite() && self.get(kind) >= 0.0)
    }

    /// Sum of two costs.
    #[must_use]
    pub fn plus(&self, other: &Self) -> Self {
        Self {
            money: self.money + other.money,
            compute: self.compute + other.compute,
            research: self.research + other.research,
            papers: self.papers + other.papers,
            reputation: self.reputation + other.reputation,
        }
    }
}

/// Why an action-point request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApShortfall {
    pub needed: u32,
    pub available: u32,
}

/// Per-turn action-point budget.
///
/// Invariants: `committed + reserved <= total` and `used_event <= reserved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActionPoints {
    pub total: u32,
    pub committed: u32,
    pub reserved: u32,
    pub used_event: u32,
}

impl ActionPoints {
    /// AP that can still be committed to actions or reserved.
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.total
            .saturating_sub(self.committed)
            .saturating_sub(self.reserved)
    }

    /// Reserved AP not yet spent on event options.
    #[must_use]
    pub const fn event_reserve(&self) -> u32 {
        self.reserved.saturating_sub(self.used_event)
    }

    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.committed.saturating_add(self.reserved) <= self.total
            && self.used_event <= self.reserved
    }

    pub fn commit(&mut self, n: u32) -> Result<(), ApShortfall> {
        let available = self.available();
        if n > available {
            return Err(ApShortfall {
                needed: n,
                available,
            });
        }
        self.committed += n;
        Ok(())
    }

    pub fn refund(&mut self, n: u32) {
        self.committed = self.committed.saturating_sub(n);
    }

    pub fn reserve(&mut self, n: u32) -> Result<(), ApShortfall> {
        let available = self.available();
        if n > available {
            return Err(ApShortfall {
                needed: n,
                available,
            });
        }
        self.reserved += n;
        Ok(())
    }

    /// AP an event option can draw on: unspent reserve plus anything uncommitted.
    #[must_use]
    pub const fn event_capacity(&self) -> u32 {
        self.event_reserve().saturating_add(self.available())
    }

    /// Spend AP on an event option, drawing from the reserve before the
    /// uncommitted pool.
    pub fn spend_event(&mut self, n: u32) -> Result<(), ApShortfall> {
        let capacity = self.event_capacity();
        if n > capacity {
            return Err(ApShortfall {
                needed: n,
                available: capacity,
            });
        }
        let from_reserve = n.min(self.event_reserve());
        self.used_event += from_reserve;
        self.committed += n - from_reserve;
        Ok(())
    }

    /// Open a new turn budget. Reserved AP from the previous turn is carried
    /// into this turn's event window, clamped to the new total.
    pub fn begin_turn(&mut self, total: u32) {
        self.total = total;
        self.committed = 0;
        self.used_event = 0;
        self.reserved = self.reserved.min(total);
    }

    /// Close the event window, dropping the carried reserve whether spent or not.
    pub fn forfeit_reserve(&mut self) {
        self.reserved = 0;
        self.used_event = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn committing_then_reserving_exhausts_budget() {
        let mut ap = ActionPoints::default();
        ap.begin_turn(3);
        ap.commit(2).unwrap();
        ap.reserve(1).unwrap();
        assert_eq!(ap.available(), 0);
        assert_eq!(
            ap.commit(1),
            Err(ApShortfall {
                needed: 1,
                available: 0
            })
        );
        assert!(ap.is_consistent());
    }

    #[test]
    fn event_spend_prefers_reserve() {
        let mut ap = ActionPoints {
            total: 5,
            committed: 0,
            reserved: 2,
            used_event: 0,
        };
        ap.spend_event(3).unwrap();
        assert_eq!(ap.used_event, 2);
        assert_eq!(ap.committed, 1);
        assert!(ap.is_consistent());
        ap.forfeit_reserve();
        assert_eq!(ap.committed, 1);
        assert_eq!(ap.reserved, 0);
        assert_eq!(ap.available(), 4);
    }

    #[test]
    fn begin_turn_clamps_carried_reserve() {
        let mut ap = ActionPoints {
            total: 6,
            committed: 3,
            reserved: 3,
            used_event: 0,
        };
        ap.begin_turn(2);
        assert_eq!(ap.reserved, 2);
        assert_eq!(ap.committed, 0);
        assert!(ap.is_consistent());
    }

    #[test]
    fn resources_floor_and_shortfall() {
        let mut res = Resources {
            money: 100.0,
            compute: 2.0,
            ..Resources::default()
        };
        res.adjust(ResourceKind::Compute, -5.0);
        assert!(res.compute.abs() < f64::EPSILON);
        res.adjust(ResourceKind::Money, -150.0);
        assert!((res.money + 50.0).abs() < f64::EPSILON);

        let cost = ResourceCost {
            research: 4.0,
            ..ResourceCost::default()
        };
        assert_eq!(res.shortfall(&cost), Some((ResourceKind::Research, 4.0, 0.0)));
        assert!(ResourceCost::default().is_free());
        assert_eq!("papers".parse::<ResourceKind>(), Ok(ResourceKind::Papers));
    }
}
