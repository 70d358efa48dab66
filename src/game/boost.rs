//! Boost identities per variant and the slots that hold them.

use std::fmt;

/// What a boost does when spent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoostRole {
    /// Daubs a chosen cell directly.
    Jump,
    /// Offers candidate bubbles to choose from.
    Pick,
    /// Multiplies the score of the next daubs.
    Multiplier,
    /// Adds time to the round; always spent immediately.
    ExtraTime,
}

/// A closed set of boosts for one game variant.
pub trait Boost: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Classification order; the first reference within range wins.
    const CHECK_ORDER: &'static [Self];

    fn role(self) -> BoostRole;

    /// File stem of the reference icon under `powerups/`.
    fn asset_name(self) -> &'static str;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KingBoost {
    Star,
    Triple,
    ExtraTime,
    Crown,
}

impl fmt::Display for KingBoost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KingBoost::Star => write!(f, "STAR"),
            KingBoost::Triple => write!(f, "3X"),
            KingBoost::ExtraTime => write!(f, "TIME"),
            KingBoost::Crown => write!(f, "CROWN"),
        }
    }
}

impl Boost for KingBoost {
    const CHECK_ORDER: &'static [Self] =
        &[KingBoost::Star, KingBoost::Triple, KingBoost::ExtraTime, KingBoost::Crown];

    fn role(self) -> BoostRole {
        match self {
            KingBoost::Star => BoostRole::Pick,
            KingBoost::Triple => BoostRole::Multiplier,
            KingBoost::ExtraTime => BoostRole::ExtraTime,
            KingBoost::Crown => BoostRole::Jump,
        }
    }

    fn asset_name(self) -> &'static str {
        match self {
            KingBoost::Star => "star",
            KingBoost::Triple => "3x",
            KingBoost::ExtraTime => "extra-time",
            KingBoost::Crown => "crown",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CashBoost {
    Star,
    Double,
    ExtraTime,
    PickA,
}

impl fmt::Display for CashBoost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CashBoost::Star => write!(f, "STAR"),
            CashBoost::Double => write!(f, "2X"),
            CashBoost::ExtraTime => write!(f, "TIME"),
            CashBoost::PickA => write!(f, "PICKA"),
        }
    }
}

impl Boost for CashBoost {
    const CHECK_ORDER: &'static [Self] =
        &[CashBoost::Star, CashBoost::Double, CashBoost::ExtraTime, CashBoost::PickA];

    fn role(self) -> BoostRole {
        match self {
            CashBoost::Star => BoostRole::Jump,
            CashBoost::Double => BoostRole::Multiplier,
            CashBoost::ExtraTime => BoostRole::ExtraTime,
            CashBoost::PickA => BoostRole::Pick,
        }
    }

    fn asset_name(self) -> &'static str {
        match self {
            CashBoost::Star => "star",
            CashBoost::Double => "2x",
            CashBoost::ExtraTime => "extra-time",
            CashBoost::PickA => "picka",
        }
    }
}

/// Contents of the on-screen boost slots for the current frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoostSlots<B: Boost> {
    slots: Vec<Option<B>>,
}

impl<B: Boost> BoostSlots<B> {
    pub fn new(slots: Vec<Option<B>>) -> Self {
        Self { slots }
    }

    pub fn empty(count: usize) -> Self {
        Self { slots: vec![None; count] }
    }

    #[cfg(test)]
    pub fn get(&self, index: usize) -> Option<B> {
        self.slots.get(index).copied().flatten()
    }

    pub fn count(&self, role: BoostRole) -> usize {
        self.slots.iter().flatten().filter(|b| b.role() == role).count()
    }

    /// Index of the leftmost slot holding a boost with `role`.
    pub fn first(&self, role: BoostRole) -> Option<usize> {
        self.slots.iter().position(|s| s.is_some_and(|b| b.role() == role))
    }

    /// Every slot index holding a boost with `role`, left to right.
    pub fn all(&self, role: BoostRole) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some_and(|b| b.role() == role))
            .map(|(i, _)| i)
            .collect()
    }

    /// Empties a slot after its boost was spent.
    pub fn take(&mut self, index: usize) -> Option<B> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// True when no slot is free.
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}

impl<B: Boost> fmt::Display for BoostSlots<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            match slot {
                Some(boost) => write!(f, "P{} {}", i + 1, boost)?,
                None => write!(f, "P{} -", i + 1)?,
            }
        }
        Ok(())
    }
}
