//! Capability and condition bitsets
//!
//! Capabilities are the preconditions and effects of primitive actions
//! (can-move, is-prone, weapon-loaded). Conditions are situational flags the
//! simulation derives each tick (suppressed, in cover). Both are 64-bit sets
//! with O(1) tests.

use serde::{Deserialize, Serialize};

/// Named capability bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Capability {
    CanMove = 0,
    CanFire = 1,
    CanSprint = 2,
    IsStanding = 3,
    IsCrouched = 4,
    IsProne = 5,
    WeaponLoaded = 6,
    Concealed = 7,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::CanMove,
        Capability::CanFire,
        Capability::CanSprint,
        Capability::IsStanding,
        Capability::IsCrouched,
        Capability::IsProne,
        Capability::WeaponLoaded,
        Capability::Concealed,
    ];

    #[inline]
    pub fn bit(self) -> u8 {
        self as u8
    }

    pub fn from_bit(bit: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.bit() == bit)
    }
}

/// Situational condition bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Condition {
    IsSuppressed = 0,
    IsPinned = 1,
    InCover = 2,
    UnderFire = 3,
    Mounted = 4,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::IsSuppressed,
        Condition::IsPinned,
        Condition::InCover,
        Condition::UnderFire,
        Condition::Mounted,
    ];

    #[inline]
    pub fn bit(self) -> u8 {
        self as u8
    }

    pub fn from_bit(bit: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.bit() == bit)
    }
}

macro_rules! flag_set {
    ($(#[$meta:meta])* $name:ident, $flag:ty) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const EMPTY: $name = $name(0);

            pub const fn from_bits(bits: u64) -> Self {
                Self(bits)
            }

            #[inline]
            pub const fn bits(self) -> u64 {
                self.0
            }

            #[inline]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            #[inline]
            pub fn has(self, flag: $flag) -> bool {
                self.0 & (1u64 << flag.bit()) != 0
            }

            #[inline]
            pub fn contains_all(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            #[inline]
            pub fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            pub fn with(self, flag: $flag) -> Self {
                Self(self.0 | (1u64 << flag.bit()))
            }

            pub fn without(self, flag: $flag) -> Self {
                Self(self.0 & !(1u64 << flag.bit()))
            }

            pub fn set(&mut self, flag: $flag, on: bool) {
                *self = if on { self.with(flag) } else { self.without(flag) };
            }

            pub fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            /// `self & !other`
            pub fn difference(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }

            /// Lowest set bit, if it names a known flag
            pub fn lowest(self) -> Option<$flag> {
                if self.0 == 0 {
                    return None;
                }
                <$flag>::from_bit(self.0.trailing_zeros() as u8)
            }

            /// Lowest set bit index, known or not
            pub fn lowest_bit(self) -> Option<u8> {
                if self.0 == 0 {
                    None
                } else {
                    Some(self.0.trailing_zeros() as u8)
                }
            }

            pub fn iter(self) -> impl Iterator<Item = $flag> {
                <$flag>::ALL.into_iter().filter(move |f| self.has(*f))
            }
        }

        impl FromIterator<$flag> for $name {
            fn from_iter<I: IntoIterator<Item = $flag>>(iter: I) -> Self {
                iter.into_iter().fold(Self::EMPTY, |set, f| set.with(f))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_set().entries(self.iter()).finish()
            }
        }
    };
}

flag_set!(
    /// 64-bit capability set
    CapabilitySet,
    Capability
);

flag_set!(
    /// 64-bit condition set
    ConditionSet,
    Condition
);

impl CapabilitySet {
    /// Apply an action's effect: `(self | adds) & !removes`
    pub fn apply(self, adds: CapabilitySet, removes: CapabilitySet) -> Self {
        self.union(adds).difference(removes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_is_bit_test() {
        let set = CapabilitySet::EMPTY.with(Capability::CanMove).with(Capability::IsProne);
        assert!(set.has(Capability::CanMove));
        assert!(set.has(Capability::IsProne));
        assert!(!set.has(Capability::CanSprint));
        assert_eq!(set.bits(), 0b10_0001);
    }

    #[test]
    fn test_lowest_picks_lowest_bit() {
        let set: CapabilitySet = [Capability::WeaponLoaded, Capability::CanSprint]
            .into_iter()
            .collect();
        assert_eq!(set.lowest(), Some(Capability::CanSprint));
        assert_eq!(CapabilitySet::EMPTY.lowest(), None);
    }

    #[test]
    fn test_apply_adds_then_removes() {
        let prone: CapabilitySet = [Capability::CanMove, Capability::IsProne].into_iter().collect();
        let adds: CapabilitySet = [Capability::CanSprint, Capability::IsStanding]
            .into_iter()
            .collect();
        let removes: CapabilitySet = [Capability::IsProne, Capability::IsCrouched]
            .into_iter()
            .collect();

        let standing = prone.apply(adds, removes);

        assert!(standing.has(Capability::CanSprint));
        assert!(standing.has(Capability::IsStanding));
        assert!(!standing.has(Capability::IsProne));
        assert!(standing.has(Capability::CanMove));
    }

    #[test]
    fn test_difference_is_missing_mask() {
        let required: CapabilitySet = [Capability::CanMove, Capability::CanSprint]
            .into_iter()
            .collect();
        let have = CapabilitySet::EMPTY.with(Capability::CanMove);
        let missing = required.difference(have);
        assert_eq!(missing.iter().collect::<Vec<_>>(), vec![Capability::CanSprint]);
    }

    #[test]
    fn test_serde_is_plain_bits() {
        let set = ConditionSet::EMPTY.with(Condition::InCover);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "4");
        let back: ConditionSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_capability_names_snake_case() {
        let c: Capability = serde_json::from_str("\"weapon_loaded\"").unwrap();
        assert_eq!(c, Capability::WeaponLoaded);
    }
}
