//! Combo input keys.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// A discrete attack input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComboKey {
    /// Key A.
    A,
    /// Key B.
    B,
    /// Key C.
    C,
    /// Key D.
    D,
    /// Key E.
    E,
    /// Key F.
    F,
}

impl ComboKey {
    /// Every key, in index order.
    pub const ALL: [ComboKey; 6] = [
        ComboKey::A,
        ComboKey::B,
        ComboKey::C,
        ComboKey::D,
        ComboKey::E,
        ComboKey::F,
    ];

    /// Number of distinct keys.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of the key in [`ComboKey::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The single-key set containing this key.
    #[must_use]
    pub const fn flag(self) -> KeySet {
        KeySet::from_bits_truncate(1 << self as u8)
    }
}

impl fmt::Display for ComboKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            ComboKey::A => "A",
            ComboKey::B => "B",
            ComboKey::C => "C",
            ComboKey::D => "D",
            ComboKey::E => "E",
            ComboKey::F => "F",
        };
        f.write_str(letter)
    }
}

bitflags! {
    /// A set of combo keys, e.g. the keys that continue the current chain.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct KeySet: u8 {
        /// Key A.
        const A = 1 << 0;
        /// Key B.
        const B = 1 << 1;
        /// Key C.
        const C = 1 << 2;
        /// Key D.
        const D = 1 << 3;
        /// Key E.
        const E = 1 << 4;
        /// Key F.
        const F = 1 << 5;
    }
}

impl KeySet {
    /// Whether the set contains `key`.
    #[must_use]
    pub const fn has(self, key: ComboKey) -> bool {
        self.contains(key.flag())
    }

    /// Iterates over the keys in the set, in index order.
    pub fn keys(self) -> impl Iterator<Item = ComboKey> {
        ComboKey::ALL.into_iter().filter(move |key| self.has(*key))
    }
}

impl From<ComboKey> for KeySet {
    fn from(key: ComboKey) -> Self {
        key.flag()
    }
}

impl FromIterator<ComboKey> for KeySet {
    fn from_iter<I: IntoIterator<Item = ComboKey>>(iter: I) -> Self {
        iter.into_iter().fold(KeySet::empty(), |set, key| set | key.flag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_match_indices() {
        for key in ComboKey::ALL {
            assert_eq!(key.flag().bits(), 1 << key.index());
        }
        assert_eq!(ComboKey::F.flag(), KeySet::F);
    }

    #[test]
    fn key_sets_iterate_in_order() {
        let set: KeySet = [ComboKey::E, ComboKey::A, ComboKey::C].into_iter().collect();
        assert!(set.has(ComboKey::C));
        assert!(!set.has(ComboKey::B));
        assert_eq!(
            set.keys().collect::<Vec<_>>(),
            vec![ComboKey::A, ComboKey::C, ComboKey::E]
        );
    }

    #[test]
    fn keys_serialize_as_letters() {
        let json = serde_json::to_string(&vec![ComboKey::A, ComboKey::F]).unwrap();
        assert_eq!(json, r#"["A","F"]"#);
        assert_eq!(ComboKey::D.to_string(), "D");
    }
}
