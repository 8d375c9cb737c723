use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub const ATOMS_PER_COIN: i64 = 100_000_000;

/// A coin amount, held in atoms (the smallest indivisible unit).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const fn from_atoms(atoms: i64) -> Self {
        Self(atoms)
    }

    /// Convert a fractional coin value, rounding to the nearest atom.
    /// Negative and non-finite values are rejected.
    pub fn from_coins(coins: f64) -> Option<Self> {
        if !coins.is_finite() || coins < 0.0 {
            return None;
        }
        let atoms = (coins * ATOMS_PER_COIN as f64).round();
        if atoms > i64::MAX as f64 {
            return None;
        }
        Some(Self(atoms as i64))
    }

    pub fn atoms(&self) -> i64 {
        self.0
    }

    pub fn to_coins(&self) -> f64 {
        self.0 as f64 / ATOMS_PER_COIN as f64
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / ATOMS_PER_COIN;
        let frac = (self.0 % ATOMS_PER_COIN).abs();
        write!(f, "{whole}.{frac:08} coin")
    }
}
