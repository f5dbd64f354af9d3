//! Gear and species tags carried by a participant.
//!
//! Gear items compound multiplicatively into a participant's effective
//! velocity in the wagering variant. Species is a descriptive tag only.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Equipment that boosts a participant's stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gear {
    /// ×1.3
    Saddle,
    /// ×1.2
    Horseshoes,
    /// ×1.1
    Bridle,
}

impl Gear {
    /// All known gear items, in display order.
    pub const ALL: [Self; 3] = [Self::Saddle, Self::Horseshoes, Self::Bridle];

    /// Velocity multiplier applied while this item is equipped.
    pub fn multiplier(self) -> Decimal {
        match self {
            Self::Saddle => dec!(1.3),
            Self::Horseshoes => dec!(1.2),
            Self::Bridle => dec!(1.1),
        }
    }

    /// Lowercase tag used in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Saddle => "saddle",
            Self::Horseshoes => "horseshoes",
            Self::Bridle => "bridle",
        }
    }
}

impl fmt::Display for Gear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a gear tag is not one of the known items.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown gear item '{0}' (expected saddle, horseshoes or bridle)")]
pub struct ParseGearError(pub String);

impl FromStr for Gear {
    type Err = ParseGearError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "saddle" => Ok(Self::Saddle),
            "horseshoes" => Ok(Self::Horseshoes),
            "bridle" => Ok(Self::Bridle),
            _ => Err(ParseGearError(s.to_string())),
        }
    }
}

/// Breed tag shown alongside a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Arabian,
    Thoroughbred,
    Clydesdale,
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Arabian => "Arabian",
            Self::Thoroughbred => "Thoroughbred",
            Self::Clydesdale => "Clydesdale",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Saddle".parse::<Gear>(), Ok(Gear::Saddle));
        assert_eq!(" HORSESHOES ".parse::<Gear>(), Ok(Gear::Horseshoes));
        assert_eq!("bridle".parse::<Gear>(), Ok(Gear::Bridle));
    }

    #[test]
    fn test_parse_rejects_unknown_item() {
        let err = "blinkers".parse::<Gear>().unwrap_err();
        assert_eq!(err, ParseGearError("blinkers".to_string()));
    }

    #[test]
    fn test_multipliers() {
        let product = Gear::ALL
            .iter()
            .fold(Decimal::ONE, |acc, g| acc * g.multiplier());
        assert_eq!(product, dec!(1.716));
    }
}
