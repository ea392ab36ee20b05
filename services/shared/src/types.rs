/// Type-safe wrappers for domain primitives
///
/// These types enforce validation at construction time so that the engine
/// never sees an out-of-range edge, multiplier or seed.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::constants::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Client seed must be {min}-{max} characters, got {length}")]
    ClientSeedLength { length: usize, min: usize, max: usize },

    #[error("House edge must be within [0, 1), got {0}")]
    HouseEdgeOutOfRange(f64),

    #[error("Multiplier must be a finite value of at least 1.00, got {0}")]
    InvalidMultiplier(f64),

    #[error("Unknown coin side: {0}")]
    InvalidCoinSide(String),

    #[error("Unknown game: {0}")]
    InvalidGameKind(String),
}

/// Player-chosen seed mixed into every draw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSeed(String);

impl ClientSeed {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for ClientSeed {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let length = value.chars().count();
        if !(CLIENT_SEED_MIN_LEN..=CLIENT_SEED_MAX_LEN).contains(&length) {
            return Err(ValidationError::ClientSeedLength {
                length,
                min: CLIENT_SEED_MIN_LEN,
                max: CLIENT_SEED_MAX_LEN,
            });
        }
        Ok(Self(value))
    }
}

impl fmt::Display for ClientSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coin side for Coinflip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

impl CoinSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoinSide::Heads => "heads",
            CoinSide::Tails => "tails",
        }
    }
}

impl TryFrom<&str> for CoinSide {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "heads" => Ok(CoinSide::Heads),
            "tails" => Ok(CoinSide::Tails),
            other => Err(ValidationError::InvalidCoinSide(other.to_string())),
        }
    }
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported game types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Coinflip,
    Mines,
    Crash,
}

impl GameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Coinflip => "coinflip",
            GameKind::Mines => "mines",
            GameKind::Crash => "crash",
        }
    }

    /// Key used in the house-edge configuration
    pub fn house_edge_key(&self) -> &'static str {
        match self {
            GameKind::Coinflip => "COINFLIP",
            GameKind::Mines => "MINES",
            GameKind::Crash => "CRASH",
        }
    }

    pub fn default_house_edge(&self) -> f64 {
        match self {
            GameKind::Coinflip => DEFAULT_COINFLIP_EDGE,
            GameKind::Mines => DEFAULT_MINES_EDGE,
            GameKind::Crash => DEFAULT_CRASH_EDGE,
        }
    }
}

impl TryFrom<&str> for GameKind {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "coinflip" => Ok(GameKind::Coinflip),
            "mines" => Ok(GameKind::Mines),
            "crash" => Ok(GameKind::Crash),
            other => Err(ValidationError::InvalidGameKind(other.to_string())),
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// House edge held in parts-per-million
///
/// Serialized as a plain fraction (`0.02`) so records and configuration read
/// naturally, while payout math works on the exact integer form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct HouseEdge(u32);

impl HouseEdge {
    pub const ZERO: HouseEdge = HouseEdge(0);

    pub fn from_fraction(fraction: f64) -> Result<Self, ValidationError> {
        if !fraction.is_finite() || !(0.0..1.0).contains(&fraction) {
            return Err(ValidationError::HouseEdgeOutOfRange(fraction));
        }
        let ppm = (fraction * EDGE_SCALE as f64).round();
        if ppm >= EDGE_SCALE as f64 {
            return Err(ValidationError::HouseEdgeOutOfRange(fraction));
        }
        Ok(Self(ppm as u32))
    }

    pub fn from_ppm(ppm: u32) -> Result<Self, ValidationError> {
        if ppm >= EDGE_SCALE {
            return Err(ValidationError::HouseEdgeOutOfRange(ppm as f64 / EDGE_SCALE as f64));
        }
        Ok(Self(ppm))
    }

    pub fn ppm(&self) -> u32 {
        self.0
    }

    /// Share of the fair payout returned to the player, in ppm
    pub fn retained_ppm(&self) -> u32 {
        EDGE_SCALE - self.0
    }

    pub fn as_fraction(&self) -> f64 {
        self.0 as f64 / EDGE_SCALE as f64
    }
}

impl TryFrom<f64> for HouseEdge {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_fraction(value)
    }
}

impl From<HouseEdge> for f64 {
    fn from(edge: HouseEdge) -> Self {
        edge.as_fraction()
    }
}

impl fmt::Display for HouseEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}%", self.as_fraction() * 100.0)
    }
}

/// Crash multiplier in hundredths (`250` is 2.50x)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct CrashMultiplier(u32);

impl CrashMultiplier {
    pub const MIN: CrashMultiplier = CrashMultiplier(MIN_CRASH_POINT_X100);
    pub const MAX: CrashMultiplier = CrashMultiplier(MAX_CRASH_POINT_X100);

    /// Build from hundredths, clamped to the playable range
    pub fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths.clamp(MIN_CRASH_POINT_X100, MAX_CRASH_POINT_X100))
    }

    /// Parse a client claim, truncating to hundredths (never rounding up)
    pub fn from_claim(claim: f64) -> Result<Self, ValidationError> {
        if !claim.is_finite() || claim < 1.0 {
            return Err(ValidationError::InvalidMultiplier(claim));
        }
        // Snap only representation error (2.4 * 100 = 239.99999999999997); a
        // genuinely lower claim still floors.
        let scaled = claim * 100.0;
        let nearest = scaled.round();
        let hundredths = if (scaled - nearest).abs() <= scaled * 1e-12 {
            nearest
        } else {
            scaled.floor()
        };
        if hundredths > u32::MAX as f64 {
            return Err(ValidationError::InvalidMultiplier(claim));
        }
        Ok(Self(hundredths as u32))
    }

    pub fn hundredths(&self) -> u32 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl TryFrom<f64> for CrashMultiplier {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_claim(value)
    }
}

impl From<CrashMultiplier> for f64 {
    fn from(multiplier: CrashMultiplier) -> Self {
        multiplier.as_f64()
    }
}

impl fmt::Display for CrashMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}x", self.0 / 100, self.0 % 100)
    }
}
