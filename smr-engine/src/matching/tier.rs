//! Tier Classifier
//!
//! A tier records which strong signals a candidate satisfied:
//! A = identity, S = size, D = duration, N = network. The observable code
//! is the satisfied letters in that fixed order, or `R` ("ratio only")
//! when none apply. Selection walks [`PRIORITY`], not lexical order.

use crate::types::SignalVector;
use serde::{Serialize, Serializer};
use std::fmt;

const IDENTITY: u8 = 0b1000;
const SIZE: u8 = 0b0100;
const DURATION: u8 = 0b0010;
const NETWORK: u8 = 0b0001;

/// Confidence tier, stored as a 4-bit signal set
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tier(u8);

/// Selection order, best first
pub const PRIORITY: [Tier; 16] = [
    Tier(IDENTITY | SIZE | DURATION | NETWORK),
    Tier(IDENTITY | SIZE | DURATION),
    Tier(IDENTITY | SIZE | NETWORK),
    Tier(IDENTITY | DURATION | NETWORK),
    Tier(IDENTITY | SIZE),
    Tier(IDENTITY | DURATION),
    Tier(IDENTITY | NETWORK),
    Tier(IDENTITY),
    Tier(SIZE | DURATION | NETWORK),
    Tier(SIZE | DURATION),
    Tier(SIZE | NETWORK),
    Tier(DURATION | NETWORK),
    Tier(SIZE),
    Tier(DURATION),
    Tier(NETWORK),
    Tier::RATIO_ONLY,
];

impl Tier {
    /// No strong signal applies
    pub const RATIO_ONLY: Tier = Tier(0);

    pub fn from_flags(identity: bool, size: bool, duration: bool, network: bool) -> Self {
        let mut bits = 0;
        if identity {
            bits |= IDENTITY;
        }
        if size {
            bits |= SIZE;
        }
        if duration {
            bits |= DURATION;
        }
        if network {
            bits |= NETWORK;
        }
        Tier(bits)
    }

    /// Map a signal vector to its tier
    pub fn classify(signals: &SignalVector) -> Self {
        Self::from_flags(
            signals.id_flag,
            signals.size_match,
            signals.duration_match,
            signals.domain_match,
        )
    }

    /// Letter code, e.g. "ASD" or "R"
    pub fn code(&self) -> String {
        if self.0 == 0 {
            return "R".to_string();
        }
        [(IDENTITY, 'A'), (SIZE, 'S'), (DURATION, 'D'), (NETWORK, 'N')]
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, letter)| *letter)
            .collect()
    }

    /// Parse a letter code; letters must appear in A, S, D, N order
    pub fn from_code(code: &str) -> Option<Self> {
        if code == "R" {
            return Some(Tier::RATIO_ONLY);
        }
        let tier = Tier::from_flags(
            code.contains('A'),
            code.contains('S'),
            code.contains('D'),
            code.contains('N'),
        );
        (tier.0 != 0 && tier.code() == code).then_some(tier)
    }

    /// Position in [`PRIORITY`] (0 = best)
    pub fn rank(&self) -> usize {
        PRIORITY
            .iter()
            .position(|tier| tier == self)
            .unwrap_or(PRIORITY.len() - 1)
    }

    /// True when `self` is preferred over `other`
    pub fn outranks(&self, other: &Tier) -> bool {
        self.rank() < other.rank()
    }

    /// Acceptance gate for candidates in this tier
    pub fn gate(&self) -> Gate {
        let ratio_above = |threshold| Gate::RatioAbove {
            threshold,
            or_id_match: false,
        };

        match self.code().as_str() {
            "ASDN" | "ASD" | "ASN" | "ADN" | "AS" | "AD" | "SDN" | "SD" => Gate::Unconditional,
            "AN" => Gate::RatioAbove {
                threshold: 0.5,
                or_id_match: true,
            },
            "SN" | "DN" => ratio_above(0.5),
            "A" | "S" | "D" | "N" => ratio_above(0.7),
            _ => ratio_above(0.8),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl fmt::Debug for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tier({})", self.code())
    }
}

impl Serialize for Tier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code())
    }
}

/// Per-tier acceptance rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gate {
    Unconditional,
    /// Title or URL ratio strictly above `threshold`
    RatioAbove { threshold: f64, or_id_match: bool },
}

impl Gate {
    pub fn passes(&self, signals: &SignalVector) -> bool {
        match *self {
            Gate::Unconditional => true,
            Gate::RatioAbove {
                threshold,
                or_id_match,
            } => {
                (or_id_match && signals.id_match)
                    || signals.title_ratio > threshold
                    || signals.url_ratio > threshold
            }
        }
    }
}
