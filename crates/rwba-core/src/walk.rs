//! Bounded ±1 random walk over a bit window.

use serde::Serialize;

/// Which side of `[-n, +n]` the walk left through, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitDirection {
    /// Reached `-n`.
    Low,
    /// Bits ran out before either boundary was reached.
    Open,
    /// Reached `+n`.
    High,
}

impl ExitDirection {
    /// Signed weight of the exit: -1, 0 or +1.
    pub fn sign(self) -> f64 {
        match self {
            Self::Low => -1.0,
            Self::Open => 0.0,
            Self::High => 1.0,
        }
    }
}

/// Result of a single subtrial walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalkOutcome {
    /// Bits consumed, including the one that crossed the boundary.
    pub steps: usize,
    pub direction: ExitDirection,
}

/// Walk from 0, stepping +1 on a one bit and -1 on a zero bit, stopping as
/// soon as the position reaches `boundary` or `-boundary`.
///
/// Single forward pass; any nonzero byte counts as a one.
pub fn bounded_walk(bits: &[u8], boundary: usize) -> WalkOutcome {
    let limit = boundary as i64;
    let mut position = 0i64;

    for (i, &bit) in bits.iter().enumerate() {
        position += if bit != 0 { 1 } else { -1 };
        if position >= limit {
            return WalkOutcome {
                steps: i + 1,
                direction: ExitDirection::High,
            };
        }
        if position <= -limit {
            return WalkOutcome {
                steps: i + 1,
                direction: ExitDirection::Low,
            };
        }
    }

    WalkOutcome {
        steps: bits.len(),
        direction: ExitDirection::Open,
    }
}
