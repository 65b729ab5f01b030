#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const MIN_LEVEL: u32 = 1;
pub const MAX_LEVEL: u32 = 250;

/// Per-session difficulty parameters, derived from a level.
///
/// The mapping is pure and total: levels outside `[MIN_LEVEL, MAX_LEVEL]` are
/// clamped to the nearest bound, never rejected. Each field moves
/// monotonically with the level and is clamped to its own range, so level 1
/// is the gentlest configuration and level 250 the harshest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DifficultyProfile {
    pub level: u32,
    /// How far back the compared stimulus sits (2-back through 6-back).
    pub n_back: u32,
    /// Trials per session, 20 through 50.
    pub sequence_len: u32,
    /// How long the stimulus stays visible, 500 ms down to 200 ms.
    pub stimulus_ms: u32,
    /// Full trial window from reveal to auto-advance, 2500 ms down to 1000 ms.
    pub interval_ms: u32,
    /// Grid side length, 3 through 7.
    pub grid_dim: u32,
}

impl DifficultyProfile {
    pub fn for_level(level: u32) -> Self {
        let level = level.clamp(MIN_LEVEL, MAX_LEVEL);
        let step = level - 1;
        Self {
            level,
            n_back: (2 + step / 25).min(6),
            sequence_len: (20 + (step / 10) * 5).min(50),
            stimulus_ms: 500u32.saturating_sub((step / 20) * 50).max(200),
            interval_ms: 2500u32.saturating_sub((step / 15) * 100).max(1000),
            grid_dim: match level {
                1..=50 => 3,
                51..=100 => 4,
                101..=150 => 5,
                151..=200 => 6,
                _ => 7,
            },
        }
    }

    pub fn grid_cells(&self) -> u16 {
        (self.grid_dim * self.grid_dim) as u16
    }

    /// Display band for the level menu.
    pub fn band(&self) -> &'static str {
        match self.level {
            1..=25 => "Beginner",
            26..=75 => "Intermediate",
            76..=150 => "Advanced",
            151..=200 => "Expert",
            _ => "Master",
        }
    }
}
