use crate::difficulty::{MAX_LEVEL, MIN_LEVEL};
use crate::session::SessionSummary;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Profile-screen achievements. Earned flags latch: once granted they are
/// never re-announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Achievement {
    FirstSteps,
    MemoryMaster,
    Perfectionist,
    DedicatedTrainer,
}

impl Achievement {
    pub fn title(self) -> &'static str {
        match self {
            Achievement::FirstSteps => "First Steps",
            Achievement::MemoryMaster => "Memory Master",
            Achievement::Perfectionist => "Perfectionist",
            Achievement::DedicatedTrainer => "Dedicated Trainer",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Achievement::FirstSteps => "Complete your first training session",
            Achievement::MemoryMaster => "Score 90%+ in a memory session",
            Achievement::Perfectionist => "Achieve 100% accuracy in a session",
            Achievement::DedicatedTrainer => "Complete 100 total sessions",
        }
    }
}

/// In-memory training progress for the single local player.
///
/// Lives for the lifetime of the host process and is discarded with it;
/// persistence is deliberately out of scope.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlayerProgress {
    pub total_xp: u32,
    pub sessions: u32,
    pub highest_unlocked_level: u32,
    pub best_accuracy_pct: f32,
    pub best_streak: u32,
    pub earned: Vec<Achievement>,
}

impl PlayerProgress {
    pub fn new() -> Self {
        Self {
            total_xp: 0,
            sessions: 0,
            highest_unlocked_level: MIN_LEVEL,
            best_accuracy_pct: 0.0,
            best_streak: 0,
            earned: Vec::new(),
        }
    }

    /// Fold one completed session in. Returns the achievements this session
    /// newly earned, in a stable order.
    pub fn apply(&mut self, summary: &SessionSummary) -> Vec<Achievement> {
        self.sessions += 1;
        self.total_xp += summary.xp_earned;
        self.best_accuracy_pct = self.best_accuracy_pct.max(summary.accuracy);
        self.best_streak = self.best_streak.max(summary.best_streak);
        if summary.next_level_unlocked {
            self.highest_unlocked_level = self
                .highest_unlocked_level
                .max((summary.level + 1).min(MAX_LEVEL));
        }

        let candidates = [
            (Achievement::FirstSteps, self.sessions >= 1),
            (Achievement::MemoryMaster, summary.accuracy >= 90.0),
            (Achievement::Perfectionist, summary.accuracy >= 100.0),
            (Achievement::DedicatedTrainer, self.sessions >= 100),
        ];

        let mut newly_earned = Vec::new();
        for (achievement, met) in candidates {
            if met && !self.earned.contains(&achievement) {
                self.earned.push(achievement);
                newly_earned.push(achievement);
            }
        }
        newly_earned
    }

    /// Adaptive next-level suggestion from the last session: move up past
    /// 80% accuracy, drop back under 50%, otherwise repeat the level.
    pub fn recommended_level(&self, summary: &SessionSummary) -> u32 {
        if summary.accuracy >= 80.0 {
            (summary.level + 1).min(MAX_LEVEL)
        } else if summary.accuracy < 50.0 {
            summary.level.saturating_sub(1).max(MIN_LEVEL)
        } else {
            summary.level
        }
    }
}

impl Default for PlayerProgress {
    fn default() -> Self {
        Self::new()
    }
}
