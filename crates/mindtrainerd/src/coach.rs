use serde::{Deserialize, Serialize};

/// A bounded, slow-loop coaching integration point.
///
/// This is intentionally *not* a difficulty controller.
/// It turns session aggregates into a handful of prioritized insight cards
/// and is designed to be driven by an external model later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Invoke cadence in completed sessions.
    #[serde(default = "default_every_sessions")]
    pub every_sessions: u32,
    /// Coach mode: "stub" (built-in templates) or "off".
    #[serde(default = "default_mode")]
    pub mode: String,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            every_sessions: default_every_sessions(),
            mode: default_mode(),
        }
    }
}

fn default_every_sessions() -> u32 {
    1
}

fn default_mode() -> String {
    "stub".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoachContext {
    #[serde(default)]
    pub sessions: u32,
    #[serde(default)]
    pub total_xp: u32,
    #[serde(default)]
    pub level: u32,
    /// Last session's accuracy, percent.
    #[serde(default)]
    pub accuracy: f32,
    #[serde(default)]
    pub best_streak: u32,
    #[serde(default)]
    pub avg_response_ms: u32,
    #[serde(default)]
    pub highest_unlocked_level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachInsight {
    pub priority: Priority,
    pub title: String,
    pub body: String,
    /// Suggested UI action label.
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoachReport {
    #[serde(default)]
    pub at_sessions: u32,
    #[serde(default)]
    pub context: CoachContext,
    #[serde(default)]
    pub insights: Vec<CoachInsight>,
}

#[derive(Debug, Clone, Default)]
pub struct CoachRuntime {
    pub cfg: CoachConfig,
    last_invoked_at_sessions: u32,
    pub last_report: Option<CoachReport>,
}

impl CoachRuntime {
    pub fn new_from_env() -> Self {
        let mut rt = Self::default();

        // MINDTRAINER_COACH=off|stub
        if let Ok(v) = std::env::var("MINDTRAINER_COACH") {
            let vv = v.trim().to_ascii_lowercase();
            if vv == "off" || vv == "0" || vv == "false" {
                rt.cfg.enabled = false;
                rt.cfg.mode = "off".to_string();
            } else {
                rt.cfg.enabled = true;
                rt.cfg.mode = vv;
            }
        }

        // MINDTRAINER_COACH_EVERY_SESSIONS=1
        if let Ok(v) = std::env::var("MINDTRAINER_COACH_EVERY_SESSIONS") {
            if let Ok(n) = v.trim().parse::<u32>() {
                rt.cfg.every_sessions = n.max(1);
            }
        }

        rt
    }

    pub fn should_invoke(&self, completed_sessions: u32) -> bool {
        if !self.cfg.enabled {
            return false;
        }
        if self.cfg.mode.trim().eq_ignore_ascii_case("off") {
            return false;
        }
        let every = self.cfg.every_sessions.max(1);
        if completed_sessions < every {
            return false;
        }
        completed_sessions.saturating_sub(self.last_invoked_at_sessions) >= every
    }

    pub fn insights_stub(&self, ctx: &CoachContext) -> Vec<CoachInsight> {
        // Template cards keyed off coarse thresholds: a placeholder for an
        // external model.
        let mut insights = Vec::new();

        if ctx.accuracy < 60.0 {
            insights.push(CoachInsight {
                priority: Priority::High,
                title: "Drop back a level".to_string(),
                body: format!(
                    "Accuracy fell to {:.0}% last session. Training sticks best near 80%, so a lower level will rebuild the habit faster.",
                    ctx.accuracy
                ),
                action: "Pick an easier level".to_string(),
            });
        } else if ctx.accuracy >= 80.0 {
            insights.push(CoachInsight {
                priority: Priority::Medium,
                title: "Ready to move up".to_string(),
                body: format!(
                    "{:.0}% accuracy has unlocked level {}. Harder sequences are where working memory actually grows.",
                    ctx.accuracy, ctx.highest_unlocked_level
                ),
                action: "Start the next level".to_string(),
            });
        }

        if ctx.avg_response_ms > 1500 {
            insights.push(CoachInsight {
                priority: Priority::Medium,
                title: "Trust the first impression".to_string(),
                body: format!(
                    "Average response time was {} ms. Deliberating past the first second rarely changes the answer in n-back tasks.",
                    ctx.avg_response_ms
                ),
                action: "Try a speed-focused run".to_string(),
            });
        }

        if ctx.best_streak >= 10 {
            insights.push(CoachInsight {
                priority: Priority::Low,
                title: "Streak in good shape".to_string(),
                body: format!(
                    "A best streak of {} shows sustained focus. Short daily sessions will keep it climbing.",
                    ctx.best_streak
                ),
                action: "Schedule a quick session".to_string(),
            });
        }

        // Rotation nudge so the report is never empty.
        insights.push(CoachInsight {
            priority: Priority::Low,
            title: "Balanced training".to_string(),
            body: "Rotating between memory and speed tasks gives more rounded gains than repeating one drill.".to_string(),
            action: "View schedule".to_string(),
        });

        insights
    }

    pub fn invoke(&mut self, ctx: CoachContext, at_sessions: u32) -> CoachReport {
        let insights = match self.cfg.mode.trim().to_ascii_lowercase().as_str() {
            "stub" => self.insights_stub(&ctx),
            // Future: external model endpoint.
            other => vec![CoachInsight {
                priority: Priority::Low,
                title: "Coach unavailable".to_string(),
                body: format!("coach mode '{other}' not implemented; no insights"),
                action: String::new(),
            }],
        };

        self.last_invoked_at_sessions = at_sessions;
        let report = CoachReport {
            at_sessions,
            context: ctx,
            insights,
        };
        self.last_report = Some(report.clone());
        report
    }
}
