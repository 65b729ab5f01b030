use crate::difficulty::DifficultyProfile;
use crate::prng::Prng;
use crate::sequence;
use crate::stats::TrialStats;
use crate::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where the session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Phase {
    /// Early trials shown only to seed the n-back window; never judged.
    Memorizing,
    /// The current stimulus is (or is about to be) visible.
    Presenting,
    /// Stimulus hidden, response window still open.
    AwaitingResponse,
    Completed,
    Cancelled,
}

/// One judged (or timed-out) response.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrialResult {
    pub trial: u32,
    pub claimed_match: bool,
    pub actual_match: bool,
    pub correct: bool,
    /// Stimulus reveal to judgment, clamped to >= 0.
    pub response_ms: u32,
    /// True when the deadline judged the trial as an automatic no-match claim.
    pub timed_out: bool,
}

/// End-of-session results handed to the caller. Cancelled runs never get one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionSummary {
    pub level: u32,
    pub score: u32,
    /// Percent, 0-100, rounded to a whole number.
    pub accuracy: f32,
    pub correct_count: u32,
    pub total_questions: u32,
    pub best_streak: u32,
    pub avg_response_ms: u32,
    pub fastest_response_ms: u32,
    pub slowest_response_ms: u32,
    pub xp_earned: u32,
    pub next_level_unlocked: bool,
}

/// Engine-to-host notifications, produced by [`Session::poll`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind"))]
pub enum SessionEvent {
    Presented { trial: u32, cell: u16 },
    StimulusHidden { trial: u32 },
    Judged { result: TrialResult, stats: TrialStats },
    Completed { summary: SessionSummary },
}

/// Read-only view for host status endpoints.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub trial_index: u32,
    pub total_trials: u32,
    pub judged: bool,
    pub paused: bool,
    pub stats: TrialStats,
    pub profile: DifficultyProfile,
}

/// A single in-progress n-back run.
///
/// The session never reads the wall clock: every time-dependent call takes
/// `now`, so the host owns the clock and tests drive synthetic time. Trial
/// deadlines sit on a fixed lattice (`start + k * interval_ms`), which lets a
/// late [`Session::poll`] catch up across several trials deterministically.
///
/// Every phase change bumps a monotonic epoch. A host that schedules real
/// timers tags them with [`Session::epoch`] and delivers them through
/// [`Session::fire_timer`]; a timer from a superseded epoch is stale and is
/// dropped without touching the state machine.
#[derive(Debug, Clone)]
pub struct Session {
    profile: DifficultyProfile,
    sequence: Vec<u16>,
    stats: TrialStats,

    idx: u32,
    phase: Phase,
    epoch: u64,

    trial_started_at: Instant,
    presented: bool,
    hidden: bool,
    judged: bool,
    paused_at: Option<Instant>,
}

impl Session {
    /// Start a run at `level` (clamped, never rejected) with a seeded
    /// stimulus sequence.
    pub fn start(level: u32, seed: u64, now: Instant) -> Self {
        let profile = DifficultyProfile::for_level(level);
        let mut rng = Prng::new(seed);
        let sequence = sequence::generate(&profile, &mut rng);
        Self::from_parts(profile, sequence, now)
    }

    /// Build a session over a pre-made sequence (replays, tests).
    pub fn from_parts(profile: DifficultyProfile, sequence: Vec<u16>, now: Instant) -> Self {
        debug_assert_eq!(sequence.len(), profile.sequence_len as usize);
        Self {
            profile,
            sequence,
            stats: TrialStats::new(),
            idx: 0,
            phase: Phase::Memorizing,
            epoch: 0,
            trial_started_at: now,
            presented: false,
            hidden: false,
            judged: false,
            paused_at: None,
        }
    }

    pub fn profile(&self) -> &DifficultyProfile {
        &self.profile
    }

    pub fn sequence(&self) -> &[u16] {
        &self.sequence
    }

    pub fn stats(&self) -> &TrialStats {
        &self.stats
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn trial_index(&self) -> u32 {
        self.idx
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            trial_index: self.idx,
            total_trials: self.profile.sequence_len,
            judged: self.judged,
            paused: self.is_paused(),
            stats: self.stats.clone(),
            profile: self.profile,
        }
    }

    /// When the next timer is due, for hosts that sleep precisely.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.is_paused() || self.is_terminal() {
            return None;
        }
        if !self.presented {
            return Some(self.trial_started_at);
        }
        if !self.hidden {
            return Some(self.trial_started_at + Duration::from_millis(self.profile.stimulus_ms as u64));
        }
        Some(self.trial_started_at + Duration::from_millis(self.profile.interval_ms as u64))
    }

    /// Advance through every deadline that elapsed at or before `now`.
    ///
    /// Paused and finished sessions report nothing. A poll that lands long
    /// after several deadlines replays them in order, judging each missed
    /// trial as a timeout.
    pub fn poll(&mut self, now: Instant) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.is_paused() || self.is_terminal() {
            return events;
        }

        loop {
            let start = self.trial_started_at;

            if !self.presented {
                if now < start {
                    break;
                }
                self.presented = true;
                events.push(SessionEvent::Presented {
                    trial: self.idx,
                    cell: self.sequence[self.idx as usize],
                });
            }

            let elapsed = now.duration_since(start);

            if !self.hidden && elapsed >= Duration::from_millis(self.profile.stimulus_ms as u64) {
                self.hidden = true;
                if self.judgeable() {
                    self.phase = Phase::AwaitingResponse;
                }
                events.push(SessionEvent::StimulusHidden { trial: self.idx });
            }

            if elapsed >= Duration::from_millis(self.profile.interval_ms as u64) {
                self.close_trial(&mut events);
                if self.is_terminal() {
                    break;
                }
                continue;
            }
            break;
        }
        events
    }

    /// Timer entry point guarded by the epoch check. Returns no events when
    /// `epoch` is stale.
    pub fn fire_timer(&mut self, epoch: u64, now: Instant) -> Vec<SessionEvent> {
        if epoch != self.epoch {
            return Vec::new();
        }
        self.poll(now)
    }

    /// Judge the current trial against an explicit claim.
    ///
    /// Returns `None` when the response cannot be accepted: memorization
    /// trials, paused or finished sessions, a trial that is not on screen
    /// yet, or a trial that is already judged (first response wins, no
    /// double-counting).
    pub fn submit_response(&mut self, claim_match: bool, now: Instant) -> Option<TrialResult> {
        if self.is_paused() || self.is_terminal() {
            return None;
        }
        if !self.judgeable() || !self.presented || self.judged {
            return None;
        }
        let elapsed = now.duration_since(self.trial_started_at);
        let response_ms = elapsed.as_millis().min(u32::MAX as u128) as u32;
        Some(self.judge(claim_match, response_ms, false))
    }

    /// Freeze the trial clock. Outstanding timers are invalidated by the
    /// epoch bump so nothing fires into the frozen state.
    pub fn pause(&mut self, now: Instant) {
        if self.is_paused() || self.is_terminal() {
            return;
        }
        self.paused_at = Some(now);
        self.epoch += 1;
    }

    /// Continue the current trial where it left off. The trial origin shifts
    /// by the paused duration, so nothing is replayed and nothing is judged
    /// twice.
    pub fn resume(&mut self, now: Instant) {
        let Some(paused_at) = self.paused_at.take() else {
            return;
        };
        self.trial_started_at += now.duration_since(paused_at);
        self.epoch += 1;
    }

    /// Abandon the run. The accumulated state is discarded; no summary is
    /// ever produced for a cancelled session.
    pub fn exit(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.phase = Phase::Cancelled;
        self.epoch += 1;
    }

    /// The completed-session summary, if the run finished.
    pub fn summary(&self) -> Option<SessionSummary> {
        matches!(self.phase, Phase::Completed).then(|| self.build_summary())
    }

    fn judgeable(&self) -> bool {
        self.idx >= self.profile.n_back
    }

    fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Completed | Phase::Cancelled)
    }

    fn judge(&mut self, claim: bool, response_ms: u32, timed_out: bool) -> TrialResult {
        let actual = sequence::is_match(&self.sequence, self.idx as usize, self.profile.n_back);
        let correct = claim == actual;
        self.stats
            .record(correct, 10 * self.profile.n_back, response_ms);
        self.judged = true;
        TrialResult {
            trial: self.idx,
            claimed_match: claim,
            actual_match: actual,
            correct,
            response_ms,
            timed_out,
        }
    }

    fn close_trial(&mut self, events: &mut Vec<SessionEvent>) {
        if self.judgeable() && !self.judged {
            // Deadline with no response: an automatic no-match claim, judged
            // like any other. Not a skipped trial.
            let result = self.judge(false, self.profile.interval_ms, true);
            events.push(SessionEvent::Judged {
                result,
                stats: self.stats.clone(),
            });
        }

        if self.idx as usize + 1 == self.sequence.len() {
            self.phase = Phase::Completed;
            self.epoch += 1;
            events.push(SessionEvent::Completed {
                summary: self.build_summary(),
            });
            return;
        }

        self.idx += 1;
        self.trial_started_at += Duration::from_millis(self.profile.interval_ms as u64);
        self.presented = false;
        self.hidden = false;
        self.judged = false;
        self.epoch += 1;
        self.phase = if self.judgeable() {
            Phase::Presenting
        } else {
            Phase::Memorizing
        };
    }

    fn build_summary(&self) -> SessionSummary {
        // Accuracy crosses the API as a rounded 0-100 percent, and XP uses the
        // same rounded value: xp = score/10 + 2 points per accuracy percent.
        let accuracy = self.stats.accuracy_pct().round();
        SessionSummary {
            level: self.profile.level,
            score: self.stats.score,
            accuracy,
            correct_count: self.stats.correct,
            total_questions: self.stats.judged,
            best_streak: self.stats.best_streak,
            avg_response_ms: self.stats.avg_response_ms(),
            fastest_response_ms: self.stats.fastest_response_ms(),
            slowest_response_ms: self.stats.slowest_response_ms(),
            xp_earned: (self.stats.score as f32 * 0.1 + accuracy * 2.0).round() as u32,
            next_level_unlocked: accuracy >= 80.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::is_match;

    fn at(t0: Instant, ms: u64) -> Instant {
        t0 + Duration::from_millis(ms)
    }

    /// Level-1 session over a fixed sequence: n_back=2, 20 trials,
    /// stimulus 500 ms, interval 2500 ms, 3x3 grid.
    fn fixed_session(t0: Instant) -> Session {
        let profile = DifficultyProfile::for_level(1);
        let sequence: Vec<u16> = vec![0, 1, 0, 3, 4, 3, 6, 7, 6, 0, 1, 0, 3, 4, 3, 6, 7, 6, 0, 1];
        Session::from_parts(profile, sequence, t0)
    }

    fn completed_summary(events: &[SessionEvent]) -> Option<SessionSummary> {
        events.iter().find_map(|e| match e {
            SessionEvent::Completed { summary } => Some(summary.clone()),
            _ => None,
        })
    }

    #[test]
    fn first_poll_presents_the_first_trial() {
        let t0 = Instant::now();
        let mut s = fixed_session(t0);
        let events = s.poll(t0);
        assert_eq!(
            events,
            vec![SessionEvent::Presented { trial: 0, cell: 0 }]
        );
        assert_eq!(s.phase(), Phase::Memorizing);
    }

    #[test]
    fn memorization_trials_reject_responses_and_are_never_judged() {
        let t0 = Instant::now();
        let mut s = fixed_session(t0);
        s.poll(t0);
        assert_eq!(s.submit_response(true, at(t0, 600)), None);

        // Run through both memorization trials.
        let events = s.poll(at(t0, 5_000));
        assert!(events
            .iter()
            .all(|e| !matches!(e, SessionEvent::Judged { .. })));
        assert_eq!(s.trial_index(), 2);
        assert_eq!(s.stats().judged, 0);
    }

    #[test]
    fn perfect_session_scores_every_judged_trial() {
        let t0 = Instant::now();
        let mut s = fixed_session(t0);
        let interval = s.profile().interval_ms as u64;
        let n_back = s.profile().n_back;
        let len = s.profile().sequence_len;

        let mut all_events = s.poll(t0);
        for trial in 0..len {
            let start = trial as u64 * interval;
            if trial >= n_back {
                let claim = is_match(s.sequence(), trial as usize, n_back);
                let result = s
                    .submit_response(claim, at(t0, start + 700))
                    .expect("response accepted");
                assert!(result.correct);
                assert_eq!(result.response_ms, 700);
            }
            all_events.extend(s.poll(at(t0, (trial as u64 + 1) * interval)));
        }

        let summary = completed_summary(&all_events).expect("session completed");
        let judged = len - n_back;
        assert_eq!(summary.accuracy, 100.0);
        assert_eq!(summary.total_questions, judged);
        assert_eq!(summary.best_streak, judged);
        assert_eq!(summary.score, 10 * n_back * judged);
        assert_eq!(summary.avg_response_ms, 700);
        assert!(summary.next_level_unlocked);
        // xp = score/10 + 2 per accuracy percent.
        assert_eq!(summary.xp_earned, (summary.score / 10) + 200);
        assert_eq!(s.summary(), Some(summary));
    }

    #[test]
    fn unanswered_session_times_out_every_trial_as_no_match() {
        let t0 = Instant::now();
        let mut s = fixed_session(t0);
        let interval = s.profile().interval_ms as u64;
        let n_back = s.profile().n_back;
        let len = s.profile().sequence_len as usize;

        // One late poll replays the whole run.
        let events = s.poll(at(t0, len as u64 * interval));

        let judged: Vec<&TrialResult> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Judged { result, .. } => Some(result),
                _ => None,
            })
            .collect();
        assert_eq!(judged.len(), len - n_back as usize);
        assert!(judged.iter().all(|r| r.timed_out && !r.claimed_match));

        // A timeout is a no-match claim, so exactly the true non-matches are
        // scored correct.
        let non_matches = (n_back as usize..len)
            .filter(|&i| !is_match(s.sequence(), i, n_back))
            .count() as u32;
        let summary = completed_summary(&events).expect("session completed");
        assert_eq!(summary.correct_count, non_matches);
        let expected_pct =
            (non_matches as f32 / (len as u32 - n_back) as f32 * 100.0).round();
        assert_eq!(summary.accuracy, expected_pct);
    }

    #[test]
    fn first_response_wins_and_later_ones_are_ignored() {
        let t0 = Instant::now();
        let mut s = fixed_session(t0);
        let interval = s.profile().interval_ms as u64;

        let mut events = s.poll(at(t0, 2 * interval)); // trial 2 on screen
        assert_eq!(s.trial_index(), 2);

        assert!(s.submit_response(true, at(t0, 2 * interval + 600)).is_some());
        assert_eq!(s.submit_response(false, at(t0, 2 * interval + 700)), None);

        // The deadline must not judge the trial a second time.
        events.extend(s.poll(at(t0, 3 * interval)));
        let judged_for_trial_2 = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Judged { result, .. } if result.trial == 2))
            .count();
        assert_eq!(judged_for_trial_2, 0); // responses are reported by submit, not poll
        assert_eq!(s.stats().judged, 1);
    }

    #[test]
    fn pause_freezes_the_trial_and_resume_continues_it() {
        let t0 = Instant::now();
        let mut s = fixed_session(t0);
        s.poll(t0);

        s.pause(at(t0, 100));
        assert!(s.is_paused());
        assert_eq!(s.submit_response(true, at(t0, 200)), None);

        // Long past every deadline: a frozen session must not move.
        assert!(s.poll(at(t0, 60_000)).is_empty());
        assert_eq!(s.trial_index(), 0);

        // Resume 59.9 s later; only 100 ms of trial time has been consumed,
        // so the stimulus is still up and nothing was re-presented.
        s.resume(at(t0, 60_000));
        let events = s.poll(at(t0, 60_100));
        assert!(events.is_empty());
        assert_eq!(s.trial_index(), 0);

        // The trial now runs out 2500 ms of live time after its start.
        let events = s.poll(at(t0, 60_000 + 2_400));
        assert!(events.iter().any(|e| matches!(e, SessionEvent::Presented { trial: 1, .. })));
        assert_eq!(s.trial_index(), 1);
    }

    #[test]
    fn paused_trial_is_never_judged_twice_across_resume() {
        let t0 = Instant::now();
        let mut s = fixed_session(t0);
        let interval = s.profile().interval_ms as u64;

        s.poll(at(t0, 2 * interval));
        assert_eq!(s.trial_index(), 2);
        assert!(s.submit_response(true, at(t0, 2 * interval + 600)).is_some());

        s.pause(at(t0, 2 * interval + 700));
        s.resume(at(t0, 2 * interval + 10_000));

        // Judged before the pause; the post-resume deadline only advances.
        let events = s.poll(at(t0, 2 * interval + 10_000 + interval));
        assert!(events
            .iter()
            .all(|e| !matches!(e, SessionEvent::Judged { result, .. } if result.trial == 2)));
        assert_eq!(s.stats().judged, 1);
        assert_eq!(s.trial_index(), 3);
    }

    #[test]
    fn stale_timers_are_dropped_by_the_epoch_guard() {
        let t0 = Instant::now();
        let mut s = fixed_session(t0);
        let interval = s.profile().interval_ms as u64;

        s.poll(t0);
        let stale = s.epoch();

        // Advancing a trial supersedes the epoch.
        s.poll(at(t0, interval));
        assert_ne!(s.epoch(), stale);

        assert!(s.fire_timer(stale, at(t0, 10 * interval)).is_empty());
        assert_eq!(s.trial_index(), 1);

        // The current epoch still drives the machine.
        assert!(!s.fire_timer(s.epoch(), at(t0, 2 * interval)).is_empty());
    }

    #[test]
    fn pausing_invalidates_outstanding_timers() {
        let t0 = Instant::now();
        let mut s = fixed_session(t0);
        s.poll(t0);

        let pre_pause = s.epoch();
        s.pause(at(t0, 100));
        assert!(s.fire_timer(pre_pause, at(t0, 10_000)).is_empty());
        assert_eq!(s.trial_index(), 0);
    }

    #[test]
    fn exit_discards_the_run_without_a_summary() {
        let t0 = Instant::now();
        let mut s = fixed_session(t0);
        let interval = s.profile().interval_ms as u64;

        s.poll(at(t0, 3 * interval));
        s.exit();

        assert_eq!(s.phase(), Phase::Cancelled);
        assert_eq!(s.summary(), None);
        assert!(s.poll(at(t0, 100 * interval)).is_empty());
        assert_eq!(s.submit_response(true, at(t0, 100 * interval)), None);
    }

    #[test]
    fn clamped_level_still_starts_a_valid_session() {
        let t0 = Instant::now();
        let s = Session::start(9_999, 7, t0);
        assert_eq!(s.profile().level, 250);
        assert_eq!(s.sequence().len(), 50);
    }

    #[test]
    fn response_time_is_clamped_to_zero_for_early_clocks() {
        let t0 = Instant::now();
        let mut s = fixed_session(t0);
        let interval = s.profile().interval_ms as u64;
        s.poll(at(t0, 2 * interval));

        // A host clock that lags the trial origin yields 0, not a panic.
        let result = s.submit_response(false, t0).expect("accepted");
        assert_eq!(result.response_ms, 0);
    }
}
