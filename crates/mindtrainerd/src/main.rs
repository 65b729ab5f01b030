//! Mind Trainer daemon - local training-session host
//!
//! Runs in the background and manages:
//! - The active n-back session and its timers
//! - In-memory player progress and achievements
//! - Coach insights and neuroscience reading content
//! - IPC server for UI clients
//!
//! Nothing is written to disk: all state lives for the lifetime of the
//! process and is discarded with it.

use mindtrainer::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

mod coach;
mod content;
mod error;

use coach::{CoachContext, CoachReport, CoachRuntime};
use content::{ContentRuntime, Topic};
use error::DaemonError;

const DEFAULT_ADDR: &str = "127.0.0.1:9877";

/// Session timers are polled on this cadence; precise deadlines live inside
/// the engine, so the tick only bounds delivery latency.
const TICK_MS: u64 = 20;

/// Cap on buffered session events so an idle client cannot grow the queue
/// without limit.
const MAX_BUFFERED_EVENTS: usize = 256;

// ═══════════════════════════════════════════════════════════════════════════
// Protocol Messages
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum Request {
    /// Start (or replace) the active session. Level is clamped to 1-250.
    StartSession {
        level: u32,
        #[serde(default)]
        seed: Option<u64>,
    },
    /// Player's match/no-match claim for the current trial.
    SubmitResponse { claim_match: bool },
    Pause,
    Resume,
    /// Discard the active session without a summary.
    ExitSession,
    /// Snapshot plus all session events since the last call.
    GetState,
    GetProgress,
    /// Difficulty preview for a level (the "next level" card).
    ProfileFor { level: u32 },
    CoachGet,
    /// Force a coach invocation outside its cadence.
    CoachOnce,
    ContentGet { topic: String },
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum Response {
    State(Box<StateSnapshot>),
    Profile {
        profile: DifficultyProfile,
    },
    Judged {
        result: TrialResult,
    },
    Progress {
        progress: PlayerProgress,
        #[serde(default)]
        recommended_level: Option<u32>,
        #[serde(default)]
        new_achievements: Vec<Achievement>,
    },
    Coach {
        #[serde(default)]
        report: Option<CoachReport>,
    },
    Content {
        topic: String,
        label: String,
        text: String,
        generated: bool,
    },
    Success {
        message: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateSnapshot {
    running: bool,
    #[serde(default)]
    session: Option<SessionSnapshot>,
    #[serde(default)]
    events: Vec<SessionEvent>,
    #[serde(default)]
    last_summary: Option<SessionSummary>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Daemon State
// ═══════════════════════════════════════════════════════════════════════════

struct DaemonState {
    session: Option<Session>,
    progress: PlayerProgress,
    coach: CoachRuntime,
    content: ContentRuntime,
    events: Vec<SessionEvent>,
    last_summary: Option<SessionSummary>,
    last_new_achievements: Vec<Achievement>,
    rng_state: u64,
}

impl DaemonState {
    fn new() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9E37_79B9_7F4A_7C15);

        Self {
            session: None,
            progress: PlayerProgress::new(),
            coach: CoachRuntime::new_from_env(),
            content: ContentRuntime::new_from_env(),
            events: Vec::new(),
            last_summary: None,
            last_new_achievements: Vec::new(),
            rng_state: seed | 1,
        }
    }

    #[inline]
    fn next_seed(&mut self) -> u64 {
        // xorshift64* (same family the engine uses) for per-session seeds.
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn coach_context(&self) -> CoachContext {
        let last = self.last_summary.as_ref();
        CoachContext {
            sessions: self.progress.sessions,
            total_xp: self.progress.total_xp,
            level: last.map(|s| s.level).unwrap_or(MIN_LEVEL),
            accuracy: last.map(|s| s.accuracy).unwrap_or(0.0),
            best_streak: self.progress.best_streak,
            avg_response_ms: last.map(|s| s.avg_response_ms).unwrap_or(0),
            highest_unlocked_level: self.progress.highest_unlocked_level,
        }
    }

    fn tick(&mut self, now: Instant) {
        let events = match self.session.as_mut() {
            Some(session) => session.poll(now),
            None => return,
        };

        let mut completed = false;
        for event in &events {
            if let SessionEvent::Completed { summary } = event {
                info!(
                    level = summary.level,
                    score = summary.score,
                    accuracy = summary.accuracy as f64,
                    "session completed"
                );
                self.last_new_achievements = self.progress.apply(summary);
                self.last_summary = Some(summary.clone());
                completed = true;
            }
        }

        self.events.extend(events);
        if self.events.len() > MAX_BUFFERED_EVENTS {
            let drop = self.events.len() - MAX_BUFFERED_EVENTS;
            self.events.drain(0..drop);
        }

        // Coach runs on its session cadence, at completion boundaries only.
        if completed && self.coach.should_invoke(self.progress.sessions) {
            let ctx = self.coach_context();
            let _ = self.coach.invoke(ctx, self.progress.sessions);
        }
    }
}

async fn dispatch(request: Request, state: &Arc<RwLock<DaemonState>>) -> Response {
    match request {
        Request::StartSession { level, seed } => {
            let mut s = state.write().await;
            let seed = seed.unwrap_or_else(|| s.next_seed());
            let session = Session::start(level, seed, Instant::now());
            let profile = *session.profile();
            info!(
                level = profile.level,
                n_back = profile.n_back,
                grid = profile.grid_dim,
                "session started"
            );
            s.events.clear();
            s.session = Some(session);
            Response::Profile { profile }
        }

        Request::SubmitResponse { claim_match } => {
            let mut s = state.write().await;
            let outcome = s.session.as_mut().map(|session| {
                let result = session.submit_response(claim_match, Instant::now());
                (result, session.stats().clone())
            });
            match outcome {
                None => Response::Error {
                    message: "No active session".to_string(),
                },
                Some((None, _)) => Response::Error {
                    message: "Response not accepted for this trial".to_string(),
                },
                Some((Some(result), stats)) => {
                    s.events.push(SessionEvent::Judged { result, stats });
                    Response::Judged { result }
                }
            }
        }

        Request::Pause => {
            let mut s = state.write().await;
            match s.session.as_mut() {
                None => Response::Error {
                    message: "No active session".to_string(),
                },
                Some(session) => {
                    session.pause(Instant::now());
                    Response::Success {
                        message: "Session paused".to_string(),
                    }
                }
            }
        }

        Request::Resume => {
            let mut s = state.write().await;
            match s.session.as_mut() {
                None => Response::Error {
                    message: "No active session".to_string(),
                },
                Some(session) => {
                    session.resume(Instant::now());
                    Response::Success {
                        message: "Session resumed".to_string(),
                    }
                }
            }
        }

        Request::ExitSession => {
            let mut s = state.write().await;
            match s.session.take() {
                None => Response::Error {
                    message: "No active session".to_string(),
                },
                Some(mut session) => {
                    session.exit();
                    // A cancelled run is discarded wholesale, queued events
                    // included.
                    s.events.clear();
                    Response::Success {
                        message: "Session discarded".to_string(),
                    }
                }
            }
        }

        Request::GetState => {
            let mut s = state.write().await;
            let events = std::mem::take(&mut s.events);
            let running = s.session.as_ref().is_some_and(|session| {
                !session.is_paused()
                    && !matches!(session.phase(), Phase::Completed | Phase::Cancelled)
            });
            Response::State(Box::new(StateSnapshot {
                running,
                session: s.session.as_ref().map(Session::snapshot),
                events,
                last_summary: s.last_summary.clone(),
            }))
        }

        Request::GetProgress => {
            let s = state.read().await;
            Response::Progress {
                progress: s.progress.clone(),
                recommended_level: s
                    .last_summary
                    .as_ref()
                    .map(|summary| s.progress.recommended_level(summary)),
                new_achievements: s.last_new_achievements.clone(),
            }
        }

        Request::ProfileFor { level } => Response::Profile {
            profile: DifficultyProfile::for_level(level),
        },

        Request::CoachGet => {
            let s = state.read().await;
            Response::Coach {
                report: s.coach.last_report.clone(),
            }
        }

        Request::CoachOnce => {
            let mut s = state.write().await;
            let ctx = s.coach_context();
            let sessions = s.progress.sessions;
            let report = s.coach.invoke(ctx, sessions);
            Response::Coach {
                report: Some(report),
            }
        }

        Request::ContentGet { topic } => {
            let s = state.read().await;
            let topic = Topic::parse(&topic);
            let (text, generated) = s.content.generate(topic);
            Response::Content {
                topic: topic.key().to_string(),
                label: topic.label().to_string(),
                text,
                generated,
            }
        }

        Request::Shutdown => Response::Success {
            message: "Shutting down".to_string(),
        },
    }
}

async fn handle_client(
    stream: TcpStream,
    state: Arc<RwLock<DaemonState>>,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Malformed request: {e}");
                let response = Response::Error {
                    message: format!("Malformed request: {e}"),
                };
                writer
                    .write_all(serde_json::to_string(&response)?.as_bytes())
                    .await?;
                writer.write_all(b"\n").await?;
                continue;
            }
        };

        let shutdown = matches!(request, Request::Shutdown);
        let response = dispatch(request, &state).await;

        writer
            .write_all(serde_json::to_string(&response)?.as_bytes())
            .await?;
        writer.write_all(b"\n").await?;

        if shutdown {
            info!("Shutdown requested by client");
            std::process::exit(0);
        }
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Main
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let state = Arc::new(RwLock::new(DaemonState::new()));

    // Nothing to persist on Ctrl-C, but exit cleanly rather than mid-write.
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C: shutting down");
            std::process::exit(0);
        }
    });

    let addr =
        std::env::var("MINDTRAINERD_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| DaemonError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("Mind Trainer daemon listening on {addr}");

    // Session timer task: drive the active session's deadlines.
    let state_clone = Arc::clone(&state);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(TICK_MS)).await;
            let mut s = state_clone.write().await;
            s.tick(Instant::now());
        }
    });

    // Accept client connections
    loop {
        let (stream, peer) = listener.accept().await?;
        info!("Client connected: {peer}");
        let state_clone = Arc::clone(&state);

        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, state_clone).await {
                error!("Client handler error: {e}");
            }
        });
    }
}
