// src/session.rs

use std::collections::HashMap;

use crate::grading::AnswerMap;

/// Result of one clock tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Countdown still running; seconds left after this tick.
    Running { remaining: u64 },
    /// The countdown just hit zero. Fired at most once per session: the
    /// caller must submit the returned answer sheet now.
    ForceSubmit(AnswerMap),
    /// Session already submitted (or expired); the clock is frozen.
    Idle,
}

/// One test-taking session's local state: the countdown, the answers typed so
/// far, and whether a submission has already gone out.
///
/// This is deadline enforcement on the client side only. The server holds no
/// per-session state and accepts a submission whenever it arrives; the clock
/// exists so a session produces at most one submission, manual or forced.
/// The caller drives `tick` once per second from whatever timer it owns.
#[derive(Debug, Clone)]
pub struct ExamSession {
    remaining_seconds: u64,
    answers: HashMap<i64, String>,
    submitted: bool,
}

impl ExamSession {
    /// Starts a session seeded from the test's duration. The publish window
    /// plays no part here.
    pub fn new(duration_minutes: u64) -> Self {
        ExamSession {
            remaining_seconds: duration_minutes * 60,
            answers: HashMap::new(),
            submitted: false,
        }
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Records or overwrites the local answer for one question. Ignored once
    /// the session has submitted.
    pub fn answer(&mut self, question_id: i64, value: impl Into<String>) {
        if self.submitted {
            return;
        }
        self.answers.insert(question_id, value.into());
    }

    /// Advances the countdown by one second.
    ///
    /// On reaching zero this returns `Tick::ForceSubmit` with whatever answers
    /// are currently held, then freezes: every later tick is `Idle`.
    pub fn tick(&mut self) -> Tick {
        if self.submitted {
            return Tick::Idle;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.submitted = true;
            return Tick::ForceSubmit(self.answer_map());
        }

        Tick::Running {
            remaining: self.remaining_seconds,
        }
    }

    /// Manual submission. Cancels the countdown and yields the answer sheet;
    /// a session that has already submitted gets `None`, so at most one
    /// submission leaves any session.
    pub fn submit(&mut self) -> Option<AnswerMap> {
        if self.submitted {
            return None;
        }
        self.submitted = true;
        Some(self.answer_map())
    }

    // Answer sheet in the wire shape: question ids become string keys.
    fn answer_map(&self) -> AnswerMap {
        self.answers
            .iter()
            .map(|(id, value)| (id.to_string(), Some(value.clone())))
            .collect()
    }
}

/// Formats a remaining-seconds value as mm:ss.
///
/// Nothing server-side renders the countdown; this is part of the session
/// API for the UI layer that owns the timer.
pub fn format_remaining(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
