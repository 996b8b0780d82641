//! Submission state machine and duplicate guard

use indexmap::IndexMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::watch;

use super::{CommentForm, CommentSink, CommentSubmission, FieldErrors};

/// Completed tokens remembered by the guard
const MAX_TRACKED_TOKENS: usize = 10_000;

/// State of one comment submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    /// Form shown, nothing sent yet
    Unsubmitted,
    /// Write request in flight; the submit control is disabled
    Submitting { token: Option<u64> },
    /// Write request resolved; terminal for this page view
    Submitted,
    /// Write request failed at the transport level; the form offers a retry
    Failed { reason: String },
}

/// Progress of a token known to the guard
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    InFlight,
    Done(Result<(), String>),
}

/// A token's progress and the submission it was first used for
#[derive(Debug)]
struct TokenSlot {
    fingerprint: u64,
    tx: watch::Sender<Slot>,
}

/// What the guard allows for a token
enum Admission {
    /// First attempt for this submission: send it under the given token
    Send(Option<u64>),
    /// Same token already in flight: wait for its result
    Wait(watch::Receiver<Slot>),
    /// Same token already delivered
    Delivered,
}

/// Ensures at most one in-flight write per submission token
///
/// Tokens come from a counter seeded with the start-up time, so they keep
/// increasing across restarts.
#[derive(Debug)]
pub struct SubmissionGuard {
    next: AtomicU64,
    slots: Mutex<IndexMap<u64, TokenSlot>>,
}

impl Default for SubmissionGuard {
    fn default() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self::starting_at(seed)
    }
}

impl SubmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(seed: u64) -> Self {
        Self {
            next: AtomicU64::new(seed),
            slots: Mutex::new(IndexMap::new()),
        }
    }

    /// Issue a fresh token for a rendered form
    pub fn issue(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Decide whether `submission` under `token` needs sending
    ///
    /// A token only deduplicates the submission it was first used with. A
    /// different payload under a known token is moved to a fresh token.
    fn admit(&self, token: u64, submission: &CommentSubmission) -> Admission {
        let fingerprint = fingerprint(submission);
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());

        let mut token = token;
        if let Some(slot) = slots.get(&token) {
            if slot.fingerprint != fingerprint {
                let fresh = loop {
                    let fresh = self.issue();
                    if !slots.contains_key(&fresh) {
                        break fresh;
                    }
                };
                tracing::debug!("Token {} reused for a different comment, sending as {}", token, fresh);
                token = fresh;
            } else {
                match Slot::clone(&slot.tx.borrow()) {
                    Slot::InFlight => return Admission::Wait(slot.tx.subscribe()),
                    Slot::Done(Ok(())) => return Admission::Delivered,
                    // A failed attempt may be retried with the same token
                    Slot::Done(Err(_)) => {}
                }
            }
        }

        let (tx, _) = watch::channel(Slot::InFlight);
        slots.insert(token, TokenSlot { fingerprint, tx });
        while slots.len() > MAX_TRACKED_TOKENS {
            slots.shift_remove_index(0);
        }
        Admission::Send(Some(token))
    }

    fn finish(&self, token: u64, result: Result<(), String>) {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = slots.get(&token) {
            slot.tx.send_replace(Slot::Done(result));
        }
    }
}

fn fingerprint(submission: &CommentSubmission) -> u64 {
    let mut hasher = DefaultHasher::new();
    submission.hash(&mut hasher);
    hasher.finish()
}

/// Marks an admitted token as failed if its request is dropped mid-flight
struct PendingToken<'a> {
    guard: &'a SubmissionGuard,
    token: u64,
    done: bool,
}

impl PendingToken<'_> {
    fn finish(&mut self, result: Result<(), String>) {
        self.guard.finish(self.token, result);
        self.done = true;
    }
}

impl Drop for PendingToken<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.guard
                .finish(self.token, Err("submission was abandoned".to_string()));
        }
    }
}

/// Drives one submission from form input to a final state
pub struct SubmissionFlow<'a> {
    sink: &'a dyn CommentSink,
    guard: &'a SubmissionGuard,
    state: SubmissionState,
    token: Option<u64>,
}

impl<'a> SubmissionFlow<'a> {
    pub fn new(sink: &'a dyn CommentSink, guard: &'a SubmissionGuard) -> Self {
        Self {
            sink,
            guard,
            state: SubmissionState::Unsubmitted,
            token: None,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Token the last submission went out under; a retry should reuse it
    pub fn token(&self) -> Option<u64> {
        self.token
    }

    /// Validate and send a submission for `post_id`
    ///
    /// Validation errors leave the state untouched and nothing is sent.
    /// Otherwise the flow ends in `Submitted` or `Failed`.
    pub async fn submit(&mut self, post_id: &str, form: &CommentForm) -> Result<(), FieldErrors> {
        if matches!(
            self.state,
            SubmissionState::Submitted | SubmissionState::Submitting { .. }
        ) {
            return Ok(());
        }

        let submission = form.validate(post_id)?;
        let admission = match form.submission_token {
            Some(token) => self.guard.admit(token, &submission),
            None => Admission::Send(None),
        };
        let token = match &admission {
            Admission::Send(sent) => *sent,
            _ => form.submission_token,
        };
        self.token = token;
        self.state = SubmissionState::Submitting { token };

        let result = match admission {
            Admission::Delivered => {
                tracing::debug!("Duplicate submission {:?} already delivered", token);
                Ok(())
            }
            Admission::Wait(mut rx) => {
                tracing::debug!("Duplicate submission {:?} waiting for first attempt", token);
                let done = rx
                    .wait_for(|slot| matches!(slot, Slot::Done(_)))
                    .await
                    .map(|slot| Slot::clone(&slot));
                match done {
                    Ok(Slot::Done(result)) => result,
                    // The sender only goes away once the slot is evicted
                    _ => Err("submission was abandoned".to_string()),
                }
            }
            Admission::Send(_) => {
                let mut pending = token.map(|token| PendingToken {
                    guard: self.guard,
                    token,
                    done: false,
                });
                let result = self.sink.send(&submission).await.map_err(|e| {
                    tracing::warn!("Comment submission for post {} failed: {}", post_id, e);
                    e.to_string()
                });
                if let Some(pending) = pending.as_mut() {
                    pending.finish(result.clone());
                }
                result
            }
        };

        self.state = match result {
            Ok(()) => SubmissionState::Submitted,
            Err(reason) => SubmissionState::Failed { reason },
        };
        Ok(())
    }
}
