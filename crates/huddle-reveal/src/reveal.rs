//! The reveal scheduler.
//!
//! `Revealer::start` splits the reply into whitespace-delimited words and
//! spawns a task that delivers one growing prefix per word at a fixed
//! delay. Delivery and cancellation are serialized through the job's state
//! lock: once `cancel` returns, no further tick can touch the callback.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Invoked with the revealed prefix after each word lands.
pub type TickFn = Box<dyn FnMut(&str) + Send>;

/// Invoked once, after the final word has been delivered.
pub type DoneFn = Box<dyn FnOnce() + Send>;

/// Lifecycle of a reveal job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealState {
    /// Ticks are still pending.
    Running,
    /// Cancelled before the last word; unfired ticks will never deliver.
    Cancelled,
    /// Every word was delivered and the completion callback ran.
    Completed,
}

/// Factory for reveal jobs with a fixed per-word delay.
#[derive(Clone, Copy, Debug)]
pub struct Revealer {
    delay: Duration,
}

impl Revealer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Start revealing `full_text`.
    ///
    /// Each delivered prefix rejoins the words seen so far with single
    /// spaces (no leading space on the first word). Empty input completes
    /// immediately with zero ticks. The returned handle is the only way to
    /// cancel the job.
    pub fn start(&self, full_text: &str, mut on_tick: TickFn, on_done: DoneFn) -> RevealHandle {
        let tokens: Vec<String> = full_text.split_whitespace().map(str::to_owned).collect();
        let state = Arc::new(Mutex::new(RevealState::Running));

        if tokens.is_empty() {
            *state.lock().expect("reveal state mutex poisoned") = RevealState::Completed;
            on_done();
            return RevealHandle { state, task: None };
        }

        debug!(words = tokens.len(), "Reveal job started");

        let delay = self.delay;
        let shared = Arc::clone(&state);
        let task = tokio::spawn(async move {
            let mut revealed = String::new();
            // Delivery i is due at i * delay: the first word lands right
            // away, every later one after a full delay.
            for (index, token) in tokens.into_iter().enumerate() {
                if index > 0 {
                    tokio::time::sleep(delay).await;
                }
                {
                    let state = shared.lock().expect("reveal state mutex poisoned");
                    if *state != RevealState::Running {
                        return;
                    }
                    if index > 0 {
                        revealed.push(' ');
                    }
                    revealed.push_str(&token);
                    on_tick(&revealed);
                }
            }
            let completed = {
                let mut state = shared.lock().expect("reveal state mutex poisoned");
                if *state == RevealState::Running {
                    *state = RevealState::Completed;
                    true
                } else {
                    false
                }
            };
            if completed {
                on_done();
            }
        });

        RevealHandle {
            state,
            task: Some(task),
        }
    }
}

/// Cancellation token for an in-progress reveal.
pub struct RevealHandle {
    state: Arc<Mutex<RevealState>>,
    task: Option<JoinHandle<()>>,
}

impl RevealHandle {
    /// Invalidate every not-yet-fired tick.
    ///
    /// Already-fired ticks are not rolled back. Idempotent: cancelling
    /// twice, or after natural completion, changes nothing. Because the
    /// same lock guards tick delivery, no tick can fire once this returns.
    pub fn cancel(&self) {
        let mut state = self.state.lock().expect("reveal state mutex poisoned");
        if *state == RevealState::Running {
            *state = RevealState::Cancelled;
            debug!("Reveal job cancelled");
        }
    }

    pub fn state(&self) -> RevealState {
        *self.state.lock().expect("reveal state mutex poisoned")
    }

    /// Whether ticks are still pending.
    pub fn is_running(&self) -> bool {
        self.state() == RevealState::Running
    }

    /// Wait for the job task to wind down (tests and shutdown paths).
    pub async fn wait(self) {
        if let Some(task) = self.task {
            let _ = task.await;
        }
    }
}

impl std::fmt::Debug for RevealHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealHandle")
            .field("state", &self.state())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DELAY: Duration = Duration::from_millis(30);

    fn collector() -> (Arc<Mutex<Vec<String>>>, TickFn) {
        let ticks: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&ticks);
        let on_tick: TickFn = Box::new(move |prefix: &str| {
            sink.lock().unwrap().push(prefix.to_string());
        });
        (ticks, on_tick)
    }

    fn done_counter() -> (Arc<AtomicUsize>, DoneFn) {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        let on_done: DoneFn = Box::new(move || {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        (count, on_done)
    }

    /// Let the reveal task run without advancing the clock.
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    // ---- Full delivery ----

    #[tokio::test(start_paused = true)]
    async fn test_prefixes_grow_word_by_word() {
        let (ticks, on_tick) = collector();
        let (done, on_done) = done_counter();

        let handle = Revealer::new(DELAY).start("hi there friend", on_tick, on_done);
        handle.wait().await;

        assert_eq!(
            *ticks.lock().unwrap(),
            vec!["hi", "hi there", "hi there friend"]
        );
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_prefix_reconstructs_reply() {
        let (ticks, on_tick) = collector();
        let (_, on_done) = done_counter();

        let reply = "the room is booked for tuesday at three";
        let handle = Revealer::new(DELAY).start(reply, on_tick, on_done);
        handle.wait().await;

        assert_eq!(ticks.lock().unwrap().last().unwrap(), reply);
    }

    #[tokio::test(start_paused = true)]
    async fn test_irregular_whitespace_rejoins_single_spaced() {
        let (ticks, on_tick) = collector();
        let (_, on_done) = done_counter();

        let handle = Revealer::new(DELAY).start("a  b\nc", on_tick, on_done);
        handle.wait().await;

        assert_eq!(*ticks.lock().unwrap(), vec!["a", "a b", "a b c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_word_delivers_once() {
        let (ticks, on_tick) = collector();
        let (done, on_done) = done_counter();

        let handle = Revealer::new(DELAY).start("hello", on_tick, on_done);
        handle.wait().await;

        assert_eq!(*ticks.lock().unwrap(), vec!["hello"]);
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_text_completes_with_zero_ticks() {
        let (ticks, on_tick) = collector();
        let (done, on_done) = done_counter();

        let handle = Revealer::new(DELAY).start("", on_tick, on_done);

        assert_eq!(handle.state(), RevealState::Completed);
        assert!(ticks.lock().unwrap().is_empty());
        assert_eq!(done.load(Ordering::SeqCst), 1);
        handle.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_only_text_completes_with_zero_ticks() {
        let (ticks, on_tick) = collector();
        let (done, on_done) = done_counter();

        let handle = Revealer::new(DELAY).start("   \n\t ", on_tick, on_done);

        assert_eq!(handle.state(), RevealState::Completed);
        assert!(ticks.lock().unwrap().is_empty());
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    // ---- Timing ----

    #[tokio::test(start_paused = true)]
    async fn test_first_word_lands_immediately() {
        let (ticks, on_tick) = collector();
        let (_, on_done) = done_counter();

        let _handle = Revealer::new(DELAY).start("one two", on_tick, on_done);
        settle().await;
        assert_eq!(*ticks.lock().unwrap(), vec!["one"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_words_wait_the_full_delay() {
        let (ticks, on_tick) = collector();
        let (_, on_done) = done_counter();

        let _handle = Revealer::new(DELAY).start("one two", on_tick, on_done);
        settle().await;

        tokio::time::advance(Duration::from_millis(29)).await;
        settle().await;
        assert_eq!(*ticks.lock().unwrap(), vec!["one"]);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(*ticks.lock().unwrap(), vec!["one", "one two"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_fire_in_index_order() {
        let (ticks, on_tick) = collector();
        let (_, on_done) = done_counter();

        let _handle = Revealer::new(DELAY).start("a b c d", on_tick, on_done);
        settle().await;
        assert_eq!(ticks.lock().unwrap().len(), 1);

        for expected in 2..=4 {
            tokio::time::advance(DELAY).await;
            settle().await;
            assert_eq!(ticks.lock().unwrap().len(), expected);
        }
    }

    // ---- Cancellation ----

    #[tokio::test(start_paused = true)]
    async fn test_cancel_freezes_revealed_prefix() {
        let (ticks, on_tick) = collector();
        let (done, on_done) = done_counter();

        let handle = Revealer::new(DELAY).start("a b c", on_tick, on_done);
        settle().await;
        assert_eq!(*ticks.lock().unwrap(), vec!["a"]);

        handle.cancel();
        assert_eq!(handle.state(), RevealState::Cancelled);

        // Further simulated time must not produce more ticks.
        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(*ticks.lock().unwrap(), vec!["a"]);
        assert_eq!(done.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_any_tick() {
        let (ticks, on_tick) = collector();
        let (done, on_done) = done_counter();

        let handle = Revealer::new(DELAY).start("never shown", on_tick, on_done);
        // Cancel before the job task has had a chance to run at all.
        handle.cancel();

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert!(ticks.lock().unwrap().is_empty());
        assert_eq!(done.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let (_, on_tick) = collector();
        let (_, on_done) = done_counter();

        let handle = Revealer::new(DELAY).start("a b", on_tick, on_done);
        settle().await;
        handle.cancel();
        handle.cancel();
        assert_eq!(handle.state(), RevealState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_completion_is_a_no_op() {
        let (_, on_tick) = collector();
        let (done, on_done) = done_counter();

        let handle = Revealer::new(DELAY).start("a", on_tick, on_done);
        // A single word completes without any clock movement.
        settle().await;
        assert_eq!(handle.state(), RevealState::Completed);

        handle.cancel();
        assert_eq!(handle.state(), RevealState::Completed);
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_running_tracks_lifecycle() {
        let (_, on_tick) = collector();
        let (_, on_done) = done_counter();

        let handle = Revealer::new(DELAY).start("a b", on_tick, on_done);
        assert!(handle.is_running());
        handle.cancel();
        assert!(!handle.is_running());
    }
}
