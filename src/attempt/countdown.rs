use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration};

/// Countdown state. `Expired` is terminal: once reached, further ticks are
/// no-ops, which is what makes the expiry one-shot by construction rather
/// than by a flag at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CountdownState {
    Idle,
    Running,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CountdownEvent {
    Tick { remaining: u64 },
    Expired,
}

/// Pure second-resolution countdown. The async driver below owns the actual
/// clock; keeping the transitions here makes them testable tick by tick.
#[derive(Debug, Clone)]
pub(crate) struct Countdown {
    remaining: u64,
    state: CountdownState,
}

impl Countdown {
    pub(crate) fn new() -> Self {
        Self { remaining: 0, state: CountdownState::Idle }
    }

    /// Idle → Running. Called once the server has acknowledged the attempt,
    /// never on mere exam load.
    pub(crate) fn start(&mut self, seconds: u64) {
        self.remaining = seconds;
        self.state = CountdownState::Running;
    }

    /// Advances one second. Returns the event to publish, or `None` when the
    /// countdown is idle or already expired.
    pub(crate) fn tick(&mut self) -> Option<CountdownEvent> {
        if self.state != CountdownState::Running {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = CountdownState::Expired;
            return Some(CountdownEvent::Expired);
        }
        Some(CountdownEvent::Tick { remaining: self.remaining })
    }

    pub(crate) fn remaining(&self) -> u64 {
        self.remaining
    }

    pub(crate) fn state(&self) -> CountdownState {
        self.state
    }
}

/// "M:SS" display form of a remaining-seconds count.
pub(crate) fn format_remaining(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Cancels the countdown task when dropped, so tearing the session down can
/// never leave a timer firing against it.
#[derive(Debug)]
pub(crate) struct CountdownHandle {
    cancel: watch::Sender<bool>,
}

impl CountdownHandle {
    pub(crate) fn cancel(&self) {
        self.cancel.send_replace(true);
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
    }
}

/// Spawns the 1 Hz driver for a countdown of `seconds`. Events arrive on the
/// returned channel; the task ends on expiry, cancellation, or when the
/// receiver goes away. `Expired` is delivered reliably; plain ticks are
/// dropped under backpressure rather than stalling the clock.
pub(crate) fn spawn_countdown(seconds: u64) -> (CountdownHandle, mpsc::Receiver<CountdownEvent>) {
    let (events_tx, events_rx) = mpsc::channel(32);
    let (cancel_tx, mut cancel_rx) = watch::channel(false);

    let mut countdown = Countdown::new();
    countdown.start(seconds);

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(1));
        // The first interval tick completes immediately; the countdown's
        // first decrement belongs one second after start.
        ticker.tick().await;

        loop {
            tokio::select! {
                // Cancellation wins over a due tick: teardown must stop the
                // clock even when both are ready.
                biased;
                _ = cancel_rx.changed() => break,
                _ = ticker.tick() => {
                    match countdown.tick() {
                        Some(CountdownEvent::Expired) => {
                            if events_tx.send(CountdownEvent::Expired).await.is_err() {
                                tracing::debug!("Countdown receiver dropped before expiry");
                            }
                            break;
                        }
                        Some(event) => {
                            if events_tx.try_send(event).is_err() && events_tx.is_closed() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        tracing::debug!(
            state = ?countdown.state(),
            remaining = countdown.remaining(),
            "Countdown stopped"
        );
    });

    (CountdownHandle { cancel: cancel_tx }, events_rx)
}
