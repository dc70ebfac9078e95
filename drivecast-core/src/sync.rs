//! Lyric synchronization against the live playback position.

use crate::lrc::{LyricLine, active_line_index};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const LOG_TARGET: &str = "drivecast::sync";

/// Source of the current playback position.
///
/// Implementations usually live next to the media element and are not `Send`.
#[async_trait(?Send)]
pub trait PositionProbe {
    /// Current position, or `None` when it cannot be read right now
    async fn position(&self) -> Option<Duration>;
}

/// Line to highlight after a position change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LyricFocus {
    /// Active line, `None` before the first timestamp
    pub index: Option<usize>,
    /// Whether the active line should be scrolled into centered view
    pub scroll: bool,
}

/// Tracks the active line of one lyric sequence
#[derive(Debug, Clone)]
pub struct LyricSync {
    lines: Arc<[LyricLine]>,
    last: Option<usize>,
}

impl LyricSync {
    #[must_use]
    pub const fn new(lines: Arc<[LyricLine]>) -> Self {
        Self { lines, last: None }
    }

    /// Feed a position sample; returns a focus only when the active line changed
    pub fn observe(&mut self, position: Duration) -> Option<LyricFocus> {
        let index = active_line_index(&self.lines, position);
        if index == self.last {
            return None;
        }
        self.last = index;
        Some(LyricFocus {
            index,
            scroll: index.is_some(),
        })
    }

    /// Sample `probe` every `interval` until `cancel` fires.
    ///
    /// `on_change` runs for every focus change. An empty sequence returns
    /// immediately, as does a tick where the probe has no position.
    pub async fn run<P, F>(
        mut self,
        probe: &P,
        interval: Duration,
        cancel: CancellationToken,
        mut on_change: F,
    ) where
        P: PositionProbe + ?Sized,
        F: FnMut(LyricFocus),
    {
        if self.lines.is_empty() {
            return;
        }

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!(target: LOG_TARGET, "Lyric sync stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let Some(position) = probe.position().await else {
                        continue;
                    };
                    if let Some(focus) = self.observe(position) {
                        on_change(focus);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn lines() -> Arc<[LyricLine]> {
        vec![
            LyricLine::new(Duration::from_secs(1), "one"),
            LyricLine::new(Duration::from_secs(2), "two"),
            LyricLine::new(Duration::from_secs(3), "three"),
        ]
        .into()
    }

    /// Probe whose position advances by a fixed step each read
    struct SteppingProbe {
        position: Cell<Duration>,
        step: Duration,
    }

    #[async_trait(?Send)]
    impl PositionProbe for SteppingProbe {
        async fn position(&self) -> Option<Duration> {
            let position = self.position.get();
            self.position.set(position + self.step);
            Some(position)
        }
    }

    struct BlindProbe;

    #[async_trait(?Send)]
    impl PositionProbe for BlindProbe {
        async fn position(&self) -> Option<Duration> {
            None
        }
    }

    #[test]
    fn test_observe_reports_only_changes() {
        let mut sync = LyricSync::new(lines());

        assert_eq!(sync.observe(Duration::from_millis(500)), None);
        assert_eq!(
            sync.observe(Duration::from_millis(1500)),
            Some(LyricFocus {
                index: Some(0),
                scroll: true
            })
        );
        assert_eq!(sync.observe(Duration::from_millis(1900)), None);
        assert_eq!(
            sync.observe(Duration::from_secs(2)),
            Some(LyricFocus {
                index: Some(1),
                scroll: true
            })
        );
    }

    #[test]
    fn test_seek_before_first_line_clears_focus() {
        let mut sync = LyricSync::new(lines());
        sync.observe(Duration::from_secs(10));
        assert_eq!(
            sync.observe(Duration::ZERO),
            Some(LyricFocus {
                index: None,
                scroll: false
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_walks_through_lines() {
        let probe = SteppingProbe {
            position: Cell::new(Duration::ZERO),
            step: Duration::from_millis(500),
        };
        let cancel = CancellationToken::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let stop = cancel.clone();
        LyricSync::new(lines())
            .run(&probe, Duration::from_millis(100), cancel, move |focus| {
                sink.borrow_mut().push(focus.index);
                if focus.index == Some(2) {
                    stop.cancel();
                }
            })
            .await;

        assert_eq!(*seen.borrow(), vec![Some(0), Some(1), Some(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let calls = Cell::new(0);

        let stop = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            stop.cancel();
        });

        LyricSync::new(lines())
            .run(&BlindProbe, Duration::from_millis(100), cancel, |_| {
                calls.set(calls.get() + 1);
            })
            .await;

        assert_eq!(calls.get(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_no_lines_returns_immediately() {
        let probe = SteppingProbe {
            position: Cell::new(Duration::ZERO),
            step: Duration::from_secs(1),
        };
        LyricSync::new(Arc::from(Vec::<LyricLine>::new()))
            .run(&probe, Duration::from_millis(100), CancellationToken::new(), |_| {
                unreachable!("no lines to focus");
            })
            .await;
    }
}
