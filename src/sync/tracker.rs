//! Playhead Tracker.
//!
//! A repeating sampler that exists only while a track is current. It reads
//! the page's playhead once per interval and hands the sample to the
//! coordinator, which owns the advance decision.

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::events::SyncEvent;
use crate::page::{PageProbe, Playhead};

/// Next index to advance to, if the sample is inside the near-end window.
///
/// Needs a known position that is not the last entry. The in-flight guard
/// lives with the caller.
pub fn advance_target(
    sample: &Playhead,
    index: Option<usize>,
    playlist_len: usize,
    threshold_secs: f64,
) -> Option<usize> {
    let remaining = sample.remaining_secs()?;
    if remaining >= threshold_secs {
        return None;
    }

    let index = index?;
    (index + 1 < playlist_len).then_some(index + 1)
}

/// Handle to the sampling task. Dropping it stops sampling.
pub struct PlayheadTracker {
    handle: JoinHandle<()>,
}

impl PlayheadTracker {
    pub fn start(probe: PageProbe, interval: Duration, events: UnboundedSender<SyncEvent>) -> Self {
        log::info!("[PlayheadTracker] Started ({}ms)", interval.as_millis());

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let sample = probe.sample_playhead().await;
                if events.send(SyncEvent::PlayheadSampled(sample)).is_err() {
                    break;
                }
            }
        });

        Self { handle }
    }
}

impl Drop for PlayheadTracker {
    fn drop(&mut self) {
        self.handle.abort();
        log::info!("[PlayheadTracker] Stopped");
    }
}
