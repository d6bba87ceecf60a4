//! Sync Core.
//!
//! Single-writer coordinator for the page ⇄ catalog ⇄ playlist state.
//!
//! Architecture:
//! - Every input is a [`SyncEvent`] on one queue, consumed in order
//! - HTTP and probe work runs in spawned tasks that report back as events
//! - Timers (scan settle, deferred retry, advance cooldown) are one-shot
//!   tasks that post an event; each can be aborted independently
//! - A committed navigation bumps the scan epoch, so scans that started
//!   before it are dropped when they finish

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::events::{NavigationOrigin, ScanOutcome, ScanTrigger, SyncEvent};
use super::state::{SyncSnapshot, SyncState};
use super::tracker::{advance_target, PlayheadTracker};
use crate::config::SyncConfig;
use crate::errors::AppError;
use crate::page::probe::UNKNOWN_TITLE;
use crate::page::{PageObserver, PageProbe, Playhead};
use crate::providers::{AuthProvider, CatalogProvider, VideoLocator};
use crate::spotify::{PlaylistSummary, Track};
use crate::youtube::{LocateError, VideoRef};

/// External collaborators the core depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub page: Arc<dyn PageObserver>,
    pub catalog: Arc<dyn CatalogProvider>,
    pub videos: Arc<dyn VideoLocator>,
    pub auth: Arc<dyn AuthProvider>,
}

/// The only mutation surface of the core. Cheap to clone.
#[derive(Clone)]
pub struct SyncHandle {
    events: UnboundedSender<SyncEvent>,
    snapshot: watch::Receiver<SyncSnapshot>,
}

impl SyncHandle {
    fn send(&self, event: SyncEvent) {
        if self.events.send(event).is_err() {
            log::warn!("[SyncHandle] Coordinator has stopped");
        }
    }

    /// A credential became available.
    pub fn session_started(&self) {
        self.send(SyncEvent::SessionStarted);
    }

    /// The page-control layer reported a tab finished loading.
    pub fn tab_updated(&self) {
        self.send(SyncEvent::TabUpdated);
    }

    pub fn open_playlist(&self, playlist_id: impl Into<String>) {
        self.send(SyncEvent::OpenPlaylist {
            playlist_id: playlist_id.into(),
        });
    }

    /// User-requested jump to a playlist entry. Never suppressed.
    pub fn navigate_to(&self, index: usize) {
        self.send(SyncEvent::NavigateTo {
            index,
            origin: NavigationOrigin::User,
        });
    }

    pub async fn add_current_track(&self) -> Result<(), AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(SyncEvent::AddCurrentTrack { reply });
        rx.await
            .map_err(|_| AppError::Internal("Coordinator has stopped".to_string()))?
    }

    pub async fn list_playlists(&self) -> Result<Vec<PlaylistSummary>, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(SyncEvent::ListPlaylists { reply });
        rx.await
            .map_err(|_| AppError::Internal("Coordinator has stopped".to_string()))?
    }

    pub fn logout(&self) {
        self.send(SyncEvent::Logout);
    }

    pub fn shutdown(&self) {
        self.send(SyncEvent::Shutdown);
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.snapshot.clone()
    }
}

pub struct SyncCoordinator {
    config: SyncConfig,
    state: SyncState,
    probe: PageProbe,
    catalog: Arc<dyn CatalogProvider>,
    videos: Arc<dyn VideoLocator>,
    auth: Arc<dyn AuthProvider>,
    events_tx: UnboundedSender<SyncEvent>,
    events_rx: UnboundedReceiver<SyncEvent>,
    snapshot_tx: watch::Sender<SyncSnapshot>,
    scan_epoch: u64,
    scan_timer: Option<JoinHandle<()>>,
    retry_timer: Option<JoinHandle<()>>,
    cooldown_timer: Option<JoinHandle<()>>,
    advance_in_flight: bool,
    tracker: Option<PlayheadTracker>,
    requested_playlist: Option<String>,
}

impl SyncCoordinator {
    /// Start the coordinator on the current runtime.
    pub fn spawn(config: SyncConfig, deps: Collaborators) -> (SyncHandle, JoinHandle<()>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SyncSnapshot::default());

        let coordinator = Self {
            config,
            state: SyncState::new(),
            probe: PageProbe::new(deps.page),
            catalog: deps.catalog,
            videos: deps.videos,
            auth: deps.auth,
            events_tx: events_tx.clone(),
            events_rx,
            snapshot_tx,
            scan_epoch: 0,
            scan_timer: None,
            retry_timer: None,
            cooldown_timer: None,
            advance_in_flight: false,
            tracker: None,
            requested_playlist: None,
        };

        let handle = SyncHandle {
            events: events_tx,
            snapshot: snapshot_rx,
        };

        (handle, tokio::spawn(coordinator.run()))
    }

    async fn run(mut self) {
        log::info!("[SyncCoordinator] Started");
        self.publish();

        while let Some(event) = self.events_rx.recv().await {
            if matches!(event, SyncEvent::Shutdown) {
                break;
            }
            self.handle_event(event).await;
            self.sync_tracker();
            self.publish();
        }

        self.reset();
        log::info!("[SyncCoordinator] Stopped");
    }

    async fn handle_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::SessionStarted => self.request_scan(ScanTrigger::SessionStart),
            SyncEvent::TabUpdated => self.request_scan(ScanTrigger::TabUpdated),
            SyncEvent::ScanDue { trigger } => {
                if trigger == ScanTrigger::Retry {
                    self.retry_timer = None;
                } else {
                    self.scan_timer = None;
                }
                self.start_scan(trigger);
            }
            SyncEvent::ScanFinished {
                epoch,
                trigger,
                outcome,
            } => self.finish_scan(epoch, trigger, outcome),
            SyncEvent::OpenPlaylist { playlist_id } => self.open_playlist(playlist_id),
            SyncEvent::PlaylistLoaded { playlist } => {
                if self.requested_playlist.as_deref() != Some(playlist.id.as_str()) {
                    log::info!(
                        "[SyncCoordinator] Discarding stale load of playlist {}",
                        playlist.id
                    );
                    return;
                }
                log::info!(
                    "[SyncCoordinator] Playlist '{}' loaded ({} entries)",
                    playlist.name,
                    playlist.len()
                );
                self.state.set_playlist(Some(playlist));
            }
            SyncEvent::TrackAdded { playlist_id, uri } => {
                if self
                    .state
                    .current_playlist()
                    .is_some_and(|p| p.id == playlist_id)
                {
                    self.state.mark_added(&uri);
                }
            }
            SyncEvent::NavigateTo { index, origin } => self.begin_navigation(index, origin),
            SyncEvent::VideoLocated {
                index,
                track,
                origin,
                result,
            } => self.commit_navigation(index, track, origin, result).await,
            SyncEvent::PlayheadSampled(sample) => self.record_sample(sample),
            SyncEvent::AdvanceCooldownElapsed => {
                self.cooldown_timer = None;
                self.advance_in_flight = false;
            }
            SyncEvent::AddCurrentTrack { reply } => self.add_current_track(reply),
            SyncEvent::ListPlaylists { reply } => self.list_playlists(reply),
            SyncEvent::Logout => {
                log::info!("[SyncCoordinator] Logging out");
                self.auth.logout().await;
                self.reset();
            }
            SyncEvent::Shutdown => {}
        }
    }

    fn override_active(&self) -> bool {
        self.state.manual_override_active(Instant::now())
    }

    fn schedule(&self, delay: Duration, event: SyncEvent) -> JoinHandle<()> {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        })
    }

    fn cancel(timer: &mut Option<JoinHandle<()>>) {
        if let Some(handle) = timer.take() {
            handle.abort();
        }
    }

    // Scanning

    fn request_scan(&mut self, trigger: ScanTrigger) {
        if self.auth.credential().is_none() {
            log::debug!("[SyncCoordinator] No credential, scanning disabled");
            return;
        }
        if self.override_active() {
            log::info!("[SyncCoordinator] Manual update active, skipping scan");
            return;
        }

        // A fresh trigger supersedes both a pending settle and a pending retry.
        Self::cancel(&mut self.retry_timer);
        Self::cancel(&mut self.scan_timer);
        self.scan_timer = Some(self.schedule(self.config.scan_delay(), SyncEvent::ScanDue { trigger }));
    }

    fn start_scan(&mut self, trigger: ScanTrigger) {
        let Some(token) = self.auth.credential() else {
            return;
        };
        if self.override_active() {
            log::info!("[SyncCoordinator] Manual update active, skipping scan");
            return;
        }

        log::info!("[SyncCoordinator] Running scan ({:?})", trigger);

        let epoch = self.scan_epoch;
        let probe = self.probe.clone();
        let catalog = self.catalog.clone();
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            let outcome = scan_page(&probe, catalog.as_ref(), &token).await;
            let _ = tx.send(SyncEvent::ScanFinished {
                epoch,
                trigger,
                outcome,
            });
        });
    }

    fn finish_scan(&mut self, epoch: u64, trigger: ScanTrigger, outcome: ScanOutcome) {
        if epoch != self.scan_epoch || self.override_active() {
            log::info!("[SyncCoordinator] Discarding scan result overtaken by navigation");
            return;
        }

        match outcome {
            ScanOutcome::NotAMediaPage => {
                if self.state.current_track().is_some() {
                    log::info!("[SyncCoordinator] Left the watch page, clearing track");
                }
                self.state.set_track(None);
            }
            ScanOutcome::Deferred if trigger == ScanTrigger::Retry => {
                log::info!("[SyncCoordinator] Page still incomplete after retry, giving up");
            }
            ScanOutcome::Deferred => {
                log::debug!("[SyncCoordinator] Page incomplete, retrying once");
                Self::cancel(&mut self.retry_timer);
                self.retry_timer = Some(self.schedule(
                    self.config.defer_retry_delay(),
                    SyncEvent::ScanDue {
                        trigger: ScanTrigger::Retry,
                    },
                ));
            }
            ScanOutcome::Resolved(track) => {
                match &track {
                    Some(t) => log::info!("[SyncCoordinator] Current track is '{}'", t.name),
                    None => log::info!("[SyncCoordinator] Page did not match any track"),
                }
                self.state.set_track(track);
            }
            ScanOutcome::Failed(reason) => {
                log::warn!("[SyncCoordinator] Scan failed: {}", reason);
            }
        }
    }

    // Playlists

    fn open_playlist(&mut self, playlist_id: String) {
        let Some(token) = self.auth.credential() else {
            log::warn!("[SyncCoordinator] Cannot load playlist without a credential");
            return;
        };

        self.requested_playlist = Some(playlist_id.clone());
        let catalog = self.catalog.clone();
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            match catalog.fetch_playlist(&playlist_id, &token).await {
                Ok(playlist) => {
                    let _ = tx.send(SyncEvent::PlaylistLoaded { playlist });
                }
                Err(e) => log::warn!("Failed to load playlist {}: {}", playlist_id, e),
            }
        });
    }

    fn add_current_track(&mut self, reply: oneshot::Sender<Result<(), AppError>>) {
        let Some(token) = self.auth.credential() else {
            let _ = reply.send(Err(AppError::Auth("Not logged in".to_string())));
            return;
        };
        let (Some(track), Some(playlist)) =
            (self.state.current_track(), self.state.current_playlist())
        else {
            let _ = reply.send(Err(AppError::NotFound(
                "No current track or playlist".to_string(),
            )));
            return;
        };
        if track.uri.is_empty() {
            let _ = reply.send(Err(AppError::NotFound(format!(
                "'{}' has no catalog URI",
                track.name
            ))));
            return;
        }

        let uri = track.uri.clone();
        let playlist_id = playlist.id.clone();
        let catalog = self.catalog.clone();
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = catalog.add_track(&playlist_id, &uri, &token).await {
                log::warn!("Error adding track to playlist: {}", e);
                let _ = reply.send(Err(e.into()));
                return;
            }

            log::info!("Track added successfully");
            let _ = tx.send(SyncEvent::TrackAdded {
                playlist_id: playlist_id.clone(),
                uri,
            });
            let _ = reply.send(Ok(()));

            match catalog.fetch_playlist(&playlist_id, &token).await {
                Ok(playlist) => {
                    let _ = tx.send(SyncEvent::PlaylistLoaded { playlist });
                }
                Err(e) => log::warn!("Failed to reload playlist {}: {}", playlist_id, e),
            }
        });
    }

    fn list_playlists(&self, reply: oneshot::Sender<Result<Vec<PlaylistSummary>, AppError>>) {
        let Some(token) = self.auth.credential() else {
            let _ = reply.send(Err(AppError::Auth("Not logged in".to_string())));
            return;
        };
        let catalog = self.catalog.clone();

        tokio::spawn(async move {
            let result = catalog.list_playlists(&token).await.map_err(AppError::from);
            let _ = reply.send(result);
        });
    }

    // Navigation

    fn begin_navigation(&mut self, index: usize, origin: NavigationOrigin) {
        let Some(playlist) = self.state.current_playlist() else {
            log::debug!("[SyncCoordinator] No playlist loaded, ignoring navigation");
            return;
        };
        if index >= playlist.len() {
            log::warn!(
                "[SyncCoordinator] Index {} out of range ({} entries)",
                index,
                playlist.len()
            );
            return;
        }
        let Some(track) = playlist.track_at(index).cloned() else {
            log::info!("[SyncCoordinator] Entry {} is unavailable", index);
            return;
        };

        let videos = self.videos.clone();
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            let result = videos.locate_video(&track).await;
            let _ = tx.send(SyncEvent::VideoLocated {
                index,
                track,
                origin,
                result,
            });
        });
    }

    /// All or nothing: state moves only if the page actually navigated.
    async fn commit_navigation(
        &mut self,
        index: usize,
        track: Track,
        origin: NavigationOrigin,
        result: Result<VideoRef, LocateError>,
    ) {
        let still_listed = self
            .state
            .current_playlist()
            .and_then(|p| p.track_at(index))
            .is_some_and(|t| t.id == track.id && t.uri == track.uri);
        if !still_listed {
            log::info!("[SyncCoordinator] Playlist changed while locating video, dropping");
            return;
        }

        let video = match result {
            Ok(video) => video,
            Err(e) => {
                log::warn!("[SyncCoordinator] Error finding video for '{}': {}", track.name, e);
                return;
            }
        };

        if let Err(e) = self.probe.navigate(&video.href).await {
            log::warn!("[SyncCoordinator] Navigation to {} failed: {}", video.href, e);
            return;
        }

        self.state
            .begin_manual_override(Instant::now(), self.config.manual_override_window());
        self.scan_epoch += 1;
        Self::cancel(&mut self.scan_timer);
        Self::cancel(&mut self.retry_timer);

        log::info!(
            "[SyncCoordinator] {:?} navigation to #{} '{}'",
            origin,
            index,
            track.name
        );
        self.state.set_track_at(index, track);
    }

    // Playhead

    fn record_sample(&mut self, sample: Option<Playhead>) {
        if self.state.current_track().is_none() {
            return;
        }

        let Some(sample) = sample else {
            self.state.record_playhead(0.0, None);
            return;
        };
        self.state
            .record_playhead(sample.position_secs, Some(sample.duration_secs));

        if self.advance_in_flight || self.override_active() {
            return;
        }

        let len = self.state.current_playlist().map_or(0, |p| p.len());
        let target = advance_target(
            &sample,
            self.state.current_index(),
            len,
            self.config.near_end_threshold_secs,
        );

        if let Some(next) = target {
            log::info!(
                "[SyncCoordinator] {:.1}s left, advancing to #{}",
                sample.duration_secs - sample.position_secs,
                next
            );
            // Cleared by the cooldown whatever the navigation's outcome.
            self.advance_in_flight = true;
            self.cooldown_timer = Some(self.schedule(
                self.config.advance_cooldown(),
                SyncEvent::AdvanceCooldownElapsed,
            ));
            self.begin_navigation(next, NavigationOrigin::AutoAdvance);
        }
    }

    fn sync_tracker(&mut self) {
        match (self.state.current_track().is_some(), self.tracker.is_some()) {
            (true, false) => {
                self.tracker = Some(PlayheadTracker::start(
                    self.probe.clone(),
                    self.config.sample_interval(),
                    self.events_tx.clone(),
                ));
            }
            (false, true) => self.tracker = None,
            _ => {}
        }
    }

    fn reset(&mut self) {
        Self::cancel(&mut self.scan_timer);
        Self::cancel(&mut self.retry_timer);
        Self::cancel(&mut self.cooldown_timer);
        self.tracker = None;
        self.advance_in_flight = false;
        self.requested_playlist = None;
        self.scan_epoch += 1;
        self.state = SyncState::new();
    }

    fn publish(&self) {
        let next = self
            .state
            .snapshot(Instant::now(), self.auth.credential().is_some());
        self.snapshot_tx.send_if_modified(|current| {
            if *current != next {
                *current = next;
                true
            } else {
                false
            }
        });
    }
}

/// One pass of probe → extract → resolve.
async fn scan_page(probe: &PageProbe, catalog: &dyn CatalogProvider, token: &str) -> ScanOutcome {
    if !probe.is_on_watch_page().await {
        return ScanOutcome::NotAMediaPage;
    }

    let metadata = match probe.extract_page_metadata().await {
        Ok(metadata) => metadata,
        Err(e) => return ScanOutcome::Failed(e.to_string()),
    };
    if metadata.is_incomplete() {
        return ScanOutcome::Deferred;
    }
    if metadata.title == UNKNOWN_TITLE {
        return ScanOutcome::Failed("Watch page has no title".to_string());
    }

    match catalog.resolve_track(&metadata.title, token).await {
        Ok(track) => ScanOutcome::Resolved(track),
        Err(e) => ScanOutcome::Failed(e.to_string()),
    }
}
