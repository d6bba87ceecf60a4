//! Native-messaging host: the process the browser extension talks to over
//! stdin/stdout. Page calls go out as requests, user actions come in as
//! messages, and every state change is pushed back as a snapshot.

pub mod auth;
pub mod bridge;
pub mod codec;
pub mod protocol;

use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;

use crate::config::SyncConfig;
use crate::errors::AppError;
use crate::providers::{CatalogProvider, VideoLocator};
use crate::spotify::{Playlist, SpotifyClient};
use crate::sync::{Collaborators, SyncCoordinator, SyncHandle, SyncSnapshot};
use crate::youtube::YoutubeClient;
use auth::SessionAuth;
use bridge::HostBridge;
use codec::{encode_message, read_message, write_frame};
use protocol::{Inbound, Outbound};

/// Serve one extension connection until its input closes.
pub async fn serve<R, W>(config: SyncConfig, reader: R, writer: W) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let catalog = Arc::new(SpotifyClient::new(&config)?);
    let videos = Arc::new(YoutubeClient::new(&config)?);
    serve_with(config, catalog, videos, reader, writer).await
}

async fn serve_with<R, W>(
    config: SyncConfig,
    catalog: Arc<dyn CatalogProvider>,
    videos: Arc<dyn VideoLocator>,
    mut reader: R,
    writer: W,
) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::unbounded_channel::<Outbound>();

    let writer_task = tokio::spawn(write_loop(out_rx, writer));

    let bridge = HostBridge::new(out_tx.clone(), config.page_call_timeout());
    let auth = SessionAuth::new(out_tx.clone());

    let (handle, coordinator) = SyncCoordinator::spawn(
        config,
        Collaborators {
            page: bridge.clone(),
            catalog,
            videos,
            auth: auth.clone(),
        },
    );

    let forwarder = tokio::spawn(forward_snapshots(handle.subscribe(), out_tx.clone()));

    log::info!("[Host] Serving extension");

    let result = loop {
        let raw: Value = match read_message(&mut reader).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                log::info!("[Host] Extension closed the connection");
                break Ok(());
            }
            Err(e) => break Err(e),
        };

        match serde_json::from_value::<Inbound>(raw) {
            Ok(message) => dispatch(message, &handle, &auth, &bridge, &out_tx),
            Err(e) => log::warn!("[Host] Ignoring malformed message: {}", e),
        }
    };

    bridge.fail_all();
    handle.shutdown();
    if let Err(e) = coordinator.await {
        log::error!("[Host] Coordinator task failed: {}", e);
    }
    forwarder.abort();

    drop(handle);
    drop(auth);
    drop(bridge);
    drop(out_tx);
    let _ = writer_task.await;

    result
}

/// Drain outbound messages to the extension. A message too large to frame
/// is dropped on its own; only a failed write ends the loop.
async fn write_loop<W>(mut out_rx: UnboundedReceiver<Outbound>, mut writer: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = out_rx.recv().await {
        let frame = match encode_message(&message) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("[Host] Dropping outbound message: {}", e);
                continue;
            }
        };
        if let Err(e) = write_frame(&mut writer, &frame).await {
            log::error!("[Host] Failed to write message: {}", e);
            break;
        }
    }
}

/// Push every snapshot, preceded by the playlist's entries whenever the
/// playlist itself was replaced.
async fn forward_snapshots(
    mut snapshots: watch::Receiver<SyncSnapshot>,
    out: UnboundedSender<Outbound>,
) {
    let mut sent_playlist: Option<Arc<Playlist>> = None;

    loop {
        let snapshot = snapshots.borrow_and_update().clone();

        match &snapshot.playlist {
            Some(playlist) => {
                let already_sent = sent_playlist
                    .as_ref()
                    .is_some_and(|sent| Arc::ptr_eq(sent, playlist));
                if !already_sent {
                    for chunk in Outbound::playlist_chunks(playlist) {
                        if out.send(chunk).is_err() {
                            return;
                        }
                    }
                    sent_playlist = Some(playlist.clone());
                }
            }
            None => sent_playlist = None,
        }

        if out.send(Outbound::State { snapshot }).is_err() {
            return;
        }
        if snapshots.changed().await.is_err() {
            return;
        }
    }
}

fn dispatch(
    message: Inbound,
    handle: &SyncHandle,
    auth: &SessionAuth,
    bridge: &HostBridge,
    out: &UnboundedSender<Outbound>,
) {
    if message.is_load_complete() {
        handle.tab_updated();
        return;
    }

    match message {
        Inbound::TabUpdated { .. } => {}
        Inbound::Token { token } => {
            if auth.set_token(token) {
                log::info!("[Host] Session started");
                handle.session_started();
            }
        }
        Inbound::Logout => handle.logout(),
        Inbound::OpenPlaylist { id } => handle.open_playlist(id),
        Inbound::Navigate { index } => handle.navigate_to(index),
        Inbound::AddTrack { request_id } => {
            let handle = handle.clone();
            let out = out.clone();
            tokio::spawn(async move {
                let result = handle.add_current_track().await;
                let _ = out.send(Outbound::reply(request_id, result));
            });
        }
        Inbound::ListPlaylists { request_id } => {
            let handle = handle.clone();
            let out = out.clone();
            tokio::spawn(async move {
                let result = handle.list_playlists().await;
                let _ = out.send(Outbound::playlists(request_id, result));
            });
        }
        Inbound::Response { id, result, error } => {
            bridge.complete(id, error.map_or(Ok(result), Err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spotify::PlaylistSummary;
    use crate::testing::{playlist, track, FakeCatalog, FakeLocator};
    use super::codec::write_message;
    use serde_json::json;
    use tokio::io::DuplexStream;

    type Served = tokio::task::JoinHandle<Result<(), AppError>>;

    fn start(catalog: Arc<FakeCatalog>) -> (DuplexStream, DuplexStream, Served) {
        let (host_in, client_out) = tokio::io::duplex(64 * 1024);
        let (client_in, host_out) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(serve_with(
            SyncConfig::default(),
            catalog,
            FakeLocator::new(),
            host_in,
            host_out,
        ));
        (client_out, client_in, task)
    }

    /// Next message of the given `type`, skipping everything else.
    async fn next_of(reader: &mut DuplexStream, kind: &str) -> Value {
        loop {
            let message: Value = read_message(reader).await.unwrap().unwrap();
            if message["type"] == kind {
                return message;
            }
        }
    }

    #[tokio::test]
    async fn test_requires_login_then_lists_playlists() {
        let catalog = FakeCatalog::new();
        catalog.store_playlist(playlist("p", vec![Some(track("a", "One"))]));
        let (mut to_host, mut from_host, task) = start(catalog);

        let state = next_of(&mut from_host, "state").await;
        assert_eq!(state["snapshot"]["currentIndex"], -1);

        write_message(&mut to_host, &json!({"type": "listPlaylists", "requestId": 1}))
            .await
            .unwrap();
        let reply = next_of(&mut from_host, "reply").await;
        assert_eq!(reply["ok"], false);
        assert_eq!(reply["error"]["type"], "Auth");

        write_message(&mut to_host, &json!({"type": "token", "token": "t"}))
            .await
            .unwrap();
        write_message(&mut to_host, &json!({"type": "listPlaylists", "requestId": 2}))
            .await
            .unwrap();
        let reply = next_of(&mut from_host, "reply").await;
        assert_eq!(reply["requestId"], 2);
        assert_eq!(reply["playlists"][0]["id"], "p");

        write_message(&mut to_host, &json!({"type": "logout"}))
            .await
            .unwrap();
        next_of(&mut from_host, "login").await;

        drop(to_host);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_malformed_message_is_skipped() {
        let (mut to_host, mut from_host, task) = start(FakeCatalog::new());

        write_message(&mut to_host, &json!({"type": "bogus"}))
            .await
            .unwrap();
        write_message(&mut to_host, &json!({"type": "addTrack", "requestId": 3}))
            .await
            .unwrap();

        let reply = next_of(&mut from_host, "reply").await;
        assert_eq!(reply["requestId"], 3);
        assert_eq!(reply["ok"], false);

        drop(to_host);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_large_playlist_keeps_session_alive() {
        let catalog = FakeCatalog::new();
        let tracks = (0..9000)
            .map(|i| Some(track(&format!("t{}", i), &format!("Song number {}", i))))
            .collect();
        catalog.store_playlist(playlist("big", tracks));
        let (mut to_host, mut from_host, task) = start(catalog);

        write_message(&mut to_host, &json!({"type": "token", "token": "t"}))
            .await
            .unwrap();
        write_message(&mut to_host, &json!({"type": "openPlaylist", "id": "big"}))
            .await
            .unwrap();

        let mut received = 0;
        loop {
            let message: Value = read_message(&mut from_host).await.unwrap().unwrap();
            match message["type"].as_str() {
                Some("playlistEntries") => {
                    assert_eq!(message["offset"], received);
                    received += message["entries"].as_array().unwrap().len();
                }
                Some("state") if message["snapshot"]["playlist"]["length"] == 9000 => break,
                _ => {}
            }
        }
        assert_eq!(received, 9000);

        write_message(&mut to_host, &json!({"type": "listPlaylists", "requestId": 7}))
            .await
            .unwrap();
        let reply = next_of(&mut from_host, "reply").await;
        assert_eq!(reply["requestId"], 7);
        assert_eq!(reply["ok"], true);

        drop(to_host);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_oversized_message_does_not_stop_writer() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (host_out, mut client_in) = tokio::io::duplex(64 * 1024);
        let writer = tokio::spawn(write_loop(rx, host_out));

        let huge = PlaylistSummary {
            id: "p".to_string(),
            name: "x".repeat(super::codec::MAX_OUTBOUND_BYTES),
            images: vec![],
            tracks: None,
        };
        tx.send(Outbound::playlists(1, Ok(vec![huge]))).unwrap();
        tx.send(Outbound::Login).unwrap();
        drop(tx);

        let message: Value = read_message(&mut client_in).await.unwrap().unwrap();
        assert_eq!(message["type"], "login");
        writer.await.unwrap();
    }
}
