//! Host or join a sync session over TCP.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use todo_sync_client::{
    BlobStore, ChannelSink, StateStore, StatusUpdate, SyncSession, TcpTransport,
};
use todo_sync_core::{PeerId, SessionState, Severity};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use super::{blob_store, load_user, user_store};
use crate::config::AppConfig;

/// Run the host command: advertise an address and wait for one guest.
pub async fn host(data_dir: &Path, config: &AppConfig, listen: Option<&str>) -> Result<()> {
    let (store, blobs) = open_stores(data_dir).await?;
    let (sink, updates) = ChannelSink::new();
    let session = SyncSession::host(TcpTransport::new(config.tcp_config(listen)), store)
        .with_blobs(blobs)
        .with_status(Arc::new(sink))
        .with_config(config.session_config());
    drive(session, updates).await
}

/// Run the join command: dial a host and sync.
pub async fn join(data_dir: &Path, config: &AppConfig, peer: &str) -> Result<()> {
    let remote_id = PeerId::parse(peer).context("Invalid sync ID")?;
    let (store, blobs) = open_stores(data_dir).await?;
    let (sink, updates) = ChannelSink::new();
    // The guest never accepts, so its listener only needs an ephemeral port.
    let transport = TcpTransport::new(config.tcp_config(Some("127.0.0.1:0")));
    let session = SyncSession::guest(transport, store, remote_id)
        .with_blobs(blobs)
        .with_status(Arc::new(sink))
        .with_config(config.session_config());
    drive(session, updates).await
}

async fn open_stores(data_dir: &Path) -> Result<(Arc<dyn StateStore>, Arc<dyn BlobStore>)> {
    let store = user_store(data_dir);
    // Fail early rather than syncing an empty profile.
    load_user(&store).await?;
    Ok((Arc::new(store), Arc::new(blob_store(data_dir))))
}

async fn drive(
    mut session: SyncSession<TcpTransport>,
    updates: UnboundedReceiver<StatusUpdate>,
) -> Result<()> {
    let printer = tokio::spawn(print_updates(updates));

    let outcome = tokio::select! {
        state = session.run() => Some(state),
        _ = tokio::signal::ctrl_c() => None,
    };
    if outcome.is_none() {
        session.reset().await;
    }

    // Waits for tombstone cleanup even after a reset. Dropping the session
    // closes the status channel and ends the printer.
    let finished = session.finish().await;
    printer.await.ok();
    let Some(state) = outcome else {
        if let Err(e) = finished {
            warn!("failed to close cancelled session: {e}");
        }
        bail!("Sync cancelled");
    };
    finished?;

    match state {
        SessionState::Synced => {
            info!("sync finished");
            Ok(())
        }
        SessionState::Errored { reason } => bail!("Sync failed: {reason}"),
        SessionState::Closed => bail!("Connection closed before sync completed"),
        other => bail!("Sync stopped in unexpected state {other:?}"),
    }
}

async fn print_updates(mut updates: UnboundedReceiver<StatusUpdate>) {
    while let Some(update) = updates.recv().await {
        match update {
            StatusUpdate::PeerId(id) => {
                println!("Sync ID: {id}");
                println!("On the other device run: todo-sync join {id}");
            }
            StatusUpdate::Show(status) => match status.severity {
                Severity::Error | Severity::Warning => eprintln!("{}", status.message),
                Severity::Info | Severity::Success => println!("{}", status.message),
            },
            StatusUpdate::Dismiss => {}
        }
    }
}
