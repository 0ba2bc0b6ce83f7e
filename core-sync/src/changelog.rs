//! Pending-change inspection and cancellation.
//!
//! Listing is a read-through to the queue; cancellation undoes the
//! local edit the change recorded before dropping the entry.
//!
//! What "undo" means depends on the change type:
//!
//! - `REMOVE_TRACK` reinserts the membership (appended at the end;
//!   the original position is not snapshotted)
//! - `CREATE_PLAYLIST` deletes the still-local playlist
//! - `DELETE_PLAYLIST` has no undo. The mirror row is already gone,
//!   so cancelling only stops the remote deletion from being replayed.

use std::sync::Arc;

use core_mirror::{ChangeType, PendingChange, PendingChangeRepository, PlaylistRepository};
use tracing::{info, instrument, warn};

use crate::error::{Result, SyncError};

/// User-facing view of the offline edit queue.
pub struct ChangeLog {
    pending: Arc<dyn PendingChangeRepository>,
    playlists: Arc<dyn PlaylistRepository>,
}

impl ChangeLog {
    pub fn new(
        pending: Arc<dyn PendingChangeRepository>,
        playlists: Arc<dyn PlaylistRepository>,
    ) -> Self {
        Self { pending, playlists }
    }

    /// A user's pending changes, newest first.
    pub async fn list_pending(&self, user_id: &str) -> Result<Vec<PendingChange>> {
        Ok(self.pending.list_for_user(user_id).await?)
    }

    /// Cancel a pending change, undoing its local edit.
    ///
    /// The change must belong to `user_id`; a foreign or unknown id is
    /// reported as not found without revealing which. If the undo
    /// fails the entry stays queued.
    #[instrument(skip(self), fields(user_id = %user_id, change_id = change_id))]
    pub async fn cancel(&self, user_id: &str, change_id: i64) -> Result<()> {
        let change = self
            .pending
            .find_by_id(change_id)
            .await?
            .filter(|change| change.user_id == user_id)
            .ok_or(SyncError::ChangeNotFound { change_id })?;

        match change.change_type {
            ChangeType::RemoveTrack => self.undo_removal(&change).await?,
            ChangeType::CreatePlaylist => {
                if !self.playlists.delete_local_only(&change.playlist_id).await? {
                    warn!(
                        playlist_id = %change.playlist_id,
                        "Cancelled creation had no local-only playlist to remove"
                    );
                }
            }
            ChangeType::DeletePlaylist => {
                // Nothing to restore locally.
            }
        }

        self.pending.delete(change_id).await?;
        info!(change_type = %change.change_type, "Cancelled pending change");
        Ok(())
    }

    async fn undo_removal(&self, change: &PendingChange) -> Result<()> {
        let Some(track_id) = change.track_id.as_deref() else {
            warn!("REMOVE_TRACK change carries no track id; dropping entry");
            return Ok(());
        };

        // The playlist may have been deleted since the removal was
        // queued; there is no membership left to restore then.
        if self
            .playlists
            .find_by_id(&change.playlist_id)
            .await?
            .is_none()
        {
            warn!(
                playlist_id = %change.playlist_id,
                "Playlist gone; cancelling removal without reinserting"
            );
            return Ok(());
        }

        self.playlists
            .add_track(&change.playlist_id, track_id)
            .await?;
        Ok(())
    }
}
