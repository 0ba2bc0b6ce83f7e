//! Reconciliation engine.
//!
//! Replays the pending-change queue against the remote catalog. Replay
//! is idempotent: every entry describes a state the remote should reach
//! ("this track is absent", "this playlist exists"), so an entry whose
//! state already holds completes trivially, and an entry that fails
//! stays queued for the next pass.

use std::sync::Arc;

use core_mirror::{ChangeType, PendingChange, PendingChangeRepository, PlaylistRepository};
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::remote::RemoteCatalog;

/// What one reconciliation pass did to a playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No pending changes referenced the playlist.
    Clean,
    /// A local-only playlist was created remotely. Its local row is
    /// gone; callers re-resolve the playlist under `remote_id` after
    /// the next mirror pass.
    Recreated { remote_id: String },
    /// Queued removals were replayed (some may remain after failures).
    Reconciled,
}

/// Replays queued edits against the remote catalog.
pub struct ReconciliationEngine {
    remote: Arc<dyn RemoteCatalog>,
    playlists: Arc<dyn PlaylistRepository>,
    pending: Arc<dyn PendingChangeRepository>,
}

impl ReconciliationEngine {
    pub fn new(
        remote: Arc<dyn RemoteCatalog>,
        playlists: Arc<dyn PlaylistRepository>,
        pending: Arc<dyn PendingChangeRepository>,
    ) -> Self {
        Self {
            remote,
            playlists,
            pending,
        }
    }

    /// Reconcile one playlist's queued changes.
    ///
    /// A queued `CREATE_PLAYLIST` takes the creation path: the playlist
    /// is created remotely with its current membership, then the local
    /// row and the change are retired together. Otherwise every queued
    /// `REMOVE_TRACK` is replayed in order; a failing removal is logged
    /// and kept, and the pass continues with the next entry.
    #[instrument(skip(self), fields(user_id = %user_id, playlist_id = %playlist_id))]
    pub async fn reconcile_playlist(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<ReconcileOutcome> {
        let changes = self.pending.list_for_playlist(playlist_id).await?;
        if changes.is_empty() {
            return Ok(ReconcileOutcome::Clean);
        }

        if let Some(creation) = changes
            .iter()
            .find(|change| change.change_type == ChangeType::CreatePlaylist)
        {
            return self.replay_creation(user_id, playlist_id, creation).await;
        }

        let mut remaining = 0usize;
        for change in &changes {
            if change.change_type != ChangeType::RemoveTrack {
                // DELETE_PLAYLIST entries are drained separately; the
                // playlist row they reference no longer exists.
                continue;
            }
            let Some(track_id) = change.track_id.as_deref() else {
                warn!(change_id = change.change_id, "Removal without track id; dropping");
                self.pending.delete(change.change_id).await?;
                continue;
            };

            match self.remote.remove_track(playlist_id, track_id).await {
                Ok(()) => {
                    self.pending.delete(change.change_id).await?;
                }
                Err(error) => {
                    warn!(
                        change_id = change.change_id,
                        track_id = %track_id,
                        %error,
                        "Removal failed; keeping entry for the next pass"
                    );
                    remaining += 1;
                }
            }
        }

        info!(remaining, "Replayed queued removals");
        Ok(ReconcileOutcome::Reconciled)
    }

    /// Push a local-only playlist to the remote catalog.
    ///
    /// The remote playlist is created first and the membership pushed
    /// before anything local is deleted, so a crash mid-way leaves the
    /// change queued rather than the playlist lost. The retry after
    /// such a crash creates a second remote playlist; the duplicate is
    /// visible in the user's library and has to be removed by hand.
    async fn replay_creation(
        &self,
        user_id: &str,
        playlist_id: &str,
        creation: &PendingChange,
    ) -> Result<ReconcileOutcome> {
        let Some(playlist) = self.playlists.find_by_id(playlist_id).await? else {
            warn!(
                change_id = creation.change_id,
                "Queued creation references no local playlist; dropping entry"
            );
            self.pending.delete(creation.change_id).await?;
            return Ok(ReconcileOutcome::Clean);
        };

        let track_ids = self.playlists.track_ids(playlist_id).await?;

        let remote_id = self
            .remote
            .create_playlist(user_id, &playlist.name, playlist.description.clone())
            .await?;
        if !track_ids.is_empty() {
            self.remote.add_tracks(&remote_id, &track_ids).await?;
        }

        self.pending.delete(creation.change_id).await?;
        if !self.playlists.delete_local_only(playlist_id).await? {
            warn!("Created playlist was no longer local-only");
        }

        info!(
            remote_id = %remote_id,
            tracks = track_ids.len(),
            "Created playlist remotely; local row retired"
        );
        Ok(ReconcileOutcome::Recreated { remote_id })
    }

    /// Replay every queued playlist deletion for a user.
    ///
    /// Returns how many deletions were completed. Failures keep their
    /// entry and do not stop the drain.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn drain_playlist_deletes(&self, user_id: &str) -> Result<usize> {
        let deletes = self.pending.list_deletes_for_user(user_id).await?;
        let mut drained = 0usize;

        for change in &deletes {
            match self.remote.delete_playlist(&change.playlist_id).await {
                Ok(()) => {
                    self.pending.delete(change.change_id).await?;
                    drained += 1;
                }
                Err(error) => {
                    warn!(
                        change_id = change.change_id,
                        playlist_id = %change.playlist_id,
                        %error,
                        "Remote deletion failed; keeping entry"
                    );
                }
            }
        }

        Ok(drained)
    }
}
