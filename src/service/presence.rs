//! Presence tracking service.
//!
//! Wraps the pure [`PresenceLedger`] state machine with the two side
//! effects every transition carries: persisting the online flag through
//! the [`UserDirectory`] collaborator and broadcasting a
//! `user-status-update` to the admin room. The in-memory ledger is
//! authoritative — a directory write failure is queued for retry and
//! never blocks or rewinds a transition.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::collaborators::UserDirectory;
use crate::domain::{
    ConnectionGateway, PresenceLedger, PresenceStatus, PresenceTransition, Room, ServerEvent,
    UserId, UserPresence,
};
use crate::error::GatewayError;

/// Reference-counted presence tracking with persistence and fanout.
pub struct PresenceService {
    gateway: Arc<ConnectionGateway>,
    directory: Arc<dyn UserDirectory>,
    ledger: Mutex<PresenceLedger>,
    /// Users whose last directory write failed.
    dirty: Mutex<HashSet<UserId>>,
}

impl std::fmt::Debug for PresenceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceService").finish()
    }
}

impl PresenceService {
    /// Creates a presence service over the given gateway and directory.
    #[must_use]
    pub fn new(gateway: Arc<ConnectionGateway>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            gateway,
            directory,
            ledger: Mutex::new(PresenceLedger::new()),
            dirty: Mutex::new(HashSet::new()),
        }
    }

    /// Clears online flags left over from a previous process.
    ///
    /// Run once at startup, before any connection is accepted: a crash
    /// leaves flags set in the directory with no live connection behind
    /// them.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::Persistence`] when the directory is
    /// unreachable. Callers may log and continue — the ledger starts
    /// empty either way.
    pub async fn seed(&self) -> Result<(), GatewayError> {
        let cleared = self.directory.reset_online_flags().await?;
        if cleared > 0 {
            info!(cleared, "reset stale online flags");
        }
        Ok(())
    }

    /// Counts one authenticated connection for `user`.
    ///
    /// Broadcasts and persists only when this is the user's first live
    /// connection (the 0→1 crossing).
    pub async fn connection_opened(&self, user: UserId) {
        let transition = {
            let mut ledger = self.ledger.lock().await;
            ledger.connection_opened(user, Utc::now())
        };
        if let Some(transition) = transition {
            self.apply(transition).await;
        }
    }

    /// Releases one authenticated connection for `user`.
    ///
    /// Broadcasts and persists only when this was the user's last live
    /// connection (the 1→0 crossing).
    pub async fn connection_closed(&self, user: UserId) {
        let transition = {
            let mut ledger = self.ledger.lock().await;
            ledger.connection_closed(user, Utc::now())
        };
        if let Some(transition) = transition {
            self.apply(transition).await;
        }
    }

    /// Applies an explicit client-issued status update.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::Validation`] for `offline`, which is
    /// derived from the connection count and never set directly.
    pub async fn set_status(&self, user: UserId, status: PresenceStatus) -> Result<(), GatewayError> {
        if status == PresenceStatus::Offline {
            return Err(GatewayError::Validation(
                "offline status is derived from connections and cannot be set".to_string(),
            ));
        }
        let transition = {
            let mut ledger = self.ledger.lock().await;
            ledger.set_status(user, status, Utc::now())
        };
        if let Some(transition) = transition {
            self.apply(transition).await;
        }
        Ok(())
    }

    /// Records activity for `user` without changing status.
    pub async fn touch(&self, user: UserId) {
        let mut ledger = self.ledger.lock().await;
        ledger.touch(user, Utc::now());
    }

    /// Retries directory writes that previously failed.
    ///
    /// Invoked from the periodic catch-up tick; each retry writes the
    /// user's *current* ledger state, so a stale queued value can never
    /// overwrite a newer transition.
    pub async fn flush_dirty(&self) {
        let pending: Vec<UserId> = {
            let dirty = self.dirty.lock().await;
            dirty.iter().copied().collect()
        };
        if pending.is_empty() {
            return;
        }
        debug!(pending = pending.len(), "retrying presence persistence");

        for user in pending {
            let (online, at) = {
                let ledger = self.ledger.lock().await;
                (ledger.is_online(user), Utc::now())
            };
            match self.directory.set_online_status(user, online, at).await {
                Ok(()) => {
                    self.dirty.lock().await.remove(&user);
                }
                Err(e) => {
                    warn!(user_id = %user, error = %e, "presence retry failed, will retry again");
                }
            }
        }
    }

    /// Returns the number of users currently online.
    pub async fn online_count(&self) -> usize {
        self.ledger.lock().await.online_count()
    }

    /// Returns the current presence of `user`.
    pub async fn status_of(&self, user: UserId) -> PresenceStatus {
        self.ledger.lock().await.status(user)
    }

    /// Returns a point-in-time copy of every tracked presence record.
    pub async fn snapshot(&self) -> Vec<UserPresence> {
        self.ledger.lock().await.snapshot()
    }

    async fn apply(&self, transition: PresenceTransition) {
        let online = transition.status != PresenceStatus::Offline;
        if let Err(e) = self
            .directory
            .set_online_status(transition.user_id, online, transition.at)
            .await
        {
            warn!(user_id = %transition.user_id, error = %e, "presence persist failed, queued for retry");
            self.dirty.lock().await.insert(transition.user_id);
        } else {
            self.dirty.lock().await.remove(&transition.user_id);
        }

        let event = ServerEvent::status_update(
            transition.user_id,
            transition.status,
            transition.at,
        );
        let delivered = self.gateway.emit_to_room(&Room::admin(), &event).await;
        debug!(
            user_id = %transition.user_id,
            status = transition.status.as_str(),
            delivered,
            "presence transition broadcast"
        );
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use tokio::sync::Mutex as TokioMutex;

    use super::*;
    use crate::collaborators::memory::InMemoryUserDirectory;
    use crate::domain::Role;

    /// Directory that fails until told otherwise.
    #[derive(Default)]
    struct FlakyDirectory {
        fail: TokioMutex<bool>,
        writes: TokioMutex<Vec<(UserId, bool)>>,
    }

    #[async_trait]
    impl UserDirectory for FlakyDirectory {
        async fn set_online_status(
            &self,
            user: UserId,
            online: bool,
            _at: DateTime<Utc>,
        ) -> Result<(), GatewayError> {
            if *self.fail.lock().await {
                return Err(GatewayError::Persistence("unavailable".to_string()));
            }
            self.writes.lock().await.push((user, online));
            Ok(())
        }

        async fn online_user_ids(&self) -> Result<Vec<UserId>, GatewayError> {
            Ok(Vec::new())
        }

        async fn reset_online_flags(&self) -> Result<u64, GatewayError> {
            Ok(0)
        }
    }

    fn service() -> (Arc<ConnectionGateway>, PresenceService) {
        let gateway = Arc::new(ConnectionGateway::new(8));
        let directory = Arc::new(InMemoryUserDirectory::new());
        let service = PresenceService::new(Arc::clone(&gateway), directory);
        (gateway, service)
    }

    #[tokio::test]
    async fn multi_tab_yields_single_transition_pair() {
        let (gateway, service) = service();
        let user = UserId::new();

        // An admin observes the admin room.
        let (admin_conn, mut admin_rx) = gateway.register().await;
        let _ = gateway
            .bind_identity(admin_conn, UserId::new(), Role::Admin)
            .await;

        service.connection_opened(user).await;
        service.connection_opened(user).await;
        service.connection_closed(user).await;
        service.connection_closed(user).await;

        let mut seen = Vec::new();
        while let Ok(event) = admin_rx.try_recv() {
            seen.push(event.event_name());
        }
        // Exactly one online and one offline broadcast.
        assert_eq!(seen, vec!["user-status-update", "user-status-update"]);
        assert_eq!(service.online_count().await, 0);
    }

    #[tokio::test]
    async fn explicit_offline_is_rejected() {
        let (_gateway, service) = service();
        let user = UserId::new();
        service.connection_opened(user).await;

        let result = service.set_status(user, PresenceStatus::Offline).await;
        assert!(matches!(result, Err(GatewayError::Validation(_))));
        assert_eq!(service.status_of(user).await, PresenceStatus::Online);
    }

    #[tokio::test]
    async fn away_transition_is_broadcast_to_admins() {
        let (gateway, service) = service();
        let user = UserId::new();
        let (admin_conn, mut admin_rx) = gateway.register().await;
        let _ = gateway
            .bind_identity(admin_conn, UserId::new(), Role::Admin)
            .await;

        service.connection_opened(user).await;
        let Ok(()) = service.set_status(user, PresenceStatus::Away).await else {
            panic!("away must be accepted");
        };
        assert_eq!(service.status_of(user).await, PresenceStatus::Away);

        let mut statuses = Vec::new();
        while let Ok(event) = admin_rx.try_recv() {
            if let ServerEvent::UserStatusUpdate { status, .. } = event {
                statuses.push(status);
            }
        }
        assert_eq!(statuses, vec![PresenceStatus::Online, PresenceStatus::Away]);
    }

    #[tokio::test]
    async fn failed_persist_keeps_ledger_and_retries() {
        let gateway = Arc::new(ConnectionGateway::new(8));
        let directory = Arc::new(FlakyDirectory::default());
        let cloned = Arc::clone(&directory) as Arc<dyn UserDirectory>;
        let service = PresenceService::new(Arc::clone(&gateway), cloned);
        let user = UserId::new();

        *directory.fail.lock().await = true;
        service.connection_opened(user).await;

        // Ledger is authoritative despite the failed write.
        assert!(service.online_count().await == 1);
        assert!(directory.writes.lock().await.is_empty());

        // Directory recovers; the retry writes the current state.
        *directory.fail.lock().await = false;
        service.flush_dirty().await;
        let writes = directory.writes.lock().await;
        assert_eq!(writes.as_slice(), &[(user, true)]);
    }

    #[tokio::test]
    async fn retry_writes_current_state_not_stale_one() {
        let gateway = Arc::new(ConnectionGateway::new(8));
        let directory = Arc::new(FlakyDirectory::default());
        let cloned = Arc::clone(&directory) as Arc<dyn UserDirectory>;
        let service = PresenceService::new(Arc::clone(&gateway), cloned);
        let user = UserId::new();

        *directory.fail.lock().await = true;
        service.connection_opened(user).await;
        service.connection_closed(user).await;

        *directory.fail.lock().await = false;
        service.flush_dirty().await;

        // The user went offline before the retry ran; the retry must not
        // resurrect the online flag.
        let writes = directory.writes.lock().await;
        assert_eq!(writes.as_slice(), &[(user, false)]);
    }
}
