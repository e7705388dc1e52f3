//! In-memory user and credential store
//!
//! Holds, per email, the user handle, the registered credentials and the one
//! pending challenge. Every options call replaces the pending challenge; every
//! verify call takes it out. Users that never finish registering are dropped
//! once their last challenge has expired.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::webauthn::{encode_b64url, CeremonyKind};

use super::errors::RelyingPartyError;

/// A registered credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub credential_id: String, // Base64URL-encoded credential ID
    pub public_key_cose: Vec<u8>,
    pub sign_count: u32,
    pub user_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// The challenge issued by the latest options call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChallenge {
    pub challenge: String,
    pub kind: CeremonyKind,
    pub issued_at: DateTime<Utc>,
}

impl PendingChallenge {
    #[must_use]
    pub fn new(challenge: String, kind: CeremonyKind) -> Self {
        Self {
            challenge,
            kind,
            issued_at: Utc::now(),
        }
    }

    /// Whether the challenge is older than `ttl` at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.issued_at > ttl
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub email: String,
    pub user_handle: String, // Base64URL-encoded UUID bytes
    pub credentials: Vec<StoredCredential>,
    pub pending: Option<PendingChallenge>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            user_handle: encode_b64url(uuid::Uuid::new_v4().as_bytes()),
            credentials: Vec::new(),
            pending: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn credential(&self, credential_id: &str) -> Option<&StoredCredential> {
        self.credentials
            .iter()
            .find(|c| c.credential_id == credential_id)
    }
}

/// Shared, cloneable handle to the user map
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl CredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a user record
    pub async fn user(&self, email: &str) -> Option<UserRecord> {
        self.users.read().await.get(email).cloned()
    }

    /// Return the user, creating it on first sight
    pub async fn get_or_create_user(&self, email: &str) -> UserRecord {
        let mut users = self.users.write().await;
        users
            .entry(email.to_string())
            .or_insert_with(|| UserRecord::new(email))
            .clone()
    }

    /// Drop users without credentials whose last challenge (or creation) is older than `ttl`
    ///
    /// `keep` is never dropped. Returns the number of records removed.
    pub async fn prune_abandoned(&self, now: DateTime<Utc>, ttl: Duration, keep: &str) -> usize {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|email, user| {
            let last_seen = user
                .pending
                .as_ref()
                .map_or(user.created_at, |pending| pending.issued_at);
            email == keep || !user.credentials.is_empty() || now - last_seen <= ttl
        });
        before - users.len()
    }

    /// Replace the pending challenge of a user; false if the user does not exist
    pub async fn set_pending(&self, email: &str, pending: PendingChallenge) -> bool {
        match self.users.write().await.get_mut(email) {
            Some(user) => {
                user.pending = Some(pending);
                true
            }
            None => false,
        }
    }

    /// Remove and return the pending challenge
    ///
    /// # Errors
    ///
    /// Returns `RelyingPartyError::UnknownUser` if the user does not exist
    pub async fn take_pending(
        &self,
        email: &str,
    ) -> Result<Option<PendingChallenge>, RelyingPartyError> {
        self.users
            .write()
            .await
            .get_mut(email)
            .map(|user| user.pending.take())
            .ok_or_else(|| RelyingPartyError::UnknownUser(email.to_string()))
    }

    /// Whether any user already registered this credential id
    pub async fn credential_exists(&self, credential_id: &str) -> bool {
        self.users
            .read()
            .await
            .values()
            .any(|user| user.credential(credential_id).is_some())
    }

    /// Store a credential for a user
    ///
    /// Returns false if the user does not exist or the credential id is taken.
    pub async fn add_credential(&self, email: &str, credential: StoredCredential) -> bool {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|user| user.credential(&credential.credential_id).is_some())
        {
            return false;
        }
        match users.get_mut(email) {
            Some(user) => {
                user.credentials.push(credential);
                true
            }
            None => false,
        }
    }

    /// Record a successful assertion
    pub async fn record_usage(&self, email: &str, credential_id: &str, sign_count: u32) -> bool {
        let mut users = self.users.write().await;
        let Some(credential) = users.get_mut(email).and_then(|user| {
            user.credentials
                .iter_mut()
                .find(|c| c.credential_id == credential_id)
        }) else {
            return false;
        };
        credential.sign_count = sign_count;
        credential.last_used_at = Some(Utc::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(id: &str) -> StoredCredential {
        StoredCredential {
            credential_id: id.to_string(),
            public_key_cose: vec![0xa5],
            sign_count: 0,
            user_verified: true,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    #[tokio::test]
    async fn test_user_created_once_with_stable_handle() {
        let store = CredentialStore::new();
        let first = store.get_or_create_user("alice@example.com").await;
        let second = store.get_or_create_user("alice@example.com").await;
        assert_eq!(first.user_handle, second.user_handle);
        // 16 UUID bytes encode to 22 Base64URL characters
        assert_eq!(first.user_handle.len(), 22);
        assert!(store.user("bob@example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_pending_challenge_is_replaced_and_taken_once() {
        let store = CredentialStore::new();
        store.get_or_create_user("alice@example.com").await;

        assert!(
            store
                .set_pending(
                    "alice@example.com",
                    PendingChallenge::new("first".to_string(), CeremonyKind::Registration)
                )
                .await
        );
        store
            .set_pending(
                "alice@example.com",
                PendingChallenge::new("second".to_string(), CeremonyKind::Registration),
            )
            .await;

        let taken = store.take_pending("alice@example.com").await.unwrap();
        assert_eq!(taken.unwrap().challenge, "second");
        assert_eq!(store.take_pending("alice@example.com").await, Ok(None));
        assert!(matches!(
            store.take_pending("nobody@example.com").await,
            Err(RelyingPartyError::UnknownUser(_))
        ));
    }

    #[tokio::test]
    async fn test_credential_ids_are_unique_across_users() {
        let store = CredentialStore::new();
        store.get_or_create_user("alice@example.com").await;
        store.get_or_create_user("bob@example.com").await;

        assert!(store.add_credential("alice@example.com", credential("c1")).await);
        assert!(!store.add_credential("bob@example.com", credential("c1")).await);
        assert!(store.credential_exists("c1").await);
        assert!(!store.add_credential("nobody@example.com", credential("c2")).await);
    }

    #[tokio::test]
    async fn test_record_usage_updates_counter() {
        let store = CredentialStore::new();
        store.get_or_create_user("alice@example.com").await;
        store.add_credential("alice@example.com", credential("c1")).await;

        assert!(store.record_usage("alice@example.com", "c1", 7).await);
        let user = store.user("alice@example.com").await.unwrap();
        let stored = user.credential("c1").unwrap();
        assert_eq!(stored.sign_count, 7);
        assert!(stored.last_used_at.is_some());
        assert!(!store.record_usage("alice@example.com", "missing", 1).await);
    }

    #[tokio::test]
    async fn test_abandoned_registrations_are_pruned() {
        let store = CredentialStore::new();
        store.get_or_create_user("alice@example.com").await;
        store.get_or_create_user("bob@example.com").await;
        store.get_or_create_user("carol@example.com").await;
        store.get_or_create_user("dave@example.com").await;
        store.add_credential("bob@example.com", credential("c1")).await;

        let now = Utc::now() + Duration::seconds(120);
        store
            .set_pending(
                "dave@example.com",
                PendingChallenge {
                    challenge: "fresh".to_string(),
                    kind: CeremonyKind::Registration,
                    issued_at: now - Duration::seconds(10),
                },
            )
            .await;

        let removed = store
            .prune_abandoned(now, Duration::seconds(60), "carol@example.com")
            .await;

        assert_eq!(removed, 1);
        assert!(store.user("alice@example.com").await.is_none());
        assert!(store.user("bob@example.com").await.is_some());
        assert!(store.user("carol@example.com").await.is_some());
        assert!(store.user("dave@example.com").await.is_some());
    }

    #[test]
    fn test_expiry() {
        let pending = PendingChallenge::new("c".to_string(), CeremonyKind::Authentication);
        let ttl = Duration::seconds(60);
        assert!(!pending.is_expired_at(pending.issued_at + Duration::seconds(59), ttl));
        assert!(pending.is_expired_at(pending.issued_at + Duration::seconds(61), ttl));
    }
}
