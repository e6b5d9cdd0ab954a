// ABOUTME: Keyed persistence trait for credentials and pending state codes
// ABOUTME: Ships an in-memory implementation for tests and single-process deployments
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential storage abstraction.
//!
//! Persistence is an external concern: deployments back this trait with
//! whatever keyed store they already run. Writes are whole-record upserts,
//! so a concurrent reader always observes a consistent credential (expiry
//! and token from the same exchange), never a partially updated one.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::Sage200Result;
use crate::models::{Credential, PendingStateCode};

/// Keyed store holding one credential and at most one pending state code
/// per owner.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch the credential for `owner`, if one exists.
    async fn credential(&self, owner: Uuid) -> Sage200Result<Option<Credential>>;

    /// Insert or replace the credential for `credential.owner` atomically.
    async fn upsert_credential(&self, credential: Credential) -> Sage200Result<()>;

    /// Fetch the pending state code for `owner`, if one exists.
    async fn pending_state(&self, owner: Uuid) -> Sage200Result<Option<PendingStateCode>>;

    /// Insert or replace the pending state code for `state.owner`.
    async fn put_pending_state(&self, state: PendingStateCode) -> Sage200Result<()>;

    /// Atomically remove and return the pending state code for `owner` if
    /// its code equals `code`. A non-matching code leaves the record in
    /// place and returns `None`.
    async fn take_pending_state(
        &self,
        owner: Uuid,
        code: &str,
    ) -> Sage200Result<Option<PendingStateCode>>;
}

/// In-memory [`CredentialStore`] for tests and single-process use.
#[derive(Default)]
pub struct MemoryStore {
    credentials: RwLock<HashMap<Uuid, Credential>>,
    pending_states: RwLock<HashMap<Uuid, PendingStateCode>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn credential(&self, owner: Uuid) -> Sage200Result<Option<Credential>> {
        Ok(self.credentials.read().await.get(&owner).cloned())
    }

    async fn upsert_credential(&self, credential: Credential) -> Sage200Result<()> {
        self.credentials
            .write()
            .await
            .insert(credential.owner, credential);
        Ok(())
    }

    async fn pending_state(&self, owner: Uuid) -> Sage200Result<Option<PendingStateCode>> {
        Ok(self.pending_states.read().await.get(&owner).cloned())
    }

    async fn put_pending_state(&self, state: PendingStateCode) -> Sage200Result<()> {
        self.pending_states.write().await.insert(state.owner, state);
        Ok(())
    }

    async fn take_pending_state(
        &self,
        owner: Uuid,
        code: &str,
    ) -> Sage200Result<Option<PendingStateCode>> {
        let mut states = self.pending_states.write().await;
        let matches = states
            .get(&owner)
            .is_some_and(|pending| pending.code == code);
        if matches {
            Ok(states.remove(&owner))
        } else {
            Ok(None)
        }
    }
}
