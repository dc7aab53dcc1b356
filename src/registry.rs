use crate::error::Error;
use crate::keys::{KeySource, ShortKey};
use crate::models::{AccessLevel, NewShareLink, ResourceRef, ResourceType, ShareLink};
use crate::store::Store;
use chrono::Utc;
use std::convert::TryFrom;

/// Retry budget used when none is configured
pub const DEFAULT_KEY_ATTEMPTS: usize = 5;

/// Issues and looks up share links
pub struct ShareLinkRegistry<'a, S: Store> {
    store: &'a S,
    keys: &'a dyn KeySource,
    attempts: usize,
}

impl<'a, S: Store> ShareLinkRegistry<'a, S> {
    pub fn new(store: &'a S, keys: &'a dyn KeySource, attempts: usize) -> Self {
        ShareLinkRegistry {
            store,
            keys,
            attempts,
        }
    }

    /// Persist a new link for `resource` at `level` under a fresh key.
    ///
    /// A key collision retries with a new candidate, up to the configured
    /// number of attempts. Each attempt runs in its own savepoint, so a
    /// collision leaves the caller's transaction intact.
    pub fn mint(
        &self,
        resource: ResourceRef,
        issuer: &str,
        level: AccessLevel,
    ) -> Result<ShareLink, Error> {
        for attempt in 1..=self.attempts {
            let key = self.keys.next_key();
            let row = NewShareLink {
                short_key: key.as_str(),
                resource_type: resource.resource_type(),
                resource_id: resource.id(),
                access_level: level,
                created_by: issuer,
                created_at: Utc::now(),
            };
            match self.store.insert_share_link(&row) {
                Ok(link) => {
                    tracing::debug!(%resource, %level, attempt, "minted share link");
                    return Ok(link);
                }
                Err(Error::ShortKeyTaken) => {
                    tracing::warn!(%resource, attempt, "share key collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        tracing::error!(%resource, attempts = self.attempts, "share key generation exhausted");
        Err(Error::KeyGenerationExhausted {
            attempts: self.attempts,
        })
    }

    /// Look a key up. Keys that could never have been issued resolve to nothing.
    pub fn resolve(&self, short_key: &str) -> Result<Option<ShareLink>, Error> {
        let key = match ShortKey::try_from(short_key) {
            Ok(key) => key,
            Err(_) => return Ok(None),
        };
        self.store.find_share_link(key.as_str())
    }

    /// Make sure `resource` carries every default level, minting only the
    /// missing ones. Returns the full default set, highest level first.
    pub fn provision_defaults(
        &self,
        resource: ResourceRef,
        issuer: &str,
    ) -> Result<Vec<ShareLink>, Error> {
        self.store.transaction(|| {
            let mut existing = self.store.find_share_links(resource)?;
            for level in resource.resource_type().default_levels() {
                if !existing.iter().any(|l| l.access_level == *level) {
                    existing.push(self.mint(resource, issuer, *level)?);
                }
            }
            let defaults = resource.resource_type().default_levels();
            existing.retain(|l| defaults.contains(&l.access_level));
            existing.sort_by(|a, b| b.access_level.cmp(&a.access_level));
            Ok(existing)
        })
    }

    /// Links of `resource` a holder of `level` may see, highest level first
    pub fn links(
        &self,
        resource: ResourceRef,
        level: AccessLevel,
    ) -> Result<Vec<ShareLink>, Error> {
        let mut links = self.store.find_share_links(resource)?;
        links.retain(|l| level.satisfies(l.access_level));
        links.sort_by(|a, b| b.access_level.cmp(&a.access_level));
        Ok(links)
    }

    /// Drop the links of deleted resources
    pub fn release(&self, resource_type: ResourceType, ids: &[i32]) -> Result<usize, Error> {
        let released = self.store.delete_share_links(resource_type, ids)?;
        if released > 0 {
            tracing::debug!(%resource_type, released, "released share links");
        }
        Ok(released)
    }
}
