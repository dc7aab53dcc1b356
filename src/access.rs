use crate::error::Error;
use crate::hierarchy::HierarchyWalker;
use crate::models::{AccessLevel, ResourceRef, ResourceType, ShareLink};
use crate::registry::ShareLinkRegistry;
use crate::store::Store;
use serde::Serialize;

/// Which keys may act on a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only a key issued for the target itself
    Exact,
    /// A key for the target or for its immediate parent
    SelfOrParent,
}

/// A resource together with the level the presented key grants on it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Granted<T> {
    #[serde(flatten)]
    pub resource: T,
    pub access_level: AccessLevel,
}

impl<T> Granted<T> {
    pub fn new(resource: T, access_level: AccessLevel) -> Self {
        Granted {
            resource,
            access_level,
        }
    }
}

/// Check `granted` against `required`
pub fn require_level(granted: AccessLevel, required: AccessLevel) -> Result<(), Error> {
    if granted.satisfies(required) {
        Ok(())
    } else {
        Err(Error::InsufficientAccess { required, granted })
    }
}

/// Make sure `link` was issued for `resource` and not a sibling of the same type
pub fn require_same_resource(link: &ShareLink, resource: ResourceRef) -> Result<(), Error> {
    if link.resource() == resource {
        Ok(())
    } else {
        Err(Error::ResourceMismatch(resource))
    }
}

/// Turns short keys into granted levels on concrete resources
pub struct AccessResolver<'a, S: Store> {
    registry: ShareLinkRegistry<'a, S>,
    walker: HierarchyWalker<'a, S>,
}

impl<'a, S: Store> AccessResolver<'a, S> {
    pub fn new(registry: ShareLinkRegistry<'a, S>, walker: HierarchyWalker<'a, S>) -> Self {
        AccessResolver { registry, walker }
    }

    /// Resolve a key of any type
    pub fn open(&self, short_key: &str) -> Result<ShareLink, Error> {
        let link = self.registry.resolve(short_key)?.ok_or(Error::LinkInvalid)?;
        tracing::debug!(
            resource = %link.resource(),
            level = %link.access_level,
            "resolved share link"
        );
        Ok(link)
    }

    /// Resolve a key that must have been issued for a resource of `expected` type
    pub fn require_link(
        &self,
        short_key: &str,
        expected: ResourceType,
    ) -> Result<ShareLink, Error> {
        let link = self.open(short_key)?;
        if link.resource_type != expected {
            return Err(Error::LinkMismatch {
                expected,
                found: link.resource_type,
            });
        }
        Ok(link)
    }

    /// Resolve a key, match it to `target` and compare levels. Returns the
    /// level the key grants on `target`.
    ///
    /// A group key reaches every resource in its group, capped at EDIT.
    /// Tournament and table keys reach their own resource and, under
    /// `Scope::SelfOrParent`, its immediate children.
    pub fn authorize(
        &self,
        short_key: &str,
        target: ResourceRef,
        required: AccessLevel,
        scope: Scope,
    ) -> Result<AccessLevel, Error> {
        let link = self.open(short_key)?;
        let granted = self.grant(&link, target, scope)?;
        require_level(granted, required)?;
        Ok(granted)
    }

    /// Match `target` against the link's own resource. Only a link that
    /// covers `target` learns whether its row exists: anything else is a
    /// `ResourceMismatch`, whether the row is there or not.
    fn grant(
        &self,
        link: &ShareLink,
        target: ResourceRef,
        scope: Scope,
    ) -> Result<AccessLevel, Error> {
        let own = link.resource();
        if own == target {
            self.walker.ensure_exists(target)?;
            return Ok(link.access_level);
        }

        if own.resource_type() == ResourceType::Group {
            return if self.walker.group_id_of(target)? == Some(own.id()) {
                Ok(link.access_level.inherited())
            } else {
                Err(Error::ResourceMismatch(target))
            };
        }

        let parent_type = target.resource_type().parent();
        if scope == Scope::SelfOrParent && parent_type == Some(own.resource_type()) {
            return if self.walker.belongs_to(target, own)? {
                Ok(link.access_level)
            } else {
                Err(Error::ResourceMismatch(target))
            };
        }

        if own.resource_type() == target.resource_type() {
            return require_same_resource(link, target).map(|_| link.access_level);
        }
        Err(Error::LinkMismatch {
            expected: target.resource_type(),
            found: own.resource_type(),
        })
    }
}
