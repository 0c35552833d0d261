//! Collaborator traits at the boundary of the panel engine.
//!
//! The engine never talks to a network or a disk directly. Pages hand it
//! implementations of these traits: a real REST client, the in-memory
//! [`MockDirectory`](crate::mock_service::MockDirectory), or a test double.

use futures::future::BoxFuture;

use crate::error::{FetchError, StorageError};
use crate::record::{PageRequest, ResponseEnvelope};

/// Type alias for node keys (the `id` of a record, always textual)
pub type RecordKey = String;

/// Filter values submitted from a search panel, keyed by field name.
pub type Filter = serde_json::Map<String, serde_json::Value>;

/// Fetches the direct children of one node.
///
/// A node that legitimately has no children must resolve to an empty record
/// list, not an error, and the records it returns for leaves should carry
/// `hasChildren: false` so they render without an expand affordance.
pub trait ChildFetcher: Send + Sync {
    fn fetch_children(
        &self,
        parent_key: &str,
        filter: Option<&Filter>,
    ) -> BoxFuture<'static, Result<ResponseEnvelope, FetchError>>;
}

/// Fetches one page of top-level records for a search.
pub trait RootFetcher: Send + Sync {
    fn fetch_roots(
        &self,
        filter: &Filter,
        page: PageRequest,
    ) -> BoxFuture<'static, Result<ResponseEnvelope, FetchError>>;
}

/// Generic durable key/value store used for panel preferences.
///
/// Implementations may fail; callers in this crate absorb those failures.
pub trait KeyValueStore {
    /// Returns the stored value, or `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value`, overwriting any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes the key. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<T: ChildFetcher + ?Sized> ChildFetcher for std::sync::Arc<T> {
    fn fetch_children(
        &self,
        parent_key: &str,
        filter: Option<&Filter>,
    ) -> BoxFuture<'static, Result<ResponseEnvelope, FetchError>> {
        (**self).fetch_children(parent_key, filter)
    }
}

impl<T: RootFetcher + ?Sized> RootFetcher for std::sync::Arc<T> {
    fn fetch_roots(
        &self,
        filter: &Filter,
        page: PageRequest,
    ) -> BoxFuture<'static, Result<ResponseEnvelope, FetchError>> {
        (**self).fetch_roots(filter, page)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}
