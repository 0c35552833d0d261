//! Lazy branch expansion over an immutable forest.
//!
//! The engine owns the expansion state of one forest: which keys are
//! expanded, which child fetches are in flight, and the generation of the
//! forest it is tracking. Fetches are coalesced per key through a
//! [`Shared`] future, so at most one request per key is outstanding no
//! matter how many callers ask for it.
//!
//! When the forest is rebuilt from a fresh search the page calls
//! [`ExpansionEngine::reset`]. Any fetch started before the reset resolves
//! to [`PanelError::Superseded`] and is never merged.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::{FetchError, PanelError};
use crate::forest::{Forest, Node};
use crate::merge::{attach_children, normalize_children};
use crate::traits::{ChildFetcher, Filter, RecordKey};

type ChildList = Arc<Vec<Arc<Node>>>;
type SharedFetch = Shared<BoxFuture<'static, Result<ChildList, FetchError>>>;

/// Expansion bookkeeping for one forest.
#[derive(Debug, Clone, Default)]
pub struct ExpansionState {
    expanded: HashSet<RecordKey>,
    /// Keys collapsed while their fetch was still pending; their children
    /// are cached on arrival but the node stays collapsed.
    collapsed_while_pending: HashSet<RecordKey>,
    generation: u64,
}

impl ExpansionState {
    pub fn expanded_keys(&self) -> &HashSet<RecordKey> {
        &self.expanded
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        self.expanded.contains(key)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct InFlight {
    fetch: SharedFetch,
    generation: u64,
}

struct Inner {
    state: ExpansionState,
    in_flight: HashMap<RecordKey, InFlight>,
    filter: Option<Filter>,
}

/// Children loaded for one key, ready to be merged with [`ExpansionEngine::apply`].
#[derive(Debug, Clone)]
pub struct Expansion {
    key: RecordKey,
    generation: u64,
    /// `None` when the node was already loaded and nothing was fetched.
    children: Option<ChildList>,
}

impl Expansion {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True when this expansion carries freshly fetched children.
    pub fn fetched(&self) -> bool {
        self.children.is_some()
    }

    pub fn children(&self) -> Option<&[Arc<Node>]> {
        self.children.as_ref().map(|c| c.as_slice())
    }
}

/// Expands and collapses nodes of a forest, fetching children on demand.
pub struct ExpansionEngine<C> {
    fetcher: C,
    inner: Mutex<Inner>,
}

impl<C: ChildFetcher> ExpansionEngine<C> {
    pub fn new(fetcher: C) -> Self {
        Self {
            fetcher,
            inner: Mutex::new(Inner {
                state: ExpansionState::default(),
                in_flight: HashMap::new(),
                filter: None,
            }),
        }
    }

    /// Expands `key`, fetching its children unless they are already loaded.
    ///
    /// Returns a new forest that shares every subtree not on the path to
    /// `key`. Expanding a loaded node never fetches and returns the forest
    /// unchanged. On failure the node stays unloaded and collapsed, and a
    /// later call retries.
    pub async fn expand(&self, forest: &Forest, key: &str) -> Result<Forest, PanelError> {
        let expansion = self.load_children(forest, key).await?;
        self.apply(forest, &expansion)
    }

    /// Fetch half of [`expand`](Self::expand): loads the children of `key`
    /// without touching expansion state.
    ///
    /// UIs that run fetches off the UI thread call this against a snapshot
    /// and merge the result into their current forest with
    /// [`apply`](Self::apply).
    pub async fn load_children(&self, forest: &Forest, key: &str) -> Result<Expansion, PanelError> {
        let node = forest.find(key).ok_or_else(|| PanelError::NodeNotFound {
            key: key.to_owned(),
        })?;

        let (fetch, generation) = {
            let mut inner = self.lock();
            let generation = inner.state.generation;
            inner.state.collapsed_while_pending.remove(key);

            if node.is_loaded() {
                return Ok(Expansion {
                    key: key.to_owned(),
                    generation,
                    children: None,
                });
            }

            let fetch = match inner.in_flight.get(key) {
                Some(pending) if pending.generation == generation => {
                    tracing::debug!(key, "joining in-flight child fetch");
                    pending.fetch.clone()
                }
                _ => {
                    let fetch = self.start_fetch(key, inner.filter.as_ref());
                    inner.in_flight.insert(
                        key.to_owned(),
                        InFlight {
                            fetch: fetch.clone(),
                            generation,
                        },
                    );
                    fetch
                }
            };
            (fetch, generation)
        };

        let result = fetch.clone().await;

        {
            let mut inner = self.lock();
            if inner
                .in_flight
                .get(key)
                .is_some_and(|pending| pending.fetch.ptr_eq(&fetch))
            {
                inner.in_flight.remove(key);
            }
            if inner.state.generation != generation {
                tracing::debug!(key, generation, "dropping child fetch from an older forest");
                return Err(PanelError::Superseded {
                    target: key.to_owned(),
                });
            }
            if result.is_err() {
                inner.state.collapsed_while_pending.remove(key);
            }
        }

        match result {
            Ok(children) => Ok(Expansion {
                key: key.to_owned(),
                generation,
                children: Some(children),
            }),
            Err(source) => {
                tracing::warn!(key, error = %source, "child fetch failed");
                Err(PanelError::Fetch {
                    key: Some(key.to_owned()),
                    source,
                })
            }
        }
    }

    /// Merge half of [`expand`](Self::expand): attaches fetched children to
    /// `forest` and marks the key expanded.
    pub fn apply(&self, forest: &Forest, expansion: &Expansion) -> Result<Forest, PanelError> {
        let mut inner = self.lock();
        if expansion.generation != inner.state.generation {
            return Err(PanelError::Superseded {
                target: expansion.key.clone(),
            });
        }

        let merged = match &expansion.children {
            Some(children) => {
                let merged = attach_children(forest, &expansion.key, children.as_ref().clone())
                    .ok_or_else(|| PanelError::NodeNotFound {
                        key: expansion.key.clone(),
                    })?;
                tracing::debug!(key = %expansion.key, children = children.len(), "merged children");
                merged
            }
            None if forest.find(&expansion.key).is_some() => forest.clone(),
            None => {
                return Err(PanelError::NodeNotFound {
                    key: expansion.key.clone(),
                })
            }
        };

        if !inner.state.collapsed_while_pending.contains(&expansion.key) {
            inner.state.expanded.insert(expansion.key.clone());
        }
        Ok(merged)
    }

    /// Collapses `key`. Loaded children stay cached so re-expanding is free.
    pub fn collapse(&self, forest: &Forest, key: &str) -> Forest {
        let mut inner = self.lock();
        inner.state.expanded.remove(key);
        if inner.in_flight.contains_key(key) {
            inner.state.collapsed_while_pending.insert(key.to_owned());
        }
        forest.clone()
    }

    /// Discards all expansion state; call whenever the forest is rebuilt
    /// from a fresh top-level fetch.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state.expanded.clear();
        inner.state.collapsed_while_pending.clear();
        inner.state.generation += 1;
        inner.in_flight.clear();
        tracing::debug!(generation = inner.state.generation, "expansion state reset");
    }

    /// Like [`reset`](Self::reset), also replacing the filter sent with
    /// child fetches.
    pub fn reset_with_filter(&self, filter: Option<Filter>) {
        self.reset();
        self.lock().filter = filter;
    }

    // ===== Queries =====

    pub fn is_expanded(&self, key: &str) -> bool {
        self.lock().state.is_expanded(key)
    }

    /// True while a child fetch for `key` is outstanding.
    pub fn is_pending(&self, key: &str) -> bool {
        self.lock().in_flight.contains_key(key)
    }

    pub fn pending_keys(&self) -> HashSet<RecordKey> {
        self.lock().in_flight.keys().cloned().collect()
    }

    pub fn expanded_keys(&self) -> HashSet<RecordKey> {
        self.lock().state.expanded.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().state.generation
    }

    /// Snapshot of the expansion state for rendering.
    pub fn snapshot(&self) -> ExpansionState {
        self.lock().state.clone()
    }

    fn start_fetch(&self, key: &str, filter: Option<&Filter>) -> SharedFetch {
        tracing::debug!(key, "fetching children");
        let parent_key = key.to_owned();
        self.fetcher
            .fetch_children(key, filter)
            .map(move |result| {
                result.map(|envelope| {
                    Arc::new(normalize_children(&parent_key, envelope.normalize().records))
                })
            })
            .boxed()
            .shared()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
