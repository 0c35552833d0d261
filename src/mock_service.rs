//! Seeded in-memory directory standing in for the REST services.
//!
//! The directory generates a user-group hierarchy, users, roles and a
//! workflow catalog from a fixed seed, so every run shows the same data.
//! [`CollectionSource`] serves one collection through the fetch traits and
//! rotates through the response envelope shapes real services use.
//! Latency and injected failures make loading states and retries visible.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;

use crate::error::FetchError;
use crate::panel_config::Collection;
use crate::record::{PageRequest, Record, ResponseEnvelope};
use crate::traits::{ChildFetcher, Filter, RecordKey, RootFetcher};

const DEFAULT_SEED: u64 = 42;
const DEFAULT_ROOT_GROUPS: usize = 24;
const DEFAULT_MAX_DEPTH: usize = 3;
const DEFAULT_MAX_CHILDREN: usize = 4;
const USER_COUNT: usize = 60;
const WORKFLOW_COUNT: usize = 15;

const GROUP_NAMES: &[&str] = &[
    "Engineering", "Finance", "Operations", "Marketing", "Support", "Legal",
    "Research", "Sales", "Security", "Platform", "Design", "Procurement",
];
const FIRST_NAMES: &[&str] = &[
    "ann", "bob", "carol", "dave", "erin", "frank", "grace", "heidi", "ivan", "judy",
];
const ROLES: &[(&str, &str, &str)] = &[
    ("admin", "Administrator", "Full access to every page"),
    ("auditor", "Auditor", "Read-only access to audit trails"),
    ("operator", "Operator", "Runs workflows and manages users"),
    ("viewer", "Viewer", "Read-only access"),
    ("approver", "Approver", "Approves workflow steps"),
    ("developer", "Developer", "Manages workflow definitions"),
];
const WORKFLOW_CATEGORIES: &[&str] = &["approval", "onboarding", "offboarding"];

/// Flat records of one collection plus the parent/child index.
#[derive(Debug, Default)]
struct CollectionData {
    records: Vec<Record>,
    by_key: HashMap<RecordKey, usize>,
    children: HashMap<RecordKey, Vec<usize>>,
    roots: Vec<usize>,
}

impl CollectionData {
    fn new(records: Vec<Record>) -> Self {
        let mut data = Self::default();
        for (index, record) in records.iter().enumerate() {
            data.by_key.insert(record.id.clone(), index);
            match &record.parent_id {
                Some(parent) => data.children.entry(parent.clone()).or_default().push(index),
                None => data.roots.push(index),
            }
        }
        data.records = records;
        data
    }
}

struct Shared {
    collections: HashMap<Collection, CollectionData>,
    members: HashMap<RecordKey, Vec<RecordKey>>,
    fail_next: AtomicUsize,
    calls: AtomicUsize,
}

/// Deterministic directory of user groups, users, roles and workflows.
#[derive(Clone)]
pub struct MockDirectory {
    shared: Arc<Shared>,
    latency: Duration,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::with_config(DEFAULT_ROOT_GROUPS, DEFAULT_MAX_DEPTH, DEFAULT_SEED)
    }

    pub fn with_config(root_groups: usize, max_depth: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let users = generate_users(&mut rng);
        let mut groups = Vec::new();
        let mut members = HashMap::new();
        let mut next_id = 1;
        for _ in 0..root_groups {
            generate_group(&mut rng, None, 0, max_depth, &users, &mut next_id, &mut groups, &mut members);
        }
        let roles = generate_roles();
        let workflows = generate_workflows(&mut rng);

        let collections = HashMap::from([
            (Collection::UserGroups, CollectionData::new(groups)),
            (Collection::Users, CollectionData::new(users)),
            (Collection::Roles, CollectionData::new(roles)),
            (Collection::Workflows, CollectionData::new(workflows)),
        ]);

        Self {
            shared: Arc::new(Shared {
                collections,
                members,
                fail_next: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }),
            latency: Duration::ZERO,
        }
    }

    /// Delays every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes the next `count` fetches fail with a transport error.
    pub fn fail_next(&self, count: usize) {
        self.shared.fail_next.store(count, Ordering::SeqCst);
    }

    /// Number of fetches served so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.shared.calls.load(Ordering::SeqCst)
    }

    /// All records of a collection in generation order.
    pub fn records(&self, collection: Collection) -> &[Record] {
        self.shared
            .collections
            .get(&collection)
            .map(|data| data.records.as_slice())
            .unwrap_or_default()
    }

    pub fn find(&self, collection: Collection, key: &str) -> Option<&Record> {
        let data = self.shared.collections.get(&collection)?;
        data.by_key.get(key).map(|&i| &data.records[i])
    }

    /// Initial member user keys of a group.
    pub fn members_of(&self, group_key: &str) -> Vec<RecordKey> {
        self.shared.members.get(group_key).cloned().unwrap_or_default()
    }

    /// Fetch endpoint for one collection.
    pub fn source(&self, collection: Collection) -> CollectionSource {
        CollectionSource {
            shared: Arc::clone(&self.shared),
            collection,
            latency: self.latency,
            responses: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self::new()
    }
}

/// One collection of a [`MockDirectory`], served through the fetch traits.
#[derive(Clone)]
pub struct CollectionSource {
    shared: Arc<Shared>,
    collection: Collection,
    latency: Duration,
    responses: Arc<AtomicUsize>,
}

impl CollectionSource {
    pub fn collection(&self) -> Collection {
        self.collection
    }

    fn data(&self) -> Option<&CollectionData> {
        self.shared.collections.get(&self.collection)
    }

    /// Consumes one injected failure, if any are left.
    fn take_failure(&self) -> bool {
        self.shared
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn respond(
        &self,
        result: Result<ResponseEnvelope, FetchError>,
    ) -> BoxFuture<'static, Result<ResponseEnvelope, FetchError>> {
        self.shared.calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.take_failure() {
            tracing::debug!(collection = ?self.collection, "injected fetch failure");
            Err(FetchError::Transport {
                message: "connection reset (injected)".into(),
            })
        } else {
            result
        };
        let latency = self.latency;
        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            result
        }
        .boxed()
    }

    /// Wraps records in the next envelope shape of the rotation.
    fn envelope(&self, records: Vec<Record>, total: u64) -> ResponseEnvelope {
        match self.responses.fetch_add(1, Ordering::Relaxed) % 3 {
            0 => ResponseEnvelope::Items {
                items: records,
                total: Some(total),
            },
            1 => ResponseEnvelope::Data {
                data: Box::new(ResponseEnvelope::Bare(records)),
                total: Some(total),
            },
            _ => ResponseEnvelope::Data {
                data: Box::new(ResponseEnvelope::Items {
                    items: records,
                    total: Some(total),
                }),
                total: None,
            },
        }
    }
}

impl RootFetcher for CollectionSource {
    fn fetch_roots(
        &self,
        filter: &Filter,
        page: PageRequest,
    ) -> BoxFuture<'static, Result<ResponseEnvelope, FetchError>> {
        let Some(data) = self.data() else {
            return self.respond(Ok(ResponseEnvelope::Bare(Vec::new())));
        };
        let matching: Vec<&Record> = data
            .roots
            .iter()
            .map(|&i| &data.records[i])
            .filter(|record| matches_filter(record, filter))
            .collect();
        let total = matching.len() as u64;
        let records = matching
            .into_iter()
            .skip(page.offset())
            .take(page.size)
            .cloned()
            .collect();
        tracing::debug!(collection = ?self.collection, page = page.index, total, "mock root fetch");
        let envelope = self.envelope(records, total);
        self.respond(Ok(envelope))
    }
}

impl ChildFetcher for CollectionSource {
    fn fetch_children(
        &self,
        parent_key: &str,
        filter: Option<&Filter>,
    ) -> BoxFuture<'static, Result<ResponseEnvelope, FetchError>> {
        let Some(data) = self.data().filter(|d| d.by_key.contains_key(parent_key)) else {
            return self.respond(Err(FetchError::Status {
                status: 404,
                message: format!("no record '{parent_key}'"),
            }));
        };
        let records: Vec<Record> = data
            .children
            .get(parent_key)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&i| &data.records[i])
                    .filter(|record| filter.map_or(true, |f| matches_filter(record, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        tracing::debug!(parent = %parent_key, count = records.len(), "mock child fetch");
        let total = records.len() as u64;
        let envelope = if self.responses.load(Ordering::Relaxed) % 2 == 0 {
            ResponseEnvelope::Bare(records)
        } else {
            self.envelope(records, total)
        };
        self.respond(Ok(envelope))
    }
}

/// Matches every filter entry against the record payload.
///
/// `<field>From` / `<field>To` compare as text (ISO dates sort correctly);
/// any other entry is a case-insensitive substring match.
fn matches_filter(record: &Record, filter: &Filter) -> bool {
    filter.iter().all(|(name, wanted)| {
        let Some(wanted) = wanted.as_str() else {
            return true;
        };
        if let Some(field) = name.strip_suffix("From") {
            return attr_str(record, field) >= wanted;
        }
        if let Some(field) = name.strip_suffix("To") {
            let value = attr_str(record, field);
            return !value.is_empty() && value <= wanted;
        }
        attr_str(record, name).to_lowercase().contains(&wanted.to_lowercase())
    })
}

fn attr_str<'a>(record: &'a Record, field: &str) -> &'a str {
    record.payload.get(field).and_then(|v| v.as_str()).unwrap_or("")
}

fn random_date(rng: &mut StdRng) -> String {
    format!("2024-{:02}-{:02}", rng.gen_range(1..=12), rng.gen_range(1..=28))
}

fn generate_users(rng: &mut StdRng) -> Vec<Record> {
    (1..=USER_COUNT)
        .map(|i| {
            let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
            let username = format!("{first}{i:02}");
            let role = ROLES[rng.gen_range(0..3)].0;
            Record::new(format!("u{i}"), None)
                .with_has_children(false)
                .with_attr("email", format!("{username}@example.com"))
                .with_attr("role", role)
                .with_attr("status", if rng.gen_bool(0.9) { "enabled" } else { "disabled" })
                .with_attr("createdAt", random_date(rng))
                .with_attr("username", username)
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn generate_group(
    rng: &mut StdRng,
    parent: Option<&str>,
    depth: usize,
    max_depth: usize,
    users: &[Record],
    next_id: &mut usize,
    out: &mut Vec<Record>,
    members: &mut HashMap<RecordKey, Vec<RecordKey>>,
) {
    let number = *next_id;
    let id = format!("g{number}");
    *next_id += 1;

    let base = GROUP_NAMES[rng.gen_range(0..GROUP_NAMES.len())];
    let name = match parent {
        None => base.to_owned(),
        Some(_) => format!("{base} team {}", rng.gen_range(1..=9)),
    };
    let member_count = rng.gen_range(0..=5);
    let member_keys: Vec<RecordKey> = users
        .choose_multiple(rng, member_count)
        .map(|u| u.id.clone())
        .collect();

    let child_count = if depth < max_depth {
        rng.gen_range(0..=DEFAULT_MAX_CHILDREN)
    } else {
        0
    };
    // Some leaves do not announce themselves, so expanding them loads an empty list.
    let has_children = match child_count {
        0 if rng.gen_bool(0.3) => None,
        0 => Some(false),
        _ if rng.gen_bool(0.5) => Some(true),
        _ => None,
    };

    let mut record = Record::new(id.clone(), parent)
        .with_attr("name", name)
        .with_attr("code", format!("GRP-{number:04}"))
        .with_attr("memberCount", member_keys.len())
        .with_attr("status", if rng.gen_bool(0.85) { "enabled" } else { "disabled" })
        .with_attr("createdAt", random_date(rng));
    record.has_children = has_children;
    out.push(record);
    members.insert(id.clone(), member_keys);

    for _ in 0..child_count {
        generate_group(rng, Some(&id), depth + 1, max_depth, users, next_id, out, members);
    }
}

fn generate_roles() -> Vec<Record> {
    ROLES
        .iter()
        .enumerate()
        .map(|(i, (code, name, description))| {
            Record::new(format!("r{}", i + 1), None)
                .with_has_children(false)
                .with_attr("name", *name)
                .with_attr("code", *code)
                .with_attr("description", *description)
        })
        .collect()
}

fn generate_workflows(rng: &mut StdRng) -> Vec<Record> {
    (1..=WORKFLOW_COUNT)
        .map(|i| {
            let category = WORKFLOW_CATEGORIES[i % WORKFLOW_CATEGORIES.len()];
            Record::new(format!("w{i}"), None)
                .with_has_children(false)
                .with_attr("name", format!("{} flow {i}", capitalize(category)))
                .with_attr("category", category)
                .with_attr("version", json!(format!("1.{}", rng.gen_range(0..10))))
                .with_attr("last_updated", random_date(rng))
        })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest;

    fn filter(pairs: &[(&str, &str)]) -> Filter {
        pairs.iter().map(|(k, v)| (k.to_string(), json!(v))).collect()
    }

    #[test]
    fn test_same_seed_same_directory() {
        let a = MockDirectory::new();
        let b = MockDirectory::new();
        assert_eq!(a.records(Collection::UserGroups), b.records(Collection::UserGroups));
        assert_eq!(a.records(Collection::Users).len(), USER_COUNT);
        assert_eq!(a.records(Collection::Roles).len(), ROLES.len());
    }

    #[test]
    fn test_group_hierarchy_is_a_forest() {
        let directory = MockDirectory::new();
        let groups = directory.records(Collection::UserGroups);
        let forest = forest::build(groups);
        assert_eq!(forest.node_count(), groups.len());
        assert_eq!(forest.roots().len(), DEFAULT_ROOT_GROUPS);
    }

    #[tokio::test]
    async fn test_root_paging() {
        let directory = MockDirectory::new();
        let source = directory.source(Collection::UserGroups);

        let first = source
            .fetch_roots(&Filter::new(), PageRequest::first(10))
            .await
            .unwrap()
            .normalize();
        assert_eq!(first.records.len(), 10);
        assert_eq!(first.total, DEFAULT_ROOT_GROUPS as u64);
        assert!(first.records.iter().all(|r| r.parent_id.is_none()));

        let last = source
            .fetch_roots(&Filter::new(), PageRequest { index: 2, size: 10 })
            .await
            .unwrap()
            .normalize();
        assert_eq!(last.records.len(), DEFAULT_ROOT_GROUPS - 20);
    }

    #[tokio::test]
    async fn test_root_filter() {
        let directory = MockDirectory::new();
        let source = directory.source(Collection::Roles);
        let page = source
            .fetch_roots(&filter(&[("name", "AUDIT")]), PageRequest::default())
            .await
            .unwrap()
            .normalize();
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].payload["code"], "auditor");

        let users = directory.source(Collection::Users);
        let page = users
            .fetch_roots(&filter(&[("createdAtFrom", "2024-07-01")]), PageRequest::first(100))
            .await
            .unwrap()
            .normalize();
        assert!(page
            .records
            .iter()
            .all(|r| r.payload["createdAt"].as_str().unwrap_or("") >= "2024-07-01"));
    }

    #[tokio::test]
    async fn test_children_and_unknown_parent() {
        let directory = MockDirectory::new();
        let source = directory.source(Collection::UserGroups);
        let groups = directory.records(Collection::UserGroups);
        let parent = groups
            .iter()
            .find_map(|r| r.parent_id.clone())
            .unwrap();

        let children = source.fetch_children(&parent, None).await.unwrap().normalize();
        assert!(!children.records.is_empty());
        assert!(children
            .records
            .iter()
            .all(|r| r.parent_id.as_deref() == Some(parent.as_str())));

        let err = source.fetch_children("nope", None).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_child_fetch_applies_filter() {
        let directory = MockDirectory::new();
        let source = directory.source(Collection::UserGroups);
        let groups = directory.records(Collection::UserGroups);
        let child = groups.iter().find(|r| r.parent_id.is_some()).unwrap();
        let parent = child.parent_id.clone().unwrap();
        let name = child.payload["name"].as_str().unwrap().to_owned();

        let wanted = filter(&[("name", name.as_str())]);
        let matching = source.fetch_children(&parent, Some(&wanted)).await.unwrap().normalize();
        assert!(matching.records.iter().any(|r| r.id == child.id));
        assert!(matching
            .records
            .iter()
            .all(|r| r.payload["name"].as_str().unwrap_or("").to_lowercase().contains(&name.to_lowercase())));

        let nothing = filter(&[("name", "no such group")]);
        let empty = source.fetch_children(&parent, Some(&nothing)).await.unwrap().normalize();
        assert!(empty.records.is_empty());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let directory = MockDirectory::new();
        let source = directory.source(Collection::Users);
        directory.fail_next(1);

        assert!(source.fetch_roots(&Filter::new(), PageRequest::default()).await.is_err());
        assert!(source.fetch_roots(&Filter::new(), PageRequest::default()).await.is_ok());
        assert_eq!(directory.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency() {
        let directory = MockDirectory::new().with_latency(Duration::from_millis(250));
        let source = directory.source(Collection::Roles);
        let started = tokio::time::Instant::now();
        source.fetch_roots(&Filter::new(), PageRequest::default()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn test_members_are_known_users() {
        let directory = MockDirectory::new();
        for group in directory.records(Collection::UserGroups) {
            let members = directory.members_of(&group.id);
            assert_eq!(group.payload["memberCount"], json!(members.len()));
            assert!(members.iter().all(|m| directory.find(Collection::Users, m).is_some()));
        }
    }
}
