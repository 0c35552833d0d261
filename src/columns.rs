//! Per-table column visibility and width preferences.
//!
//! Each logical table has a `storage_key`. Its column layout is persisted as
//! a small versioned JSON document through a [`KeyValueStore`]. Reading never
//! fails: a missing, malformed or outdated document yields the default
//! layout (every column visible at its default width).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::PersistenceCorruptError;
use crate::traits::KeyValueStore;

pub const DEFAULT_MIN_WIDTH: f32 = 60.0;
pub const DEFAULT_MAX_WIDTH: f32 = 600.0;
pub const DEFAULT_WIDTH: f32 = 160.0;

const FORMAT_VERSION: u32 = 1;

/// Static description of one table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    /// Stable identifier; the bound field name, or a slug of the title.
    pub key: String,
    pub title: String,
    #[serde(default = "default_width")]
    pub default_width: f32,
    #[serde(default = "default_min_width")]
    pub min_width: f32,
    #[serde(default = "default_max_width")]
    pub max_width: f32,
}

fn default_width() -> f32 {
    DEFAULT_WIDTH
}

fn default_min_width() -> f32 {
    DEFAULT_MIN_WIDTH
}

fn default_max_width() -> f32 {
    DEFAULT_MAX_WIDTH
}

impl ColumnSpec {
    /// Column bound to `field`, keyed by the field name.
    pub fn field(field: &str, title: &str) -> Self {
        Self {
            key: field.to_owned(),
            title: title.to_owned(),
            default_width: DEFAULT_WIDTH,
            min_width: DEFAULT_MIN_WIDTH,
            max_width: DEFAULT_MAX_WIDTH,
        }
    }

    /// Column without a bound field (e.g. an actions column), keyed by its title.
    pub fn titled(title: &str) -> Self {
        Self::field(&slugify(title), title)
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.default_width = width;
        self
    }

    pub fn with_bounds(mut self, min_width: f32, max_width: f32) -> Self {
        self.min_width = min_width;
        self.max_width = max_width.max(min_width);
        self
    }

    /// Clamps `width` into this column's bounds; non-finite widths fall back
    /// to the default width.
    pub fn clamp(&self, width: f32) -> f32 {
        let width = if width.is_finite() { width } else { self.default_width };
        width.clamp(self.min_width, self.max_width.max(self.min_width))
    }

    fn default_setting(&self) -> ColumnSetting {
        ColumnSetting {
            visible: true,
            width: self.clamp(self.default_width),
        }
    }
}

/// Lowercase, `_`-separated identifier derived from a column title.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// User preference for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnSetting {
    pub visible: bool,
    pub width: f32,
}

/// Layout of one table: column key -> visibility and width.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnState {
    columns: BTreeMap<String, ColumnSetting>,
}

impl ColumnState {
    /// Every column visible at its default width.
    pub fn defaults(specs: &[ColumnSpec]) -> Self {
        Self {
            columns: specs
                .iter()
                .map(|spec| (spec.key.clone(), spec.default_setting()))
                .collect(),
        }
    }

    pub fn get(&self, column_key: &str) -> Option<ColumnSetting> {
        self.columns.get(column_key).copied()
    }

    pub fn is_visible(&self, column_key: &str) -> bool {
        self.get(column_key).is_some_and(|c| c.visible)
    }

    pub fn width(&self, column_key: &str) -> Option<f32> {
        self.get(column_key).map(|c| c.width)
    }

    pub fn set_visible(&mut self, column_key: &str, visible: bool) {
        if let Some(setting) = self.columns.get_mut(column_key) {
            setting.visible = visible;
        }
    }

    /// Sets a raw width; bounds are enforced when the state is saved.
    pub fn set_width(&mut self, column_key: &str, width: f32) {
        if let Some(setting) = self.columns.get_mut(column_key) {
            setting.width = width;
        }
    }

    /// Inserts or replaces the setting of a column.
    pub fn insert(&mut self, column_key: &str, setting: ColumnSetting) {
        self.columns.insert(column_key.to_owned(), setting);
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Visible columns in declaration order of `specs`, with their widths.
    pub fn visible_columns<'a>(&self, specs: &'a [ColumnSpec]) -> Vec<(&'a ColumnSpec, f32)> {
        specs
            .iter()
            .filter_map(|spec| {
                let setting = self.get(&spec.key).unwrap_or_else(|| spec.default_setting());
                setting.visible.then_some((spec, setting.width))
            })
            .collect()
    }

    /// Reconciles this state with `specs`: unknown columns are dropped,
    /// missing columns get defaults, widths are clamped.
    ///
    /// With no specs (an unregistered table) every column is kept and
    /// clamped to the default bounds.
    fn reconciled(&self, specs: &[ColumnSpec]) -> Self {
        if specs.is_empty() {
            return Self {
                columns: self
                    .columns
                    .iter()
                    .map(|(key, saved)| {
                        let width = saved.width.clamp(DEFAULT_MIN_WIDTH, DEFAULT_MAX_WIDTH);
                        (key.clone(), ColumnSetting { width, ..*saved })
                    })
                    .collect(),
            };
        }
        Self {
            columns: specs
                .iter()
                .map(|spec| {
                    let setting = match self.columns.get(&spec.key) {
                        Some(saved) => ColumnSetting {
                            visible: saved.visible,
                            width: spec.clamp(saved.width),
                        },
                        None => spec.default_setting(),
                    };
                    (spec.key.clone(), setting)
                })
                .collect(),
        }
    }
}

/// On-disk shape of a persisted column layout.
#[derive(Serialize, Deserialize)]
struct PersistedColumns {
    version: u32,
    columns: BTreeMap<String, ColumnSetting>,
}

/// Loads, saves and resets column layouts for registered tables.
pub struct ColumnStateStore<S> {
    storage: S,
    namespace: String,
    tables: HashMap<String, Vec<ColumnSpec>>,
}

impl<S: KeyValueStore> ColumnStateStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_namespace(storage, "rpanel")
    }

    pub fn with_namespace(storage: S, namespace: &str) -> Self {
        Self {
            storage,
            namespace: namespace.to_owned(),
            tables: HashMap::new(),
        }
    }

    /// Declares the columns of the table persisted under `storage_key`.
    pub fn register(&mut self, storage_key: &str, specs: Vec<ColumnSpec>) {
        self.tables.insert(storage_key.to_owned(), specs);
    }

    pub fn specs(&self, storage_key: &str) -> &[ColumnSpec] {
        self.tables.get(storage_key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Key under which the layout of `storage_key` is persisted.
    pub fn persisted_key(&self, storage_key: &str) -> String {
        format!("{}.columns.{}", self.namespace, storage_key)
    }

    /// Restores the layout of a table, falling back to defaults when
    /// nothing usable is persisted.
    pub fn load(&self, storage_key: &str) -> ColumnState {
        let specs = self.specs(storage_key);
        let key = self.persisted_key(storage_key);

        let raw = match self.storage.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ColumnState::defaults(specs),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "column state unreadable, using defaults");
                return ColumnState::defaults(specs);
            }
        };

        match decode(&key, &raw) {
            Ok(state) => state.reconciled(specs),
            Err(e) => {
                tracing::warn!(error = %e, "discarding persisted column state");
                ColumnState::defaults(specs)
            }
        }
    }

    /// Persists `state`, clamping every width into its column's bounds.
    /// Overwrites whatever was stored before.
    pub fn save(&mut self, storage_key: &str, state: &ColumnState) {
        let clamped = state.reconciled(self.specs(storage_key));
        let key = self.persisted_key(storage_key);
        let document = PersistedColumns {
            version: FORMAT_VERSION,
            columns: clamped.columns,
        };

        let json = match serde_json::to_string(&document) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "could not encode column state");
                return;
            }
        };
        if let Err(e) = self.storage.set(&key, &json) {
            tracing::warn!(key = %key, error = %e, "could not persist column state");
        }
    }

    /// Clears the persisted layout and returns the defaults. Callers should
    /// re-render the table from the returned state.
    pub fn reset(&mut self, storage_key: &str) -> ColumnState {
        let key = self.persisted_key(storage_key);
        if let Err(e) = self.storage.remove(&key) {
            tracing::warn!(key = %key, error = %e, "could not clear column state");
        }
        tracing::debug!(table = storage_key, "column layout reset");
        ColumnState::defaults(self.specs(storage_key))
    }

    /// Toggles visibility of one column and persists the result.
    pub fn set_visible(&mut self, storage_key: &str, state: &mut ColumnState, column_key: &str, visible: bool) {
        state.set_visible(column_key, visible);
        self.save(storage_key, state);
    }

    /// Resizes one column, clamping to its bounds, and persists the result.
    pub fn resize(&mut self, storage_key: &str, state: &mut ColumnState, column_key: &str, width: f32) {
        let width = self
            .specs(storage_key)
            .iter()
            .find(|spec| spec.key == column_key)
            .map(|spec| spec.clamp(width))
            .unwrap_or(width);
        state.set_width(column_key, width);
        self.save(storage_key, state);
    }
}

fn decode(key: &str, raw: &str) -> Result<ColumnState, PersistenceCorruptError> {
    let document: PersistedColumns =
        serde_json::from_str(raw).map_err(|source| PersistenceCorruptError::Malformed {
            key: key.to_owned(),
            source,
        })?;
    if document.version != FORMAT_VERSION {
        return Err(PersistenceCorruptError::UnsupportedVersion {
            key: key.to_owned(),
            found: document.version,
        });
    }
    Ok(ColumnState {
        columns: document.columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::MemoryStore;

    fn specs() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::field("name", "Name").with_width(200.0),
            ColumnSpec::field("code", "Code").with_width(120.0),
            ColumnSpec::titled("Created At"),
        ]
    }

    fn store() -> ColumnStateStore<MemoryStore> {
        let mut store = ColumnStateStore::new(MemoryStore::new());
        store.register("groups", specs());
        store
    }

    #[test]
    fn test_slugified_keys() {
        assert_eq!(ColumnSpec::titled("Created At").key, "created_at");
        assert_eq!(slugify("  Last -- Login  "), "last_login");
    }

    #[test]
    fn test_load_missing_returns_defaults() {
        let state = store().load("groups");
        assert_eq!(state.len(), 3);
        assert!(state.is_visible("name"));
        assert_eq!(state.width("name"), Some(200.0));
        assert_eq!(state.width("created_at"), Some(DEFAULT_WIDTH));
    }

    #[test]
    fn test_save_clamps_width() {
        let mut store = store();
        let mut state = store.load("groups");
        state.set_width("name", 9999.0);
        state.set_width("code", 3.0);
        store.save("groups", &state);

        let loaded = store.load("groups");
        assert_eq!(loaded.width("name"), Some(DEFAULT_MAX_WIDTH));
        assert_eq!(loaded.width("code"), Some(DEFAULT_MIN_WIDTH));
    }

    #[test]
    fn test_garbage_falls_back_to_defaults() {
        let mut store = store();
        let key = store.persisted_key("groups");
        store.storage_mut().set(&key, "{not json").unwrap();
        assert_eq!(store.load("groups"), ColumnState::defaults(&specs()));
    }

    #[test]
    fn test_unknown_version_falls_back_to_defaults() {
        let mut store = store();
        let key = store.persisted_key("groups");
        store
            .storage_mut()
            .set(&key, r#"{"version": 9, "columns": {"name": {"visible": false, "width": 80}}}"#)
            .unwrap();
        assert!(store.load("groups").is_visible("name"));
    }

    #[test]
    fn test_load_reconciles_with_specs() {
        let mut store = store();
        let key = store.persisted_key("groups");
        store
            .storage_mut()
            .set(
                &key,
                r#"{"version": 1, "columns": {"name": {"visible": false, "width": 700}, "gone": {"visible": true, "width": 90}}}"#,
            )
            .unwrap();

        let state = store.load("groups");
        assert!(!state.is_visible("name"));
        assert_eq!(state.width("name"), Some(DEFAULT_MAX_WIDTH));
        assert!(state.get("gone").is_none());
        assert!(state.is_visible("code"));
    }

    #[test]
    fn test_mutations_persist_immediately() {
        let mut store = store();
        let mut state = store.load("groups");
        store.set_visible("groups", &mut state, "code", false);
        store.resize("groups", &mut state, "name", 10.0);
        assert_eq!(state.width("name"), Some(DEFAULT_MIN_WIDTH));

        let reloaded = store.load("groups");
        assert!(!reloaded.is_visible("code"));
        assert_eq!(reloaded.width("name"), Some(DEFAULT_MIN_WIDTH));
        let visible: Vec<_> = reloaded.visible_columns(store.specs("groups")).iter().map(|(s, _)| s.key.as_str()).collect();
        assert_eq!(visible, vec!["name", "created_at"]);
    }

    #[test]
    fn test_unregistered_table_keeps_columns() {
        let mut store = ColumnStateStore::new(MemoryStore::new());
        let mut state = ColumnState::default();
        state.insert("col_x", ColumnSetting { visible: false, width: 9999.0 });
        state.insert("col_y", ColumnSetting { visible: true, width: 10.0 });
        store.save("adhoc", &state);

        let loaded = store.load("adhoc");
        assert_eq!(loaded.width("col_x"), Some(DEFAULT_MAX_WIDTH));
        assert!(!loaded.is_visible("col_x"));
        assert_eq!(loaded.width("col_y"), Some(DEFAULT_MIN_WIDTH));
    }

    #[test]
    fn test_reset_clears_persisted_state() {
        let mut store = store();
        let mut state = store.load("groups");
        store.set_visible("groups", &mut state, "name", false);

        let reset = store.reset("groups");
        assert!(reset.is_visible("name"));
        let key = store.persisted_key("groups");
        assert_eq!(store.storage().get(&key).unwrap(), None);
        assert!(store.load("groups").is_visible("name"));
    }

    #[test]
    fn test_tables_are_independent() {
        let mut store = store();
        store.register("users", vec![ColumnSpec::field("name", "Name")]);
        let mut groups = store.load("groups");
        store.set_visible("groups", &mut groups, "name", false);
        assert!(store.load("users").is_visible("name"));
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }

        fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }
    }

    #[test]
    fn test_storage_failures_are_absorbed() {
        let mut store = ColumnStateStore::new(BrokenStore);
        store.register("groups", specs());
        let mut state = store.load("groups");
        store.resize("groups", &mut state, "name", 300.0);
        assert_eq!(state.width("name"), Some(300.0));
        assert_eq!(store.reset("groups"), ColumnState::defaults(&specs()));
    }
}
