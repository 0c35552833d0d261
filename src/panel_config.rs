//! Declarative page and panel configuration.
//!
//! Pages are described as JSON documents: which collection they show, the
//! search fields above the table, the table columns and an optional transfer
//! panel. A built-in catalog covers the directory pages; a JSON file with the
//! same shape replaces it.
//!
//! # Examples
//!
//! ```
//! use rpanel::panel_config::{builtin_catalog, PageKind};
//!
//! let catalog = builtin_catalog();
//! let groups = catalog.page("user_groups").unwrap();
//! assert_eq!(groups.kind, PageKind::Tree);
//! assert!(!groups.table.columns.is_empty());
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::columns::ColumnSpec;
use crate::record::PageRequest;
use crate::traits::Filter;

/// Data set behind a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    UserGroups,
    Users,
    Roles,
    Workflows,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::UserGroups,
        Collection::Users,
        Collection::Roles,
        Collection::Workflows,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Collection::UserGroups => "User groups",
            Collection::Users => "Users",
            Collection::Roles => "Roles",
            Collection::Workflows => "Workflows",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// Hierarchical records with lazily loaded branches.
    Tree,
    /// Flat paged records.
    Table,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Input,
    Select,
    DateRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_owned(),
            label: label.to_owned(),
        }
    }
}

/// One search form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Filter key the value is submitted under.
    pub field: String,
    pub label: String,
    #[serde(default)]
    pub kind: FieldKind,
    /// Choices of a `select` field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

impl FieldSpec {
    pub fn input(field: &str, label: &str) -> Self {
        Self {
            field: field.to_owned(),
            label: label.to_owned(),
            kind: FieldKind::Input,
            options: Vec::new(),
        }
    }

    pub fn select(field: &str, label: &str, options: Vec<SelectOption>) -> Self {
        Self {
            kind: FieldKind::Select,
            options,
            ..Self::input(field, label)
        }
    }

    pub fn date_range(field: &str, label: &str) -> Self {
        Self {
            kind: FieldKind::DateRange,
            ..Self::input(field, label)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPanelConfig {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePanelConfig {
    /// Key under which the column layout is persisted.
    pub storage_key: String,
    pub columns: Vec<ColumnSpec>,
    /// Payload attribute shown in the tree column.
    pub title_field: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Send the search filter along with child fetches.
    #[serde(default)]
    pub filter_children: bool,
}

fn default_page_size() -> usize {
    PageRequest::DEFAULT_SIZE
}

/// Two-list assignment panel shown next to the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPanelConfig {
    pub title: String,
    /// Collection the candidates are drawn from.
    pub source: Collection,
    pub label_field: String,
    #[serde(default = "default_source_title")]
    pub source_title: String,
    #[serde(default = "default_target_title")]
    pub target_title: String,
}

fn default_source_title() -> String {
    "Available".to_owned()
}

fn default_target_title() -> String {
    "Assigned".to_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageConfig {
    pub id: String,
    pub title: String,
    pub kind: PageKind,
    pub collection: Collection,
    #[serde(default)]
    pub search: SearchPanelConfig,
    pub table: TablePanelConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferPanelConfig>,
}

impl PageConfig {
    pub fn first_page(&self) -> PageRequest {
        PageRequest::first(self.table.page_size)
    }
}

/// The full set of pages of the admin panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_title")]
    pub title: String,
    pub pages: Vec<PageConfig>,
}

fn default_app_title() -> String {
    "Admin panel".to_owned()
}

impl AppConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects configurations the viewer cannot display.
    pub fn validate(&self) -> Result<()> {
        if self.pages.is_empty() {
            bail!("configuration has no pages");
        }
        let mut page_ids = HashSet::new();
        for page in &self.pages {
            if !page_ids.insert(page.id.as_str()) {
                bail!("duplicate page id '{}'", page.id);
            }
            if page.table.columns.is_empty() {
                bail!("page '{}' has no columns", page.id);
            }
            let mut column_keys = HashSet::new();
            for column in &page.table.columns {
                if column.key.is_empty() {
                    bail!("page '{}' has a column without a key", page.id);
                }
                if !column_keys.insert(column.key.as_str()) {
                    bail!("page '{}' has duplicate column '{}'", page.id, column.key);
                }
            }
            for field in &page.search.fields {
                if field.kind == FieldKind::Select && field.options.is_empty() {
                    bail!("select field '{}' on page '{}' has no options", field.field, page.id);
                }
            }
        }
        Ok(())
    }

    pub fn page(&self, id: &str) -> Option<&PageConfig> {
        self.pages.iter().find(|p| p.id == id)
    }

    pub fn page_index(&self, id: &str) -> Result<usize> {
        self.pages
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| anyhow!("unknown page '{id}'"))
    }
}

static BUILTIN: Lazy<AppConfig> = Lazy::new(|| AppConfig {
    title: default_app_title(),
    pages: vec![
        PageConfig {
            id: "user_groups".into(),
            title: "User groups".into(),
            kind: PageKind::Tree,
            collection: Collection::UserGroups,
            search: SearchPanelConfig {
                fields: vec![
                    FieldSpec::input("name", "Group name"),
                    FieldSpec::select(
                        "status",
                        "Status",
                        vec![
                            SelectOption::new("enabled", "Enabled"),
                            SelectOption::new("disabled", "Disabled"),
                        ],
                    ),
                ],
            },
            table: TablePanelConfig {
                storage_key: "user_groups".into(),
                columns: vec![
                    ColumnSpec::field("name", "Group name").with_width(240.0),
                    ColumnSpec::field("code", "Code").with_width(140.0),
                    ColumnSpec::field("memberCount", "Members").with_width(90.0),
                    ColumnSpec::field("status", "Status").with_width(100.0),
                    ColumnSpec::field("createdAt", "Created").with_width(180.0),
                ],
                title_field: "name".into(),
                page_size: 10,
                filter_children: false,
            },
            transfer: Some(TransferPanelConfig {
                title: "Group members".into(),
                source: Collection::Users,
                label_field: "username".into(),
                source_title: default_source_title(),
                target_title: "Members".into(),
            }),
        },
        PageConfig {
            id: "users".into(),
            title: "Users".into(),
            kind: PageKind::Table,
            collection: Collection::Users,
            search: SearchPanelConfig {
                fields: vec![
                    FieldSpec::input("username", "Username"),
                    FieldSpec::select(
                        "role",
                        "Role",
                        vec![
                            SelectOption::new("admin", "Administrator"),
                            SelectOption::new("auditor", "Auditor"),
                            SelectOption::new("operator", "Operator"),
                        ],
                    ),
                    FieldSpec::date_range("createdAt", "Created"),
                ],
            },
            table: TablePanelConfig {
                storage_key: "users".into(),
                columns: vec![
                    ColumnSpec::field("username", "Username").with_width(180.0),
                    ColumnSpec::field("email", "Email").with_width(240.0),
                    ColumnSpec::field("role", "Role").with_width(110.0),
                    ColumnSpec::field("status", "Status").with_width(100.0),
                    ColumnSpec::field("createdAt", "Created").with_width(180.0),
                ],
                title_field: "username".into(),
                page_size: PageRequest::DEFAULT_SIZE,
                filter_children: false,
            },
            transfer: None,
        },
        PageConfig {
            id: "roles".into(),
            title: "Roles".into(),
            kind: PageKind::Table,
            collection: Collection::Roles,
            search: SearchPanelConfig {
                fields: vec![FieldSpec::input("name", "Role name")],
            },
            table: TablePanelConfig {
                storage_key: "roles".into(),
                columns: vec![
                    ColumnSpec::field("name", "Role name").with_width(180.0),
                    ColumnSpec::field("code", "Code").with_width(140.0),
                    ColumnSpec::field("description", "Description").with_width(320.0),
                ],
                title_field: "name".into(),
                page_size: PageRequest::DEFAULT_SIZE,
                filter_children: false,
            },
            transfer: None,
        },
        PageConfig {
            id: "workflows".into(),
            title: "Workflow catalog".into(),
            kind: PageKind::Table,
            collection: Collection::Workflows,
            search: SearchPanelConfig {
                fields: vec![
                    FieldSpec::input("name", "Workflow"),
                    FieldSpec::select(
                        "category",
                        "Category",
                        vec![
                            SelectOption::new("approval", "Approval"),
                            SelectOption::new("onboarding", "Onboarding"),
                            SelectOption::new("offboarding", "Offboarding"),
                        ],
                    ),
                ],
            },
            table: TablePanelConfig {
                storage_key: "workflows".into(),
                columns: vec![
                    ColumnSpec::field("name", "Workflow").with_width(220.0),
                    ColumnSpec::field("category", "Category").with_width(130.0),
                    ColumnSpec::field("version", "Version").with_width(80.0),
                    ColumnSpec::titled("Last updated").with_width(180.0),
                ],
                title_field: "name".into(),
                page_size: PageRequest::DEFAULT_SIZE,
                filter_children: false,
            },
            transfer: None,
        },
    ],
});

/// Pages shown when no configuration file is given.
pub fn builtin_catalog() -> &'static AppConfig {
    &BUILTIN
}

/// Current values of a search form.
///
/// Text and select fields hold one string; date ranges hold a `from`/`to`
/// pair. Empty values are left out of the submitted filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchForm {
    values: BTreeMap<String, String>,
    ranges: BTreeMap<String, (String, String)>,
}

impl SearchForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value_mut(&mut self, field: &str) -> &mut String {
        self.values.entry(field.to_owned()).or_default()
    }

    pub fn range_mut(&mut self, field: &str) -> &mut (String, String) {
        self.ranges.entry(field.to_owned()).or_default()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.ranges.clear();
    }

    /// Builds the filter submitted for `config`.
    ///
    /// Date ranges become `<field>From` / `<field>To` entries.
    pub fn to_filter(&self, config: &SearchPanelConfig) -> Filter {
        let mut filter = Filter::new();
        for spec in &config.fields {
            match spec.kind {
                FieldKind::Input | FieldKind::Select => {
                    if let Some(value) = self.values.get(&spec.field) {
                        let value = value.trim();
                        if !value.is_empty() {
                            filter.insert(spec.field.clone(), value.into());
                        }
                    }
                }
                FieldKind::DateRange => {
                    if let Some((from, to)) = self.ranges.get(&spec.field) {
                        if !from.trim().is_empty() {
                            filter.insert(format!("{}From", spec.field), from.trim().into());
                        }
                        if !to.trim().is_empty() {
                            filter.insert(format!("{}To", spec.field), to.trim().into());
                        }
                    }
                }
            }
        }
        filter
    }
}
