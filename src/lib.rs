pub mod traits;
pub mod error;
pub mod record;
pub mod forest;
pub mod merge;
pub mod expansion;
pub mod visible;
pub mod columns;
pub mod storage;
pub mod events;
pub mod session;
pub mod panel_config;
pub mod transfer;
pub mod mock_service;

// Export collaborator traits
pub use traits::{ChildFetcher, RootFetcher, KeyValueStore, RecordKey, Filter};

// Export errors
pub use error::{FetchError, StorageError, PersistenceCorruptError, PanelError};

// Export records and tree building
pub use record::{Record, Payload, PageRequest, RecordPage, ResponseEnvelope};
pub use forest::{build, Forest, Node, Children};
pub use merge::{attach_children, changed_keys, normalize_children};
pub use visible::{visible_rows, visible_count, VisibleRow, Affordance};

// Export expansion engine
pub use expansion::{ExpansionEngine, ExpansionState, Expansion};
pub use session::{TreeSession, SearchTicket};

// Export column state persistence
pub use columns::{ColumnSpec, ColumnSetting, ColumnState, ColumnStateStore};
pub use storage::{MemoryStore, FileStore};

// Export panel configuration and events
pub use panel_config::{AppConfig, PageConfig, PageKind, Collection, builtin_catalog};
pub use events::{PanelEvent, Observers, Subscription};
pub use transfer::{TransferList, TransferItem, Side};

// Export mock directory
pub use mock_service::{MockDirectory, CollectionSource};
