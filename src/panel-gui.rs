//! Admin Panel Viewer GUI Application
//!
//! Interactive front end for the panel engine built with egui. The viewer features:
//! - One page per configured collection, with a search form and paged results
//! - Hierarchical tables whose branches load on demand from the directory service
//! - Resizable, hideable columns whose layout is persisted per table
//! - A transfer panel for editing the members of the selected group
//! - Details panel listing every attribute of the selected row

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
//!
//! The application is built with a modular architecture:
//! - `app/` - Application state management and coordination
//! - `cache/` - Row and cell caching for the tables
//! - `io/` - Background fetching on a tokio runtime
//! - `utils/` - Utility functions for formatting
//! - `ui/` - UI panel rendering and interaction
//! - `rendering/` - Low-level rendering for tree rows
//! - `state/` - Per-page, selection and layout state

use eframe::egui;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use rpanel::{
    builtin_catalog, AppConfig, ColumnStateStore, FileStore, KeyValueStore, MemoryStore, MockDirectory,
    Subscription,
};

mod app;
mod cache;
mod io;
mod rendering;
mod state;
mod ui;
mod utils;

use app::{AppState, ApplicationCoordinator, ColumnStore, SettingsCoordinator, WindowPreferences};
use io::AsyncLoader;
use ui::panel_manager::{PanelInteraction, PanelManager};

/// Command-line options.
#[derive(Debug, Default)]
struct CliOptions {
    /// Page configuration file; the built-in catalog is used without one
    config: Option<PathBuf>,
    verbose: bool,
}

impl CliOptions {
    fn parse(args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let mut options = Self::default();
        let mut args = args.skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = args
                        .next()
                        .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
                    options.config = Some(PathBuf::from(path));
                }
                "--verbose" | "-v" => options.verbose = true,
                other => anyhow::bail!("Unknown argument: {other}"),
            }
        }
        Ok(options)
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rpanel={default_level},panel_gui={default_level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Column layouts go to the user's config directory when it exists.
fn column_store() -> ColumnStore {
    let storage: Box<dyn KeyValueStore> = match FileStore::in_config_dir() {
        Some(store) => {
            tracing::info!(dir = %store.dir().display(), "persisting column layouts");
            Box::new(store)
        }
        None => {
            tracing::warn!("no config directory, column layouts will not be saved");
            Box::new(MemoryStore::new())
        }
    };
    ColumnStateStore::new(storage)
}

/// Main application entry point that initializes and launches the panel viewer GUI.
fn main() -> anyhow::Result<()> {
    let options = CliOptions::parse(std::env::args())?;
    init_tracing(options.verbose);

    let config = match &options.config {
        Some(path) => AppConfig::load(path)?,
        None => builtin_catalog().clone(),
    };
    let title = config.title.clone();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(&title),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        native_options,
        Box::new(move |cc| {
            let app = PanelViewerApp::new(cc, config)?;
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("GUI failed: {e}"))
}

/// The main panel viewer application.
///
/// Most functionality is delegated to coordinators:
/// - `ApplicationCoordinator` handles fetching, result application and panel events
/// - `SettingsCoordinator` handles preference persistence
/// - `PanelManager` handles UI panel layout and rendering
struct PanelViewerApp {
    /// Centralized application state
    state: AppState,
    /// Background fetcher
    loader: AsyncLoader,
    /// Pages are searched on the first frame, once a context is available
    initial_search_pending: bool,
    _event_log: Subscription,
}

impl PanelViewerApp {
    /// Creates a new viewer with preferences loaded from persistent storage.
    fn new(cc: &eframe::CreationContext, config: AppConfig) -> anyhow::Result<Self> {
        let preferences = SettingsCoordinator::load_preferences(cc.storage);
        let mut state = AppState::new(config, MockDirectory::new(), column_store());
        state.layout = SettingsCoordinator::load_layout(cc.storage);
        state.dark_mode = preferences.dark_mode;
        if let Some(page_id) = &preferences.active_page {
            state.activate_page_id(page_id);
        }

        let event_log = state.events.subscribe(|event| tracing::debug!(?event, "panel event"));

        Ok(Self {
            state,
            loader: AsyncLoader::new()?,
            initial_search_pending: true,
            _event_log: event_log,
        })
    }

    fn preferences(&self) -> WindowPreferences {
        WindowPreferences {
            active_page: self.state.active_page().map(|page| page.id().to_owned()),
            dark_mode: self.state.dark_mode,
        }
    }

    /// Handles panel interactions by delegating to ApplicationCoordinator.
    fn handle_panel_interaction(&mut self, interaction: PanelInteraction, ctx: &egui::Context) {
        match interaction {
            PanelInteraction::Event(event) => {
                ApplicationCoordinator::handle_panel_event(&mut self.state, &self.loader, event, ctx);
            }
            PanelInteraction::SwitchPage(index) => self.state.set_active_page(index),
            PanelInteraction::ImportConfig(path) => {
                ApplicationCoordinator::import_config(&mut self.state, &self.loader, &path, ctx);
            }
            PanelInteraction::Refresh => {
                if let Some(page) = self.state.active_page() {
                    let page_id = page.id().to_owned();
                    let filter = page.session.filter().clone();
                    let request = page.session.page();
                    ApplicationCoordinator::submit_search(
                        &mut self.state,
                        &self.loader,
                        &page_id,
                        filter,
                        request,
                        ctx,
                    );
                }
            }
        }
    }
}

impl eframe::App for PanelViewerApp {
    /// Called when the app is being shut down - ensures preferences are saved.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        SettingsCoordinator::save_all(storage, &self.preferences(), &self.state.layout);
    }

    /// Main update loop:
    /// 1. Apply fetch results that arrived since the last frame
    /// 2. Apply appearance
    /// 3. Start the initial searches on the first frame
    /// 4. Render all panels via PanelManager
    /// 5. Handle panel interactions
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ApplicationCoordinator::check_loading_completion(&mut self.state, &mut self.loader);

        ctx.set_visuals(if self.state.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });

        if std::mem::take(&mut self.initial_search_pending) {
            ApplicationCoordinator::search_all(&mut self.state, &self.loader, ctx);
        }

        if let Some(interaction) = PanelManager::render_all_panels(ctx, &mut self.state) {
            self.handle_panel_interaction(interaction, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        std::iter::once("panel-gui".to_owned())
            .chain(list.iter().map(|s| s.to_string()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_cli_parses_config_and_verbose() {
        let options = CliOptions::parse(args(&["-v", "--config", "pages.json"])).unwrap();
        assert!(options.verbose);
        assert_eq!(options.config, Some(PathBuf::from("pages.json")));
    }

    #[test]
    fn test_cli_rejects_missing_and_unknown() {
        assert!(CliOptions::parse(args(&["--config"])).is_err());
        assert!(CliOptions::parse(args(&["--bogus"])).is_err());
        assert!(CliOptions::parse(args(&[])).unwrap().config.is_none());
    }
}
