use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use console::style;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use sidetag_core::config::Settings;
use sidetag_core::engine::{EditTagRequested, Notification, Severity};
use sidetag_core::event::Listener;
use sidetag_core::index::MemoryIndex;
use sidetag_core::library::JsonTagLibrary;
use sidetag_core::opened_files::MemoryOpenedFiles;
use sidetag_core::platform::LocalPlatform;
use sidetag_core::storage::{LocalBackend, SidecarStore};
use sidetag_core::{Tag, TagEngine};
use tracing::debug;

/// Everything a command needs: settings, the engine and the collaborators it was built with.
pub struct Sidetag {
    pub settings: Settings,
    pub engine: TagEngine,
    pub index: Arc<MemoryIndex>,
    pub library: Arc<JsonTagLibrary>,
    pending_edits: Arc<Mutex<Vec<Tag>>>,
    _listeners: (Listener<Notification>, Listener<EditTagRequested>),
}

impl Sidetag {
    pub async fn open(config: &Path, library: &Path) -> anyhow::Result<Self> {
        let settings = Settings::load(config)
            .await
            .with_context(|| format!("Failed to load settings from {}", config.display()))?;
        debug!("Settings loaded: {:?}", settings);

        let index = Arc::new(MemoryIndex::new());
        let library = Arc::new(JsonTagLibrary::new(library));
        let engine = TagEngine::new(
            Arc::new(LocalPlatform),
            SidecarStore::new(Arc::new(LocalBackend)),
            Arc::new(MemoryOpenedFiles::new()),
            index.clone(),
            library.clone(),
            settings.snapshot(None),
        );

        let notifications = Listener::new(&engine.on.notification, print_notification);
        let pending_edits = Arc::new(Mutex::new(Vec::new()));
        let sink = pending_edits.clone();
        let edits = Listener::new(&engine.on.edit_tag_requested, move |request: &EditTagRequested| {
            sink.lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(request.tag.clone());
            true
        });

        Ok(Sidetag {
            settings,
            engine,
            index,
            library,
            pending_edits,
            _listeners: (notifications, edits),
        })
    }

    /// Makes `paths` absolute and configures the engine for the location of the first one.
    pub fn prepare(&self, paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
        let paths = paths
            .iter()
            .map(|p| std::path::absolute(p).with_context(|| format!("Invalid path {}", p.display())))
            .collect::<anyhow::Result<Vec<_>>>()?;
        if let Some(first) = paths.first() {
            self.engine.set_config(self.settings.snapshot_for(first));
        }
        Ok(paths)
    }

    /// Asks the user to confirm the geo and date tags requested by the last operation and adds
    /// the confirmed values.
    pub async fn confirm_pending_edits(&self) -> anyhow::Result<()> {
        let pending: Vec<Tag> =
            std::mem::take(&mut *self.pending_edits.lock().unwrap_or_else(|e| e.into_inner()));
        for tag in pending {
            let Some(path) = tag.path.clone() else {
                continue;
            };
            let value = prompt(format!("Value for {}", path.display()), tag.title.clone()).await?;
            if !self.engine.edit_tag_for_entry(&path, &tag, Some(&value)).await {
                anyhow::bail!("Could not add '{}' to {}", value, path.display());
            }
        }
        Ok(())
    }
}

fn print_notification(notification: &Notification) {
    let label = match notification.severity {
        Severity::Info => style("info").cyan(),
        Severity::Warning => style("warning").yellow(),
        Severity::Error => style("error").red(),
    };
    match &notification.path {
        Some(path) => eprintln!("{}: {} ({})", label.bold(), notification.message(), path.display()),
        None => eprintln!("{}: {}", label.bold(), notification.message()),
    }
}

async fn prompt(text: String, initial: String) -> anyhow::Result<String> {
    let result = tokio::task::spawn_blocking(move || {
        Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(text)
            .with_initial_text(initial)
            .interact_text()
            .context("Failed to read input")
    })
    .await;
    result.context("Blocking task failed (panic)")?
}

/// Asks a yes/no question, defaulting to no.
pub async fn confirm(text: String) -> anyhow::Result<bool> {
    let result = tokio::task::spawn_blocking(move || {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(text)
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    })
    .await;
    result.context("Blocking task failed (panic)")?
}
