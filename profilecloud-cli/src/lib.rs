//! Settings, in-process collaborators and rendering for the ProfileCloud CLI.
//!
//! The binary seeds the merge engine from JSON files instead of a live device
//! and document store, then prints the resulting tree.

use anyhow::{Context, Result};
use async_trait::async_trait;
use profilecloud_model::{LocalRecord, MergedEntity, SyncState, parse_snapshot};
use profilecloud_sync::{
    Collaborators, EngineConfig, HostBridge, HostOperation, LocalSnapshotHub, LogLevel,
    LogMessage, MemoryRemoteStore, MergeEngine, PrincipalCell, SyncResult,
};
use profilecloud_tree::{
    BuildOptions, CatalogSpec, ClassifierOptions, Folder, SortKey, StaticCatalog, Term, TreeNode,
    build, filter, sort,
};
use profilecloud_types::PrincipalId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Settings file contents. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Owners whose configs are listed as recommended.
    pub recommended_owner_ids: Vec<PrincipalId>,
    pub engine: EngineConfig,
    pub catalog: CatalogSpec,
}

impl Settings {
    /// Loads settings from `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }
}

/// Reads a JSON array of raw documents.
pub fn read_documents(path: &Path) -> Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a JSON array", path.display()))
}

/// Reads a JSON object mapping share-link ids to documents.
pub fn read_share_links(path: &Path) -> Result<BTreeMap<String, Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a JSON object", path.display()))
}

/// A host that keeps local configs in memory and reports to the log.
///
/// Imported and deleted configs are applied to the local snapshot hub, so
/// the engine sees them on its next resynthesis.
#[derive(Clone)]
pub struct InProcessHost {
    hub: LocalSnapshotHub,
}

impl InProcessHost {
    pub fn new(hub: LocalSnapshotHub) -> Self {
        Self { hub }
    }

    fn write_local(&self, mut record: LocalRecord) {
        if record.source_file_name.is_empty() {
            record.source_file_name = format!("{}.json", record.id());
        }
        info!("writing local config {} ({})", record.id(), record.source_file_name);
        let mut files: Vec<LocalRecord> = self
            .hub
            .latest()
            .iter()
            .filter(|l| l.id() != record.id())
            .cloned()
            .collect();
        files.push(record);
        self.hub.publish(files);
    }

    fn remove_local(&self, record: &LocalRecord) {
        info!("removing local config {}", record.id());
        let files = self
            .hub
            .latest()
            .iter()
            .filter(|l| l.id() != record.id())
            .cloned()
            .collect();
        self.hub.publish(files);
    }
}

#[derive(Deserialize)]
struct DeletePayload {
    config: LocalRecord,
}

#[async_trait]
impl HostBridge for InProcessHost {
    async fn request(&self, operation: HostOperation, payload: Value) -> SyncResult<Option<Value>> {
        match operation {
            HostOperation::ImportConfig => {
                self.write_local(serde_json::from_value(payload)?);
            }
            HostOperation::DeleteLocalConfig => {
                let DeletePayload { config } = serde_json::from_value(payload)?;
                self.remove_local(&config);
            }
            HostOperation::SendLogMessage => {
                let message: LogMessage = serde_json::from_value(payload)?;
                match message.level {
                    LogLevel::Error | LogLevel::Warning => warn!("{}", message.message),
                    LogLevel::Info => info!("{}", message.message),
                }
            }
            other => debug!("{} request ignored", other.channel_name()),
        }
        Ok(None)
    }
}

/// Inputs of one CLI run.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub local: Vec<Value>,
    pub remote: Vec<Value>,
    pub share_links: BTreeMap<String, Value>,
    pub principal: Option<PrincipalId>,
    /// Share link to clone before printing.
    pub clone_link: Option<String>,
}

/// View options of one CLI run. Defaults to newest first with shared
/// configs collapsed into one folder.
#[derive(Debug, Clone)]
pub struct View {
    pub terms: Vec<Term>,
    pub sort: SortKey,
    pub supported_only: bool,
    pub hide_community: bool,
    pub types: Vec<String>,
}

impl Default for View {
    fn default() -> Self {
        let classifier = ClassifierOptions::default();
        Self {
            terms: Vec::new(),
            sort: SortKey::default(),
            supported_only: classifier.supported_only,
            hide_community: classifier.hide_community,
            types: classifier.capability_filter,
        }
    }
}

/// Result of a run.
#[derive(Debug)]
pub struct Outcome {
    pub merged: Vec<MergedEntity>,
    pub tree: Folder,
    /// The config created from the share link, if one was cloned.
    pub cloned: Option<MergedEntity>,
}

/// Runs the merge engine over `inputs` and builds the tree.
pub async fn run(settings: &Settings, inputs: Inputs, view: &View) -> Result<Outcome> {
    let hub = LocalSnapshotHub::new();
    hub.publish(parse_snapshot(inputs.local));

    let store = MemoryRemoteStore::new();
    for document in inputs.remote {
        store.insert_document(document);
    }
    for (link, document) in inputs.share_links {
        store.insert_share_link(link, document);
    }

    let principal = PrincipalCell::new(inputs.principal.clone());
    let engine = MergeEngine::start(
        settings.engine.clone(),
        Collaborators {
            local: hub.clone(),
            remote: Arc::new(store.clone()),
            principal: Arc::new(principal),
            share_links: Arc::new(store),
            host: Arc::new(InProcessHost::new(hub)),
        },
        Arc::new(|merged: Vec<MergedEntity>| debug!("merged list now has {} configs", merged.len())),
    );

    let cloned = match &inputs.clone_link {
        Some(link) => engine
            .clone_from_share_link(link)
            .await
            .with_context(|| format!("Failed to clone share link {link}"))?,
        None => None,
    };

    let merged = engine.current();
    engine.cancel();

    let catalog = StaticCatalog::new(settings.catalog.clone());
    let options = BuildOptions {
        classifier: ClassifierOptions {
            capability_filter: view.types.clone(),
            supported_only: view.supported_only,
            hide_community: view.hide_community,
            principal_id: inputs.principal,
            curated_owner_ids: settings.recommended_owner_ids.clone(),
        },
        compatibility_types: view.types.clone(),
        searching: !view.terms.is_empty(),
    };
    let mut tree = build(&merged, &options, &catalog);
    sort(&mut tree, view.sort);
    filter(&mut tree, &view.terms, &catalog);

    Ok(Outcome {
        merged,
        tree,
        cloned,
    })
}

/// Renders a tree as indented text. Hidden items are left out.
pub fn render_tree(tree: &Folder) -> String {
    let mut out = String::new();
    for node in &tree.children {
        render_node(node, 0, &mut out);
    }
    out
}

fn render_node(node: &TreeNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match node {
        TreeNode::Folder(folder) => {
            let _ = writeln!(out, "{indent}{}/", folder.title);
        }
        TreeNode::Item(item) => {
            if item.hidden {
                return;
            }
            let entity = item.entity.merged();
            let mut flags = vec![sync_label(entity.sync_state)];
            if !entity.editable {
                flags.push("read-only");
            }
            if !item.compatible {
                flags.push("incompatible");
            }
            let _ = writeln!(
                out,
                "{indent}- {} [{}] ({})",
                entity.name(),
                entity.kind().as_str(),
                flags.join(", ")
            );
        }
    }
    for child in node.children() {
        render_node(child, depth + 1, out);
    }
}

fn sync_label(state: SyncState) -> &'static str {
    match state {
        SyncState::LocalOnly => "local",
        SyncState::RemoteOnly => "remote",
        SyncState::Synced => "synced",
    }
}
