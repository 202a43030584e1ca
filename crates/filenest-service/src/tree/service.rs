//! The mutation orchestrator for the folder tree.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use filenest_core::error::AppError;
use filenest_core::events::{DomainEvent, TreeEvent};
use filenest_core::result::AppResult;
use filenest_core::traits::BlobStore;
use filenest_core::types::{FileId, FolderId, NodeRef};
use filenest_database::{CountMismatch, MutationPlan, RowOp, TreeStore};
use filenest_entity::file::display_size;
use filenest_entity::{File, FileType, Folder, Listing, NewFile, NewFolder, Node};

use super::counts::TreeChange;
use super::names::validate_name;
use super::query::TreeQuery;

/// Capacity of the change-notification channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What a delete removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Deletion {
    pub removed_folders: Vec<FolderId>,
    pub removed_files: Vec<FileId>,
    /// Blobs whose cleanup failed and which are now orphaned.
    pub leaked_blobs: Vec<String>,
}

/// Sole writer of the folder tree.
///
/// Every mutation reads what it needs, derives counter deltas from
/// [`TreeChange`], and commits the row change together with those deltas in
/// one [`MutationPlan`]. Successful commits are announced on a broadcast
/// channel.
#[derive(Debug, Clone)]
pub struct TreeService {
    store: Arc<dyn TreeStore>,
    blobs: Arc<dyn BlobStore>,
    query: TreeQuery,
    events: broadcast::Sender<DomainEvent>,
}

impl TreeService {
    /// Creates a new tree service.
    pub fn new(store: Arc<dyn TreeStore>, blobs: Arc<dyn BlobStore>, max_depth: u32) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            query: TreeQuery::new(Arc::clone(&store), max_depth),
            store,
            blobs,
            events,
        }
    }

    /// The query engine this service reads through.
    pub fn query(&self) -> &TreeQuery {
        &self.query
    }

    /// Receive an event for every committed mutation from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    /// Immediate children of `parent` (`None` = root level): folders first,
    /// then files, each sorted by name.
    pub async fn list_children(&self, parent: Option<FolderId>) -> AppResult<Listing> {
        if let Some(id) = parent {
            self.require_folder(id).await?;
        }
        let folders = self.store.child_folders(parent).await?;
        let files = self.store.child_files(parent).await?;
        Ok(Listing { folders, files })
    }

    /// Breadcrumbs for `folder_id`: root first, ending with the folder itself.
    pub async fn ancestor_chain(&self, folder_id: Option<FolderId>) -> AppResult<Vec<Folder>> {
        self.query.ancestor_chain(folder_id).await
    }

    /// Look up one node.
    pub async fn get_node(&self, node: NodeRef) -> AppResult<Node> {
        match node {
            NodeRef::Folder(id) => self.require_folder(id).await.map(Node::Folder),
            NodeRef::File(id) => self.require_file(id).await.map(Node::File),
        }
    }

    /// Re-fetch `current` if `event` made its listing stale.
    ///
    /// Returns `None` when the cached listing is still accurate. A listing
    /// whose folder was deleted comes back as `NotFound`.
    pub async fn refresh_listing(
        &self,
        current: Option<FolderId>,
        event: &DomainEvent,
    ) -> AppResult<Option<Listing>> {
        if !event.payload.touches(current) {
            return Ok(None);
        }
        self.list_children(current).await.map(Some)
    }

    /// Create an empty folder under `parent`.
    pub async fn create_folder(&self, name: &str, parent: Option<FolderId>) -> AppResult<Folder> {
        let name = validate_name(name)?;
        let folder = NewFolder {
            name,
            parent_id: parent,
        }
        .into_folder(Utc::now());

        let plan = MutationPlan::new(
            RowOp::InsertFolder(folder.clone()),
            TreeChange::Create { parent }.deltas(),
            folder.modified,
        );
        self.store.commit(plan).await?;

        info!(folder_id = %folder.id, parent_id = ?parent, name = %folder.name, "Folder created");
        self.publish(TreeEvent::Created {
            node: NodeRef::Folder(folder.id),
            parent_id: parent,
        });
        Ok(folder)
    }

    /// Register a file whose bytes are already stored at `new_file.url`.
    pub async fn create_file(&self, new_file: NewFile) -> AppResult<File> {
        let name = validate_name(&new_file.name)?;
        let parent = new_file.parent_id;
        let file = NewFile { name, ..new_file }.into_file(Utc::now());

        let plan = MutationPlan::new(
            RowOp::InsertFile(file.clone()),
            TreeChange::Create { parent }.deltas(),
            file.modified,
        );
        self.store.commit(plan).await?;

        info!(file_id = %file.id, parent_id = ?parent, name = %file.name, "File created");
        self.publish(TreeEvent::Created {
            node: NodeRef::File(file.id),
            parent_id: parent,
        });
        Ok(file)
    }

    /// Store `data` as a blob and register it as a file under `parent`.
    ///
    /// If registration fails the new blob is deleted again; a failure of
    /// that cleanup is only logged.
    pub async fn upload_file(
        &self,
        name: &str,
        data: Bytes,
        parent: Option<FolderId>,
    ) -> AppResult<File> {
        let name = validate_name(name)?;
        let size = display_size(data.len() as u64);
        let url = self.blobs.write(&name, data).await?;
        debug!(url = %url, size = %size, "Uploaded blob");

        let registered = self
            .create_file(NewFile {
                file_type: FileType::from_name(&name),
                name,
                size,
                parent_id: parent,
                url: url.clone(),
            })
            .await;

        if registered.is_err() {
            self.discard_blob(&url).await;
        }
        registered
    }

    /// Contents of a file.
    pub async fn read_file(&self, id: FileId) -> AppResult<Bytes> {
        let file = self.require_file(id).await?;
        self.blobs.read(&file.url).await
    }

    /// Change a node's name. Counters are never touched.
    pub async fn rename_node(&self, node: NodeRef, new_name: &str) -> AppResult<()> {
        let name = validate_name(new_name)?;
        let parent = self.parent_of(node).await?;

        let plan = MutationPlan::new(
            RowOp::Rename {
                node,
                name: name.clone(),
            },
            TreeChange::Rename.deltas(),
            Utc::now(),
        );
        self.store.commit(plan).await?;

        info!(node = %node, name = %name, "Node renamed");
        self.publish(TreeEvent::Renamed {
            node,
            parent_id: parent,
            name,
        });
        Ok(())
    }

    /// Re-parent a node under `new_parent` (`None` = root level).
    ///
    /// Moving a folder into itself or into one of its descendants fails with
    /// `IntegrityViolation` and changes nothing. Moving a node to the parent
    /// it already has is a no-op.
    pub async fn move_node(&self, node: NodeRef, new_parent: Option<FolderId>) -> AppResult<()> {
        let from = self.parent_of(node).await?;
        if from == new_parent {
            debug!(node = %node, "Move to current parent ignored");
            return Ok(());
        }

        match node {
            NodeRef::Folder(id) => self.query.ensure_move_target(id, new_parent).await?,
            NodeRef::File(_) => {
                if let Some(target) = new_parent {
                    self.require_folder(target).await?;
                }
            }
        }

        let plan = MutationPlan::new(
            RowOp::Move {
                node,
                from,
                to: new_parent,
            },
            TreeChange::Move {
                from,
                to: new_parent,
            }
            .deltas(),
            Utc::now(),
        );
        self.store.commit(plan).await?;

        info!(node = %node, from = ?from, to = ?new_parent, "Node moved");
        self.publish(TreeEvent::Moved {
            node,
            from_parent_id: from,
            to_parent_id: new_parent,
        });
        Ok(())
    }

    /// Delete a file, or a folder with every folder and file below it.
    ///
    /// Only the immediate parent's counter changes, by one. Blobs of removed
    /// files are deleted after the commit; failures there are logged and
    /// reported in [`Deletion::leaked_blobs`], never returned as errors.
    pub async fn delete_node(&self, node: NodeRef) -> AppResult<Deletion> {
        let (op, parent) = match node {
            NodeRef::File(id) => {
                let file = self.require_file(id).await?;
                let parent = file.parent_id;
                (RowOp::DeleteFile { id, parent }, parent)
            }
            NodeRef::Folder(id) => {
                let folder = self.require_folder(id).await?;
                let descendants = self.query.descendant_folder_ids(id).await?;
                debug!(folder_id = %id, descendants = descendants.len(), "Deleting folder subtree");
                let parent = folder.parent_id;
                (RowOp::DeleteFolder { id, parent }, parent)
            }
        };

        let plan = MutationPlan::new(op, TreeChange::Delete { parent }.deltas(), Utc::now());
        let outcome = self.store.commit(plan).await?;

        let mut leaked_blobs = Vec::new();
        for url in outcome.orphaned_blobs {
            if !self.discard_blob(&url).await {
                leaked_blobs.push(url);
            }
        }

        info!(
            node = %node,
            parent_id = ?parent,
            removed_folders = outcome.removed_folders.len(),
            removed_files = outcome.removed_files.len(),
            leaked_blobs = leaked_blobs.len(),
            "Node deleted"
        );
        self.publish(TreeEvent::Deleted {
            node,
            parent_id: parent,
            removed_folders: outcome.removed_folders.clone(),
            removed_files: outcome.removed_files.len() as u64,
        });

        Ok(Deletion {
            removed_folders: outcome.removed_folders,
            removed_files: outcome.removed_files,
            leaked_blobs,
        })
    }

    /// Folders whose cached count differs from their real child count.
    pub async fn verify_counts(&self) -> AppResult<Vec<CountMismatch>> {
        let mismatches = self.store.count_mismatches().await?;
        for m in &mismatches {
            warn!(
                folder_id = %m.folder_id,
                cached = m.cached,
                actual = m.actual,
                "Folder item count is out of sync"
            );
        }
        Ok(mismatches)
    }

    /// Rewrite every wrong counter from the real child count.
    pub async fn repair_counts(&self) -> AppResult<Vec<CountMismatch>> {
        let fixed = self.store.repair_counts().await?;
        if fixed.is_empty() {
            return Ok(fixed);
        }

        let mut parent_ids = Vec::with_capacity(fixed.len());
        for m in &fixed {
            if let Some(folder) = self.store.find_folder(m.folder_id).await? {
                parent_ids.push(folder.parent_id);
            }
        }
        info!(repaired = fixed.len(), "Folder item counts repaired");
        self.publish(TreeEvent::CountsRepaired { parent_ids });
        Ok(fixed)
    }

    /// Whether the tree holds no folders and no files.
    pub async fn is_empty(&self) -> AppResult<bool> {
        self.store.is_empty().await
    }

    async fn require_folder(&self, id: FolderId) -> AppResult<Folder> {
        self.store
            .find_folder(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
    }

    async fn require_file(&self, id: FileId) -> AppResult<File> {
        self.store
            .find_file(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    async fn parent_of(&self, node: NodeRef) -> AppResult<Option<FolderId>> {
        Ok(self.get_node(node).await?.parent_id())
    }

    /// Best-effort blob deletion. Returns whether the blob is gone.
    async fn discard_blob(&self, url: &str) -> bool {
        match self.blobs.delete(url).await {
            Ok(()) => true,
            Err(e) => {
                warn!(url, error = %e, "Blob cleanup failed, leaving orphan");
                false
            }
        }
    }

    fn publish(&self, payload: TreeEvent) {
        // Fails only when nobody is subscribed.
        let _ = self.events.send(DomainEvent::new(payload));
    }
}
