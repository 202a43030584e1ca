//! [`TreeStore`] held in process memory.
//!
//! Rows live in hash maps next to an adjacency index keyed by parent id, so
//! walks are breadth-first scans over the index instead of full-table
//! filters. A single `RwLock` write guard covers each commit: the plan is
//! validated in full before anything is touched, which makes every commit
//! all-or-nothing.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;

use filenest_core::error::AppError;
use filenest_core::result::AppResult;
use filenest_core::types::{FileId, FolderId, NodeRef};
use filenest_entity::{File, Folder};

use crate::plan::{CommitOutcome, MutationPlan, RowOp};
use crate::store::{CountMismatch, FolderLink, TreeStore};

#[derive(Debug, Default)]
struct TreeState {
    folders: HashMap<FolderId, Folder>,
    files: HashMap<FileId, File>,
    child_folders: HashMap<Option<FolderId>, BTreeSet<FolderId>>,
    child_files: HashMap<Option<FolderId>, BTreeSet<FileId>>,
}

impl TreeState {
    fn link_folder(&mut self, folder: Folder) {
        self.child_folders
            .entry(folder.parent_id)
            .or_default()
            .insert(folder.id);
        self.folders.insert(folder.id, folder);
    }

    fn link_file(&mut self, file: File) {
        self.child_files
            .entry(file.parent_id)
            .or_default()
            .insert(file.id);
        self.files.insert(file.id, file);
    }

    fn unlink_folder(&mut self, id: FolderId) -> Option<Folder> {
        let folder = self.folders.remove(&id)?;
        if let Some(siblings) = self.child_folders.get_mut(&folder.parent_id) {
            siblings.remove(&id);
        }
        Some(folder)
    }

    fn unlink_file(&mut self, id: FileId) -> Option<File> {
        let file = self.files.remove(&id)?;
        if let Some(siblings) = self.child_files.get_mut(&file.parent_id) {
            siblings.remove(&id);
        }
        Some(file)
    }

    fn folder_ids_under(&self, parent: Option<FolderId>) -> impl Iterator<Item = FolderId> + '_ {
        self.child_folders
            .get(&parent)
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }

    fn file_ids_under(&self, parent: Option<FolderId>) -> impl Iterator<Item = FileId> + '_ {
        self.child_files
            .get(&parent)
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }

    fn actual_items(&self, id: FolderId) -> i64 {
        (self.folder_ids_under(Some(id)).count() + self.file_ids_under(Some(id)).count()) as i64
    }

    fn parent_of(&self, node: NodeRef) -> Option<Option<FolderId>> {
        match node {
            NodeRef::Folder(id) => self.folders.get(&id).map(|f| f.parent_id),
            NodeRef::File(id) => self.files.get(&id).map(|f| f.parent_id),
        }
    }

    fn require_parent(&self, parent: Option<FolderId>) -> AppResult<()> {
        match parent {
            Some(id) if !self.folders.contains_key(&id) => {
                Err(AppError::not_found(format!("Folder {id} not found")))
            }
            _ => Ok(()),
        }
    }

    fn require_unchanged(&self, node: NodeRef, expected: Option<FolderId>) -> AppResult<()> {
        match self.parent_of(node) {
            Some(parent) if parent == expected => Ok(()),
            _ => Err(AppError::conflict(format!(
                "{node} changed or was removed concurrently"
            ))),
        }
    }

    /// Whether `candidate` is `id` or sits anywhere below it.
    fn is_within(&self, candidate: FolderId, id: FolderId, max_depth: u32) -> bool {
        let mut current = Some(candidate);
        let mut steps = 0;
        while let Some(folder_id) = current {
            if folder_id == id {
                return true;
            }
            if steps > max_depth {
                return false;
            }
            steps += 1;
            current = self.folders.get(&folder_id).and_then(|f| f.parent_id);
        }
        false
    }

    /// Whether some folder sits more than `max_depth` levels below `id`.
    fn subtree_deeper_than(&self, id: FolderId, max_depth: u32) -> bool {
        let mut seen = HashSet::from([id]);
        let mut frontier = vec![id];
        for _ in 0..max_depth {
            frontier = frontier
                .into_iter()
                .flat_map(|parent| self.folder_ids_under(Some(parent)))
                .filter(|child| seen.insert(*child))
                .collect();
            if frontier.is_empty() {
                return false;
            }
        }
        frontier
            .iter()
            .any(|parent| self.folder_ids_under(Some(*parent)).any(|c| !seen.contains(&c)))
    }

    /// The folder and everything below it, visiting each folder once.
    fn subtree(&self, id: FolderId) -> Vec<FolderId> {
        let mut seen = HashSet::from([id]);
        let mut order = vec![id];
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for child in self.folder_ids_under(Some(current)) {
                if seen.insert(child) {
                    order.push(child);
                    queue.push_back(child);
                }
            }
        }
        order
    }

    fn mismatches(&self) -> Vec<CountMismatch> {
        let mut found: Vec<CountMismatch> = self
            .folders
            .values()
            .filter_map(|folder| {
                let actual = self.actual_items(folder.id);
                (i64::from(folder.items) != actual).then(|| CountMismatch {
                    folder_id: folder.id,
                    name: folder.name.clone(),
                    cached: folder.items,
                    actual,
                })
            })
            .collect();
        found.sort_by_key(|m| m.folder_id);
        found
    }
}

/// In-memory tree store.
#[derive(Debug)]
pub struct MemoryTreeStore {
    state: RwLock<TreeState>,
    /// Bound on walks performed inside a commit.
    max_depth: u32,
}

impl MemoryTreeStore {
    pub fn new(max_depth: u32) -> Self {
        Self {
            state: RwLock::new(TreeState::default()),
            max_depth,
        }
    }

    /// Load rows as-is, without checking counts or the parent relation.
    ///
    /// Used to stage fixtures, including deliberately corrupted trees.
    pub fn from_rows(
        max_depth: u32,
        folders: impl IntoIterator<Item = Folder>,
        files: impl IntoIterator<Item = File>,
    ) -> Self {
        let mut state = TreeState::default();
        for folder in folders {
            state.link_folder(folder);
        }
        for file in files {
            state.link_file(file);
        }
        Self {
            state: RwLock::new(state),
            max_depth,
        }
    }

    /// Reject the plan if any part of it would fail.
    fn validate(&self, state: &TreeState, plan: &MutationPlan) -> AppResult<()> {
        match &plan.op {
            RowOp::InsertFolder(folder) => {
                state.require_parent(folder.parent_id)?;
                if state.folders.contains_key(&folder.id) {
                    return Err(AppError::conflict(format!(
                        "Folder {} already exists",
                        folder.id
                    )));
                }
            }
            RowOp::InsertFile(file) => {
                state.require_parent(file.parent_id)?;
                if state.files.contains_key(&file.id) {
                    return Err(AppError::conflict(format!("File {} already exists", file.id)));
                }
            }
            RowOp::Rename { node, .. } => {
                if state.parent_of(*node).is_none() {
                    return Err(AppError::conflict(format!(
                        "{node} changed or was removed concurrently"
                    )));
                }
            }
            RowOp::Move { node, from, to } => {
                state.require_unchanged(*node, *from)?;
                state.require_parent(*to)?;
                if let (NodeRef::Folder(id), Some(target)) = (node, to)
                    && state.is_within(*target, *id, self.max_depth)
                {
                    return Err(AppError::integrity(format!(
                        "Cannot move folder {id} into itself or one of its descendants"
                    )));
                }
            }
            RowOp::DeleteFile { id, parent } => {
                state.require_unchanged(NodeRef::File(*id), *parent)?;
            }
            RowOp::DeleteFolder { id, parent } => {
                state.require_unchanged(NodeRef::Folder(*id), *parent)?;
                if state.subtree_deeper_than(*id, self.max_depth) {
                    return Err(AppError::integrity(format!(
                        "Subtree of folder {id} is deeper than {} levels",
                        self.max_depth
                    )));
                }
            }
        }

        for delta in plan.deltas() {
            let folder = state.folders.get(&delta.folder_id).ok_or_else(|| {
                AppError::not_found(format!("Folder {} not found", delta.folder_id))
            })?;
            if folder.items + delta.delta < 0 {
                return Err(AppError::integrity(format!(
                    "Item count of folder {} would become negative",
                    delta.folder_id
                )));
            }
        }
        Ok(())
    }

    fn apply(state: &mut TreeState, plan: MutationPlan) -> CommitOutcome {
        let mut outcome = CommitOutcome::default();
        let deltas = plan.deltas().to_vec();

        match plan.op {
            RowOp::InsertFolder(folder) => state.link_folder(folder),
            RowOp::InsertFile(file) => state.link_file(file),
            RowOp::Rename { node, name } => match node {
                NodeRef::Folder(id) => {
                    if let Some(folder) = state.folders.get_mut(&id) {
                        folder.name = name;
                        folder.modified = plan.at;
                    }
                }
                NodeRef::File(id) => {
                    if let Some(file) = state.files.get_mut(&id) {
                        file.name = name;
                        file.modified = plan.at;
                    }
                }
            },
            RowOp::Move { node, to, .. } => match node {
                NodeRef::Folder(id) => {
                    if let Some(mut folder) = state.unlink_folder(id) {
                        folder.parent_id = to;
                        folder.modified = plan.at;
                        state.link_folder(folder);
                    }
                }
                NodeRef::File(id) => {
                    if let Some(mut file) = state.unlink_file(id) {
                        file.parent_id = to;
                        file.modified = plan.at;
                        state.link_file(file);
                    }
                }
            },
            RowOp::DeleteFile { id, .. } => {
                if let Some(file) = state.unlink_file(id) {
                    outcome.removed_files.push(id);
                    outcome.orphaned_blobs.push(file.url);
                }
            }
            RowOp::DeleteFolder { id, .. } => {
                for folder_id in state.subtree(id) {
                    let files: Vec<FileId> = state.file_ids_under(Some(folder_id)).collect();
                    for file_id in files {
                        if let Some(file) = state.unlink_file(file_id) {
                            outcome.removed_files.push(file_id);
                            outcome.orphaned_blobs.push(file.url);
                        }
                    }
                    state.unlink_folder(folder_id);
                    state.child_folders.remove(&Some(folder_id));
                    state.child_files.remove(&Some(folder_id));
                    outcome.removed_folders.push(folder_id);
                }
            }
        }

        for delta in deltas {
            if let Some(folder) = state.folders.get_mut(&delta.folder_id) {
                folder.items += delta.delta;
            }
        }

        outcome
    }
}

#[async_trait]
impl TreeStore for MemoryTreeStore {
    async fn find_folder(&self, id: FolderId) -> AppResult<Option<Folder>> {
        Ok(self.state.read().await.folders.get(&id).cloned())
    }

    async fn find_file(&self, id: FileId) -> AppResult<Option<File>> {
        Ok(self.state.read().await.files.get(&id).cloned())
    }

    async fn child_folders(&self, parent: Option<FolderId>) -> AppResult<Vec<Folder>> {
        let state = self.state.read().await;
        let mut folders: Vec<Folder> = state
            .folder_ids_under(parent)
            .filter_map(|id| state.folders.get(&id).cloned())
            .collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(folders)
    }

    async fn child_files(&self, parent: Option<FolderId>) -> AppResult<Vec<File>> {
        let state = self.state.read().await;
        let mut files: Vec<File> = state
            .file_ids_under(parent)
            .filter_map(|id| state.files.get(&id).cloned())
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(files)
    }

    async fn ancestor_rows(&self, id: FolderId, limit: u32) -> AppResult<Vec<Folder>> {
        let state = self.state.read().await;
        let mut rows = Vec::new();
        let mut current = Some(id);
        while let Some(folder_id) = current {
            if rows.len() >= limit as usize {
                break;
            }
            let Some(folder) = state.folders.get(&folder_id) else {
                break;
            };
            current = folder.parent_id;
            rows.push(folder.clone());
        }
        Ok(rows)
    }

    async fn descendant_links(&self, id: FolderId, limit: u32) -> AppResult<Vec<FolderLink>> {
        let state = self.state.read().await;
        let mut links = Vec::new();
        let mut frontier = vec![id];
        for depth in 1..=limit {
            let mut next = Vec::new();
            for parent_id in frontier {
                for child in state.folder_ids_under(Some(parent_id)) {
                    links.push(FolderLink {
                        id: child,
                        parent_id,
                        depth: i32::try_from(depth).unwrap_or(i32::MAX),
                    });
                    next.push(child);
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        Ok(links)
    }

    async fn commit(&self, plan: MutationPlan) -> AppResult<CommitOutcome> {
        let mut state = self.state.write().await;
        self.validate(&state, &plan)?;
        Ok(Self::apply(&mut state, plan))
    }

    async fn count_mismatches(&self) -> AppResult<Vec<CountMismatch>> {
        Ok(self.state.read().await.mismatches())
    }

    async fn repair_counts(&self) -> AppResult<Vec<CountMismatch>> {
        let mut state = self.state.write().await;
        let fixes = state.mismatches();
        for fix in &fixes {
            if let Some(folder) = state.folders.get_mut(&fix.folder_id) {
                folder.items = i32::try_from(fix.actual).unwrap_or(i32::MAX);
            }
        }
        Ok(fixes)
    }

    async fn is_empty(&self) -> AppResult<bool> {
        let state = self.state.read().await;
        Ok(state.folders.is_empty() && state.files.is_empty())
    }
}
