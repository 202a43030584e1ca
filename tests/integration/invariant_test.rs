//! Long mixed mutation sequences keep every cached count exact.

mod helpers;

use filenest_core::error::ErrorKind;
use filenest_core::types::{FileId, FolderId, NodeRef};

use helpers::TestApp;

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }

    fn parent(&mut self, folders: &[FolderId]) -> Option<FolderId> {
        let i = self.below(folders.len() + 1);
        folders.get(i).copied()
    }
}

async fn run_sequence(seed: u64, steps: usize) {
    let app = TestApp::new();
    let mut rng = Lcg(seed);
    let mut folders: Vec<FolderId> = Vec::new();
    let mut files: Vec<FileId> = Vec::new();

    for step in 0..steps {
        match rng.below(7) {
            0 | 1 => {
                let parent = rng.parent(&folders);
                folders.push(app.mkdir(&format!("dir-{step}"), parent).await);
            }
            2 | 3 => {
                let parent = rng.parent(&folders);
                files.push(app.upload(&format!("file-{step}.txt"), parent).await);
            }
            4 if !files.is_empty() => {
                let file = files[rng.below(files.len())];
                let target = rng.parent(&folders);
                app.service
                    .move_node(NodeRef::File(file), target)
                    .await
                    .expect("file moves always succeed");
            }
            5 if !folders.is_empty() => {
                let folder = folders[rng.below(folders.len())];
                let target = rng.parent(&folders);
                if let Err(e) = app.service.move_node(NodeRef::Folder(folder), target).await {
                    assert_eq!(e.kind, ErrorKind::IntegrityViolation, "step {step}: {e}");
                }
            }
            6 if !folders.is_empty() => {
                let folder = folders[rng.below(folders.len())];
                app.service
                    .delete_node(NodeRef::Folder(folder))
                    .await
                    .expect("delete folder");
                // Drop everything the subtree took with it.
                let mut live = Vec::new();
                for id in folders {
                    if app.folder_exists(id).await {
                        live.push(id);
                    }
                }
                folders = live;
                let mut live = Vec::new();
                for id in files {
                    if app.file_exists(id).await {
                        live.push(id);
                    }
                }
                files = live;
            }
            _ if !files.is_empty() => {
                let file = files.swap_remove(rng.below(files.len()));
                app.service
                    .delete_node(NodeRef::File(file))
                    .await
                    .expect("delete file");
            }
            _ => {}
        }

        app.assert_counts_consistent().await;
    }

    // Every folder in the final tree still reaches the root.
    for id in &folders {
        let chain = app.service.ancestor_chain(Some(*id)).await.expect("chain");
        assert_eq!(chain.last().map(|f| f.id), Some(*id));
        assert_eq!(chain[0].parent_id, None);
    }
    assert_eq!(app.blobs.len().await, files.len());
}

#[tokio::test]
async fn test_mixed_sequence_seed_1() {
    run_sequence(1, 300).await;
}

#[tokio::test]
async fn test_mixed_sequence_seed_42() {
    run_sequence(42, 300).await;
}

#[tokio::test]
async fn test_mixed_sequence_seed_2024() {
    run_sequence(2024, 500).await;
}

#[tokio::test]
async fn test_moves_never_create_cycles() {
    let app = TestApp::new();
    let mut rng = Lcg(7);
    let mut folders = Vec::new();
    for i in 0..20 {
        let parent = rng.parent(&folders);
        folders.push(app.mkdir(&format!("f{i}"), parent).await);
    }

    for _ in 0..200 {
        let folder = folders[rng.below(folders.len())];
        let target = rng.parent(&folders);
        let _ = app.service.move_node(NodeRef::Folder(folder), target).await;
    }

    for id in &folders {
        app.service
            .ancestor_chain(Some(*id))
            .await
            .expect("no folder is its own ancestor");
        let below = app.service.query().descendant_folder_ids(*id).await.unwrap();
        assert!(!below.contains(id));
    }
    app.assert_counts_consistent().await;
}
