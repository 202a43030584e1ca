//! End-to-end folder tree behaviour over the in-memory stores.

mod helpers;

use chrono::Utc;

use filenest_core::error::ErrorKind;
use filenest_core::events::TreeEvent;
use filenest_core::traits::BlobStore;
use filenest_core::types::{FolderId, NodeRef};
use filenest_database::TreeStore;
use filenest_entity::{FileType, NewFile, NewFolder};

use helpers::TestApp;

/// Root with empty folders A and B.
async fn two_folders() -> (TestApp, FolderId, FolderId) {
    let app = TestApp::new();
    let a = app.mkdir("A", None).await;
    let b = app.mkdir("B", None).await;
    (app, a, b)
}

#[tokio::test]
async fn test_create_file_increments_only_its_parent() {
    let (app, a, b) = two_folders().await;

    app.upload("x.txt", Some(a)).await;

    assert_eq!(app.items(a).await, 1);
    assert_eq!(app.items(b).await, 0);
    app.assert_counts_consistent().await;
}

#[tokio::test]
async fn test_create_subfolder_counts_as_one_child() {
    let (app, a, _) = two_folders().await;
    app.upload("x.txt", Some(a)).await;

    let c = app.mkdir("C", Some(a)).await;

    assert_eq!(app.items(a).await, 2);
    assert_eq!(app.items(c).await, 0);
}

#[tokio::test]
async fn test_move_file_between_folders() {
    let (app, a, b) = two_folders().await;
    let x = app.upload("x.txt", Some(a)).await;
    app.mkdir("C", Some(a)).await;

    app.service
        .move_node(NodeRef::File(x), Some(b))
        .await
        .expect("move");

    assert_eq!(app.items(a).await, 1);
    assert_eq!(app.items(b).await, 1);
    let moved = app.service.get_node(NodeRef::File(x)).await.unwrap();
    assert_eq!(moved.parent_id(), Some(b));
}

#[tokio::test]
async fn test_delete_empty_subfolder() {
    let (app, a, _) = two_folders().await;
    let c = app.mkdir("C", Some(a)).await;

    app.service.delete_node(NodeRef::Folder(c)).await.expect("delete");

    assert_eq!(app.items(a).await, 0);
    assert!(!app.folder_exists(c).await);
}

#[tokio::test]
async fn test_delete_folder_with_file_decrements_parent_by_one() {
    let (app, a, _) = two_folders().await;
    let d = app.mkdir("D", Some(a)).await;
    let y = app.upload("y.txt", Some(d)).await;
    let y_url = app.store.find_file(y).await.unwrap().unwrap().url;
    assert_eq!(app.items(a).await, 1);
    assert_eq!(app.items(d).await, 1);

    let deletion = app.service.delete_node(NodeRef::Folder(d)).await.unwrap();

    assert_eq!(app.items(a).await, 0);
    assert_eq!(deletion.removed_folders, vec![d]);
    assert_eq!(deletion.removed_files, vec![y]);
    assert!(deletion.leaked_blobs.is_empty());
    assert!(!app.file_exists(y).await);
    assert!(!app.blobs.exists(&y_url).await.unwrap());
    app.assert_counts_consistent().await;
}

#[tokio::test]
async fn test_delete_deep_subtree_touches_only_immediate_parent() {
    let app = TestApp::new();
    let top = app.mkdir("top", None).await;
    let a = app.mkdir("A", Some(top)).await;
    app.upload("keep.txt", Some(top)).await;
    let f = app.mkdir("F", Some(a)).await;
    let g = app.mkdir("G", Some(f)).await;
    let h = app.mkdir("H", Some(g)).await;
    for i in 0..5 {
        app.upload(&format!("{i}.log"), Some(h)).await;
    }
    app.upload("f.txt", Some(f)).await;
    assert_eq!(app.items(a).await, 1);

    let deletion = app.service.delete_node(NodeRef::Folder(f)).await.unwrap();

    assert_eq!(app.items(a).await, 0);
    assert_eq!(app.items(top).await, 2);
    assert_eq!(deletion.removed_folders.len(), 3);
    assert_eq!(deletion.removed_files.len(), 6);
    assert!(app.blobs.len().await == 1);
    app.assert_counts_consistent().await;
}

#[tokio::test]
async fn test_move_into_self_or_descendant_is_rejected() {
    let (app, a, b) = two_folders().await;
    let c = app.mkdir("C", Some(a)).await;
    let e = app.mkdir("E", Some(c)).await;
    app.upload("x.txt", Some(b)).await;

    for target in [a, c, e] {
        let err = app
            .service
            .move_node(NodeRef::Folder(a), Some(target))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::IntegrityViolation);
    }

    assert_eq!(app.items(a).await, 1);
    assert_eq!(app.items(b).await, 1);
    assert_eq!(app.items(c).await, 1);
    assert_eq!(app.items(e).await, 0);
    app.assert_counts_consistent().await;
}

#[tokio::test]
async fn test_moving_a_full_folder_shifts_one_item() {
    let (app, a, b) = two_folders().await;
    let c = app.mkdir("C", Some(a)).await;
    for name in ["1.txt", "2.txt", "3.txt"] {
        app.upload(name, Some(c)).await;
    }

    app.service
        .move_node(NodeRef::Folder(c), Some(b))
        .await
        .unwrap();

    assert_eq!(app.items(a).await, 0);
    assert_eq!(app.items(b).await, 1);
    assert_eq!(app.items(c).await, 3);

    app.service.move_node(NodeRef::Folder(c), None).await.unwrap();
    assert_eq!(app.items(b).await, 0);
    app.assert_counts_consistent().await;
}

#[tokio::test]
async fn test_rename_never_changes_counts() {
    let (app, a, _) = two_folders().await;
    let x = app.upload("x.txt", Some(a)).await;

    app.service
        .rename_node(NodeRef::File(x), "renamed.txt")
        .await
        .unwrap();
    app.service
        .rename_node(NodeRef::Folder(a), "Renamed A")
        .await
        .unwrap();

    assert_eq!(app.items(a).await, 1);
    let listing = app.service.list_children(None).await.unwrap();
    assert_eq!(listing.folders[1].name, "Renamed A");
    let inner = app.service.list_children(Some(a)).await.unwrap();
    assert_eq!(inner.files[0].name, "renamed.txt");
}

#[tokio::test]
async fn test_create_then_delete_restores_counts() {
    let (app, a, _) = two_folders().await;
    let c = app.mkdir("C", Some(a)).await;
    let before = (app.items(a).await, app.items(c).await);

    let x = app.upload("x.txt", Some(c)).await;
    app.service.delete_node(NodeRef::File(x)).await.unwrap();
    let d = app.mkdir("D", Some(c)).await;
    app.service.delete_node(NodeRef::Folder(d)).await.unwrap();

    assert_eq!((app.items(a).await, app.items(c).await), before);
    assert!(app.blobs.is_empty().await);
}

#[tokio::test]
async fn test_deleting_last_child_reaches_exactly_zero() {
    let (app, a, _) = two_folders().await;
    let x = app.upload("x.txt", Some(a)).await;

    app.service.delete_node(NodeRef::File(x)).await.unwrap();
    assert_eq!(app.items(a).await, 0);

    let err = app.service.delete_node(NodeRef::File(x)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(app.items(a).await, 0);
}

#[tokio::test]
async fn test_missing_nodes_and_parents_are_not_found() {
    let (app, a, _) = two_folders().await;
    let ghost = FolderId::new();

    let err = app.service.create_folder("C", Some(ghost)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = app
        .service
        .move_node(NodeRef::Folder(a), Some(ghost))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = app
        .service
        .rename_node(NodeRef::Folder(ghost), "x")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = app.service.list_children(Some(ghost)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(app.service.ancestor_chain(Some(ghost)).await.unwrap().is_empty());
    app.assert_counts_consistent().await;
}

#[tokio::test]
async fn test_invalid_names_are_rejected_before_any_write() {
    let (app, a, _) = two_folders().await;

    let err = app.service.create_folder("  ", Some(a)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    let err = app
        .service
        .upload_file("a/b.txt", "x".into(), Some(a))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    assert_eq!(app.items(a).await, 0);
    assert!(app.blobs.is_empty().await);
}

#[tokio::test]
async fn test_listing_is_folders_first_sorted_by_name() {
    let app = TestApp::new();
    app.upload("b.txt", None).await;
    app.mkdir("Zeta", None).await;
    app.upload("a.pdf", None).await;
    app.mkdir("Alpha", None).await;

    let names: Vec<String> = app
        .service
        .list_children(None)
        .await
        .unwrap()
        .into_nodes()
        .iter()
        .map(|n| n.name().to_string())
        .collect();

    assert_eq!(names, vec!["Alpha", "Zeta", "a.pdf", "b.txt"]);
}

#[tokio::test]
async fn test_breadcrumbs_run_root_to_folder() {
    let app = TestApp::new();
    let docs = app.mkdir("Documents", None).await;
    let archived = app.mkdir("Archived", Some(docs)).await;
    let y2023 = app.mkdir("2023", Some(archived)).await;

    let names: Vec<String> = app
        .service
        .ancestor_chain(Some(y2023))
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();

    assert_eq!(names, vec!["Documents", "Archived", "2023"]);
    assert!(app.service.ancestor_chain(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_and_read_back() {
    let app = TestApp::new();
    let file = app
        .service
        .upload_file("Annual Report.pdf", "%PDF-1.7".into(), None)
        .await
        .unwrap();

    assert_eq!(file.file_type, FileType::Pdf);
    assert_eq!(file.size, "8 B");
    assert!(file.url.starts_with("/uploads/"));
    assert_eq!(
        app.service.read_file(file.id).await.unwrap(),
        bytes::Bytes::from("%PDF-1.7")
    );
}

#[tokio::test]
async fn test_failed_registration_discards_the_blob() {
    let app = TestApp::new();
    let err = app
        .service
        .upload_file("x.txt", "x".into(), Some(FolderId::new()))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(app.blobs.is_empty().await);
}

#[tokio::test]
async fn test_blob_cleanup_failure_does_not_fail_delete() {
    let (app, a, _) = two_folders().await;
    let x = app.upload("x.txt", Some(a)).await;
    let url = app.store.find_file(x).await.unwrap().unwrap().url;
    app.blobs.fail_deletes(true);

    let deletion = app.service.delete_node(NodeRef::File(x)).await.unwrap();

    assert_eq!(deletion.leaked_blobs, vec![url.clone()]);
    assert!(!app.file_exists(x).await);
    assert_eq!(app.items(a).await, 0);
    assert!(app.blobs.exists(&url).await.unwrap());
}

#[tokio::test]
async fn test_create_file_registers_existing_blob() {
    let (app, a, _) = two_folders().await;
    let file = app
        .service
        .create_file(NewFile {
            name: "budget.xlsx".to_string(),
            file_type: FileType::Sheet,
            size: "12 KB".to_string(),
            parent_id: Some(a),
            url: "/uploads/budget.xlsx".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(file.parent_id, Some(a));
    assert_eq!(app.items(a).await, 1);
}

#[tokio::test]
async fn test_corrupted_cycle_blocks_delete_and_breadcrumbs() {
    let mut a = NewFolder {
        name: "A".to_string(),
        parent_id: None,
    }
    .into_folder(Utc::now());
    let b = NewFolder {
        name: "B".to_string(),
        parent_id: Some(a.id),
    }
    .into_folder(Utc::now());
    a.parent_id = Some(b.id);
    a.items = 1;
    let (a_id, b_id) = (a.id, b.id);
    let app = TestApp::with_rows(vec![a, b], vec![]);

    let err = app.service.ancestor_chain(Some(b_id)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::IntegrityViolation);

    let err = app
        .service
        .delete_node(NodeRef::Folder(a_id))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::IntegrityViolation);
    assert!(app.folder_exists(a_id).await);
    assert!(app.folder_exists(b_id).await);
}

#[tokio::test]
async fn test_audit_and_repair_fix_drifted_counts() {
    let mut docs = NewFolder {
        name: "Documents".to_string(),
        parent_id: None,
    }
    .into_folder(Utc::now());
    let archived = NewFolder {
        name: "Archived".to_string(),
        parent_id: Some(docs.id),
    }
    .into_folder(Utc::now());
    docs.items = 5;
    let docs_id = docs.id;
    let app = TestApp::with_rows(vec![docs, archived], vec![]);
    let mut events = app.service.subscribe();

    let found = app.service.verify_counts().await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].folder_id, docs_id);
    assert_eq!((found[0].cached, found[0].actual), (5, 1));

    let fixed = app.service.repair_counts().await.unwrap();
    assert_eq!(fixed, found);
    assert_eq!(app.items(docs_id).await, 1);
    app.assert_counts_consistent().await;

    let event = events.recv().await.unwrap();
    assert_eq!(
        event.payload,
        TreeEvent::CountsRepaired {
            parent_ids: vec![None]
        }
    );
}

#[tokio::test]
async fn test_refresh_listing_only_when_touched() {
    let (app, a, b) = two_folders().await;
    let mut events = app.service.subscribe();

    app.upload("x.txt", Some(a)).await;
    let event = events.recv().await.unwrap();

    let refreshed = app.service.refresh_listing(Some(a), &event).await.unwrap();
    assert_eq!(refreshed.expect("listing of A is stale").files.len(), 1);
    assert!(
        app.service
            .refresh_listing(Some(b), &event)
            .await
            .unwrap()
            .is_none()
    );
    assert!(app.service.refresh_listing(None, &event).await.unwrap().is_none());
}

#[tokio::test]
async fn test_deleting_a_folder_invalidates_listings_inside_it() {
    let (app, a, b) = two_folders().await;
    let d = app.mkdir("D", Some(a)).await;
    let e = app.mkdir("E", Some(d)).await;
    let f = app.mkdir("F", Some(e)).await;
    let mut events = app.service.subscribe();

    app.service.delete_node(NodeRef::Folder(d)).await.unwrap();
    let event = events.recv().await.unwrap();

    for gone in [d, e, f] {
        let err = app
            .service
            .refresh_listing(Some(gone), &event)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
    let parent = app.service.refresh_listing(Some(a), &event).await.unwrap();
    assert!(parent.expect("listing of A is stale").is_empty());
    assert!(app.service.refresh_listing(Some(b), &event).await.unwrap().is_none());
}
