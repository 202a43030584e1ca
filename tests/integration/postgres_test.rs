//! Tree behaviour against PostgreSQL.
//!
//! Set `DATABASE_URL` to a scratch database to run these; without it every
//! test returns early. The tables are truncated at the start of each test.

mod helpers;

use chrono::Utc;
use futures::future::join_all;

use filenest_core::error::ErrorKind;
use filenest_core::traits::BlobStore;
use filenest_core::types::{FolderId, NodeRef};
use filenest_database::{CountDelta, MutationPlan, RowOp, TreeStore};
use filenest_entity::NewFolder;

use helpers::TestApp;

#[tokio::test]
async fn test_pg_create_file_increments_only_its_parent() {
    let Some(app) = TestApp::postgres().await else {
        return;
    };
    let a = app.mkdir("A", None).await;
    let b = app.mkdir("B", None).await;

    app.upload("x.txt", Some(a)).await;
    let c = app.mkdir("C", Some(a)).await;

    assert_eq!(app.items(a).await, 2);
    assert_eq!(app.items(b).await, 0);
    assert_eq!(app.items(c).await, 0);
    app.assert_counts_consistent().await;
}

#[tokio::test]
async fn test_pg_move_file_between_folders() {
    let Some(app) = TestApp::postgres().await else {
        return;
    };
    let a = app.mkdir("A", None).await;
    let b = app.mkdir("B", None).await;
    let x = app.upload("x.txt", Some(a)).await;

    app.service
        .move_node(NodeRef::File(x), Some(b))
        .await
        .unwrap();

    assert_eq!(app.items(a).await, 0);
    assert_eq!(app.items(b).await, 1);
    let moved = app.store.find_file(x).await.unwrap().unwrap();
    assert_eq!(moved.parent_id, Some(b));
}

#[tokio::test]
async fn test_pg_delete_subtree_returns_every_blob() {
    let Some(app) = TestApp::postgres().await else {
        return;
    };
    let a = app.mkdir("A", None).await;
    let c = app.mkdir("C", Some(a)).await;
    let d = app.mkdir("D", Some(a)).await;
    let e = app.mkdir("E", Some(d)).await;
    let y = app.upload("y.txt", Some(d)).await;
    let z = app.upload("z.txt", Some(e)).await;
    let z_url = app.store.find_file(z).await.unwrap().unwrap().url;

    app.service.delete_node(NodeRef::Folder(c)).await.unwrap();
    assert_eq!(app.items(a).await, 1);

    let deletion = app.service.delete_node(NodeRef::Folder(d)).await.unwrap();

    assert_eq!(app.items(a).await, 0);
    assert_eq!(deletion.removed_folders, vec![d, e]);
    let mut removed = deletion.removed_files.clone();
    removed.sort();
    let mut expected = vec![y, z];
    expected.sort();
    assert_eq!(removed, expected);
    assert!(deletion.leaked_blobs.is_empty());
    assert!(!app.blobs.exists(&z_url).await.unwrap());
    assert!(!app.folder_exists(e).await);
    app.assert_counts_consistent().await;
}

#[tokio::test]
async fn test_pg_move_into_descendant_is_rejected() {
    let Some(app) = TestApp::postgres().await else {
        return;
    };
    let a = app.mkdir("A", None).await;
    let c = app.mkdir("C", Some(a)).await;
    let e = app.mkdir("E", Some(c)).await;

    for target in [a, c, e] {
        let err = app
            .service
            .move_node(NodeRef::Folder(a), Some(target))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::IntegrityViolation);
    }

    assert_eq!(app.items(a).await, 1);
    assert_eq!(app.items(c).await, 1);
    assert_eq!(app.service.ancestor_chain(Some(e)).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_pg_store_refuses_cycle_without_service_check() {
    let Some(app) = TestApp::postgres().await else {
        return;
    };
    let a = app.mkdir("A", None).await;
    let b = app.mkdir("B", Some(a)).await;

    let err = app
        .store
        .commit(MutationPlan::new(
            RowOp::Move {
                node: NodeRef::Folder(a),
                from: None,
                to: Some(b),
            },
            [
                CountDelta {
                    folder_id: b,
                    delta: 1,
                },
            ],
            Utc::now(),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::IntegrityViolation);
    assert_eq!(app.store.find_folder(a).await.unwrap().unwrap().parent_id, None);
    assert_eq!(app.items(b).await, 0);
}

#[tokio::test]
async fn test_pg_constraint_violations_map_to_domain_errors() {
    let Some(app) = TestApp::postgres().await else {
        return;
    };
    let a = app.mkdir("A", None).await;

    let err = app.service.create_folder("C", Some(FolderId::new())).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    // The check constraint rejects the decrement; the insert rolls back too.
    let orphan = NewFolder {
        name: "orphan".to_string(),
        parent_id: None,
    }
    .into_folder(Utc::now());
    let orphan_id = orphan.id;
    let err = app
        .store
        .commit(MutationPlan::new(
            RowOp::InsertFolder(orphan),
            [
                CountDelta {
                    folder_id: a,
                    delta: -1,
                },
            ],
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::IntegrityViolation);
    assert!(!app.folder_exists(orphan_id).await);
    assert_eq!(app.items(a).await, 0);
}

#[tokio::test]
async fn test_pg_stale_move_is_a_conflict() {
    let Some(app) = TestApp::postgres().await else {
        return;
    };
    let a = app.mkdir("A", None).await;
    let b = app.mkdir("B", None).await;
    let x = app.upload("x.txt", Some(a)).await;
    app.service
        .move_node(NodeRef::File(x), Some(b))
        .await
        .unwrap();

    let err = app
        .store
        .commit(MutationPlan::new(
            RowOp::Move {
                node: NodeRef::File(x),
                from: Some(a),
                to: None,
            },
            [CountDelta {
                folder_id: a,
                delta: -1,
            }],
            Utc::now(),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Conflict);
    assert!(err.is_retryable());
    assert_eq!(app.items(b).await, 1);
    app.assert_counts_consistent().await;
}

#[tokio::test]
async fn test_pg_repair_rewrites_drifted_counts() {
    let Some(app) = TestApp::postgres().await else {
        return;
    };
    let docs = app.mkdir("Documents", None).await;
    app.mkdir("Archived", Some(docs)).await;
    let pool = app.pool.clone().expect("postgres app has a pool");
    sqlx::query("UPDATE folders SET items = 5 WHERE id = $1")
        .bind(docs)
        .execute(&pool)
        .await
        .unwrap();

    let found = app.service.verify_counts().await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].folder_id, docs);
    assert_eq!((found[0].cached, found[0].actual), (5, 1));

    let fixed = app.service.repair_counts().await.unwrap();
    assert_eq!(fixed.len(), 1);
    assert_eq!(app.items(docs).await, 1);
    app.assert_counts_consistent().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pg_concurrent_creates_under_one_parent() {
    let Some(app) = TestApp::postgres().await else {
        return;
    };
    let shared = app.mkdir("Shared", None).await;

    let tasks = (0..40).map(|i| {
        let service = app.service.clone();
        tokio::spawn(async move {
            if i % 2 == 0 {
                service
                    .create_folder(&format!("dir-{i}"), Some(shared))
                    .await
                    .map(|_| ())
            } else {
                service
                    .upload_file(&format!("file-{i}.txt"), "x".into(), Some(shared))
                    .await
                    .map(|_| ())
            }
        })
    });
    for result in join_all(tasks).await {
        result.expect("task panicked").expect("create");
    }

    assert_eq!(app.items(shared).await, 40);
    app.assert_counts_consistent().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pg_crossing_folder_moves_leave_no_cycle() {
    let Some(app) = TestApp::postgres().await else {
        return;
    };
    let a = app.mkdir("A", None).await;
    let b = app.mkdir("B", None).await;

    for _ in 0..10 {
        let first = {
            let service = app.service.clone();
            tokio::spawn(async move { service.move_node(NodeRef::Folder(a), Some(b)).await })
        };
        let second = {
            let service = app.service.clone();
            tokio::spawn(async move { service.move_node(NodeRef::Folder(b), Some(a)).await })
        };
        let (first, second) = tokio::join!(first, second);
        for result in [first, second] {
            if let Err(e) = result.expect("task panicked") {
                assert!(
                    matches!(e.kind, ErrorKind::IntegrityViolation | ErrorKind::Conflict),
                    "unexpected error: {e}"
                );
            }
        }

        app.service.ancestor_chain(Some(a)).await.expect("A chain");
        app.service.ancestor_chain(Some(b)).await.expect("B chain");
        app.assert_counts_consistent().await;

        app.service.move_node(NodeRef::Folder(a), None).await.unwrap();
        app.service.move_node(NodeRef::Folder(b), None).await.unwrap();
    }
}

#[tokio::test]
async fn test_pg_delete_refuses_subtree_past_depth_bound() {
    let Some(app) = TestApp::postgres().await else {
        return;
    };
    let top = app.mkdir("top", None).await;
    let mut deepest = top;
    for level in 0..=helpers::MAX_DEPTH {
        deepest = app.mkdir(&format!("level-{level}"), Some(deepest)).await;
    }
    app.upload("bottom.txt", Some(deepest)).await;

    let err = app
        .store
        .commit(MutationPlan::new(
            RowOp::DeleteFolder {
                id: top,
                parent: None,
            },
            [],
            Utc::now(),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::IntegrityViolation);
    assert!(app.folder_exists(deepest).await);
    assert_eq!(app.blobs.len().await, 1);
}
