//! Integration tests for move operations

mod common;

use std::sync::Arc;

use ::common::prelude::*;
use object_store_client::BlobClient;

#[tokio::test]
async fn test_mv_file() {
    let env = common::setup_test_env().await;
    let old = common::path("/c1/old.txt");
    let new = common::path("/c1/new.txt");
    common::write(&env.dispatcher, &old, b"move me").await;

    env.dispatcher
        .move_paths(&[(old.clone(), new.clone())], &CloudOptions::new())
        .await
        .unwrap();

    assert!(!common::exists(&env.dispatcher, &old).await);
    assert_eq!(&env.dispatcher.read_file(&new).await.unwrap()[..], b"move me");
}

#[tokio::test]
async fn test_mv_directory_with_contents() {
    let env = common::setup_test_env().await;
    env.dispatcher
        .create_directory(&common::path("/c1/src"))
        .await
        .unwrap();
    env.dispatcher
        .create_directory(&common::path("/c1/src/nested"))
        .await
        .unwrap();
    common::write(&env.dispatcher, &common::path("/c1/src/a.txt"), b"a").await;
    common::write(&env.dispatcher, &common::path("/c1/src/nested/b.txt"), b"b").await;

    // Moves always carry the whole tree
    env.dispatcher
        .move_paths(
            &[(common::path("/c1/src"), common::path("/c1/dst"))],
            &CloudOptions::new(),
        )
        .await
        .unwrap();

    assert!(!common::exists(&env.dispatcher, &common::path("/c1/src")).await);
    assert_eq!(
        env.dispatcher.list(&common::path("/c1/dst")).await.unwrap(),
        vec![common::path("/c1/dst/a.txt"), common::path("/c1/dst/nested")]
    );
    assert_eq!(
        &env.dispatcher
            .read_file(&common::path("/c1/dst/nested/b.txt"))
            .await
            .unwrap()[..],
        b"b"
    );
}

#[tokio::test]
async fn test_mv_into_own_subtree() {
    let env = common::setup_test_env().await;
    let dir = common::path("/c1/dir");
    let file = common::path("/c1/dir/f");
    env.dispatcher.create_directory(&dir).await.unwrap();
    common::write(&env.dispatcher, &file, b"stay").await;

    let result = env
        .dispatcher
        .move_paths(&[(dir.clone(), common::path("/c1/dir/inner"))], &CloudOptions::new())
        .await;
    assert!(matches!(result, Err(FsError::Io(_))));

    assert_eq!(env.dispatcher.list(&dir).await.unwrap(), vec![file.clone()]);
    assert_eq!(&env.dispatcher.read_file(&file).await.unwrap()[..], b"stay");
}

#[tokio::test]
async fn test_mv_onto_existing() {
    let env = common::setup_test_env().await;
    let a = common::path("/c1/a");
    let b = common::path("/c1/b");
    common::write(&env.dispatcher, &a, b"a").await;
    common::write(&env.dispatcher, &b, b"b").await;

    let result = env
        .dispatcher
        .move_paths(&[(a.clone(), b.clone())], &CloudOptions::new())
        .await;
    assert!(matches!(result, Err(FsError::AlreadyExists(_))));
    assert!(common::exists(&env.dispatcher, &a).await);

    env.dispatcher
        .move_paths(&[(a.clone(), b.clone())], &CloudOptions::new().replace_existing())
        .await
        .unwrap();
    assert!(!common::exists(&env.dispatcher, &a).await);
    assert_eq!(&env.dispatcher.read_file(&b).await.unwrap()[..], b"a");
}

#[tokio::test]
async fn test_mv_between_clients() {
    common::init_tracing();
    let dispatcher = Dispatcher::new();
    for id in ["a", "b"] {
        let fs = CloudFileSystem::new(
            id,
            Arc::new(BlobClient::memory()),
            Arc::new(DefaultCloudEngine::new()),
            HostConfiguration::new(),
        );
        dispatcher.mount(fs).unwrap();
        dispatcher
            .create_directory(&common::path_on(id, "/c1"))
            .await
            .unwrap();
    }
    let source = common::path_on("a", "/c1/f");
    let target = common::path_on("b", "/c1/f");
    common::write(&dispatcher, &source, b"travelling").await;

    dispatcher
        .move_paths(&[(source.clone(), target.clone())], &CloudOptions::new())
        .await
        .unwrap();

    assert!(!common::exists(&dispatcher, &source).await);
    assert_eq!(&dispatcher.read_file(&target).await.unwrap()[..], b"travelling");
}

#[tokio::test]
async fn test_mv_incomplete_when_source_cannot_be_deleted() {
    let lookup = Arc::new(StaticUserGroupLookup::new().with_current_user("alice"));
    let env = common::setup_secured_env(lookup).await;
    let alice = Principal::user("alice");

    let c1 = common::path("/c1");
    env.dispatcher
        .set_acl(&c1, &common::full_access(alice.clone(), alice.clone()))
        .await
        .unwrap();

    let source = common::path("/c1/locked.txt");
    let target = common::path("/c1/copy.txt");
    common::write(&env.dispatcher, &source, b"sticky").await;

    // alice may read the file but not delete it
    let acl = AclSet::new(Principal::user("bob")).with_entries([AclEntry::allow(alice)
        .with_permissions([AclPermission::ReadData, AclPermission::ReadAcl])]);
    env.dispatcher.set_acl(&source, &acl).await.unwrap();

    let result = env
        .dispatcher
        .move_paths(&[(source.clone(), target.clone())], &CloudOptions::new())
        .await;
    match result {
        Err(FsError::MoveIncomplete { from, to, cause }) => {
            assert_eq!(from, source);
            assert_eq!(to, target);
            assert!(matches!(*cause, FsError::AccessDenied(_)));
        }
        other => panic!("expected an incomplete move, got {:?}", other),
    }

    assert_eq!(&env.dispatcher.read_file(&source).await.unwrap()[..], b"sticky");
    assert_eq!(&env.dispatcher.read_file(&target).await.unwrap()[..], b"sticky");
}
