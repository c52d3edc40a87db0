//! Integration tests for copy operations

mod common;

use std::sync::Arc;

use ::common::prelude::*;
use object_store_client::BlobClient;

async fn directory_with_file(env: &common::TestEnv) -> (CloudPath, CloudPath) {
    let d1 = common::path("/c1/d1");
    let f1 = common::path("/c1/d1/f1");
    env.dispatcher.create_directory(&d1).await.unwrap();
    common::write(&env.dispatcher, &f1, b"file one contents").await;
    (d1, f1)
}

#[tokio::test]
async fn test_copy_directory_shallow() {
    let env = common::setup_test_env().await;
    let (d1, _) = directory_with_file(&env).await;
    let d2 = common::path("/c1/d2");

    let methods = env
        .dispatcher
        .copy(&[(d1.clone(), d2.clone())], &CloudOptions::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(methods.get(&d1), Some(&CopyMethod::CloudOptimised));

    let attributes = env.dispatcher.read_attributes(&d2).await.unwrap();
    assert!(attributes.basic.is_directory());
    assert!(env.dispatcher.list(&d2).await.unwrap().is_empty());
    assert!(!common::exists(&env.dispatcher, &common::path("/c1/d2/f1")).await);
}

#[tokio::test]
async fn test_copy_directory_recursive() {
    let env = common::setup_test_env().await;
    let (d1, f1) = directory_with_file(&env).await;
    let d2 = common::path("/c1/d2");

    env.dispatcher
        .copy(&[(d1, d2.clone())], &CloudOptions::new().recursive())
        .await
        .unwrap();

    let source = env.dispatcher.read_attributes(&f1).await.unwrap();
    let copied = env
        .dispatcher
        .read_attributes(&common::path("/c1/d2/f1"))
        .await
        .unwrap();
    assert_eq!(copied.basic.size, source.basic.size);
    assert_eq!(
        env.dispatcher.read_file(&common::path("/c1/d2/f1")).await.unwrap(),
        env.dispatcher.read_file(&f1).await.unwrap()
    );

    // The source is untouched
    assert_eq!(env.dispatcher.list(&common::path("/c1/d1")).await.unwrap(), vec![f1]);
}

#[tokio::test]
async fn test_copy_into_own_subtree() {
    let env = common::setup_test_env().await;
    let (d1, f1) = directory_with_file(&env).await;
    let nested = common::path("/c1/d1/sub");

    let result = env
        .dispatcher
        .copy(&[(d1.clone(), nested.clone())], &CloudOptions::new().recursive())
        .await;
    assert!(matches!(result, Err(FsError::Io(_))));

    assert!(!common::exists(&env.dispatcher, &nested).await);
    assert_eq!(env.dispatcher.list(&d1).await.unwrap(), vec![f1]);
}

#[tokio::test]
async fn test_copy_into_sibling_with_shared_prefix() {
    let env = common::setup_test_env().await;
    let (d1, _) = directory_with_file(&env).await;
    let sibling = common::path("/c1/d10");

    env.dispatcher
        .copy(&[(d1, sibling.clone())], &CloudOptions::new().recursive())
        .await
        .unwrap();
    assert!(common::exists(&env.dispatcher, &common::path("/c1/d10/f1")).await);
}

#[tokio::test]
async fn test_copy_onto_itself() {
    let env = common::setup_test_env().await;
    let (d1, f1) = directory_with_file(&env).await;

    let option_sets = [
        CloudOptions::new(),
        CloudOptions::new().recursive(),
        CloudOptions::new().replace_existing(),
        CloudOptions::new().recursive().replace_existing().copy_attributes(),
    ];
    for options in option_sets {
        for path in [&d1, &f1] {
            let result = env
                .dispatcher
                .copy(&[(path.clone(), path.clone())], &options)
                .await;
            assert!(matches!(result, Err(FsError::AlreadyExists(_))));
        }
    }
    assert_eq!(
        &env.dispatcher.read_file(&f1).await.unwrap()[..],
        b"file one contents"
    );
}

#[tokio::test]
async fn test_copy_existing_target() {
    let env = common::setup_test_env().await;
    let a = common::path("/c1/a.txt");
    let b = common::path("/c1/b.txt");
    common::write(&env.dispatcher, &a, b"new").await;
    common::write(&env.dispatcher, &b, b"old").await;

    let result = env
        .dispatcher
        .copy(&[(a.clone(), b.clone())], &CloudOptions::new())
        .await;
    assert!(matches!(result, Err(FsError::AlreadyExists(p)) if p == b));
    assert_eq!(&env.dispatcher.read_file(&b).await.unwrap()[..], b"old");

    env.dispatcher
        .copy(&[(a, b.clone())], &CloudOptions::new().replace_existing())
        .await
        .unwrap();
    assert_eq!(&env.dispatcher.read_file(&b).await.unwrap()[..], b"new");
}

#[tokio::test]
async fn test_copy_replaces_directory_with_file() {
    let env = common::setup_test_env().await;
    let file = common::path("/c1/file");
    let target = common::path("/c1/target");
    common::write(&env.dispatcher, &file, b"content").await;
    env.dispatcher.create_directory(&target).await.unwrap();

    env.dispatcher
        .copy(&[(file, target.clone())], &CloudOptions::new().replace_existing())
        .await
        .unwrap();

    let attributes = env.dispatcher.read_attributes(&target).await.unwrap();
    assert!(attributes.basic.is_regular_file());
    assert_eq!(&env.dispatcher.read_file(&target).await.unwrap()[..], b"content");
}

#[tokio::test]
async fn test_copy_missing_target_parent() {
    let env = common::setup_test_env().await;
    let file = common::path("/c1/file");
    common::write(&env.dispatcher, &file, b"content").await;

    let result = env
        .dispatcher
        .copy(&[(file, common::path("/c1/nope/file"))], &CloudOptions::new())
        .await;
    assert!(matches!(result, Err(FsError::Io(_))));
}

#[tokio::test]
async fn test_copy_falls_back_when_native_copy_fails() {
    common::init_tracing();
    let client = Arc::new(BlobClient::memory());
    let fs = CloudFileSystem::new(
        common::FS_ID,
        Arc::new(common::NoCopyStore::new(client)),
        Arc::new(DefaultCloudEngine::new()),
        HostConfiguration::new(),
    );
    let dispatcher = Dispatcher::new();
    dispatcher.mount(fs).unwrap();
    dispatcher.create_directory(&common::path("/c1")).await.unwrap();

    let source = common::path("/c1/report.csv");
    let target = common::path("/c1/report-copy.csv");
    common::write(&dispatcher, &source, b"a,b,c").await;

    let methods = dispatcher
        .copy(&[(source.clone(), target.clone())], &CloudOptions::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(methods.get(&source), Some(&CopyMethod::LocalFallback));
    assert_eq!(&dispatcher.read_file(&target).await.unwrap()[..], b"a,b,c");

    let attributes = dispatcher.read_attributes(&target).await.unwrap();
    assert_eq!(attributes.basic.content_type.as_deref(), Some("text/csv"));
}

#[tokio::test]
async fn test_copy_between_filesystems() {
    common::init_tracing();
    let dispatcher = Dispatcher::new();
    let shared = Arc::new(BlobClient::memory());
    for (id, client) in [
        ("left", shared.clone()),
        ("right", shared),
        ("other", Arc::new(BlobClient::memory())),
    ] {
        let fs = CloudFileSystem::new(
            id,
            client,
            Arc::new(DefaultCloudEngine::new()),
            HostConfiguration::new(),
        );
        dispatcher.mount(fs).unwrap();
    }
    dispatcher
        .create_directory(&common::path_on("left", "/c1"))
        .await
        .unwrap();
    dispatcher
        .create_directory(&common::path_on("other", "/c9"))
        .await
        .unwrap();

    let native = common::path_on("left", "/c1/f");
    let relayed = common::path_on("left", "/c1/h");
    common::write(&dispatcher, &native, b"shared bytes").await;
    common::write(&dispatcher, &relayed, b"relayed bytes").await;

    // Mounts on one client copy natively; the container is the same one
    let same_client = common::path_on("right", "/c1/g");
    let other_client = common::path_on("other", "/c9/g");
    let methods = dispatcher
        .copy(
            &[
                (native.clone(), same_client.clone()),
                (relayed.clone(), other_client.clone()),
            ],
            &CloudOptions::new(),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(methods.get(&native), Some(&CopyMethod::CloudOptimised));
    assert_eq!(methods.get(&relayed), Some(&CopyMethod::LocalFallback));

    assert_eq!(&dispatcher.read_file(&same_client).await.unwrap()[..], b"shared bytes");
    assert_eq!(&dispatcher.read_file(&other_client).await.unwrap()[..], b"relayed bytes");
}

#[tokio::test]
async fn test_copy_directory_without_native_copy() {
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
    let source = common::path_on("a", "/c1/dir");
    dispatcher.create_directory(&source).await.unwrap();

    let result = dispatcher
        .copy(&[(source, common::path_on("b", "/c1/dir"))], &CloudOptions::new())
        .await;
    assert!(matches!(result, Err(FsError::Unsupported(_))));
}

#[tokio::test]
async fn test_copy_attributes_through_fallback() {
    common::init_tracing();
    let dispatcher = Dispatcher::new();
    let source_client = Arc::new(BlobClient::memory());
    for (id, client) in [("a", source_client.clone()), ("b", Arc::new(BlobClient::memory()))] {
        let fs = CloudFileSystem::new(
            id,
            client,
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
    common::write(&dispatcher, &source, b"x").await;
    let acl = AclSet::new(Principal::user("alice"));
    dispatcher.set_acl(&source, &acl).await.unwrap();

    let mut metadata = source_client
        .stat("c1", "f")
        .await
        .unwrap()
        .unwrap()
        .properties
        .user_metadata;
    metadata.insert("origin".to_string(), "a".to_string());
    source_client.set_user_metadata("c1", "f", metadata).await.unwrap();

    let plain = common::path_on("b", "/c1/plain");
    let with_attributes = common::path_on("b", "/c1/with-attributes");
    dispatcher
        .copy(&[(source.clone(), plain.clone())], &CloudOptions::new())
        .await
        .unwrap();
    dispatcher
        .copy(
            &[(source, with_attributes.clone())],
            &CloudOptions::new().copy_attributes(),
        )
        .await
        .unwrap();

    // The ACL always travels, the other user metadata only on request
    let plain = dispatcher.read_attributes(&plain).await.unwrap();
    assert_eq!(plain.acl, acl);
    assert!(!plain.acl.is_owner(&Principal::AnonymousUser));
    assert!(!plain.basic.user_metadata.contains_key("origin"));

    let copied = dispatcher.read_attributes(&with_attributes).await.unwrap();
    assert_eq!(copied.acl, acl);
    assert_eq!(
        copied.basic.user_metadata.get("origin").map(String::as_str),
        Some("a")
    );
}

#[tokio::test]
async fn test_copy_without_returning_methods() {
    let env = common::setup_test_env().await;
    let a = common::path("/c1/a");
    common::write(&env.dispatcher, &a, b"x").await;

    let methods = env
        .dispatcher
        .copy(
            &[(a, common::path("/c1/b"))],
            &CloudOptions::new().dont_return_copy_method(),
        )
        .await
        .unwrap();
    assert!(methods.is_none());
    assert!(common::exists(&env.dispatcher, &common::path("/c1/b")).await);
}

#[tokio::test]
async fn test_copy_fail_silently() {
    let env = common::setup_test_env().await;
    let a = common::path("/c1/a");
    common::write(&env.dispatcher, &a, b"x").await;

    let methods = env
        .dispatcher
        .copy(
            &[
                (common::path("/c1/missing"), common::path("/c1/m")),
                (a.clone(), common::path("/c1/b")),
            ],
            &CloudOptions::new().fail_silently(),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(methods.keys().collect::<Vec<_>>(), vec![&a]);
}
