//! Integration tests for attribute views and stored ACLs

mod common;

use std::sync::Arc;

use ::common::prelude::*;

#[tokio::test]
async fn test_basic_view() {
    let env = common::setup_test_env().await;
    let file = common::path("/c1/f.txt");
    common::write(&env.dispatcher, &file, b"12345").await;

    let map = env
        .dispatcher
        .read_attribute_map(&file, "size,isDirectory,isRegularFile")
        .await
        .unwrap();
    assert_eq!(map.len(), 3);
    assert_eq!(map["size"], AttributeValue::Size(5));
    assert_eq!(map["isDirectory"], AttributeValue::Bool(false));
    assert_eq!(map["isRegularFile"], AttributeValue::Bool(true));

    let all = env.dispatcher.read_attribute_map(&file, "basic:*").await.unwrap();
    assert_eq!(all.len(), 9);
    assert_eq!(all["isSymbolicLink"], AttributeValue::Bool(false));
    assert_eq!(env.dispatcher.read_attribute_map(&file, "*").await.unwrap(), all);
}

#[tokio::test]
async fn test_cloud_view() {
    let env = common::setup_test_env().await;
    let file = common::path("/c1/f.txt");
    common::write(&env.dispatcher, &file, b"12345").await;

    let map = env
        .dispatcher
        .read_attribute_map(&file, "cloud:contentType,uri,aclSet")
        .await
        .unwrap();
    assert_eq!(
        map["contentType"],
        AttributeValue::Text(Some("text/plain".to_string()))
    );
    assert_eq!(
        map["uri"],
        AttributeValue::Text(Some("cloudfs://test/c1/f.txt".to_string()))
    );
    let AttributeValue::Acl(snapshot) = &map["aclSet"] else {
        panic!("aclSet should hold an acl");
    };
    assert!(snapshot.owners.contains(&Principal::AnonymousUser));

    let directory = env
        .dispatcher
        .read_attribute_map(&common::path("/c1"), "isDirectory")
        .await
        .unwrap();
    assert_eq!(directory["isDirectory"], AttributeValue::Bool(true));
}

#[tokio::test]
async fn test_unknown_attributes() {
    let env = common::setup_test_env().await;
    let file = common::path("/c1/f");
    common::write(&env.dispatcher, &file, b"x").await;

    for selection in ["bogus", "basic:size,bogus", "posix:size", "cloud:size"] {
        let result = env.dispatcher.read_attribute_map(&file, selection).await;
        assert!(
            matches!(result, Err(FsError::InvalidAttribute(_))),
            "{} should be rejected",
            selection
        );
    }
}

#[tokio::test]
async fn test_acl_is_stored_with_the_blob() {
    let env = common::setup_test_env().await;
    let dir = common::path("/c1/dir");
    let file = common::path("/c1/dir/f");
    env.dispatcher.create_directory(&dir).await.unwrap();
    common::write(&env.dispatcher, &file, b"x").await;

    let alice = Principal::user("alice");
    for path in [&common::path("/c1"), &dir, &file] {
        env.dispatcher
            .set_acl(path, &common::full_access(alice.clone(), alice.clone()))
            .await
            .unwrap();
    }

    // A second mount over the same client sees the same ACLs
    let other = CloudFileSystem::new(
        "other",
        env.client.clone(),
        Arc::new(DefaultCloudEngine::new()),
        HostConfiguration::new(),
    );
    env.dispatcher.mount(other).unwrap();
    for raw in ["/c1", "/c1/dir", "/c1/dir/f"] {
        let attributes = env
            .dispatcher
            .read_attributes(&common::path_on("other", raw))
            .await
            .unwrap();
        assert_eq!(attributes.acl, common::full_access(alice.clone(), alice.clone()));
        assert!(attributes.basic.user_metadata.is_empty());
    }
}

#[tokio::test]
async fn test_access_entry_sets_backend_flag() {
    let env = common::setup_test_env().await;
    let file = common::path("/c1/public.txt");
    common::write(&env.dispatcher, &file, b"x").await;
    assert_eq!(env.client.blob_access("c1", "public.txt").unwrap(), BlobAccess::Private);

    let acl = AclSet::new(Principal::user("alice"))
        .with_entries([AclEntry::allow(Principal::Access(BlobAccess::Public))]);
    env.dispatcher.set_acl(&file, &acl).await.unwrap();
    assert_eq!(env.client.blob_access("c1", "public.txt").unwrap(), BlobAccess::Public);
}

#[tokio::test]
async fn test_placeholder_acl_follows_access_flag() {
    let env = common::setup_test_env().await;
    env.client
        .set_container_access("c1", BlobAccess::Public)
        .unwrap();

    let attributes = env
        .dispatcher
        .read_attributes(&common::path("/c1"))
        .await
        .unwrap();
    let entries = attributes.acl.entries();
    let entry = entries.iter().next().unwrap();
    assert_eq!(entry.principal(), &Principal::Access(BlobAccess::Public));
    assert!(entry.permissions().contains(&AclPermission::ReadData));
}

#[tokio::test]
async fn test_host_conflict_checker() {
    let lookup = Arc::new(StaticUserGroupLookup::new().with_group("staff", ["alice"]));
    let host = HostConfiguration::new().with_conflict_checker(Arc::new(
        DefaultConflictChecker::with_group_membership(lookup),
    ));
    let env = common::setup_with_host(host).await;
    let file = common::path("/c1/f");
    common::write(&env.dispatcher, &file, b"x").await;

    let alice = Principal::user("alice");
    let acl = AclSet::new(alice.clone()).with_entries([
        AclEntry::allow(Principal::group("staff")).with_permissions([AclPermission::ReadData])
    ]);
    env.dispatcher.set_acl(&file, &acl).await.unwrap();

    let stored = env.dispatcher.read_attributes(&file).await.unwrap().acl;
    let deny = AclEntry::deny(alice.clone()).with_permissions([AclPermission::ReadData]);
    let outcome = stored.add_entry(&alice, deny.clone(), false).unwrap();
    assert!(matches!(outcome, AddEntryOutcome::Rejected(conflicts) if conflicts.len() == 1));

    // Without membership checks user and group entries never collide
    let plain = AclSet::new(alice.clone()).with_entries([
        AclEntry::allow(Principal::group("staff")).with_permissions([AclPermission::ReadData])
    ]);
    assert_eq!(
        plain.add_entry(&alice, deny, false).unwrap(),
        AddEntryOutcome::Added
    );
}

#[tokio::test]
async fn test_missing_path() {
    let env = common::setup_test_env().await;
    let missing = common::path("/c1/missing");
    let result = env.dispatcher.read_attributes(&missing).await;
    assert!(matches!(result, Err(FsError::NotFound(p)) if p == missing));

    let result = env
        .dispatcher
        .read_attributes(&common::path("/no-such-container"))
        .await;
    assert!(matches!(result, Err(FsError::NotFound(_))));
}

