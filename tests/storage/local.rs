use bytes::Bytes;
use oss_bridge::{
    config::{Platform, ProviderConfig},
    storage::{Storage, StorageError},
};
use rstest::rstest;
use tree_fs::TreeBuilder;

fn disk(root: &std::path::Path) -> Storage {
    Storage::from_config(
        "disk",
        ProviderConfig {
            local_file_path: Some(root.to_path_buf()),
            local_file_url: Some("https://files.example.com".to_string()),
            ..ProviderConfig::new(Platform::Local)
        },
    )
    .unwrap()
}

#[tokio::test]
async fn can_round_trip_on_disk() {
    let tree = TreeBuilder::default().drop(true).create().unwrap();
    let storage = disk(&tree.root);

    let uploaded = storage
        .upload(&b"hello disk"[..], "hello.txt", None)
        .await
        .unwrap();
    assert_eq!(uploaded.bucket, "https://files.example.com");
    assert!(uploaded.version_id.is_none());
    assert!(tree.root.join(&uploaded.key).is_file());

    let content = storage.download(&uploaded.key).await.unwrap();
    assert_eq!(content.collect().await.unwrap(), Bytes::from_static(b"hello disk"));

    assert_eq!(
        storage.presigned_url(&uploaded.key).await.unwrap(),
        format!("https://files.example.com/{}", uploaded.key)
    );

    assert!(storage.delete(&uploaded.key).await.unwrap());
    let err = storage.download(&uploaded.key).await.unwrap_err();
    assert!(matches!(err, StorageError::ObjectNotFound(_)));
    assert!(!storage.delete(&uploaded.key).await.unwrap());
}

#[tokio::test]
async fn leading_separator_stays_under_root() {
    let tree = TreeBuilder::default().drop(true).create().unwrap();
    let storage = disk(&tree.root);

    let uploaded = storage
        .upload(&b"x"[..], "x.txt", Some("/nested/x.txt"))
        .await
        .unwrap();

    assert_eq!(uploaded.key, "/nested/x.txt");
    assert!(tree.root.join("nested/x.txt").is_file());
}

#[rstest]
#[case("//abs/x.txt")]
#[case("../x.txt")]
#[tokio::test]
async fn escaping_keys_are_refused(#[case] key: &str) {
    let tree = TreeBuilder::default()
        .drop(true)
        .add_file("store/keep.txt", "keep")
        .create()
        .unwrap();
    let root = tree.root.join("store");
    let storage = disk(&root);

    let err = storage
        .upload(&b"escaped"[..], "x.txt", Some(key))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::LocalIo { .. }));

    assert!(!tree.root.join("x.txt").exists());
    assert!(!std::path::Path::new("/abs/x.txt").exists());
    assert!(storage.download(key).await.is_err());
}

#[tokio::test]
async fn can_fetch_archive_from_disk() {
    let tree = TreeBuilder::default()
        .drop(true)
        .add_file("a.txt", "a")
        .add_file("docs/b.txt", "b")
        .create()
        .unwrap();
    let storage = disk(&tree.root);

    let attachment = storage
        .fetch(&["a.txt".to_string(), "docs/b.txt".to_string()])
        .await
        .unwrap()
        .unwrap();

    assert_eq!(attachment.filename, "download.zip");
    let archive = attachment.stream.collect().await.unwrap();
    assert!(archive.starts_with(b"PK\x03\x04"));
}

#[tokio::test]
async fn local_has_no_upload_ticket() {
    let tree = TreeBuilder::default().drop(true).create().unwrap();
    let storage = disk(&tree.root);

    assert!(storage
        .presigned_upload_ticket("a.png")
        .await
        .unwrap()
        .is_none());
}
