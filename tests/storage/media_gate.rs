use std::{io::Cursor, sync::Arc};

use oss_bridge::{
    config::{Platform, ProviderConfig},
    storage::{Storage, StorageError},
};

use crate::counting::CountingStrategy;

fn gated(strategy: Arc<CountingStrategy>) -> Storage {
    Storage::new(
        "gated",
        ProviderConfig {
            bucket_name: "uploads".to_string(),
            allow_media_type: Some(vec!["image/".to_string()]),
            ..ProviderConfig::new(Platform::Memory)
        },
        strategy,
    )
}

#[tokio::test]
async fn rejected_content_never_reaches_backend() {
    let strategy = Arc::new(CountingStrategy::default());
    let storage = gated(strategy.clone());
    let mut executable = Cursor::new(b"\x7fELF\x02\x01\x01\x00\x00\x00".to_vec());

    let result = async {
        let scope = storage
            .use_bucket("other")
            .allow_media_type(&mut executable)
            .await?;
        scope.upload(&mut executable, "tool", None).await
    }
    .await;

    assert!(matches!(
        result,
        Err(StorageError::IllegalMediaType(media_type)) if media_type == "application/x-executable"
    ));
    assert_eq!(executable.position(), 0);
    assert_eq!(strategy.calls(), 0);
}

#[tokio::test]
async fn accepted_content_is_uploaded_whole() {
    let strategy = Arc::new(CountingStrategy::default());
    let storage = gated(strategy.clone());
    let mut image = Cursor::new(b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR".to_vec());

    let scope = storage
        .use_default_bucket()
        .allow_media_type(&mut image)
        .await
        .unwrap();
    let uploaded = scope.upload(&mut image, "pixel.png", None).await.unwrap();

    assert_eq!(uploaded.bucket, "uploads");
    assert_eq!(uploaded.suffix, "png");
    assert_eq!(strategy.calls(), 1);
}

#[tokio::test]
async fn empty_batch_never_reaches_backend() {
    let strategy = Arc::new(CountingStrategy::default());
    let storage = gated(strategy.clone());

    assert!(!storage.delete_many(&[]).await.unwrap());
    assert!(storage.fetch(&[]).await.unwrap().is_none());
    assert_eq!(strategy.calls(), 0);
}
