use oss_bridge::{
    config::Platform,
    environment::Environment,
    storage::{StorageError, StrategyRegistry},
};

#[test]
fn can_build_registry_from_config_folder() {
    let config = Environment::Test.load().unwrap();
    let registry = StrategyRegistry::from_config(&config).unwrap();

    assert_eq!(registry.names().collect::<Vec<_>>(), vec!["disk", "mem"]);
    assert_eq!(registry.get_default().name(), "mem");
    assert_eq!(registry.get_default().platform(), Platform::Memory);
    assert_eq!(registry.get("disk").unwrap().platform(), Platform::Local);
    assert!(matches!(
        registry.storage(Some("s3")),
        Err(StorageError::ProviderNotFound(_))
    ));
}

#[tokio::test]
async fn providers_of_a_registry_are_independent() {
    let config = Environment::Test.load().unwrap();
    let registry = StrategyRegistry::from_config(&config).unwrap();
    let mem = registry.storage(None).unwrap();

    let uploaded = mem
        .upload(&b"\x89PNG\r\n\x1a\n"[..], "a.png", Some("shared.png"))
        .await
        .unwrap();
    assert_eq!(uploaded.bucket, "primary");

    let disk = registry.get("disk").unwrap();
    assert!(!disk.exists("shared.png").await.unwrap());
    assert!(mem.exists("shared.png").await.unwrap());
}
