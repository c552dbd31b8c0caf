#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
//! ## oss-bridge
//!
//! One storage contract over several object stores. Providers are declared
//! in `config/<env>.yaml`, application code asks the registry for a
//! [`storage::Storage`] and never deals with a vendor client directly.
//!
//! ```rust,no_run
//! use oss_bridge::{environment::Environment, storage::StrategyRegistry};
//!
//! # async fn run() -> oss_bridge::Result<()> {
//! let config = Environment::Development.load()?;
//! let registry = StrategyRegistry::from_config(&config)?;
//!
//! let storage = registry.storage(Some("minio"))?;
//! let uploaded = storage.upload(&b"hello"[..], "hello.txt", None).await?;
//! let url = storage.presigned_url(&uploaded.key).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Available Features
//!
//! | Feature          | Default | Description                                                   |
//! |------------------|---------|---------------------------------------------------------------|
//! | `storage_remote` | true    | MinIO, AWS S3, Aliyun OSS, Tencent COS and Qiniu Kodo clients. |
pub use self::errors::Error;

pub mod config;
pub mod environment;
pub mod errors;
pub mod logger;
pub mod storage;
mod tera;

/// Application results options list
pub type Result<T> = std::result::Result<T, Error>;
