//! Dremio Catalog Client SDK
//!
//! A typed async Rust client for the Dremio catalog REST API: sources, spaces,
//! folders, datasets and reflections.
//!
//! # Features
//!
//! - **Typed entities**: one struct per catalog kind, with a discriminator
//!   check on every typed read
//! - **Optimistic updates**: read-modify-write that carries the server's
//!   version tag and unmodelled fields forward
//! - **Authentication**: static API key, or lazy username/password login
//!   performed once per session
//! - **Collaboration**: tags and wiki on catalog entities
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use dremio_catalog_client::{DremioClient, NewSpaceSpec, NewVirtualDatasetSpec};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DremioClient::new(
//!         DremioClient::builder("http://localhost:9047")
//!             .credentials("admin", "secret")
//!             .timeout(Duration::from_secs(30))
//!             .build()?
//!     )?;
//!
//!     let space = client.new_space(&NewSpaceSpec { name: "Sales".into() }).await?;
//!
//!     let view = client
//!         .new_virtual_dataset(&NewVirtualDatasetSpec {
//!             path: vec!["Sales".into(), "Top".into()],
//!             sql: "SELECT * FROM orders ORDER BY amount DESC LIMIT 10".into(),
//!             sql_context: vec![],
//!         })
//!         .await?;
//!     println!("{} created in {}", view.base.name, space.base.name);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return `Result<T, ClientError>`. Errors include:
//!
//! - `Status`: the server answered with a status >= 400; the body is kept verbatim
//! - `WrongKind`: the entity exists but is not of the requested kind
//! - `Decode`: a success response could not be decoded
//! - `Validation`: a spec was rejected before any request was sent
//!
//! Nothing is retried. A conflicting update (stale tag) surfaces as a
//! `Status` error with status 409 and is left to the caller.

pub mod auth;
pub mod client;
pub mod collaboration;
pub mod config;
pub mod dataset;
pub mod entity;
pub mod error;
pub mod folder;
pub mod reflection;
pub mod source;
pub mod space;
mod transport;

// Re-exports for convenience
pub use auth::{AuthState, LoginResponse};
pub use client::{DremioClient, SharedClient};
pub use collaboration::{Tags, Wiki};
pub use config::{ClientConfig, ClientConfigBuilder, Credentials};
pub use dataset::{
    Dataset, DatasetField, DatasetFieldType, DatasetType, NewPhysicalDatasetSpec,
    NewVirtualDatasetSpec, PhysicalDataset, PhysicalDatasetFormat, RefreshMethod, RefreshPolicy,
    UpdatePhysicalDatasetSpec, UpdateVirtualDatasetSpec, VirtualDataset,
};
pub use entity::{
    derive_name_and_path, CatalogEntity, CatalogEntityCore, CatalogEntitySummary, CatalogKind,
    ContainerType, EntityType, Enrich, SummaryDatasetType, SummaryType, TypedEntity,
};
pub use error::{ClientError, Result};
pub use folder::{File, Folder, Home, NewFolderSpec};
pub use reflection::{
    AggregationReflection, AggregationReflectionSpec, DimensionField, Granularity, MeasureField,
    MeasureType, PartitionDistributionStrategy, RawReflection, RawReflectionSpec, Reflection,
    ReflectionCore, ReflectionField, ReflectionStatus, ReflectionType,
};
pub use source::{
    AccelerationSettings, DatasetUpdateMode, MetadataPolicy, NewSourceSpec, Source,
    UpdateSourceSpec,
};
pub use space::{NewSpaceSpec, Space};
