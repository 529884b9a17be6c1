//! Client side of the conda environment backend: environment and package
//! operations, change notifications, and cancellation of superseded work.

pub mod api;
pub mod cache;
pub mod environments;
pub mod error;
pub mod packages;
pub mod registry;

pub use api::CondaApi;
pub use cache::{AvailableCatalog, AvailablePackageCache};
pub use environments::EnvironmentClient;
pub use error::ClientError;
pub use packages::PackageClient;
pub use registry::{CancellableAction, CancellableRegistry, TaskKind};
