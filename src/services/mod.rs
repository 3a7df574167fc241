//! External collaborators — authentication, directory lookup, provisioning.

pub mod auth;
pub mod directory;
pub mod graph;
pub mod provisioning;

pub use auth::{AuthProvider, AuthToken, StaticAuthProvider};
pub use directory::{Directory, DirectoryIdentity, InMemoryDirectory};
pub use graph::GraphDirectory;
pub use provisioning::{LoggingProvisioner, Provisioner, RecordingProvisioner};
