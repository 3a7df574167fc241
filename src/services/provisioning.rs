//! Provisioning collaborator — receives completed site requests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::dialog::model::SiteRequest;
use crate::error::CollaboratorError;

/// Whatever actually creates the site.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn submit(&self, user_id: &str, request: &SiteRequest) -> Result<(), CollaboratorError>;
}

/// Logs the request and does nothing else.
#[derive(Debug, Default)]
pub struct LoggingProvisioner;

#[async_trait]
impl Provisioner for LoggingProvisioner {
    async fn submit(&self, user_id: &str, request: &SiteRequest) -> Result<(), CollaboratorError> {
        tracing::info!(
            user_id,
            site_type = request.site_type_label(),
            title = request.title.as_deref().unwrap_or_default(),
            owner = request.owner.as_deref().unwrap_or_default(),
            alias = request.alias.as_deref().unwrap_or_default(),
            "Site request submitted"
        );
        Ok(())
    }
}

/// Keeps every submitted request, for tests.
#[derive(Debug, Default)]
pub struct RecordingProvisioner {
    submitted: Mutex<Vec<(String, SiteRequest)>>,
    failing: AtomicBool,
}

impl RecordingProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submitted(&self) -> Vec<(String, SiteRequest)> {
        self.submitted.lock().await.clone()
    }

    /// Make every submission fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Provisioner for RecordingProvisioner {
    async fn submit(&self, user_id: &str, request: &SiteRequest) -> Result<(), CollaboratorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::RequestFailed {
                service: "provisioning".into(),
                reason: "provisioning unavailable".into(),
            });
        }
        self.submitted
            .lock()
            .await
            .push((user_id.to_string(), request.clone()));
        Ok(())
    }
}
