//! CV source collaborator trait.

use async_trait::async_trait;

use crate::error::Result;

/// Supplies the candidate CV as prompt-ready text, loaded once per run.
#[async_trait]
pub trait CvSource: Send + Sync {
    async fn load(&self) -> Result<String>;
}

#[async_trait]
impl<T: CvSource + ?Sized> CvSource for std::sync::Arc<T> {
    async fn load(&self) -> Result<String> {
        (**self).load().await
    }
}
