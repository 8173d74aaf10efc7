use crate::config::toml_config::PostSettings;
use crate::domain::model::{PostBundle, PostOutcome, ProductRow};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Leaves `path` as an existing, empty directory.
    fn reset_dir(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn spreadsheet_path(&self) -> &str;
    fn sheet_name(&self) -> Option<&str>;
    fn settings(&self) -> &PostSettings;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<ProductRow>>;
    async fn transform(&self, row: ProductRow) -> Result<PostBundle>;
    async fn load(&self, bundle: PostBundle) -> Result<PostOutcome>;
}
