use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rows_read: usize,
    pub posts_written: usize,
    pub rows_failed: usize,
    pub images_written: usize,
    pub images_skipped: usize,
    pub folders: Vec<String>,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.rows_failed == 0
    }
}

pub struct PostEngine<P: Pipeline> {
    pipeline: P,
    monitor_enabled: bool,
}

impl<P: Pipeline> PostEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor_enabled,
        }
    }

    /// Processes every row in order. A failing row is logged and counted,
    /// only a failed extract aborts the run.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut monitor = SystemMonitor::new(self.monitor_enabled);
        tracing::info!("Starting post generation...");

        let rows = self.pipeline.extract().await?;
        tracing::info!("📄 Extracted {} product rows", rows.len());
        monitor.log_stats("Extract");

        let mut summary = RunSummary {
            rows_read: rows.len(),
            ..Default::default()
        };

        for row in rows {
            let product_id = row.product_id.clone();
            let row_number = row.row_number;

            let result = match self.pipeline.transform(row).await {
                Ok(bundle) => self.pipeline.load(bundle).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(outcome) => {
                    tracing::info!(
                        "✅ {} -> {}/ ({} images, {} skipped)",
                        outcome.product_id,
                        outcome.folder,
                        outcome.images_written,
                        outcome.images_skipped
                    );
                    summary.posts_written += 1;
                    summary.images_written += outcome.images_written;
                    summary.images_skipped += outcome.images_skipped;
                    summary.folders.push(outcome.folder);
                }
                Err(e) => {
                    tracing::error!(
                        "❌ Row {} ({}) failed: {} (Category: {:?})",
                        row_number,
                        product_id,
                        e,
                        e.category()
                    );
                    summary.rows_failed += 1;
                }
            }
        }

        monitor.log_stats("Generate");
        monitor.log_final_stats();

        tracing::info!(
            "Generated {} posts ({} failed), {} images written, {} skipped",
            summary.posts_written,
            summary.rows_failed,
            summary.images_written,
            summary.images_skipped
        );
        Ok(summary)
    }
}
