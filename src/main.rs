use affiliate_posts::utils::error::{ErrorSeverity, PostError};
use affiliate_posts::utils::{logger, validation::Validate};
use affiliate_posts::{CliConfig, LocalStorage, PostEngine, PostPipeline};
use clap::Parser;

fn exit_code(e: &PostError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: PostError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(&e));
}

#[tokio::main]
async fn main() {
    let mut config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting affiliate-posts CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.load_settings().and_then(|_| config.validate()) {
        tracing::error!("❌ Configuration validation failed");
        fail(e);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    if let Err(e) = tokio::fs::create_dir_all(&config.out).await {
        fail(PostError::IoError(e));
    }

    let storage = LocalStorage::new(config.out.clone());
    let pipeline = match PostPipeline::new(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => fail(e),
    };
    let engine = PostEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(summary) => {
            println!(
                "✅ Generated {} posts ({} images, {} skipped)",
                summary.posts_written, summary.images_written, summary.images_skipped
            );
            if !summary.is_clean() {
                eprintln!("❌ {} rows failed; see the log for details", summary.rows_failed);
                std::process::exit(1);
            }
        }
        Err(e) => fail(e),
    }
}
