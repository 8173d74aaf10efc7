use crate::core::{caption, imaging, sheet};
use crate::domain::model::{
    PostBundle, PostMeta, PostOutcome, ProductRow, RenderedImage, MAX_IMAGES,
};
use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
use crate::utils::error::Result;
use crate::utils::validation::validate_url;
use reqwest::Client;
use std::collections::HashSet;
use std::path::Path;

pub const IMAGES_DIR: &str = "images";
pub const CAPTION_FILE: &str = "caption.txt";
pub const ALT_TEXT_FILE: &str = "alt_text.txt";
pub const META_FILE: &str = "meta.json";

pub struct PostPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: Client,
}

impl<S: Storage, C: ConfigProvider> PostPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let http = &config.settings().http;
        let client = Client::builder()
            .timeout(http.timeout())
            .user_agent(http.user_agent.clone())
            .build()?;

        Ok(Self {
            storage,
            config,
            client,
        })
    }

    /// 下載單張圖片並裁切成正方形 JPEG
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        validate_url("image_urls", url)?;

        tracing::debug!("Downloading image: {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        tracing::debug!("Downloaded {} bytes from {}", bytes.len(), url);

        let images = &self.config.settings().images;
        imaging::square_jpeg(&bytes, images.size, images.jpeg_quality)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for PostPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<ProductRow>> {
        let path = Path::new(self.config.spreadsheet_path());
        tracing::debug!("Reading spreadsheet: {}", path.display());

        let records = sheet::read_records(path, self.config.sheet_name())?;
        tracing::debug!("Read {} non-empty rows", records.len());

        let mut seen_ids = HashSet::new();
        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let row = match ProductRow::from_record(record) {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!("⚠️ Skipping row {}: {}", record.row_number, e);
                    continue;
                }
            };

            if !seen_ids.insert(row.folder_name()) {
                tracing::warn!(
                    "⚠️ Skipping row {}: product_id '{}' already used by an earlier row",
                    row.row_number,
                    row.product_id
                );
                continue;
            }
            rows.push(row);
        }

        Ok(rows)
    }

    async fn transform(&self, row: ProductRow) -> Result<PostBundle> {
        let max_images = self.config.settings().images.max_images.min(MAX_IMAGES);
        if row.image_urls.len() > max_images {
            tracing::warn!(
                "Product {} lists {} images; only the first {} are used",
                row.product_id,
                row.image_urls.len(),
                max_images
            );
        }

        let mut images = Vec::new();
        let mut skipped_images = 0;
        for (index, url) in row.image_urls.iter().take(max_images).enumerate() {
            match self.fetch_image(url).await {
                Ok(jpeg) => images.push(RenderedImage {
                    file_name: format!("image_{}.jpg", index + 1),
                    source_url: url.clone(),
                    jpeg,
                }),
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Skipping image {} for {}: {}",
                        url,
                        row.product_id,
                        e
                    );
                    skipped_images += 1;
                }
            }
        }

        let caption_settings = &self.config.settings().caption;
        let caption = caption::build_caption(&row, caption_settings);
        let alt_text = caption::build_alt_text(&row);

        Ok(PostBundle {
            row,
            caption,
            alt_text,
            images,
            skipped_images,
        })
    }

    async fn load(&self, bundle: PostBundle) -> Result<PostOutcome> {
        let folder = bundle.row.folder_name();
        let images_dir = format!("{}/{}", folder, IMAGES_DIR);

        // A rerun must not leave images from URLs that failed this time.
        self.storage.reset_dir(&images_dir).await?;

        let mut image_files = Vec::with_capacity(bundle.images.len());
        for image in &bundle.images {
            let path = format!("{}/{}", images_dir, image.file_name);
            tracing::debug!("Writing {} ({} bytes) from {}", path, image.jpeg.len(), image.source_url);
            self.storage.write_file(&path, &image.jpeg).await?;
            image_files.push(image.file_name.clone());
        }

        self.storage
            .write_file(&format!("{}/{}", folder, CAPTION_FILE), bundle.caption.as_bytes())
            .await?;
        self.storage
            .write_file(&format!("{}/{}", folder, ALT_TEXT_FILE), bundle.alt_text.as_bytes())
            .await?;

        let post_type = bundle.post_type();
        let row = bundle.row;
        let meta = PostMeta {
            product_id: row.product_id.clone(),
            title: row.title,
            post_type: post_type.to_string(),
            post_group: row.post_group,
            images: image_files,
            caption_file: CAPTION_FILE.to_string(),
            alt_text_file: ALT_TEXT_FILE.to_string(),
            affiliate_url: row.affiliate_url,
            category: row.category,
            price: row.price,
            rating: row.rating,
            review_count: row.review_count,
            seo_keywords: row.seo_keywords,
            skipped_image_count: bundle.skipped_images,
            generated_at: chrono::Utc::now().to_rfc3339(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)?;
        self.storage
            .write_file(&format!("{}/{}", folder, META_FILE), meta_json.as_bytes())
            .await?;

        Ok(PostOutcome {
            product_id: row.product_id,
            folder,
            images_written: meta.images.len(),
            images_skipped: bundle.skipped_images,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::PostSettings;
    use crate::domain::model::PostType;
    use httpmock::prelude::*;
    use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        dirs: Arc<Mutex<HashSet<String>>>,
    }

    impl MockStorage {
        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }

        async fn file_names(&self) -> Vec<String> {
            let files = self.files.lock().await;
            let mut names: Vec<String> = files.keys().cloned().collect();
            names.sort();
            names
        }

        async fn has_dir(&self, path: &str) -> bool {
            self.dirs.lock().await.contains(path)
        }
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn reset_dir(&self, path: &str) -> Result<()> {
            let prefix = format!("{}/", path);
            self.files.lock().await.retain(|name, _| !name.starts_with(&prefix));
            self.dirs.lock().await.insert(path.to_string());
            Ok(())
        }
    }

    struct MockConfig {
        spreadsheet_path: String,
        settings: PostSettings,
    }

    impl MockConfig {
        fn new(spreadsheet_path: &str) -> Self {
            let mut settings = PostSettings::default();
            // Small squares keep the resize cheap in debug builds.
            settings.images.size = 64;
            settings.http.timeout_seconds = 5;
            Self {
                spreadsheet_path: spreadsheet_path.to_string(),
                settings,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn spreadsheet_path(&self) -> &str {
            &self.spreadsheet_path
        }

        fn sheet_name(&self) -> Option<&str> {
            None
        }

        fn settings(&self) -> &PostSettings {
            &self.settings
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(40, 20, Rgb([250, 180, 20]));
        let mut buf = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn row_with_images(urls: Vec<String>) -> ProductRow {
        ProductRow {
            row_number: 2,
            product_id: "SKU-1".to_string(),
            title: Some("Trail Lamp".to_string()),
            short_desc: Some("A rugged lamp.".to_string()),
            affiliate_url: Some("https://amzn.to/lamp".to_string()),
            image_urls: urls,
            ..Default::default()
        }
    }

    fn build_pipeline(config: MockConfig) -> (PostPipeline<MockStorage, MockConfig>, MockStorage) {
        let storage = MockStorage::default();
        (PostPipeline::new(storage.clone(), config).unwrap(), storage)
    }

    #[tokio::test]
    async fn test_extract_skips_invalid_and_duplicate_rows() {
        let temp_dir = TempDir::new().unwrap();
        let sheet = temp_dir.path().join("products.csv");
        std::fs::write(
            &sheet,
            "product_id,title,image_urls_comma\n\
             SKU-1,Lamp,https://img/1.jpg\n\
             ,,https://img/orphan.jpg\n\
             SKU-1,Lamp again,\n\
             ,Smart Mug,\n",
        )
        .unwrap();

        let (pipeline, _) = build_pipeline(MockConfig::new(sheet.to_str().unwrap()));
        let rows = pipeline.extract().await.unwrap();

        let ids: Vec<&str> = rows.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids, vec!["SKU-1", "smart-mug"]);
        assert_eq!(rows[0].title.as_deref(), Some("Lamp"));
    }

    #[tokio::test]
    async fn test_extract_missing_file_fails() {
        let (pipeline, _) = build_pipeline(MockConfig::new("/definitely/not/here.csv"));
        assert!(pipeline.extract().await.is_err());
    }

    #[tokio::test]
    async fn test_transform_skips_failed_images_and_keeps_positions() {
        let server = MockServer::start_async().await;
        let png = png_bytes();

        let good_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/good.png");
                then.status(200).header("Content-Type", "image/png").body(&png);
            })
            .await;
        let missing_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.png");
                then.status(404);
            })
            .await;
        let html_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/page.html");
                then.status(200).body("<html>nope</html>");
            })
            .await;

        let urls = vec![
            server.url("/missing.png"),
            server.url("/good.png"),
            server.url("/page.html"),
            "http://127.0.0.1:1/unreachable.jpg".to_string(),
            "ftp://example.com/a.jpg".to_string(),
        ];

        let (pipeline, _) = build_pipeline(MockConfig::new("unused.csv"));
        let bundle = pipeline.transform(row_with_images(urls.clone())).await.unwrap();

        good_mock.assert_async().await;
        missing_mock.assert_async().await;
        html_mock.assert_async().await;

        assert_eq!(bundle.images.len(), 1);
        assert_eq!(bundle.images[0].file_name, "image_2.jpg");
        assert_eq!(bundle.images[0].source_url, urls[1]);
        assert_eq!(bundle.skipped_images, 4);

        let decoded = image::load_from_memory(&bundle.images[0].jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (64, 64));

        assert!(bundle.caption.starts_with("Check out Trail Lamp!"));
        assert_eq!(bundle.alt_text, "Image of Trail Lamp. A rugged lamp");
    }

    #[tokio::test]
    async fn test_transform_caps_image_count() {
        let server = MockServer::start_async().await;
        let png = png_bytes();
        let image_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/img.png");
                then.status(200).body(&png);
            })
            .await;

        let urls = (0..12)
            .map(|i| format!("{}?n={}", server.url("/img.png"), i))
            .collect();

        let (pipeline, _) = build_pipeline(MockConfig::new("unused.csv"));
        let bundle = pipeline.transform(row_with_images(urls)).await.unwrap();

        image_mock.assert_hits_async(10).await;
        assert_eq!(bundle.images.len(), 10);
        assert_eq!(bundle.images[9].file_name, "image_10.jpg");
        assert_eq!(bundle.skipped_images, 0);
    }

    #[tokio::test]
    async fn test_transform_respects_configured_max_images() {
        let server = MockServer::start_async().await;
        let png = png_bytes();
        let image_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/img.png");
                then.status(200).body(&png);
            })
            .await;

        let mut config = MockConfig::new("unused.csv");
        config.settings.images.max_images = 2;
        let urls = vec![server.url("/img.png"); 4];

        let (pipeline, _) = build_pipeline(config);
        let bundle = pipeline.transform(row_with_images(urls)).await.unwrap();

        image_mock.assert_hits_async(2).await;
        assert_eq!(bundle.images.len(), 2);
    }

    #[tokio::test]
    async fn test_load_writes_post_folder() {
        let (pipeline, storage) = build_pipeline(MockConfig::new("unused.csv"));

        let mut row = row_with_images(vec![
            "https://img/1.jpg".to_string(),
            "https://img/2.jpg".to_string(),
        ]);
        row.seo_keywords = vec!["camping lamp".to_string()];
        let bundle = PostBundle {
            row,
            caption: "caption body".to_string(),
            alt_text: "alt body".to_string(),
            images: vec![RenderedImage {
                file_name: "image_2.jpg".to_string(),
                source_url: "https://img/2.jpg".to_string(),
                jpeg: vec![0xFF, 0xD8, 0xFF],
            }],
            skipped_images: 1,
        };

        let outcome = pipeline.load(bundle).await.unwrap();

        assert_eq!(
            outcome,
            PostOutcome {
                product_id: "SKU-1".to_string(),
                folder: "SKU-1".to_string(),
                images_written: 1,
                images_skipped: 1,
            }
        );
        assert!(storage.has_dir("SKU-1/images").await);
        assert_eq!(
            storage.file_names().await,
            vec![
                "SKU-1/alt_text.txt",
                "SKU-1/caption.txt",
                "SKU-1/images/image_2.jpg",
                "SKU-1/meta.json",
            ]
        );
        assert_eq!(
            storage.get_file("SKU-1/caption.txt").await.unwrap(),
            b"caption body"
        );

        let meta: PostMeta =
            serde_json::from_slice(&storage.get_file("SKU-1/meta.json").await.unwrap()).unwrap();
        assert_eq!(meta.product_id, "SKU-1");
        assert_eq!(meta.images, vec!["image_2.jpg"]);
        assert_eq!(meta.post_type, "single");
        assert_eq!(meta.caption_file, "caption.txt");
        assert_eq!(meta.alt_text_file, "alt_text.txt");
        assert_eq!(meta.affiliate_url.as_deref(), Some("https://amzn.to/lamp"));
        assert_eq!(meta.seo_keywords, vec!["camping lamp"]);
        assert_eq!(meta.skipped_image_count, 1);
        assert!(chrono::DateTime::parse_from_rfc3339(&meta.generated_at).is_ok());
    }

    #[tokio::test]
    async fn test_load_clears_images_from_an_earlier_run() {
        let (pipeline, storage) = build_pipeline(MockConfig::new("unused.csv"));
        storage
            .write_file("SKU-1/images/image_1.jpg", b"stale")
            .await
            .unwrap();
        storage
            .write_file("SKU-1/images/image_3.jpg", b"stale")
            .await
            .unwrap();

        let bundle = PostBundle {
            row: row_with_images(vec![]),
            caption: String::new(),
            alt_text: String::new(),
            images: vec![RenderedImage {
                file_name: "image_3.jpg".to_string(),
                source_url: "https://img/3.jpg".to_string(),
                jpeg: vec![0xFF, 0xD8],
            }],
            skipped_images: 2,
        };
        pipeline.load(bundle).await.unwrap();

        assert!(storage.get_file("SKU-1/images/image_1.jpg").await.is_none());
        assert_eq!(
            storage.get_file("SKU-1/images/image_3.jpg").await.unwrap(),
            vec![0xFF, 0xD8]
        );
    }

    #[tokio::test]
    async fn test_load_without_images_still_creates_images_dir() {
        let (pipeline, storage) = build_pipeline(MockConfig::new("unused.csv"));
        let mut row = row_with_images(vec![]);
        row.post_type = Some(PostType::Other("best_of".to_string()));

        let bundle = PostBundle {
            row,
            caption: String::new(),
            alt_text: String::new(),
            images: vec![],
            skipped_images: 0,
        };
        pipeline.load(bundle).await.unwrap();

        assert!(storage.has_dir("SKU-1/images").await);
        let meta: PostMeta =
            serde_json::from_slice(&storage.get_file("SKU-1/meta.json").await.unwrap()).unwrap();
        assert!(meta.images.is_empty());
        assert_eq!(meta.post_type, "best_of");
    }

    #[test]
    fn test_bundle_infers_carousel() {
        let image = RenderedImage {
            file_name: "image_1.jpg".to_string(),
            source_url: "https://img/1.jpg".to_string(),
            jpeg: vec![],
        };
        let bundle = PostBundle {
            row: row_with_images(vec![]),
            caption: String::new(),
            alt_text: String::new(),
            images: vec![image.clone(), image],
            skipped_images: 0,
        };
        assert_eq!(bundle.post_type(), PostType::Carousel);
    }
}
