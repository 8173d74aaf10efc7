use crate::domain::model::MAX_IMAGES;
use crate::utils::error::{PostError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_IMAGE_SIZE: u32 = 1080;
pub const DEFAULT_JPEG_QUALITY: u8 = 90;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_CTA_TEMPLATE: &str = "Learn more and buy here: {url}";
pub const DEFAULT_DISCLOSURE: &str = "As an Amazon Associate I earn from qualifying purchases.";
pub const DEFAULT_MAX_HASHTAGS: usize = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostSettings {
    pub images: ImageSettings,
    pub http: HttpSettings,
    pub caption: CaptionSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub size: u32,
    pub jpeg_quality: u8,
    pub max_images: usize,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            size: DEFAULT_IMAGE_SIZE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_images: MAX_IMAGES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionSettings {
    pub cta_template: String,
    pub default_disclosure: String,
    pub max_hashtags: usize,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            cta_template: DEFAULT_CTA_TEMPLATE.to_string(),
            default_disclosure: DEFAULT_DISCLOSURE.to_string(),
            max_hashtags: DEFAULT_MAX_HASHTAGS,
        }
    }
}

impl PostSettings {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PostError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析設定
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PostError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DISCLOSURE_TEXT})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| PostError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for PostSettings {
    fn validate(&self) -> Result<()> {
        validate_range("images.size", self.images.size, 64, 4096)?;
        validate_range("images.jpeg_quality", self.images.jpeg_quality, 1, 100)?;
        validate_range("images.max_images", self.images.max_images, 1, MAX_IMAGES)?;
        validate_range("http.timeout_seconds", self.http.timeout_seconds, 1, 300)?;
        validate_non_empty_string("http.user_agent", &self.http.user_agent)?;
        validate_non_empty_string("caption.cta_template", &self.caption.cta_template)?;
        Ok(())
    }
}
