use crate::utils::error::{PostError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Hard cap on images per post, set by the platform's carousel limit.
pub const MAX_IMAGES: usize = 10;

/// One spreadsheet row keyed by normalised header name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    pub row_number: usize,
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    /// First non-blank value among `columns`, rendered as text.
    pub fn text(&self, columns: &[&str]) -> Option<String> {
        columns
            .iter()
            .filter_map(|column| self.data.get(*column))
            .find_map(value_as_text)
    }

    pub fn list(&self, columns: &[&str], delimiter: char) -> Vec<String> {
        self.text(columns)
            .map(|raw| split_list(&raw, delimiter))
            .unwrap_or_default()
    }
}

pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

fn value_as_text(value: &serde_json::Value) -> Option<String> {
    let text = match value {
        serde_json::Value::Null => return None,
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn split_list(raw: &str, delimiter: char) -> Vec<String> {
    raw.split(delimiter)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostType {
    Single,
    Carousel,
    Other(String),
}

impl PostType {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match raw.to_lowercase().as_str() {
            "single" => PostType::Single,
            "carousel" => PostType::Carousel,
            _ => PostType::Other(raw.to_string()),
        })
    }

    /// Post type for a row that left the column blank.
    pub fn infer(image_count: usize) -> Self {
        if image_count > 1 {
            PostType::Carousel
        } else {
            PostType::Single
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PostType::Single => "single",
            PostType::Carousel => "carousel",
            PostType::Other(raw) => raw,
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    pub row_number: usize,
    pub product_id: String,
    pub title: Option<String>,
    pub short_desc: Option<String>,
    pub benefits: Vec<String>,
    pub affiliate_url: Option<String>,
    pub image_urls: Vec<String>,
    pub post_type: Option<PostType>,
    pub post_group: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub review_count: Option<u64>,
    pub category: Option<String>,
    pub seo_keywords: Vec<String>,
    pub hashtags: Vec<String>,
    pub cta_override: Option<String>,
    pub disclosure_override: Option<String>,
    pub alt_text_override: Option<String>,
}

impl ProductRow {
    pub fn from_record(record: &Record) -> Result<Self> {
        let title = record.text(&["title"]);
        let product_id = match record.text(&["product_id", "id"]) {
            Some(id) => id,
            None => match title.as_deref().map(slugify) {
                Some(slug) if !slug.is_empty() => slug,
                _ => {
                    return Err(PostError::ValidationError {
                        message: format!(
                            "row {} has neither a product_id nor a title",
                            record.row_number
                        ),
                    })
                }
            },
        };

        let review_count = record.text(&["review_count"]).and_then(|raw| {
            let parsed = parse_count(&raw);
            if parsed.is_none() {
                tracing::warn!(
                    "Row {}: ignoring review_count '{}' (not a whole number)",
                    record.row_number,
                    raw
                );
            }
            parsed
        });

        Ok(Self {
            row_number: record.row_number,
            product_id,
            title,
            short_desc: record.text(&["short_desc", "description"]),
            benefits: record.list(&["benefits_pipe", "benefits"], '|'),
            affiliate_url: record.text(&["affiliate_url"]),
            image_urls: record.list(&["image_urls_comma", "image_urls"], ','),
            post_type: record.text(&["post_type"]).and_then(|raw| PostType::parse(&raw)),
            post_group: record.text(&["post_group"]),
            price: record.text(&["price"]),
            rating: record.text(&["rating"]),
            review_count,
            category: record.text(&["category"]),
            seo_keywords: record.list(&["seo_keywords_comma", "seo_keywords"], ','),
            hashtags: record.list(&["hashtags_comma", "hashtags"], ','),
            cta_override: record.text(&["cta_override"]),
            disclosure_override: record.text(&["disclosure_override"]),
            alt_text_override: record.text(&["alt_text_override"]),
        })
    }

    /// Filesystem-safe folder name derived from the product id.
    pub fn folder_name(&self) -> String {
        let mut folder = String::with_capacity(self.product_id.len());
        let mut pending_dash = false;
        for c in self.product_id.chars() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                if pending_dash && !folder.is_empty() {
                    folder.push('-');
                }
                pending_dash = false;
                folder.push(c);
            } else {
                pending_dash = true;
            }
        }

        let folder = folder.trim_matches('-');
        if folder.is_empty() {
            "post".to_string()
        } else {
            folder.to_string()
        }
    }
}

/// Lower-case, hyphen-separated form of `value`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for c in value.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

fn parse_count(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(|c| *c != ',' && *c != '_').collect();
    if let Ok(count) = digits.parse::<u64>() {
        return Some(count);
    }
    // Spreadsheet numbers sometimes arrive as "120.0".
    digits
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
        .map(|f| f as u64)
}

/// One processed image ready to be written.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub file_name: String,
    pub source_url: String,
    pub jpeg: Vec<u8>,
}

/// Everything generated for a row, before it touches disk.
#[derive(Debug, Clone)]
pub struct PostBundle {
    pub row: ProductRow,
    pub caption: String,
    pub alt_text: String,
    pub images: Vec<RenderedImage>,
    pub skipped_images: usize,
}

impl PostBundle {
    pub fn post_type(&self) -> PostType {
        self.row
            .post_type
            .clone()
            .unwrap_or_else(|| PostType::infer(self.images.len()))
    }
}

/// Contents of `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMeta {
    pub product_id: String,
    pub title: Option<String>,
    pub post_type: String,
    pub post_group: Option<String>,
    pub images: Vec<String>,
    pub caption_file: String,
    pub alt_text_file: String,
    pub affiliate_url: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub review_count: Option<u64>,
    pub seo_keywords: Vec<String>,
    pub skipped_image_count: usize,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostOutcome {
    pub product_id: String,
    pub folder: String,
    pub images_written: usize,
    pub images_skipped: usize,
}
