use crate::config::toml_config::CaptionSettings;
use crate::domain::model::ProductRow;

/// Longest caption the platform accepts.
pub const CAPTION_CHAR_LIMIT: usize = 2200;

pub fn build_caption(row: &ProductRow, settings: &CaptionSettings) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(title) = &row.title {
        lines.push(format!("Check out {}!", title));
    }
    if let Some(desc) = &row.short_desc {
        lines.push(desc.clone());
    }
    lines.extend(row.benefits.iter().map(|benefit| format!("• {}", benefit)));

    if let Some(category) = &row.category {
        lines.push(format!("Category: {}", category));
    }
    if let Some(price) = &row.price {
        lines.push(format!("Price: {}", price));
    }
    if let Some(rating) = &row.rating {
        let reviews = row
            .review_count
            .map(|count| format!(" ({} reviews)", count))
            .unwrap_or_default();
        lines.push(format!("Rating: {}/5{}", rating, reviews));
    }

    if let Some(cta) = call_to_action(row, settings) {
        lines.push(cta);
    }

    let hashtags = hashtag_line(&row.hashtags, settings.max_hashtags);
    if !hashtags.is_empty() {
        lines.push(hashtags);
    }

    lines.push(
        row.disclosure_override
            .clone()
            .unwrap_or_else(|| settings.default_disclosure.clone()),
    );

    let caption = lines.join("\n");
    let length = caption.chars().count();
    if length > CAPTION_CHAR_LIMIT {
        tracing::warn!(
            "Caption for {} is {} characters, over the {} character limit",
            row.product_id,
            length,
            CAPTION_CHAR_LIMIT
        );
    }
    caption
}

fn call_to_action(row: &ProductRow, settings: &CaptionSettings) -> Option<String> {
    if let Some(cta) = &row.cta_override {
        return Some(cta.clone());
    }
    row.affiliate_url
        .as_ref()
        .map(|url| settings.cta_template.replace("{url}", url))
}

/// Normalised `#tag` line: no inner whitespace, no duplicates, at most `limit` tags.
pub fn hashtag_line(tags: &[String], limit: usize) -> String {
    let mut seen: Vec<String> = Vec::new();
    let mut line: Vec<String> = Vec::new();

    for tag in tags {
        let body: String = tag
            .trim()
            .trim_start_matches('#')
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if body.is_empty() {
            continue;
        }

        let key = body.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        if line.len() == limit {
            tracing::debug!("Dropping hashtags past the limit of {}", limit);
            break;
        }
        seen.push(key);
        line.push(format!("#{}", body));
    }

    line.join(" ")
}

pub fn build_alt_text(row: &ProductRow) -> String {
    if let Some(alt) = &row.alt_text_override {
        return alt.clone();
    }

    let title = row.title.as_deref().unwrap_or("product");
    let first_sentence = row
        .short_desc
        .as_deref()
        .and_then(|desc| desc.trim().split('.').next())
        .unwrap_or("")
        .trim();

    format!("Image of {}. {}", title, first_sentence).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lamp() -> ProductRow {
        ProductRow {
            row_number: 2,
            product_id: "LAMP-1".to_string(),
            title: Some("Trail Lamp".to_string()),
            short_desc: Some("A rugged camping lamp. Lasts all night.".to_string()),
            benefits: vec!["Bright".to_string(), "Waterproof".to_string()],
            affiliate_url: Some("https://amzn.to/lamp".to_string()),
            price: Some("$24.99".to_string()),
            rating: Some("4.6".to_string()),
            review_count: Some(1204),
            category: Some("Outdoors".to_string()),
            hashtags: vec!["camping".to_string(), "#outdoors".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_full_caption_layout() {
        let caption = build_caption(&lamp(), &CaptionSettings::default());

        let expected = [
            "Check out Trail Lamp!",
            "A rugged camping lamp. Lasts all night.",
            "• Bright",
            "• Waterproof",
            "Category: Outdoors",
            "Price: $24.99",
            "Rating: 4.6/5 (1204 reviews)",
            "Learn more and buy here: https://amzn.to/lamp",
            "#camping #outdoors",
            "As an Amazon Associate I earn from qualifying purchases.",
        ]
        .join("\n");
        assert_eq!(caption, expected);
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let mut row = lamp();
        row.cta_override = Some("Tap the link in bio".to_string());
        row.disclosure_override = Some("#ad".to_string());

        let caption = build_caption(&row, &CaptionSettings::default());

        assert!(caption.contains("Tap the link in bio"));
        assert!(!caption.contains("Learn more and buy here"));
        assert!(caption.ends_with("\n#ad"));
    }

    #[test]
    fn test_no_hashtags_means_no_hashtag_markers() {
        let mut row = lamp();
        row.hashtags.clear();

        let caption = build_caption(&row, &CaptionSettings::default());

        assert!(!caption.contains('#'));
    }

    #[test]
    fn test_rating_without_review_count() {
        let mut row = lamp();
        row.review_count = None;

        let caption = build_caption(&row, &CaptionSettings::default());

        assert!(caption.contains("Rating: 4.6/5\n"));
    }

    #[test]
    fn test_minimal_row_has_only_disclosure() {
        let row = ProductRow {
            product_id: "x".to_string(),
            ..Default::default()
        };
        let caption = build_caption(&row, &CaptionSettings::default());
        assert_eq!(caption, "As an Amazon Associate I earn from qualifying purchases.");
    }

    #[test]
    fn test_custom_cta_template() {
        let settings = CaptionSettings {
            cta_template: "Grab yours ➜ {url}".to_string(),
            ..Default::default()
        };
        let caption = build_caption(&lamp(), &settings);
        assert!(caption.contains("Grab yours ➜ https://amzn.to/lamp"));
    }

    #[test]
    fn test_hashtag_normalisation() {
        let tags: Vec<String> = ["##Smart Home", "smarthome", " ", "#", "gadgets", "tech"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(hashtag_line(&tags, 30), "#SmartHome #gadgets #tech");
        assert_eq!(hashtag_line(&tags, 2), "#SmartHome #gadgets");
        assert_eq!(hashtag_line(&[], 30), "");
    }

    #[test]
    fn test_alt_text_uses_first_sentence() {
        assert_eq!(
            build_alt_text(&lamp()),
            "Image of Trail Lamp. A rugged camping lamp"
        );
    }

    #[test]
    fn test_alt_text_fallbacks() {
        let row = ProductRow {
            product_id: "x".to_string(),
            ..Default::default()
        };
        assert_eq!(build_alt_text(&row), "Image of product.");

        let mut row = lamp();
        row.alt_text_override = Some("Green lantern on a rock".to_string());
        assert_eq!(build_alt_text(&row), "Green lantern on a rock");
    }
}
