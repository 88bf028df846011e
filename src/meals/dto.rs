use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::MealEntry;

#[derive(Debug, Serialize)]
pub struct MealResponse {
    pub id: Uuid,
    pub dish_name: String,
    pub calories: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub confidence: f64,
    pub created_at: OffsetDateTime,
}

impl From<MealEntry> for MealResponse {
    fn from(m: MealEntry) -> Self {
        Self {
            id: m.id,
            dish_name: m.dish_name,
            calories: m.calories,
            protein_g: m.protein_g,
            carbs_g: m.carbs_g,
            fat_g: m.fat_g,
            confidence: m.confidence,
            created_at: m.created_at,
        }
    }
}

/// POST /meals/base64 { "image_b64": "...", "content_type": "image/jpeg" }
/// `image_b64` may also be a full data URL, in which case the media type
/// comes from the URL itself.
#[derive(Debug, Deserialize)]
pub struct CreateMealBase64 {
    pub image_b64: String,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistorySort {
    #[default]
    Recent,
    Oldest,
    Highest,
    Lowest,
}

#[derive(Debug, Deserialize)]
pub struct HistoryFilter {
    pub search: Option<String>,
    #[serde(default)]
    pub sort: HistorySort,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

/// Splits `data:image/jpeg;base64,AAAA` into media type and payload.
pub fn parse_data_url(s: &str) -> Option<(&str, &str)> {
    let rest = s.strip_prefix("data:")?;
    let (media_type, payload) = rest.split_once(";base64,")?;
    if media_type.is_empty() {
        return None;
    }
    Some((media_type, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_data_url() {
        let (mt, payload) = parse_data_url("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(mt, "image/jpeg");
        assert_eq!(payload, "aGVsbG8=");
    }

    #[test]
    fn rejects_non_data_urls() {
        assert!(parse_data_url("aGVsbG8=").is_none());
        assert!(parse_data_url("data:;base64,aGVsbG8=").is_none());
        assert!(parse_data_url("data:image/jpeg,raw").is_none());
    }

    #[test]
    fn history_filter_defaults() {
        let f: HistoryFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(f.limit, 20);
        assert_eq!(f.offset, 0);
        assert_eq!(f.sort, HistorySort::Recent);
        assert!(f.search.is_none());
    }

    #[test]
    fn history_sort_parses_lowercase() {
        let f: HistoryFilter = serde_json::from_str(r#"{"sort":"highest"}"#).unwrap();
        assert_eq!(f.sort, HistorySort::Highest);
    }
}
