use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// All platform timestamps are local to the platform's home timezone.
pub const SHANGHAI_TZ: Tz = chrono_tz::Asia::Shanghai;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Dynamic,
    Video,
    Article,
}

impl Category {
    /// Stable key used in the state ledger.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Dynamic => "dynamic",
            Category::Video => "video",
            Category::Article => "article",
        }
    }

    /// User-facing label, matching the platform's own wording.
    pub fn label(self) -> &'static str {
        match self {
            Category::Dynamic => "动态",
            Category::Video => "视频",
            Category::Article => "专栏",
        }
    }
}

/// Normalized representation of a bilibili publication.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub category: Category,
    pub item_id: String,
    pub title: String,
    pub url: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Tz>>,
    pub summary: Option<String>,
}

impl ContentItem {
    pub fn notification_lines(&self) -> Vec<String> {
        let published = self
            .published_at
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "未知时间".to_string());
        let mut lines = vec![
            format!("[{}] {}", self.category.label(), self.title),
            format!("作者: {}", self.author.as_deref().unwrap_or("未知")),
            format!("时间: {published}"),
            format!("链接: {}", self.url),
        ];
        if let Some(summary) = &self.summary {
            lines.push(format!("内容: {summary}"));
        }
        lines
    }
}

/// Epoch seconds to a timezone-aware timestamp. Zero, negative or absent
/// values mean "no timestamp", never an error.
pub fn safe_datetime(ts: Option<i64>) -> Option<DateTime<Tz>> {
    let ts = ts.filter(|&t| t > 0)?;
    SHANGHAI_TZ.timestamp_opt(ts, 0).single()
}

/// Optional string with empty treated as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_datetime_rejects_zero_and_none() {
        assert!(safe_datetime(None).is_none());
        assert!(safe_datetime(Some(0)).is_none());
        assert!(safe_datetime(Some(-5)).is_none());
    }

    #[test]
    fn safe_datetime_is_platform_local() {
        let dt = safe_datetime(Some(1_700_000_000)).expect("valid ts");
        // 2023-11-15 06:13:20 UTC == 14:13:20 UTC+8
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2023-11-15 14:13:20");
    }

    #[test]
    fn notification_lines_include_summary_when_present() {
        let item = ContentItem {
            category: Category::Video,
            item_id: "BV1xx411c7mD".into(),
            title: "t".into(),
            url: "https://www.bilibili.com/video/BV1xx411c7mD".into(),
            author: Some("someone".into()),
            published_at: None,
            summary: Some("desc".into()),
        };
        let lines = item.notification_lines();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "[视频] t");
        assert_eq!(lines[2], "时间: 未知时间");
        assert_eq!(lines[4], "内容: desc");
    }
}
