//! Article listing records.

use serde::Deserialize;

use crate::client::types::{non_empty, safe_datetime, Category, ContentItem};

#[derive(Debug, Default, Deserialize)]
pub struct ArticleRecord {
    pub id: Option<i64>,
    pub cvid: Option<i64>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub publish_time: Option<i64>,
    pub author_name: Option<String>,
}

pub fn normalize(record: ArticleRecord) -> ContentItem {
    let cvid = record
        .id
        .filter(|&id| id != 0)
        .or(record.cvid)
        .unwrap_or(0);

    ContentItem {
        category: Category::Article,
        item_id: cvid.to_string(),
        title: non_empty(record.title).unwrap_or_else(|| "专栏文章".to_string()),
        url: format!("https://www.bilibili.com/read/cv{cvid}"),
        author: record.author_name,
        published_at: safe_datetime(record.publish_time),
        summary: non_empty(record.summary),
    }
}
