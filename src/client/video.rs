//! Video upload records: a flat schema compared to the dynamic feed.

use serde::Deserialize;

use crate::client::types::{non_empty, safe_datetime, Category, ContentItem};

#[derive(Debug, Default, Deserialize)]
pub struct VideoRecord {
    pub bvid: Option<String>,
    pub aid: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created: Option<i64>,
    pub author: Option<String>,
}

pub fn normalize(record: VideoRecord) -> ContentItem {
    let bvid = non_empty(record.bvid);
    let aid = record.aid.unwrap_or(0);
    let url = match &bvid {
        Some(bvid) => format!("https://www.bilibili.com/video/{bvid}"),
        None => format!("https://www.bilibili.com/video/av{aid}"),
    };
    let item_id = bvid.unwrap_or_else(|| aid.to_string());

    ContentItem {
        category: Category::Video,
        item_id,
        title: non_empty(record.title).unwrap_or_else(|| "视频投稿".to_string()),
        url,
        author: record.author,
        published_at: safe_datetime(record.created),
        summary: non_empty(record.description),
    }
}
