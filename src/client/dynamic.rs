//! Dynamic-feed record model and normalization.
//!
//! The feed endpoint returns heterogeneous records dispatched on the
//! `modules.module_dynamic.major.type` tag. Every field access tolerates
//! absence: third-party schema drift must degrade to empty fields, never to
//! a parse failure.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::client::types::{non_empty, safe_datetime, Category, ContentItem};

/// Deserialize a field into `None` instead of failing when its shape is
/// unexpected (missing tag, null, wrong type).
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Default, Deserialize)]
pub struct DynamicRecord {
    pub id_str: Option<String>,
    pub id: Option<Value>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub modules: Option<Modules>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Modules {
    pub module_author: Option<ModuleAuthor>,
    pub module_dynamic: Option<ModuleDynamic>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModuleAuthor {
    pub name: Option<String>,
    pub pub_ts: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModuleDynamic {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub desc: Option<DescModule>,
    #[serde(default, deserialize_with = "lenient")]
    pub major: Option<Major>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DescModule {
    pub text: Option<String>,
}

/// Recognized major sub-types plus a catch-all for everything the platform
/// may add later.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Major {
    #[serde(rename = "MAJOR_TYPE_ARCHIVE")]
    Archive {
        #[serde(default)]
        archive: ArchiveMajor,
    },
    #[serde(rename = "MAJOR_TYPE_ARTICLE")]
    Article {
        #[serde(default)]
        article: ArticleMajor,
    },
    #[serde(rename = "MAJOR_TYPE_LIVE")]
    Live {
        #[serde(default)]
        live_rcmd: LiveMajor,
    },
    #[serde(rename = "MAJOR_TYPE_OPUS")]
    Opus {
        #[serde(default)]
        opus: OpusMajor,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArchiveMajor {
    pub title: Option<String>,
    pub bvid: Option<String>,
    pub desc: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArticleMajor {
    pub title: Option<String>,
    pub jump_url: Option<String>,
    pub desc: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LiveMajor {
    pub title: Option<String>,
    pub link: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpusMajor {
    pub title: Option<String>,
    pub jump_url: Option<String>,
    pub summary: Option<OpusSummary>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpusSummary {
    pub text: Option<String>,
    pub rich_text_nodes: Option<Vec<RichTextNode>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RichTextNode {
    pub text: Option<String>,
}

/// Map one raw feed record into the normalized item shape.
pub fn normalize(record: DynamicRecord, mid: u64) -> ContentItem {
    let modules = record.modules.unwrap_or_default();
    let author_module = modules.module_author.unwrap_or_default();
    let dynamic_module = modules.module_dynamic.unwrap_or_default();
    let desc_text = dynamic_module.desc.and_then(|d| d.text);

    let mut title: Option<String> = None;
    let mut summary: Option<String> = None;
    let mut url: Option<String> = None;

    match dynamic_module.major {
        Some(Major::Archive { archive }) => {
            title = Some(non_empty(archive.title).unwrap_or_else(|| "动态投稿".to_string()));
            url = non_empty(archive.bvid)
                .map(|bvid| format!("https://www.bilibili.com/video/{bvid}"));
            summary = non_empty(archive.desc);
        }
        Some(Major::Article { article }) => {
            title = Some(non_empty(article.title).unwrap_or_else(|| "专栏文章".to_string()));
            url = non_empty(article.jump_url);
            summary = non_empty(article.desc);
        }
        Some(Major::Live { live_rcmd }) => {
            title = Some(non_empty(live_rcmd.title).unwrap_or_else(|| "直播动态".to_string()));
            url = non_empty(live_rcmd.link);
            summary = non_empty(live_rcmd.content);
        }
        Some(Major::Opus { opus }) => {
            title = Some(non_empty(opus.title).unwrap_or_else(|| "图文动态".to_string()));
            url = non_empty(opus.jump_url).map(|jump| {
                if jump.starts_with("//") {
                    format!("https:{jump}")
                } else {
                    jump
                }
            });
            let opus_summary = opus.summary.unwrap_or_default();
            summary = non_empty(opus_summary.text)
                .or_else(|| {
                    let joined: String = opus_summary
                        .rich_text_nodes
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|node| node.text)
                        .collect();
                    non_empty(Some(joined))
                })
                .or_else(|| non_empty(desc_text.clone()));
        }
        Some(Major::Unknown) | None => {}
    }

    if title.is_none() && dynamic_module.kind.as_deref() == Some("DYNAMIC_TYPE_WORD") {
        let text = non_empty(desc_text.clone()).unwrap_or_else(|| "文字动态".to_string());
        summary = Some(text.clone());
        title = Some(text);
    }

    let title = title.unwrap_or_else(|| {
        summary = summary.take().or_else(|| non_empty(desc_text.clone()));
        non_empty(desc_text.clone())
            .or_else(|| non_empty(record.kind))
            .unwrap_or_else(|| "动态".to_string())
    });

    let item_id = non_empty(record.id_str).or_else(|| {
        record.id.and_then(|id| match id {
            Value::String(s) if !s.is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    });

    let url = url.unwrap_or_else(|| match &item_id {
        Some(id) => format!("https://t.bilibili.com/{id}"),
        None => "https://t.bilibili.com/".to_string(),
    });

    let published_at = safe_datetime(author_module.pub_ts);

    // Synthetic id so dedup keeps working when the source provides none.
    let item_id = item_id.unwrap_or_else(|| {
        format!("dynamic-{mid}-{}", author_module.pub_ts.unwrap_or(0))
    });

    ContentItem {
        category: Category::Dynamic,
        item_id,
        title,
        url,
        author: author_module.name,
        published_at,
        summary,
    }
}
