//! Fixture tests for dynamic-feed normalization.
//!
//! Each fixture is a pruned real-world record shape; assertions pin the
//! fallback chain so a schema tweak upstream cannot silently change what
//! subscribers see.

use chrono::TimeZone;
use serde_json::json;

use bili_monitor::client::dynamic::{self, DynamicRecord};
use bili_monitor::client::{Category, SHANGHAI_TZ};

fn record(value: serde_json::Value) -> DynamicRecord {
    serde_json::from_value(value).expect("fixture must deserialize")
}

#[test]
fn archive_record_maps_video_fields() {
    let item = dynamic::normalize(
        record(json!({
            "id_str": "900001",
            "type": "DYNAMIC_TYPE_AV",
            "modules": {
                "module_author": {"name": "某位UP主", "pub_ts": 1_700_000_000},
                "module_dynamic": {
                    "major": {
                        "type": "MAJOR_TYPE_ARCHIVE",
                        "archive": {
                            "title": "新视频来了",
                            "bvid": "BV1xx411c7mD",
                            "desc": "三分钟看完"
                        }
                    }
                }
            }
        })),
        42,
    );

    assert_eq!(item.category, Category::Dynamic);
    assert_eq!(item.item_id, "900001");
    assert_eq!(item.title, "新视频来了");
    assert_eq!(item.url, "https://www.bilibili.com/video/BV1xx411c7mD");
    assert_eq!(item.summary.as_deref(), Some("三分钟看完"));
    assert_eq!(item.author.as_deref(), Some("某位UP主"));
    assert_eq!(
        item.published_at,
        SHANGHAI_TZ.timestamp_opt(1_700_000_000, 0).single()
    );
}

#[test]
fn article_record_uses_jump_url() {
    let item = dynamic::normalize(
        record(json!({
            "id_str": "900002",
            "modules": {
                "module_dynamic": {
                    "major": {
                        "type": "MAJOR_TYPE_ARTICLE",
                        "article": {
                            "title": "年度总结",
                            "jump_url": "https://www.bilibili.com/read/cv123",
                            "desc": "文章摘要"
                        }
                    }
                }
            }
        })),
        42,
    );

    assert_eq!(item.title, "年度总结");
    assert_eq!(item.url, "https://www.bilibili.com/read/cv123");
    assert_eq!(item.summary.as_deref(), Some("文章摘要"));
}

#[test]
fn live_record_reads_live_rcmd() {
    let item = dynamic::normalize(
        record(json!({
            "id_str": "900003",
            "modules": {
                "module_dynamic": {
                    "major": {
                        "type": "MAJOR_TYPE_LIVE",
                        "live_rcmd": {
                            "title": "直播中",
                            "link": "https://live.bilibili.com/1234",
                            "content": "快来看"
                        }
                    }
                }
            }
        })),
        42,
    );

    assert_eq!(item.title, "直播中");
    assert_eq!(item.url, "https://live.bilibili.com/1234");
    assert_eq!(item.summary.as_deref(), Some("快来看"));
}

#[test]
fn opus_joins_rich_text_nodes_and_fixes_scheme() {
    let item = dynamic::normalize(
        record(json!({
            "id_str": "900004",
            "modules": {
                "module_dynamic": {
                    "major": {
                        "type": "MAJOR_TYPE_OPUS",
                        "opus": {
                            "title": "图文",
                            "jump_url": "//www.bilibili.com/opus/900004",
                            "summary": {
                                "rich_text_nodes": [
                                    {"text": "Hello"},
                                    {"text": " world"}
                                ]
                            }
                        }
                    }
                }
            }
        })),
        42,
    );

    assert_eq!(item.title, "图文");
    assert_eq!(item.url, "https://www.bilibili.com/opus/900004");
    assert_eq!(item.summary.as_deref(), Some("Hello world"));
}

#[test]
fn word_record_promotes_desc_text_to_title() {
    let item = dynamic::normalize(
        record(json!({
            "id_str": "900005",
            "modules": {
                "module_dynamic": {
                    "type": "DYNAMIC_TYPE_WORD",
                    "desc": {"text": "今天吃什么"}
                }
            }
        })),
        42,
    );

    assert_eq!(item.title, "今天吃什么");
    assert_eq!(item.summary.as_deref(), Some("今天吃什么"));
    assert_eq!(item.url, "https://t.bilibili.com/900005");
}

#[test]
fn unknown_major_falls_back_to_record_kind() {
    let item = dynamic::normalize(
        record(json!({
            "id_str": "900006",
            "type": "DYNAMIC_TYPE_COURSES_SEASON",
            "modules": {
                "module_dynamic": {
                    "major": {"type": "MAJOR_TYPE_COURSES", "courses": {}}
                }
            }
        })),
        42,
    );

    assert_eq!(item.title, "DYNAMIC_TYPE_COURSES_SEASON");
    assert_eq!(item.url, "https://t.bilibili.com/900006");
    assert!(item.summary.is_none());
}

#[test]
fn missing_id_is_synthesized_from_mid_and_timestamp() {
    let item = dynamic::normalize(
        record(json!({
            "modules": {
                "module_author": {"pub_ts": 1_700_000_000},
                "module_dynamic": {
                    "type": "DYNAMIC_TYPE_WORD",
                    "desc": {"text": "无主键"}
                }
            }
        })),
        42,
    );
    assert_eq!(item.item_id, "dynamic-42-1700000000");
    assert_eq!(item.url, "https://t.bilibili.com/");

    let item = dynamic::normalize(record(json!({"modules": {}})), 42);
    assert_eq!(item.item_id, "dynamic-42-0");
}

#[test]
fn numeric_id_field_is_stringified() {
    let item = dynamic::normalize(record(json!({"id": 999})), 42);
    assert_eq!(item.item_id, "999");
    assert_eq!(item.url, "https://t.bilibili.com/999");
}

#[test]
fn empty_record_yields_generic_placeholder() {
    let item = dynamic::normalize(record(json!({})), 42);
    assert_eq!(item.title, "动态");
    assert_eq!(item.url, "https://t.bilibili.com/");
    assert!(item.author.is_none());
    assert!(item.published_at.is_none());
    assert_eq!(item.item_id, "dynamic-42-0");
}

#[test]
fn malformed_major_degrades_instead_of_failing() {
    // major present but with a shape serde cannot map into any variant
    let item = dynamic::normalize(
        record(json!({
            "id_str": "900007",
            "type": "DYNAMIC_TYPE_AV",
            "modules": {"module_dynamic": {"major": [1, 2, 3]}}
        })),
        42,
    );
    assert_eq!(item.title, "DYNAMIC_TYPE_AV");
    assert_eq!(item.url, "https://t.bilibili.com/900007");
}
