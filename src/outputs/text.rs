//! Plain-text digest rendering.
//!
//! # Layout
//!
//! ```text
//! # 📰 每日科技新闻简报
//! **2026年10月14日**
//!
//! 1. **标题**
//!    来源：新浪科技
//!
//! ---
//! *由每日科技播报生成，无需 API Key。*
//! ```

use crate::models::HeadlineItem;
use crate::utils::digest_date_label;
use chrono::NaiveDate;
use std::fmt::Write;

pub const HEADER: &str = "# 📰 每日科技新闻简报";
pub const EMPTY_NOTICE: &str = "暂无抓取到的新鲜条目，请稍后再试或检查网络。";
pub const FOOTER: &str = "*由每日科技播报生成，无需 API Key。*";
const DEFAULT_SOURCE: &str = "科技媒体";

/// Render the digest for `date`.
pub fn render(items: &[HeadlineItem], date: NaiveDate) -> String {
    let mut out = String::new();
    writeln!(out, "{HEADER}").unwrap();
    writeln!(out, "**{}**", digest_date_label(date)).unwrap();
    writeln!(out).unwrap();

    if items.is_empty() {
        writeln!(out, "{EMPTY_NOTICE}").unwrap();
        writeln!(out).unwrap();
    } else {
        for (i, item) in items.iter().enumerate() {
            let source = if item.source.is_empty() {
                DEFAULT_SOURCE
            } else {
                item.source.as_str()
            };
            writeln!(out, "{}. **{}**", i + 1, item.title).unwrap();
            writeln!(out, "   来源：{source}").unwrap();
            writeln!(out).unwrap();
        }
    }

    writeln!(out, "---").unwrap();
    write!(out, "{FOOTER}").unwrap();
    out
}

/// Render the degraded digest used when the run itself failed.
pub fn render_failure(reason: &str, date: NaiveDate) -> String {
    format!(
        "{HEADER}\n**{}**\n\n今日简报生成时遇到问题：{reason}\n请稍后重试或检查网络。",
        digest_date_label(date)
    )
}
