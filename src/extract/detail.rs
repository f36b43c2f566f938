//! ゲーム詳細ページの抽出

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use super::download::resolve;
use super::requirements::{parse_requirements, REQUIREMENTS_CLASS};
use super::{attr_matches, collapsed_text, css, first_attr, pattern};
use crate::models::{GameDetail, GameSummary};

static H1: Lazy<Selector> = Lazy::new(|| css("h1"));
static POST_TITLE: Lazy<Selector> = Lazy::new(|| css("h2.post-title"));
static IMG: Lazy<Selector> = Lazy::new(|| css("img"));
static DIV: Lazy<Selector> = Lazy::new(|| css("div"));
static LINK: Lazy<Selector> = Lazy::new(|| css("a"));

static THUMBNAIL_CLASS: Lazy<Regex> = Lazy::new(|| pattern(r"featured|thumb"));
static CONTENT_CLASS: Lazy<Regex> = Lazy::new(|| pattern(r"entry|content|post-content"));
static SCREENSHOT_CLASS: Lazy<Regex> = Lazy::new(|| pattern(r"screenshot|gallery"));
static CATEGORY_REL: Lazy<Regex> = Lazy::new(|| pattern(r"category"));
static META_CLASS: Lazy<Regex> = Lazy::new(|| pattern(r"meta|info"));

/// 画像URLの属性（遅延読み込み属性を優先）
const IMAGE_ATTRS: [&str; 2] = ["data-src", "src"];

/// メタ情報の分類
#[derive(Debug, Default, PartialEq)]
struct Metadata {
    developer: Option<String>,
    publisher: Option<String>,
    release_date_full: Option<String>,
}

/// 詳細ページを解析
///
/// 各項目は独立して抽出し、見つからない項目だけが欠損になる。
pub fn parse_detail(html: &str, source_url: &str) -> GameDetail {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let download = resolve(&document);
    let metadata = extract_metadata(&document);

    let requirements = document
        .select(&DIV)
        .find(|div| attr_matches(*div, "class", &REQUIREMENTS_CLASS))
        .and_then(parse_requirements);

    debug!(
        "Parsed detail page {}: title={:?}, download={}",
        source_url,
        title,
        download.is_some()
    );

    GameDetail {
        summary: GameSummary {
            title,
            url: source_url.to_string(),
            thumbnail: extract_thumbnail(&document),
            release_date: None,
        },
        description: extract_description(&document),
        screenshots: extract_screenshots(&document),
        requirements,
        genres: extract_genres(&document),
        developer: metadata.developer,
        publisher: metadata.publisher,
        release_date_full: metadata.release_date_full,
        download_page_url: download.as_ref().map(|d| d.download_url.clone()),
        file_size: download.and_then(|d| d.file_size),
    }
}

fn extract_title(document: &Html) -> String {
    document
        .select(&H1)
        .next()
        .or_else(|| document.select(&POST_TITLE).next())
        .map(collapsed_text)
        .unwrap_or_default()
}

fn extract_thumbnail(document: &Html) -> Option<String> {
    document
        .select(&IMG)
        .find(|img| attr_matches(*img, "class", &THUMBNAIL_CLASS))
        .and_then(|img| first_attr(img, &IMAGE_ATTRS))
}

fn extract_description(document: &Html) -> String {
    document
        .select(&DIV)
        .find(|div| attr_matches(*div, "class", &CONTENT_CLASS))
        .map(collapsed_text)
        .unwrap_or_default()
}

fn extract_screenshots(document: &Html) -> Vec<String> {
    document
        .select(&IMG)
        .filter(|img| attr_matches(*img, "class", &SCREENSHOT_CLASS))
        .filter_map(|img| first_attr(img, &IMAGE_ATTRS))
        .collect()
}

fn extract_genres(document: &Html) -> Vec<String> {
    document
        .select(&LINK)
        .filter(|a| attr_matches(*a, "rel", &CATEGORY_REL))
        .map(collapsed_text)
        .collect()
}

/// `meta` / `info` ブロックをキーワードで分類（後のブロックが上書き）
fn extract_metadata(document: &Html) -> Metadata {
    let mut metadata = Metadata::default();

    let blocks = document
        .select(&DIV)
        .filter(|div| attr_matches(*div, "class", &META_CLASS));

    for block in blocks {
        let text = collapsed_text(block);
        let lowered = text.to_lowercase();

        if lowered.contains("developer") || lowered.contains("dev") {
            metadata.developer = Some(strip_label(&text, "Developer:"));
        } else if lowered.contains("publisher") || lowered.contains("pub") {
            metadata.publisher = Some(strip_label(&text, "Publisher:"));
        } else if lowered.contains("release") || lowered.contains("published") {
            metadata.release_date_full = Some(strip_label(&text, "Release Date:"));
        }
    }

    metadata
}

fn strip_label(text: &str, label: &str) -> String {
    text.replace(label, "").trim().to_string()
}
