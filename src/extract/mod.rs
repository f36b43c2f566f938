//! HTML抽出モジュール
//!
//! 一覧・詳細ページを型付きレコードに変換する。要素が見つからない場合は
//! そのフィールドだけを欠損扱いにし、全体の処理は止めない。

mod detail;
mod download;
mod listing;
mod requirements;

pub use detail::parse_detail;
pub use download::{identify_file_host, resolve, ResolveStrategy, STRATEGIES};
pub use listing::{parse_listing, parse_listing_with_base};
pub use requirements::{parse_requirements, parse_requirements_html};

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

use crate::config::DEFAULT_BASE_URL;

/// ファイルサイズ表記（例: "12.5 GB"）
static SIZE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(GB|MB)").expect("size pattern"));

pub(crate) static DEFAULT_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse(DEFAULT_BASE_URL).expect("default base url"));

/// 静的なCSSセレクタを構築（リテラル専用）
pub(crate) fn css(selector: &'static str) -> Selector {
    Selector::parse(selector).expect("static selector")
}

/// 大文字小文字を区別しない静的パターン（リテラル専用）
pub(crate) fn pattern(regex: &'static str) -> Regex {
    Regex::new(&format!("(?i){}", regex)).expect("static pattern")
}

/// テキストノードを空白1つで連結（前後の空白は除去）
pub(crate) fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 属性を順に確認し、最初の空でない値を返す
pub(crate) fn first_attr(element: ElementRef<'_>, attrs: &[&str]) -> Option<String> {
    attrs
        .iter()
        .filter_map(|name| element.value().attr(name))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// 属性値がパターンに一致するか
pub(crate) fn attr_matches(element: ElementRef<'_>, attr: &str, pattern: &Regex) -> bool {
    element
        .value()
        .attr(attr)
        .map(|value| pattern.is_match(value))
        .unwrap_or(false)
}

/// 指定タグの最も近い祖先要素
pub(crate) fn nearest_ancestor<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == tag)
}

/// テキスト中の最初のファイルサイズ表記
pub(crate) fn find_file_size(text: &str) -> Option<String> {
    SIZE_PATTERN
        .captures(text)
        .map(|caps| format!("{} {}", &caps[1], &caps[2]))
}

/// 相対URLを絶対URLに変換（変換できなければそのまま返す）
pub(crate) fn absolutize(href: &str, base: &Url) -> String {
    base.join(href)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}
