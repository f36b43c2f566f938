//! 一覧ページ（検索・カテゴリ・A-Z）の抽出

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::{absolutize, collapsed_text, css, first_attr, DEFAULT_BASE};
use crate::models::{GameSummary, ListingKind};

/// 一覧の1件分の構造
struct ListingLayout {
    /// 繰り返しコンテナ
    container: Selector,
    /// タイトルリンク（必須）
    link: Selector,
    /// リンク内の見出し（なければリンクテキスト）
    heading: Option<Selector>,
    /// サムネイル画像
    image: Selector,
    /// 画像URLの属性（遅延読み込み属性を優先）
    image_attrs: &'static [&'static str],
}

/// 検索結果とカテゴリページは同じカード構造
static COVER_LAYOUT: Lazy<ListingLayout> = Lazy::new(|| ListingLayout {
    container: css("div.cover-item.category"),
    link: css("div.cover-item-title a"),
    heading: Some(css("h1")),
    image: css("div.cover-item-image img"),
    image_attrs: &["data-src", "src"],
});

static A_TO_Z_LAYOUT: Lazy<ListingLayout> = Lazy::new(|| ListingLayout {
    container: css("div.su-pop-item"),
    link: css("div.info a"),
    heading: None,
    image: css("div.img img"),
    image_attrs: &["data-wpfc-original-src", "src"],
});

fn layout(kind: ListingKind) -> &'static ListingLayout {
    match kind {
        ListingKind::Search | ListingKind::Category => &COVER_LAYOUT,
        ListingKind::AtoZ => &A_TO_Z_LAYOUT,
    }
}

/// 一覧ページを解析（相対URLはデフォルトのサイトURLで解決）
pub fn parse_listing(html: &str, kind: ListingKind, limit: usize) -> Vec<GameSummary> {
    parse_listing_with_base(html, kind, limit, &DEFAULT_BASE)
}

/// 一覧ページを解析
///
/// 必須要素が欠けた項目はスキップし、残りを文書順に最大 `limit` 件返す。
pub fn parse_listing_with_base(
    html: &str,
    kind: ListingKind,
    limit: usize,
    base: &Url,
) -> Vec<GameSummary> {
    let document = Html::parse_document(html);
    let layout = layout(kind);

    let games: Vec<GameSummary> = document
        .select(&layout.container)
        .enumerate()
        .filter_map(|(index, item)| {
            let parsed = parse_item(item, layout, base);
            if parsed.is_none() {
                debug!("Skipping malformed {:?} item #{}", kind, index);
            }
            parsed
        })
        .take(limit)
        .collect();

    debug!("Parsed {} {:?} items", games.len(), kind);
    games
}

fn parse_item(item: ElementRef<'_>, layout: &ListingLayout, base: &Url) -> Option<GameSummary> {
    let link = item.select(&layout.link).next()?;
    let href = link.value().attr("href")?.trim();
    if href.is_empty() {
        return None;
    }

    let title = layout
        .heading
        .as_ref()
        .and_then(|heading| link.select(heading).next())
        .map(collapsed_text)
        .unwrap_or_else(|| collapsed_text(link));

    let thumbnail = item
        .select(&layout.image)
        .next()
        .and_then(|img| first_attr(img, layout.image_attrs));

    Some(GameSummary {
        title,
        url: absolutize(href, base),
        thumbnail,
        release_date: None,
    })
}
