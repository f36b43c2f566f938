//! カタログ取得クライアント
//!
//! サイトのURLを組み立て、取得したページを抽出モジュールで解析する。

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::extract::{parse_detail, parse_listing_with_base};
use crate::fetcher::RateLimitedFetcher;
use crate::models::{all_categories, CategoryInfo, GameDetail, GameSummary, ListingKind};

/// プレビューの説明文の最大文字数
pub const PREVIEW_DESCRIPTION_CHARS: usize = 500;
/// プレビューに含めるスクリーンショット数
pub const PREVIEW_SCREENSHOTS: usize = 5;

/// カタログ取得クライアント
pub struct CatalogClient {
    config: ScraperConfig,
    base: Url,
    fetcher: RateLimitedFetcher,
}

impl CatalogClient {
    pub fn new(config: ScraperConfig) -> Result<Self, ScraperError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| ScraperError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        let fetcher = RateLimitedFetcher::from_config(&config)?;

        Ok(Self {
            config,
            base,
            fetcher,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn search_url(&self, query: &str) -> String {
        format!("{}/?s={}", self.base_url(), urlencoding::encode(query))
    }

    pub fn category_url(&self, category: &str, page: u32) -> String {
        let mut url = format!("{}/category/{}/", self.base_url(), category.to_lowercase());
        if page > 1 {
            url.push_str(&format!("page/{}/", page));
        }
        url
    }

    pub fn a_to_z_url(&self, letter: Option<&str>, page: u32) -> String {
        let mut url = format!("{}/all-games/", self.base_url());
        let letter = letter.map(str::trim).filter(|l| !l.is_empty());

        if let Some(letter) = letter {
            url.push_str(&format!("?letter={}", letter.to_lowercase()));
        }
        if page > 1 {
            let separator = if letter.is_some() { '&' } else { '?' };
            url.push_str(&format!("{}page={}", separator, page));
        }
        url
    }

    pub fn game_url_for_slug(&self, slug: &str) -> String {
        format!("{}/{}", self.base_url(), slug.trim_matches('/'))
    }

    /// キーワード検索
    pub async fn search(
        &mut self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<GameSummary>, ScraperError> {
        info!("Searching for: {}", query);
        let url = self.search_url(query);
        let html = self.fetch_html(&url).await?;
        let games = parse_listing_with_base(&html, ListingKind::Search, limit, &self.base);
        info!("Found {} games for '{}'", games.len(), query);
        Ok(games)
    }

    /// カテゴリ別一覧
    pub async fn category(
        &mut self,
        category: &str,
        page: u32,
        limit: usize,
    ) -> Result<Vec<GameSummary>, ScraperError> {
        info!("Fetching category {} (page {})", category, page);
        let url = self.category_url(category, page);
        let html = self.fetch_html(&url).await?;
        Ok(parse_listing_with_base(&html, ListingKind::Category, limit, &self.base))
    }

    /// A-Z一覧（`letter` が `None` なら全件）
    pub async fn a_to_z(
        &mut self,
        letter: Option<&str>,
        page: u32,
        limit: usize,
    ) -> Result<Vec<GameSummary>, ScraperError> {
        info!("Fetching A-Z list (letter={:?}, page {})", letter, page);
        let url = self.a_to_z_url(letter, page);
        let html = self.fetch_html(&url).await?;
        Ok(parse_listing_with_base(&html, ListingKind::AtoZ, limit, &self.base))
    }

    /// ゲーム詳細
    pub async fn game_details(&mut self, game_url: &str) -> Result<GameDetail, ScraperError> {
        info!("Fetching game details: {}", game_url);
        let html = self.fetch_html(game_url).await?;
        Ok(parse_detail(&html, game_url))
    }

    /// スラッグからゲーム詳細
    pub async fn game_details_by_slug(&mut self, slug: &str) -> Result<GameDetail, ScraperError> {
        let url = self.game_url_for_slug(slug);
        self.game_details(&url).await
    }

    pub fn categories(&self) -> Vec<CategoryInfo> {
        all_categories(self.base_url())
    }

    /// HTML取得（HTTPエラーでも本文を返し、抽出側で欠損扱いにする）
    async fn fetch_html(&mut self, url: &str) -> Result<String, ScraperError> {
        let response = self.fetcher.fetch(url, self.config.request_timeout).await?;
        if !response.is_success() {
            warn!("HTTP {} from {}", response.status, response.url);
        }
        Ok(response.body)
    }
}

/// 一覧表示用の要約
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryView {
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub slug: String,
}

impl From<&GameSummary> for SummaryView {
    fn from(game: &GameSummary) -> Self {
        Self {
            title: game.title.clone(),
            url: game.url.clone(),
            thumbnail: game.thumbnail.clone(),
            slug: game.slug(),
        }
    }
}

/// 詳細のプレビュー（説明文とスクリーンショットを切り詰める）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailPreview {
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub description: String,
    pub screenshots: Vec<String>,
    pub genres: Vec<String>,
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub release_date: Option<String>,
}

impl From<&GameDetail> for DetailPreview {
    fn from(detail: &GameDetail) -> Self {
        Self {
            title: detail.summary.title.clone(),
            url: detail.summary.url.clone(),
            thumbnail: detail.summary.thumbnail.clone(),
            description: truncate_description(&detail.description),
            screenshots: detail
                .screenshots
                .iter()
                .take(PREVIEW_SCREENSHOTS)
                .cloned()
                .collect(),
            genres: detail.genres.clone(),
            developer: detail.developer.clone(),
            publisher: detail.publisher.clone(),
            release_date: detail.release_date_full.clone(),
        }
    }
}

fn truncate_description(description: &str) -> String {
    if description.chars().count() > PREVIEW_DESCRIPTION_CHARS {
        let head: String = description.chars().take(PREVIEW_DESCRIPTION_CHARS).collect();
        format!("{}...", head)
    } else {
        description.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_routes;
    use std::time::Duration;

    const SEARCH_PAGE: &str = r#"<html><body>
        <div class="cover-item category">
          <div class="cover-item-image"><img data-src="https://cdn.example.org/hades.jpg"></div>
          <div class="cover-item-title"><a href="/hades-free-download/"><h1>Hades</h1></a></div>
        </div>
        <div class="cover-item category">
          <div class="cover-item-title"><a href="/hades-ii-free-download/"><h1>Hades II</h1></a></div>
        </div>
        <div class="cover-item category">
          <div class="cover-item-title"><a href="/celeste-free-download/"><h1>Celeste</h1></a></div>
        </div>
    </body></html>"#;

    const DETAIL_PAGE: &str = r#"<html><body>
        <h1>Hades Free Download</h1>
        <div class="entry-content"><p>Defy the god of the dead.</p></div>
        <a rel="category tag" href="/category/action/">Action</a>
        <div><a class="btn-download" href="https://uploadhaven.com/download/hades">Download</a> 15 GB</div>
    </body></html>"#;

    fn client(base: &str) -> CatalogClient {
        CatalogClient::new(ScraperConfig::new(base).with_request_delay(Duration::from_millis(1)))
            .unwrap()
    }

    #[test]
    fn test_url_builders() {
        let client = client("https://steamunlocked.org/");

        assert_eq!(
            client.search_url("hades ii & co"),
            "https://steamunlocked.org/?s=hades%20ii%20%26%20co"
        );
        assert_eq!(
            client.category_url("OPEN-WORLD", 1),
            "https://steamunlocked.org/category/open-world/"
        );
        assert_eq!(
            client.category_url("action", 3),
            "https://steamunlocked.org/category/action/page/3/"
        );
        assert_eq!(client.a_to_z_url(None, 1), "https://steamunlocked.org/all-games/");
        assert_eq!(
            client.a_to_z_url(Some("B"), 1),
            "https://steamunlocked.org/all-games/?letter=b"
        );
        assert_eq!(
            client.a_to_z_url(Some("b"), 2),
            "https://steamunlocked.org/all-games/?letter=b&page=2"
        );
        assert_eq!(
            client.a_to_z_url(Some(" "), 2),
            "https://steamunlocked.org/all-games/?page=2"
        );
        assert_eq!(
            client.game_url_for_slug("hades-free-download"),
            "https://steamunlocked.org/hades-free-download"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = CatalogClient::new(ScraperConfig::new("not a url"));
        assert!(matches!(result, Err(ScraperError::InvalidUrl(_))));
    }

    #[test]
    fn test_categories_use_client_base() {
        let categories = client("https://mirror.example.net").categories();
        assert_eq!(categories.len(), 18);
        assert_eq!(categories[8].slug, "open-world");
        assert_eq!(categories[8].url, "https://mirror.example.net/categories/open-world/");
    }

    #[tokio::test]
    async fn test_search_fetches_and_parses() {
        let base = spawn_routes(&[("/?s=hades", SEARCH_PAGE)]).await;
        let mut client = client(&base);

        let games = client.search("hades", 2).await.unwrap();

        assert_eq!(games.len(), 2);
        assert_eq!(games[0].title, "Hades");
        assert_eq!(games[0].url, format!("{}/hades-free-download/", base));
        assert_eq!(
            games[0].thumbnail.as_deref(),
            Some("https://cdn.example.org/hades.jpg")
        );
        assert_eq!(SummaryView::from(&games[1]).slug, "hades-ii-free-download");
    }

    #[tokio::test]
    async fn test_not_found_page_degrades_to_empty() {
        let base = spawn_routes(&[]).await;
        let mut client = client(&base);

        assert!(client.category("racing", 2, 20).await.unwrap().is_empty());
        let detail = client.game_details_by_slug("missing").await.unwrap();
        assert_eq!(detail.summary.title, "");
        assert!(detail.download_page_url.is_none());
    }

    #[tokio::test]
    async fn test_game_details_by_slug() {
        let base = spawn_routes(&[("/hades-free-download", DETAIL_PAGE)]).await;
        let mut client = client(&base);

        let detail = client.game_details_by_slug("hades-free-download").await.unwrap();

        assert_eq!(detail.summary.title, "Hades Free Download");
        assert_eq!(detail.genres, vec!["Action".to_string()]);
        assert_eq!(
            detail.download_page_url.as_deref(),
            Some("https://uploadhaven.com/download/hades")
        );
        assert_eq!(detail.file_size.as_deref(), Some("15 GB"));
    }

    #[test]
    fn test_detail_preview_truncates() {
        let mut detail = crate::extract::parse_detail(DETAIL_PAGE, "https://steamunlocked.org/hades/");
        detail.description = "あ".repeat(600);
        detail.screenshots = (0..8).map(|i| format!("https://cdn.example.org/{}.jpg", i)).collect();

        let preview = DetailPreview::from(&detail);

        assert_eq!(preview.description.chars().count(), PREVIEW_DESCRIPTION_CHARS + 3);
        assert!(preview.description.ends_with("..."));
        assert_eq!(preview.screenshots.len(), PREVIEW_SCREENSHOTS);
        assert_eq!(preview.screenshots[0], "https://cdn.example.org/0.jpg");
    }

    #[test]
    fn test_short_description_is_untouched() {
        assert_eq!(truncate_description("Short."), "Short.");
        assert_eq!(truncate_description(&"x".repeat(500)), "x".repeat(500));
    }
}
