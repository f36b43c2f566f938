//! ゲームカタログ スクレイパーライブラリ
//!
//! - 一覧ページ（検索・カテゴリ・A-Z）と詳細ページを型付きレコードに変換
//! - 詳細ページからダウンロードリンクを段階的なフォールバックで特定
//! - ブラウザ操作で中継ページのカウントダウンを待ち、ダウンロードを開始
//!
//! # カタログ取得の使用例
//!
//! ```rust,ignore
//! use game_catalog_scraper::{CatalogClient, ScraperConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut client = CatalogClient::new(ScraperConfig::default()).unwrap();
//!
//!     let games = client.search("hades", 10).await.unwrap();
//!     for game in &games {
//!         println!("{} ({})", game.title, game.slug());
//!     }
//!
//!     let detail = client.game_details(&games[0].url).await.unwrap();
//!     println!("Download: {:?}", detail.download_page_url);
//! }
//! ```
//!
//! # ダウンロード解除の使用例
//!
//! ```rust,ignore
//! use game_catalog_scraper::{UnlockConfig, UnlockRequest, UnlockService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = UnlockService::new(UnlockConfig::default());
//!
//!     let request = UnlockRequest::new("https://steamunlocked.org/hades-free-download/")
//!         .with_headless(false);
//!
//!     let ack = service.call(request).await.unwrap();
//!     println!("Started run {}", ack.run_id);
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod models;
pub mod service;
pub mod traits;
pub mod unlock;

#[cfg(test)]
mod test_support;

// 主要な型をリエクスポート
pub use catalog::{CatalogClient, DetailPreview, SummaryView};
pub use config::{ScraperConfig, UnlockConfig};
pub use error::ScraperError;
pub use fetcher::{FetchResponse, RateLimitedFetcher};
pub use models::{
    CategoryInfo, DownloadInfo, FileHost, GameDetail, GameSummary, ListingKind, Requirements,
};
pub use service::{UnlockAck, UnlockRequest, UnlockService};
pub use traits::BrowserDriver;
pub use unlock::{ChromiumDriver, UnlockAutomaton, UnlockFailure, UnlockReport, UnlockState};
