//! カタログの型定義

use std::fmt;

use serde::{Deserialize, Serialize};

/// 一覧ページから取得したゲーム概要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub release_date: Option<String>,
}

impl GameSummary {
    /// URLの最後から2番目のパス要素（末尾スラッシュ付きURLのスラッグ）
    pub fn slug(&self) -> String {
        slug_from_url(&self.url)
    }
}

pub(crate) fn slug_from_url(url: &str) -> String {
    let segments: Vec<&str> = url.split('/').collect();
    if segments.len() < 2 {
        return String::new();
    }
    segments[segments.len() - 2].to_string()
}

/// 動作環境
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    pub os: Option<String>,
    pub processor: Option<String>,
    pub memory: Option<String>,
    pub graphics: Option<String>,
    pub storage: Option<String>,
}

impl Requirements {
    /// 全フィールドが未設定または空文字
    pub fn is_empty(&self) -> bool {
        [
            &self.os,
            &self.processor,
            &self.memory,
            &self.graphics,
            &self.storage,
        ]
        .iter()
        .all(|field| field.as_deref().map_or(true, str::is_empty))
    }
}

/// ゲーム詳細
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDetail {
    #[serde(flatten)]
    pub summary: GameSummary,
    pub description: String,
    pub screenshots: Vec<String>,
    pub requirements: Option<Requirements>,
    pub genres: Vec<String>,
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub release_date_full: Option<String>,
    pub download_page_url: Option<String>,
    pub file_size: Option<String>,
}

/// ファイルホスティングサービス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileHost {
    UploadHaven,
    MegaUp,
    PixelDrain,
    RapidGator,
    NitroFlare,
    Uploaded,
    Unknown,
}

impl FileHost {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileHost::UploadHaven => "UploadHaven",
            FileHost::MegaUp => "MegaUp",
            FileHost::PixelDrain => "PixelDrain",
            FileHost::RapidGator => "RapidGator",
            FileHost::NitroFlare => "NitroFlare",
            FileHost::Uploaded => "Uploaded",
            FileHost::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for FileHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ダウンロード情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInfo {
    pub file_host: FileHost,
    pub download_url: String,
    pub file_size: Option<String>,
    /// 解除後の最終リンク（オートメーションのみ設定）
    pub direct_link: Option<String>,
    /// 待機した秒数（オートメーションのみ設定）
    pub wait_time: Option<u64>,
}

impl DownloadInfo {
    pub fn new(file_host: FileHost, download_url: impl Into<String>) -> Self {
        Self {
            file_host,
            download_url: download_url.into(),
            file_size: None,
            direct_link: None,
            wait_time: None,
        }
    }

    pub fn with_file_size(mut self, file_size: Option<String>) -> Self {
        self.file_size = file_size;
        self
    }
}

/// 一覧ページの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingKind {
    Search,
    Category,
    AtoZ,
}

/// カテゴリ情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub name: String,
    pub slug: String,
    pub url: String,
    pub game_count: Option<u32>,
}

impl CategoryInfo {
    pub fn new(name: &str, base_url: &str) -> Self {
        let slug = category_slug(name);
        let url = format!("{}/categories/{}/", base_url.trim_end_matches('/'), slug);
        Self {
            name: name.to_string(),
            slug,
            url,
            game_count: None,
        }
    }
}

/// サイトのカテゴリ一覧（固定）
pub const CATEGORIES: [&str; 18] = [
    "ACTION",
    "ADULT",
    "ADVENTURE",
    "ANIME",
    "CLASSICS",
    "FPS",
    "HORROR",
    "INDIE",
    "OPEN WORLD",
    "POPULAR",
    "PS2",
    "RACING",
    "REMASTERED",
    "RPG",
    "SIMULATION",
    "SMALL GAMES",
    "SPORTS",
    "VIRTUAL REALITY",
];

pub fn category_slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

/// 全カテゴリをCategoryInfoとして構築
pub fn all_categories(base_url: &str) -> Vec<CategoryInfo> {
    CATEGORIES
        .iter()
        .map(|name| CategoryInfo::new(name, base_url))
        .collect()
}
