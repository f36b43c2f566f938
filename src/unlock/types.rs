//! ダウンロード解除の状態と遷移

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::DownloadInfo;

/// ゲームページのダウンロードボタン（優先順）
pub const DOWNLOAD_BUTTON_SELECTORS: [&str; 2] = [
    "a.btn-download",
    "a[href*='uploadhaven.com/download/']",
];

/// 中継ページの「Free Download」ボタンの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlState {
    Missing,
    Disabled,
    Enabled,
}

/// 解除失敗の理由
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnlockFailure {
    #[error("ブラウザ起動失敗: {0}")]
    Launch(String),

    #[error("ゲームページの読み込みタイムアウト")]
    PageLoadTimeout,

    #[error("ナビゲーション失敗: {0}")]
    Navigation(String),

    #[error("ダウンロードボタンが見つかりません")]
    ButtonNotFound,

    #[error("クリック後に新しいタブが開きませんでした")]
    NoNewPage,

    #[error("中継ページの読み込みタイムアウト")]
    IntermediateLoadTimeout,

    #[error("想定外のURL: {0}")]
    UnexpectedHost(String),

    #[error("Free Downloadボタンが見つかりません")]
    ControlNotFound,

    #[error("ボタンが{0}回のポーリングで有効になりませんでした")]
    EnableTimeout(u32),

    #[error("ブラウザ操作エラー: {0}")]
    Browser(String),
}

/// 解除フローの状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockState {
    Init,
    PageLoading,
    ButtonSearch,
    Scroll { selector: &'static str },
    Click { selector: &'static str },
    IntermediateLoad,
    CountdownWait,
    /// `attempt` は1始まりのポーリング回数
    PollEnable { attempt: u32 },
    Click2,
    Done,
    Failed(UnlockFailure),
}

impl UnlockState {
    pub fn name(&self) -> &'static str {
        match self {
            UnlockState::Init => "Init",
            UnlockState::PageLoading => "PageLoading",
            UnlockState::ButtonSearch => "ButtonSearch",
            UnlockState::Scroll { .. } => "Scroll",
            UnlockState::Click { .. } => "Click",
            UnlockState::IntermediateLoad => "IntermediateLoad",
            UnlockState::CountdownWait => "CountdownWait",
            UnlockState::PollEnable { .. } => "PollEnable",
            UnlockState::Click2 => "Click2",
            UnlockState::Done => "Done",
            UnlockState::Failed(_) => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UnlockState::Done | UnlockState::Failed(_))
    }
}

/// ボタン探索の結果から遷移
pub fn after_button_search(found: Option<&'static str>) -> UnlockState {
    match found {
        Some(selector) => UnlockState::Scroll { selector },
        None => UnlockState::Failed(UnlockFailure::ButtonNotFound),
    }
}

/// クリック後の新規タブ検出から遷移
pub fn after_new_page(opened: bool) -> UnlockState {
    if opened {
        UnlockState::IntermediateLoad
    } else {
        UnlockState::Failed(UnlockFailure::NoNewPage)
    }
}

/// 中継ページ読み込み後のURLから遷移
pub fn after_intermediate_load(url: &str, intermediate_host: &str) -> UnlockState {
    if url.contains(intermediate_host) {
        UnlockState::CountdownWait
    } else {
        UnlockState::Failed(UnlockFailure::UnexpectedHost(url.to_string()))
    }
}

/// カウントダウン待機後のボタン状態から遷移
pub fn after_countdown(control: ControlState) -> UnlockState {
    match control {
        ControlState::Enabled => UnlockState::Click2,
        ControlState::Disabled => UnlockState::PollEnable { attempt: 1 },
        ControlState::Missing => UnlockState::Failed(UnlockFailure::ControlNotFound),
    }
}

/// ポーリング1回分の結果から遷移
pub fn after_poll(control: ControlState, attempt: u32, max_attempts: u32) -> UnlockState {
    match control {
        ControlState::Enabled => UnlockState::Click2,
        ControlState::Missing => UnlockState::Failed(UnlockFailure::ControlNotFound),
        ControlState::Disabled if attempt >= max_attempts => {
            UnlockState::Failed(UnlockFailure::EnableTimeout(max_attempts))
        }
        ControlState::Disabled => UnlockState::PollEnable {
            attempt: attempt + 1,
        },
    }
}

/// 解除実行のレポート
#[derive(Debug, Clone)]
pub struct UnlockReport {
    pub game_url: String,
    pub final_state: UnlockState,
    /// 通過した状態（Init から終端状態まで）
    pub history: Vec<UnlockState>,
    pub intermediate_url: Option<String>,
    /// 成功時のみ（direct_link / wait_time 付き）
    pub download: Option<DownloadInfo>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl UnlockReport {
    pub fn is_success(&self) -> bool {
        self.final_state == UnlockState::Done
    }

    pub fn failure(&self) -> Option<&UnlockFailure> {
        match &self.final_state {
            UnlockState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// 指定の状態を通過したか
    pub fn visited(&self, name: &str) -> bool {
        self.history.iter().any(|state| state.name() == name)
    }
}
