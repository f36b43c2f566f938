use async_trait::async_trait;

use crate::error::ScraperError;
use crate::unlock::ControlState;

/// 解除オートメーションが使うブラウザ操作
///
/// 待機時間の上限は呼び出し側（オートメーション）が管理する。
#[async_trait]
pub trait BrowserDriver: Send {
    /// ブラウザ起動・ページ作成
    async fn launch(&mut self) -> Result<(), ScraperError>;

    /// URLへ遷移
    async fn navigate(&mut self, url: &str) -> Result<(), ScraperError>;

    /// セレクタに一致する要素があるか
    async fn has_element(&mut self, selector: &str) -> Result<bool, ScraperError>;

    /// 要素を表示領域までスクロール
    async fn scroll_into_view(&mut self, selector: &str) -> Result<(), ScraperError>;

    /// 新しいタブを開く要素をクリック
    async fn click_opening_page(&mut self, selector: &str) -> Result<(), ScraperError>;

    /// クリック後に開いたタブがあれば操作対象にして true を返す
    async fn adopt_new_page(&mut self) -> Result<bool, ScraperError>;

    /// 操作対象ページのDOM読み込み完了まで待機
    async fn wait_for_load(&mut self) -> Result<(), ScraperError>;

    /// 操作対象ページのURL
    async fn current_url(&mut self) -> Result<String, ScraperError>;

    /// 「Free Download」ボタンの状態
    async fn free_download_state(&mut self) -> Result<ControlState, ScraperError>;

    /// 「Free Download」ボタンをクリック
    async fn click_free_download(&mut self) -> Result<(), ScraperError>;

    /// 失敗時のデバッグ用スナップショット
    async fn debug_snapshot(&mut self) -> Option<String> {
        None
    }

    /// リソース解放
    async fn close(&mut self) -> Result<(), ScraperError>;
}
