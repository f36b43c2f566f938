use std::path::PathBuf;
use std::time::Duration;

/// 対象サイトのデフォルトURL
pub const DEFAULT_BASE_URL: &str = "https://steamunlocked.org";

/// 解除フローで使う中継ホスト
pub const DEFAULT_INTERMEDIATE_HOST: &str = "uploadhaven.com";

/// ブラウザセッション用のUser-Agent
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// カタログ取得の設定
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    pub request_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ScraperConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// ダウンロード解除オートメーションの設定
///
/// 各待機時間は対象サイトのカウントダウン仕様に合わせたデフォルト値。
/// サイト側の挙動が変わった場合に備えて全て変更可能にしている。
#[derive(Debug, Clone)]
pub struct UnlockConfig {
    /// ヘッドレスモード
    pub headless: bool,
    /// ブラウザ起動の上限（プロセス起動とCDP接続）
    pub launch_timeout: Duration,
    /// Chrome 実行ファイル（未指定なら CHROME_PATH / CHROMIUM_PATH、なければ自動検出）
    pub chrome_executable: Option<PathBuf>,
    /// ゲームページのDOM読み込み上限
    pub page_load_timeout: Duration,
    /// 読み込み後の動的コンテンツ待機
    pub settle_delay: Duration,
    /// スクロール後の待機
    pub scroll_settle: Duration,
    /// クリック後に新しいタブが開くまでの上限
    pub new_page_timeout: Duration,
    /// 中継ページのDOM読み込み上限
    pub intermediate_load_timeout: Duration,
    /// 中継ページでのカウントダウン待機（サイト側の最低待機時間）
    pub countdown_wait: Duration,
    /// ボタン有効化ポーリング間隔
    pub poll_interval: Duration,
    /// ボタン有効化ポーリング回数上限
    pub max_poll_attempts: u32,
    /// 個々のブラウザ操作の上限
    pub action_timeout: Duration,
    /// 完了後にブラウザを開いたままにする時間（ヘッドレス時は無視）
    pub hold_open: Duration,
    /// 中継ホスト（URLにこの文字列を含むこと）
    pub intermediate_host: String,
    /// ブラウザのUser-Agent
    pub user_agent: String,
    /// デバッグモード（失敗時スクリーンショットをログ出力）
    pub debug: bool,
}

impl Default for UnlockConfig {
    fn default() -> Self {
        Self {
            headless: true,
            launch_timeout: Duration::from_secs(30),
            chrome_executable: None,
            page_load_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(2),
            scroll_settle: Duration::from_secs(1),
            new_page_timeout: Duration::from_secs(10),
            intermediate_load_timeout: Duration::from_secs(15),
            countdown_wait: Duration::from_secs(16),
            poll_interval: Duration::from_secs(1),
            max_poll_attempts: 60,
            action_timeout: Duration::from_secs(10),
            hold_open: Duration::from_secs(30),
            intermediate_host: DEFAULT_INTERMEDIATE_HOST.to_string(),
            user_agent: BROWSER_USER_AGENT.to_string(),
            debug: false,
        }
    }
}

impl UnlockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_launch_timeout(mut self, timeout: Duration) -> Self {
        self.launch_timeout = timeout;
        self
    }

    pub fn with_chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_executable = Some(path.into());
        self
    }

    pub fn with_countdown_wait(mut self, wait: Duration) -> Self {
        self.countdown_wait = wait;
        self
    }

    pub fn with_polling(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    pub fn with_hold_open(mut self, hold_open: Duration) -> Self {
        self.hold_open = hold_open;
        self
    }

    pub fn with_intermediate_host(mut self, host: impl Into<String>) -> Self {
        self.intermediate_host = host.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// 全ステージの上限の合計（固定オーバーヘッド含む）
    ///
    /// どの入力でもこの時間内に終端状態へ到達する。
    pub fn worst_case_duration(&self) -> Duration {
        // launch(+new page), button x2, scroll, click, url x2, control check, click2, snapshot, close
        let bounded_actions = 11;
        let poll_total = (self.poll_interval + self.action_timeout) * self.max_poll_attempts;
        self.launch_timeout
            + self.action_timeout * bounded_actions
            + self.page_load_timeout
            + self.settle_delay
            + self.scroll_settle
            + self.new_page_timeout
            + self.intermediate_load_timeout
            + self.countdown_wait
            + poll_total
            + if self.headless {
                Duration::ZERO
            } else {
                self.hold_open
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scraper_config_builder() {
        let config = ScraperConfig::new("https://example.org/")
            .with_request_delay(Duration::from_millis(250))
            .with_request_timeout(Duration::from_secs(5));

        assert_eq!(config.base_url, "https://example.org");
        assert_eq!(config.request_delay, Duration::from_millis(250));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_unlock_config_defaults() {
        let config = UnlockConfig::default();
        assert_eq!(config.page_load_timeout, Duration::from_secs(30));
        assert_eq!(config.settle_delay, Duration::from_secs(2));
        assert_eq!(config.intermediate_load_timeout, Duration::from_secs(15));
        assert_eq!(config.countdown_wait, Duration::from_secs(16));
        assert_eq!(config.max_poll_attempts, 60);
        assert_eq!(config.intermediate_host, "uploadhaven.com");
        assert!(config.headless);
    }

    #[test]
    fn test_worst_case_includes_launch_timeout() {
        let base = UnlockConfig::default();
        let slow = UnlockConfig::default().with_launch_timeout(base.launch_timeout * 3);
        assert_eq!(
            slow.worst_case_duration() - base.worst_case_duration(),
            base.launch_timeout * 2
        );
        assert!(base.launch_timeout > base.action_timeout);
    }

    #[test]
    fn test_worst_case_includes_hold_open_only_with_head() {
        let headless = UnlockConfig::default();
        let headed = UnlockConfig::default().with_headless(false);
        assert_eq!(
            headed.worst_case_duration() - headless.worst_case_duration(),
            headed.hold_open
        );
    }
}
