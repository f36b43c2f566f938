//! chromiumoxide によるブラウザ操作

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::types::ControlState;
use crate::config::UnlockConfig;
use crate::error::ScraperError;
use crate::traits::BrowserDriver;

/// `document.readyState` の確認間隔
const READY_STATE_INTERVAL: Duration = Duration::from_millis(250);

/// 「Free Download」ボタンを探すJS（テキスト一致のボタン、なければ download クラスの要素）
const FREE_DOWNLOAD_LOCATOR: &str = r#"
    const byText = Array.from(document.querySelectorAll('button'))
        .find(b => (b.textContent || '').includes('Free Download'));
    const control = byText || document.querySelector("[class*='download']");
"#;

/// Chromium ドライバー
pub struct ChromiumDriver {
    config: UnlockConfig,
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
    user_data_dir: Option<PathBuf>,
    known_targets: HashSet<String>,
}

impl ChromiumDriver {
    pub fn new(config: UnlockConfig) -> Self {
        Self {
            config,
            browser: None,
            page: None,
            handler: None,
            user_data_dir: None,
            known_targets: HashSet::new(),
        }
    }

    /// 設定の実行ファイル、なければ環境変数
    fn chrome_executable(&self) -> Option<PathBuf> {
        self.config
            .chrome_executable
            .clone()
            .or_else(chrome_path_from_env)
    }

    fn browser(&self) -> Result<&Browser, ScraperError> {
        self.browser
            .as_ref()
            .ok_or_else(|| ScraperError::BrowserInit("Browser not initialized".to_string()))
    }

    fn page(&self) -> Result<&Page, ScraperError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::BrowserInit("Page not initialized".to_string()))
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, script: &str) -> Result<T, ScraperError> {
        self.page()?
            .evaluate(script)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| ScraperError::JavaScript(e.to_string()))
    }

    async fn target_ids(&self) -> Result<HashSet<String>, ScraperError> {
        let pages = self
            .browser()?
            .pages()
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        Ok(pages
            .iter()
            .map(|p| p.target_id().inner().clone())
            .collect())
    }
}

/// 環境変数で指定された Chrome のパス
fn chrome_path_from_env() -> Option<PathBuf> {
    std::env::var("CHROME_PATH")
        .or_else(|_| std::env::var("CHROMIUM_PATH"))
        .ok()
        .map(PathBuf::from)
}

/// 新規タブのナビゲーションが確定したか（初期の about:blank は未確定）
fn navigation_committed(url: Option<&str>) -> bool {
    match url.map(str::trim) {
        None | Some("") | Some("about:blank") => false,
        Some(_) => true,
    }
}

/// JSの文字列リテラルとしてセレクタを埋め込む
fn js_string(value: &str) -> Result<String, ScraperError> {
    serde_json::to_string(value).map_err(|e| ScraperError::JavaScript(e.to_string()))
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn launch(&mut self) -> Result<(), ScraperError> {
        info!("Launching browser (headless={})", self.config.headless);

        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("game-unlock-{}", unique_id));
        // 起動途中で失敗しても close() で削除できるよう先に記録
        self.user_data_dir = Some(user_data_dir.clone());

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&user_data_dir)
            .launch_timeout(self.config.launch_timeout);
        if let Some(path) = self.chrome_executable() {
            builder = builder.chrome_executable(path);
        }
        if !self.config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .no_sandbox()
            .window_size(1920, 1080)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", self.config.user_agent));

        if self.config.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        let browser_config = builder.build().map_err(ScraperError::BrowserInit)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        self.handler = Some(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        }));
        self.browser = Some(browser);

        let page = self
            .browser()?
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;
        self.page = Some(page);
        info!("Browser initialized successfully");

        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), ScraperError> {
        info!("Navigating to {}", url);
        self.page()?
            .goto(url)
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn has_element(&mut self, selector: &str) -> Result<bool, ScraperError> {
        let script = format!("document.querySelector({}) !== null", js_string(selector)?);
        self.eval::<bool>(&script).await
    }

    async fn scroll_into_view(&mut self, selector: &str) -> Result<(), ScraperError> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|_| ScraperError::ElementNotFound(selector.to_string()))?;
        element
            .scroll_into_view()
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;

        // 表示モードでは対象を枠で強調
        if !self.config.headless {
            let script = format!(
                "document.querySelector({}).style.border = '3px solid red'",
                js_string(selector)?
            );
            if let Err(e) = self.page()?.evaluate(script.as_str()).await {
                debug!("Failed to highlight element: {}", e);
            }
        }
        Ok(())
    }

    async fn click_opening_page(&mut self, selector: &str) -> Result<(), ScraperError> {
        self.known_targets = self.target_ids().await?;

        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|_| ScraperError::ElementNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;

        info!("Clicked {}", selector);
        Ok(())
    }

    async fn adopt_new_page(&mut self) -> Result<bool, ScraperError> {
        let pages = self
            .browser()?
            .pages()
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;

        let opened = pages
            .into_iter()
            .find(|p| !self.known_targets.contains(p.target_id().inner()));

        match opened {
            Some(page) => {
                info!("New tab opened: {}", page.target_id().inner());
                self.page = Some(page);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn wait_for_load(&mut self) -> Result<(), ScraperError> {
        loop {
            let url = self
                .page()?
                .url()
                .await
                .map_err(|e| ScraperError::Navigation(e.to_string()))?;

            // about:blank も readyState は complete になるため、URL確定を先に待つ
            if navigation_committed(url.as_deref()) {
                let state = self.eval::<String>("document.readyState").await?;
                if state == "interactive" || state == "complete" {
                    return Ok(());
                }
            }
            sleep(READY_STATE_INTERVAL).await;
        }
    }

    async fn current_url(&mut self) -> Result<String, ScraperError> {
        match self
            .page()?
            .url()
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?
        {
            Some(url) => Ok(url),
            None => self.eval::<String>("window.location.href").await,
        }
    }

    async fn free_download_state(&mut self) -> Result<ControlState, ScraperError> {
        let script = format!(
            r#"(() => {{
                {}
                if (!control) return 'Missing';
                return control.disabled ? 'Disabled' : 'Enabled';
            }})()"#,
            FREE_DOWNLOAD_LOCATOR
        );
        self.eval::<ControlState>(&script).await
    }

    async fn click_free_download(&mut self) -> Result<(), ScraperError> {
        let script = format!(
            r#"(() => {{
                {}
                if (!control) return false;
                control.click();
                return true;
            }})()"#,
            FREE_DOWNLOAD_LOCATOR
        );
        if self.eval::<bool>(&script).await? {
            info!("Clicked Free Download");
            Ok(())
        } else {
            Err(ScraperError::ElementNotFound("Free Download".to_string()))
        }
    }

    async fn debug_snapshot(&mut self) -> Option<String> {
        let page = self.page.as_ref()?;
        match page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
        {
            Ok(screenshot) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&screenshot);
                Some(format!("data:image/png;base64,{}", encoded))
            }
            Err(e) => {
                debug!("Screenshot failed: {}", e);
                None
            }
        }
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        self.page = None;
        self.known_targets.clear();

        let result = match self.browser.take() {
            Some(mut browser) => {
                let closed = browser
                    .close()
                    .await
                    .map(|_| ())
                    .map_err(|e| ScraperError::BrowserInit(e.to_string()));
                if let Err(e) = browser.wait().await {
                    warn!("Browser process did not exit cleanly: {}", e);
                }
                closed
            }
            None => Ok(()),
        };

        if let Some(handle) = self.handler.take() {
            handle.abort();
        }
        if let Some(dir) = self.user_data_dir.take() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                debug!("Failed to remove {}: {}", dir.display(), e);
            }
        }

        info!("Browser closed");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(
            js_string("a[href*='uploadhaven.com/download/']").unwrap(),
            r#""a[href*='uploadhaven.com/download/']""#
        );
        assert_eq!(js_string(r#"a[title="x"]"#).unwrap(), r#""a[title=\"x\"]""#);
    }

    #[test]
    fn test_blank_popup_is_not_committed() {
        assert!(!navigation_committed(None));
        assert!(!navigation_committed(Some("")));
        assert!(!navigation_committed(Some("about:blank")));
        assert!(navigation_committed(Some("https://uploadhaven.com/download/abc")));
    }

    #[test]
    fn test_configured_executable_wins() {
        let config = UnlockConfig::default().with_chrome_executable("/opt/chromium/chrome");
        let driver = ChromiumDriver::new(config);
        assert_eq!(
            driver.chrome_executable(),
            Some(PathBuf::from("/opt/chromium/chrome"))
        );
    }

    #[tokio::test]
    async fn test_failed_launch_still_removes_profile_dir() {
        let config =
            UnlockConfig::default().with_chrome_executable("/nonexistent/game-unlock-chrome");
        let mut driver = ChromiumDriver::new(config);

        assert!(matches!(
            driver.launch().await,
            Err(ScraperError::BrowserInit(_))
        ));
        let dir = driver.user_data_dir.clone().expect("profile dir recorded");
        assert!(driver.handler.is_none());

        // 起動途中で作られたプロファイルを想定
        std::fs::create_dir_all(&dir).unwrap();
        driver.close().await.unwrap();

        assert!(!dir.exists());
        assert!(driver.user_data_dir.is_none());
    }

    #[test]
    fn test_driver_starts_without_browser() {
        let driver = ChromiumDriver::new(UnlockConfig::default());
        assert!(driver.browser().is_err());
        assert!(driver.page().is_err());
    }

    #[tokio::test]
    #[ignore] // 実ブラウザが必要
    async fn test_launch_and_close() {
        let mut driver = ChromiumDriver::new(UnlockConfig::default());
        driver.launch().await.unwrap();
        driver
            .navigate("data:text/html,<a class='btn-download' href='#'>x</a>")
            .await
            .unwrap();
        assert!(driver.has_element("a.btn-download").await.unwrap());
        assert_eq!(driver.free_download_state().await.unwrap(), ControlState::Enabled);
        driver.close().await.unwrap();
    }
}
