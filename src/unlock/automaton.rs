//! ダウンロード解除オートメーション
//!
//! 状態ごとに1ステップ進め、全てのブラウザ操作と待機に上限を設ける。
//! どの入力でも `UnlockConfig::worst_case_duration` 以内に終端状態へ到達する。

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use super::types::{
    after_button_search, after_countdown, after_intermediate_load, after_new_page, after_poll,
    UnlockFailure, UnlockReport, UnlockState, DOWNLOAD_BUTTON_SELECTORS,
};
use crate::config::UnlockConfig;
use crate::error::ScraperError;
use crate::extract::identify_file_host;
use crate::models::DownloadInfo;
use crate::traits::BrowserDriver;

/// 新しいタブの確認間隔
const NEW_PAGE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 上限付きでブラウザ操作を実行
async fn bounded<T, F>(limit: Duration, action: &str, fut: F) -> Result<T, ScraperError>
where
    F: Future<Output = Result<T, ScraperError>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ScraperError::Timeout(format!("{} ({:?})", action, limit))),
    }
}

fn browser_failure(err: ScraperError) -> UnlockState {
    UnlockState::Failed(UnlockFailure::Browser(err.to_string()))
}

/// 1回の実行で収集する情報
#[derive(Debug, Default)]
struct RunContext {
    intermediate_url: Option<String>,
    waited: Duration,
}

/// ダウンロード解除オートメーション
pub struct UnlockAutomaton<D: BrowserDriver> {
    driver: D,
    config: UnlockConfig,
}

impl<D: BrowserDriver> UnlockAutomaton<D> {
    pub fn new(driver: D, config: UnlockConfig) -> Self {
        Self { driver, config }
    }

    pub fn config(&self) -> &UnlockConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// ゲームページから中継ページのダウンロードボタンまで進める
    ///
    /// 結果に関わらずブラウザは必ず閉じる。
    pub async fn run(&mut self, game_url: &str) -> UnlockReport {
        let started_at = Utc::now();
        let start = Instant::now();
        info!("Unlock started: {}", game_url);

        let mut ctx = RunContext::default();
        let mut state = UnlockState::Init;
        let mut history = vec![state.clone()];

        while !state.is_terminal() {
            let next = self.step(&state, game_url, &mut ctx).await;
            match (&state, &next) {
                (UnlockState::PollEnable { .. }, UnlockState::PollEnable { attempt }) => {
                    if attempt % 10 == 0 {
                        info!(
                            "Still waiting for button... ({}/{})",
                            attempt, self.config.max_poll_attempts
                        );
                    }
                }
                _ => info!("Unlock state: {} -> {}", state.name(), next.name()),
            }
            history.push(next.clone());
            state = next;
        }

        let download = match &state {
            UnlockState::Done => Some(self.download_info(&ctx).await),
            UnlockState::Failed(reason) => {
                warn!("Unlock failed: {}", reason);
                if self.config.debug {
                    let limit = self.config.action_timeout;
                    if let Ok(Some(shot)) = timeout(limit, self.driver.debug_snapshot()).await {
                        debug!("Failure screenshot: {}", shot);
                    }
                }
                None
            }
            _ => None,
        };

        if state == UnlockState::Done && !self.config.headless {
            info!("Keeping browser open for {:?}", self.config.hold_open);
            sleep(self.config.hold_open).await;
        }

        if let Err(e) = bounded(self.config.action_timeout, "close", self.driver.close()).await {
            warn!("Failed to close browser: {}", e);
        }

        let elapsed = start.elapsed();
        info!("Unlock finished: {} in {:?}", state.name(), elapsed);

        UnlockReport {
            game_url: game_url.to_string(),
            final_state: state,
            history,
            intermediate_url: ctx.intermediate_url,
            download,
            started_at,
            elapsed,
        }
    }

    async fn step(
        &mut self,
        state: &UnlockState,
        game_url: &str,
        ctx: &mut RunContext,
    ) -> UnlockState {
        let action_timeout = self.config.action_timeout;

        match state {
            UnlockState::Init => {
                // 起動そのものは launch_timeout、最初のページ作成に action_timeout
                let limit = self.config.launch_timeout + action_timeout;
                match bounded(limit, "launch", self.driver.launch()).await {
                    Ok(()) => UnlockState::PageLoading,
                    Err(e) => UnlockState::Failed(UnlockFailure::Launch(e.to_string())),
                }
            }

            UnlockState::PageLoading => {
                let limit = self.config.page_load_timeout;
                match bounded(limit, "navigate", self.driver.navigate(game_url)).await {
                    Ok(()) => {
                        sleep(self.config.settle_delay).await;
                        UnlockState::ButtonSearch
                    }
                    Err(ScraperError::Timeout(_)) => {
                        UnlockState::Failed(UnlockFailure::PageLoadTimeout)
                    }
                    Err(e) => UnlockState::Failed(UnlockFailure::Navigation(e.to_string())),
                }
            }

            UnlockState::ButtonSearch => {
                let mut found = None;
                for selector in DOWNLOAD_BUTTON_SELECTORS {
                    match bounded(action_timeout, "button lookup", self.driver.has_element(selector)).await {
                        Ok(true) => {
                            info!("Found download button: {}", selector);
                            found = Some(selector);
                            break;
                        }
                        Ok(false) => debug!("No match for {}", selector),
                        Err(e) => debug!("Lookup of {} failed: {}", selector, e),
                    }
                }
                after_button_search(found)
            }

            UnlockState::Scroll { selector } => {
                match bounded(action_timeout, "scroll", self.driver.scroll_into_view(selector)).await {
                    Ok(()) => {
                        sleep(self.config.scroll_settle).await;
                        UnlockState::Click {
                            selector: *selector,
                        }
                    }
                    Err(e) => browser_failure(e),
                }
            }

            UnlockState::Click { selector } => {
                if let Err(e) =
                    bounded(action_timeout, "click", self.driver.click_opening_page(selector)).await
                {
                    return browser_failure(e);
                }
                after_new_page(self.wait_new_page().await)
            }

            UnlockState::IntermediateLoad => {
                let limit = self.config.intermediate_load_timeout;
                match bounded(limit, "intermediate load", self.driver.wait_for_load()).await {
                    Ok(()) => {}
                    Err(ScraperError::Timeout(_)) => {
                        return UnlockState::Failed(UnlockFailure::IntermediateLoadTimeout)
                    }
                    Err(e) => return browser_failure(e),
                }

                match bounded(action_timeout, "current url", self.driver.current_url()).await {
                    Ok(url) => {
                        info!("Intermediate page: {}", url);
                        let next = after_intermediate_load(&url, &self.config.intermediate_host);
                        ctx.intermediate_url = Some(url);
                        next
                    }
                    Err(e) => browser_failure(e),
                }
            }

            UnlockState::CountdownWait => {
                info!("Waiting {:?} for countdown", self.config.countdown_wait);
                sleep(self.config.countdown_wait).await;
                ctx.waited += self.config.countdown_wait;

                match bounded(action_timeout, "control check", self.driver.free_download_state()).await {
                    Ok(control) => after_countdown(control),
                    Err(e) => browser_failure(e),
                }
            }

            UnlockState::PollEnable { attempt } => {
                let max = self.config.max_poll_attempts;
                if *attempt > max {
                    return UnlockState::Failed(UnlockFailure::EnableTimeout(max));
                }

                sleep(self.config.poll_interval).await;
                ctx.waited += self.config.poll_interval;

                match bounded(action_timeout, "control check", self.driver.free_download_state()).await {
                    Ok(control) => after_poll(control, *attempt, max),
                    Err(e) => browser_failure(e),
                }
            }

            UnlockState::Click2 => {
                match bounded(action_timeout, "free download", self.driver.click_free_download()).await {
                    Ok(()) => UnlockState::Done,
                    Err(e) => browser_failure(e),
                }
            }

            UnlockState::Done | UnlockState::Failed(_) => state.clone(),
        }
    }

    /// 新しいタブが開くまで待機（`new_page_timeout` まで）
    async fn wait_new_page(&mut self) -> bool {
        let driver = &mut self.driver;
        let watch = async {
            loop {
                match driver.adopt_new_page().await {
                    Ok(true) => return true,
                    Ok(false) => {}
                    Err(e) => debug!("New page check failed: {}", e),
                }
                sleep(NEW_PAGE_POLL_INTERVAL).await;
            }
        };
        timeout(self.config.new_page_timeout, watch)
            .await
            .unwrap_or(false)
    }

    /// 完了時のダウンロード情報
    async fn download_info(&mut self, ctx: &RunContext) -> DownloadInfo {
        let intermediate = ctx.intermediate_url.clone().unwrap_or_default();
        let mut info = DownloadInfo::new(identify_file_host(&intermediate), intermediate);
        info.wait_time = Some(ctx.waited.as_secs());

        match bounded(self.config.action_timeout, "current url", self.driver.current_url()).await {
            Ok(url) if url != info.download_url => info.direct_link = Some(url),
            Ok(_) => {}
            Err(e) => debug!("Could not read final URL: {}", e),
        }
        info
    }
}
