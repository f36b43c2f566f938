use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;
use tower::Service;
use tracing::{info, warn};
use url::Url;

use crate::config::UnlockConfig;
use crate::error::ScraperError;
use crate::traits::BrowserDriver;
use crate::unlock::{ChromiumDriver, UnlockAutomaton, UnlockReport};

/// ダウンロード解除リクエスト
#[derive(Debug, Clone)]
pub struct UnlockRequest {
    pub game_url: String,
    pub headless: bool,
}

impl UnlockRequest {
    pub fn new(game_url: impl Into<String>) -> Self {
        Self {
            game_url: game_url.into(),
            headless: true,
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

/// 受付応答（結果はログでのみ報告される）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockAck {
    pub run_id: u64,
    pub game_url: String,
    pub headless: bool,
    pub message: String,
}

type DriverFactory<D> = Arc<dyn Fn(UnlockConfig) -> D + Send + Sync>;

/// tower::Serviceを実装したダウンロード解除サービス
///
/// 各リクエストは独立したブラウザで別タスクとして実行され、
/// 呼び出し側には受付応答だけを即座に返す。
pub struct UnlockService<D: BrowserDriver + 'static = ChromiumDriver> {
    config: UnlockConfig,
    driver_factory: DriverFactory<D>,
    next_run_id: Arc<AtomicU64>,
}

impl<D: BrowserDriver + 'static> Clone for UnlockService<D> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            driver_factory: Arc::clone(&self.driver_factory),
            next_run_id: Arc::clone(&self.next_run_id),
        }
    }
}

impl UnlockService<ChromiumDriver> {
    pub fn new(config: UnlockConfig) -> Self {
        Self::with_driver_factory(config, ChromiumDriver::new)
    }
}

impl Default for UnlockService<ChromiumDriver> {
    fn default() -> Self {
        Self::new(UnlockConfig::default())
    }
}

impl<D: BrowserDriver + 'static> UnlockService<D> {
    pub fn with_driver_factory<F>(config: UnlockConfig, factory: F) -> Self
    where
        F: Fn(UnlockConfig) -> D + Send + Sync + 'static,
    {
        Self {
            config,
            driver_factory: Arc::new(factory),
            next_run_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// 解除を別タスクで開始（完了を待つ場合はハンドルを await する）
    pub fn spawn_run(&self, game_url: String, headless: bool) -> JoinHandle<UnlockReport> {
        let config = self.config.clone().with_headless(headless);
        let driver = (self.driver_factory)(config.clone());

        tokio::spawn(async move {
            let mut automaton = UnlockAutomaton::new(driver, config);
            automaton.run(&game_url).await
        })
    }

    fn validate(game_url: &str) -> Result<(), ScraperError> {
        let url = Url::parse(game_url)
            .map_err(|e| ScraperError::InvalidUrl(format!("{}: {}", game_url, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ScraperError::InvalidUrl(format!(
                "{}: unsupported scheme {}",
                game_url, scheme
            ))),
        }
    }
}

impl<D: BrowserDriver + 'static> Service<UnlockRequest> for UnlockService<D> {
    type Response = UnlockAck;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: UnlockRequest) -> Self::Future {
        info!("ダウンロード解除リクエスト受信: url={}", req.game_url);

        if let Err(e) = Self::validate(&req.game_url) {
            warn!("リクエストを拒否: {}", e);
            return Box::pin(async move { Err(e) });
        }

        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let handle = self.spawn_run(req.game_url.clone(), req.headless);

        // 結果はログでのみ報告
        tokio::spawn(async move {
            match handle.await {
                Ok(report) if report.is_success() => {
                    info!(
                        "解除完了: run_id={}, elapsed={:?}, download={:?}",
                        run_id, report.elapsed, report.download
                    );
                }
                Ok(report) => {
                    warn!(
                        "解除失敗: run_id={}, state={:?}, elapsed={:?}",
                        run_id, report.final_state, report.elapsed
                    );
                }
                Err(e) => warn!("解除タスク異常終了: run_id={}, error={}", run_id, e),
            }
        });

        let ack = UnlockAck {
            run_id,
            game_url: req.game_url,
            headless: req.headless,
            message: "Download unlock started".to_string(),
        };
        Box::pin(async move { Ok(ack) })
    }
}
