//! レート制限付きHTTPフェッチャー

use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS, USER_AGENT};
use reqwest::Client;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;

/// ローテーション用のUser-Agent
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_EN: &str = "en-US,en;q=0.5";

/// 呼び出し毎にランダムなUser-Agentを選ぶ
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// リクエスト間隔の制御
///
/// 最後のリクエスト時刻を保持し、次のリクエストまで最低間隔を空ける。
/// 単一所有者前提（`&mut self` でのみ更新）。
#[derive(Debug, Clone)]
pub struct RequestPacer {
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn last_request(&self) -> Option<Instant> {
        self.last_request
    }

    /// `now` 時点で必要な待機時間
    pub fn delay_needed(&self, now: Instant) -> Duration {
        match self.last_request {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                self.min_interval.saturating_sub(elapsed)
            }
            None => Duration::ZERO,
        }
    }

    /// 最低間隔に達するまで待機
    pub async fn wait_turn(&self) {
        let delay = self.delay_needed(Instant::now());
        if !delay.is_zero() {
            debug!("Rate limiting: sleeping {:?}", delay);
            sleep(delay).await;
        }
    }

    /// レスポンス取得時刻を記録
    pub fn mark(&mut self) {
        self.last_request = Some(Instant::now());
    }
}

/// 取得結果
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// レート制限付きフェッチャー
///
/// 並行タスクで共有する場合は呼び出し側で `tokio::sync::Mutex` に包むこと。
pub struct RateLimitedFetcher {
    client: Client,
    pacer: RequestPacer,
}

impl RateLimitedFetcher {
    pub fn new(min_interval: Duration) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ScraperError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            pacer: RequestPacer::new(min_interval),
        })
    }

    pub fn from_config(config: &ScraperConfig) -> Result<Self, ScraperError> {
        Self::new(config.request_delay)
    }

    pub fn min_interval(&self) -> Duration {
        self.pacer.min_interval()
    }

    /// 最後にレスポンスを受け取った時刻
    pub fn last_request_at(&self) -> Option<Instant> {
        self.pacer.last_request()
    }

    /// GETリクエストを実行
    ///
    /// 通信エラーは `ScraperError::Request` にまとめて返す。HTTPステータスは
    /// エラー扱いしない（呼び出し側が判断する）。
    pub async fn fetch(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> Result<FetchResponse, ScraperError> {
        self.pacer.wait_turn().await;

        let user_agent = random_user_agent();
        debug!("GET {} (ua={})", url, user_agent);

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_EN)
            .header(UPGRADE_INSECURE_REQUESTS, "1")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                warn!("Request to {} failed: {}", url, e);
                ScraperError::Request(e.to_string())
            })?;

        self.pacer.mark();

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        debug!("Response {} from {} ({} bytes)", status, final_url, body.len());

        Ok(FetchResponse {
            url: final_url,
            status,
            body,
        })
    }
}
