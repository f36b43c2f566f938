//! ダウンロード解除テスト
//!
//! 実行方法:
//! ```
//! cargo run --example unlock_test -- https://steamunlocked.org/hades-free-download/
//! ```

use game_catalog_scraper::{ChromiumDriver, UnlockAutomaton, UnlockConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let game_url = std::env::args()
        .nth(1)
        .ok_or("usage: unlock_test <game-url>")?;
    let headless = std::env::var("HEADLESS").map(|v| v == "1").unwrap_or(false);

    println!("=== Unlock Test ===");
    println!("URL: {}", game_url);
    println!("Headless: {}", headless);
    println!();

    let config = UnlockConfig::new().with_headless(headless).with_debug(true);
    println!("Worst case: {:?}", config.worst_case_duration());

    let mut automaton = UnlockAutomaton::new(ChromiumDriver::new(config.clone()), config);
    let report = automaton.run(&game_url).await;

    let path: Vec<&str> = report.history.iter().map(|s| s.name()).collect();
    println!("States: {}", path.join(" -> "));
    println!("Elapsed: {:?}", report.elapsed);

    match report.failure() {
        None => {
            println!("成功! {:?}", report.download);
        }
        Some(reason) => {
            eprintln!("エラー: {}", reason);
        }
    }

    Ok(())
}
