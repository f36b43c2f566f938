//! ダウンロードリンクの特定
//!
//! 複数の抽出方法を順番に試し、最初に成功したものを採用する。

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::{collapsed_text, css, find_file_size, nearest_ancestor, pattern};
use crate::models::{DownloadInfo, FileHost};

static DOWNLOAD_BUTTON: Lazy<Selector> = Lazy::new(|| css("a.btn-download"));
static UPLOADHAVEN_LINK: Lazy<Selector> =
    Lazy::new(|| css(r#"a[href*="uploadhaven.com/download/"]"#));
static INSTRUCTION_CANDIDATES: Lazy<Selector> = Lazy::new(|| css("p, div, span"));
static ANY_LINK: Lazy<Selector> = Lazy::new(|| css("a[href]"));
static INSTRUCTION: Lazy<Regex> =
    Lazy::new(|| pattern(r"download.*for pc using the link below"));

/// 既知ホストのリンクに含まれる文字列
const KNOWN_HOST_PATHS: [&str; 3] = ["uploadhaven.com/download/", "megaup.net/", "pixeldrain.com/"];

/// ドメインからホストを判定する順序付きリスト
const HOST_PATTERNS: [(&str, FileHost); 6] = [
    ("uploadhaven", FileHost::UploadHaven),
    ("megaup", FileHost::MegaUp),
    ("pixeldrain", FileHost::PixelDrain),
    ("rapidgator", FileHost::RapidGator),
    ("nitroflare", FileHost::NitroFlare),
    ("uploaded", FileHost::Uploaded),
];

/// 抽出方法
pub struct ResolveStrategy {
    pub name: &'static str,
    pub run: fn(&Html) -> Option<DownloadInfo>,
}

/// 試行順の抽出方法
pub const STRATEGIES: [ResolveStrategy; 4] = [
    ResolveStrategy {
        name: "download-button",
        run: from_download_button,
    },
    ResolveStrategy {
        name: "host-path",
        run: from_host_path,
    },
    ResolveStrategy {
        name: "instruction-text",
        run: from_instruction_text,
    },
    ResolveStrategy {
        name: "known-host-scan",
        run: from_known_host_scan,
    },
];

/// ダウンロードリンクを特定
pub fn resolve(document: &Html) -> Option<DownloadInfo> {
    STRATEGIES.iter().find_map(|strategy| {
        let info = (strategy.run)(document);
        if let Some(ref info) = info {
            debug!(
                "Download link resolved by {}: {} ({})",
                strategy.name, info.download_url, info.file_host
            );
        }
        info
    })
}

/// URLのドメインからファイルホストを判定
pub fn identify_file_host(url: &str) -> FileHost {
    let domain = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default();

    HOST_PATTERNS
        .iter()
        .find(|(needle, _)| domain.contains(needle))
        .map(|(_, host)| *host)
        .unwrap_or(FileHost::Unknown)
}

fn href(link: ElementRef<'_>) -> Option<&str> {
    link.value().attr("href").map(str::trim).filter(|h| !h.is_empty())
}

fn size_near(container: Option<ElementRef<'_>>) -> Option<String> {
    container.and_then(|c| find_file_size(&collapsed_text(c)))
}

/// 1. `btn-download` ボタン（絶対URLのみ）
fn from_download_button(document: &Html) -> Option<DownloadInfo> {
    let button = document.select(&DOWNLOAD_BUTTON).next()?;
    let url = href(button).filter(|h| h.starts_with("http"))?;

    let container = nearest_ancestor(button, "div").or_else(|| nearest_ancestor(button, "p"));
    Some(DownloadInfo::new(identify_file_host(url), url).with_file_size(size_near(container)))
}

/// 2. UploadHaven のダウンロードパスを持つリンク
fn from_host_path(document: &Html) -> Option<DownloadInfo> {
    let link = document.select(&UPLOADHAVEN_LINK).next()?;
    let url = href(link)?;

    let container = nearest_ancestor(link, "div");
    Some(DownloadInfo::new(FileHost::UploadHaven, url).with_file_size(size_near(container)))
}

/// 3. 「... for PC using the link below」の案内文
///
/// 文書順に走査し、案内文を含みリンクを持つ最初の要素を使う。
fn from_instruction_text(document: &Html) -> Option<DownloadInfo> {
    document.select(&INSTRUCTION_CANDIDATES).find_map(|section| {
        let text = collapsed_text(section);
        if !INSTRUCTION.is_match(&text) {
            return None;
        }
        let link = section.select(&ANY_LINK).find_map(href)?;
        let size = find_file_size(&text);
        Some(DownloadInfo::new(identify_file_host(link), link).with_file_size(size))
    })
}

/// 4. 全リンクから既知ホストを探す（サイズなし）
fn from_known_host_scan(document: &Html) -> Option<DownloadInfo> {
    document
        .select(&ANY_LINK)
        .filter_map(href)
        .find(|url| KNOWN_HOST_PATHS.iter().any(|p| url.contains(p)))
        .map(|url| DownloadInfo::new(identify_file_host(url), url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{}</body></html>", body))
    }

    #[test]
    fn test_identify_file_host() {
        assert_eq!(
            identify_file_host("https://uploadhaven.com/download/x"),
            FileHost::UploadHaven
        );
        assert_eq!(identify_file_host("https://megaup.net/abc/file"), FileHost::MegaUp);
        assert_eq!(identify_file_host("https://PixelDrain.com/u/1"), FileHost::PixelDrain);
        assert_eq!(identify_file_host("https://rapidgator.net/file/1"), FileHost::RapidGator);
        assert_eq!(identify_file_host("https://nitroflare.com/view/1"), FileHost::NitroFlare);
        assert_eq!(identify_file_host("https://uploaded.net/file/1"), FileHost::Uploaded);
        assert_eq!(identify_file_host("https://example.com/uploadhaven"), FileHost::Unknown);
        assert_eq!(identify_file_host("not a url"), FileHost::Unknown);
        assert_eq!(
            identify_file_host("https://uploadhaven.com/download/x").as_str(),
            "UploadHaven"
        );
    }

    #[test]
    fn test_download_button_with_size() {
        let html = doc(r#"<div class="dl-box">
                <p>Size: 12.5 GB</p>
                <a class="btn-download" href="https://uploadhaven.com/download/abc">Download</a>
            </div>"#);

        let info = resolve(&html).expect("download info");
        assert_eq!(info.download_url, "https://uploadhaven.com/download/abc");
        assert_eq!(info.file_host, FileHost::UploadHaven);
        assert_eq!(info.file_size.as_deref(), Some("12.5 GB"));
        assert!(info.direct_link.is_none());
        assert!(info.wait_time.is_none());
    }

    #[test]
    fn test_earlier_strategy_wins_over_known_host_scan() {
        let html = doc(r#"
            <a href="https://pixeldrain.com/u/first-in-document">mirror</a>
            <div><a class="btn-download" href="https://megaup.net/xyz/game.zip">Download</a> 900 MB</div>"#);

        let info = resolve(&html).expect("download info");
        assert_eq!(info.download_url, "https://megaup.net/xyz/game.zip");
        assert_eq!(info.file_host, FileHost::MegaUp);
        assert_eq!(info.file_size.as_deref(), Some("900 MB"));
    }

    #[test]
    fn test_relative_button_falls_through_to_host_path() {
        let html = doc(r#"
            <a class="btn-download" href="/go/123">Download</a>
            <div>2 GB <a href="https://uploadhaven.com/download/real">mirror</a></div>"#);

        let info = resolve(&html).expect("download info");
        assert_eq!(info.download_url, "https://uploadhaven.com/download/real");
        assert_eq!(info.file_host, FileHost::UploadHaven);
        assert_eq!(info.file_size.as_deref(), Some("2 GB"));
    }

    #[test]
    fn test_instruction_text_uses_first_section_in_document_order() {
        // 外側の wrapper が先に一致し、その最初のリンクが使われる
        let html = doc(r#"
            <div class="wrapper">
                <nav><a href="https://steamunlocked.org/">Home</a></nav>
                <p>Download Celeste for PC using the link below. Size: 1.2 GB
                    <a href="https://rapidgator.net/file/celeste">here</a></p>
            </div>"#);

        let info = resolve(&html).expect("download info");
        assert_eq!(info.download_url, "https://steamunlocked.org/");
        assert_eq!(info.file_host, FileHost::Unknown);
        assert_eq!(info.file_size.as_deref(), Some("1.2 GB"));
    }

    #[test]
    fn test_instruction_text_skips_sections_without_links() {
        let html = doc(r#"
            <p>Download Celeste for PC using the link below.</p>
            <span>Download Celeste for PC using the link below:
                <a href="https://megaup.net/abc/celeste.zip">MegaUp</a> 800 MB</span>"#);

        let info = resolve(&html).expect("download info");
        assert_eq!(info.download_url, "https://megaup.net/abc/celeste.zip");
        assert_eq!(info.file_host, FileHost::MegaUp);
        assert_eq!(info.file_size.as_deref(), Some("800 MB"));
    }

    #[test]
    fn test_instruction_text_container_holds_link() {
        let html = doc(r#"
            <div class="download-section">
                <p>Download Hades for PC using the link below.</p>
                <p><a href="https://nitroflare.com/view/hades">Get it</a> 15 GB</p>
            </div>"#);

        let info = resolve(&html).expect("download info");
        assert_eq!(info.download_url, "https://nitroflare.com/view/hades");
        assert_eq!(info.file_size.as_deref(), Some("15 GB"));
    }

    #[test]
    fn test_known_host_scan_without_size() {
        let html = doc(r#"
            <a href="https://example.com/">Other</a>
            <div>5 GB <a href="https://pixeldrain.com/u/abc">mirror</a></div>"#);

        let info = resolve(&html).expect("download info");
        assert_eq!(info.download_url, "https://pixeldrain.com/u/abc");
        assert_eq!(info.file_host, FileHost::PixelDrain);
        assert!(info.file_size.is_none());
    }

    #[test]
    fn test_nothing_found() {
        let html = doc(r#"<p>No downloads</p><a href="https://example.com/">link</a>"#);
        assert!(resolve(&html).is_none());
    }
}
