//! ブラウザ操作によるダウンロード解除
//!
//! ゲームページのダウンロードボタンから中継ページ（UploadHaven）を開き、
//! カウントダウン後に「Free Download」ボタンを押すまでを自動化する。

mod automaton;
mod chromium;
mod types;

pub use automaton::UnlockAutomaton;
pub use chromium::ChromiumDriver;
pub use types::{
    after_button_search, after_countdown, after_intermediate_load, after_new_page, after_poll,
    ControlState, UnlockFailure, UnlockReport, UnlockState, DOWNLOAD_BUTTON_SELECTORS,
};
