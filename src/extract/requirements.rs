//! 動作環境ブロックの抽出

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{attr_matches, collapsed_text, css, pattern};
use crate::models::Requirements;

static CANDIDATES: Lazy<Selector> = Lazy::new(|| css("li, div, p, span"));
static DIV: Lazy<Selector> = Lazy::new(|| css("div"));
pub(crate) static REQUIREMENTS_CLASS: Lazy<Regex> = Lazy::new(|| pattern(r"system.*req"));

#[derive(Debug, Clone, Copy)]
enum Field {
    Os,
    Processor,
    Memory,
    Graphics,
    Storage,
}

/// 判定順のキーワード（小文字テキストに対する部分一致）
const FIELD_KEYWORDS: [(Field, &[&str]); 5] = [
    (Field::Os, &["os:", "operating system"]),
    (Field::Processor, &["processor:", "cpu:"]),
    (Field::Memory, &["memory:", "ram:"]),
    (Field::Graphics, &["graphics:", "gpu:", "video:"]),
    (Field::Storage, &["storage:", "disk:"]),
];

fn classify(lowered: &str) -> Option<Field> {
    FIELD_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(field, _)| *field)
}

/// 最初のコロン以降の値（コロンがなければ全体）
fn value_after_colon(text: &str) -> &str {
    text.split_once(':').map(|(_, v)| v).unwrap_or(text).trim()
}

/// 動作環境ブロックを解析
///
/// 子孫要素を文書順に走査し、同じフィールドに複数一致した場合は後勝ち
/// （値が空でも上書きする）。全フィールドが空なら `None`。
pub fn parse_requirements(block: ElementRef<'_>) -> Option<Requirements> {
    let mut reqs = Requirements::default();

    for element in block.select(&CANDIDATES) {
        let text = collapsed_text(element);
        let Some(field) = classify(&text.to_lowercase()) else {
            continue;
        };

        let value = Some(value_after_colon(&text).to_string());

        match field {
            Field::Os => reqs.os = value,
            Field::Processor => reqs.processor = value,
            Field::Memory => reqs.memory = value,
            Field::Graphics => reqs.graphics = value,
            Field::Storage => reqs.storage = value,
        }
    }

    if reqs.is_empty() {
        None
    } else {
        Some(reqs)
    }
}

/// HTML断片から動作環境を解析
///
/// `system…req` クラスのブロックがあればそれを、なければ断片全体を対象にする。
pub fn parse_requirements_html(html: &str) -> Option<Requirements> {
    let fragment = Html::parse_fragment(html);
    let block = fragment
        .select(&DIV)
        .find(|div| attr_matches(*div, "class", &REQUIREMENTS_CLASS))
        .unwrap_or_else(|| fragment.root_element());
    parse_requirements(block)
}
