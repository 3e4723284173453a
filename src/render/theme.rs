//! Fixed visual theme and HTML card templates.
//!
//! Three 1080x1080 cards are produced per rotation: the quote card, the
//! value-name card and the value-description card. Colors and typography are
//! deliberately constant so every post carries the same branding.

use crate::model::{CoreValue, Quote};
use html_escape::encode_text;

pub const CARD_SIZE: u32 = 1080;

const BACKGROUND: &str = "#10151f";
const ACCENT: &str = "#e8b34b";
const FOREGROUND: &str = "#f4f1ea";
const FONT_STACK: &str = "'Georgia', 'Times New Roman', serif";

fn card(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><style>
html, body {{ margin: 0; padding: 0; }}
.card {{
  width: {size}px; height: {size}px; box-sizing: border-box;
  display: flex; flex-direction: column; justify-content: center;
  padding: 96px; background: {bg}; color: {fg};
  font-family: {font};
}}
.rule {{ width: 120px; border-top: 6px solid {accent}; margin-bottom: 48px; }}
.kicker {{ color: {accent}; font-size: 34px; letter-spacing: 6px; text-transform: uppercase; margin-bottom: 32px; }}
.title {{ font-size: 110px; line-height: 1.1; }}
.quote {{ font-size: 64px; line-height: 1.35; font-style: italic; }}
.body {{ font-size: 52px; line-height: 1.4; }}
.attribution {{ color: {accent}; font-size: 40px; margin-top: 56px; }}
</style></head>
<body><div class="card">{body}</div></body></html>
"#,
        size = CARD_SIZE,
        bg = BACKGROUND,
        fg = FOREGROUND,
        accent = ACCENT,
        font = FONT_STACK,
        body = body,
    )
}

pub fn quote_card_html(quote: &Quote) -> String {
    let body = format!(
        r#"<div class="rule"></div><div class="quote">&ldquo;{}&rdquo;</div><div class="attribution">&mdash; {}</div>"#,
        encode_text(&quote.text),
        encode_text(&quote.author),
    );
    card(&body)
}

pub fn value_name_card_html(value: &CoreValue) -> String {
    let body = format!(
        r#"<div class="kicker">Core Value</div><div class="rule"></div><div class="title">{}</div>"#,
        encode_text(&value.name),
    );
    card(&body)
}

pub fn value_description_card_html(value: &CoreValue) -> String {
    let body = format!(
        r#"<div class="kicker">{}</div><div class="rule"></div><div class="body">{}</div>"#,
        encode_text(&value.name),
        encode_text(&value.description),
    );
    card(&body)
}
