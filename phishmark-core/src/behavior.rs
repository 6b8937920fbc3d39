//! Behavioral checks over a parsed page: status-bar tampering, disabled right
//! click, pop-ups that ask for input, and borderless iframes.
//!
//! Every check is conservative: a single match anywhere in the document is
//! enough to report the behavior.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static MOUSEOVER_ATTR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[onmouseover]").unwrap());
static MOUSE_HANDLERS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[oncontextmenu], [onmousedown], [onmouseup], [onclick]").unwrap()
});
static ONCLICK_ATTR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[onclick]").unwrap());
static CLASSED: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[class]").unwrap());
static INPUT_FIELDS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input, textarea, [contenteditable]").unwrap());
static IFRAMES: LazyLock<Selector> = LazyLock::new(|| Selector::parse("iframe").unwrap());
static INLINE_SCRIPTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script:not([src])").unwrap());

static STATUS_IN_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:window\.)?status").unwrap());
static STATUS_IN_SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)onmouseover|mouseover|window\.status|status\s*=").unwrap());

static RIGHT_CLICK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)event\.button\s*==+\s*2",
        r"|event\.which\s*==+\s*3",
        r#"|oncontextmenu\s*=\s*["']?\s*return\s+false"#,
        r"|preventDefault\s*\(\s*\)",
        r"|return\s+false",
        r"|contextmenu",
    ))
    .unwrap()
});

static POPUP_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)modal|popup|dialog").unwrap());
static POPUP_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)window\.open\s*\(|showModalDialog\s*\(|popup|modal|dialog").unwrap()
});
static INPUT_IN_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<input[^>]*type\s*=\s*["']?text|<textarea|contenteditable|prompt\s*\("#)
        .unwrap()
});

static BORDERLESS_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)border(?:-width|-style)?\s*:\s*(?:none\b|0(?:px|em|rem|%)?(?:[\s;!]|$))")
        .unwrap()
});
static FRAMEBORDER_IN_SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)frameborder").unwrap());
static BORDERLESS_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:0|false|none)\b").unwrap());

/// Characters searched on either side of a pop-up call for an input field.
const POPUP_INPUT_WINDOW: usize = 100;

fn inline_scripts(document: &Html) -> impl Iterator<Item = String> + '_ {
    document
        .select(&INLINE_SCRIPTS)
        .map(|script| script.text().collect::<String>())
}

/// `onmouseover` handlers or scripts that rewrite the status bar.
pub fn manipulates_status_bar(document: &Html) -> bool {
    let in_handler = document.select(&MOUSEOVER_ATTR).any(|el| {
        el.value()
            .attr("onmouseover")
            .is_some_and(|handler| STATUS_IN_HANDLER.is_match(handler))
    });

    in_handler || inline_scripts(document).any(|script| STATUS_IN_SCRIPT.is_match(&script))
}

pub fn disables_right_click(document: &Html) -> bool {
    let in_handler = document.select(&MOUSE_HANDLERS).any(|el| {
        ["oncontextmenu", "onmousedown", "onmouseup", "onclick"]
            .iter()
            .filter_map(|attr| el.value().attr(attr))
            .any(|handler| RIGHT_CLICK.is_match(handler))
    });

    in_handler || inline_scripts(document).any(|script| RIGHT_CLICK.is_match(&script))
}

fn is_input_field(el: ElementRef) -> bool {
    let element = el.value();
    match element.name() {
        "input" => element
            .attr("type")
            .is_none_or(|t| t.trim().eq_ignore_ascii_case("text")),
        "textarea" => true,
        _ => element
            .attr("contenteditable")
            .is_some_and(|v| !v.trim().eq_ignore_ascii_case("false")),
    }
}

/// `text` widened from `start..end` by up to `chars` characters each way.
fn char_window(text: &str, start: usize, end: usize, chars: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(chars)
        .last()
        .map_or(start, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(i, _)| end + i);
    &text[from..to]
}

fn script_popup_with_input(script: &str) -> bool {
    POPUP_CALL.find_iter(script).any(|m| {
        INPUT_IN_SCRIPT.is_match(char_window(script, m.start(), m.end(), POPUP_INPUT_WINDOW))
    })
}

/// Modal-like containers holding an input, pop-up `onclick` handlers, or
/// scripts that open a pop-up next to an input field.
pub fn has_input_popup(document: &Html) -> bool {
    let modal_with_input = document.select(&CLASSED).any(|el| {
        el.value()
            .attr("class")
            .is_some_and(|class| POPUP_CLASS.is_match(class))
            && el.select(&INPUT_FIELDS).any(is_input_field)
    });
    if modal_with_input {
        return true;
    }

    let popup_handler = document.select(&ONCLICK_ATTR).any(|el| {
        el.value()
            .attr("onclick")
            .is_some_and(|handler| POPUP_CALL.is_match(handler))
    });
    if popup_handler {
        return true;
    }

    inline_scripts(document).any(|script| script_popup_with_input(&script))
}

/// Iframes drawn without a visible border.
pub fn has_invisible_iframe(document: &Html) -> bool {
    let borderless = document.select(&IFRAMES).any(|frame| {
        let element = frame.value();
        let no_frameborder = element.attr("frameborder").is_some_and(|v| {
            matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "no" | "false")
        });
        no_frameborder
            || element
                .attr("style")
                .is_some_and(|style| BORDERLESS_STYLE.is_match(style))
    });

    borderless
        || inline_scripts(document).any(|script| {
            FRAMEBORDER_IN_SCRIPT.is_match(&script) && BORDERLESS_VALUE.is_match(&script)
        })
}
