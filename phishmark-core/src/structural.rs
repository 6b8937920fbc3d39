use crate::behavior;
use crate::domain::{is_external, registrable_label};
use crate::record::{FallbackReason, PartialRecord};
use crate::schema::{FeatureKey, RawValue};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static RESOURCES: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("img[src], video[src], audio[src], iframe[src]").unwrap()
});
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static LINK_TAGS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("link[href]").unwrap());
static SCRIPT_TAGS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script[src]").unwrap());
static FORMS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form[action]").unwrap());

/// External and total reference counts for one element family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferenceCount {
    pub external: usize,
    pub total: usize,
}

impl ReferenceCount {
    fn add(self, other: ReferenceCount) -> ReferenceCount {
        ReferenceCount {
            external: self.external + other.external,
            total: self.total + other.total,
        }
    }

    /// Share of external references in percent; `None` without references.
    pub fn percent(&self) -> Option<f64> {
        (self.total > 0).then(|| self.external as f64 / self.total as f64 * 100.0)
    }
}

/// Count how many of the `attr` references selected by `selector` leave the
/// page's registrable domain. References that do not resolve count as internal.
pub fn count_references(
    document: &Html,
    base: &Url,
    selector: &Selector,
    attr: &str,
) -> ReferenceCount {
    let page_label = registrable_label(base.host_str().unwrap_or_default());
    let mut count = ReferenceCount::default();

    for element in document.select(selector) {
        let Some(reference) = element.value().attr(attr) else {
            continue;
        };
        count.total += 1;
        if let Ok(resolved) = base.join(reference.trim())
            && is_external(&page_label, &resolved)
        {
            count.external += 1;
        }
    }
    count
}

/// Server form handler verdict for the first form with an action.
fn form_handler_verdict(document: &Html, base: &Url) -> &'static str {
    let Some(action) = document
        .select(&FORMS)
        .find_map(|form| form.value().attr("action"))
        .map(str::trim)
    else {
        return "legitimate";
    };

    if action.is_empty() || action.eq_ignore_ascii_case("about:blank") {
        return "phishing";
    }
    let page_label = registrable_label(base.host_str().unwrap_or_default());
    match base.join(action) {
        Ok(target) if is_external(&page_label, &target) => "suspicious",
        Ok(_) => "legitimate",
        Err(_) => "suspicious",
    }
}

fn submits_to_email(document: &Html) -> bool {
    document.select(&FORMS).any(|form| {
        form.value()
            .attr("action")
            .is_some_and(|action| action.trim().to_ascii_lowercase().starts_with("mailto:"))
    })
}

/// Compute the structural keys for a page fetched from `url`.
///
/// Ratio keys stay unset when the page has no elements of their kind. Keys
/// that need the page URL fall back to the sentinel when it does not parse.
pub fn analyze_structure(url: &str, document: &Html) -> PartialRecord {
    let mut record = PartialRecord::new();

    match Url::parse(url.trim()) {
        Ok(base) => {
            let families: [(FeatureKey, &[(&Selector, &str)]); 3] = [
                (FeatureKey::RequestUrl, &[(&*RESOURCES, "src")]),
                (FeatureKey::AnchorUrl, &[(&*ANCHORS, "href")]),
                (
                    FeatureKey::LinksInTags,
                    &[(&*LINK_TAGS, "href"), (&*SCRIPT_TAGS, "src")],
                ),
            ];
            for (key, sources) in families {
                let count = sources
                    .iter()
                    .map(|(selector, attr)| count_references(document, &base, selector, attr))
                    .fold(ReferenceCount::default(), ReferenceCount::add);
                debug!("{}: {}/{} external", key, count.external, count.total);
                if let Some(pct) = count.percent() {
                    record.set_measured(key, &RawValue::Number(pct));
                }
            }

            let verdict = form_handler_verdict(document, &base);
            record.set_measured(FeatureKey::Sfh, &RawValue::Text(verdict.to_string()));
        }
        Err(e) => {
            let detail = format!("unparsable page URL: {}", e);
            for key in [
                FeatureKey::RequestUrl,
                FeatureKey::AnchorUrl,
                FeatureKey::LinksInTags,
                FeatureKey::Sfh,
            ] {
                record.fall_back(key, FallbackReason::ParseFailure, detail.clone());
            }
        }
    }

    record.set_measured(FeatureKey::SubmittingToEmail, &submits_to_email(document).into());
    let behaviors = [
        (FeatureKey::OnMouseover, behavior::manipulates_status_bar(document)),
        (FeatureKey::RightClick, behavior::disables_right_click(document)),
        (FeatureKey::PopUpWindow, behavior::has_input_popup(document)),
        (FeatureKey::Iframe, behavior::has_invisible_iframe(document)),
    ];
    for (key, present) in behaviors {
        record.set_measured(key, &present.into());
    }

    record
}

/// Parse `html` and analyze it in one step.
pub fn analyze_html(url: &str, html: &str) -> PartialRecord {
    let document = Html::parse_document(html);
    analyze_structure(url, &document)
}
