//! Ordered selector cascades.
//!
//! Listing sites redesign their markup without notice, so every field is
//! described by a list of rules ordered from most specific (test hooks, current
//! class names) to most generic. The first rule that yields non-empty text wins.

use scraper::{ElementRef, Html, Selector};

use crate::models::job::clean_text;

/// What to read from a matched element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    /// Concatenated descendant text, whitespace-collapsed.
    Text,
    /// A single attribute value, e.g. `href`.
    Attr(&'static str),
}

/// One step of a field cascade. A rule without a selector is applied to the
/// listing container itself (for cards that are themselves the `<a>`).
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub selector: Option<&'static str>,
    pub extract: Extract,
}

impl Rule {
    pub const fn text(selector: &'static str) -> Self {
        Self {
            selector: Some(selector),
            extract: Extract::Text,
        }
    }

    pub const fn attr(selector: &'static str, name: &'static str) -> Self {
        Self {
            selector: Some(selector),
            extract: Extract::Attr(name),
        }
    }

    pub const fn own_attr(name: &'static str) -> Self {
        Self {
            selector: None,
            extract: Extract::Attr(name),
        }
    }
}

/// A [`Rule`] with its selector parsed.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    selector: Option<Selector>,
    extract: Extract,
}

/// Parse a rule list. Rules whose selector does not parse are dropped with a
/// warning so one bad entry cannot disable the whole field.
pub fn compile_rules(rules: &[Rule]) -> Vec<CompiledRule> {
    rules
        .iter()
        .filter_map(|rule| {
            let selector = match rule.selector {
                None => None,
                Some(raw) => match Selector::parse(raw) {
                    Ok(sel) => Some(sel),
                    Err(e) => {
                        tracing::warn!(selector = raw, "Skipping invalid field selector: {e}");
                        return None;
                    }
                },
            };
            Some(CompiledRule {
                selector,
                extract: rule.extract,
            })
        })
        .collect()
}

/// Parse container selectors, dropping the ones that do not parse.
pub fn compile_selectors(raw: &[&str]) -> Vec<Selector> {
    raw.iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(sel) => Some(sel),
            Err(e) => {
                tracing::warn!(selector = *s, "Skipping invalid container selector: {e}");
                None
            }
        })
        .collect()
}

/// Try each rule against `container` in order and return the first non-empty
/// value.
pub fn locate_field(container: ElementRef<'_>, rules: &[CompiledRule]) -> Option<String> {
    rules.iter().find_map(|rule| match &rule.selector {
        None => read(container, rule.extract),
        Some(sel) => container
            .select(sel)
            .find_map(|el| read(el, rule.extract)),
    })
}

/// Return the containers matched by the first selector that matches anything,
/// capped at `cap` elements.
pub fn locate_listings<'a>(
    document: &'a Html,
    containers: &[Selector],
    cap: usize,
) -> Vec<ElementRef<'a>> {
    for selector in containers {
        let found: Vec<_> = document.select(selector).take(cap).collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

fn read(element: ElementRef<'_>, extract: Extract) -> Option<String> {
    let value = match extract {
        Extract::Text => clean_text(&element.text().collect::<Vec<_>>().join(" ")),
        Extract::Attr(name) => element.value().attr(name)?.trim().to_string(),
    };
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = r#"
        <html><body>
          <div class="card">
            <h2 class="old-title">   </h2>
            <h2 data-at="title">Elektriker
                (m/w/d)</h2>
            <a class="link" href="/job/1">Details</a>
          </div>
        </body></html>"#;

    fn first<'a>(doc: &'a Html, sel: &str) -> ElementRef<'a> {
        let selector = Selector::parse(sel).unwrap();
        doc.select(&selector).next().unwrap()
    }

    #[test]
    fn cascade_skips_empty_matches() {
        let doc = Html::parse_document(CARD);
        let card = first(&doc, "div.card");
        let rules = compile_rules(&[
            Rule::text("h2.old-title"),
            Rule::text("[data-at='title']"),
            Rule::text("h2"),
        ]);
        assert_eq!(
            locate_field(card, &rules).as_deref(),
            Some("Elektriker (m/w/d)")
        );
    }

    #[test]
    fn attribute_rules_read_attributes() {
        let doc = Html::parse_document(CARD);
        let card = first(&doc, "div.card");
        let rules = compile_rules(&[Rule::attr("a.missing", "href"), Rule::attr("a", "href")]);
        assert_eq!(locate_field(card, &rules).as_deref(), Some("/job/1"));
    }

    #[test]
    fn own_attr_reads_the_container() {
        let doc = Html::parse_document(r#"<a class="card" href="/job/9"><span>T</span></a>"#);
        let card = first(&doc, "a.card");
        let rules = compile_rules(&[Rule::attr("a", "href"), Rule::own_attr("href")]);
        assert_eq!(locate_field(card, &rules).as_deref(), Some("/job/9"));
    }

    #[test]
    fn invalid_selectors_are_dropped() {
        let rules = compile_rules(&[Rule::text("h2[[["), Rule::text("h2")]);
        assert_eq!(rules.len(), 1);
        assert_eq!(compile_selectors(&["::::", "article"]).len(), 1);
    }

    #[test]
    fn generic_fallback_container_is_used_and_capped() {
        let html = format!(
            "<html><body>{}</body></html>",
            (0..5)
                .map(|i| format!("<article><h2>Job {i}</h2></article>"))
                .collect::<String>()
        );
        let doc = Html::parse_document(&html);
        let containers = compile_selectors(&["[data-at='job-item']", "article"]);

        assert_eq!(locate_listings(&doc, &containers, 10).len(), 5);
        assert_eq!(locate_listings(&doc, &containers, 3).len(), 3);
    }

    #[test]
    fn no_matching_container_yields_nothing() {
        let doc = Html::parse_document("<html><body><p>nothing</p></body></html>");
        let containers = compile_selectors(&["article"]);
        assert!(locate_listings(&doc, &containers, 9).is_empty());
    }
}
