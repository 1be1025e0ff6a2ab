//! Declarative document-to-record extraction.
//!
//! All rules run against a captured [`PageSnapshot`] parsed with `scraper`, so
//! extraction is a pure function of the snapshot: no browser round-trips, no
//! side effects, and a selector that matches nothing only empties its field.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::{ExtractionRulesConfig, PillLayout};
use crate::error::CrawlError;
use crate::models::{JobDetail, ListingItem, PageSnapshot, Section};

/// Compiled extraction selectors.
#[derive(Debug)]
pub struct ExtractionRules {
    listing_heading: Selector,
    anchor: Selector,
    company_name: Selector,
    company_description: Selector,
    pill_container: Selector,
    pill_item: Selector,
    pill_layout: PillLayout,
    section_heading: Selector,
    apply_domains: Vec<String>,
}

impl ExtractionRules {
    /// Compile every selector up front; a malformed one is a [`CrawlError::ConfigError`].
    pub fn new(config: &ExtractionRulesConfig) -> Result<Self, CrawlError> {
        Ok(Self {
            listing_heading: compile("listing_heading", &config.listing_heading)?,
            anchor: compile("anchor", "a[href]")?,
            company_name: compile("company_name", &config.company_name)?,
            company_description: compile("company_description", &config.company_description)?,
            pill_container: compile("pill_container", &config.pill_container)?,
            pill_item: compile("pill_item", &config.pill_item)?,
            pill_layout: config.pill_layout,
            section_heading: compile("section_heading", &config.section_heading)?,
            apply_domains: config
                .apply_domains
                .iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
        })
    }

    /// Listing items of a captured listing page, in document order.
    pub fn listing_items(&self, snapshot: &PageSnapshot) -> Vec<ListingItem> {
        let doc = Html::parse_document(&snapshot.html);
        self.listing_items_in(&doc, Url::parse(&snapshot.url).ok().as_ref())
    }

    /// Listing items of an already parsed document.
    ///
    /// The first `a[href]` inside a heading supplies both title and link;
    /// a heading without one keeps its own text and a `None` link.
    pub fn listing_items_in(&self, doc: &Html, base: Option<&Url>) -> Vec<ListingItem> {
        doc.select(&self.listing_heading)
            .map(|heading| match heading.select(&self.anchor).next() {
                Some(anchor) => ListingItem {
                    title: element_text(anchor),
                    link: anchor.value().attr("href").map(|href| resolve(base, href)),
                },
                None => ListingItem {
                    title: element_text(heading),
                    link: None,
                },
            })
            .collect()
    }

    /// Structured content of a captured detail page.
    pub fn detail(&self, snapshot: &PageSnapshot) -> JobDetail {
        let doc = Html::parse_document(&snapshot.html);
        self.detail_in(&doc, Url::parse(&snapshot.url).ok().as_ref())
    }

    /// Structured content of an already parsed detail document.
    pub fn detail_in(&self, doc: &Html, base: Option<&Url>) -> JobDetail {
        JobDetail {
            company_name: self.first_text(doc, &self.company_name),
            company_description: self.first_text(doc, &self.company_description),
            job_pills: self.pills_at(doc, self.pill_layout.job_pills),
            skills_pills: self.pills_at(doc, self.pill_layout.skill_pills),
            apply_link: self.apply_link(doc, base),
            sections: self.sections(doc),
        }
    }

    fn first_text(&self, doc: &Html, selector: &Selector) -> Option<String> {
        doc.select(selector)
            .next()
            .map(element_text)
            .filter(|text| !text.is_empty())
    }

    fn pills_at(&self, doc: &Html, position: usize) -> Vec<String> {
        doc.select(&self.pill_container)
            .nth(position)
            .map(|container| {
                container
                    .select(&self.pill_item)
                    .map(element_text)
                    .filter(|text| !text.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn apply_link(&self, doc: &Html, base: Option<&Url>) -> Option<String> {
        doc.select(&self.anchor)
            .filter_map(|a| a.value().attr("href"))
            .map(|href| resolve(base, href))
            .find(|link| {
                let link = link.to_ascii_lowercase();
                self.apply_domains.iter().any(|domain| link.contains(domain))
            })
    }

    /// Each heading owns the sibling elements that follow it, up to the next
    /// sibling heading of the same or a higher level.
    fn sections(&self, doc: &Html) -> Vec<Section> {
        doc.select(&self.section_heading)
            .filter_map(|heading| {
                let tag = heading.value().name();
                let level = heading_level(tag);

                let parts: Vec<String> = heading
                    .next_siblings()
                    .filter_map(ElementRef::wrap)
                    .take_while(|sibling| !closes_section(sibling, tag, level))
                    .map(element_text)
                    .filter(|text| !text.is_empty())
                    .collect();

                if parts.is_empty() {
                    return None;
                }
                Some(Section {
                    section: element_text(heading),
                    content: parts.join("\n\n"),
                })
            })
            .collect()
    }
}

fn compile(field: &str, css: &str) -> Result<Selector, CrawlError> {
    Selector::parse(css)
        .map_err(|e| CrawlError::ConfigError(format!("Invalid {field} selector '{css}': {e:?}")))
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn closes_section(sibling: &ElementRef<'_>, tag: &str, level: Option<u8>) -> bool {
    let name = sibling.value().name();
    match (level, heading_level(name)) {
        (Some(current), Some(next)) => next <= current,
        _ => name == tag,
    }
}

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements whose rendered text starts and ends on its own line.
const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "caption",
    "dd",
    "details",
    "dialog",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "summary",
    "table",
    "td",
    "th",
    "tr",
    "ul",
    "tbody",
];

/// Rendered text of an element: block boundaries and `<br>` become breaks,
/// inline markup stays joined, whitespace runs collapse to one space.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_rendered_children(element, &mut raw);
    collapse_whitespace(&raw)
}

/// Text a user would see in `<body>`, rendered like [`element_text`] with
/// script, style and template contents skipped.
pub(crate) fn visible_text(doc: &Html) -> String {
    doc.root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")
        .map(element_text)
        .unwrap_or_default()
}

fn push_rendered_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child.value().name();
        if HIDDEN_TAGS.contains(&name) {
            continue;
        }
        if name == "br" {
            out.push('\n');
            continue;
        }
        let block = BLOCK_TAGS.contains(&name);
        if block {
            out.push('\n');
        }
        push_rendered_children(child, out);
        if block {
            out.push('\n');
        }
    }
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Absolute form of `href`, resolved against the page it was found on.
fn resolve(base: Option<&Url>, href: &str) -> String {
    let href = href.trim();
    match base {
        Some(base) => base
            .join(href)
            .map(String::from)
            .unwrap_or_else(|_| href.to_string()),
        None => href.to_string(),
    }
}
