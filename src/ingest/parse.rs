use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;
use url::Url;

use crate::ingest::date;
use crate::ingest::types::CandidateArticle;

/// One attempt at turning a raw payload into candidates. `None` means the
/// strategy could not parse the document at all; an empty vec means it
/// parsed but found nothing usable.
pub trait FeedParseStrategy {
    fn name(&self) -> &'static str;
    fn try_parse(&self, payload: &str, source: &str) -> Option<Vec<CandidateArticle>>;
}

/// Normalize a feed payload (RSS 2.0, Atom, or broken markup) into
/// candidate articles. Strategies run in order; the first one returning a
/// non-empty list wins. Both failing is not an error: the source simply
/// contributes nothing this run.
pub fn normalize(payload: &str, source: &str) -> Vec<CandidateArticle> {
    let strategies: [&dyn FeedParseStrategy; 2] = [&StrictXml, &LenientMarkup];
    for strategy in strategies {
        match strategy.try_parse(payload, source) {
            Some(items) if !items.is_empty() => {
                debug!(strategy = strategy.name(), items = items.len(), source, "feed parsed");
                return items;
            }
            Some(_) => debug!(strategy = strategy.name(), source, "strategy yielded no items"),
            None => debug!(strategy = strategy.name(), source, "strategy failed to parse"),
        }
    }
    Vec::new()
}

/// Item-like element fields before validation. Both strategies fill this,
/// then `into_candidate` applies the shared rules.
#[derive(Debug, Default)]
struct RawItem {
    title: Option<String>,
    link: Option<String>,
    // only the first <link> element of an item counts, like the first
    // strategy's document-order lookup
    link_seen: bool,
    description: Option<String>,
    summary: Option<String>,
    pub_date: Option<String>,
    published: Option<String>,
    updated: Option<String>,
}

impl RawItem {
    /// Required fields: non-empty title and a link that parses as a URL.
    /// Summary prefers RSS `description` over Atom `summary`; the publish
    /// string is pubDate > published > updated, first non-empty.
    fn into_candidate(self, source: &str) -> Option<CandidateArticle> {
        let title = self.title?;
        let link = self.link?;
        Url::parse(&link).ok()?;
        let summary = self.description.or(self.summary);
        let published_at = self
            .pub_date
            .or(self.published)
            .or(self.updated)
            .as_deref()
            .and_then(date::parse_publish_date);
        Some(CandidateArticle {
            source: source.to_string(),
            title,
            link,
            summary,
            published_at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Title,
    Link,
    Description,
    Summary,
    PubDate,
    Published,
    Updated,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" => Some(Field::Description),
            b"summary" => Some(Field::Summary),
            b"pubDate" => Some(Field::PubDate),
            b"published" => Some(Field::Published),
            b"updated" => Some(Field::Updated),
            _ => None,
        }
    }
}

fn set_if_none(slot: &mut Option<String>, value: String) {
    if slot.is_none() && !value.is_empty() {
        *slot = Some(value);
    }
}

/// Well-formed XML only. Walks the event stream collecting `item`
/// elements, falling back to `entry` elements when the document has no
/// `item`. Any XML error (including truncation inside an item) fails the
/// strategy so the lenient pass can have a go.
pub struct StrictXml;

impl FeedParseStrategy for StrictXml {
    fn name(&self) -> &'static str {
        "strict-xml"
    }

    fn try_parse(&self, payload: &str, source: &str) -> Option<Vec<CandidateArticle>> {
        let raw_items = collect_items_strict(payload).ok()?;
        Some(
            raw_items
                .into_iter()
                .filter_map(|raw| raw.into_candidate(source))
                .collect(),
        )
    }
}

fn href_attr(element: &BytesStart) -> anyhow::Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == b"href" {
            let value = attr.unescape_value()?.trim().to_string();
            if !value.is_empty() {
                return Ok(Some(value));
            }
        }
    }
    Ok(None)
}

fn collect_items_strict(payload: &str) -> anyhow::Result<Vec<RawItem>> {
    let mut reader = Reader::from_str(payload);

    let mut items: Vec<RawItem> = Vec::new();
    let mut entries: Vec<RawItem> = Vec::new();
    let mut current: Option<RawItem> = None;
    let mut current_is_entry = false;
    // 0 = positioned directly inside the item element
    let mut child_depth = 0usize;
    let mut field: Option<Field> = None;
    let mut pending_href: Option<String> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                if current.is_none() {
                    match name.as_ref() {
                        b"item" => {
                            current = Some(RawItem::default());
                            current_is_entry = false;
                        }
                        b"entry" => {
                            current = Some(RawItem::default());
                            current_is_entry = true;
                        }
                        _ => {}
                    }
                    child_depth = 0;
                } else if child_depth == 0 {
                    field = Field::from_name(name.as_ref());
                    text.clear();
                    pending_href = if field == Some(Field::Link) {
                        href_attr(&e)?
                    } else {
                        None
                    };
                    child_depth = 1;
                } else {
                    // markup nested inside a field; keep collecting its text
                    child_depth += 1;
                }
            }
            Event::Empty(e) => {
                if let Some(item) = current.as_mut() {
                    if child_depth == 0
                        && e.local_name().as_ref() == b"link"
                        && !item.link_seen
                    {
                        item.link = href_attr(&e)?;
                        item.link_seen = true;
                    }
                }
            }
            Event::End(e) => {
                if let Some(item) = current.as_mut() {
                    if child_depth > 0 {
                        child_depth -= 1;
                        if child_depth == 0 {
                            if let Some(f) = field.take() {
                                commit_field(item, f, text.trim(), pending_href.take());
                            }
                            pending_href = None;
                        }
                    } else if matches!(e.local_name().as_ref(), b"item" | b"entry") {
                        let finished = current.take().unwrap_or_default();
                        if current_is_entry {
                            entries.push(finished);
                        } else {
                            items.push(finished);
                        }
                    }
                }
            }
            Event::Text(t) => {
                if current.is_some() && field.is_some() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(t) => {
                if current.is_some() && field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::Eof => {
                if current.is_some() {
                    anyhow::bail!("document truncated inside an item element");
                }
                break;
            }
            _ => {}
        }
    }

    Ok(if !items.is_empty() { items } else { entries })
}

fn commit_field(item: &mut RawItem, field: Field, text: &str, href: Option<String>) {
    match field {
        Field::Title => set_if_none(&mut item.title, text.to_string()),
        Field::Link => {
            if !item.link_seen {
                // href attribute wins over element text
                item.link = href.or_else(|| {
                    (!text.is_empty()).then(|| text.to_string())
                });
                item.link_seen = true;
            }
        }
        Field::Description => set_if_none(&mut item.description, text.to_string()),
        Field::Summary => set_if_none(&mut item.summary, text.to_string()),
        Field::PubDate => set_if_none(&mut item.pub_date, text.to_string()),
        Field::Published => set_if_none(&mut item.published, text.to_string()),
        Field::Updated => set_if_none(&mut item.updated, text.to_string()),
    }
}

/// Tag-soup fallback: html5ever never refuses a document, so this pass
/// handles malformed, truncated, or HTML-escaped feeds. Same tag and
/// attribute rules as the strict pass.
pub struct LenientMarkup;

impl FeedParseStrategy for LenientMarkup {
    fn name(&self) -> &'static str {
        "lenient-markup"
    }

    fn try_parse(&self, payload: &str, source: &str) -> Option<Vec<CandidateArticle>> {
        let doc = Html::parse_document(payload);
        let item_sel = Selector::parse("item").ok()?;
        let entry_sel = Selector::parse("entry").ok()?;

        let mut elements: Vec<ElementRef> = doc.select(&item_sel).collect();
        if elements.is_empty() {
            elements = doc.select(&entry_sel).collect();
        }

        Some(
            elements
                .into_iter()
                .map(raw_item_from_element)
                .filter_map(|raw| raw.into_candidate(source))
                .collect(),
        )
    }
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn raw_item_from_element(el: ElementRef) -> RawItem {
    let mut raw = RawItem::default();
    // html5ever treats <link> as a void element, so an RSS link's URL text
    // ends up in the text node that follows it
    let mut link_text_pending = false;

    for child in el.children() {
        match child.value() {
            Node::Element(child_el) => {
                link_text_pending = false;
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                // html parsing lowercases tag names, so pubDate arrives as pubdate
                match child_el.name() {
                    "title" => set_if_none(&mut raw.title, element_text(child_ref)),
                    "link" => {
                        if !raw.link_seen {
                            let href = child_el
                                .attr("href")
                                .map(str::trim)
                                .filter(|h| !h.is_empty());
                            if let Some(href) = href {
                                raw.link = Some(href.to_string());
                                raw.link_seen = true;
                            } else {
                                let text = element_text(child_ref);
                                if !text.is_empty() {
                                    raw.link = Some(text);
                                    raw.link_seen = true;
                                } else {
                                    link_text_pending = true;
                                }
                            }
                        }
                    }
                    "description" => set_if_none(&mut raw.description, element_text(child_ref)),
                    "summary" => set_if_none(&mut raw.summary, element_text(child_ref)),
                    "pubdate" => set_if_none(&mut raw.pub_date, element_text(child_ref)),
                    "published" => set_if_none(&mut raw.published, element_text(child_ref)),
                    "updated" => set_if_none(&mut raw.updated, element_text(child_ref)),
                    _ => {}
                }
            }
            Node::Text(t) => {
                if link_text_pending {
                    let s = t.trim();
                    if !s.is_empty() {
                        raw.link = Some(s.to_string());
                        raw.link_seen = true;
                        link_text_pending = false;
                    }
                }
            }
            _ => {}
        }
    }

    raw
}
