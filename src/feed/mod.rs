//! Atom and RSS feed documents.
//!
//! GitHub serves its timeline and activity feeds as Atom; RSS 2.0 is read
//! too so that feed URLs from other hosts behave the same.

use crate::errors::{GitHubError, GitHubResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// A link element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedLink {
    /// Link target.
    pub href: String,
    /// Relation (`alternate`, `self`, ...).
    pub rel: Option<String>,
    /// Media type of the target.
    pub media_type: Option<String>,
}

/// One entry (Atom) or item (RSS).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    /// Entry id (`id` or `guid`).
    pub id: Option<String>,
    /// Title.
    pub title: Option<String>,
    /// Last update (`updated`, `published` or `pubDate`).
    pub updated: Option<String>,
    /// Primary link.
    pub link: Option<String>,
    /// Author name.
    pub author: Option<String>,
    /// Content or description.
    pub content: Option<String>,
}

/// A parsed feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    /// Feed title.
    pub title: Option<String>,
    /// Feed id.
    pub id: Option<String>,
    /// Last update.
    pub updated: Option<String>,
    /// Feed-level links.
    pub links: Vec<FeedLink>,
    /// Entries in document order.
    pub entries: Vec<FeedEntry>,
}

/// Returns true for Atom and RSS media types.
pub fn is_feed_media_type(essence: &str) -> bool {
    matches!(essence, "application/atom+xml" | "application/rss+xml")
}

/// Parses an Atom or RSS document.
pub fn parse_feed(xml: &str) -> GitHubResult<Feed> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut root_seen = false;
    let mut entry: Option<FeedEntry> = None;
    let mut in_author = false;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                if !root_seen {
                    root_seen = true;
                    if name != "feed" && name != "rss" {
                        return Err(GitHubError::parser(format!(
                            "Unexpected feed root element <{}>",
                            name
                        )));
                    }
                }
                match name.as_str() {
                    "entry" | "item" => entry = Some(FeedEntry::default()),
                    "author" => in_author = true,
                    "link" => handle_link(&e, &mut feed, entry.as_mut())?,
                    _ => {}
                }
                current = name;
            }
            Ok(Event::Empty(e)) => {
                if local_name(&e) == "link" {
                    handle_link(&e, &mut feed, entry.as_mut())?;
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(xml_error)?.to_string();
                assign_text(&mut feed, entry.as_mut(), &current, in_author, text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                assign_text(&mut feed, entry.as_mut(), &current, in_author, text);
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "entry" | "item" => {
                        if let Some(done) = entry.take() {
                            feed.entries.push(done);
                        }
                    }
                    "author" => in_author = false,
                    _ => {}
                }
                current.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    if !root_seen {
        return Err(GitHubError::parser("Empty feed document"));
    }

    Ok(feed)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

fn xml_error(e: impl std::error::Error + Send + Sync + 'static) -> GitHubError {
    GitHubError::parser(format!("Failed to parse feed: {}", e)).with_cause(e)
}

fn handle_link(
    e: &BytesStart<'_>,
    feed: &mut Feed,
    entry: Option<&mut FeedEntry>,
) -> GitHubResult<()> {
    let mut link = FeedLink::default();
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        let value = attr.unescape_value().map_err(xml_error)?.to_string();
        match attr.key.local_name().as_ref() {
            b"href" => link.href = value,
            b"rel" => link.rel = Some(value),
            b"type" => link.media_type = Some(value),
            _ => {}
        }
    }

    // RSS links carry the URL as text, handled in assign_text.
    if link.href.is_empty() {
        return Ok(());
    }

    match entry {
        Some(entry) => {
            let primary = matches!(link.rel.as_deref(), None | Some("alternate"));
            if entry.link.is_none() || primary {
                entry.link = Some(link.href);
            }
        }
        None => feed.links.push(link),
    }
    Ok(())
}

fn assign_text(
    feed: &mut Feed,
    entry: Option<&mut FeedEntry>,
    element: &str,
    in_author: bool,
    text: String,
) {
    match entry {
        Some(entry) => match element {
            "id" | "guid" => entry.id = Some(text),
            "title" => entry.title = Some(text),
            "updated" | "pubDate" => entry.updated = Some(text),
            "published" if entry.updated.is_none() => entry.updated = Some(text),
            "link" => entry.link = Some(text),
            "name" if in_author => entry.author = Some(text),
            "author" | "creator" => entry.author = Some(text),
            "content" | "description" | "summary" => entry.content = Some(text),
            _ => {}
        },
        None => match element {
            "id" => feed.id = Some(text),
            "title" if feed.title.is_none() => feed.title = Some(text),
            "updated" | "lastBuildDate" => feed.updated = Some(text),
            "link" => feed.links.push(FeedLink {
                href: text,
                ..Default::default()
            }),
            _ => {}
        },
    }
}
