//! Per-source-type parsers and normalizers
//!
//! `parse` turns a raw payload into a JSON array of items; `normalize` turns
//! one item into a draft [`Article`]. Feeds and scraped pages are parsed into
//! plain JSON objects so every type normalizes through the same field lookup.

use super::normalize::{normalize_text, published_from_value};
use crate::sources::Source;
use crate::types::{Article, SourceType};
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde_json::{Map, Value, json};

/// Parser and normalizer for one source type
pub trait SourceAdapter: Send + Sync {
    /// Parse a raw payload; a successful parse that is not an array is
    /// rejected by the pipeline
    fn parse(&self, payload: &str, source: &Source) -> Result<Value, String>;

    /// Turn one parsed item into a draft article
    fn normalize(
        &self,
        item: &Value,
        source: &Source,
        fetched_at: DateTime<Utc>,
    ) -> Result<Article, String>;
}

impl SourceType {
    /// Adapter for this type, `None` for types that are never fetched
    pub fn adapter(&self) -> Option<&'static dyn SourceAdapter> {
        match self {
            SourceType::Rss => Some(&RssAdapter),
            SourceType::Json => Some(&JsonAdapter),
            SourceType::Html => Some(&HtmlAdapter),
            SourceType::Gdelt => Some(&GdeltAdapter),
            SourceType::Manual | SourceType::Unknown => None,
        }
    }
}

/// Candidate keys for each article field, first present wins
struct FieldNames {
    url: Vec<String>,
    title: Vec<String>,
    content: Vec<String>,
    summary: Vec<String>,
    published_at: Vec<String>,
    author: Vec<String>,
    tags: Vec<String>,
    language: Vec<String>,
}

fn names(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            url: names(&["url", "link", "href"]),
            title: names(&["title", "headline", "name"]),
            content: names(&["content", "body", "text"]),
            summary: names(&["summary", "description", "abstract"]),
            published_at: names(&["publishedAt", "published_at", "pubDate", "published", "date"]),
            author: names(&["author", "byline", "creator"]),
            tags: names(&["tags", "categories", "keywords"]),
            language: names(&["language", "lang"]),
        }
    }
}

impl FieldNames {
    /// Defaults with `options.fields` remaps taking precedence
    fn for_source(source: &Source) -> Self {
        let mut fields = Self::default();
        let Some(Value::Object(remap)) = source.options.get("fields") else {
            return fields;
        };
        for (field, key) in remap {
            let Some(key) = key.as_str() else { continue };
            let slot = match field.as_str() {
                "url" => &mut fields.url,
                "title" => &mut fields.title,
                "content" => &mut fields.content,
                "summary" => &mut fields.summary,
                "publishedAt" => &mut fields.published_at,
                "author" => &mut fields.author,
                "tags" => &mut fields.tags,
                "language" => &mut fields.language,
                other => {
                    tracing::debug!(source = %source.name, field = %other, "unknown field remap ignored");
                    continue;
                }
            };
            slot.insert(0, key.to_string());
        }
        fields
    }
}

/// Value at a dotted path (`data.items`)
pub(crate) fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

fn first<'a>(item: &'a Value, keys: &[String]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| lookup(item, key))
        .find(|v| !v.is_null())
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        // Feeds often wrap text as {"#text": ...} or {"name": ...}
        Value::Object(map) => ["#text", "value", "name", "href"]
            .iter()
            .find_map(|k| map.get(*k).and_then(|v| v.as_str()))
            .map(|s| s.to_string()),
        _ => None,
    }
}

fn first_text(item: &Value, keys: &[String]) -> Option<String> {
    first(item, keys).and_then(text_of)
}

fn tags_of(value: &Value) -> Vec<String> {
    let mut tags: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(text_of).collect(),
        Value::String(s) => s.split(',').map(|t| t.to_string()).collect(),
        _ => vec![],
    };
    tags = tags
        .into_iter()
        .map(|t| normalize_text(&t))
        .filter(|t| !t.is_empty())
        .collect();
    tags.dedup();
    tags
}

/// Build a draft article from a JSON item
fn draft_from_item(
    item: &Value,
    fields: &FieldNames,
    source: &Source,
    fetched_at: DateTime<Utc>,
) -> Result<Article, String> {
    if !item.is_object() {
        return Err(format!("item is not an object: {}", item));
    }

    let url = first_text(item, &fields.url)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| "item has no url".to_string())?;

    let mut article = Article::draft(url, source.name.clone(), source.source_type);
    article.title = first_text(item, &fields.title)
        .map(|t| normalize_text(&t))
        .unwrap_or_default();
    article.content = first_text(item, &fields.content)
        .map(|t| normalize_text(&t))
        .unwrap_or_default();
    article.summary = first_text(item, &fields.summary)
        .map(|t| normalize_text(&t))
        .unwrap_or_default();
    article.author = first_text(item, &fields.author)
        .map(|a| normalize_text(&a))
        .filter(|a| !a.is_empty());
    article.tags = first(item, &fields.tags).map(tags_of).unwrap_or_default();
    article.published_at = first(item, &fields.published_at)
        .and_then(published_from_value)
        .unwrap_or(fetched_at);
    article.fetched_at = fetched_at;
    article.category = source.category.clone();
    article.language = first_text(item, &fields.language)
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| source.language.clone());

    Ok(article)
}

/// RSS 2.0, falling back to Atom
pub struct RssAdapter;

impl RssAdapter {
    fn parse_as_rss(content: &str) -> Result<Value, String> {
        let channel = content
            .parse::<rss::Channel>()
            .map_err(|e| format!("RSS parse error: {}", e))?;

        let items = channel
            .items()
            .iter()
            .map(|item| {
                // Fall back to a permalink guid when there is no link
                let link = item.link().map(|l| l.to_string()).or_else(|| {
                    item.guid()
                        .filter(|g| g.is_permalink())
                        .map(|g| g.value().to_string())
                });
                let tags: Vec<&str> = item.categories().iter().map(|c| c.name()).collect();

                json!({
                    "url": link,
                    "title": item.title(),
                    "summary": item.description(),
                    "content": item.content(),
                    "publishedAt": item.pub_date(),
                    "author": item.author(),
                    "tags": tags,
                })
            })
            .collect();

        Ok(Value::Array(items))
    }

    fn parse_as_atom(content: &str) -> Result<Value, String> {
        let feed = atom_syndication::Feed::read_from(content.as_bytes())
            .map_err(|e| format!("Atom parse error: {}", e))?;

        let items = feed
            .entries()
            .iter()
            .map(|entry| {
                // Prefer the alternate link, else the first one
                let link = entry
                    .links()
                    .iter()
                    .find(|l| l.rel() == "alternate")
                    .or_else(|| entry.links().first())
                    .map(|l| l.href().to_string());
                let published = entry.published().unwrap_or(entry.updated()).to_rfc3339();
                let tags: Vec<&str> = entry.categories().iter().map(|c| c.term()).collect();

                json!({
                    "url": link,
                    "title": entry.title().as_str(),
                    "summary": entry.summary().map(|s| s.as_str()),
                    "content": entry.content().and_then(|c| c.value()),
                    "publishedAt": published,
                    "author": entry.authors().first().map(|a| a.name()),
                    "tags": tags,
                })
            })
            .collect();

        Ok(Value::Array(items))
    }
}

impl SourceAdapter for RssAdapter {
    fn parse(&self, payload: &str, source: &Source) -> Result<Value, String> {
        match Self::parse_as_rss(payload) {
            Ok(items) => Ok(items),
            Err(rss_err) => {
                tracing::debug!(source = %source.name, error = %rss_err, "not RSS, trying Atom");
                Self::parse_as_atom(payload).map_err(|atom_err| {
                    format!(
                        "Failed to parse feed as RSS or Atom. RSS error: {}. Atom error: {}",
                        rss_err, atom_err
                    )
                })
            }
        }
    }

    fn normalize(
        &self,
        item: &Value,
        source: &Source,
        fetched_at: DateTime<Utc>,
    ) -> Result<Article, String> {
        draft_from_item(item, &FieldNames::default(), source, fetched_at)
    }
}

/// JSON API returning an article array
///
/// The array sits at the payload root, at `options.itemsPath`, or under
/// `articles`. Field names can be remapped with `options.fields`.
pub struct JsonAdapter;

impl SourceAdapter for JsonAdapter {
    fn parse(&self, payload: &str, source: &Source) -> Result<Value, String> {
        let root: Value =
            serde_json::from_str(payload).map_err(|e| format!("JSON parse error: {}", e))?;

        if let Some(path) = source.option_str("itemsPath") {
            return lookup(&root, path)
                .cloned()
                .ok_or_else(|| format!("itemsPath '{}' not found in payload", path));
        }

        match root {
            Value::Object(mut map) if map.get("articles").is_some_and(|a| a.is_array()) => {
                Ok(map.remove("articles").unwrap_or(Value::Null))
            }
            other => Ok(other),
        }
    }

    fn normalize(
        &self,
        item: &Value,
        source: &Source,
        fetched_at: DateTime<Utc>,
    ) -> Result<Article, String> {
        draft_from_item(item, &FieldNames::for_source(source), source, fetched_at)
    }
}

/// Listing page scraped with a CSS selector
///
/// Each element matched by `options.itemSelector` (default `article`) is one
/// item: its first link is the url, its first heading the title.
pub struct HtmlAdapter;

fn parse_selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("invalid selector '{}': {}", css, e))
}

impl SourceAdapter for HtmlAdapter {
    fn parse(&self, payload: &str, source: &Source) -> Result<Value, String> {
        let item_selector = parse_selector(source.option_str("itemSelector").unwrap_or("article"))?;
        let link_selector = parse_selector("a[href]")?;
        let heading_selector = parse_selector("h1, h2, h3")?;
        let paragraph_selector = parse_selector("p")?;
        let time_selector = parse_selector("time[datetime]")?;

        let base = url::Url::parse(&source.endpoint).ok();
        let document = Html::parse_document(payload);

        let items = document
            .select(&item_selector)
            .map(|element| {
                let link = element.select(&link_selector).next();
                let url = link
                    .and_then(|a| a.value().attr("href"))
                    .map(|href| match &base {
                        Some(base) => base
                            .join(href)
                            .map(|u| u.to_string())
                            .unwrap_or_else(|_| href.to_string()),
                        None => href.to_string(),
                    });

                let text = |e: scraper::ElementRef<'_>| e.text().collect::<Vec<_>>().join(" ");
                let title = element
                    .select(&heading_selector)
                    .next()
                    .map(text)
                    .or_else(|| link.map(text));
                let summary = element.select(&paragraph_selector).next().map(text);
                let published = element
                    .select(&time_selector)
                    .next()
                    .and_then(|t| t.value().attr("datetime"));

                let mut item = Map::new();
                item.insert("url".into(), json!(url));
                item.insert("title".into(), json!(title));
                item.insert("summary".into(), json!(summary));
                item.insert("publishedAt".into(), json!(published));
                Value::Object(item)
            })
            .collect();

        Ok(Value::Array(items))
    }

    fn normalize(
        &self,
        item: &Value,
        source: &Source,
        fetched_at: DateTime<Utc>,
    ) -> Result<Article, String> {
        draft_from_item(item, &FieldNames::default(), source, fetched_at)
    }
}

/// GDELT DOC 2.0 `artlist` response
pub struct GdeltAdapter;

fn gdelt_language(name: &str) -> Option<&'static str> {
    let code = match name.trim().to_ascii_lowercase().as_str() {
        "english" => "en",
        "spanish" => "es",
        "french" => "fr",
        "german" => "de",
        "italian" => "it",
        "portuguese" => "pt",
        "russian" => "ru",
        "arabic" => "ar",
        "chinese" => "zh",
        "japanese" => "ja",
        "korean" => "ko",
        "dutch" => "nl",
        "turkish" => "tr",
        "hindi" => "hi",
        _ => return None,
    };
    Some(code)
}

impl SourceAdapter for GdeltAdapter {
    fn parse(&self, payload: &str, _source: &Source) -> Result<Value, String> {
        // An empty result set comes back as `{}`
        if payload.trim().is_empty() {
            return Ok(Value::Array(vec![]));
        }
        let root: Value =
            serde_json::from_str(payload).map_err(|e| format!("GDELT parse error: {}", e))?;
        match root {
            Value::Object(mut map) => Ok(map
                .remove("articles")
                .unwrap_or_else(|| Value::Array(vec![]))),
            other => Ok(other),
        }
    }

    fn normalize(
        &self,
        item: &Value,
        source: &Source,
        fetched_at: DateTime<Utc>,
    ) -> Result<Article, String> {
        let fields = FieldNames {
            published_at: names(&["seendate"]),
            ..FieldNames::default()
        };
        let mut article = draft_from_item(item, &fields, source, fetched_at)?;

        article.language = item
            .get("language")
            .and_then(|l| l.as_str())
            .and_then(gdelt_language)
            .map(|code| code.to_string())
            .unwrap_or_else(|| source.language.clone());

        let mut meta = Map::new();
        for key in ["domain", "sourcecountry", "socialimage"] {
            if let Some(value) = item.get(key).filter(|v| !v.is_null()) {
                meta.insert(key.to_string(), value.clone());
            }
        }
        if !meta.is_empty() {
            article.source_meta = Some(Value::Object(meta));
        }
        Ok(article)
    }
}
