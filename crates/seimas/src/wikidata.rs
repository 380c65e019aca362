//! Wikidata annotation of Wikipedia article links.
//!
//! A link is annotated with the `wikibase_item` page property of the article
//! it points to, looked up through the MediaWiki API after following title
//! normalisation and redirects.

use std::collections::HashMap;

use scraper::ElementRef;
use serde::Deserialize;

/// Maximum number of titles the MediaWiki API accepts in one query.
pub const API_TITLES_LIMIT: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WikidataLinks {
    by_title: HashMap<String, String>,
}

impl WikidataLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }

    pub fn id_for_title(&self, title: &str) -> Option<&str> {
        self.by_title.get(title).map(String::as_str)
    }

    /// Wikidata id of the article an `<a>` element points to.
    pub fn annotation(&self, link: ElementRef) -> Option<&str> {
        let title = title_from_href(link.value().attr("href")?)?;
        self.id_for_title(&title)
    }
}

impl Extend<(String, String)> for WikidataLinks {
    fn extend<T: IntoIterator<Item = (String, String)>>(&mut self, iter: T) {
        self.by_title.extend(iter);
    }
}

impl FromIterator<(String, String)> for WikidataLinks {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            by_title: iter.into_iter().collect(),
        }
    }
}

/// Article title of an internal `/wiki/` link. Red links, anchors and
/// external links have none.
pub fn title_from_href(href: &str) -> Option<String> {
    let path = href.strip_prefix("/wiki/")?;
    let path = path.split('#').next().unwrap_or_default();
    if path.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(path).ok()?;
    let title = decoded.replace('_', " ").trim().to_string();
    (!title.is_empty()).then_some(title)
}

pub(crate) fn pageprops_query_url(api_url: &str, titles: &[String]) -> String {
    let titles = titles
        .iter()
        .map(|t| urlencoding::encode(t).into_owned())
        .collect::<Vec<_>>()
        .join("%7C");
    format!(
        "{}?action=query&prop=pageprops&ppprop=wikibase_item&redirects=1&format=json&formatversion=2&titles={}",
        api_url, titles
    )
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    query: Option<ApiQuery>,
}

#[derive(Debug, Deserialize)]
struct ApiQuery {
    #[serde(default)]
    normalized: Vec<TitleMapping>,
    #[serde(default)]
    redirects: Vec<TitleMapping>,
    #[serde(default)]
    pages: Vec<ApiPage>,
}

#[derive(Debug, Deserialize)]
struct TitleMapping {
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    #[serde(default)]
    title: String,
    #[serde(default)]
    pageprops: Option<PageProps>,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    wikibase_item: Option<String>,
}

/// Maps each requested title to the Wikidata id of the page it resolves to.
pub(crate) fn parse_pageprops_response(
    json: &str,
    requested: &[String],
) -> Result<Vec<(String, String)>, serde_json::Error> {
    let response: ApiResponse = serde_json::from_str(json)?;
    let Some(query) = response.query else {
        return Ok(Vec::new());
    };

    let normalized: HashMap<&str, &str> = query
        .normalized
        .iter()
        .map(|m| (m.from.as_str(), m.to.as_str()))
        .collect();
    let redirects: HashMap<&str, &str> = query
        .redirects
        .iter()
        .map(|m| (m.from.as_str(), m.to.as_str()))
        .collect();
    let ids: HashMap<&str, &str> = query
        .pages
        .iter()
        .filter_map(|p| {
            let id = p.pageprops.as_ref()?.wikibase_item.as_deref()?;
            Some((p.title.as_str(), id))
        })
        .collect();

    Ok(requested
        .iter()
        .filter_map(|title| {
            let mut current = normalized
                .get(title.as_str())
                .copied()
                .unwrap_or(title.as_str());
            for _ in 0..redirects.len() {
                match redirects.get(current) {
                    Some(&target) => current = target,
                    None => break,
                }
            }
            ids.get(current).map(|id| (title.clone(), id.to_string()))
        })
        .collect())
}
