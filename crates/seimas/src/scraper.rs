use crate::parser::{
    ColumnLayout, MEMBERS_TABLE_LAYOUT, ParseError, parse_member_link_titles, parse_member_list,
};
use crate::types::{MemberRecord, Schema};
use crate::wikidata::{self, API_TITLES_LIMIT, WikidataLinks};

use reqwest::Client;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
    #[error("Unexpected Wikipedia API response: {0}")]
    Api(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    api_url: String,
    layout: ColumnLayout,
}

impl WebScraper {
    pub fn new() -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            api_url: crate::WIKIPEDIA_API_URL.to_string(),
            layout: MEMBERS_TABLE_LAYOUT,
        })
    }

    /// Fetches the page, annotates the links of its members table with
    /// Wikidata ids and extracts one record per member row.
    pub async fn fetch_members(
        &self,
        url: &str,
        schema: Schema,
    ) -> Result<Vec<MemberRecord>, ScraperError> {
        log::info!("Fetching members page {}...", url);
        let html = self.get_html(url).await?;

        let titles = parse_member_link_titles(&html, &self.layout)?;
        let links = self.fetch_wikidata_ids(&titles).await?;

        let members = parse_member_list(&html, &links, &self.layout, schema)?;
        log::info!("Extracted {} members", members.len());
        Ok(members)
    }

    /// Resolves article titles to Wikidata ids, one API request per batch.
    pub async fn fetch_wikidata_ids(
        &self,
        titles: &[String],
    ) -> Result<WikidataLinks, ScraperError> {
        let mut links = WikidataLinks::new();
        for batch in titles.chunks(API_TITLES_LIMIT) {
            let url = wikidata::pageprops_query_url(&self.api_url, batch);
            log::debug!("Looking up Wikidata ids for {} titles", batch.len());
            let body = self.get_html(&url).await?;
            links.extend(wikidata::parse_pageprops_response(&body, batch)?);
        }
        log::info!(
            "Resolved {} of {} linked titles to Wikidata ids",
            links.len(),
            titles.len()
        );
        Ok(links)
    }

    async fn get_html(&self, url: &str) -> Result<String, ScraperError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}
