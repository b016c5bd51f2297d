//! archive.org adapter for catalog search and item metadata.
//!
//! Endpoints:
//! - `GET /advancedsearch.php` ranked search, sorted by downloads
//! - `GET /metadata/<identifier>` item metadata and file list

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{CatalogSource, FetchError, SearchRequest};
use crate::config::ArchiveSettings;
use crate::domain::{CatalogRecord, ItemDetail, MediaFile, MediaKind, MediaType, SearchPage};

/// Public archive.org endpoint
pub const DEFAULT_BASE_URL: &str = "https://archive.org";

/// Fields requested from the search endpoint
const SEARCH_FIELDS: [&str; 3] = ["identifier", "title", "mediatype"];

/// Ranking applied to every search
const SEARCH_SORT: &str = "downloads desc";

/// archive.org HTTP client
pub struct ArchiveClient {
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    client: reqwest::Client,
}

/// Raw search response: `{response: {numFound, docs}}`
#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    response: Option<SearchBody>,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(rename = "numFound")]
    num_found: Option<u64>,
    docs: Option<Vec<SearchDoc>>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    identifier: Option<String>,
    title: Option<String>,
    mediatype: Option<String>,
}

/// Raw metadata response: `{metadata: {title, mediatype}, files: [{name}]}`
#[derive(Debug, Deserialize)]
struct MetadataEnvelope {
    metadata: Option<MetadataBody>,
    #[serde(default)]
    files: Vec<MetadataFile>,
}

#[derive(Debug, Deserialize)]
struct MetadataBody {
    title: Option<String>,
    mediatype: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetadataFile {
    name: Option<String>,
}

impl ArchiveClient {
    /// Create a client with default HTTP settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base(base_url.into()),
            client: reqwest::Client::new(),
        }
    }

    /// Create from resolved settings
    pub fn from_settings(settings: &ArchiveSettings) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(settings.user_agent.clone());
        if let Some(secs) = settings.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            base_url: normalize_base(settings.base_url.clone()),
            client: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the advanced search URL for a request
    pub fn search_url(&self, request: &SearchRequest) -> Result<reqwest::Url, FetchError> {
        let endpoint = format!("{}/advancedsearch.php", self.base_url);
        let rows = request.rows.to_string();
        let page = request.page.to_string();

        let mut params: Vec<(&str, &str)> = vec![("q", request.query.as_str())];
        params.extend(SEARCH_FIELDS.iter().map(|f| ("fl[]", *f)));
        params.push(("sort[]", SEARCH_SORT));
        params.push(("rows", rows.as_str()));
        params.push(("page", page.as_str()));
        params.push(("output", "json"));

        reqwest::Url::parse_with_params(&endpoint, &params)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", endpoint, e)))
    }

    /// Build the metadata URL for one item
    pub fn metadata_url(&self, identifier: &str) -> String {
        format!(
            "{}/metadata/{}",
            self.base_url,
            urlencoding::encode(identifier)
        )
    }

    /// GET a URL and return the body, failing on non-success status
    async fn get_text(&self, url: reqwest::Url) -> Result<String, FetchError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl CatalogSource for ArchiveClient {
    fn name(&self) -> &str {
        "archive.org"
    }

    #[instrument(skip(self, request), fields(query = %request.query, page = request.page))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, FetchError> {
        let url = self.search_url(request)?;
        debug!(%url, "Requesting search page");

        let body = self.get_text(url).await?;
        let page = parse_search_page(&body, &request.media_types)?;

        debug!(
            kept = page.records.len(),
            total_found = page.total_found,
            has_more = page.has_more,
            "Search page parsed"
        );
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn fetch_item_detail(&self, identifier: &str) -> Result<ItemDetail, FetchError> {
        let raw = self.metadata_url(identifier);
        let url = reqwest::Url::parse(&raw)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", raw, e)))?;
        debug!(%url, "Requesting item metadata");

        let body = self.get_text(url).await?;
        parse_item_detail(&self.base_url, identifier, &body)
    }

    fn thumbnail_url(&self, identifier: &str) -> String {
        thumbnail_url(&self.base_url, identifier)
    }
}

fn normalize_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

/// Thumbnail image URL for an item
pub fn thumbnail_url(base_url: &str, identifier: &str) -> String {
    format!("{}/services/img/{}", base_url.trim_end_matches('/'), identifier)
}

/// Download URL for one file of an item
pub fn download_url(base_url: &str, identifier: &str, file_name: &str) -> String {
    format!(
        "{}/download/{}/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(identifier),
        urlencoding::encode(file_name)
    )
}

/// Parse a search response and drop records outside `media_types`.
///
/// `has_more` reflects the raw document count, so a page whose documents are
/// all filtered out still reports more results.
pub fn parse_search_page(
    body: &str,
    media_types: &HashSet<MediaType>,
) -> Result<SearchPage, FetchError> {
    let envelope: SearchEnvelope = serde_json::from_str(body)?;
    let response = envelope
        .response
        .ok_or(FetchError::MissingField("response"))?;
    let total_found = response
        .num_found
        .ok_or(FetchError::MissingField("response.numFound"))?;
    let docs = response
        .docs
        .ok_or(FetchError::MissingField("response.docs"))?;

    let has_more = !docs.is_empty();
    let mut records = Vec::with_capacity(docs.len());

    for doc in docs {
        let identifier = doc
            .identifier
            .ok_or(FetchError::MissingField("docs[].identifier"))?;
        let title = doc.title.ok_or(FetchError::MissingField("docs[].title"))?;
        let mediatype = doc
            .mediatype
            .ok_or(FetchError::MissingField("docs[].mediatype"))?;

        let media_type = MediaType::from_archive(&mediatype);
        if media_types.contains(&media_type) {
            records.push(CatalogRecord::new(identifier, title, media_type));
        }
    }

    Ok(SearchPage {
        records,
        total_found,
        has_more,
    })
}

/// Parse a metadata response into an item detail with playable files only
pub fn parse_item_detail(
    base_url: &str,
    identifier: &str,
    body: &str,
) -> Result<ItemDetail, FetchError> {
    let envelope: MetadataEnvelope = serde_json::from_str(body)?;
    let metadata = envelope
        .metadata
        .ok_or(FetchError::MissingField("metadata"))?;

    let total_files = envelope.files.len();
    let files = envelope
        .files
        .into_iter()
        .filter_map(|f| f.name)
        .filter_map(|name| {
            MediaKind::from_file_name(&name).map(|kind| MediaFile {
                url: download_url(base_url, identifier, &name),
                name,
                kind,
            })
        })
        .collect();

    Ok(ItemDetail {
        identifier: identifier.to_string(),
        title: metadata
            .title
            .unwrap_or_else(|| "Unknown Title".to_string()),
        media_type: metadata
            .mediatype
            .as_deref()
            .map(MediaType::from_archive)
            .unwrap_or(MediaType::Other),
        files,
        total_files,
    })
}
