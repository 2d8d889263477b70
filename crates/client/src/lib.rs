//! Blocking HTTP client for a scanned-document server.
//!
//! Implements every data-fetch contract of `scanview-core` against the
//! server's JSON API, plus the document-level endpoints (info, bookmarks,
//! anchors) a host uses around the viewer:
//!
//! | Endpoint                       | Method                               |
//! |--------------------------------|--------------------------------------|
//! | `GET /api/page/{n}`            | [`RasterSource::fetch_raster`]       |
//! | `GET /api/page/{n}/text`       | [`TextLayoutSource::fetch_text_layout`] |
//! | `GET /api/page/{n}/links`      | [`LinkSource::fetch_links`]          |
//! | `GET /api/search`              | [`SearchSource::search`]             |
//! | `GET /api/info`                | [`HttpDocumentClient::info`]         |
//! | `GET /api/bookmarks`           | [`HttpDocumentClient::bookmarks`]    |
//! | `GET /api/anchor/{title}`      | [`HttpDocumentClient::resolve_anchor`] |

use scanview_core::model::{links_from_wire, LinksWire, TextLayoutWire};
use scanview_core::{
    Bookmark, DocumentInfo, FetchError, FetchResult, LinkAnnotation, LinkSource, PageNumber,
    RasterPayload, RasterSource, SearchRequest, SearchResponse, SearchSource, Size, TextLayout,
    TextLayoutSource, ViewerConfig,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::{Cursor, ErrorKind, Read};
use std::time::Duration;

/// Rasters larger than this are refused.
const MAX_RASTER_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("server answered {status} for {url}")]
    Status { status: u16, url: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("undecodable page image: {0}")]
    Image(String),
}

impl From<ClientError> for FetchError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Timeout(timeout) => FetchError::Timeout(timeout),
            ClientError::Network(message) => FetchError::Transport(message),
            ClientError::Status { status, .. } => FetchError::Status(status),
            ClientError::InvalidResponse(message) | ClientError::Image(message) => {
                FetchError::Decode(message)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct BookmarksWire {
    #[serde(default)]
    bookmarks: Vec<Bookmark>,
}

#[derive(Debug, Deserialize)]
struct AnchorWire {
    page: PageNumber,
}

#[derive(Debug, Clone)]
pub struct HttpDocumentClient {
    base_url: String,
    agent: ureq::Agent,
    timeout: Duration,
}

impl HttpDocumentClient {
    pub fn new(base_url: impl Into<String>, config: &ViewerConfig) -> Self {
        let timeout = config.raster_timeout();
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("scanview/", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn info(&self) -> Result<DocumentInfo, ClientError> {
        self.get_json("/api/info", &[], self.timeout)
    }

    pub fn bookmarks(&self) -> Result<Vec<Bookmark>, ClientError> {
        let wire: BookmarksWire = self.get_json("/api/bookmarks", &[], self.timeout)?;
        Ok(wire.bookmarks)
    }

    /// Page of a named destination, or `None` if the server does not know it.
    pub fn resolve_anchor(&self, title: &str) -> Result<Option<PageNumber>, ClientError> {
        let path = format!("/api/anchor/{}", encode_path_segment(title));
        match self.get_json::<AnchorWire>(&path, &[], self.timeout) {
            Ok(anchor) => Ok(Some(anchor.page)),
            Err(ClientError::Status { status: 404, .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    pub fn raster(
        &self,
        page: PageNumber,
        timeout: Duration,
    ) -> Result<RasterPayload, ClientError> {
        let response = self.get(&format!("/api/page/{page}"), &[], timeout)?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_RASTER_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|e| map_io(e, timeout))?;

        let natural = raster_dimensions(&bytes)?;
        let (width, height) = (natural.width, natural.height);
        log::debug!("page {page}: {} bytes, {width}x{height}", bytes.len());
        Ok(RasterPayload::new(bytes, natural))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<ureq::Response, ClientError> {
        let url = self.url(path);
        let mut request = self.agent.get(&url).timeout(timeout);
        for (key, value) in query {
            request = request.query(key, value);
        }

        request.call().map_err(|error| match error {
            ureq::Error::Status(status, _) => ClientError::Status {
                status,
                url: url.clone(),
            },
            ureq::Error::Transport(transport) => {
                if is_timeout(&transport) {
                    ClientError::Timeout(timeout)
                } else {
                    ClientError::Network(transport.to_string())
                }
            }
        })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<T, ClientError> {
        let body = self
            .get(path, query, timeout)?
            .into_string()
            .map_err(|e| map_io(e, timeout))?;
        serde_json::from_str(&body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

impl RasterSource for HttpDocumentClient {
    fn fetch_raster(&self, page: PageNumber, timeout: Duration) -> FetchResult<RasterPayload> {
        Ok(self.raster(page, timeout)?)
    }
}

impl TextLayoutSource for HttpDocumentClient {
    fn fetch_text_layout(&self, page: PageNumber) -> FetchResult<TextLayout> {
        let path = format!("/api/page/{page}/text");
        let wire: TextLayoutWire = self.get_json(&path, &[], self.timeout)?;
        Ok(TextLayout::from_wire(page, wire))
    }
}

impl LinkSource for HttpDocumentClient {
    fn fetch_links(&self, page: PageNumber) -> FetchResult<Vec<LinkAnnotation>> {
        let path = format!("/api/page/{page}/links");
        let wire: LinksWire = self.get_json(&path, &[], self.timeout)?;
        Ok(links_from_wire(wire))
    }
}

impl SearchSource for HttpDocumentClient {
    fn search(&self, request: &SearchRequest) -> FetchResult<SearchResponse> {
        let query = [
            ("query", request.query.clone()),
            ("page", request.page.to_string()),
            ("page_size", request.page_size.to_string()),
        ];
        Ok(self.get_json("/api/search", &query, self.timeout)?)
    }
}

/// Natural pixel size of an encoded page image.
pub fn raster_dimensions(bytes: &[u8]) -> Result<Size, ClientError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ClientError::Image(e.to_string()))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ClientError::Image(e.to_string()))?;

    Ok(Size::new(width as f32, height as f32))
}

fn map_io(error: std::io::Error, timeout: Duration) -> ClientError {
    match error.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => ClientError::Timeout(timeout),
        _ => ClientError::Network(error.to_string()),
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(transport);
    while let Some(error) = source {
        if let Some(io) = error.downcast_ref::<std::io::Error>() {
            if matches!(io.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) {
                return true;
            }
        }
        source = error.source();
    }
    false
}

fn encode_path_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}
