use crate::UrlError;
use scraper::Html;
use url::Url;

/// A fetched page: its final URL and HTML
///
/// This is the only thing the extractor sees of a fetch, so static and
/// rendered retrieval are interchangeable downstream.
#[derive(Debug, Clone)]
pub struct Document {
    url: Url,
    html: String,
}

impl Document {
    pub fn new(url: Url, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
        }
    }

    /// Creates a document from a URL string
    pub fn parse(url: &str, html: impl Into<String>) -> Result<Self, UrlError> {
        let url = Url::parse(url).map_err(|e| UrlError::Parse(e.to_string()))?;
        Ok(Self::new(url, html))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Returns true if the body holds nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.html.trim().is_empty()
    }

    /// Parses the HTML into a document tree
    pub fn tree(&self) -> Html {
        Html::parse_document(&self.html)
    }
}
