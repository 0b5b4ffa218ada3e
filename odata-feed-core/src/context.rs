//! Per-request configuration and per-response context.

use chrono::{NaiveDateTime, Utc};

use crate::pagination::PaginationState;

/// Where the feed is served from and which collection it describes.
///
/// URLs in the feed are built as `https://{server_host}{base_path}/{collection}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    server_host: String,
    base_path: String,
    collection: String,
}

impl FeedConfig {
    /// Build a configuration. A trailing `/` on `base_path` is dropped.
    ///
    /// # Examples
    /// ```
    /// use odata_feed_core::FeedConfig;
    ///
    /// let config = FeedConfig::new("example.org", "/tool/cgi-bin/odata/", "tweets");
    /// assert_eq!(config.base_url(), "https://example.org/tool/cgi-bin/odata");
    /// assert_eq!(config.collection_url(), "https://example.org/tool/cgi-bin/odata/tweets");
    /// ```
    pub fn new(
        server_host: impl Into<String>,
        base_path: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        let mut path: String = base_path.into();
        while path.ends_with('/') {
            path.pop();
        }
        Self {
            server_host: server_host.into(),
            base_path: path,
            collection: collection.into(),
        }
    }

    /// Host name used in absolute URLs.
    #[must_use]
    pub fn server_host(&self) -> &str {
        &self.server_host
    }

    /// Path prefix under which collections are served.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Name of the served collection.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Absolute URL of the service root.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://{}{}", self.server_host, self.base_path)
    }

    /// Absolute URL of the collection.
    #[must_use]
    pub fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url(), self.collection)
    }
}

/// Immutable values for one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedContext {
    config: FeedConfig,
    total_count: u64,
    generated_at: NaiveDateTime,
    pagination: PaginationState,
}

impl FeedContext {
    /// Capture the context for a response generated now (UTC).
    #[must_use]
    pub fn new(config: FeedConfig, total_count: u64, pagination: PaginationState) -> Self {
        Self {
            config,
            total_count,
            generated_at: Utc::now().naive_utc(),
            pagination,
        }
    }

    /// Override the generation timestamp, e.g. for reproducible output.
    #[must_use]
    pub fn with_generated_at(mut self, generated_at: NaiveDateTime) -> Self {
        self.generated_at = generated_at;
        self
    }

    /// Request configuration.
    #[must_use]
    pub const fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Rows matching the request before paging.
    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    /// When the response was generated.
    #[must_use]
    pub const fn generated_at(&self) -> NaiveDateTime {
        self.generated_at
    }

    /// Paging in effect for the response.
    #[must_use]
    pub const fn pagination(&self) -> &PaginationState {
        &self.pagination
    }
}
