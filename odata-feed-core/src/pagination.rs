//! Paging parameters and continuation links.
//!
//! A request pages through a collection with `$top` (page size) and `$skip`
//! (offset), or resumes from a `$skiptoken` handed out in a previous
//! response's `next` link. The skip token is the next row index in decimal,
//! so decoding it reproduces the exact resume position.
//!
//! # Examples
//! ```
//! use odata_feed_core::PaginationState;
//!
//! # fn main() -> Result<(), odata_feed_core::PaginationError> {
//! let page = PaginationState::from_query("$top=50&$skip=100")?;
//! assert_eq!((page.offset(), page.limit()), (100, 50));
//! assert_eq!(page.continuation(150, 400).as_deref(), Some("?$top=50&$skip=150"));
//! assert_eq!(page.continuation(400, 400), None);
//! # Ok(())
//! # }
//! ```

use std::num::ParseIntError;

use thiserror::Error;
use url::form_urlencoded;

/// Page size applied when the request names none, and after a skip token.
pub const DEFAULT_PAGE_SIZE: u64 = 100_000;

/// Query parameter carrying the page size.
pub const TOP_PARAM: &str = "$top";
/// Query parameter carrying the row offset.
pub const SKIP_PARAM: &str = "$skip";
/// Query parameter carrying an opaque continuation value.
pub const SKIPTOKEN_PARAM: &str = "$skiptoken";

/// Errors raised while decoding paging parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// A parameter was present but not a non-negative integer.
    #[error("{parameter} must be a non-negative integer, got {value:?}")]
    InvalidParameter {
        /// Name of the offending query parameter.
        parameter: &'static str,
        /// Raw value as received.
        value: String,
        /// Integer parsing failure.
        #[source]
        source: ParseIntError,
    },
}

/// Resolved offset and limit for one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    offset: u64,
    limit: u64,
    skip_token: bool,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
            skip_token: false,
        }
    }
}

impl PaginationState {
    /// Page starting at `offset` returning at most `limit` rows.
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit,
            skip_token: false,
        }
    }

    /// Page resumed from a skip token.
    ///
    /// The limit is reset to [`DEFAULT_PAGE_SIZE`]; the client's original page
    /// size is not carried in the token.
    #[must_use]
    pub const fn resume(token: u64) -> Self {
        Self {
            offset: token,
            limit: DEFAULT_PAGE_SIZE,
            skip_token: true,
        }
    }

    /// Resolve paging from the raw `$top`, `$skip` and `$skiptoken` values.
    ///
    /// An empty skip token counts as absent. `$top` and `$skip` are always
    /// validated; a skip token then overrides both.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::InvalidParameter`] when a consulted value is
    /// not a non-negative integer.
    pub fn from_params(
        top: Option<&str>,
        skip: Option<&str>,
        skiptoken: Option<&str>,
    ) -> Result<Self, PaginationError> {
        let limit = top
            .map(|raw| parse_count(TOP_PARAM, raw))
            .transpose()?
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let offset = skip
            .map(|raw| parse_count(SKIP_PARAM, raw))
            .transpose()?
            .unwrap_or(0);
        match skiptoken.filter(|token| !token.is_empty()) {
            Some(token) => parse_count(SKIPTOKEN_PARAM, token).map(Self::resume),
            None => Ok(Self::new(offset, limit)),
        }
    }

    /// Resolve paging from a URL query string (with or without the leading
    /// `?`). The first occurrence of each parameter wins; other parameters are
    /// ignored.
    ///
    /// # Errors
    ///
    /// See [`PaginationState::from_params`].
    pub fn from_query(query: &str) -> Result<Self, PaginationError> {
        let pairs = query.strip_prefix('?').unwrap_or(query);
        let mut top = None;
        let mut skip = None;
        let mut skiptoken = None;
        for (key, value) in form_urlencoded::parse(pairs.as_bytes()) {
            let slot = match key.as_ref() {
                TOP_PARAM => &mut top,
                SKIP_PARAM => &mut skip,
                SKIPTOKEN_PARAM => &mut skiptoken,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        Self::from_params(top.as_deref(), skip.as_deref(), skiptoken.as_deref())
    }

    /// Zero-based index of the first row of the page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Maximum number of rows requested.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Whether the page was resumed from a skip token.
    #[must_use]
    pub const fn uses_skip_token(&self) -> bool {
        self.skip_token
    }

    /// Query string resuming at `next_index`, in the same style as this
    /// request (`$skip` or `$skiptoken`).
    #[must_use]
    pub fn next_query(&self, next_index: u64) -> String {
        let resume_param = if self.skip_token {
            SKIPTOKEN_PARAM
        } else {
            SKIP_PARAM
        };
        format!("?{TOP_PARAM}={}&{resume_param}={next_index}", self.limit)
    }

    /// Continuation query, present only while rows remain.
    #[must_use]
    pub fn continuation(&self, next_index: u64, total_count: u64) -> Option<String> {
        (next_index < total_count).then(|| self.next_query(next_index))
    }
}

fn parse_count(parameter: &'static str, raw: &str) -> Result<u64, PaginationError> {
    raw.parse::<u64>()
        .map_err(|source| PaginationError::InvalidParameter {
            parameter,
            value: raw.to_owned(),
            source,
        })
}
