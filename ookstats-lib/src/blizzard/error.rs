use chrono::{DateTime, Utc};
use core::fmt::{Display, Formatter};
use core::time::Duration;

/// Minimum wait after a 429, regardless of what `Retry-After` says.
pub const MIN_RATE_LIMIT_DELAY: Duration = Duration::from_secs(2);

/// A non-200 response from the vendor API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,

    /// Response body with surrounding whitespace removed.
    pub body: String,

    /// Parsed `Retry-After` header, when present and in the future.
    pub retry_after: Option<Duration>,
}

impl ApiError {
    #[must_use]
    pub fn new(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        Self {
            status,
            body: body.trim().to_string(),
            retry_after,
        }
    }

    /// How long to wait before retrying a rate-limited request.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry_after.unwrap_or_default().max(MIN_RATE_LIMIT_DELAY)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        self.status == 404
    }

    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "API request failed with status {}: {}", self.status, self.body)
    }
}

impl core::error::Error for ApiError {}

/// Failure of a vendor API fetch.
///
/// Callers branch on the variant: 404s are empty observations, cancellation is
/// reported per unit of work, everything else is a real failure.
#[derive(Debug)]
pub enum FetchError {
    /// Connection, DNS, or per-call timeout failure, after any retries.
    Transport(reqwest_middleware::Error),

    /// The server answered with something other than 200.
    Api(ApiError),

    /// A 200 response whose body did not match the expected shape.
    Decode(serde_json::Error),

    /// The ambient cancellation token fired.
    Cancelled,

    /// A profile sub-fetch did not finish before the profile deadline.
    Timeout(&'static str),

    /// One part of a multi-part profile fetch failed.
    SubFetch { kind: &'static str, source: Box<Self> },

    /// Every counted attempt failed.
    Exhausted {
        /// What was being fetched, for messages like `failed to fetch season index after ...`.
        operation: Option<String>,
        attempts: u32,
        last: Box<Self>,
    },
}

impl FetchError {
    /// Whether this is a 404 from the server.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(api) if api.is_not_found())
    }

    /// Whether the ambient cancellation token ended this fetch, looking through wrappers.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::SubFetch { source, .. } => source.is_cancelled(),
            Self::Exhausted { last, .. } => last.is_cancelled(),
            Self::Transport(_) | Self::Api(_) | Self::Decode(_) | Self::Timeout(_) => false,
        }
    }

    /// HTTP status carried by the error, looking through wrappers.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(api) => Some(api.status),
            Self::SubFetch { source, .. } => source.status(),
            Self::Exhausted { last, .. } => last.status(),
            Self::Transport(_) | Self::Decode(_) | Self::Cancelled | Self::Timeout(_) => None,
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "HTTP request failed: {e}"),
            Self::Api(api) => api.fmt(f),
            Self::Decode(e) => write!(f, "failed to decode response: {e}"),
            Self::Cancelled => f.write_str("operation cancelled"),
            Self::Timeout(kind) => write!(f, "{kind} fetch timeout"),
            Self::SubFetch { kind, source } => write!(f, "{kind} fetch failed: {source}"),
            Self::Exhausted {
                operation: Some(operation),
                attempts,
                last,
            } => write!(f, "failed to {operation} after {attempts} attempts: {last}"),
            Self::Exhausted {
                operation: None,
                attempts,
                last,
            } => write!(f, "failed after {attempts} attempts: {last}"),
        }
    }
}

impl core::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Decode(e) => Some(e),
            Self::Api(e) => Some(e),
            Self::SubFetch { source, .. } => Some(source.as_ref()),
            Self::Exhausted { last, .. } => Some(last.as_ref()),
            Self::Cancelled | Self::Timeout(_) => None,
        }
    }
}

/// Parse a `Retry-After` header value.
///
/// Accepts a positive number of seconds or an HTTP-date. Dates in the past,
/// zero, and anything unparseable yield `None`.
#[must_use]
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(secs) = value.parse::<u64>() {
        return (secs > 0).then(|| Duration::from_secs(secs));
    }

    let when = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    (when - now).to_std().ok().filter(|d| !d.is_zero())
}
