//! HTTP executor for the vendor API.
//!
//! Retries and per-attempt pacing live in the middleware stack; this layer
//! adds the uncounted 429 wait and turns responses into [`FetchError`]s.

use super::types::{
    CharacterAchievements, CharacterEquipment, CharacterMedia, CharacterStatus, CharacterSummary, LeaderboardResponse, SeasonDetail,
    SeasonIndex,
};
use super::middleware::{Gates, RequestContext, with_middleware};
use super::urls::{CharacterResource, Endpoints};
use super::{ApiError, FetchError, MetricsSnapshot, RateLimiter, RequestMetrics, Throttler, parse_retry_after};
use crate::Result;
use crate::wow::{DungeonInfo, RealmInfo, Region, normalize_realm_slug};
use chrono::Utc;
use core::time::Duration;
use ohno::IntoAppError;
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::sync::CancellationToken;
use url::Url;

const LOG_TARGET: &str = "    client";

const USER_AGENT: &str = "WoWStatsDB/1.0";

pub const DEFAULT_CONCURRENCY: usize = 20;
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 90;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_PROFILE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

const POOL_MAX_IDLE_PER_HOST: usize = 10;
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Tunables for a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Maximum work units in flight, and separately, maximum requests in flight.
    pub concurrency: usize,

    /// Request pace, at least 1.
    pub requests_per_second: u32,

    /// Wall-clock limit for one HTTP call.
    pub timeout: Duration,

    /// Attempts per send before giving up. A 429 ends the send and starts a fresh budget.
    pub max_attempts: u32,

    /// Deadline for the three sub-fetches of one player profile.
    pub profile_timeout: Duration,

    /// First backoff delay; doubles on each counted failure.
    pub backoff_base: Duration,

    /// Send every region's requests to this base URL instead of the vendor host.
    pub api_base: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            profile_timeout: DEFAULT_PROFILE_TIMEOUT,
            backoff_base: DEFAULT_BACKOFF_BASE,
            api_base: None,
        }
    }
}

/// A player to look up through the profile API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerTarget {
    pub id: i64,
    pub name: String,
    pub realm_slug: String,
    pub region: Region,
}

/// Rate-limited, bounded-concurrency client for the vendor API.
///
/// Two gates bound the work: a unit slot per orchestrated fetch (one
/// leaderboard, one player profile) and a request slot per HTTP attempt.
/// Cloning is cheap; clones share the gates and the counters. Separate
/// [`Client::new`] calls get independent gates and counters.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: ClientWithMiddleware,
    token: String,
    endpoints: Endpoints,
    gates: Arc<Gates>,
    units: Arc<Throttler>,
    profile_timeout: Duration,
}

impl Client {
    pub fn new(token: &str, options: &ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(options.timeout)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .build()
            .into_app_err("building HTTP client")?;

        let gates = Arc::new(Gates {
            requests: Throttler::new(options.concurrency),
            rate: RateLimiter::new(options.requests_per_second),
            metrics: RequestMetrics::default(),
        });

        Ok(Self {
            inner: Arc::new(Inner {
                http: with_middleware(http, Arc::clone(&gates), options.backoff_base, options.max_attempts),
                token: token.to_string(),
                endpoints: Endpoints::new(options.api_base.as_deref())?,
                gates,
                units: Throttler::new(options.concurrency),
                profile_timeout: options.profile_timeout,
            }),
        })
    }

    /// Change the request pace. The next request goes out immediately.
    pub async fn set_request_rate(&self, requests_per_second: u32) {
        log::debug!(target: LOG_TARGET, "request pace set to {requests_per_second}/s");
        self.inner.gates.rate.reconfigure(requests_per_second).await;
    }

    #[must_use]
    pub fn stats(&self) -> MetricsSnapshot {
        self.inner.gates.metrics.snapshot()
    }

    pub(super) fn profile_timeout(&self) -> Duration {
        self.inner.profile_timeout
    }

    /// Wait for a work-unit slot. Held for the whole unit, retries included.
    pub(super) async fn unit_slot(&self, cancel: &CancellationToken) -> Result<OwnedSemaphorePermit, FetchError> {
        self.inner.units.acquire(cancel).await
    }

    /// Leaderboard for one realm, dungeon, and period.
    pub async fn fetch_leaderboard(
        &self,
        realm: &RealmInfo,
        dungeon: &DungeonInfo,
        period: &str,
        cancel: &CancellationToken,
    ) -> Result<LeaderboardResponse, FetchError> {
        let url = self.inner.endpoints.leaderboard(realm.region, realm.id, dungeon.id, period);
        self.get_json(&url, None, cancel).await
    }

    pub async fn fetch_season_index(&self, region: Region, cancel: &CancellationToken) -> Result<SeasonIndex, FetchError> {
        let url = self.inner.endpoints.season_index(region);
        self.get_json(&url, Some("fetch season index".to_string()), cancel).await
    }

    pub async fn fetch_season_detail(&self, region: Region, season_id: i64, cancel: &CancellationToken) -> Result<SeasonDetail, FetchError> {
        let url = self.inner.endpoints.season_detail(region, season_id);
        self.get_json(&url, Some(format!("fetch season {season_id}")), cancel).await
    }

    pub async fn fetch_character_summary(&self, player: &PlayerTarget, cancel: &CancellationToken) -> Result<CharacterSummary, FetchError> {
        self.get_json(&self.character_url(player, CharacterResource::Summary), None, cancel).await
    }

    pub async fn fetch_character_equipment(
        &self,
        player: &PlayerTarget,
        cancel: &CancellationToken,
    ) -> Result<CharacterEquipment, FetchError> {
        self.get_json(&self.character_url(player, CharacterResource::Equipment), None, cancel).await
    }

    pub async fn fetch_character_media(&self, player: &PlayerTarget, cancel: &CancellationToken) -> Result<CharacterMedia, FetchError> {
        self.get_json(&self.character_url(player, CharacterResource::Media), None, cancel).await
    }

    /// Whether the character still exists under this name and realm.
    pub async fn fetch_character_status(&self, player: &PlayerTarget, cancel: &CancellationToken) -> Result<CharacterStatus, FetchError> {
        self.get_json(&self.character_url(player, CharacterResource::Status), None, cancel).await
    }

    pub async fn fetch_character_achievements(
        &self,
        player: &PlayerTarget,
        cancel: &CancellationToken,
    ) -> Result<CharacterAchievements, FetchError> {
        self.get_json(&self.character_url(player, CharacterResource::Achievements), None, cancel).await
    }

    fn character_url(&self, player: &PlayerTarget, resource: CharacterResource) -> Url {
        let realm_slug = normalize_realm_slug(player.region, &player.realm_slug);
        self.inner.endpoints.character(player.region, &realm_slug, &player.name, resource)
    }

    /// GET `url` and decode the body.
    ///
    /// - 429: wait `max(Retry-After, 2s)` and send again with a fresh attempt budget.
    /// - 404 and cancellation: returned at once.
    /// - anything else has used up the retry layer's attempts and is reported as exhausted.
    ///
    /// The body is decoded after the send returns, so decode failures are never retried.
    async fn get_json<T: DeserializeOwned>(&self, url: &Url, operation: Option<String>, cancel: &CancellationToken) -> Result<T, FetchError> {
        loop {
            let context = RequestContext::new(cancel);
            let err = match self.send(url, &context, cancel).await {
                Ok(response) => {
                    let bytes = response.bytes().await.map_err(|e| FetchError::Transport(e.into()))?;
                    return serde_json::from_slice(&bytes).map_err(FetchError::Decode);
                }
                Err(err) => err,
            };

            match &err {
                FetchError::Api(api) if api.is_rate_limited() => {
                    let delay = api.retry_delay();
                    log::debug!(target: LOG_TARGET, "429 for {}, backing off for {}ms", url.path(), delay.as_millis());
                    sleep_or_cancel(delay, cancel).await?;
                }
                FetchError::Api(api) if api.is_not_found() => return Err(err),
                FetchError::Cancelled => return Err(err),
                _ => {
                    let attempts = context.attempts().max(1);
                    log::debug!(target: LOG_TARGET, "giving up on {} after {attempts} attempts: {err}", url.path());
                    return Err(FetchError::Exhausted {
                        operation,
                        attempts,
                        last: Box::new(err),
                    });
                }
            }
        }
    }

    /// One pass through the middleware stack. Only a 200 comes back as `Ok`.
    async fn send(&self, url: &Url, context: &RequestContext, cancel: &CancellationToken) -> Result<Response, FetchError> {
        let response = self
            .inner
            .http
            .get(url.clone())
            .bearer_auth(&self.inner.token)
            .with_extension(context.clone())
            .send()
            .await
            .map_err(|e| if cancel.is_cancelled() { FetchError::Cancelled } else { FetchError::Transport(e) })?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| parse_retry_after(value, Utc::now()));
        let body = response.text().await.unwrap_or_default();
        Err(FetchError::Api(ApiError::new(status.as_u16(), &body, retry_after)))
    }
}

/// Delay before retrying after the `attempt`-th counted failure (1-based).
#[must_use]
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1 << attempt.saturating_sub(1).min(16))
}

async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> Result<(), FetchError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(FetchError::Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 4), Duration::from_secs(8));
    }

    #[test]
    fn test_default_options() {
        let options = ClientOptions::default();
        assert_eq!(options.concurrency, 20);
        assert_eq!(options.requests_per_second, 90);
        assert_eq!(options.timeout, Duration::from_secs(15));
        assert_eq!(options.max_attempts, 3);
        assert_eq!(options.profile_timeout, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_or_cancel() {
        let cancel = CancellationToken::new();
        assert!(sleep_or_cancel(Duration::from_secs(1), &cancel).await.is_ok());

        cancel.cancel();
        let start = tokio::time::Instant::now();
        assert!(matches!(
            sleep_or_cancel(Duration::from_secs(60), &cancel).await,
            Err(FetchError::Cancelled)
        ));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_new_client_has_fresh_counters() {
        let client = Client::new("token", &ClientOptions::default()).unwrap();
        assert_eq!(client.stats().requests, 0);
        assert_eq!(client.profile_timeout(), Duration::from_secs(30));
    }
}
