//! Client for the vendor's leaderboard and profile API.
//!
//! Every outbound attempt passes two shared gates, a request slot and a rate
//! slot, before it is issued. Orchestrated fetches also hold a work-unit slot.
//! Failures are classified into [`FetchError`] so callers can tell "no data"
//! from "broken".

mod client;
mod error;
mod member;
mod metrics;
mod middleware;
mod orchestrator;
mod periods;
mod rate_limiter;
mod throttler;
mod types;
mod urls;

pub use client::{Client, ClientOptions, PlayerTarget, backoff_delay};
pub use error::{ApiError, FetchError, MIN_RATE_LIMIT_DELAY, parse_retry_after};
pub use member::Member;
pub use metrics::{MetricsSnapshot, RequestMetrics};
pub use orchestrator::{FetchResult, ProfileResult, StatusResult};
pub use periods::{PeriodPlan, fetch_with_period_fallback};
pub use rate_limiter::RateLimiter;
pub use throttler::Throttler;
pub use types::{
    AchievementCriteria, ChallengeRun, CharacterAchievement, CharacterAchievements, CharacterEquipment, CharacterMedia, CharacterRef,
    CharacterStatus, CharacterSummary, EnchantmentSlot, EquippedItem, GuildRef, Href, ItemEnchantment, ItemRef, KeyedRef,
    LeaderboardResponse, MediaAsset, NamedRef, RealmBrief, SeasonDetail, SeasonIndex, SpellRef, TypeRef,
};
pub use urls::{CharacterResource, Endpoints};
