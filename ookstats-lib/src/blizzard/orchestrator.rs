//! Fan-out of leaderboard and profile fetches.
//!
//! Every entry point returns a channel receiver immediately. Results arrive in
//! completion order, so consumers key by the carried realm, dungeon, and period
//! rather than relying on position. The channel closes once every producer has
//! finished.
//!
//! Each unit of work (one leaderboard, one profile, one status check) first
//! waits for a unit slot, then pauses briefly, then starts its requests. A unit
//! still waiting for its slot when cancellation fires reports `Cancelled`.

use super::types::{CharacterAchievements, CharacterEquipment, CharacterMedia, CharacterStatus, CharacterSummary, LeaderboardResponse};
use super::{Client, FetchError, PlayerTarget};
use crate::wow::{DungeonInfo, RealmInfo};
use core::time::Duration;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "     fetch";

/// Pause after taking a unit slot, to smooth bursts.
const STAGGER: Duration = Duration::from_millis(20);

/// Outcome of one (realm, dungeon, period) fetch.
#[derive(Debug)]
pub struct FetchResult {
    pub realm: RealmInfo,
    pub dungeon: DungeonInfo,
    pub period: String,
    pub outcome: Result<LeaderboardResponse, FetchError>,
}

impl FetchResult {
    /// A 404 means the vendor has no runs for this combination.
    #[must_use]
    pub fn is_empty_observation(&self) -> bool {
        match &self.outcome {
            Ok(lb) => lb.is_empty(),
            Err(e) => e.is_not_found(),
        }
    }
}

/// Outcome of the three profile sub-fetches for one player.
#[derive(Debug)]
pub struct ProfileResult {
    pub player: PlayerTarget,
    pub summary: Option<CharacterSummary>,
    pub equipment: Option<CharacterEquipment>,
    pub media: Option<CharacterMedia>,

    /// First sub-fetch error observed, if any.
    pub error: Option<FetchError>,
}

impl ProfileResult {
    fn failed(player: PlayerTarget, error: FetchError) -> Self {
        Self {
            player,
            summary: None,
            equipment: None,
            media: None,
            error: Some(error),
        }
    }

    /// Whether none of the three parts arrived.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.summary.is_none() && self.equipment.is_none() && self.media.is_none()
    }
}

/// Outcome of one character status check.
#[derive(Debug)]
pub struct StatusResult {
    pub player: PlayerTarget,
    pub status: Result<CharacterStatus, FetchError>,

    /// Present only when achievements were requested and the character is valid.
    pub achievements: Option<Result<CharacterAchievements, FetchError>>,
}

impl StatusResult {
    /// A 404 or an explicit `is_valid: false` both mean the character is gone.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        match &self.status {
            Ok(status) => !status.is_valid,
            Err(e) => e.is_not_found(),
        }
    }
}

impl Client {
    /// Fetch one realm's leaderboard for every dungeon.
    pub fn fetch_leaderboards_for_realm(
        &self,
        realm: RealmInfo,
        dungeons: &[DungeonInfo],
        period: &str,
        cancel: &CancellationToken,
    ) -> mpsc::Receiver<FetchResult> {
        let (tx, rx) = mpsc::channel(dungeons.len().max(1));

        for dungeon in dungeons {
            let client = self.clone();
            let tx = tx.clone();
            let cancel = cancel.clone();
            let dungeon = *dungeon;
            let period = period.to_string();

            drop(tokio::spawn(async move {
                let outcome = match client.unit_slot(&cancel).await {
                    Err(e) => Err(e),
                    Ok(_slot) => {
                        tokio::time::sleep(STAGGER).await;
                        client.fetch_leaderboard(&realm, &dungeon, &period, &cancel).await
                    }
                };

                if let Err(e) = &outcome {
                    log::debug!(target: LOG_TARGET, "{}/{} period {period}: {e}", realm.slug, dungeon.slug);
                }

                let _ = tx
                    .send(FetchResult {
                        realm,
                        dungeon,
                        period,
                        outcome,
                    })
                    .await;
            }));
        }

        rx
    }

    /// Fetch every realm × dungeon combination for one period.
    ///
    /// Per-realm streams are merged onto one channel. Once `cancel` fires the
    /// forwarders stop, and the channel closes after they exit.
    pub fn fetch_all_realms(
        &self,
        realms: &[RealmInfo],
        dungeons: &[DungeonInfo],
        period: &str,
        cancel: &CancellationToken,
    ) -> mpsc::Receiver<FetchResult> {
        let (tx, rx) = mpsc::channel((realms.len() * dungeons.len()).max(1));

        for realm in realms {
            let mut realm_rx = self.fetch_leaderboards_for_realm(*realm, dungeons, period, cancel);
            let tx = tx.clone();
            let cancel = cancel.clone();

            drop(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        item = realm_rx.recv() => match item {
                            Some(result) => {
                                if tx.send(result).await.is_err() {
                                    break;
                                }
                            }
                            None => break,
                        },
                    }
                }
            }));
        }

        rx
    }

    /// Fetch summary, equipment, and media for every player.
    pub fn fetch_player_profiles(&self, players: Vec<PlayerTarget>, cancel: &CancellationToken) -> mpsc::Receiver<ProfileResult> {
        let (tx, rx) = mpsc::channel(players.len().max(1));

        for player in players {
            let client = self.clone();
            let tx = tx.clone();
            let cancel = cancel.clone();

            drop(tokio::spawn(async move {
                let result = client.fetch_player_profile(player, &cancel).await;
                let _ = tx.send(result).await;
            }));
        }

        rx
    }

    /// Run the three profile sub-fetches concurrently under one deadline.
    ///
    /// The deadline starts once the unit slot is held, so time spent queueing
    /// behind other players does not count against it.
    pub async fn fetch_player_profile(&self, player: PlayerTarget, cancel: &CancellationToken) -> ProfileResult {
        let _slot = match self.unit_slot(cancel).await {
            Ok(slot) => slot,
            Err(e) => return ProfileResult::failed(player, e),
        };
        tokio::time::sleep(STAGGER).await;

        let deadline = Instant::now() + self.profile_timeout();
        let first_error = OnceLock::new();

        let (summary, equipment, media) = tokio::join!(
            sub_fetch("summary", deadline, &first_error, self.fetch_character_summary(&player, cancel)),
            sub_fetch("equipment", deadline, &first_error, self.fetch_character_equipment(&player, cancel)),
            sub_fetch("media", deadline, &first_error, self.fetch_character_media(&player, cancel)),
        );

        let error = first_error.into_inner();
        if let Some(e) = &error {
            log::debug!(target: LOG_TARGET, "profile {}-{}/{}: {e}", player.region, player.realm_slug, player.name);
        }

        ProfileResult {
            player,
            summary,
            equipment,
            media,
            error,
        }
    }

    /// Check every player's status, and optionally fetch achievements for the valid ones.
    pub fn fetch_player_statuses(
        &self,
        players: Vec<PlayerTarget>,
        with_achievements: bool,
        cancel: &CancellationToken,
    ) -> mpsc::Receiver<StatusResult> {
        let (tx, rx) = mpsc::channel(players.len().max(1));

        for player in players {
            let client = self.clone();
            let tx = tx.clone();
            let cancel = cancel.clone();

            drop(tokio::spawn(async move {
                let result = client.fetch_player_status(player, with_achievements, &cancel).await;
                let _ = tx.send(result).await;
            }));
        }

        rx
    }

    async fn fetch_player_status(&self, player: PlayerTarget, with_achievements: bool, cancel: &CancellationToken) -> StatusResult {
        let _slot = match self.unit_slot(cancel).await {
            Ok(slot) => slot,
            Err(e) => {
                return StatusResult {
                    player,
                    status: Err(e),
                    achievements: None,
                };
            }
        };
        tokio::time::sleep(STAGGER).await;

        let status = self.fetch_character_status(&player, cancel).await;
        let achievements = match &status {
            Ok(status) if with_achievements && status.is_valid => Some(self.fetch_character_achievements(&player, cancel).await),
            _ => None,
        };

        if let Err(e) = &status {
            log::debug!(target: LOG_TARGET, "status {}-{}/{}: {e}", player.region, player.realm_slug, player.name);
        }

        StatusResult {
            player,
            status,
            achievements,
        }
    }
}

async fn sub_fetch<T>(
    kind: &'static str,
    deadline: Instant,
    first_error: &OnceLock<FetchError>,
    fut: impl Future<Output = Result<T, FetchError>>,
) -> Option<T> {
    let err = match tokio::time::timeout_at(deadline, fut).await {
        Ok(Ok(value)) => return Some(value),
        Ok(Err(e)) => FetchError::SubFetch { kind, source: Box::new(e) },
        Err(_) => FetchError::Timeout(kind),
    };

    let _ = first_error.set(err);
    None
}
