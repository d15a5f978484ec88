use crate::Result;
use crate::wow::Region;
use ohno::{IntoAppError, app_err};
use url::Url;

const LOCALE: &str = "en_US";

/// Character sub-resources under `/profile/wow/character/{realm}/{name}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterResource {
    Summary,
    Equipment,
    Media,
    Status,
    Achievements,
}

impl CharacterResource {
    const fn segment(self) -> Option<&'static str> {
        match self {
            Self::Summary => None,
            Self::Equipment => Some("equipment"),
            Self::Media => Some("character-media"),
            Self::Status => Some("status"),
            Self::Achievements => Some("achievements"),
        }
    }
}

/// Builds vendor API URLs.
///
/// Each region has its own host. An override base sends every region to the
/// same host, which is how tests point the client at a mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    // indexed by `Region as usize`
    bases: Vec<Url>,
}

impl Endpoints {
    pub fn new(base_override: Option<&str>) -> Result<Self> {
        let mut bases = Vec::new();
        for region in Region::all() {
            let raw = base_override.map_or_else(|| region.api_base(), ToString::to_string);
            let url = Url::parse(&raw).into_app_err_with(|| format!("invalid API base URL '{raw}'"))?;
            if url.cannot_be_a_base() {
                return Err(app_err!("API base URL '{raw}' cannot carry a path"));
            }
            bases.push(url);
        }

        Ok(Self { bases })
    }

    fn build(&self, region: Region, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.bases[region as usize].clone();
        if let Ok(mut path) = url.path_segments_mut() {
            let _ = path.pop_if_empty().extend(segments);
        }
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                let _ = pairs.append_pair(key, value);
            }
        }
        url
    }

    /// `/data/wow/connected-realm/{realm_id}/mythic-leaderboard/{dungeon_id}/period/{period}`
    #[must_use]
    pub fn leaderboard(&self, region: Region, realm_id: i64, dungeon_id: i64, period: &str) -> Url {
        let namespace = region.dynamic_namespace();
        self.build(
            region,
            &[
                "data",
                "wow",
                "connected-realm",
                &realm_id.to_string(),
                "mythic-leaderboard",
                &dungeon_id.to_string(),
                "period",
                period,
            ],
            &[("namespace", &namespace)],
        )
    }

    #[must_use]
    pub fn season_index(&self, region: Region) -> Url {
        let namespace = region.dynamic_namespace();
        self.build(
            region,
            &["data", "wow", "mythic-keystone", "season", "index"],
            &[("namespace", &namespace), ("locale", LOCALE)],
        )
    }

    #[must_use]
    pub fn season_detail(&self, region: Region, season_id: i64) -> Url {
        let namespace = region.dynamic_namespace();
        self.build(
            region,
            &["data", "wow", "mythic-keystone", "season", &season_id.to_string()],
            &[("namespace", &namespace), ("locale", LOCALE)],
        )
    }

    /// Character profile URL. The name is lower-cased.
    #[must_use]
    pub fn character(&self, region: Region, realm_slug: &str, name: &str, resource: CharacterResource) -> Url {
        let namespace = region.profile_namespace();
        let name = name.to_lowercase();
        let mut segments = vec!["profile", "wow", "character", realm_slug, name.as_str()];
        segments.extend(resource.segment());
        self.build(region, &segments, &[("namespace", &namespace), ("locale", LOCALE)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaderboard_url() {
        let endpoints = Endpoints::new(None).unwrap();
        let url = endpoints.leaderboard(Region::Us, 4385, 2, "1034");
        assert_eq!(
            url.as_str(),
            "https://us.api.blizzard.com/data/wow/connected-realm/4385/mythic-leaderboard/2/period/1034?namespace=dynamic-classic-us"
        );
    }

    #[test]
    fn test_season_urls() {
        let endpoints = Endpoints::new(None).unwrap();
        assert_eq!(
            endpoints.season_index(Region::Eu).as_str(),
            "https://eu.api.blizzard.com/data/wow/mythic-keystone/season/index?namespace=dynamic-classic-eu&locale=en_US"
        );
        assert_eq!(
            endpoints.season_detail(Region::Kr, 11).as_str(),
            "https://kr.api.blizzard.com/data/wow/mythic-keystone/season/11?namespace=dynamic-classic-kr&locale=en_US"
        );
    }

    #[test]
    fn test_character_urls_lowercase_name() {
        let endpoints = Endpoints::new(None).unwrap();
        assert_eq!(
            endpoints.character(Region::Us, "pagle", "OokOok", CharacterResource::Summary).as_str(),
            "https://us.api.blizzard.com/profile/wow/character/pagle/ookook?namespace=profile-classic-us&locale=en_US"
        );
        assert_eq!(
            endpoints.character(Region::Tw, "ivus", "Abc", CharacterResource::Media).path(),
            "/profile/wow/character/ivus/abc/character-media"
        );
    }

    #[test]
    fn test_non_ascii_name_is_encoded() {
        let endpoints = Endpoints::new(None).unwrap();
        let url = endpoints.character(Region::Eu, "everlook", "Æther", CharacterResource::Equipment);
        assert_eq!(url.path(), "/profile/wow/character/everlook/%C3%A6ther/equipment");
    }

    #[test]
    fn test_override_base() {
        let endpoints = Endpoints::new(Some("http://127.0.0.1:9999")).unwrap();
        let url = endpoints.season_index(Region::Tw);
        assert_eq!(url.host_str(), Some("127.0.0.1"));
        assert_eq!(url.port(), Some(9999));
        assert!(url.query().unwrap().contains("dynamic-classic-tw"));
    }

    #[test]
    fn test_bad_override_rejected() {
        assert!(Endpoints::new(Some("not a url")).is_err());
        assert!(Endpoints::new(Some("mailto:x@y")).is_err());
    }
}
