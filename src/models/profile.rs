use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{AnimeTitle, Channel};
use crate::error::{AppError, AppResult};

/// A known entry on a user's animelist
///
/// Zero ("not on the list") is never represented; a title is known to the user
/// iff its profile holds a value for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileValue {
    /// Explicit score between 1 and 10
    Score(u8),
    /// Listed without a score ('-' on MyAnimeList)
    Unscored,
    /// Binary watched flag used by the content channel
    Watched,
}

impl ProfileValue {
    /// Numeric value as fed to matrix factorization (unscored entries count as 0)
    pub fn as_numeric(&self) -> f64 {
        match self {
            ProfileValue::Score(score) => f64::from(*score),
            ProfileValue::Unscored => 0.0,
            ProfileValue::Watched => 1.0,
        }
    }

    /// Interprets a raw table value for the given channel
    ///
    /// Returns `None` for zero values, which mean the title is not on the list.
    pub fn from_raw(channel: Channel, raw: &RawScore) -> AppResult<Option<Self>> {
        let numeric = match raw {
            RawScore::Flag(false) => return Ok(None),
            RawScore::Flag(true) => None,
            RawScore::Text(text) if text.trim() == "-" => None,
            RawScore::Text(text) => Some(text.trim().parse::<f64>().map_err(|_| {
                AppError::InvalidInput(format!("Unrecognised score value '{}'", text))
            })?),
            RawScore::Number(n) => Some(*n),
        };

        if numeric == Some(0.0) {
            return Ok(None);
        }

        match channel {
            Channel::Content => Ok(Some(ProfileValue::Watched)),
            Channel::Collaborative => match numeric {
                None => Ok(Some(ProfileValue::Unscored)),
                Some(n) if n.fract() == 0.0 && (1.0..=10.0).contains(&n) => {
                    Ok(Some(ProfileValue::Score(n as u8)))
                }
                Some(n) => Err(AppError::InvalidInput(format!("Score out of range: {}", n))),
            },
        }
    }
}

/// Untyped score as it appears in scraped data and artifact files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScore {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl From<ProfileValue> for RawScore {
    fn from(value: ProfileValue) -> Self {
        match value {
            ProfileValue::Score(score) => RawScore::Number(f64::from(score)),
            ProfileValue::Unscored => RawScore::Text("-".to_string()),
            ProfileValue::Watched => RawScore::Number(1.0),
        }
    }
}

/// Set of titles already known to a user
pub trait KnownTitles {
    fn is_known(&self, title: &AnimeTitle) -> bool;
}

impl KnownTitles for HashSet<AnimeTitle> {
    fn is_known(&self, title: &AnimeTitle) -> bool {
        self.contains(title)
    }
}

/// One user's known titles for a single channel
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub user_id: String,
    entries: BTreeMap<AnimeTitle, ProfileValue>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Records a title; a later insert for the same title replaces the value
    pub fn insert(&mut self, title: impl Into<AnimeTitle>, value: ProfileValue) {
        self.entries.insert(title.into(), value);
    }

    pub fn get(&self, title: &str) -> Option<ProfileValue> {
        self.entries.get(title).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Known titles in title order
    pub fn titles(&self) -> impl Iterator<Item = &AnimeTitle> {
        self.entries.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&AnimeTitle, ProfileValue)> {
        self.entries.iter().map(|(title, value)| (title, *value))
    }
}

impl KnownTitles for UserProfile {
    fn is_known(&self, title: &AnimeTitle) -> bool {
        self.entries.contains_key(title)
    }
}

/// Serialized form of a user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub user_id: String,
    #[serde(default)]
    pub entries: BTreeMap<String, RawScore>,
}

/// Profiles of every user for one channel
#[derive(Debug, Clone)]
pub struct ProfileTable {
    channel: Channel,
    order: Vec<String>,
    profiles: HashMap<String, UserProfile>,
}

impl ProfileTable {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            order: Vec::new(),
            profiles: HashMap::new(),
        }
    }

    /// Builds a table from serialized records, dropping zero entries
    pub fn from_records(channel: Channel, records: Vec<ProfileRecord>) -> AppResult<Self> {
        let mut table = Self::new(channel);

        for record in records {
            let mut profile = UserProfile::new(record.user_id);
            for (title, raw) in &record.entries {
                if let Some(value) = ProfileValue::from_raw(channel, raw)? {
                    profile.insert(title.as_str(), value);
                }
            }
            table.insert(profile)?;
        }

        Ok(table)
    }

    pub fn to_records(&self) -> Vec<ProfileRecord> {
        self.iter()
            .map(|profile| ProfileRecord {
                user_id: profile.user_id.clone(),
                entries: profile
                    .entries()
                    .map(|(title, value)| (title.to_string(), RawScore::from(value)))
                    .collect(),
            })
            .collect()
    }

    /// Adds a profile; each user may appear only once
    pub fn insert(&mut self, profile: UserProfile) -> AppResult<()> {
        if self.profiles.contains_key(&profile.user_id) {
            return Err(AppError::InvalidInput(format!(
                "Duplicate {} profile for user {}",
                self.channel, profile.user_id
            )));
        }

        self.order.push(profile.user_id.clone());
        self.profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    pub fn profile_for(&self, user_id: &str) -> AppResult<&UserProfile> {
        self.profiles
            .get(user_id)
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// User ids in insertion order
    pub fn users(&self) -> &[String] {
        &self.order
    }

    /// Profiles in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &UserProfile> {
        self.order.iter().filter_map(|user_id| self.profiles.get(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborative_raw_values() {
        let ch = Channel::Collaborative;
        assert_eq!(
            ProfileValue::from_raw(ch, &RawScore::Number(8.0)).unwrap(),
            Some(ProfileValue::Score(8))
        );
        assert_eq!(
            ProfileValue::from_raw(ch, &RawScore::Text("-".to_string())).unwrap(),
            Some(ProfileValue::Unscored)
        );
        assert_eq!(
            ProfileValue::from_raw(ch, &RawScore::Text("10".to_string())).unwrap(),
            Some(ProfileValue::Score(10))
        );
        assert_eq!(ProfileValue::from_raw(ch, &RawScore::Number(0.0)).unwrap(), None);
        assert!(ProfileValue::from_raw(ch, &RawScore::Number(11.0)).is_err());
        assert!(ProfileValue::from_raw(ch, &RawScore::Text("great".to_string())).is_err());
    }

    #[test]
    fn test_content_raw_values() {
        let ch = Channel::Content;
        assert_eq!(
            ProfileValue::from_raw(ch, &RawScore::Number(1.0)).unwrap(),
            Some(ProfileValue::Watched)
        );
        assert_eq!(
            ProfileValue::from_raw(ch, &RawScore::Flag(true)).unwrap(),
            Some(ProfileValue::Watched)
        );
        assert_eq!(ProfileValue::from_raw(ch, &RawScore::Flag(false)).unwrap(), None);
        assert_eq!(ProfileValue::from_raw(ch, &RawScore::Number(0.0)).unwrap(), None);
    }

    #[test]
    fn test_unscored_is_known_but_numerically_zero() {
        let mut profile = UserProfile::new("alice");
        profile.insert("Haikyuu!!", ProfileValue::Unscored);

        assert!(profile.is_known(&AnimeTitle::from("Haikyuu!!")));
        assert_eq!(profile.get("Haikyuu!!").unwrap().as_numeric(), 0.0);
    }

    #[test]
    fn test_table_from_records_drops_zero_entries() {
        let json = r#"[
            {"user_id": "alice", "entries": {"Akira": 9, "Paprika": 0, "Monster": "-"}},
            {"user_id": "bob", "entries": {}}
        ]"#;
        let records: Vec<ProfileRecord> = serde_json::from_str(json).unwrap();
        let table = ProfileTable::from_records(Channel::Collaborative, records).unwrap();

        let alice = table.profile_for("alice").unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.is_known(&AnimeTitle::from("Akira")));
        assert!(!alice.is_known(&AnimeTitle::from("Paprika")));
        assert!(table.profile_for("bob").unwrap().is_empty());
        assert_eq!(table.users(), &["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn test_profile_for_missing_user() {
        let table = ProfileTable::new(Channel::Content);
        assert!(matches!(
            table.profile_for("ghost"),
            Err(AppError::UserNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_profile_rejected() {
        let mut table = ProfileTable::new(Channel::Content);
        table.insert(UserProfile::new("alice")).unwrap();
        assert!(table.insert(UserProfile::new("alice")).is_err());
    }

    #[test]
    fn test_records_round_trip_preserves_unscored() {
        let mut profile = UserProfile::new("alice");
        profile.insert("Akira", ProfileValue::Score(7));
        profile.insert("Monster", ProfileValue::Unscored);
        let mut table = ProfileTable::new(Channel::Collaborative);
        table.insert(profile.clone()).unwrap();

        let rebuilt =
            ProfileTable::from_records(Channel::Collaborative, table.to_records()).unwrap();
        assert_eq!(rebuilt.profile_for("alice").unwrap(), &profile);
    }
}
