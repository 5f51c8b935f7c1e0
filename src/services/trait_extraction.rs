//! Roster resolution and trait extraction for a single conversation source.
//!
//! Personality payloads come in three shapes. Each shape is an
//! [`ExtractionStrategy`]; they are tried in [`ExtractionStrategy::ORDERED`]
//! order and the first one that yields traits wins.

use indexmap::IndexSet;
use serde_json::Value;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{normalize_traits, Session};

const ESSENCE_PROFILE: &str = "essence_profile";

/// One participant of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub name: String,
    pub is_me: bool,
}

/// The current user's place in a roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterMatch {
    /// Zero-based position in the roster
    pub position: usize,
    pub name: String,
}

/// Parse a participants payload.
///
/// Accepts a bare array or `{"participants": [...]}`; each entry is a name
/// string or an object with `name`/`username` and an optional `isMe`/`is_me`.
pub fn parse_roster(source_id: &str, payload: &Value) -> DomainResult<Vec<RosterEntry>> {
    let entries = match payload {
        Value::Array(entries) => entries,
        Value::Object(map) => match map.get("participants") {
            Some(Value::Array(entries)) => entries,
            _ => return Err(malformed(source_id, "roster has no participants array")),
        },
        _ => return Err(malformed(source_id, "roster is neither an array nor an object")),
    };

    entries
        .iter()
        .map(|entry| match entry {
            Value::String(name) => Ok(RosterEntry {
                name: name.clone(),
                is_me: false,
            }),
            Value::Object(map) => {
                let name = map
                    .get("name")
                    .or_else(|| map.get("username"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| malformed(source_id, "roster entry without a name"))?;
                let is_me = map
                    .get("isMe")
                    .or_else(|| map.get("is_me"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                Ok(RosterEntry {
                    name: name.to_string(),
                    is_me,
                })
            }
            _ => Err(malformed(source_id, "unsupported roster entry")),
        })
        .collect()
}

/// Find the single roster entry that is the session's user.
///
/// Explicit `isMe` flags take precedence over name matching. Returns `None`
/// unless exactly one entry qualifies.
pub fn resolve_current_user(roster: &[RosterEntry], session: &Session) -> Option<RosterMatch> {
    let flagged: Vec<usize> = roster
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.is_me)
        .map(|(i, _)| i)
        .collect();

    let candidates = if flagged.is_empty() {
        let wanted = session.roster_name();
        roster
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.name == wanted)
            .map(|(i, _)| i)
            .collect()
    } else {
        flagged
    };

    match candidates.as_slice() {
        [position] => Some(RosterMatch {
            position: *position,
            name: roster[*position].name.clone(),
        }),
        _ => None,
    }
}

/// Known personality payload shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// `{ "<username>": { "essence_profile": ... } }`
    UsernameKeyed,
    /// `{ "X": ..., "Z": ... }`, X for the first roster entry
    XzKeyed,
    /// `{ "user1": ..., "user2": ... }`, user1 for the first roster entry
    UserPairKeyed,
}

impl ExtractionStrategy {
    pub const ORDERED: [Self; 3] = [Self::UsernameKeyed, Self::XzKeyed, Self::UserPairKeyed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsernameKeyed => "username_keyed",
            Self::XzKeyed => "xz_keyed",
            Self::UserPairKeyed => "user_pair_keyed",
        }
    }

    /// Traits for `me`, or `None` when the payload does not have this shape.
    pub fn extract(&self, payload: &Value, me: &RosterMatch) -> Option<IndexSet<String>> {
        let profile = match self {
            Self::UsernameKeyed => payload.get(me.name.as_str())?.get(ESSENCE_PROFILE)?,
            Self::XzKeyed => payload.get(positional_key(me.position, ["X", "Z"])?)?,
            Self::UserPairKeyed => payload.get(positional_key(me.position, ["user1", "user2"])?)?,
        };
        read_profile(profile)
    }
}

fn positional_key(position: usize, keys: [&'static str; 2]) -> Option<&'static str> {
    keys.get(position).copied()
}

/// Read a profile value into a normalized trait set.
fn read_profile(value: &Value) -> Option<IndexSet<String>> {
    let traits = match value {
        Value::Object(map) => return map.get(ESSENCE_PROFILE).and_then(read_profile),
        Value::Array(items) => normalize_traits(items.iter().filter_map(Value::as_str)),
        Value::String(text) => normalize_traits(text.split([',', ';', '\n'])),
        _ => return None,
    };
    (!traits.is_empty()).then_some(traits)
}

/// Run the strategies in order; first match wins.
pub fn extract_traits(
    payload: &Value,
    me: &RosterMatch,
) -> Option<(ExtractionStrategy, IndexSet<String>)> {
    ExtractionStrategy::ORDERED
        .iter()
        .find_map(|strategy| strategy.extract(payload, me).map(|traits| (*strategy, traits)))
}

fn malformed(source_id: &str, reason: &str) -> DomainError {
    DomainError::MalformedPayload {
        source_id: source_id.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn me_at(position: usize, name: &str) -> RosterMatch {
        RosterMatch {
            position,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_parse_roster_shapes() {
        let bare = parse_roster("c1", &json!(["Ana", "Sam"])).unwrap();
        assert_eq!(bare.len(), 2);
        assert_eq!(bare[1].name, "Sam");

        let wrapped = parse_roster(
            "c1",
            &json!({"participants": [{"name": "Ana"}, {"username": "Sam", "isMe": true}]}),
        )
        .unwrap();
        assert!(wrapped[1].is_me);
        assert_eq!(wrapped[1].name, "Sam");

        assert!(parse_roster("c1", &json!({"people": []})).is_err());
        assert!(parse_roster("c1", &json!([42])).is_err());
    }

    #[test]
    fn test_resolve_prefers_flag() {
        let roster = vec![
            RosterEntry { name: "Sam".into(), is_me: false },
            RosterEntry { name: "Ana".into(), is_me: true },
        ];
        let session = Session::new("u1").with_username("Sam");
        assert_eq!(resolve_current_user(&roster, &session), Some(me_at(1, "Ana")));
    }

    #[test]
    fn test_resolve_by_username() {
        let roster = parse_roster("c1", &json!(["Ana", "Sam"])).unwrap();
        let session = Session::new("u1").with_username("Sam");
        assert_eq!(resolve_current_user(&roster, &session), Some(me_at(1, "Sam")));
    }

    #[test]
    fn test_resolve_requires_exactly_one() {
        let session = Session::new("u1").with_username("Sam");
        let none = parse_roster("c1", &json!(["Ana", "Bo"])).unwrap();
        assert!(resolve_current_user(&none, &session).is_none());

        let twice = parse_roster("c1", &json!(["Sam", "Sam"])).unwrap();
        assert!(resolve_current_user(&twice, &session).is_none());
    }

    #[test]
    fn test_username_keyed_shape() {
        let payload = json!({"Sam": {"essence_profile": "kind, funny; kind"}});
        let (strategy, traits) = extract_traits(&payload, &me_at(1, "Sam")).unwrap();
        assert_eq!(strategy, ExtractionStrategy::UsernameKeyed);
        assert_eq!(traits.into_iter().collect::<Vec<_>>(), vec!["kind", "funny"]);
    }

    #[test]
    fn test_xz_shape_by_position() {
        let payload = json!({"X": ["bold"], "Z": {"essence_profile": ["calm", " "]}});
        let (strategy, traits) = extract_traits(&payload, &me_at(1, "Sam")).unwrap();
        assert_eq!(strategy, ExtractionStrategy::XzKeyed);
        assert_eq!(traits.into_iter().collect::<Vec<_>>(), vec!["calm"]);

        let (_, first) = extract_traits(&payload, &me_at(0, "Ana")).unwrap();
        assert!(first.contains("bold"));
    }

    #[test]
    fn test_user_pair_shape() {
        let payload = json!({"user1": "warm\ncurious", "user2": "dry"});
        let (strategy, traits) = extract_traits(&payload, &me_at(0, "Ana")).unwrap();
        assert_eq!(strategy, ExtractionStrategy::UserPairKeyed);
        assert_eq!(traits.len(), 2);
    }

    #[test]
    fn test_position_beyond_pair_does_not_match() {
        let payload = json!({"X": ["a"], "Z": ["b"]});
        assert!(extract_traits(&payload, &me_at(2, "Kit")).is_none());
    }

    #[test]
    fn test_empty_profile_falls_through() {
        let payload = json!({"Sam": {"essence_profile": ""}, "user2": ["steady"]});
        let (strategy, _) = extract_traits(&payload, &me_at(1, "Sam")).unwrap();
        assert_eq!(strategy, ExtractionStrategy::UserPairKeyed);
    }
}
