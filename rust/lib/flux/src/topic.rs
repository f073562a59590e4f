//! MQTT-style topic patterns for state subscriptions.
//!
//! - `session/state` matches only itself.
//! - `+` matches exactly one level: `app/+` matches `app/route`.
//! - `#` matches the remaining levels, including none: `app/#` matches
//!   `app`, `app/route` and `app/notice/last`.
//!
//! `#` is only meaningful as the final segment; anywhere else the pattern
//! is rejected.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Exact(String),
    Single,
    Rest,
}

/// A parsed subscription pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPattern {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid topic pattern '{0}': '#' must be the last segment")]
pub struct InvalidPattern(pub String);

impl TopicPattern {
    pub fn parse(pattern: &str) -> Result<Self, InvalidPattern> {
        let parts: Vec<&str> = pattern.split('/').collect();
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());
        for (idx, part) in parts.into_iter().enumerate() {
            let segment = match part {
                "+" => Segment::Single,
                "#" if idx == last => Segment::Rest,
                "#" => return Err(InvalidPattern(pattern.to_string())),
                exact => Segment::Exact(exact.to_string()),
            };
            segments.push(segment);
        }
        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// A pattern matching exactly `path`; `+` and `#` are taken literally.
    pub fn exact(path: &str) -> Self {
        Self {
            raw: path.to_string(),
            segments: path
                .split('/')
                .map(|s| Segment::Exact(s.to_string()))
                .collect(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether a concrete path (no wildcards) matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        let mut levels = path.split('/');
        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::Single => {
                    if levels.next().is_none() {
                        return false;
                    }
                }
                Segment::Exact(want) => match levels.next() {
                    Some(level) if level == want => {}
                    _ => return false,
                },
            }
        }
        levels.next().is_none()
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> TopicPattern {
        TopicPattern::parse(s).unwrap()
    }

    #[test]
    fn exact_match() {
        assert!(p("session/state").matches("session/state"));
        assert!(!p("session/state").matches("session/other"));
        assert!(!p("session/state").matches("session"));
        assert!(!p("session/state").matches("session/state/deep"));
    }

    #[test]
    fn single_level_wildcard() {
        let pat = p("app/+");
        assert!(pat.matches("app/route"));
        assert!(pat.matches("app/notice"));
        assert!(!pat.matches("app"));
        assert!(!pat.matches("app/notice/last"));
        assert!(!pat.matches("session/state"));
    }

    #[test]
    fn multi_level_wildcard_matches_zero_or_more() {
        let pat = p("app/#");
        assert!(pat.matches("app"));
        assert!(pat.matches("app/route"));
        assert!(pat.matches("app/notice/last"));
        assert!(!pat.matches("application/route"));
    }

    #[test]
    fn root_wildcard_matches_everything() {
        let pat = p("#");
        assert!(pat.matches("session/state"));
        assert!(pat.matches("app"));
    }

    #[test]
    fn leading_single_wildcard() {
        let pat = p("+/state");
        assert!(pat.matches("session/state"));
        assert!(!pat.matches("session/route"));
    }

    #[test]
    fn exact_pattern_ignores_wildcard_meaning() {
        let pat = TopicPattern::exact("app/+");
        assert!(pat.matches("app/+"));
        assert!(!pat.matches("app/route"));
    }

    #[test]
    fn hash_must_be_last() {
        assert_eq!(
            TopicPattern::parse("app/#/route"),
            Err(InvalidPattern("app/#/route".into()))
        );
    }

    #[test]
    fn display_round_trips_raw_text() {
        assert_eq!(p("app/+").to_string(), "app/+");
        assert_eq!(p("app/+").as_str(), "app/+");
    }
}
