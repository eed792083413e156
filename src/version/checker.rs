//! Lifecycle classification of a deployed version against the latest available one

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::version::semver::{normalize_version, parse_version, select_latest};

/// How far a deployed version lags the latest version in its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    /// Deployed version is the latest
    Same,
    /// A newer major version exists
    Major,
    /// A newer minor version exists within the same major
    Minor,
    /// A newer patch version exists within the same major.minor
    Patch,
    /// Versions cannot be ordered meaningfully (current newer, unparsable, or `latest` tag)
    Unknown,
    /// The registry listed no qualifying version
    NotFound,
    /// The registry call itself failed
    Failure,
}

impl LifecycleStatus {
    /// Returns the string representation of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Same => "same",
            LifecycleStatus::Major => "major",
            LifecycleStatus::Minor => "minor",
            LifecycleStatus::Patch => "patch",
            LifecycleStatus::Unknown => "unknown",
            LifecycleStatus::NotFound => "notfound",
            LifecycleStatus::Failure => "failure",
        }
    }

    /// Returns true if the deployed version is behind the latest one
    pub fn is_outdated(&self) -> bool {
        matches!(
            self,
            LifecycleStatus::Major | LifecycleStatus::Minor | LifecycleStatus::Patch
        )
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify the distance between the deployed and the latest version.
///
/// Equal versions (after normalization, ignoring build metadata) are `Same`. Otherwise the
/// first component where `latest` is numerically greater decides between `Major`, `Minor`
/// and `Patch`. Everything else, including a current version that is already newer or that
/// does not parse, is `Unknown`.
pub fn classify(current: &str, latest: &str) -> LifecycleStatus {
    if normalize_version(current) == normalize_version(latest) {
        return LifecycleStatus::Same;
    }

    let (Some(current), Some(latest)) = (parse_version(current), parse_version(latest)) else {
        return LifecycleStatus::Unknown;
    };

    if current.cmp_precedence(&latest) == Ordering::Equal {
        return LifecycleStatus::Same;
    }

    match (
        latest.major.cmp(&current.major),
        latest.minor.cmp(&current.minor),
        latest.patch.cmp(&current.patch),
    ) {
        (Ordering::Greater, _, _) => LifecycleStatus::Major,
        (Ordering::Equal, Ordering::Greater, _) => LifecycleStatus::Minor,
        (Ordering::Equal, Ordering::Equal, Ordering::Greater) => LifecycleStatus::Patch,
        _ => LifecycleStatus::Unknown,
    }
}

/// Result of checking one image's tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleCheck {
    /// Latest qualifying tag in the registry (if any)
    pub latest_version: Option<String>,
    /// Lifecycle status
    pub status: LifecycleStatus,
}

/// Select the latest tag and classify the deployed version against it.
///
/// `current_version` is None when the image runs an untagged or `latest` reference, which
/// cannot be ordered and therefore classifies as `Unknown`.
pub fn check_lifecycle(
    current_version: Option<&str>,
    available_tags: &[String],
    allow_all_releases: bool,
) -> LifecycleCheck {
    let Some(latest) = select_latest(available_tags, allow_all_releases) else {
        return LifecycleCheck {
            latest_version: None,
            status: LifecycleStatus::NotFound,
        };
    };

    let status = match current_version {
        Some(current) => classify(current, &latest),
        None => LifecycleStatus::Unknown,
    };

    LifecycleCheck {
        latest_version: Some(latest),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.0.0", "1.0.0", LifecycleStatus::Same)]
    #[case("v1.0.0", "1.0.0", LifecycleStatus::Same)]
    #[case("1.2", "1.2.0", LifecycleStatus::Same)]
    #[case("1.0.0+1", "1.0.0+2", LifecycleStatus::Same)]
    #[case("1.0.0", "2.0.0", LifecycleStatus::Major)]
    #[case("1.0.0", "1.1.0", LifecycleStatus::Minor)]
    #[case("1.0.0", "1.0.1", LifecycleStatus::Patch)]
    #[case("2.0.0", "1.0.0", LifecycleStatus::Unknown)] // current newer than latest
    #[case("2.0.0", "1.5.0", LifecycleStatus::Unknown)] // older major, newer minor
    #[case("1.0.0", "1.0.0-5", LifecycleStatus::Unknown)]
    #[case("1.0.0-rc.1", "1.0.0", LifecycleStatus::Unknown)]
    #[case("1.9", "1.10", LifecycleStatus::Minor)]
    #[case("alpine", "1.0.0", LifecycleStatus::Unknown)]
    #[case("1.0.0", "not-a-version", LifecycleStatus::Unknown)]
    fn classify_returns_expected_status(
        #[case] current: &str,
        #[case] latest: &str,
        #[case] expected: LifecycleStatus,
    ) {
        assert_eq!(classify(current, latest), expected);
    }

    #[rstest]
    #[case("0.0.1")]
    #[case("1.2")]
    #[case("v3.4.5")]
    #[case("1.0.0-beta.2")]
    #[case("10.20.30+build.7")]
    fn classify_same_version_is_same(#[case] version: &str) {
        assert_eq!(classify(version, version), LifecycleStatus::Same);
    }

    #[test]
    fn check_lifecycle_reports_not_found_when_no_tag_qualifies() {
        let tags = vec!["latest".to_string(), "stable".to_string()];

        let result = check_lifecycle(Some("1.0.0"), &tags, false);

        assert_eq!(
            result,
            LifecycleCheck {
                latest_version: None,
                status: LifecycleStatus::NotFound,
            }
        );
    }

    #[test]
    fn check_lifecycle_classifies_against_selected_tag() {
        let tags = vec![
            "1.19.0".to_string(),
            "1.21.3".to_string(),
            "1.20.1".to_string(),
        ];

        let result = check_lifecycle(Some("1.19.0"), &tags, false);

        assert_eq!(result.latest_version, Some("1.21.3".to_string()));
        assert_eq!(result.status, LifecycleStatus::Minor);
    }

    #[test]
    fn check_lifecycle_with_latest_tag_is_unknown() {
        let tags = vec!["3.0.0".to_string()];

        let result = check_lifecycle(None, &tags, false);

        assert_eq!(result.latest_version, Some("3.0.0".to_string()));
        assert_eq!(result.status, LifecycleStatus::Unknown);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&LifecycleStatus::NotFound).unwrap(),
            "\"notfound\""
        );
        assert_eq!(LifecycleStatus::Failure.to_string(), "failure");
        assert!(LifecycleStatus::Patch.is_outdated());
        assert!(!LifecycleStatus::Unknown.is_outdated());
    }
}
