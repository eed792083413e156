use semver::{BuildMetadata, Prerelease, Version};

/// Strip surrounding whitespace and a leading `v` from a tag.
///
/// Examples:
/// - "v1.2.3" -> "1.2.3"
/// - " 1.2 " -> "1.2"
pub fn normalize_version(version: &str) -> &str {
    let trimmed = version.trim();
    trimmed.strip_prefix('v').unwrap_or(trimmed)
}

/// Parse a tag with tolerant SemVer rules.
///
/// Accepts a leading `v` and partial versions, padding missing components with zeros.
/// Pre-release and build suffixes are kept on the returned version so callers can decide
/// whether such tags qualify.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "v1.2" -> Version(1, 2, 0)
/// - "1.2.3-rc.1+b5" -> Version(1, 2, 3, pre: rc.1, build: b5)
/// - "alpine", "1.2.3.4", "1..2" -> None
pub fn parse_version(version: &str) -> Option<Version> {
    let normalized = normalize_version(version);

    let (rest, build) = match normalized.split_once('+') {
        Some((rest, build)) => (rest, Some(build)),
        None => (normalized, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };

    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    let component = |index: usize| -> Option<u64> {
        match parts.get(index) {
            Some(part) => part.parse().ok(),
            None => Some(0),
        }
    };

    let mut parsed = Version::new(component(0)?, component(1)?, component(2)?);
    if let Some(pre) = pre {
        if pre.is_empty() {
            return None;
        }
        parsed.pre = Prerelease::new(pre).ok()?;
    }
    if let Some(build) = build {
        if build.is_empty() {
            return None;
        }
        parsed.build = BuildMetadata::new(build).ok()?;
    }
    Some(parsed)
}

/// Returns true when the version carries neither a pre-release nor build suffix
pub fn is_release(version: &Version) -> bool {
    version.pre.is_empty() && version.build.is_empty()
}

/// Find the highest qualifying tag in a candidate list.
///
/// A candidate qualifies when it contains at least one `.` and parses with
/// [`parse_version`]. Unless `allow_all_releases` is set, tags with pre-release or build
/// suffixes are skipped. Build metadata never influences ordering; ties between tags of
/// equal precedence (e.g. "1.2" and "1.2.0") resolve to the lexically greatest tag so the
/// result does not depend on input order.
///
/// Returns the original tag string, or None when nothing qualifies.
pub fn select_latest(candidates: &[String], allow_all_releases: bool) -> Option<String> {
    candidates
        .iter()
        .filter(|tag| tag.contains('.'))
        .filter_map(|tag| parse_version(tag).map(|parsed| (tag, parsed)))
        .filter(|(_, parsed)| allow_all_releases || is_release(parsed))
        .max_by(|(tag_a, a), (tag_b, b)| a.cmp_precedence(b).then_with(|| tag_a.cmp(tag_b)))
        .map(|(tag, _)| tag.clone())
}
