use std::cmp::Ordering;

use semver::Prerelease;

/// A registry version string read as a dotted numeric release of any length
/// plus an optional semver-style pre-release tag.
///
/// Trailing zero components are not significant (`1.21` equals `1.21.0`),
/// and build metadata after `+` is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LenientVersion {
    release: Vec<u64>,
    pre: Prerelease,
}

impl Ord for LenientVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release.cmp(&other.release).then_with(|| {
            match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            }
        })
    }
}

impl PartialOrd for LenientVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parse a registry version string, tolerating a leading `v` and any number
/// of numeric components (`7`, `1.21`, `2.4.0.700`).
pub fn parse_lenient(version: &str) -> Option<LenientVersion> {
    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
    let trimmed = trimmed.split_once('+').map_or(trimmed, |(head, _)| head);

    let (core, pre) = match trimmed.split_once('-') {
        Some((core, pre)) => (core, Prerelease::new(pre).ok()?),
        None => (trimmed, Prerelease::EMPTY),
    };

    let mut release = core
        .split('.')
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            part.parse::<u64>().ok()
        })
        .collect::<Option<Vec<u64>>>()?;
    while release.last() == Some(&0) {
        release.pop();
    }

    Some(LenientVersion { release, pre })
}

/// Sort `items` newest first by the version string `key` returns.
///
/// When every key parses as a version the order is numeric; if any key
/// fails to parse, the whole slice falls back to plain string order
/// (descending). Equal keys keep their relative order.
pub fn sort_versions_desc<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> &str,
{
    let all_numeric = items.iter().all(|item| parse_lenient(key(item)).is_some());
    if all_numeric {
        items.sort_by(|a, b| compare_numeric(key(b), key(a)));
    } else {
        items.sort_by(|a, b| key(b).cmp(key(a)));
    }
}

fn compare_numeric(left: &str, right: &str) -> Ordering {
    parse_lenient(left).cmp(&parse_lenient(right))
}
