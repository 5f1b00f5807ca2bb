//! Remote snapshot filename codec.
//!
//! The remote store addresses content by a filename that encodes both
//! platform counters: `<prefix>_win_V<a>_android_V<b>.json`. Parsing the
//! name back recovers the counters, so a caller can run the conflict
//! detector against a remote file without downloading it.

use regsync_model::Metadata;

const WIN_MARKER: &str = "_win_V";
const ANDROID_MARKER: &str = "_android_V";
const EXTENSION: &str = "json";

/// Encodes the remote filename for a snapshot's counters.
#[must_use]
pub fn encode_remote_name(prefix: &str, metadata: &Metadata) -> String {
    format!(
        "{prefix}{WIN_MARKER}{}{ANDROID_MARKER}{}.{EXTENSION}",
        metadata.win_version, metadata.android_version
    )
}

/// Parses a remote filename back into its prefix and counters.
///
/// Returns `None` when the name does not follow the pattern.
#[must_use]
pub fn parse_remote_name(name: &str) -> Option<(String, Metadata)> {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let (prefix, counters) = stem.split_once(WIN_MARKER)?;
    let (win, android) = counters.split_once(ANDROID_MARKER)?;

    Some((
        prefix.to_string(),
        Metadata::new(win.parse().ok()?, android.parse().ok()?),
    ))
}
