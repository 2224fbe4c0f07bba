//! Quality selection over a label-to-URL map.
//!
//! Labels come in two flavours: plain (`720p`) and priority-flagged
//! (`720p_priority`, a link served from a priority domain). Selection always
//! prefers priority-flagged labels within a pass, and only falls back to
//! plain labels once a whole pass over the ladder found nothing.

use std::collections::BTreeMap;

use super::PriorityTable;
use crate::types::QualityRequest;

pub const PRIORITY_SUFFIX: &str = "_priority";

fn flagged(label: &str) -> String {
    format!("{label}{PRIORITY_SUFFIX}")
}

/// Picks one `(label, url)` entry for the requested quality.
///
/// - `Best`: ladder order, priority-flagged labels first, then plain labels.
/// - `Worst`: same two passes over the reversed ladder.
/// - `Exact`: the flagged label, then the plain one.
/// - Otherwise `hls_priority`, then `hls`.
/// - Otherwise the lexicographically smallest flagged entry, then the
///   smallest plain entry.
///
/// Returns `None` only for an empty map.
///
/// ```rust
/// use std::collections::BTreeMap;
/// use eizo::resolve::select_quality;
/// use eizo::types::QualityRequest;
///
/// let links = BTreeMap::from([
///     ("720p".to_string(), "u1".to_string()),
///     ("1080p_priority".to_string(), "u2".to_string()),
/// ]);
/// let ladder = ["1080p", "720p", "480p", "360p"].map(String::from);
/// let (_, url) = select_quality(&links, &QualityRequest::Best, &ladder).unwrap();
/// assert_eq!(url, "u2");
/// ```
pub fn select_quality(
    links: &BTreeMap<String, String>,
    request: &QualityRequest,
    ladder: &[String],
) -> Option<(String, String)> {
    let pick = |label: &str| links.get(label).map(|url| (label.to_string(), url.clone()));

    let from_request = match request {
        QualityRequest::Best => two_pass(ladder.iter(), &pick),
        QualityRequest::Worst => two_pass(ladder.iter().rev(), &pick),
        QualityRequest::Exact(label) => pick(&flagged(label)).or_else(|| pick(label)),
    };

    from_request
        .or_else(|| pick("hls_priority"))
        .or_else(|| pick("hls"))
        .or_else(|| {
            links
                .iter()
                .find(|(label, _)| label.ends_with(PRIORITY_SUFFIX))
                .or_else(|| links.iter().next())
                .map(|(label, url)| (label.clone(), url.clone()))
        })
}

fn two_pass<'a, I, F>(ladder: I, pick: &F) -> Option<(String, String)>
where
    I: Iterator<Item = &'a String> + Clone,
    F: Fn(&str) -> Option<(String, String)>,
{
    ladder
        .clone()
        .find_map(|label| pick(&flagged(label)))
        .or_else(|| ladder.into_iter().find_map(|label| pick(label)))
}

/// Suffixes labels of links served from any priority domain.
///
/// Labels already carrying the suffix are kept as they are. On a label
/// collision the entry that comes first in label order wins.
pub fn flag_priority_links(
    links: BTreeMap<String, String>,
    table: &PriorityTable,
) -> BTreeMap<String, String> {
    let mut flagged_links = BTreeMap::new();
    for (label, url) in links {
        let label = if !label.ends_with(PRIORITY_SUFFIX) && table.rank(&url).is_some() {
            flagged(&label)
        } else {
            label
        };
        flagged_links.entry(label).or_insert(url);
    }
    flagged_links
}

/// Strips the priority suffix for display.
pub fn display_label(label: &str) -> &str {
    label.strip_suffix(PRIORITY_SUFFIX).unwrap_or(label)
}
