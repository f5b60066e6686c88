//! School category → timetable dataset resolution.
//!
//! NEIS publishes one timetable dataset per school level. The school-kind
//! string we get from a school search (or a short code typed by a user)
//! only hints at which one applies, so we produce an ordered list of
//! candidates and let the orchestrator try them in turn.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream timetable datasets, one per school level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimetableDataset {
    Elementary,
    Middle,
    High,
    Special,
}

impl TimetableDataset {
    /// Fallback order, also the order for an unrecognized hint.
    pub const ALL: [TimetableDataset; 4] = [
        TimetableDataset::Elementary,
        TimetableDataset::Middle,
        TimetableDataset::High,
        TimetableDataset::Special,
    ];

    /// Dataset identifier as used in the hub path and the response envelope.
    pub fn id(self) -> &'static str {
        match self {
            TimetableDataset::Elementary => "elsTimetable",
            TimetableDataset::Middle => "misTimetable",
            TimetableDataset::High => "hisTimetable",
            TimetableDataset::Special => "spsTimetable",
        }
    }

    /// Short level code (`els`, `mis`, `his`, `sps`).
    pub fn code(self) -> &'static str {
        match self {
            TimetableDataset::Elementary => "els",
            TimetableDataset::Middle => "mis",
            TimetableDataset::High => "his",
            TimetableDataset::Special => "sps",
        }
    }
}

impl fmt::Display for TimetableDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// Checked in order. Special and vocational go first so "특수학교" or
// "special high school" are not mistaken for a regular level.
const KEYWORDS: &[(&str, TimetableDataset)] = &[
    ("특수", TimetableDataset::Special),
    ("special", TimetableDataset::Special),
    ("초등", TimetableDataset::Elementary),
    ("elementary", TimetableDataset::Elementary),
    ("primary", TimetableDataset::Elementary),
    ("중학", TimetableDataset::Middle),
    ("middle", TimetableDataset::Middle),
    ("고등", TimetableDataset::High),
    ("high", TimetableDataset::High),
    ("vocational", TimetableDataset::High),
];

/// Best single guess for a hint, if any part of it is recognizable.
pub fn classify(hint: &str) -> Option<TimetableDataset> {
    let normalized = hint.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    // Short codes must match exactly; "his" would otherwise hit "this".
    if let Some(dataset) = TimetableDataset::ALL
        .iter()
        .copied()
        .find(|d| d.code() == normalized || d.id().eq_ignore_ascii_case(&normalized))
    {
        return Some(dataset);
    }

    KEYWORDS
        .iter()
        .find(|(keyword, _)| normalized.contains(keyword))
        .map(|(_, dataset)| *dataset)
}

/// Ordered, never-empty candidate list for a category hint.
///
/// The best guess comes first, followed by every other dataset in the
/// fixed fallback order. An empty or unrecognized hint yields the fallback
/// order as is.
pub fn candidates_for(hint: &str) -> Vec<TimetableDataset> {
    let mut candidates = Vec::with_capacity(TimetableDataset::ALL.len());
    if let Some(best) = classify(hint) {
        candidates.push(best);
    }
    for dataset in TimetableDataset::ALL {
        if !candidates.contains(&dataset) {
            candidates.push(dataset);
        }
    }
    candidates
}
