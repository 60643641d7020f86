use serde::{Deserialize, Serialize};

use crate::constants::WARNING_MARKERS;

/// Lexical classification of a chat text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Normal,
    Warning,
}

/// Classify `text` by the presence of any warning marker.
pub fn classify(text: &str) -> Classification {
    if is_warning(text) {
        Classification::Warning
    } else {
        Classification::Normal
    }
}

pub fn is_warning(text: &str) -> bool {
    WARNING_MARKERS.iter().any(|marker| text.contains(marker))
}
