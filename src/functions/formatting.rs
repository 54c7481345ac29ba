/// Leading byte the bar renders as "warning" colours.
pub const WARNING_MARKER: char = '\x03';
/// Leading byte the bar renders as "urgent" colours.
pub const URGENT_MARKER: char = '\x04';

/// How loudly a fragment should be drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Emphasis {
    #[default]
    Normal,
    Warning,
    Urgent,
}

impl Emphasis {
    /// Prefix `text` with the marker byte for this emphasis, if any.
    pub fn apply(self, text: String) -> String {
        match self {
            Emphasis::Normal => text,
            Emphasis::Warning => format!("{WARNING_MARKER}{text}"),
            Emphasis::Urgent => format!("{URGENT_MARKER}{text}"),
        }
    }
}

/// Format a minute count as "1h05m".
#[inline]
pub fn hours_minutes(total_minutes: u64) -> String {
    format!("{}h{:02}m", total_minutes / 60, total_minutes % 60)
}
