//! Centralized UI formatting and color utilities
//!
//! Colors, icons and layout helpers shared by the `fabrica` commands.

use colored::{ColoredString, Colorize};

use crate::array::{DType, DTypeKind};

/// Check if quiet mode is enabled via environment variable or --quiet flag
pub fn is_quiet() -> bool {
    std::env::var("FABRICA_QUIET")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Whether stdout is a terminal; colors are dropped otherwise.
pub fn stdout_is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

/// Marker for a feature by its place in the graph.
///
/// - Independent: ○ (white)
/// - Dependent: ● (cyan)
pub fn feature_icon(independent: bool) -> ColoredString {
    if independent {
        "○".white()
    } else {
        "●".cyan()
    }
}

/// Data type names colored by kind.
pub fn dtype_label(dtype: &DType) -> ColoredString {
    let text = dtype.to_string();
    match dtype.kind() {
        DTypeKind::Float => text.green(),
        DTypeKind::Int | DTypeKind::UInt => text.blue(),
        DTypeKind::Bool => text.magenta(),
        DTypeKind::Str => text.yellow(),
        _ => text.cyan(),
    }
}

/// Color scheme for text output
pub mod colors {
    use colored::{ColoredString, Colorize};

    pub fn success(text: &str) -> ColoredString {
        text.green()
    }

    pub fn warning(text: &str) -> ColoredString {
        text.yellow()
    }

    pub fn error(text: &str) -> ColoredString {
        text.red()
    }

    /// Cyan for identifiers (feature names, step names)
    pub fn identifier(text: &str) -> ColoredString {
        text.cyan()
    }

    pub fn secondary(text: &str) -> ColoredString {
        text.dimmed()
    }

    pub fn heading(text: &str) -> ColoredString {
        text.bold()
    }
}

/// Common text formatting patterns
pub mod format {
    /// Truncate to `max_len` characters, ending in "..." when cut.
    pub fn truncate(text: &str, max_len: usize) -> String {
        if text.chars().count() <= max_len {
            text.to_string()
        } else {
            let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        }
    }

    /// Seconds as a short human-readable duration.
    pub fn duration(seconds: f64) -> String {
        if seconds < 1e-3 {
            format!("{:.0}µs", seconds * 1e6)
        } else if seconds < 1.0 {
            format!("{:.2}ms", seconds * 1e3)
        } else {
            format!("{:.2}s", seconds)
        }
    }

    /// Format a separator line for sections
    pub fn separator(width: usize) -> String {
        "─".repeat(width)
    }

    /// Pad `text` to `width` characters.
    pub fn pad(text: &str, width: usize) -> String {
        let len = text.chars().count();
        if len >= width {
            text.to_string()
        } else {
            format!("{}{}", text, " ".repeat(width - len))
        }
    }
}
