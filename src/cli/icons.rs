//! Console output icons.

use console::{style, StyledObject};

/// Success checkmark icon (green ✓).
pub fn success() -> StyledObject<&'static str> {
    style("✓").green()
}

/// Info/progress arrow icon (cyan →).
pub fn info() -> StyledObject<&'static str> {
    style("→").cyan()
}

/// Warning icon (yellow !).
pub fn warn() -> StyledObject<&'static str> {
    style("!").yellow()
}

/// Error icon (red ✗).
pub fn error() -> StyledObject<&'static str> {
    style("✗").red()
}

/// Dim arrow for secondary info.
pub fn dim_arrow() -> StyledObject<&'static str> {
    style("→").dim()
}

/// Page skipped by the robots or domain gate (dim –).
pub fn skipped() -> StyledObject<&'static str> {
    style("–").dim()
}
