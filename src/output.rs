//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every set is shown by its positional index and link name, the name a
//! visitor sees in URLs. The template path follows as an indented `Source:`
//! line so the entry can be traced back to the content tree.
//!
//! # Output Format
//!
//! ## Listing
//!
//! ```text
//! 001 2023-fall (2 items) fresh
//!     Source: 2023/2023-fall/2023-fall.html.twig
//! 002 2024-spring (3 items)
//!     Source: 2024/00-2024-spring/00-2024-spring.html.twig
//!
//! 2 sets
//! ```
//!
//! ## Single set
//!
//! ```text
//! 2024-spring (3 items)
//!     Source: 2024/00-2024-spring/00-2024-spring.html.twig
//!     Updated: March 3rd, 2024
//!     Next: (none)
//!     Previous: 2023-summer
//! ```
//!
//! ## Render
//!
//! ```text
//! index.html.twig: evicted, compiled (412 bytes)
//! index.html.twig: fresh, served from cache (412 bytes)
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::freshness::TemplateState;
use crate::site::Rendered;
use crate::types::{Navigation, Set};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

/// `2024-spring (3 items)`, with a trailing `fresh` marker when flagged.
fn set_header(set: &Set) -> String {
    let marker = if set.is_fresh { " fresh" } else { "" };
    format!("{} ({}){}", set.link_name, plural(set.item_count, "item"), marker)
}

fn neighbour(set: Option<&Set>) -> &str {
    set.map(|s| s.link_name.as_str()).unwrap_or("(none)")
}

// ============================================================================
// Listing
// ============================================================================

/// Format an aggregated listing, one entry per set.
pub fn format_listing(sets: &[Set]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, set) in sets.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), set_header(set)));
        lines.push(format!("    Source: {}", set.template_path));
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(plural(sets.len(), "set"));
    lines
}

/// Print a listing to stdout.
pub fn print_listing(sets: &[Set]) {
    for line in format_listing(sets) {
        println!("{}", line);
    }
}

// ============================================================================
// Single set
// ============================================================================

/// Format one set with its last-modified date and navigation pair.
pub fn format_set(set: &Set, nav: &Navigation) -> Vec<String> {
    vec![
        set_header(set),
        format!("    Source: {}", set.template_path),
        format!("    Updated: {}", set.last_modified_label()),
        format!("    Next: {}", neighbour(nav.next.as_ref())),
        format!("    Previous: {}", neighbour(nav.previous.as_ref())),
    ]
}

pub fn print_set(set: &Set, nav: &Navigation) {
    for line in format_set(set, nav) {
        println!("{}", line);
    }
}

// ============================================================================
// Template check
// ============================================================================

fn state_label(state: TemplateState) -> &'static str {
    match state {
        TemplateState::Fresh => "fresh",
        TemplateState::Evicted => "evicted",
        TemplateState::Skipped => "skipped (debug)",
    }
}

pub fn format_template_state(template_id: &str, state: TemplateState) -> String {
    format!("{template_id}: {}", state_label(state))
}

// ============================================================================
// Render
// ============================================================================

/// One-line render summary: freshness state, where the page came from, size.
pub fn format_render(template_id: &str, rendered: &Rendered) -> String {
    let source = if rendered.cached {
        "served from cache"
    } else if rendered.compiled {
        "compiled"
    } else {
        "rendered from compiled template"
    };
    format!(
        "{template_id}: {}, {source} ({})",
        state_label(rendered.state),
        plural(rendered.body.len(), "byte")
    )
}
