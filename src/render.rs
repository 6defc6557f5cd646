//! Console rendering for accepted steps
//!
//! An optional, purely presentational side-channel: each accepted step can be
//! drawn as a bordered box on stderr so a human watching the process can
//! follow the chain of reasoning. Rendering never touches the history store
//! and never changes the payload returned to the caller.

use colored::Colorize;

use crate::models::Step;

/// Environment switch that suppresses step rendering when truthy.
pub const DISABLE_RENDER_ENV: &str = "STEPWISE_DISABLE_RENDER";

/// Renders accepted steps to stderr, unless disabled.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    enabled: bool,
}

impl Renderer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Builds a renderer from the environment.
    ///
    /// Rendering defaults to enabled; setting `STEPWISE_DISABLE_RENDER` to
    /// "1", "true", or "yes" (case-insensitive) turns it off.
    pub fn from_env() -> Self {
        let disabled = std::env::var(DISABLE_RENDER_ENV)
            .map(|v| {
                let v = v.to_lowercase();
                v == "1" || v == "true" || v == "yes"
            })
            .unwrap_or(false);
        Self::new(!disabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Draws the step box on stderr.
    ///
    /// Stderr keeps the side-channel clear of stdout, which the MCP stdio
    /// transport owns.
    pub fn render(&self, step: &Step) {
        if self.enabled {
            eprintln!("{}", format_step(step));
        }
    }
}

/// Formats a step as a bordered box with a kind-colored header.
pub fn format_step(step: &Step) -> String {
    let (marker, context) = if let Some(revision_of) = step.revision_of {
        ("Revision".yellow().to_string(), format!(" (revising step {})", revision_of))
    } else if let (Some(point), Some(label)) = (step.branch_point, step.branch_label.as_deref()) {
        (
            "Branch".green().to_string(),
            format!(" (from step {}, label: {})", point, label),
        )
    } else {
        ("Step".blue().to_string(), String::new())
    };

    let header = format!(
        "{} {}/{}{}",
        marker, step.index, step.estimated_total, context
    );
    // Border width is driven by the visible text, not the ANSI escapes
    let header_width = visible_width(&header);
    let width = header_width.max(step.text.chars().count()) + 2;

    let mut out = String::new();
    out.push_str(&format!("┌{}┐\n", "─".repeat(width)));
    out.push_str(&format!(
        "│ {}{} │\n",
        header,
        " ".repeat(width - 2 - header_width)
    ));
    out.push_str(&format!("├{}┤\n", "─".repeat(width)));
    for line in step.text.lines() {
        let line_width = line.chars().count();
        out.push_str(&format!(
            "│ {}{} │\n",
            line,
            " ".repeat(width.saturating_sub(2 + line_width))
        ));
    }
    out.push_str(&format!("└{}┘", "─".repeat(width)));
    out
}

// Character count with ANSI color escapes stripped out
fn visible_width(s: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    for c in s.chars() {
        if in_escape {
            if c == 'm' {
                in_escape = false;
            }
        } else if c == '\u{1b}' {
            in_escape = true;
        } else {
            width += 1;
        }
    }
    width
}
