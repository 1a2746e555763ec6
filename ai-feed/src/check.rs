//! `config check` / `profile check` report.

use std::io::{self, Write};

use ai_feed_core::profile::ValidationResult;
use ai_feed_core::CacheConfig;

/// What is being checked, for the report headline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Config,
    Profile,
}

impl Subject {
    fn label(self) -> &'static str {
        match self {
            Subject::Config => "Configuration",
            Subject::Profile => "Profile",
        }
    }
}

/// Print the verdict, errors, warnings and (when `verbose`) the summary.
pub fn write_report<W: Write>(
    out: &mut W,
    subject: Subject,
    result: &ValidationResult,
    cache: Option<&CacheConfig>,
    verbose: bool,
) -> io::Result<()> {
    if result.valid {
        writeln!(out, "{} OK: no issues found", subject.label())?;
    } else {
        writeln!(
            out,
            "{} has {} error(s):",
            subject.label(),
            result.errors.len()
        )?;
        for issue in &result.errors {
            writeln!(out, "  - {}: {} [{}]", issue.field, issue.message, issue.kind)?;
        }
    }

    if !result.warnings.is_empty() {
        writeln!(out)?;
        writeln!(out, "Warnings:")?;
        for warning in &result.warnings {
            writeln!(out, "  - {}", warning)?;
        }
    }

    if verbose {
        writeln!(out)?;
        write_summary(out, result, cache)?;
    }
    Ok(())
}

fn write_summary<W: Write>(
    out: &mut W,
    result: &ValidationResult,
    cache: Option<&CacheConfig>,
) -> io::Result<()> {
    let summary = &result.summary;

    let backend = match summary.ai_backend.as_deref() {
        Some("gemini") => format!(
            "gemini ({})",
            summary.gemini_model.as_deref().unwrap_or("?")
        ),
        Some("mock") => format!(
            "mock (selector: {})",
            summary.mock_selector_mode.as_deref().unwrap_or("first")
        ),
        Some(other) => other.to_string(),
        None => "<not configured>".to_string(),
    };

    writeln!(out, "Summary:")?;
    writeln!(out, "  AI backend:     {}", backend)?;
    writeln!(out, "  Slack:          {}", configured(summary.slack_configured))?;
    writeln!(out, "  Misskey:        {}", configured(summary.misskey_configured))?;
    writeln!(
        out,
        "  Fixed message:  {}",
        if summary.has_fixed_message { "yes" } else { "no" }
    )?;

    match cache {
        Some(cache) if cache.enabled => writeln!(
            out,
            "  Cache:          {} (max {} entries, {} days)",
            cache.file_path.display(),
            cache.max_entries,
            cache.retention_days
        )?,
        Some(_) => writeln!(out, "  Cache:          disabled")?,
        None => writeln!(out, "  Cache:          <not configured>")?,
    }
    Ok(())
}

fn configured(flag: bool) -> &'static str {
    if flag {
        "configured"
    } else {
        "not configured"
    }
}
