use std::io::Write;
use std::time::Duration;

use docextract_core::{ExtractionResult, Provider, Transaction};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Spinner on stderr while a provider or model is working.
pub fn spinner(msg: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(msg.into());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Print the extracted text followed by a one-line summary on `status`.
pub fn print_text(
    w: &mut dyn Write,
    status: &mut dyn Write,
    provider: Provider,
    result: &ExtractionResult,
    color: ColorMode,
) -> std::io::Result<()> {
    if result.text.is_empty() {
        let line = format!("{} returned no text", provider.name());
        if color.enabled() {
            writeln!(status, "{}", line.yellow())?;
        } else {
            writeln!(status, "{}", line)?;
        }
        return Ok(());
    }

    writeln!(w, "{}", result.text)?;
    let lines = result.text.lines().count();
    let summary = format!("{}: {} lines extracted", provider.name(), lines);
    if color.enabled() {
        writeln!(status, "{}", summary.dimmed())?;
    } else {
        writeln!(status, "{}", summary)?;
    }
    Ok(())
}

/// Print the `{text, rawResponse}` envelope, optionally with parsed transactions.
pub fn print_envelope(
    w: &mut dyn Write,
    result: &ExtractionResult,
    transactions: Option<&[Transaction]>,
) -> std::io::Result<()> {
    let mut value = serde_json::to_value(result).map_err(std::io::Error::other)?;
    if let (Some(txs), Some(obj)) = (transactions, value.as_object_mut()) {
        obj.insert(
            "transactions".to_string(),
            serde_json::to_value(txs).map_err(std::io::Error::other)?,
        );
    }
    let pretty = serde_json::to_string_pretty(&value).map_err(std::io::Error::other)?;
    writeln!(w, "{}", pretty)
}

/// Print transactions as `{"transactions": [...]}`.
pub fn print_transactions(w: &mut dyn Write, transactions: &[Transaction]) -> std::io::Result<()> {
    let value = serde_json::json!({ "transactions": transactions });
    let pretty = serde_json::to_string_pretty(&value).map_err(std::io::Error::other)?;
    writeln!(w, "{}", pretty)
}

/// Print a raw model reply exactly as received.
pub fn print_raw(w: &mut dyn Write, text: &str) -> std::io::Result<()> {
    writeln!(w, "{}", text)
}

/// Configuration state of one provider or generative backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderState {
    Ready,
    Missing,
    Invalid(String),
}

/// Print one row of the `providers` listing.
pub fn print_provider_status(
    w: &mut dyn Write,
    name: &str,
    state: &ProviderState,
    color: ColorMode,
) -> std::io::Result<()> {
    let label = format!("{:<18}", name);
    match state {
        ProviderState::Ready => {
            if color.enabled() {
                writeln!(w, "{} {}", label.bold(), "configured".green())
            } else {
                writeln!(w, "{} configured", label)
            }
        }
        ProviderState::Missing => {
            if color.enabled() {
                writeln!(w, "{} {}", label.bold(), "not configured".dimmed())
            } else {
                writeln!(w, "{} not configured", label)
            }
        }
        ProviderState::Invalid(reason) => {
            if color.enabled() {
                writeln!(w, "{} {} ({})", label.bold(), "invalid".red(), reason)
            } else {
                writeln!(w, "{} invalid ({})", label, reason)
            }
        }
    }
}
