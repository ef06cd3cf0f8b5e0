//! # Pretty Printing - Terminal Rendering
//!
//! This module renders everything `pscout` shows in the terminal: assistant
//! replies (markdown), product cards, the conversation history list, user
//! notifications and the captured request log.
//!
//! ## Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   Pretty Printer                      │
//! │  ┌──────────────────┐  ┌──────────────────────────┐  │
//! │  │ Markdown (reply) │  │ Records (products, chat, │  │
//! │  │ headers, bold,   │  │ history, request log)    │  │
//! │  │ italic, code     │  │                          │  │
//! │  └────────┬─────────┘  └────────────┬─────────────┘  │
//! │           ▼                         ▼                │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │  Any `io::Write`, colored through Crossterm    │  │
//! │  └────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Every renderer writes into a caller-supplied `W: Write`, so the CLI passes
//! `stdout()` and tests pass a `Vec<u8>`.
//!
//! ## Supported Markdown Features
//!
//! | Markdown Syntax | Terminal Rendering |
//! |----------------|-------------------|
//! | `# Header` | **Bold Cyan** (`#`, `##`, `###`) |
//! | `**bold**` | **Bold** |
//! | `*italic*` | *Italic* |
//! | `` `code` `` | Yellow |
//! | ` ```lang\ncode\n``` ` | Dark grey block with a `[lang]` label |
//!
//! ```no_run
//! use parts_scout::pretty::print_pretty;
//!
//! let reply = "## Brake pads\n\nThe **BP-2024-FR** set fits a 2015 Golf.\n";
//! print_pretty(reply).unwrap();
//! ```

use chrono::{DateTime, Local, Utc};
use crossterm::{
    ExecutableCommand,
    style::{Attribute, Color, SetAttribute, SetForegroundColor},
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::io::{Write, stderr, stdout};

use crate::{
    client::observer::DebugEntry,
    models::{Availability, ChatMessage, ConversationSummary, Product, Profile, Role},
    notify::{Level, Notification, Notifier},
};

static CODE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(\w+)?\n([\s\S]*?)```").expect("valid code block regex"));
static INLINE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid inline code regex"));
static BOLD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^\*]+)\*\*").expect("valid bold regex"));
static ITALIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^\*]+)\*").expect("valid italic regex"));

/// Render markdown `text` to stdout.
pub fn print_pretty(text: &str) -> Result<(), Box<dyn Error>> {
    let mut out = stdout();
    render_markdown(text, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Render markdown `text` into `out`.
pub fn render_markdown<W: Write>(text: &str, out: &mut W) -> Result<(), Box<dyn Error>> {
    let mut last_end = 0;

    for cap in CODE_BLOCK_RE.captures_iter(text) {
        let Some(whole) = cap.get(0) else { continue };

        if whole.start() > last_end {
            print_markdown(&text[last_end..whole.start()], out)?;
        }

        let language = cap.get(1).map(|m| m.as_str()).unwrap_or("");
        let code = cap.get(2).map(|m| m.as_str()).unwrap_or("");
        print_code_block(code, language, out)?;

        last_end = whole.end();
    }

    if last_end < text.len() {
        print_markdown(&text[last_end..], out)?;
    }
    Ok(())
}

fn print_markdown<W: Write>(text: &str, out: &mut W) -> Result<(), Box<dyn Error>> {
    for line in text.lines() {
        let header = line
            .strip_prefix("### ")
            .or_else(|| line.strip_prefix("## "))
            .or_else(|| line.strip_prefix("# "));

        if let Some(header) = header {
            out.execute(SetForegroundColor(Color::Cyan))?;
            out.execute(SetAttribute(Attribute::Bold))?;
            writeln!(out, "{}", header)?;
            out.execute(SetAttribute(Attribute::Reset))?;
            out.execute(SetForegroundColor(Color::Reset))?;
        } else if line.is_empty() {
            writeln!(out)?;
        } else {
            writeln!(out, "{}", inline_markdown(line))?;
        }
    }

    Ok(())
}

fn inline_markdown(line: &str) -> String {
    let processed = INLINE_CODE_RE.replace_all(line, "\x1b[33m$1\x1b[0m");
    let processed = BOLD_RE.replace_all(&processed, "\x1b[1m$1\x1b[0m");
    ITALIC_RE
        .replace_all(&processed, "\x1b[3m$1\x1b[0m")
        .into_owned()
}

fn print_code_block<W: Write>(code: &str, language: &str, out: &mut W) -> Result<(), Box<dyn Error>> {
    out.execute(SetForegroundColor(Color::DarkGrey))?;
    if !language.is_empty() {
        out.execute(SetAttribute(Attribute::Italic))?;
        writeln!(out, "[{}]", language)?;
        out.execute(SetAttribute(Attribute::NoItalic))?;
    }
    for line in code.lines() {
        writeln!(out, "  {}", line)?;
    }
    out.execute(SetForegroundColor(Color::Reset))?;
    writeln!(out)?;
    Ok(())
}

fn local_time(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// One chat turn: a colored role label followed by the content.
pub fn render_message<W: Write>(message: &ChatMessage, out: &mut W) -> Result<(), Box<dyn Error>> {
    let (label, color) = match message.role {
        Role::User => ("You", Color::Green),
        Role::Assistant => ("Assistant", Color::Magenta),
        Role::System => ("System", Color::DarkGrey),
    };
    out.execute(SetForegroundColor(color))?;
    out.execute(SetAttribute(Attribute::Bold))?;
    write!(out, "{}", label)?;
    out.execute(SetAttribute(Attribute::Reset))?;
    out.execute(SetForegroundColor(Color::DarkGrey))?;
    writeln!(out, "  {}", local_time(&message.timestamp))?;
    out.execute(SetForegroundColor(Color::Reset))?;

    match message.role {
        Role::Assistant => render_markdown(&message.content, out)?,
        _ => writeln!(out, "{}", message.content)?,
    }
    Ok(())
}

fn availability_color(availability: Availability) -> Color {
    match availability {
        Availability::InStock => Color::Green,
        Availability::Limited => Color::Yellow,
        Availability::OutOfStock => Color::Red,
        Availability::Unknown => Color::DarkGrey,
    }
}

/// A product card.
pub fn render_product<W: Write>(product: &Product, out: &mut W) -> Result<(), Box<dyn Error>> {
    out.execute(SetAttribute(Attribute::Bold))?;
    write!(out, "#{} {}", product.id, product.name)?;
    out.execute(SetAttribute(Attribute::Reset))?;
    if product.validated_by_manufacturer {
        out.execute(SetForegroundColor(Color::Green))?;
        write!(out, " ✓")?;
        out.execute(SetForegroundColor(Color::Reset))?;
    }
    writeln!(out)?;

    writeln!(out, "  {} · {}", product.brand, product.part_number)?;
    write!(out, "  ${:.2} + ${:.2} shipping  ", product.price, product.shipping_cost)?;
    out.execute(SetForegroundColor(availability_color(product.availability)))?;
    write!(out, "{}", product.availability)?;
    out.execute(SetForegroundColor(Color::Reset))?;
    writeln!(out, " ({} in stock)", product.stock)?;

    if !product.estimated_shipping.is_empty() {
        writeln!(out, "  Ships in {}", product.estimated_shipping)?;
    }
    if !product.compatible_models.is_empty() {
        let models: Vec<&str> = product.compatible_models.iter().map(String::as_str).collect();
        writeln!(out, "  Fits: {}", models.join(", "))?;
    }
    if !product.description.is_empty() {
        out.execute(SetForegroundColor(Color::DarkGrey))?;
        writeln!(out, "  {}", product.description)?;
        out.execute(SetForegroundColor(Color::Reset))?;
    }
    if let Some(url) = &product.purchasing_url {
        writeln!(out, "  {}", url)?;
    }
    Ok(())
}

pub fn render_products<W: Write>(products: &[Product], out: &mut W) -> Result<(), Box<dyn Error>> {
    if products.is_empty() {
        writeln!(out, "No products.")?;
        return Ok(());
    }
    for product in products {
        render_product(product, out)?;
        writeln!(out)?;
    }
    Ok(())
}

/// The conversation list. `current` is highlighted.
pub fn render_history<W: Write>(
    history: &[ConversationSummary],
    current: Option<i64>,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    if history.is_empty() {
        writeln!(out, "No conversations yet.")?;
        return Ok(());
    }
    for conversation in history {
        let marker = if current == Some(conversation.id) { "*" } else { " " };
        write!(out, "{marker} {:>5}  ", conversation.id)?;
        out.execute(SetAttribute(Attribute::Bold))?;
        write!(out, "{}", conversation.title)?;
        out.execute(SetAttribute(Attribute::Reset))?;
        out.execute(SetForegroundColor(Color::DarkGrey))?;
        write!(out, "  {}", local_time(&conversation.last_message_at))?;
        if let Some(count) = conversation.message_count {
            write!(out, "  {count} messages")?;
        }
        out.execute(SetForegroundColor(Color::Reset))?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn render_profile<W: Write>(profile: &Profile, out: &mut W) -> Result<(), Box<dyn Error>> {
    let unset = "-";
    writeln!(out, "Name:   {}", profile.full_name.as_deref().unwrap_or(unset))?;
    writeln!(out, "Email:  {}", profile.email.as_deref().unwrap_or(unset))?;
    writeln!(out, "Avatar: {}", profile.avatar_url.as_deref().unwrap_or(unset))?;
    Ok(())
}

/// The captured request log, newest first.
pub fn render_request_log<W: Write>(entries: &[DebugEntry], out: &mut W) -> Result<(), Box<dyn Error>> {
    for entry in entries {
        let record = &entry.record;
        let color = match record.status {
            Some(status) if status < 400 => Color::Green,
            Some(_) => Color::Red,
            None => Color::Yellow,
        };
        out.execute(SetForegroundColor(color))?;
        let status = record
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "---".to_string());
        write!(out, "{status}")?;
        out.execute(SetForegroundColor(Color::Reset))?;
        writeln!(
            out,
            " {} {}  [{}]",
            record.method,
            record.url,
            entry.timestamp.format("%H:%M:%S%.3f")
        )?;
        if let Some(error) = &record.error {
            out.execute(SetForegroundColor(Color::DarkGrey))?;
            writeln!(out, "    {}", error.message)?;
            out.execute(SetForegroundColor(Color::Reset))?;
        }
    }
    Ok(())
}

/// Prints notifications to stderr, the terminal stand-in for toasts.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    fn write<W: Write>(notification: &Notification, out: &mut W) -> Result<(), Box<dyn Error>> {
        let color = match notification.level {
            Level::Success => Color::Green,
            Level::Error => Color::Red,
        };
        out.execute(SetForegroundColor(color))?;
        out.execute(SetAttribute(Attribute::Bold))?;
        write!(out, "{}", notification.title)?;
        out.execute(SetAttribute(Attribute::Reset))?;
        out.execute(SetForegroundColor(Color::Reset))?;
        writeln!(out, ": {}", notification.description)?;
        Ok(())
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let _ = Self::write(&notification, &mut stderr());
    }
}
