// src/display/terminal.rs
//! Operator-facing terminal output

use crate::{
    error::Result,
    gps::Fix,
    record::{format_fixed, format_significant, COORDINATE_DIGITS},
};
use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::Write;

/// Prompt shown before each stake annotation is read
pub const PROMPT: &str = "Enter Stake Num: ";

/// Write the current fix to an operator-visible writer.
///
/// Used for short diagnostic commands; nothing here reaches a log file.
/// Colours are only emitted when `styled` is set, so a redirected stdout
/// gets plain text.
pub fn render_fix_dump(out: &mut impl Write, fix: &Fix, styled: bool) -> Result<()> {
    set_color(out, Color::Green, styled)?;
    queue!(
        out,
        Print("=".repeat(40)),
        Print("\n"),
        Print("Current fix"),
        Print("\n"),
        Print("=".repeat(40)),
        Print("\n")
    )?;
    reset_color(out, styled)?;

    if fix.is_empty() {
        set_color(out, Color::Yellow, styled)?;
        queue!(out, Print("No fix received yet\n"))?;
        reset_color(out, styled)?;
    }

    let rows = [
        ("Timestamp", format!("{} ms", fix.timestamp_ms)),
        ("UTC time", fix.utc_time.clone()),
        ("Latitude", format_significant(fix.latitude, COORDINATE_DIGITS)),
        ("Longitude", format_significant(fix.longitude, COORDINATE_DIGITS)),
        ("Velocity", format_fixed(fix.velocity)),
        ("Status", format!("{} ({})", fix.gps_status, fix.status_description())),
        ("Height", format_fixed(fix.height)),
        ("True course", format_fixed(fix.true_angle)),
        ("Mag course", format_fixed(fix.magnetic_angle)),
    ];

    for (label, value) in rows {
        set_color(out, Color::Cyan, styled)?;
        queue!(out, Print(format!("{:<12}", format!("{}:", label))))?;
        reset_color(out, styled)?;
        queue!(out, Print(value), Print("\n"))?;
    }

    out.flush()?;
    Ok(())
}

fn set_color(out: &mut impl Write, color: Color, styled: bool) -> Result<()> {
    if styled {
        queue!(out, SetForegroundColor(color))?;
    }
    Ok(())
}

fn reset_color(out: &mut impl Write, styled: bool) -> Result<()> {
    if styled {
        queue!(out, ResetColor)?;
    }
    Ok(())
}

/// Show the stake prompt without a trailing newline
pub fn render_prompt(out: &mut impl Write) -> Result<()> {
    queue!(out, Print(PROMPT))?;
    out.flush()?;
    Ok(())
}

/// Echo an accepted stake entry back to the operator
pub fn render_entry_echo(out: &mut impl Write, entry: &str) -> Result<()> {
    queue!(out, Print(format!("Entered stake Num: {}\n", entry)))?;
    out.flush()?;
    Ok(())
}
