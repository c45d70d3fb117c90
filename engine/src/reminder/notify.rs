//! Terminal delivery for fired reminders
//!
//! Writes the reminder as a plain line plus desktop-notification escape codes
//! (BEL, OSC 9, OSC 777, OSC 99) so whichever terminal runs `bello reminders
//! fire` can surface it.

use std::io::{self, Write};

use super::scheduler::ReminderPayload;

/// Longest body forwarded inside an escape sequence
const MAX_OSC_BODY: usize = 200;

/// Write `payload` to stdout as text and terminal notifications
pub fn deliver(payload: &ReminderPayload) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    write_notification(&mut stdout, payload)
}

/// Write `payload` to `out` as text and terminal notifications
pub fn write_notification<W: Write>(out: &mut W, payload: &ReminderPayload) -> io::Result<()> {
    writeln!(out, "{}: {}", payload.title, payload.body)?;
    emit_terminal_notifications(out, &payload.title, &payload.body)?;
    out.flush()
}

fn emit_terminal_notifications<W: Write>(out: &mut W, title: &str, body: &str) -> io::Result<()> {
    let title = escape_osc(title);
    let body = truncate(&escape_osc(body), MAX_OSC_BODY);

    // BEL
    out.write_all(b"\x07")?;
    // iTerm2: ESC ] 9 ; message BEL
    write!(out, "\x1b]9;{body}\x07")?;
    // Konsole/VTE: ESC ] 777 ; notify ; title ; message BEL
    write!(out, "\x1b]777;notify;{title};{body}\x07")?;
    // kitty: title and body chunks, ST terminated
    write!(
        out,
        "\x1b]99;i=1:d=0:p=title;{title}\x1b\\\x1b]99;i=1:d=0:p=body;{body}\x1b\\"
    )?;

    Ok(())
}

/// Strip characters that would terminate or break an OSC sequence
fn escape_osc(s: &str) -> String {
    s.replace(['\x07', '\x1b', '\r'], "").replace('\n', " ")
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}
