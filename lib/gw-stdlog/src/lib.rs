/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io::{self, IsTerminal, Write};

use chrono::Local;
use slog::{Drain, KV, Level, OwnedKVList, Record};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

struct StdLogValue {
    level: Level,
    message: String,
    kv_pairs: Vec<(String, String)>,
    location: Option<String>,
}

impl StdLogValue {
    fn message_str(&self) -> &str {
        if self.message.is_empty() {
            "()"
        } else {
            &self.message
        }
    }
}

#[derive(Default)]
struct KvCollector {
    kv_pairs: Vec<(String, String)>,
}

impl slog::Serializer for KvCollector {
    fn emit_arguments(&mut self, key: slog::Key, val: &fmt::Arguments) -> slog::Result {
        self.kv_pairs.push((key.to_string(), val.to_string()));
        Ok(())
    }
}

/// A synchronous drain that writes one line per record to stderr or stdout.
///
/// ANSI styles are only used when the output is a terminal.
pub struct StdLogDrain {
    use_stdout: bool,
    console: bool,
    append_code_position: bool,
}

impl StdLogDrain {
    pub fn new(append_code_position: bool, use_stdout: bool) -> Self {
        let console = if use_stdout {
            io::stdout().is_terminal()
        } else {
            io::stderr().is_terminal()
        };
        StdLogDrain {
            use_stdout,
            console,
            append_code_position,
        }
    }

    fn build_value(&self, record: &Record, values: &OwnedKVList) -> StdLogValue {
        let mut collector = KvCollector::default();
        let _ = values.serialize(record, &mut collector);
        let _ = record.kv().serialize(record, &mut collector);
        let location = if self.append_code_position {
            Some(format!("{}:{}", record.file(), record.line()))
        } else {
            None
        };
        StdLogValue {
            level: record.level(),
            message: record.msg().to_string(),
            kv_pairs: collector.kv_pairs,
            location,
        }
    }

    fn write_plain<IO: Write>(&self, io: &mut IO, v: &StdLogValue) -> io::Result<()> {
        write!(io, "{}", Local::now().format(TIME_FORMAT))?;
        write!(io, " {}", v.level)?;
        for (k, v) in &v.kv_pairs {
            write!(io, " {k}: {v},")?;
        }
        write!(io, " {}", v.message_str())?;
        if let Some(location) = &v.location {
            write!(io, " <{location}>")?;
        }
        writeln!(io)
    }

    fn write_console<IO: Write>(&self, io: &mut IO, v: &StdLogValue) -> io::Result<()> {
        use anstyle::{AnsiColor, Color, Style};

        const COLOR_MAGENTA: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Magenta)));
        const COLOR_RED: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));
        const COLOR_YELLOW: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow)));
        const COLOR_GREEN: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));
        const COLOR_CYAN: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));
        const COLOR_BLUE: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Blue)));
        const STYLE_BOLD: Style = Style::new().bold();
        const STYLE_ITALIC: Style = Style::new().italic();

        let bold_s = STYLE_BOLD.render();
        let bold_e = STYLE_BOLD.render_reset();

        write!(io, "{}", Local::now().format(TIME_FORMAT))?;
        let level_color = match v.level {
            Level::Critical => COLOR_MAGENTA,
            Level::Error => COLOR_RED,
            Level::Warning => COLOR_YELLOW,
            Level::Info => COLOR_GREEN,
            Level::Debug => COLOR_CYAN,
            Level::Trace => COLOR_BLUE,
        };
        write!(
            io,
            " {}{}{}",
            level_color.render(),
            v.level,
            level_color.render_reset(),
        )?;
        for (k, v) in &v.kv_pairs {
            write!(io, " {bold_s}{k}{bold_e}={v},")?;
        }
        write!(io, " {bold_s}{}{bold_e}", v.message_str())?;
        if let Some(location) = &v.location {
            write!(
                io,
                " <{}{location}{}>",
                STYLE_ITALIC.render(),
                STYLE_ITALIC.render_reset()
            )?;
        }
        writeln!(io)
    }

    fn format(&self, v: &StdLogValue) -> io::Result<Vec<u8>> {
        let mut buf: Vec<u8> = Vec::with_capacity(256);
        if self.console {
            self.write_console(&mut buf, v)?;
        } else {
            self.write_plain(&mut buf, v)?;
        }
        Ok(buf)
    }
}

impl Drain for StdLogDrain {
    type Ok = ();
    type Err = io::Error;

    fn log(&self, record: &Record, values: &OwnedKVList) -> io::Result<()> {
        let v = self.build_value(record, values);
        let buf = self.format(&v)?;
        if self.use_stdout {
            let mut io = io::stdout().lock();
            io.write_all(&buf)?;
            io.flush()
        } else {
            let mut io = io::stderr().lock();
            io.write_all(&buf)?;
            io.flush()
        }
    }
}
