//! Textual trace of a comparison, one line per grid row.

use crate::classify::Classification;
use crate::grid::BlockCoord;

pub const ROW_DELIMITER: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugLevel {
    #[default]
    Off,
    /// `X` for a mismatched block, space otherwise.
    Symbolic,
    /// Raw brightness difference per block, always with a decimal point
    /// (`4.0`, `100.0`) so traces line up with older logs.
    Numeric,
}

impl std::str::FromStr for DebugLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "0" => Ok(DebugLevel::Off),
            "symbolic" | "1" => Ok(DebugLevel::Symbolic),
            "numeric" | "2" => Ok(DebugLevel::Numeric),
            other => Err(format!("unknown debug level `{}`", other)),
        }
    }
}

pub trait DebugSink {
    fn emit(&mut self, line: &str);
}

/// Writes lines to stdout.
pub struct ConsoleSink;

impl DebugSink for ConsoleSink {
    fn emit(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// Routes lines through `log::debug!`.
pub struct LogSink;

impl DebugSink for LogSink {
    fn emit(&mut self, line: &str) {
        log::debug!("{}", line);
    }
}

impl DebugSink for Vec<String> {
    fn emit(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

pub fn render_lines(level: DebugLevel, classification: &Classification) -> Vec<String> {
    let diffs = &classification.diffs;
    let row_body = |row: u32| -> Option<String> {
        match level {
            DebugLevel::Off => None,
            DebugLevel::Symbolic => Some(
                (0..diffs.columns())
                    .map(|col| {
                        if classification.is_mismatch(BlockCoord::new(col, row)) {
                            'X'
                        } else {
                            ' '
                        }
                    })
                    .collect(),
            ),
            DebugLevel::Numeric => Some(
                diffs
                    .row(row)
                    .iter()
                    .map(|d| format!("{:?}", d))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        }
    };

    (0..diffs.rows())
        .filter_map(row_body)
        .map(|body| format!("{}{}{}", ROW_DELIMITER, body, ROW_DELIMITER))
        .collect()
}

pub fn emit(level: DebugLevel, classification: &Classification, sink: &mut dyn DebugSink) {
    for line in render_lines(level, classification) {
        sink.emit(&line);
    }
}
