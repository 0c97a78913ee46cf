//! Register scripts
//!
//! A register script is a text file with one register write per line, `ADDR=VALUE`, both in hex
//! (an optional `$` or `0x` prefix is accepted). Everything after a `#` is a comment. Blank lines
//! are ignored.
//!
//! ```text
//! # depth mode with priority override, far depth $0800
//! 21C0=03
//! $21C1 = 00
//! $21C2 = 08
//! ```

use std::error::Error;
use std::fmt;

/// A malformed line in a register script
#[derive(Debug, PartialEq, Eq)]
pub struct ScriptError {
    /// 1-based line number
    pub line: usize,
    pub msg: String,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.msg)
    }
}

impl Error for ScriptError {}

fn parse_hex(s: &str) -> Option<u32> {
    let s = s.trim();
    let digits = if s.starts_with('$') {
        &s[1..]
    } else if s.starts_with("0x") || s.starts_with("0X") {
        &s[2..]
    } else {
        s
    };
    if digits.is_empty() {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

/// Parses a register script into a list of `(address, value)` writes.
pub fn parse(text: &str) -> Result<Vec<(u16, u8)>, ScriptError> {
    let mut writes = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let err = |msg: String| ScriptError { line: index + 1, msg: msg };

        let line = match line.find('#') {
            Some(start) => &line[..start],
            None => line,
        }.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.splitn(2, '=');
        let addr = parts.next().unwrap_or("");
        let value = parts.next().ok_or_else(|| err(format!("expected ADDR=VALUE, got `{}`", line)))?;

        let addr = match parse_hex(addr) {
            Some(addr) if addr <= 0xffff => addr as u16,
            _ => return Err(err(format!("invalid register address `{}`", addr.trim()))),
        };
        let value = match parse_hex(value) {
            Some(value) if value <= 0xff => value as u8,
            _ => return Err(err(format!("invalid register value `{}`", value.trim()))),
        };
        writes.push((addr, value));
    }

    Ok(writes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_writes() {
        let script = "
            # depth setup
            21C0=03
            $21c1 = 0x00   # far depth low
            0x21C2=$08

            2100 = f
        ";
        assert_eq!(parse(script).unwrap(), vec![
            (0x21c0, 0x03),
            (0x21c1, 0x00),
            (0x21c2, 0x08),
            (0x2100, 0x0f),
        ]);
        assert_eq!(parse("").unwrap(), vec![]);
    }

    #[test]
    fn reports_line_numbers() {
        let err = parse("21c0=01\n\n21c1\n").unwrap_err();
        assert_eq!(err.line, 3);

        assert_eq!(parse("21c0=100").unwrap_err().line, 1);
        assert_eq!(parse("10000=1").unwrap_err().line, 1);
        assert_eq!(parse("21zz=1").unwrap_err().line, 1);
        assert_eq!(parse("$=1").unwrap_err().line, 1);
        assert_eq!(parse("2100=").unwrap_err().to_string(), "line 1: invalid register value ``");
    }
}
