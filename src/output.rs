//! Rendering of decoded keys.

use crate::keyboard::DecodedKey;
use chrono::SecondsFormat;
use clap::builder::PossibleValue;
use clap::ValueEnum;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// How a [`DecodedKey`] is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// The key names as one continuous stream, unmapped codes as `<CODE>`.
    #[default]
    Symbol,
    /// One scancode per line.
    Code,
    /// `code<TAB>name` per line.
    Both,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "symbol" => Ok(Self::Symbol),
            "code" => Ok(Self::Code),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

impl ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Symbol, Self::Code, Self::Both]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            Self::Symbol => PossibleValue::new("symbol").help("Key names as typed"),
            Self::Code => PossibleValue::new("code").help("One scancode per line"),
            Self::Both => PossibleValue::new("both").help("Scancode and key name per line"),
        })
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Symbol => "symbol",
            Self::Code => "code",
            Self::Both => "both",
        })
    }
}

/// Writes each key as soon as it is decoded.
#[derive(Debug)]
pub struct KeyWriter<W> {
    out: W,
    format: Format,
    timestamps: bool,
}

impl<W: Write> KeyWriter<W> {
    /// `timestamps` only applies to the line-based formats.
    pub fn new(out: W, format: Format, timestamps: bool) -> Self {
        Self {
            out,
            format,
            timestamps,
        }
    }

    pub fn write_key(&mut self, key: &DecodedKey) -> io::Result<()> {
        match self.format {
            Format::Symbol => match key.symbol {
                Some(symbol) => write!(self.out, "{symbol}")?,
                None => write!(self.out, "<{}>", key.code)?,
            },
            Format::Code => {
                self.write_time(key)?;
                writeln!(self.out, "{}", key.code)?;
            }
            Format::Both => {
                self.write_time(key)?;
                match key.symbol {
                    Some(symbol) => writeln!(self.out, "{}\t{}", key.code, symbol.escape_debug())?,
                    None => writeln!(self.out, "{}\t-", key.code)?,
                }
            }
        }

        self.out.flush()
    }

    fn write_time(&mut self, key: &DecodedKey) -> io::Result<()> {
        if !self.timestamps {
            return Ok(());
        }

        match key.time {
            Some(time) => write!(
                self.out,
                "{}\t",
                time.to_rfc3339_opts(SecondsFormat::Micros, true)
            ),
            None => write!(self.out, "-\t"),
        }
    }
}
