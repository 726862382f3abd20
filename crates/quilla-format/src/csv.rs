//! CSV output format and tick reader.

use chrono::{DateTime, NaiveDate, Utc};
use quilla_aggregate::Bar;
use quilla_types::Tick;
use std::io::{BufRead, BufReader, Read, Write};

use crate::{FormatError, Formatter};

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// CSV formatter.
#[derive(Debug, Clone, Default)]
pub struct CsvFormatter {
    /// Field delimiter (default: comma).
    delimiter: char,
    /// Whether to include header row.
    include_header: bool,
}

impl CsvFormatter {
    /// Creates a new CSV formatter with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            delimiter: ',',
            include_header: true,
        }
    }

    /// Sets the field delimiter.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether to include a header row.
    #[must_use]
    pub const fn with_header(mut self, include: bool) -> Self {
        self.include_header = include;
        self
    }

    /// Creates a tab-separated values (TSV) formatter.
    #[must_use]
    pub const fn tsv() -> Self {
        Self {
            delimiter: '\t',
            include_header: true,
        }
    }
}

impl Formatter for CsvFormatter {
    fn write_ticks<W: Write + Send>(
        &self,
        ticks: &[Tick],
        mut writer: W,
    ) -> Result<(), FormatError> {
        let d = self.delimiter;

        if self.include_header {
            writeln!(
                writer,
                "date_time{d}trading_day{d}price{d}volume{d}turnover{d}open_interest"
            )?;
        }

        for tick in ticks {
            writeln!(
                writer,
                "{}{d}{}{d}{}{d}{}{d}{}{d}{}",
                tick.date_time.format(TIME_FORMAT),
                tick.trading_day,
                tick.price,
                tick.volume,
                tick.turnover,
                tick.open_interest
            )?;
        }

        Ok(())
    }

    fn write_bars<W: Write + Send>(&self, bars: &[Bar], mut writer: W) -> Result<(), FormatError> {
        let d = self.delimiter;

        if self.include_header {
            writeln!(
                writer,
                "trading_day{d}begin_time{d}end_time{d}open{d}high{d}low{d}close{d}\
                 pre_close{d}volume{d}turnover{d}open_interest"
            )?;
        }

        for bar in bars {
            // Still-open bars carry an empty end_time field.
            let end = bar
                .end_time
                .map_or_else(String::new, |t| t.format(TIME_FORMAT).to_string());
            writeln!(
                writer,
                "{}{d}{}{d}{end}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}",
                bar.trading_day,
                bar.begin_time.format(TIME_FORMAT),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.pre_close,
                bar.volume,
                bar.turnover,
                bar.open_interest
            )?;
        }

        Ok(())
    }

    fn extension(&self) -> &str {
        "csv"
    }
}

/// Reads ticks from comma-separated input for feed replay.
///
/// Expects the column layout [`CsvFormatter`] writes, with three
/// optional trailing reference columns (`pre_close`, `pre_settlement`,
/// `pre_open_interest`). A leading header row is skipped when present.
///
/// # Errors
///
/// Returns [`FormatError::MalformedRecord`] for rows with missing or
/// unparseable fields, [`FormatError::Io`] for read failures.
pub fn read_ticks<R: Read>(reader: R) -> Result<Vec<Tick>, FormatError> {
    let mut ticks = Vec::new();

    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let row = line.trim();
        if row.is_empty() || (index == 0 && row.starts_with("date_time")) {
            continue;
        }
        ticks.push(parse_tick(row, index + 1)?);
    }

    Ok(ticks)
}

fn parse_tick(row: &str, line: usize) -> Result<Tick, FormatError> {
    let fields: Vec<&str> = row.split(',').map(str::trim).collect();
    if fields.len() < 5 {
        return Err(FormatError::MalformedRecord {
            line,
            reason: format!("expected at least 5 fields, found {}", fields.len()),
        });
    }

    let date_time = fields[0]
        .parse::<DateTime<Utc>>()
        .map_err(|e| malformed(line, "date_time", e))?;
    let trading_day = fields[1]
        .parse::<NaiveDate>()
        .map_err(|e| malformed(line, "trading_day", e))?;
    let price = parse_field(fields[2], line, "price")?;
    let volume = parse_field(fields[3], line, "volume")?;
    let turnover = parse_field(fields[4], line, "turnover")?;

    let mut tick = Tick::new(date_time, trading_day, price, volume, turnover);
    if let Some(raw) = fields.get(5) {
        tick = tick.with_open_interest(parse_field(raw, line, "open_interest")?);
    }
    if fields.len() >= 9 {
        tick = tick.with_references(
            parse_field(fields[6], line, "pre_close")?,
            parse_field(fields[7], line, "pre_settlement")?,
            parse_field(fields[8], line, "pre_open_interest")?,
        );
    }
    Ok(tick)
}

fn parse_field(raw: &str, line: usize, name: &str) -> Result<f64, FormatError> {
    raw.parse::<f64>().map_err(|e| malformed(line, name, e))
}

fn malformed(line: usize, field: &str, err: impl std::fmt::Display) -> FormatError {
    FormatError::MalformedRecord {
        line,
        reason: format!("{field}: {err}"),
    }
}
