//! Temporal literal formatting.
//!
//! Values are decomposed through immutable `time` arithmetic; nothing here
//! shares mutable formatting state, so no external synchronization is
//! needed around temporal encoding.

use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::error::{Error, Result};

pub(crate) fn encode_date(date: Date) -> Result<Vec<u8>> {
    date.format(&format_description!("'[year]-[month]-[day]'"))
        .map(String::into_bytes)
        .map_err(Error::encode)
}

pub(crate) fn encode_time(time: Time) -> Result<Vec<u8>> {
    time.format(&format_description!("'[hour]:[minute]:[second]'"))
        .map(String::into_bytes)
        .map_err(Error::encode)
}

pub(crate) fn encode_datetime(datetime: PrimitiveDateTime) -> Result<Vec<u8>> {
    datetime
        .format(&format_description!("'[year]-[month]-[day] [hour]:[minute]:[second]'"))
        .map(String::into_bytes)
        .map_err(Error::encode)
}

/// Encode an instant in the session time zone.
pub(crate) fn encode_timestamp(timestamp: OffsetDateTime, session: UtcOffset) -> Result<Vec<u8>> {
    let local = timestamp.to_offset(session);

    encode_datetime(PrimitiveDateTime::new(local.date(), local.time()))
}

/// What a free-form temporal string turned out to be.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TemporalKind {
    Date,
    Time,
    DateTime,
}

/// Classify a free-form date/time string and re-emit it as a normalized
/// quoted literal.
///
/// One left-to-right walk groups the string into digit runs and separator
/// runs; the run shape selects the pattern (bare 2-, 4-, 6-, 8-, 10-, 12-
/// or 14-digit forms, or dash/colon-delimited date, time, and datetime
/// forms).
pub(crate) fn encode_temporal_text(text: &str) -> Result<Vec<u8>> {
    normalize_temporal(text).map(|(literal, _)| literal.into_bytes())
}

pub(crate) fn normalize_temporal(text: &str) -> Result<(String, TemporalKind)> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err(Error::MalformedTemporal(text.to_owned()));
    }

    let mut runs: Vec<&str> = Vec::new();
    let mut separators: Vec<char> = Vec::new();
    let mut run_start: Option<usize> = None;

    for (offset, c) in trimmed.char_indices() {
        if c.is_ascii_digit() {
            run_start.get_or_insert(offset);
            continue;
        }

        match run_start.take() {
            Some(start) => runs.push(&trimmed[start..offset]),
            None => return Err(Error::MalformedTemporal(text.to_owned())),
        }

        match c {
            '-' | '/' | ':' | '.' => separators.push(c),
            ' ' | 'T' => separators.push(' '),
            _ => return Err(Error::MalformedTemporal(text.to_owned())),
        }
    }

    match run_start {
        Some(start) => runs.push(&trimmed[start..]),
        // a trailing separator leaves no final digit run
        None => return Err(Error::MalformedTemporal(text.to_owned())),
    }

    let fields = interpret_runs(&runs, &separators)
        .ok_or_else(|| Error::MalformedTemporal(text.to_owned()))?;

    fields.validate().ok_or_else(|| Error::MalformedTemporal(text.to_owned()))?;

    Ok((fields.render(), fields.kind))
}

struct TemporalFields {
    kind: TemporalKind,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl TemporalFields {
    fn validate(&self) -> Option<()> {
        let date_ok = match self.kind {
            TemporalKind::Time => true,
            _ => (1..=12).contains(&self.month) && (1..=31).contains(&self.day),
        };

        let time_ok = self.hour < 24 && self.minute < 60 && self.second < 60;

        (date_ok && time_ok).then_some(())
    }

    fn render(&self) -> String {
        match self.kind {
            TemporalKind::Date => {
                format!("'{:04}-{:02}-{:02}'", self.year, self.month, self.day)
            }
            TemporalKind::Time => {
                format!("'{:02}:{:02}:{:02}'", self.hour, self.minute, self.second)
            }
            TemporalKind::DateTime => format!(
                "'{:04}-{:02}-{:02} {:02}:{:02}:{:02}'",
                self.year, self.month, self.day, self.hour, self.minute, self.second
            ),
        }
    }
}

/// Two-digit years pivot at 70: 70..=99 land in 19xx.
fn expand_year(run: &str) -> u16 {
    let value: u16 = run.parse().unwrap_or(0);

    if run.len() > 2 {
        value
    } else if value >= 70 {
        1900 + value
    } else {
        2000 + value
    }
}

fn interpret_runs(runs: &[&str], separators: &[char]) -> Option<TemporalFields> {
    let field = |run: &str| run.parse::<u8>().ok();

    // bare digit runs: the overall length selects the pattern
    if runs.len() == 1 && separators.is_empty() {
        let digits = runs[0];

        let (date_part, time_part) = match digits.len() {
            14 => (&digits[..8], Some(&digits[8..])),
            12 => (&digits[..6], Some(&digits[6..])),
            10 => (&digits[..6], Some(&digits[6..])),
            8 | 6 | 4 | 2 => (digits, None),
            _ => return None,
        };

        let year_len = if date_part.len() == 8 { 4 } else { 2 };
        let year = expand_year(&date_part[..year_len]);
        let rest = &date_part[year_len..];
        let month = if rest.is_empty() { 1 } else { field(&rest[..2])? };
        let day = if rest.len() < 4 { 1 } else { field(&rest[2..4])? };

        let (kind, hour, minute, second) = match time_part {
            None => (TemporalKind::Date, 0, 0, 0),
            Some(time) => {
                let hour = field(&time[..2])?;
                let minute = field(&time[2..4])?;
                let second = if time.len() < 6 { 0 } else { field(&time[4..6])? };

                (TemporalKind::DateTime, hour, minute, second)
            }
        };

        return Some(TemporalFields { kind, year, month, day, hour, minute, second });
    }

    let is_date_sep = |c: char| c == '-' || c == '/';

    match (runs.len(), separators) {
        // HH:mm and HH:mm:ss
        (2, [':']) => Some(TemporalFields {
            kind: TemporalKind::Time,
            year: 0,
            month: 0,
            day: 0,
            hour: field(runs[0])?,
            minute: field(runs[1])?,
            second: 0,
        }),
        (3, [':', ':']) => Some(TemporalFields {
            kind: TemporalKind::Time,
            year: 0,
            month: 0,
            day: 0,
            hour: field(runs[0])?,
            minute: field(runs[1])?,
            second: field(runs[2])?,
        }),

        // yyyy-MM-dd
        (3, [a, b]) if is_date_sep(*a) && is_date_sep(*b) => Some(TemporalFields {
            kind: TemporalKind::Date,
            year: expand_year(runs[0]),
            month: field(runs[1])?,
            day: field(runs[2])?,
            hour: 0,
            minute: 0,
            second: 0,
        }),

        // yyyy-MM-dd HH:mm[:ss]
        (5 | 6, [a, b, ' ', rest @ ..])
            if is_date_sep(*a) && is_date_sep(*b) && rest.iter().all(|c| *c == ':') =>
        {
            Some(TemporalFields {
                kind: TemporalKind::DateTime,
                year: expand_year(runs[0]),
                month: field(runs[1])?,
                day: field(runs[2])?,
                hour: field(runs[3])?,
                minute: field(runs[4])?,
                second: if runs.len() == 6 { field(runs[5])? } else { 0 },
            })
        }

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, time};

    #[test]
    fn fixed_patterns() -> anyhow::Result<()> {
        assert_eq!(encode_date(date!(2024 - 02 - 29))?, b"'2024-02-29'".to_vec());
        assert_eq!(encode_time(time!(9:05:00))?, b"'09:05:00'".to_vec());
        assert_eq!(
            encode_datetime(datetime!(2024-02-29 23:59:59))?,
            b"'2024-02-29 23:59:59'".to_vec()
        );

        Ok(())
    }

    #[test]
    fn timestamps_convert_to_the_session_offset() -> anyhow::Result<()> {
        let instant = datetime!(2024-06-01 12:00:00 UTC);
        let plus_two = UtcOffset::from_hms(2, 0, 0).unwrap();

        assert_eq!(
            encode_timestamp(instant, plus_two)?,
            b"'2024-06-01 14:00:00'".to_vec()
        );

        Ok(())
    }

    #[test]
    fn infers_delimited_patterns() -> anyhow::Result<()> {
        let (literal, kind) = normalize_temporal("2024-6-1")?;
        assert_eq!((literal.as_str(), kind), ("'2024-06-01'", TemporalKind::Date));

        let (literal, kind) = normalize_temporal("9:5")?;
        assert_eq!((literal.as_str(), kind), ("'09:05:00'", TemporalKind::Time));

        let (literal, kind) = normalize_temporal("23:59:58")?;
        assert_eq!((literal.as_str(), kind), ("'23:59:58'", TemporalKind::Time));

        let (literal, kind) = normalize_temporal("2024-06-01 08:30")?;
        assert_eq!(
            (literal.as_str(), kind),
            ("'2024-06-01 08:30:00'", TemporalKind::DateTime)
        );

        let (literal, kind) = normalize_temporal("2024-06-01T08:30:15")?;
        assert_eq!(
            (literal.as_str(), kind),
            ("'2024-06-01 08:30:15'", TemporalKind::DateTime)
        );

        Ok(())
    }

    #[test]
    fn infers_bare_digit_patterns() -> anyhow::Result<()> {
        assert_eq!(normalize_temporal("20240601143000")?.0, "'2024-06-01 14:30:00'");
        assert_eq!(normalize_temporal("240601143000")?.0, "'2024-06-01 14:30:00'");
        assert_eq!(normalize_temporal("2406011430")?.0, "'2024-06-01 14:30:00'");
        assert_eq!(normalize_temporal("20240601")?.0, "'2024-06-01'");
        assert_eq!(normalize_temporal("990601")?.0, "'1999-06-01'");
        assert_eq!(normalize_temporal("2406")?.0, "'2024-06-01'");
        assert_eq!(normalize_temporal("24")?.0, "'2024-01-01'");

        Ok(())
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        assert!(normalize_temporal("2024-13-01").is_err());
        assert!(normalize_temporal("25:00").is_err());
        assert!(normalize_temporal("not a date").is_err());
        assert!(normalize_temporal("2024-06-").is_err());
        assert!(normalize_temporal("123").is_err());
        assert!(normalize_temporal("").is_err());
    }
}
