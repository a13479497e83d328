//! Virtual datetime items: parsing, rendering, cross-type comparison

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};

/// Typed temporal payload of a datetime item.
#[derive(Debug, Clone, PartialEq)]
pub enum DateTimeValue {
    /// Calendar date
    Date(NaiveDate),
    /// Time of day without zone
    Time(NaiveTime),
    /// Time of day with a fixed UTC offset (seconds east)
    TimeTz(NaiveTime, i32),
    /// Date and time without zone
    Timestamp(NaiveDateTime),
    /// An instant with a fixed UTC offset
    TimestampTz(DateTime<FixedOffset>),
}

/// A datetime item as produced by the `.datetime()` item method.
///
/// `tz` is the default UTC offset (seconds east) available for
/// cross-type coercions that need one; it is set when the parsed text
/// or the method's timezone argument supplied an offset.
#[derive(Debug, Clone, PartialEq)]
pub struct DateTimeItem {
    /// The typed temporal value
    pub value: DateTimeValue,
    /// Default UTC offset in seconds east, when known
    pub tz: Option<i32>,
}

impl DateTimeItem {
    /// Create a date item.
    pub fn date(date: NaiveDate) -> Self {
        Self {
            value: DateTimeValue::Date(date),
            tz: None,
        }
    }

    /// Create a time item.
    pub fn time(time: NaiveTime) -> Self {
        Self {
            value: DateTimeValue::Time(time),
            tz: None,
        }
    }

    /// Create a time-with-zone item.
    pub fn time_tz(time: NaiveTime, offset_secs: i32) -> Self {
        Self {
            value: DateTimeValue::TimeTz(time, offset_secs),
            tz: Some(offset_secs),
        }
    }

    /// Create a timestamp item.
    pub fn timestamp(ts: NaiveDateTime) -> Self {
        Self {
            value: DateTimeValue::Timestamp(ts),
            tz: None,
        }
    }

    /// Create a timestamp-with-zone item.
    pub fn timestamp_tz(ts: DateTime<FixedOffset>) -> Self {
        let offset = ts.offset().local_minus_utc();
        Self {
            value: DateTimeValue::TimestampTz(ts),
            tz: Some(offset),
        }
    }

    /// The `.type()` name of this item.
    pub fn type_name(&self) -> &'static str {
        match self.value {
            DateTimeValue::Date(_) => "date",
            DateTimeValue::Time(_) => "time without time zone",
            DateTimeValue::TimeTz(..) => "time with time zone",
            DateTimeValue::Timestamp(_) => "timestamp without time zone",
            DateTimeValue::TimestampTz(_) => "timestamp with time zone",
        }
    }

    /// Cross-type comparison. `None` means the pair is not comparable,
    /// either by type (date vs time) or because a needed coercion has
    /// no zone offset available.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        use DateTimeValue::*;

        match (&self.value, &other.value) {
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Date(a), Timestamp(b)) => Some(date_to_timestamp(*a).cmp(b)),
            (Date(a), TimestampTz(b)) => {
                Some(naive_in_zone(date_to_timestamp(*a), self.tz)?.cmp(b))
            }
            (Timestamp(a), Date(b)) => Some(a.cmp(&date_to_timestamp(*b))),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (Timestamp(a), TimestampTz(b)) => Some(naive_in_zone(*a, self.tz)?.cmp(b)),
            (TimestampTz(a), Date(b)) => {
                Some(a.cmp(&naive_in_zone(date_to_timestamp(*b), other.tz)?))
            }
            (TimestampTz(a), Timestamp(b)) => Some(a.cmp(&naive_in_zone(*b, other.tz)?)),
            (TimestampTz(a), TimestampTz(b)) => Some(a.cmp(b)),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            (Time(a), TimeTz(bt, boff)) => Some(cmp_timetz(*a, self.tz?, *bt, *boff)),
            (TimeTz(at, aoff), Time(b)) => Some(cmp_timetz(*at, *aoff, *b, other.tz?)),
            (TimeTz(at, aoff), TimeTz(bt, boff)) => Some(cmp_timetz(*at, *aoff, *bt, *boff)),
            _ => None,
        }
    }

    /// Render as an ISO 8601 string.
    pub fn to_iso_string(&self) -> String {
        match &self.value {
            DateTimeValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            DateTimeValue::Time(t) => t.format("%H:%M:%S%.f").to_string(),
            DateTimeValue::TimeTz(t, off) => {
                format!("{}{}", t.format("%H:%M:%S%.f"), format_offset(*off))
            }
            DateTimeValue::Timestamp(ts) => ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            DateTimeValue::TimestampTz(ts) => format!(
                "{}{}",
                ts.format("%Y-%m-%dT%H:%M:%S%.f"),
                format_offset(ts.offset().local_minus_utc())
            ),
        }
    }
}

impl std::fmt::Display for DateTimeItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_iso_string())
    }
}

fn date_to_timestamp(d: NaiveDate) -> NaiveDateTime {
    d.and_time(NaiveTime::MIN)
}

fn naive_in_zone(ndt: NaiveDateTime, tz: Option<i32>) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(tz?)?;
    offset.from_local_datetime(&ndt).single()
}

fn time_micros(t: NaiveTime) -> i64 {
    t.num_seconds_from_midnight() as i64 * 1_000_000 + (t.nanosecond() / 1_000) as i64
}

fn cmp_timetz(at: NaiveTime, aoff: i32, bt: NaiveTime, boff: i32) -> Ordering {
    let ua = time_micros(at) - aoff as i64 * 1_000_000;
    let ub = time_micros(bt) - boff as i64 * 1_000_000;
    // ties break on the zone, westernmost first
    ua.cmp(&ub).then(boff.cmp(&aoff))
}

fn format_offset(secs: i32) -> String {
    let sign = if secs < 0 { '-' } else { '+' };
    let abs = secs.unsigned_abs();
    format!("{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
}

/// The ISO templates tried, in order, when `.datetime()` is called
/// without an explicit template.
const ISO_TEMPLATES: &[&str] = &[
    "YYYY-MM-DD HH24:MI:SS TZH:TZM",
    "YYYY-MM-DD HH24:MI:SS TZH",
    "YYYY-MM-DD HH24:MI:SS",
    "YYYY-MM-DD",
    "HH24:MI:SS TZH:TZM",
    "HH24:MI:SS TZH",
    "HH24:MI:SS",
];

/// Why a datetime text failed to parse.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DatetimeParseError {
    /// The template used a field this executor does not support
    UnsupportedTemplate(String),
    /// No template matched the input
    NoMatch,
}

/// Parse datetime text against an explicit template, or against the
/// ISO template ladder when no template is given. `default_tz` is the
/// offset supplied by the method's timezone argument, if any.
pub(crate) fn parse_datetime_text(
    input: &str,
    template: Option<&str>,
    default_tz: Option<i32>,
) -> Result<DateTimeItem, DatetimeParseError> {
    let input = input.trim();

    if let Some(template) = template {
        let toks = lex_template(template)?;
        return match_template(input, &toks, default_tz).ok_or(DatetimeParseError::NoMatch);
    }

    for template in ISO_TEMPLATES {
        let toks = lex_template(template)?;
        if let Some(item) = match_template(input, &toks, default_tz) {
            return Ok(item);
        }
    }

    Err(DatetimeParseError::NoMatch)
}

/// Parse a fixed-offset zone spelling: `UTC`, `GMT`, `Z`, `+HH`,
/// `+HH:MM`, `+HHMM`. Returns seconds east of UTC.
pub(crate) fn parse_tz_offset_name(name: &str) -> Option<i32> {
    let name = name.trim();
    if name.eq_ignore_ascii_case("utc")
        || name.eq_ignore_ascii_case("gmt")
        || name.eq_ignore_ascii_case("z")
    {
        return Some(0);
    }

    let mut chars = name.chars();
    let sign = match chars.next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let rest: String = chars.collect();
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if rest.contains(':') && rest.len() != digits.len() + 1 {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().ok()?, 0),
        4 => (
            digits[..2].parse::<i32>().ok()?,
            digits[2..].parse::<i32>().ok()?,
        ),
        _ => return None,
    };
    if hours > 15 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tok {
    Year4,
    Month,
    Day,
    Hour24,
    Minute,
    Second,
    Fraction(u32),
    TzHour,
    TzMinute,
    Lit(char),
    Sep { required: bool },
}

fn lex_template(template: &str) -> Result<Vec<Tok>, DatetimeParseError> {
    let upper = template.to_ascii_uppercase();
    let bytes = upper.as_bytes();
    let mut toks = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let rest = &upper[i..];
        if rest.starts_with("HH24") {
            toks.push(Tok::Hour24);
            i += 4;
        } else if rest.starts_with("YYYY") {
            toks.push(Tok::Year4);
            i += 4;
        } else if rest.starts_with("TZH") {
            // a separator directly before the offset is optional
            if let Some(Tok::Sep { required }) = toks.last_mut() {
                *required = false;
            }
            toks.push(Tok::TzHour);
            i += 3;
        } else if rest.starts_with("TZM") {
            toks.push(Tok::TzMinute);
            i += 3;
        } else if rest.starts_with("FF") {
            let digit = rest[2..].chars().next().and_then(|c| c.to_digit(10));
            match digit {
                Some(n) if (1..=6).contains(&n) => {
                    toks.push(Tok::Fraction(n));
                    i += 3;
                }
                _ => {
                    return Err(DatetimeParseError::UnsupportedTemplate("FF".to_string()));
                }
            }
        } else if rest.starts_with("MM") {
            toks.push(Tok::Month);
            i += 2;
        } else if rest.starts_with("DD") {
            toks.push(Tok::Day);
            i += 2;
        } else if rest.starts_with("MI") {
            toks.push(Tok::Minute);
            i += 2;
        } else if rest.starts_with("SS") {
            toks.push(Tok::Second);
            i += 2;
        } else {
            let c = rest.chars().next().unwrap_or(' ');
            if c.is_ascii_alphabetic() {
                let field: String = rest.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
                return Err(DatetimeParseError::UnsupportedTemplate(field));
            }
            if c == ' ' {
                toks.push(Tok::Sep { required: true });
            } else {
                toks.push(Tok::Lit(c));
            }
            i += c.len_utf8();
        }
    }

    Ok(toks)
}

#[derive(Debug, Default)]
struct RawFields {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
    second: Option<u32>,
    micros: Option<u32>,
    tz_sign: i32,
    tz_hour: Option<u32>,
    tz_minute: Option<u32>,
}

fn match_template(input: &str, toks: &[Tok], default_tz: Option<i32>) -> Option<DateTimeItem> {
    let bytes = input.as_bytes();
    let mut pos = 0;
    let mut fields = RawFields::default();

    let read_digits = |pos: &mut usize, max: usize| -> Option<u32> {
        let start = *pos;
        while *pos < bytes.len() && *pos - start < max && bytes[*pos].is_ascii_digit() {
            *pos += 1;
        }
        if *pos == start {
            return None;
        }
        input[start..*pos].parse().ok()
    };

    for tok in toks {
        match tok {
            Tok::Year4 => fields.year = Some(read_digits(&mut pos, 4)? as i32),
            Tok::Month => fields.month = Some(read_digits(&mut pos, 2)?),
            Tok::Day => fields.day = Some(read_digits(&mut pos, 2)?),
            Tok::Hour24 => fields.hour = Some(read_digits(&mut pos, 2)?),
            Tok::Minute => fields.minute = Some(read_digits(&mut pos, 2)?),
            Tok::Second => fields.second = Some(read_digits(&mut pos, 2)?),
            Tok::Fraction(max) => {
                let start = pos;
                let digits = read_digits(&mut pos, *max as usize)?;
                let len = (pos - start) as u32;
                fields.micros = Some(digits * 10u32.pow(6 - len));
            }
            Tok::TzHour => {
                let sign = match bytes.get(pos) {
                    Some(b'+') => 1,
                    Some(b'-') => -1,
                    _ => return None,
                };
                pos += 1;
                fields.tz_sign = sign;
                fields.tz_hour = Some(read_digits(&mut pos, 2)?);
            }
            Tok::TzMinute => fields.tz_minute = Some(read_digits(&mut pos, 2)?),
            Tok::Lit(c) => {
                let next = input[pos..].chars().next()?;
                if next != *c {
                    return None;
                }
                pos += next.len_utf8();
            }
            Tok::Sep { required } => {
                let matched = matches!(bytes.get(pos), Some(b' ') | Some(b'T') | Some(b't'));
                if matched {
                    pos += 1;
                } else if *required {
                    return None;
                }
            }
        }
    }

    if pos != bytes.len() {
        return None;
    }

    fields_to_item(&fields, default_tz)
}

fn fields_to_item(fields: &RawFields, default_tz: Option<i32>) -> Option<DateTimeItem> {
    let has_date = fields.year.is_some() || fields.month.is_some() || fields.day.is_some();
    let has_time = fields.hour.is_some()
        || fields.minute.is_some()
        || fields.second.is_some()
        || fields.micros.is_some();
    let tz = fields.tz_hour.map(|h| {
        fields.tz_sign * (h as i32 * 3600 + fields.tz_minute.unwrap_or(0) as i32 * 60)
    });

    let date = if has_date {
        Some(NaiveDate::from_ymd_opt(
            fields.year.unwrap_or(1),
            fields.month.unwrap_or(1),
            fields.day.unwrap_or(1),
        )?)
    } else {
        None
    };
    let time = if has_time {
        Some(NaiveTime::from_hms_micro_opt(
            fields.hour.unwrap_or(0),
            fields.minute.unwrap_or(0),
            fields.second.unwrap_or(0),
            fields.micros.unwrap_or(0),
        )?)
    } else {
        None
    };

    match (date, time, tz) {
        (Some(d), Some(t), Some(offset)) => {
            let ts = naive_in_zone(NaiveDateTime::new(d, t), Some(offset))?;
            Some(DateTimeItem::timestamp_tz(ts))
        }
        (Some(d), Some(t), None) => Some(DateTimeItem {
            value: DateTimeValue::Timestamp(NaiveDateTime::new(d, t)),
            tz: default_tz,
        }),
        (Some(d), None, _) => Some(DateTimeItem {
            value: DateTimeValue::Date(d),
            tz: tz.or(default_tz),
        }),
        (None, Some(t), Some(offset)) => Some(DateTimeItem::time_tz(t, offset)),
        (None, Some(t), None) => Some(DateTimeItem {
            value: DateTimeValue::Time(t),
            tz: default_tz,
        }),
        (None, None, _) => None,
    }
}
