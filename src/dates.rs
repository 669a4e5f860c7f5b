//! Calendar date helpers: the spoken/typed date parser, display formatting, and serde
//! adapters for the date shapes the task server sends.

use crate::text;
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, Weekday};

const FILLER: &[&str] = &[
    "a", "ate", "by", "da", "de", "dia", "do", "em", "from", "in", "next", "now", "of", "on",
    "para", "proxima", "proximo", "que", "the", "until", "vem", "within", "feira", "daqui",
    "dentro",
];

const MONTHS: &[(&str, u32)] = &[
    ("janeiro", 1),
    ("january", 1),
    ("jan", 1),
    ("fevereiro", 2),
    ("february", 2),
    ("fev", 2),
    ("feb", 2),
    ("marco", 3),
    ("march", 3),
    ("mar", 3),
    ("abril", 4),
    ("april", 4),
    ("abr", 4),
    ("apr", 4),
    ("maio", 5),
    ("may", 5),
    ("mai", 5),
    ("junho", 6),
    ("june", 6),
    ("jun", 6),
    ("julho", 7),
    ("july", 7),
    ("jul", 7),
    ("agosto", 8),
    ("august", 8),
    ("ago", 8),
    ("aug", 8),
    ("setembro", 9),
    ("september", 9),
    ("set", 9),
    ("sep", 9),
    ("outubro", 10),
    ("october", 10),
    ("out", 10),
    ("oct", 10),
    ("novembro", 11),
    ("november", 11),
    ("nov", 11),
    ("dezembro", 12),
    ("december", 12),
    ("dez", 12),
    ("dec", 12),
];

const WEEKDAYS: &[(&str, Weekday)] = &[
    ("segunda", Weekday::Mon),
    ("monday", Weekday::Mon),
    ("terca", Weekday::Tue),
    ("tuesday", Weekday::Tue),
    ("quarta", Weekday::Wed),
    ("wednesday", Weekday::Wed),
    ("quinta", Weekday::Thu),
    ("thursday", Weekday::Thu),
    ("sexta", Weekday::Fri),
    ("friday", Weekday::Fri),
    ("sabado", Weekday::Sat),
    ("saturday", Weekday::Sat),
    ("domingo", Weekday::Sun),
    ("sunday", Weekday::Sun),
];

const NUMBER_WORDS: &[(&str, u32)] = &[
    ("um", 1),
    ("uma", 1),
    ("one", 1),
    ("a", 1),
    ("dois", 2),
    ("duas", 2),
    ("two", 2),
    ("tres", 3),
    ("three", 3),
    ("quatro", 4),
    ("four", 4),
    ("cinco", 5),
    ("five", 5),
    ("seis", 6),
    ("six", 6),
    ("sete", 7),
    ("seven", 7),
    ("oito", 8),
    ("eight", 8),
    ("nove", 9),
    ("nine", 9),
    ("dez", 10),
    ("ten", 10),
    ("quinze", 15),
    ("fifteen", 15),
    ("vinte", 20),
    ("twenty", 20),
    ("trinta", 30),
    ("thirty", 30),
];

/// Resolves a spoken or typed date phrase to a calendar date, relative to `today`.
///
/// Returns `None` for anything it cannot read; callers treat that as "no date".
pub fn parse_spoken_date(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let folded = text::fold(input);
    let trimmed = folded
        .trim()
        .trim_matches(|c: char| c == '.' || c == ':' || c == '!' || c == '?')
        .trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.chars().any(|c| c.is_ascii_digit())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '/' | '-' | '.'))
    {
        return parse_numeric(trimmed, today);
    }

    let spaced = trimmed.replace(['-', ','], " ");
    let words: Vec<&str> = spaced.split_whitespace().collect();

    if let Some(date) = parse_relative_phrase(&words, today) {
        return Some(date);
    }

    let tokens: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| !FILLER.contains(w))
        .collect();

    parse_offset(&words, today)
        .or_else(|| parse_weekday(&tokens, today))
        .or_else(|| parse_month_name(&tokens, today))
        // a lone "15/03" or ISO date surrounded by filler words
        .or_else(|| match tokens.as_slice() {
            [single] if single.chars().any(|c| c.is_ascii_digit()) => {
                parse_numeric(single, today)
            }
            _ => None,
        })
}

fn parse_relative_phrase(words: &[&str], today: NaiveDate) -> Option<NaiveDate> {
    let phrase = words.join(" ");
    let phrase = phrase
        .trim_start_matches("para ")
        .trim_start_matches("ate ")
        .trim_start_matches("by ");
    let days = match phrase {
        "hoje" | "today" => 0,
        "amanha" | "tomorrow" => 1,
        "depois de amanha" | "day after tomorrow" | "the day after tomorrow" => 2,
        "proxima semana" | "semana que vem" | "next week" => 7,
        _ => return None,
    };
    today.checked_add_signed(Duration::days(days))
}

/// `em 3 dias`, `daqui a duas semanas`, `in 2 months`.
fn parse_offset(words: &[&str], today: NaiveDate) -> Option<NaiveDate> {
    let tokens: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| {
            !matches!(
                *w,
                "em" | "daqui" | "dentro" | "de" | "in" | "within" | "from" | "now"
            )
        })
        .collect();
    let (amount, unit) = match tokens.as_slice() {
        [amount, unit] => (*amount, *unit),
        // "daqui a 3 dias": the "a" is a preposition, not a number
        ["a", amount, unit] => (*amount, *unit),
        _ => return None,
    };
    let n = parse_number(amount)?;
    match unit {
        "dia" | "dias" | "day" | "days" => today.checked_add_signed(Duration::days(i64::from(n))),
        "semana" | "semanas" | "week" | "weeks" => {
            today.checked_add_signed(Duration::days(7 * i64::from(n)))
        }
        "mes" | "meses" | "month" | "months" => today.checked_add_months(Months::new(n)),
        _ => None,
    }
}

fn parse_number(token: &str) -> Option<u32> {
    token.parse().ok().or_else(|| {
        NUMBER_WORDS
            .iter()
            .find(|(word, _)| *word == token)
            .map(|(_, n)| *n)
    })
}

fn parse_weekday(tokens: &[&str], today: NaiveDate) -> Option<NaiveDate> {
    let [name] = tokens else {
        return None;
    };
    let weekday = WEEKDAYS.iter().find(|(w, _)| w == name).map(|(_, d)| *d)?;
    let ahead = (weekday.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    let ahead = if ahead == 0 { 7 } else { ahead };
    today.checked_add_signed(Duration::days(i64::from(ahead)))
}

fn month_number(token: &str) -> Option<u32> {
    MONTHS.iter().find(|(m, _)| *m == token).map(|(_, n)| *n)
}

fn parse_day(token: &str) -> Option<u32> {
    if matches!(token, "primeiro" | "first") {
        return Some(1);
    }
    let digits: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
    let suffix = &token[digits.len()..];
    if digits.is_empty() || !matches!(suffix, "" | "o" | "º" | "st" | "nd" | "rd" | "th") {
        return None;
    }
    digits.parse().ok().filter(|d| (1..=31).contains(d))
}

fn parse_year(token: &str) -> Option<i32> {
    if !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match token.len() {
        4 => token.parse().ok(),
        2 => token.parse::<i32>().ok().map(|y| 2000 + y),
        _ => None,
    }
}

/// `15 de março de 2025`, `15 março`, `march 15 2025`.
fn parse_month_name(tokens: &[&str], today: NaiveDate) -> Option<NaiveDate> {
    let (day, month, year) = match tokens {
        [d, m] if month_number(m).is_some() => (parse_day(d)?, month_number(m)?, None),
        [d, m, y] if month_number(m).is_some() => {
            (parse_day(d)?, month_number(m)?, Some(parse_year(y)?))
        }
        [m, d] if month_number(m).is_some() => (parse_day(d)?, month_number(m)?, None),
        [m, d, y] if month_number(m).is_some() => {
            (parse_day(d)?, month_number(m)?, Some(parse_year(y)?))
        }
        _ => return None,
    };
    resolve(day, month, year, today)
}

fn parse_numeric(value: &str, today: NaiveDate) -> Option<NaiveDate> {
    let parts: Vec<&str> = value.split(['/', '-', '.']).collect();
    match parts.as_slice() {
        [y, m, d] if y.len() == 4 => {
            NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
        }
        [d, m, y] => resolve(d.parse().ok()?, m.parse().ok()?, Some(parse_year(y)?), today),
        [d, m] => resolve(d.parse().ok()?, m.parse().ok()?, None, today),
        _ => None,
    }
}

/// Without a year the date resolves to its next occurrence on or after `today`.
fn resolve(day: u32, month: u32, year: Option<i32>, today: NaiveDate) -> Option<NaiveDate> {
    match year {
        Some(year) => NaiveDate::from_ymd_opt(year, month, day),
        None => {
            let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
            match this_year {
                Some(date) if date >= today => Some(date),
                _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
            }
        }
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}

/// Optional calendar date that may arrive as `YYYY-MM-DD`, a full datetime, `""` or `null`.
pub mod flexible_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        date.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => {
                let day = value.get(..10).unwrap_or(value);
                NaiveDate::parse_from_str(day, "%Y-%m-%d")
                    .map(Some)
                    .map_err(serde::de::Error::custom)
            }
        }
    }
}

/// Creation timestamps: RFC 3339 (converted to UTC) or a naive ISO datetime.
pub mod flexible_timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&at.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(at.naive_utc());
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
            .map_err(serde::de::Error::custom)
    }
}
