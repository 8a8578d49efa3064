use chrono::{Datelike, NaiveDate};

/// Render a day with the user's preferred date format.
///
/// The host's format strings use Unicode-style tokens (`yyyy`, `MM`, `do`,
/// `EEE`, ...) rather than strftime. This is the single point where that
/// grammar is interpreted; every journal page name produced by this crate
/// goes through here.
pub fn format_user_date(date: NaiveDate, fmt: &str) -> String {
    let chars: Vec<char> = fmt.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let rest: String = chars[i..].iter().collect();
        let (piece, consumed) = if rest.starts_with("yyyy") {
            (format!("{:04}", date.year()), 4)
        } else if rest.starts_with("yy") {
            (format!("{:02}", date.year() % 100), 2)
        } else if rest.starts_with("MMMM") {
            (date.format("%B").to_string(), 4)
        } else if rest.starts_with("MMM") {
            (date.format("%b").to_string(), 3)
        } else if rest.starts_with("MM") {
            (format!("{:02}", date.month()), 2)
        } else if rest.starts_with('M') {
            (date.month().to_string(), 1)
        } else if rest.starts_with("EEEE") {
            (date.format("%A").to_string(), 4)
        } else if rest.starts_with("EEE") {
            (date.format("%a").to_string(), 3)
        } else if rest.starts_with("EE") {
            (date.format("%a").to_string(), 2)
        } else if rest.starts_with('E') {
            (date.format("%a").to_string(), 1)
        } else if rest.starts_with("do") {
            (
                format!("{}{}", date.day(), ordinal_suffix(date.day())),
                2,
            )
        } else if rest.starts_with("dd") {
            (format!("{:02}", date.day()), 2)
        } else if rest.starts_with('d') {
            (date.day().to_string(), 1)
        } else {
            (chars[i].to_string(), 1)
        };
        out.push_str(&piece);
        i += consumed;
    }
    out
}

fn ordinal_suffix(day: u32) -> &'static str {
    match day {
        11..=13 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    }
}

/// The store's native date stamp, e.g. `<2024-03-01 Fri>`.
pub fn scheduled_stamp(date: NaiveDate) -> String {
    date.format("<%Y-%m-%d %a>").to_string()
}

/// Parse the inside of a `<...>` stamp. Trailing tokens (weekday, repeater)
/// are ignored; a malformed date yields None.
pub fn parse_scheduled_date(inner: &str) -> Option<NaiveDate> {
    let token = inner.trim().split_whitespace().next()?;
    NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
}

/// Journal pages carry their day on the wire as a yyyymmdd integer.
pub fn journal_day_to_date(n: u32) -> Option<NaiveDate> {
    let year = (n / 10_000) as i32;
    let month = (n / 100) % 100;
    let day = n % 100;
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn date_to_journal_day(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}
