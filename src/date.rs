use chrono::{Datelike, NaiveDate, Weekday};

const MONTHS: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre",
    "octobre", "novembre", "décembre",
];

fn weekday_fr(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "lundi",
        Weekday::Tue => "mardi",
        Weekday::Wed => "mercredi",
        Weekday::Thu => "jeudi",
        Weekday::Fri => "vendredi",
        Weekday::Sat => "samedi",
        Weekday::Sun => "dimanche",
    }
}

/// Long French date, e.g. `vendredi 16 octobre 2026`.
pub fn french_date_label(date: NaiveDate) -> String {
    format!(
        "{} {} {} {}",
        weekday_fr(date.weekday()),
        date.day(),
        MONTHS[date.month0() as usize],
        date.year()
    )
}

pub fn today_label() -> String {
    french_date_label(chrono::Local::now().date_naive())
}
