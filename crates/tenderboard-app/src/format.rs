// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Offset used when the local one cannot be determined.
pub fn local_offset_or_utc() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn parse_utc_offset(raw: &str) -> Option<UtcOffset> {
    UtcOffset::parse(
        raw.trim(),
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .ok()
}

/// Parses a wire timestamp and converts it to `offset`.
///
/// Accepts RFC 3339, an offset-less `YYYY-MM-DDTHH:MM[:SS[.fff]]` (taken as
/// already being in `offset`), and a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(raw: &str, offset: UtcOffset) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return convert(parsed, offset);
    }

    let local = PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            raw,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(raw, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    });
    if let Ok(local) = local {
        return Some(local.assume_offset(offset));
    }

    let date = Date::parse(raw, format_description!("[year]-[month]-[day]")).ok()?;
    convert(date.midnight().assume_utc(), offset)
}

// Offsets are bounded to under a day, so keeping away from the calendar
// edges makes the conversion infallible.
fn convert(value: OffsetDateTime, offset: UtcOffset) -> Option<OffsetDateTime> {
    if !(-9998..=9998).contains(&value.year()) {
        return None;
    }
    Some(value.to_offset(offset))
}

/// `DD.MM.YYYY HH:MM` on a 24-hour clock, or an empty string for bad input.
pub fn format_date_time(raw: &str, offset: UtcOffset) -> String {
    parse_timestamp(raw, offset)
        .and_then(|value| {
            value
                .format(format_description!(
                    "[day].[month].[year] [hour repr:24]:[minute]"
                ))
                .ok()
        })
        .unwrap_or_default()
}

/// `DD.MM.YYYY`, or an empty string for bad input.
pub fn format_date(raw: &str, offset: UtcOffset) -> String {
    parse_timestamp(raw, offset)
        .and_then(|value| {
            value
                .date()
                .format(format_description!("[day].[month].[year]"))
                .ok()
        })
        .unwrap_or_default()
}

pub fn same_calendar_day(a: OffsetDateTime, b: OffsetDateTime, offset: UtcOffset) -> bool {
    a.to_offset(offset).date() == b.to_offset(offset).date()
}

/// Parses the `YYYY-MM-DD` value typed into the date filter.
pub fn parse_filter_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

pub fn format_filter_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{
        format_date, format_date_time, format_filter_date, parse_filter_date,
        parse_timestamp, parse_utc_offset, same_calendar_day,
    };
    use time::macros::{date, datetime, offset};
    use time::UtcOffset;

    #[test]
    fn invalid_input_formats_to_empty_string() {
        assert_eq!(format_date_time("not a date", UtcOffset::UTC), "");
        assert_eq!(format_date("", UtcOffset::UTC), "");
        assert_eq!(format_date("2026-13-40", UtcOffset::UTC), "");
    }

    #[test]
    fn date_time_uses_24_hour_clock_in_display_offset() {
        let rendered = format_date_time("2026-02-01T15:05:00Z", offset!(+6));
        assert_eq!(rendered, "01.02.2026 21:05");
    }

    #[test]
    fn date_only_round_trips_calendar_fields() {
        let rendered = format_date("2026-07-09T10:00:00+06:00", offset!(+6));
        assert_eq!(rendered, "09.07.2026");
        let parsed =
            parse_timestamp("2026-07-09T10:00:00+06:00", offset!(+6)).expect("should parse");
        assert_eq!(parsed.date(), date!(2026 - 07 - 09));
    }

    #[test]
    fn offset_shift_can_move_the_calendar_day() {
        assert_eq!(
            format_date("2026-01-31T22:30:00Z", offset!(+6)),
            "01.02.2026"
        );
        assert_eq!(format_date("2026-01-31T22:30:00Z", UtcOffset::UTC), "31.01.2026");
    }

    #[test]
    fn offsetless_timestamps_are_taken_in_display_offset() {
        let parsed =
            parse_timestamp("2026-02-01T09:30:00.250", offset!(+6)).expect("should parse");
        assert_eq!(parsed.offset(), offset!(+6));
        assert_eq!(parsed.hour(), 9);

        let minutes = parse_timestamp("2026-02-01T09:30", UtcOffset::UTC).expect("should parse");
        assert_eq!(minutes.minute(), 30);
    }

    #[test]
    fn bare_dates_are_midnight_utc() {
        let parsed = parse_timestamp("2026-02-01", offset!(-5)).expect("should parse");
        assert_eq!(parsed.date(), date!(2026 - 01 - 31));
        assert_eq!(parsed.hour(), 19);
    }

    #[test]
    fn same_calendar_day_ignores_time_of_day() {
        let morning = datetime!(2026-02-01 00:10 +06:00);
        let evening = datetime!(2026-02-01 23:50 +06:00);
        assert!(same_calendar_day(morning, evening, offset!(+6)));
        assert!(!same_calendar_day(morning, evening, UtcOffset::UTC));
    }

    #[test]
    fn filter_date_parses_iso_calendar_dates() {
        assert_eq!(parse_filter_date(" 2026-02-01 "), Some(date!(2026 - 02 - 01)));
        assert_eq!(parse_filter_date("01.02.2026"), None);
        assert_eq!(format_filter_date(date!(2026 - 02 - 01)), "2026-02-01");
    }

    #[test]
    fn utc_offset_parses_signed_hours_and_minutes() {
        assert_eq!(parse_utc_offset("+06:00"), Some(offset!(+6)));
        assert_eq!(parse_utc_offset("-03:30"), Some(offset!(-3:30)));
        assert_eq!(parse_utc_offset("6"), None);
    }
}
