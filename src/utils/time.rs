use chrono::{DateTime, NaiveDate, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Date layout expected by the compliance templates.
pub fn us_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%m/%d/%Y").to_string())
        .unwrap_or_default()
}

pub fn file_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S").to_string()
}

/// Accepts the `YYYY-MM-DD` value an HTML date input submits; blank means unset.
pub fn parse_form_date(raw: Option<&str>) -> Result<Option<NaiveDate>, chrono::ParseError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d").map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn us_date_pads_month_and_day() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7);
        assert_eq!(us_date(date), "03/07/2024");
        assert_eq!(us_date(None), "");
    }

    #[test]
    fn file_stamp_is_sortable() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(file_stamp(at), "20250102030405");
    }

    #[test]
    fn form_dates_allow_blank() {
        assert_eq!(parse_form_date(Some("  ")).unwrap(), None);
        assert_eq!(parse_form_date(None).unwrap(), None);
        assert_eq!(
            parse_form_date(Some("2024-09-01")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 1)
        );
        assert!(parse_form_date(Some("09/01/2024")).is_err());
    }
}
