use serde::Deserialize;
use time::{
    format_description::well_known::Rfc3339, macros::format_description,
    Date, OffsetDateTime, PrimitiveDateTime,
};

use super::services::EntryUpdate;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub title: String,
}

impl StartRequest {
    pub fn validate(self) -> Result<String, AppError> {
        non_empty_title(self.title)
    }
}

/// Body of `PUT /timer/update/:id`. Dates are ISO 8601 strings; without an offset they are UTC.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub title: String,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
}

impl UpdateRequest {
    pub fn validate(self) -> Result<EntryUpdate, AppError> {
        let title = non_empty_title(self.title)?;
        let start_time = parse_timestamp("startTime", &self.start_time)?;
        let end_time = self
            .end_time
            .map(|v| parse_timestamp("endTime", &v))
            .transpose()?;
        Ok(EntryUpdate {
            title,
            start_time,
            end_time,
        })
    }
}

fn non_empty_title(title: String) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title should not be empty"));
    }
    Ok(title.to_string())
}

/// RFC 3339 first; a date-time without offset is read as UTC and a bare
/// date as midnight UTC.
fn parse_timestamp(field: &str, value: &str) -> Result<OffsetDateTime, AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} should not be empty")));
    }
    if let Ok(ts) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(ts);
    }
    let local_date_times = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    ];
    local_date_times
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(value, *format).ok())
        .or_else(|| {
            Date::parse(value, format_description!("[year]-[month]-[day]"))
                .ok()
                .map(Date::midnight)
        })
        .map(PrimitiveDateTime::assume_utc)
        .ok_or_else(|| AppError::validation(format!("{field} must be a valid ISO 8601 date string")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn update(title: &str, start: &str, end: Option<&str>) -> UpdateRequest {
        UpdateRequest {
            title: title.into(),
            start_time: start.into(),
            end_time: end.map(Into::into),
        }
    }

    #[test]
    fn parses_camel_case_body() {
        let req: UpdateRequest = serde_json::from_str(
            r#"{"title":"t","startTime":"2020-07-08T20:00:00Z","endTime":"2020-07-08T21:00:00.250+02:00"}"#,
        )
        .unwrap();
        let upd = req.validate().unwrap();
        assert_eq!(upd.start_time, datetime!(2020-07-08 20:00:00 UTC));
        assert_eq!(upd.end_time, Some(datetime!(2020-07-08 21:00:00.250 +2)));
    }

    #[test]
    fn end_time_may_be_missing_or_null() {
        let req: UpdateRequest =
            serde_json::from_str(r#"{"title":"t","startTime":"2020-07-08T20:00:00Z"}"#).unwrap();
        assert!(req.validate().unwrap().end_time.is_none());

        let req: UpdateRequest = serde_json::from_str(
            r#"{"title":"t","startTime":"2020-07-08T20:00:00Z","endTime":null}"#,
        )
        .unwrap();
        assert!(req.validate().unwrap().end_time.is_none());
    }

    #[test]
    fn dates_without_offset_are_utc() {
        for (value, expected) in [
            ("2020-07-08", datetime!(2020-07-08 00:00:00 UTC)),
            ("2020-07-08T20:00", datetime!(2020-07-08 20:00:00 UTC)),
            ("2020-07-08T20:00:00", datetime!(2020-07-08 20:00:00 UTC)),
            ("2020-07-08T20:00:00.000", datetime!(2020-07-08 20:00:00 UTC)),
            ("2020-07-08T20:00:00.250", datetime!(2020-07-08 20:00:00.250 UTC)),
        ] {
            let upd = update("t", value, Some("2020-07-09T00:00:00Z")).validate().unwrap();
            assert_eq!(upd.start_time, expected, "{value}");
        }
    }

    #[test]
    fn rejects_malformed_input() {
        for req in [
            update("", "2020-07-08T20:00:00Z", None),
            update("   ", "2020-07-08T20:00:00Z", None),
            update("t", "", None),
            update("t", "yesterday", None),
            update("t", "2020-07-08 20:00:00", None),
            update("t", "2020-07-08T", None),
            update("t", "2020-02-30", None),
            update("t", "2020-07-08T20:00:00Z", Some("")),
            update("t", "2020-07-08T20:00:00Z", Some("2020-13-01T00:00:00Z")),
        ] {
            assert!(matches!(req.validate(), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn start_title_is_trimmed_and_required() {
        let ok = StartRequest { title: "  Write spec ".into() }.validate().unwrap();
        assert_eq!(ok, "Write spec");
        assert!(StartRequest { title: " ".into() }.validate().is_err());
    }
}
