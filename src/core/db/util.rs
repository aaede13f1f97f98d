use time::{OffsetDateTime, format_description};

pub(super) fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// `2024-05-01 13:45:10`, as stored in the database and written to exports
pub fn display_timestamp(at: OffsetDateTime) -> anyhow::Result<String> {
    let format = format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]")?;
    Ok(at.format(&format)?)
}

/// `20240501_134510`, used in export file names
pub fn file_timestamp(at: OffsetDateTime) -> anyhow::Result<String> {
    let format = format_description::parse("[year][month][day]_[hour][minute][second]")?;
    Ok(at.format(&format)?)
}
