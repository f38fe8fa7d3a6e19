use std::io::prelude::BufRead;

pub fn approx_equal(a: f64, b: f64, decimal_precision: u8) -> bool {
    let p = 10f64.powi(-(decimal_precision as i32));
    (a - b).abs() < p
}

custom_error::custom_error! {pub ReadError
    FailedToEstablish { location: String, message: String } = "failed to open {location}; {message}",
    ReadFailure { location: String, message: String } = "failed to read {location}; {message}",
}

/// read lines of text from a local path, or over HTTP if the path is not a file but parses as a URL
pub fn read_lines(path: &str) -> Result<Vec<String>, ReadError> {
    let mut lines: Vec<String> = vec![];
    if std::path::Path::new(path).exists() {
        let file = std::fs::File::open(path).map_err(|error| ReadError::FailedToEstablish {
            location: path.to_owned(),
            message: error.to_string(),
        })?;
        let reader = std::io::BufReader::new(file);
        for line in reader.lines() {
            lines.push(line.map_err(|error| ReadError::ReadFailure {
                location: path.to_owned(),
                message: error.to_string(),
            })?);
        }
    } else {
        let url = url::Url::parse(path).map_err(|error| ReadError::FailedToEstablish {
            location: path.to_owned(),
            message: error.to_string(),
        })?;
        let text = read_url(&url)?;
        for line in text.lines() {
            lines.push(line.to_string());
        }
    }

    Ok(lines)
}

pub fn read_url(url: &url::Url) -> Result<String, ReadError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT.to_owned())
        .timeout(Some(std::time::Duration::from_secs(30)))
        .build()
        .map_err(|error| ReadError::FailedToEstablish {
            location: url.to_string(),
            message: error.to_string(),
        })?;

    let response = client
        .get(url.to_owned())
        .send()
        .map_err(|error| ReadError::ReadFailure {
            location: url.to_string(),
            message: error.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(ReadError::ReadFailure {
            location: url.to_string(),
            message: format!("HTTP status {:}", response.status()),
        });
    }

    response.text().map_err(|error| ReadError::ReadFailure {
        location: url.to_string(),
        message: error.to_string(),
    })
}

lazy_static::lazy_static! {
    pub static ref USER_AGENT: String = format!("cutdown/{:}", env!("CARGO_PKG_VERSION"));
}

pub mod optional_utc_datetime_string {
    use chrono::TimeZone;
    use serde::Deserialize;

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(
        date: &Option<chrono::DateTime<chrono::Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if let Some(ref date) = *date {
            return serializer.serialize_str(&format!("{:}", date.format(FORMAT)));
        }
        serializer.serialize_none()
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value: Option<String> = Option::deserialize(deserializer)?;
        if let Some(value) = value {
            return Ok(Some(
                match chrono::NaiveDateTime::parse_from_str(&value, FORMAT) {
                    Ok(datetime) => chrono::Utc.from_utc_datetime(&datetime),
                    Err(_) => chrono::DateTime::parse_from_rfc3339(&value)
                        .map_err(serde::de::Error::custom)?
                        .with_timezone(&chrono::Utc),
                },
            ));
        }

        Ok(None)
    }
}

pub fn duration_string(duration: chrono::Duration) -> String {
    let mut parts = vec![];

    let hours = duration.num_hours().abs();
    let minutes = duration.num_minutes().abs() % 60;
    let seconds = duration.num_seconds().abs() % 60;

    if hours > 0 {
        parts.push(format!("{:}h", hours));
    }

    if minutes > 0 {
        parts.push(format!("{:}m", minutes));
    }

    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{:}s", seconds));
    }

    parts.join(" ")
}

pub fn seconds(duration: chrono::Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_string() {
        assert_eq!(
            duration_string(chrono::Duration::seconds(4 * 3600 + 2 * 60 + 5)),
            "4h 2m 5s"
        );
        assert_eq!(duration_string(chrono::Duration::seconds(90)), "1m 30s");
        assert_eq!(duration_string(chrono::Duration::zero()), "0s");
    }

    #[test]
    fn test_read_lines_from_file() {
        let path = format!(
            "{:}/{:}",
            env!("CARGO_MANIFEST_DIR"),
            "data/terrain/tug_hill.txt"
        );

        let lines = read_lines(&path).unwrap();

        assert!(!lines.is_empty());
    }

    #[test]
    fn test_read_lines_missing() {
        assert!(matches!(
            read_lines("not/a/real/path.txt"),
            Err(ReadError::FailedToEstablish { .. })
        ));
    }
}
