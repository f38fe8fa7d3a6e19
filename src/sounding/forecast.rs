use chrono::{Datelike, Timelike};

const M_PER_S_PER_KNOT: f64 = 0.514444;
const MISSING: &str = "99999";

fn default_api_url() -> String {
    String::from("https://rucsoundings.noaa.gov/get_soundings.cgi")
}

fn default_data_source() -> String {
    String::from("Op40")
}

/// Model sounding from the NOAA RAP/RUC sounding service, at the grid point nearest the launch.
#[derive(serde::Deserialize, Debug, PartialEq, Clone)]
pub struct ForecastQuery {
    /// forecast valid time; defaults to the launch time
    #[serde(default, with = "crate::utilities::optional_utc_datetime_string")]
    pub time: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_data_source")]
    pub data_source: String,
}

impl Default for ForecastQuery {
    fn default() -> Self {
        Self {
            time: None,
            api_url: default_api_url(),
            data_source: default_data_source(),
        }
    }
}

impl ForecastQuery {
    pub fn new(time: Option<chrono::DateTime<chrono::Utc>>) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }

    fn parameters(
        &self,
        launch: &crate::prediction::Launch,
    ) -> Result<Vec<(&str, String)>, super::SoundingError> {
        let time = match self.time.or(launch.time) {
            Some(time) => time,
            None => {
                return Err(super::SoundingError::MissingLaunch {
                    message: "a forecast sounding needs a forecast time or launch time"
                        .to_string(),
                })
            }
        };

        // the service works in whole hours
        let end_seconds = time.timestamp() - time.timestamp().rem_euclid(3600);

        Ok(vec![
            ("data_source", self.data_source.to_owned()),
            ("start_year", format!("{:}", time.year())),
            ("start_month_name", time.format("%b").to_string()),
            ("start_mday", format!("{:}", time.day())),
            ("start_hour", format!("{:}", time.hour())),
            ("start_min", String::from("0")),
            ("n_hrs", String::from("1.0")),
            ("fcst_len", String::from("shortest")),
            (
                "airport",
                format!("{:},{:}", launch.coord.y, launch.coord.x),
            ),
            ("text", String::from("Ascii")),
            ("startSecs", format!("{:}", end_seconds - 3600)),
            ("endSecs", format!("{:}", end_seconds)),
        ])
    }

    fn url(&self, launch: &crate::prediction::Launch) -> Result<url::Url, super::SoundingError> {
        url::Url::parse_with_params(&self.api_url, &self.parameters(launch)?).map_err(|error| {
            super::SoundingError::RetrievalError {
                location: self.api_url.to_owned(),
                message: error.to_string(),
            }
        })
    }

    pub fn retrieve_sounding(
        &self,
        launch: &crate::prediction::Launch,
    ) -> Result<super::SoundingProfile, super::SoundingError> {
        let url = self.url(launch)?;
        let text = crate::utilities::read_url(&url)?;
        log::debug!("retrieved forecast sounding from {:}", url);
        parse_rap_sounding(&text)
    }
}

/// Parse the ASCII RAOB-style text returned by the sounding service.
///
/// Data lines are `type pressure height temperature dewpoint direction speed`, where type 4-9
/// marks a level, pressure is in tenths of hPa, and `99999` is missing. The type-3 line declares
/// the wind speed unit (`kt` or `ms`).
pub fn parse_rap_sounding(text: &str) -> Result<super::SoundingProfile, super::SoundingError> {
    let mut knots = true;
    let mut points = vec![];

    for (index, line) in text.lines().enumerate() {
        let line_type = match line
            .split_whitespace()
            .next()
            .and_then(|token| token.parse::<u8>().ok())
        {
            Some(line_type) => line_type,
            None => continue,
        };

        match line_type {
            3 => {
                if let Some(unit) = line.split_whitespace().last() {
                    knots = unit != "ms";
                }
            }
            4..=9 => {
                let values = crate::parse::parse_exact_columns(line, index + 1, 7, &[MISSING])?;
                if let (Some(pressure), Some(height), Some(direction), Some(speed)) =
                    (values[1], values[2], values[5], values[6])
                {
                    let speed = if knots {
                        speed * M_PER_S_PER_KNOT
                    } else {
                        speed
                    };
                    points.push(super::SoundingPoint::new(
                        height,
                        pressure / 10.0,
                        speed,
                        direction,
                    ));
                }
            }
            _ => continue,
        }
    }

    if points.is_empty() {
        return Err(super::SoundingError::ParsingError {
            message: "no sounding levels found in forecast response".to_string(),
        });
    }

    Ok(super::SoundingProfile::monotonic(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sounding::Atmosphere;
    use crate::utilities::approx_equal;
    use chrono::TimeZone;

    fn sample() -> String {
        let path = format!(
            "{:}/{:}",
            env!("CARGO_MANIFEST_DIR"),
            "data/soundings/rap_op40_2023122717.txt"
        );
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_parse_sample() {
        let profile = parse_rap_sounding(&sample()).unwrap();

        assert!(profile.len() > 10);
        let surface = &profile.points()[0];
        assert_eq!(surface.altitude, 75.0);
        assert!(approx_equal(surface.pressure, 1003.0, 6));
        assert!(approx_equal(surface.wind_speed, 12.0 * M_PER_S_PER_KNOT, 6));
        assert_eq!(surface.wind_bearing, 250.0);
        assert!(profile.ceiling().unwrap() > 15000.0);
    }

    #[test]
    fn test_parse_metric_winds() {
        let text = "\
      3           43.7,-77.0   12     ms
      9  10030     75     40    -10    250     12
      4   9250    820    -20    -50    260     15
";
        let profile = parse_rap_sounding(text).unwrap();

        assert_eq!(profile.len(), 2);
        assert_eq!(profile.points()[1].wind_speed, 15.0);
        assert!(approx_equal(profile.points()[1].pressure, 925.0, 6));
    }

    #[test]
    fn test_empty_response() {
        assert!(matches!(
            parse_rap_sounding("no data"),
            Err(crate::sounding::SoundingError::ParsingError { .. })
        ));
    }

    #[test]
    fn test_parameters() {
        let launch = crate::prediction::Launch::new(
            geo::coord! { x: -77.0, y: 43.7 },
            300.0,
            Some(chrono::Utc.with_ymd_and_hms(2023, 12, 27, 17, 25, 0).unwrap()),
        );
        let query = ForecastQuery::default();
        let parameters = query.parameters(&launch).unwrap();

        assert!(parameters.contains(&("start_month_name", String::from("Dec"))));
        assert!(parameters.contains(&("start_hour", String::from("17"))));
        assert!(parameters.contains(&("airport", String::from("43.7,-77"))));
        assert!(parameters.contains(&("endSecs", String::from("1703696400"))));
        assert!(parameters.contains(&("startSecs", String::from("1703692800"))));
    }

    #[test]
    fn test_url() {
        let launch = crate::prediction::Launch::new(
            geo::coord! { x: -77.0, y: 43.7 },
            300.0,
            Some(chrono::Utc.with_ymd_and_hms(2023, 12, 27, 17, 25, 0).unwrap()),
        );

        let url = ForecastQuery::default().url(&launch).unwrap();
        assert_eq!(url.host_str(), Some("rucsoundings.noaa.gov"));
        assert!(url
            .query_pairs()
            .any(|(key, value)| key == "airport" && value == "43.7,-77"));

        let query = ForecastQuery {
            api_url: String::from("rucsoundings"),
            ..ForecastQuery::default()
        };
        assert!(matches!(
            query.retrieve_sounding(&launch),
            Err(crate::sounding::SoundingError::RetrievalError { .. })
        ));
    }

    #[test]
    fn test_missing_time() {
        let launch = crate::prediction::Launch::new(geo::coord! { x: -77.0, y: 43.7 }, 300.0, None);

        assert!(matches!(
            ForecastQuery::default().parameters(&launch),
            Err(crate::sounding::SoundingError::MissingLaunch { .. })
        ));
    }

    #[test]
    #[ignore]
    fn test_retrieve_forecast() {
        let launch = crate::prediction::Launch::new(
            geo::coord! { x: -77.0, y: 43.7 },
            300.0,
            Some(chrono::Utc::now()),
        );

        let profile = ForecastQuery::default().retrieve_sounding(&launch).unwrap();

        assert!(profile.len() > 2);
    }
}
