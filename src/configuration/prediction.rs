use serde_with::serde_as;

#[derive(serde::Deserialize, PartialEq, Debug, Clone)]
pub struct LaunchConfiguration {
    /// `[longitude, latitude, altitude]`
    pub location: Vec<f64>,
    #[serde(default, with = "crate::utilities::optional_utc_datetime_string")]
    pub time: Option<chrono::DateTime<chrono::Utc>>,
}

impl LaunchConfiguration {
    pub fn to_launch(&self) -> Result<crate::prediction::Launch, super::ConfigurationError> {
        if self.location.len() != 3 {
            return Err(super::ConfigurationError::InvalidLaunch {
                message: format!(
                    "location needs longitude, latitude, and altitude; got {:?}",
                    self.location
                ),
            });
        }
        if !(-90.0..=90.0).contains(&self.location[1]) {
            return Err(super::ConfigurationError::InvalidLaunch {
                message: format!("latitude {:} is outside [-90, 90]", self.location[1]),
            });
        }

        Ok(crate::prediction::Launch::new(
            geo::coord! {
                x: crate::geodesy::wrap_longitude(self.location[0]),
                y: self.location[1],
            },
            self.location[2],
            self.time,
        ))
    }
}

/// parse `latitude, longitude, altitude` as typed at a prompt
pub fn parse_location(text: &str) -> Result<(f64, f64, f64), super::ConfigurationError> {
    let values = text
        .split(|character: char| character == ',' || character.is_whitespace())
        .filter(|value| !value.is_empty())
        .map(|value| value.parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|error| super::ConfigurationError::InvalidLaunch {
            message: format!("{:?}; {:}", text, error),
        })?;

    match values[..] {
        [latitude, longitude, altitude] => Ok((latitude, longitude, altitude)),
        _ => Err(super::ConfigurationError::InvalidLaunch {
            message: format!(
                "expected latitude, longitude, and altitude; got {:?}",
                text
            ),
        }),
    }
}

pub fn parse_minutes(text: &str) -> Result<f64, super::ConfigurationError> {
    match text.trim().parse::<f64>() {
        Ok(minutes) if minutes >= 0.0 => Ok(minutes),
        _ => Err(super::ConfigurationError::InvalidLaunch {
            message: format!("{:?} is not a non-negative number of minutes", text),
        }),
    }
}

/// parse a launch time as `%Y-%m-%d %H:%M:%S` (UTC) or RFC 3339; blank means unspecified
pub fn parse_launch_time(
    text: &str,
) -> Result<Option<chrono::DateTime<chrono::Utc>>, super::ConfigurationError> {
    use chrono::TimeZone;

    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    match chrono::NaiveDateTime::parse_from_str(text, &crate::DATETIME_FORMAT) {
        Ok(datetime) => Ok(Some(chrono::Utc.from_utc_datetime(&datetime))),
        Err(_) => chrono::DateTime::parse_from_rfc3339(text)
            .map(|datetime| Some(datetime.with_timezone(&chrono::Utc)))
            .map_err(|error| super::ConfigurationError::InvalidLaunch {
                message: format!("{:?} is not a launch time; {:}", text, error),
            }),
    }
}

fn default_time_to_cutdown() -> chrono::Duration {
    chrono::Duration::zero()
}

#[serde_as]
#[derive(serde::Deserialize, PartialEq, Debug, Clone)]
pub struct ProfileConfiguration {
    #[serde(default = "default_time_to_cutdown")]
    #[serde_as(as = "serde_with::DurationSeconds<i64>")]
    pub time_to_cutdown: chrono::Duration,
    #[serde(default)]
    pub ascent: crate::prediction::AscentRate,
    #[serde(default)]
    pub fall_rate: crate::model::FallRateModel,
}

impl Default for ProfileConfiguration {
    fn default() -> Self {
        Self {
            time_to_cutdown: default_time_to_cutdown(),
            ascent: crate::prediction::AscentRate::default(),
            fall_rate: crate::model::FallRateModel::default(),
        }
    }
}

impl ProfileConfiguration {
    pub fn to_flight_profile(
        &self,
    ) -> Result<crate::prediction::FlightProfile, super::ConfigurationError> {
        if let crate::prediction::AscentRate::ConstantRate { rate } = self.ascent {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(super::ConfigurationError::InvalidLaunch {
                    message: format!("constant ascent rate of {:} m/s is not positive", rate),
                });
            }
        }

        Ok(crate::prediction::FlightProfile::new(
            self.ascent,
            self.time_to_cutdown,
        ))
    }
}
