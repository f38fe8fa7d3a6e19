pub mod forecast;
pub mod observed;
pub mod tracker;

/// one level of a vertical atmospheric profile
#[derive(Clone, Debug, PartialEq)]
pub struct SoundingPoint {
    /// meters above mean sea level
    pub altitude: f64,
    /// hPa
    pub pressure: f64,
    /// m/s
    pub wind_speed: f64,
    /// direction the wind blows from, in degrees clockwise from north
    pub wind_bearing: f64,
    /// m/s, only present when the source records balloon ascent (e.g. a radiosonde flight)
    pub ascent_rate: Option<f64>,
}

impl SoundingPoint {
    pub fn new(altitude: f64, pressure: f64, wind_speed: f64, wind_bearing: f64) -> Self {
        Self {
            altitude,
            pressure,
            wind_speed,
            wind_bearing: wind_bearing.rem_euclid(360.0),
            ascent_rate: None,
        }
    }

    pub fn with_ascent_rate(mut self, ascent_rate: f64) -> Self {
        self.ascent_rate = Some(ascent_rate);
        self
    }

    pub fn wind(&self) -> Wind {
        Wind {
            speed: self.wind_speed,
            bearing: self.wind_bearing,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wind {
    /// m/s
    pub speed: f64,
    /// direction the wind blows from, in degrees clockwise from north
    pub bearing: f64,
}

impl Wind {
    /// east (u) and north (v) components of the air motion, in m/s
    pub fn components(&self) -> (f64, f64) {
        let bearing = self.bearing.to_radians();
        (-self.speed * bearing.sin(), -self.speed * bearing.cos())
    }
}

custom_error::custom_error! {pub SoundingError
    DataGap { message: String } = "insufficient sounding data; {message}",
    NotMonotonic { index: usize } = "sounding level {index} does not increase in altitude and decrease in pressure",
    NoAscentRate { altitude: f64 } = "sounding has no ascent rate at {altitude:.1} m",
    RetrievalError { location: String, message: String } = "could not retrieve sounding from {location}; {message}",
    ParsingError { message: String } = "could not parse sounding; {message}",
    NoSuchTracker { name: String } = "tracker {name:?} not found",
    MissingLaunch { message: String } = "{message}",
}

impl From<crate::utilities::ReadError> for SoundingError {
    fn from(error: crate::utilities::ReadError) -> Self {
        SoundingError::RetrievalError {
            location: match &error {
                crate::utilities::ReadError::FailedToEstablish { location, .. }
                | crate::utilities::ReadError::ReadFailure { location, .. } => location.to_owned(),
            },
            message: error.to_string(),
        }
    }
}

impl From<crate::parse::ParseError> for SoundingError {
    fn from(error: crate::parse::ParseError) -> Self {
        SoundingError::ParsingError {
            message: error.to_string(),
        }
    }
}

/// Anything the trajectory integrator can query for wind and pressure by altitude.
pub trait Atmosphere {
    fn wind(&self, altitude: f64) -> Result<Wind, SoundingError>;
    fn pressure(&self, altitude: f64) -> Result<f64, SoundingError>;
    fn ascent_rate(&self, altitude: f64) -> Result<f64, SoundingError>;
    /// highest altitude the atmosphere describes
    fn ceiling(&self) -> Result<f64, SoundingError>;
}

/// Sounding levels ordered by strictly increasing altitude (and so strictly decreasing pressure).
#[derive(Clone, Debug, PartialEq)]
pub struct SoundingProfile {
    points: Vec<SoundingPoint>,
}

enum Bracket<'a> {
    Exact(&'a SoundingPoint),
    Between(&'a SoundingPoint, &'a SoundingPoint, f64),
}

impl SoundingProfile {
    pub fn new(points: Vec<SoundingPoint>) -> Result<Self, SoundingError> {
        for (index, pair) in points.windows(2).enumerate() {
            if !(pair[1].altitude > pair[0].altitude && pair[1].pressure < pair[0].pressure) {
                return Err(SoundingError::NotMonotonic { index: index + 1 });
            }
        }
        Ok(Self { points })
    }

    /// Build a profile from unordered source rows, dropping rows that would break
    /// strictly increasing altitude or strictly decreasing pressure.
    pub fn monotonic(mut points: Vec<SoundingPoint>) -> Self {
        let total = points.len();
        points.retain(|point| point.altitude.is_finite() && point.pressure.is_finite());
        points.sort_by(|a, b| a.altitude.total_cmp(&b.altitude));

        let mut kept: Vec<SoundingPoint> = Vec::with_capacity(points.len());
        for point in points {
            if let Some(last) = kept.last() {
                if point.altitude <= last.altitude || point.pressure >= last.pressure {
                    continue;
                }
            }
            kept.push(point);
        }

        if kept.len() < total {
            log::warn!(
                "dropped {:} of {:} sounding levels that were missing or not monotonic",
                total - kept.len(),
                total
            );
        }

        Self { points: kept }
    }

    pub fn points(&self) -> &[SoundingPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_ascent_rates(&self) -> bool {
        !self.points.is_empty() && self.points.iter().all(|point| point.ascent_rate.is_some())
    }

    fn bracket(&self, altitude: f64) -> Result<Bracket, SoundingError> {
        if self.points.len() < 2 {
            return Err(SoundingError::DataGap {
                message: format!(
                    "at least 2 levels are needed to interpolate, but the profile has {:}",
                    self.points.len()
                ),
            });
        }
        if !altitude.is_finite() {
            return Err(SoundingError::DataGap {
                message: format!("cannot interpolate at altitude {:}", altitude),
            });
        }

        let first = &self.points[0];
        let last = &self.points[self.points.len() - 1];
        if altitude <= first.altitude {
            return Ok(Bracket::Exact(first));
        }
        if altitude >= last.altitude {
            return Ok(Bracket::Exact(last));
        }

        // first.altitude < altitude < last.altitude, so 1 <= index <= len - 1
        let index = self
            .points
            .partition_point(|point| point.altitude <= altitude);
        let lower = &self.points[index - 1];
        if lower.altitude == altitude {
            return Ok(Bracket::Exact(lower));
        }
        let upper = &self.points[index];

        Ok(Bracket::Between(
            lower,
            upper,
            (altitude - lower.altitude) / (upper.altitude - lower.altitude),
        ))
    }
}

fn interpolate(a: f64, b: f64, fraction: f64) -> f64 {
    a + fraction * (b - a)
}

/// interpolate between two bearings along the shorter arc
pub fn interpolate_bearing(a: f64, b: f64, fraction: f64) -> f64 {
    let difference = (b - a + 540.0).rem_euclid(360.0) - 180.0;
    (a + fraction * difference).rem_euclid(360.0)
}

impl Atmosphere for SoundingProfile {
    fn wind(&self, altitude: f64) -> Result<Wind, SoundingError> {
        Ok(match self.bracket(altitude)? {
            Bracket::Exact(point) => point.wind(),
            Bracket::Between(lower, upper, fraction) => Wind {
                speed: interpolate(lower.wind_speed, upper.wind_speed, fraction),
                bearing: interpolate_bearing(lower.wind_bearing, upper.wind_bearing, fraction),
            },
        })
    }

    fn pressure(&self, altitude: f64) -> Result<f64, SoundingError> {
        Ok(match self.bracket(altitude)? {
            Bracket::Exact(point) => point.pressure,
            Bracket::Between(lower, upper, fraction) => {
                interpolate(lower.pressure, upper.pressure, fraction)
            }
        })
    }

    fn ascent_rate(&self, altitude: f64) -> Result<f64, SoundingError> {
        let rate = match self.bracket(altitude)? {
            Bracket::Exact(point) => point.ascent_rate,
            Bracket::Between(lower, upper, fraction) => match (lower.ascent_rate, upper.ascent_rate)
            {
                (Some(lower_rate), Some(upper_rate)) => {
                    Some(interpolate(lower_rate, upper_rate, fraction))
                }
                _ => None,
            },
        };
        rate.ok_or(SoundingError::NoAscentRate { altitude })
    }

    fn ceiling(&self) -> Result<f64, SoundingError> {
        match self.points.last() {
            Some(point) => Ok(point.altitude),
            None => Err(SoundingError::DataGap {
                message: "the profile has no levels".to_string(),
            }),
        }
    }
}

/// a loaded profile, plus where descent starts when the source itself fixes it
pub struct Sounding {
    pub profile: SoundingProfile,
    pub descent_start: Option<crate::prediction::Launch>,
}

#[derive(serde::Deserialize, Debug, PartialEq, Clone)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SoundingSource {
    Forecast(forecast::ForecastQuery),
    Observed(observed::ObservedSoundingFile),
    Tracker(tracker::TrackerFile),
}

impl SoundingSource {
    pub fn load_sounding(
        &self,
        launch: Option<&crate::prediction::Launch>,
    ) -> Result<Sounding, SoundingError> {
        let sounding = match self {
            Self::Forecast(query) => {
                let launch = launch.ok_or(SoundingError::MissingLaunch {
                    message: "a forecast sounding needs a launch location".to_string(),
                })?;
                Sounding {
                    profile: query.retrieve_sounding(launch)?,
                    descent_start: None,
                }
            }
            Self::Observed(file) => Sounding {
                profile: file.read_sounding()?,
                descent_start: None,
            },
            Self::Tracker(file) => {
                let fixes = file.read_fixes()?;
                Sounding {
                    profile: tracker::estimate_sounding(&fixes)?,
                    descent_start: tracker::descent_start(&fixes),
                }
            }
        };

        log::debug!(
            "loaded {:} sounding levels from {:}",
            sounding.profile.len(),
            self.description()
        );

        Ok(sounding)
    }

    pub fn description(&self) -> String {
        match self {
            Self::Forecast(query) => format!("forecast ({:})", query.data_source),
            Self::Observed(file) => format!("observed sounding {:}", file.path),
            Self::Tracker(file) => format!("tracker {:} ({:})", file.tracker, file.path),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::utilities::approx_equal;

    pub(crate) fn standard_pressure(altitude: f64) -> f64 {
        1013.25 * (-altitude / 7000.0).exp()
    }

    pub(crate) fn uniform_profile(
        top: f64,
        spacing: f64,
        wind_speed: f64,
        wind_bearing: f64,
    ) -> SoundingProfile {
        let mut points = vec![];
        let mut altitude = 0.0;
        while altitude <= top {
            points.push(SoundingPoint::new(
                altitude,
                standard_pressure(altitude),
                wind_speed,
                wind_bearing,
            ));
            altitude += spacing;
        }
        SoundingProfile::new(points).unwrap()
    }

    fn sheared_profile() -> SoundingProfile {
        SoundingProfile::new(vec![
            SoundingPoint::new(100.0, 1000.0, 2.0, 350.0),
            SoundingPoint::new(1100.0, 890.0, 6.0, 10.0),
            SoundingPoint::new(5100.0, 540.0, 20.0, 90.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_clamps_outside_range() {
        let profile = sheared_profile();

        assert_eq!(profile.wind(-50.0).unwrap(), profile.points()[0].wind());
        assert_eq!(profile.wind(30000.0).unwrap(), profile.points()[2].wind());
        assert_eq!(profile.pressure(-50.0).unwrap(), 1000.0);
        assert_eq!(profile.pressure(30000.0).unwrap(), 540.0);
    }

    #[test]
    fn test_exact_levels() {
        let profile = sheared_profile();

        for point in profile.points() {
            assert_eq!(profile.wind(point.altitude).unwrap(), point.wind());
            assert_eq!(profile.pressure(point.altitude).unwrap(), point.pressure);
        }
    }

    #[test]
    fn test_linear_interpolation() {
        let profile = sheared_profile();

        let wind = profile.wind(3100.0).unwrap();
        assert!(approx_equal(wind.speed, 13.0, 9));
        assert!(approx_equal(wind.bearing, 50.0, 9));
        assert!(approx_equal(profile.pressure(3100.0).unwrap(), 715.0, 9));
    }

    #[test]
    fn test_bearing_wraparound() {
        let profile = sheared_profile();

        let wind = profile.wind(600.0).unwrap();
        assert!(wind.bearing < 1e-9 || wind.bearing > 360.0 - 1e-9);

        assert!(approx_equal(interpolate_bearing(350.0, 10.0, 0.25), 355.0, 9));
        assert!(approx_equal(interpolate_bearing(10.0, 350.0, 0.25), 5.0, 9));
        assert!(approx_equal(interpolate_bearing(90.0, 180.0, 0.5), 135.0, 9));
    }

    #[test]
    fn test_single_level_is_data_gap() {
        let profile =
            SoundingProfile::new(vec![SoundingPoint::new(100.0, 1000.0, 5.0, 270.0)]).unwrap();

        assert!(matches!(
            profile.wind(100.0),
            Err(SoundingError::DataGap { .. })
        ));
        assert!(matches!(
            profile.pressure(100.0),
            Err(SoundingError::DataGap { .. })
        ));
    }

    #[test]
    fn test_rejects_unordered_levels() {
        let points = vec![
            SoundingPoint::new(100.0, 1000.0, 5.0, 270.0),
            SoundingPoint::new(90.0, 990.0, 5.0, 270.0),
        ];

        assert!(matches!(
            SoundingProfile::new(points.to_owned()),
            Err(SoundingError::NotMonotonic { index: 1 })
        ));

        let profile = SoundingProfile::monotonic(points);
        assert_eq!(profile.len(), 1);
        assert_eq!(profile.points()[0].altitude, 90.0);
    }

    #[test]
    fn test_monotonic_drops_pressure_inversions() {
        let profile = SoundingProfile::monotonic(vec![
            SoundingPoint::new(300.0, 970.0, 5.0, 270.0),
            SoundingPoint::new(100.0, 1000.0, 5.0, 270.0),
            SoundingPoint::new(200.0, 1001.0, 5.0, 270.0),
            SoundingPoint::new(300.0, 969.0, 5.0, 270.0),
            SoundingPoint::new(f64::NAN, 900.0, 5.0, 270.0),
        ]);

        let altitudes: Vec<f64> = profile.points().iter().map(|point| point.altitude).collect();
        assert_eq!(altitudes, vec![100.0, 300.0]);
    }

    #[test]
    fn test_ascent_rate() {
        let profile = SoundingProfile::new(vec![
            SoundingPoint::new(0.0, 1000.0, 5.0, 270.0).with_ascent_rate(4.0),
            SoundingPoint::new(1000.0, 890.0, 5.0, 270.0).with_ascent_rate(6.0),
        ])
        .unwrap();
        assert!(profile.has_ascent_rates());
        assert!(approx_equal(profile.ascent_rate(250.0).unwrap(), 4.5, 9));

        let profile = sheared_profile();
        assert!(!profile.has_ascent_rates());
        assert!(matches!(
            profile.ascent_rate(250.0),
            Err(SoundingError::NoAscentRate { .. })
        ));
    }

    #[test]
    fn test_wind_components() {
        let (east, north) = Wind {
            speed: 10.0,
            bearing: 270.0,
        }
        .components();
        assert!(approx_equal(east, 10.0, 9));
        assert!(approx_equal(north, 0.0, 9));

        let (east, north) = Wind {
            speed: 10.0,
            bearing: 0.0,
        }
        .components();
        assert!(approx_equal(east, 0.0, 9));
        assert!(approx_equal(north, -10.0, 9));
    }

    #[test]
    fn test_ceiling() {
        assert_eq!(sheared_profile().ceiling().unwrap(), 5100.0);
        assert!(SoundingProfile::new(vec![]).unwrap().ceiling().is_err());
    }
}
