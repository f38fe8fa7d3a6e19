pub mod track;

use crate::model::FallRate;
use crate::sounding::Atmosphere;

/// the descent bound is this multiple of the slowest possible straight fall to the lowest terrain
const DESCENT_BOUND_FACTOR: f64 = 2.0;
/// vertical spacing at which fall rates are sampled to bound the descent
const FALL_RATE_SAMPLE_SPACING: f64 = 100.0;
const MAX_FALL_RATE_SAMPLES: usize = 1000;

/// where and when the simulation starts
#[derive(Clone, Debug, PartialEq)]
pub struct Launch {
    /// x = longitude, y = latitude
    pub coord: geo::Coord,
    /// meters above mean sea level
    pub altitude: f64,
    pub time: Option<chrono::DateTime<chrono::Utc>>,
}

impl Launch {
    pub fn new(
        coord: geo::Coord,
        altitude: f64,
        time: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Self {
        Self {
            coord,
            altitude,
            time,
        }
    }
}

#[derive(serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlightPhase {
    Ascending,
    Descending,
    Landed,
}

impl std::fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlightPhase::Ascending => write!(f, "ascending"),
            FlightPhase::Descending => write!(f, "descending"),
            FlightPhase::Landed => write!(f, "landed"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PayloadState {
    /// seconds since launch
    pub elapsed: f64,
    pub coord: geo::Coord,
    pub altitude: f64,
    pub phase: FlightPhase,
}

/// how fast the balloon climbs before cutdown
#[derive(serde::Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum AscentRate {
    ConstantRate { rate: f64 },
    /// use the ascent rate the sounding itself recorded at each altitude
    ProfileRate,
}

impl Default for AscentRate {
    fn default() -> Self {
        Self::ConstantRate {
            rate: *crate::DEFAULT_ASCENT_RATE,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlightProfile {
    pub ascent_rate: AscentRate,
    /// time from launch to cutdown; zero starts the flight descending
    pub time_to_cutdown: chrono::Duration,
}

impl FlightProfile {
    pub fn new(ascent_rate: AscentRate, time_to_cutdown: chrono::Duration) -> Self {
        Self {
            ascent_rate,
            time_to_cutdown,
        }
    }

    pub fn descent_only() -> Self {
        Self::new(AscentRate::default(), chrono::Duration::zero())
    }
}

custom_error::custom_error! {pub PredictionError
    DataGap { message: String, elapsed: f64, altitude: f64 } = "sounding cannot answer at {elapsed:.0} s, {altitude:.1} m; {message}",
    TerrainOutOfBounds { latitude: f64, longitude: f64, elapsed: f64, altitude: f64 } = "payload left terrain coverage at ({latitude:.4}, {longitude:.4}) at {elapsed:.0} s, {altitude:.1} m",
    SimulationDiverged { message: String, elapsed: f64, altitude: f64 } = "simulation diverged at {elapsed:.0} s, {altitude:.1} m; {message}",
}

#[derive(Clone, Copy, Debug)]
struct DescentBound {
    start: f64,
    limit: f64,
}

/// Step a payload through the atmosphere from `start` until it meets the terrain.
///
/// Each step holds wind and vertical speed constant over `interval`, taking wind at the midpoint
/// altitude of the step. Ascent ends exactly at cutdown; descent ends at the first step whose
/// altitude is at or below the ground, refined back to where the path crossed the surface.
pub struct PredictionQuery<'a, A: Atmosphere + ?Sized> {
    pub start: Launch,
    pub profile: FlightProfile,
    pub interval: chrono::Duration,
    pub atmosphere: &'a A,
    pub terrain: &'a crate::terrain::TerrainSurface,
    pub fall_rate: &'a dyn FallRate,
}

impl<'a, A: Atmosphere + ?Sized> PredictionQuery<'a, A> {
    pub fn new(
        start: Launch,
        profile: FlightProfile,
        atmosphere: &'a A,
        terrain: &'a crate::terrain::TerrainSurface,
        fall_rate: &'a dyn FallRate,
    ) -> Self {
        Self {
            start,
            profile,
            interval: *crate::DEFAULT_INTERVAL,
            atmosphere,
            terrain,
            fall_rate,
        }
    }

    pub fn with_interval(mut self, interval: chrono::Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn predict(&self) -> Result<track::SimulationResult, PredictionError> {
        let interval = crate::utilities::seconds(self.interval);
        let time_to_cutdown = crate::utilities::seconds(self.profile.time_to_cutdown).max(0.0);

        let mut state = PayloadState {
            elapsed: 0.0,
            coord: self.start.coord,
            altitude: self.start.altitude,
            phase: if time_to_cutdown > 0.0 {
                FlightPhase::Ascending
            } else {
                FlightPhase::Descending
            },
        };

        if interval.is_nan() || interval <= 0.0 {
            return Err(diverged(
                &state,
                format!("integration interval of {:} s is not positive", interval),
            ));
        }

        let ceiling = self
            .atmosphere
            .ceiling()
            .map_err(|error| data_gap(&state, error))?;

        let mut states = vec![state.clone()];
        let mut descent_bound: Option<DescentBound> = None;
        let mut ground: Option<f64> = None;

        loop {
            match state.phase {
                FlightPhase::Ascending => {
                    let remaining = time_to_cutdown - state.elapsed;
                    let (step, reached_cutdown) = if remaining <= interval {
                        (remaining, true)
                    } else {
                        (interval, false)
                    };

                    let altitude = state.altitude + self.ascent_rate(&state)? * step;
                    let coord = self.drift(&state, altitude, step)?;
                    if altitude > ceiling {
                        return Err(diverged(
                            &state,
                            format!(
                                "ascent to {:.1} m is above the sounding ceiling of {:.1} m",
                                altitude, ceiling
                            ),
                        ));
                    }

                    state = PayloadState {
                        elapsed: if reached_cutdown {
                            time_to_cutdown
                        } else {
                            state.elapsed + step
                        },
                        coord,
                        altitude,
                        phase: if reached_cutdown {
                            FlightPhase::Descending
                        } else {
                            FlightPhase::Ascending
                        },
                    };
                    if reached_cutdown {
                        log::debug!(
                            "cutdown at {:.0} s, {:.1} m",
                            state.elapsed,
                            state.altitude
                        );
                    }
                    states.push(state.clone());
                }
                FlightPhase::Descending => {
                    let bound = match descent_bound {
                        Some(bound) => bound,
                        None => {
                            let bound = self.descent_bound(&state)?;
                            descent_bound = Some(bound);
                            bound
                        }
                    };
                    let previous_ground = match ground {
                        Some(ground) => ground,
                        None => self.ground(&state, state.coord)?,
                    };

                    let pressure = self
                        .atmosphere
                        .pressure(state.altitude)
                        .map_err(|error| data_gap(&state, error))?;
                    let rate = self.fall_rate.descent_rate(pressure);
                    if !(rate.is_finite() && rate > 0.0) {
                        return Err(diverged(
                            &state,
                            format!("descent rate of {:} m/s at {:.1} hPa", rate, pressure),
                        ));
                    }

                    let next = PayloadState {
                        elapsed: state.elapsed + interval,
                        coord: self.drift(&state, state.altitude - rate * interval, interval)?,
                        altitude: state.altitude - rate * interval,
                        phase: FlightPhase::Descending,
                    };
                    let next_ground = self.ground(&next, next.coord)?;

                    if next.altitude <= next_ground {
                        state = self.touchdown(&state, previous_ground, &next, next_ground)?;
                        states.push(state.clone());
                        break;
                    }

                    if next.elapsed - bound.start > bound.limit {
                        return Err(diverged(
                            &next,
                            format!(
                                "still {:.1} m above ground after {:.0} s of descent",
                                next.altitude - next_ground,
                                next.elapsed - bound.start
                            ),
                        ));
                    }

                    ground = Some(next_ground);
                    state = next;
                    states.push(state.clone());
                }
                FlightPhase::Landed => break,
            }
        }

        let result = track::SimulationResult::new(states, self.start.time);
        log::debug!(
            "simulated {:} steps; landed at ({:.5}, {:.5}) after {:}",
            result.states().len() - 1,
            result.landing().coord.y,
            result.landing().coord.x,
            crate::utilities::duration_string(result.flight_time())
        );
        Ok(result)
    }

    fn ascent_rate(&self, state: &PayloadState) -> Result<f64, PredictionError> {
        let rate = match self.profile.ascent_rate {
            AscentRate::ConstantRate { rate } => rate,
            AscentRate::ProfileRate => self
                .atmosphere
                .ascent_rate(state.altitude)
                .map_err(|error| data_gap(state, error))?,
        };
        Ok(rate.max(0.0))
    }

    /// horizontal position after `step` seconds, moving with the wind at the step's mean altitude
    fn drift(
        &self,
        state: &PayloadState,
        altitude: f64,
        step: f64,
    ) -> Result<geo::Coord, PredictionError> {
        let wind = self
            .atmosphere
            .wind((state.altitude + altitude) / 2.0)
            .map_err(|error| data_gap(state, error))?;
        let (east, north) = wind.components();
        Ok(crate::geodesy::displace(
            state.coord,
            east * step,
            north * step,
        ))
    }

    fn ground(&self, state: &PayloadState, coord: geo::Coord) -> Result<f64, PredictionError> {
        self.terrain
            .elevation(coord)
            .map_err(|_| PredictionError::TerrainOutOfBounds {
                latitude: coord.y,
                longitude: coord.x,
                elapsed: state.elapsed,
                altitude: state.altitude,
            })
    }

    /// Bound the descent by a multiple of the time the slowest fall rate between the start of
    /// descent and the lowest terrain would take to cover that drop.
    fn descent_bound(&self, state: &PayloadState) -> Result<DescentBound, PredictionError> {
        let floor = self.terrain.minimum_elevation().min(state.altitude);
        let drop = state.altitude - floor;
        let samples = ((drop / FALL_RATE_SAMPLE_SPACING).ceil() as usize).min(MAX_FALL_RATE_SAMPLES);

        let mut slowest = f64::INFINITY;
        for sample in 0..=samples {
            let altitude = if samples == 0 {
                state.altitude
            } else {
                floor + drop * sample as f64 / samples as f64
            };
            let pressure = self
                .atmosphere
                .pressure(altitude)
                .map_err(|error| data_gap(state, error))?;
            let rate = self.fall_rate.descent_rate(pressure);
            if rate.is_finite() && rate > 0.0 {
                slowest = slowest.min(rate);
            }
        }

        if !slowest.is_finite() {
            return Err(diverged(
                state,
                "descent rate is never positive below cutdown".to_string(),
            ));
        }

        let interval = crate::utilities::seconds(self.interval);
        Ok(DescentBound {
            start: state.elapsed,
            limit: DESCENT_BOUND_FACTOR * drop / slowest + interval,
        })
    }

    /// Interpolate between the last state above ground and the first at or below it, by
    /// clearance above the local terrain, to place the landing on the surface.
    fn touchdown(
        &self,
        above: &PayloadState,
        above_ground: f64,
        below: &PayloadState,
        below_ground: f64,
    ) -> Result<PayloadState, PredictionError> {
        let clearance = above.altitude - above_ground;
        let penetration = below.altitude - below_ground;
        let fraction = if clearance - penetration > 0.0 {
            (clearance / (clearance - penetration)).clamp(0.0, 1.0)
        } else {
            1.0
        };

        let coord = geo::coord! {
            x: crate::geodesy::wrap_longitude(
                above.coord.x
                    + fraction * crate::geodesy::wrap_longitude(below.coord.x - above.coord.x),
            ),
            y: above.coord.y + fraction * (below.coord.y - above.coord.y),
        };
        let mut landing = PayloadState {
            elapsed: above.elapsed + fraction * (below.elapsed - above.elapsed),
            coord,
            altitude: above.altitude + fraction * (below.altitude - above.altitude),
            phase: FlightPhase::Landed,
        };
        landing.altitude = self.ground(&landing, coord)?.min(above.altitude);

        Ok(landing)
    }
}

fn data_gap(state: &PayloadState, error: crate::sounding::SoundingError) -> PredictionError {
    PredictionError::DataGap {
        message: error.to_string(),
        elapsed: state.elapsed,
        altitude: state.altitude,
    }
}

fn diverged(state: &PayloadState, message: String) -> PredictionError {
    PredictionError::SimulationDiverged {
        message,
        elapsed: state.elapsed,
        altitude: state.altitude,
    }
}
