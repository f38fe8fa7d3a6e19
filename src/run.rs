custom_error::custom_error! {pub RunError
    Configuration { message: String } = "{message}",
    Sounding { message: String } = "{message}",
    Terrain { message: String } = "{message}",
    Prediction { message: String } = "{message}",
    Output { path: String, message: String } = "could not write {path}; {message}",
}

impl From<crate::configuration::ConfigurationError> for RunError {
    fn from(error: crate::configuration::ConfigurationError) -> Self {
        RunError::Configuration {
            message: error.to_string(),
        }
    }
}

impl From<crate::sounding::SoundingError> for RunError {
    fn from(error: crate::sounding::SoundingError) -> Self {
        RunError::Sounding {
            message: error.to_string(),
        }
    }
}

impl From<crate::terrain::TerrainError> for RunError {
    fn from(error: crate::terrain::TerrainError) -> Self {
        RunError::Terrain {
            message: error.to_string(),
        }
    }
}

impl From<crate::prediction::PredictionError> for RunError {
    fn from(error: crate::prediction::PredictionError) -> Self {
        RunError::Prediction {
            message: error.to_string(),
        }
    }
}

/// Load the sounding and terrain a configuration names, simulate the flight, and write any
/// requested output.
pub fn run(
    configuration: &crate::configuration::RunConfiguration,
) -> Result<crate::prediction::track::SimulationResult, RunError> {
    let launch = match &configuration.launch {
        Some(launch) => Some(launch.to_launch()?),
        None => None,
    };

    let mut profile = configuration.profile.to_flight_profile()?;

    let sounding = configuration.sounding.load_sounding(launch.as_ref())?;

    let start = match sounding.descent_start {
        Some(descent_start) => {
            if launch.is_some() {
                log::warn!(
                    "{:} fixes the start of descent; ignoring the configured launch",
                    configuration.sounding.description()
                );
            }
            profile.time_to_cutdown = chrono::Duration::zero();
            descent_start
        }
        None => launch.ok_or(crate::configuration::ConfigurationError::InvalidLaunch {
            message: format!(
                "{:} needs a launch location",
                configuration.sounding.description()
            ),
        })?,
    };

    let terrain =
        crate::terrain::TerrainSurface::read(&configuration.terrain.filename, configuration.terrain.lookup)?;

    log::info!(
        "{:} - starting at ({:.5}, {:.5}) {:.1} m{:}, cutdown after {:}",
        configuration.name,
        start.coord.y,
        start.coord.x,
        start.altitude,
        match start.time {
            Some(time) => format!(" at {:}", time.format(&crate::DATETIME_FORMAT)),
            None => String::new(),
        },
        crate::utilities::duration_string(profile.time_to_cutdown)
    );

    let result = crate::prediction::PredictionQuery::new(
        start,
        profile,
        &sounding.profile,
        &terrain,
        &configuration.profile.fall_rate,
    )
    .with_interval(configuration.interval)
    .predict()?;

    log::info!("{:}", landing_update(&configuration.name, &result));

    if let Some(output) = &configuration.output {
        write_geojson(&result, &configuration.name, &output.filename)?;
        log::info!("wrote track to {:}", output.filename.display());
    }

    Ok(result)
}

pub fn write_geojson(
    result: &crate::prediction::track::SimulationResult,
    name: &str,
    path: &std::path::Path,
) -> Result<(), RunError> {
    let geojson = geojson::GeoJson::from(result.to_geojson(name));
    std::fs::write(path, geojson.to_string()).map_err(|error| RunError::Output {
        path: path.display().to_string(),
        message: error.to_string(),
    })
}

/// human-readable summary of where and when the payload lands
pub fn landing_update(name: &str, result: &crate::prediction::track::SimulationResult) -> String {
    let landing = result.landing();
    let (bearing, distance) =
        crate::geodesy::bearing_distance(result.launch().coord, landing.coord);

    let mut message = format!(
        "{:} - landing at ({:.5}, {:.5}) {:.1} m after {:}",
        name,
        landing.coord.y,
        landing.coord.x,
        landing.altitude,
        crate::utilities::duration_string(result.flight_time()),
    );

    if let Some(time) = result.time_of(landing) {
        message += &format!(" ({:})", time.format(&crate::DATETIME_FORMAT));
    }

    message += &format!(
        "; {:.2} km at {:.0} deg from launch, max altitude {:.1} m",
        distance / 1000.0,
        bearing,
        result.max_altitude()
    );

    message
}
