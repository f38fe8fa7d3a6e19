pub mod prediction;

fn default_name() -> String {
    String::from("unnamed_flight")
}

fn default_interval() -> chrono::Duration {
    *crate::DEFAULT_INTERVAL
}

custom_error::custom_error! {pub ConfigurationError
    ReadFailure { path: String, message: String } = "could not read configuration {path}; {message}",
    ParsingError { message: String } = "could not parse configuration; {message}",
    InvalidLaunch { message: String } = "invalid launch; {message}",
}

#[serde_with::serde_as]
#[derive(serde::Deserialize, Debug, Clone)]
pub struct RunConfiguration {
    #[serde(default = "default_name")]
    pub name: String,
    /// optional when the sounding source fixes the start of descent itself
    pub launch: Option<prediction::LaunchConfiguration>,
    #[serde(default)]
    pub profile: prediction::ProfileConfiguration,
    /// integration time step
    #[serde(default = "default_interval")]
    #[serde_as(as = "serde_with::DurationSeconds<i64>")]
    pub interval: chrono::Duration,
    pub sounding: crate::sounding::SoundingSource,
    pub terrain: TerrainConfiguration,
    pub output: Option<PathConfiguration>,
    pub log: Option<PathConfiguration>,
}

impl RunConfiguration {
    /// build a configuration from command-line values
    pub fn new(
        name: String,
        launch: Option<prediction::LaunchConfiguration>,
        profile: prediction::ProfileConfiguration,
        sounding: crate::sounding::SoundingSource,
        terrain: TerrainConfiguration,
    ) -> Self {
        Self {
            name,
            launch,
            profile,
            interval: default_interval(),
            sounding,
            terrain,
            output: None,
            log: None,
        }
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigurationError> {
        let file = std::fs::File::open(path).map_err(|error| ConfigurationError::ReadFailure {
            path: path.display().to_string(),
            message: error.to_string(),
        })?;
        serde_yaml::from_reader(file).map_err(|error| ConfigurationError::ParsingError {
            message: error.to_string(),
        })
    }
}

#[derive(serde::Deserialize, PartialEq, Debug, Clone)]
pub struct PathConfiguration {
    pub filename: std::path::PathBuf,
}

#[derive(serde::Deserialize, PartialEq, Debug, Clone)]
pub struct TerrainConfiguration {
    pub filename: String,
    #[serde(default)]
    pub lookup: crate::terrain::TerrainLookup,
}

impl TerrainConfiguration {
    pub fn new(filename: String) -> Self {
        Self {
            filename,
            lookup: crate::terrain::TerrainLookup::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn demo(name: &str) -> RunConfiguration {
        let path = format!("{:}/demos/{:}", env!("CARGO_MANIFEST_DIR"), name);
        RunConfiguration::from_file(std::path::Path::new(&path)).unwrap()
    }

    #[test]
    fn test_example_1() {
        let configuration = demo("example_1.yaml");

        assert_eq!(configuration.name, "oswego_forecast");
        assert_eq!(
            configuration.sounding,
            crate::sounding::SoundingSource::Forecast(crate::sounding::forecast::ForecastQuery::default())
        );
        assert_eq!(configuration.interval, chrono::Duration::seconds(10));

        let launch = configuration.launch.unwrap().to_launch().unwrap();
        assert_eq!(launch.coord, geo::coord! { x: -76.5, y: 43.45 });
        assert_eq!(launch.altitude, 90.0);
        assert_eq!(
            launch.time,
            Some(chrono::Utc.with_ymd_and_hms(2023, 12, 27, 17, 0, 0).unwrap())
        );

        assert_eq!(
            configuration.profile.time_to_cutdown,
            chrono::Duration::minutes(50)
        );
        assert_eq!(
            configuration.profile.ascent,
            crate::prediction::AscentRate::ConstantRate { rate: 5.5 }
        );
        assert_eq!(
            configuration.profile.fall_rate,
            crate::model::FallRateModel::default()
        );
        assert_eq!(
            configuration.output.unwrap(),
            PathConfiguration {
                filename: std::path::PathBuf::from("example_1.geojson")
            }
        );
    }

    #[test]
    fn test_example_2() {
        let configuration = demo("example_2.yaml");

        match &configuration.sounding {
            crate::sounding::SoundingSource::Observed(file) => {
                assert_eq!(file.path, "data/soundings/OSW20220901_02Z_DigiCora.txt")
            }
            other => panic!("unexpected sounding source {:?}", other),
        }
        assert_eq!(
            configuration.profile.ascent,
            crate::prediction::AscentRate::ProfileRate
        );
        assert_eq!(
            configuration.profile.fall_rate,
            crate::model::FallRateModel::Parachute(crate::model::ParachuteDrag {
                mass: 1.5,
                area: 0.9,
                drag_coefficient: 1.3,
            })
        );
        assert_eq!(
            configuration.terrain.lookup,
            crate::terrain::TerrainLookup::Bilinear
        );
        assert_eq!(configuration.interval, chrono::Duration::seconds(5));
        assert_eq!(
            configuration.log.unwrap(),
            PathConfiguration {
                filename: std::path::PathBuf::from("example_2.log")
            }
        );
    }

    #[test]
    fn test_example_3() {
        let configuration = demo("example_3.yaml");

        assert!(configuration.launch.is_none());
        assert_eq!(
            configuration.sounding,
            crate::sounding::SoundingSource::Tracker(crate::sounding::tracker::TrackerFile::new(
                String::from("data/tracker/NSSL1313_cutdown1119.kml"),
                String::from("209825"),
            ))
        );
        assert_eq!(
            configuration.profile.time_to_cutdown,
            chrono::Duration::zero()
        );
    }

    #[test]
    fn test_terrain_is_required() {
        let configuration: Result<RunConfiguration, _> =
            serde_yaml::from_str("sounding:\n  source: forecast\n");

        assert!(configuration.is_err());

        let terrain: TerrainConfiguration =
            serde_yaml::from_str("filename: data/terrain/tug_hill.txt").unwrap();
        assert_eq!(
            terrain,
            TerrainConfiguration::new(String::from("data/terrain/tug_hill.txt"))
        );
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            RunConfiguration::from_file(std::path::Path::new("nonexistent.yaml")),
            Err(ConfigurationError::ReadFailure { .. })
        ));
    }
}
