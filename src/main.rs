use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cutdown::configuration::prediction::{LaunchConfiguration, ProfileConfiguration};
use cutdown::configuration::{PathConfiguration, RunConfiguration, TerrainConfiguration};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// logging verbosity (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<log::Level>,

    /// also write log messages to this file
    #[arg(long, global = true)]
    log_file: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// run a prediction described by a YAML configuration file
    Run {
        configuration_filename: std::path::PathBuf,
    },
    /// predict with a RAP model sounding for the launch time
    Forecast {
        #[command(flatten)]
        launch: LaunchArguments,
        /// launch time (`%Y-%m-%d %H:%M:%S` or RFC 3339, UTC); prompted for when missing
        #[arg(long)]
        time: Option<String>,
    },
    /// predict with an observed DigiCora sounding (local path or URL)
    Sounding {
        path: String,
        #[command(flatten)]
        launch: LaunchArguments,
    },
    /// predict the descent from the last fix of a tracker KML (`current` for the live feed)
    Tracker {
        path: String,
        tracker: String,
        #[command(flatten)]
        output: OutputArguments,
    },
}

#[derive(Args)]
struct LaunchArguments {
    #[arg(allow_negative_numbers = true)]
    latitude: Option<f64>,
    #[arg(allow_negative_numbers = true)]
    longitude: Option<f64>,
    /// meters above mean sea level
    #[arg(allow_negative_numbers = true)]
    altitude: Option<f64>,
    /// minutes from launch to cutdown
    #[arg(long)]
    cutdown: Option<f64>,
    /// constant ascent rate in m/s
    #[arg(long)]
    ascent_rate: Option<f64>,
    #[command(flatten)]
    output: OutputArguments,
}

#[derive(Args)]
struct OutputArguments {
    /// terrain grid of `longitude latitude elevation` rows
    #[arg(long)]
    terrain: String,
    /// write the predicted track to this GeoJSON file
    #[arg(long)]
    output: Option<std::path::PathBuf>,
}

fn prompt(message: &str) -> Result<String, std::io::Error> {
    print!("{:}", message);
    std::io::Write::flush(&mut std::io::stdout())?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

impl LaunchArguments {
    fn to_launch_configuration(
        &self,
        time: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<LaunchConfiguration, Box<dyn std::error::Error>> {
        let (latitude, longitude, altitude) = match (self.latitude, self.longitude, self.altitude)
        {
            (Some(latitude), Some(longitude), Some(altitude)) => (latitude, longitude, altitude),
            _ => cutdown::configuration::prediction::parse_location(&prompt(
                "Enter starting location (lat, lon, alt): ",
            )?)?,
        };

        Ok(LaunchConfiguration {
            location: vec![longitude, latitude, altitude],
            time,
        })
    }

    fn to_profile_configuration(&self) -> Result<ProfileConfiguration, Box<dyn std::error::Error>> {
        let minutes = match self.cutdown {
            Some(minutes) => minutes,
            None => cutdown::configuration::prediction::parse_minutes(&prompt(
                "Enter expected time from launch to cutdown (minutes): ",
            )?)?,
        };

        let mut profile = ProfileConfiguration {
            time_to_cutdown: chrono::Duration::milliseconds((minutes * 60_000.0).round() as i64),
            ..ProfileConfiguration::default()
        };
        if let Some(rate) = self.ascent_rate {
            profile.ascent = cutdown::prediction::AscentRate::ConstantRate { rate };
        }
        Ok(profile)
    }
}

impl OutputArguments {
    fn terrain(&self) -> TerrainConfiguration {
        TerrainConfiguration::new(self.terrain.to_owned())
    }

    fn apply(&self, configuration: &mut RunConfiguration) {
        if let Some(output) = &self.output {
            configuration.output = Some(PathConfiguration {
                filename: output.to_owned(),
            });
        }
    }
}

fn launch_time(
    time: &Option<String>,
) -> Result<chrono::DateTime<chrono::Utc>, Box<dyn std::error::Error>> {
    let text = match time {
        Some(time) => time.to_owned(),
        None => prompt("Enter launch time (YYYY-MM-DD HH:MM:SS UTC, blank for now): ")?,
    };

    let time = match cutdown::configuration::prediction::parse_launch_time(&text)? {
        Some(time) => time,
        None => {
            let now = chrono::Utc::now();
            println!(
                "using the current time {:}",
                now.format(&cutdown::DATETIME_FORMAT)
            );
            now
        }
    };

    Ok(time)
}

fn build_configuration(command: &Command) -> Result<RunConfiguration, Box<dyn std::error::Error>> {
    let configuration = match command {
        Command::Run {
            configuration_filename,
        } => RunConfiguration::from_file(configuration_filename)?,
        Command::Forecast { launch, time } => {
            let time = launch_time(time)?;
            let mut configuration = RunConfiguration::new(
                String::from("forecast"),
                Some(launch.to_launch_configuration(Some(time))?),
                launch.to_profile_configuration()?,
                cutdown::sounding::SoundingSource::Forecast(
                    cutdown::sounding::forecast::ForecastQuery::new(Some(time)),
                ),
                launch.output.terrain(),
            );
            launch.output.apply(&mut configuration);
            configuration
        }
        Command::Sounding { path, launch } => {
            let mut configuration = RunConfiguration::new(
                String::from("sounding"),
                Some(launch.to_launch_configuration(None)?),
                launch.to_profile_configuration()?,
                cutdown::sounding::SoundingSource::Observed(
                    cutdown::sounding::observed::ObservedSoundingFile::new(path.to_owned())?,
                ),
                launch.output.terrain(),
            );
            launch.output.apply(&mut configuration);
            configuration
        }
        Command::Tracker {
            path,
            tracker,
            output,
        } => {
            let mut configuration = RunConfiguration::new(
                format!("tracker {:}", tracker),
                None,
                ProfileConfiguration::default(),
                cutdown::sounding::SoundingSource::Tracker(
                    cutdown::sounding::tracker::TrackerFile::new(
                        path.to_owned(),
                        tracker.to_owned(),
                    ),
                ),
                output.terrain(),
            );
            output.apply(&mut configuration);
            configuration
        }
    };

    Ok(configuration)
}

fn initialize_logging(
    level: log::Level,
    log_file: Option<&std::path::Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_str().to_lowercase()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .try_init()?;

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let arguments = Cli::parse();

    let configuration = build_configuration(&arguments.command)?;

    let log_file = arguments
        .log_file
        .or_else(|| configuration.log.as_ref().map(|log| log.filename.to_owned()));
    initialize_logging(
        arguments.log_level.unwrap_or(*cutdown::LOG_LEVEL),
        log_file.as_deref(),
    )?;

    let result = cutdown::run::run(&configuration)?;
    println!(
        "{:}",
        cutdown::run::landing_update(&configuration.name, &result)
    );

    Ok(())
}
