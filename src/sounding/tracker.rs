lazy_static::lazy_static! {
    static ref PLACEMARK: regex::Regex =
        regex::Regex::new(r"(?s)<Placemark[^>]*>(?P<body>.*?)</Placemark>").unwrap();
    static ref NAME: regex::Regex = regex::Regex::new(r"(?s)<name>\s*(?P<name>.*?)\s*</name>").unwrap();
    static ref WHEN: regex::Regex = regex::Regex::new(r"(?s)<when>\s*(?P<when>.*?)\s*</when>").unwrap();
    static ref COORD: regex::Regex =
        regex::Regex::new(r"(?s)<gx:coord>\s*(?P<coord>.*?)\s*</gx:coord>").unwrap();
    static ref PRESSURE_ARRAY: regex::Regex = regex::Regex::new(
        r#"(?s)<gx:SimpleArrayData[^>]*name="pressure"[^>]*>(?P<values>.*?)</gx:SimpleArrayData>"#
    )
    .unwrap();
    static ref VALUE: regex::Regex =
        regex::Regex::new(r"(?s)<gx:value>\s*(?P<value>.*?)\s*</gx:value>").unwrap();
}

fn default_live_url() -> String {
    String::from("http://kennedy.tw:8001/path/NSSL1313")
}

/// KML export of a flight tracker, or `current` for the live feed
#[derive(serde::Deserialize, Debug, PartialEq, Clone)]
pub struct TrackerFile {
    pub path: String,
    pub tracker: String,
    #[serde(default = "default_live_url")]
    pub live_url: String,
}

/// one telemetry fix of the tracker
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerFix {
    pub time: chrono::DateTime<chrono::Utc>,
    pub coord: geo::Coord,
    pub altitude: f64,
    pub pressure: f64,
}

impl TrackerFile {
    pub fn new(path: String, tracker: String) -> Self {
        Self {
            path,
            tracker,
            live_url: default_live_url(),
        }
    }

    pub fn read_fixes(&self) -> Result<Vec<TrackerFix>, super::SoundingError> {
        let location = if self.path == "current" {
            &self.live_url
        } else {
            &self.path
        };
        let text = crate::utilities::read_lines(location)?.join("\n");
        let fixes = parse_tracker_kml(&text, &self.tracker)?;
        log::debug!(
            "read {:} fixes of tracker {:} from {:}",
            fixes.len(),
            self.tracker,
            location
        );
        Ok(fixes)
    }
}

fn parsing_error(message: String) -> super::SoundingError {
    super::SoundingError::ParsingError { message }
}

/// Extract the `gx:Track` of the placemark named `tracker`, paired with its pressure array.
pub fn parse_tracker_kml(
    text: &str,
    tracker: &str,
) -> Result<Vec<TrackerFix>, super::SoundingError> {
    for placemark in PLACEMARK.captures_iter(text) {
        let body = &placemark["body"];
        match NAME.captures(body) {
            Some(name) if &name["name"] == tracker => {}
            _ => continue,
        }

        let mut times = vec![];
        for when in WHEN.captures_iter(body) {
            times.push(
                chrono::DateTime::parse_from_rfc3339(&when["when"])
                    .map_err(|error| parsing_error(format!("{:?}: {:}", &when["when"], error)))?
                    .with_timezone(&chrono::Utc),
            );
        }

        let mut positions = vec![];
        for coord in COORD.captures_iter(body) {
            let values: Vec<f64> = coord["coord"]
                .split_whitespace()
                .map(|value| value.parse::<f64>())
                .collect::<Result<_, _>>()
                .map_err(|error| parsing_error(format!("{:?}: {:}", &coord["coord"], error)))?;
            if values.len() < 3 {
                return Err(parsing_error(format!(
                    "coordinate {:?} has no altitude",
                    &coord["coord"]
                )));
            }
            positions.push((geo::coord! { x: values[0], y: values[1] }, values[2]));
        }

        let pressures_block = PRESSURE_ARRAY.captures(body).ok_or_else(|| {
            parsing_error(format!("tracker {:} has no pressure array", tracker))
        })?;
        let mut pressures = vec![];
        for value in VALUE.captures_iter(&pressures_block["values"]) {
            let first = value["value"].split_whitespace().next().unwrap_or_default();
            pressures.push(
                first
                    .parse::<f64>()
                    .map_err(|error| parsing_error(format!("{:?}: {:}", first, error)))?,
            );
        }

        let length = times.len().min(positions.len()).min(pressures.len());
        if length < times.len().max(positions.len()).max(pressures.len()) {
            log::warn!(
                "tracker {:} has {:} times, {:} positions, and {:} pressures; using the first {:}",
                tracker,
                times.len(),
                positions.len(),
                pressures.len(),
                length
            );
        }

        let mut fixes: Vec<TrackerFix> = (0..length)
            .map(|index| TrackerFix {
                time: times[index],
                coord: positions[index].0,
                altitude: positions[index].1,
                pressure: pressures[index],
            })
            .collect();
        fixes.sort_by_key(|fix| fix.time);

        return Ok(fixes);
    }

    Err(super::SoundingError::NoSuchTracker {
        name: tracker.to_owned(),
    })
}

/// Estimate a wind profile from the drift between consecutive fixes of the ascent.
pub fn estimate_sounding(
    fixes: &[TrackerFix],
) -> Result<super::SoundingProfile, super::SoundingError> {
    let top = fixes
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.altitude.total_cmp(&b.altitude))
        .map(|(index, _)| index)
        .ok_or_else(|| super::SoundingError::DataGap {
            message: "tracker has no fixes".to_string(),
        })?;

    let mut points = vec![];
    for pair in fixes[..=top].windows(2) {
        let elapsed = (pair[1].time - pair[0].time).num_milliseconds() as f64 / 1000.0;
        if elapsed <= 0.0 {
            continue;
        }

        let (east, north) = crate::geodesy::offset(pair[0].coord, pair[1].coord);
        let (east_speed, north_speed) = (east / elapsed, north / elapsed);

        points.push(super::SoundingPoint::new(
            (pair[0].altitude + pair[1].altitude) / 2.0,
            (pair[0].pressure + pair[1].pressure) / 2.0,
            east_speed.hypot(north_speed),
            // the wind blows from the opposite direction of travel
            (-east_speed).atan2(-north_speed).to_degrees(),
        ));
    }

    Ok(super::SoundingProfile::monotonic(points))
}

/// the last known fix, where a descent-only prediction starts
pub fn descent_start(fixes: &[TrackerFix]) -> Option<crate::prediction::Launch> {
    fixes
        .last()
        .map(|fix| crate::prediction::Launch::new(fix.coord, fix.altitude, Some(fix.time)))
}
