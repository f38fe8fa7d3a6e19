const MISSING: [&str; 2] = ["/////", "EOF"];
const COLUMNS: usize = 8;

/// rows on either side of a level used to estimate the balloon's ascent rate there
const ASCENT_RATE_HALF_WINDOW: usize = 5;

/// An observed radiosonde sounding in DigiCora text format: one header line, then rows of
/// `Time alt Pres temp rh dew Wdir Wspd` (s, m MSL, hPa, °C, %, °C, deg, m/s).
#[derive(serde::Deserialize, Debug, PartialEq, Clone)]
pub struct ObservedSoundingFile {
    pub path: String,
}

impl ObservedSoundingFile {
    pub fn new(path: String) -> Result<Self, super::SoundingError> {
        if std::path::Path::new(&path).exists() || url::Url::parse(&path).is_ok() {
            Ok(Self { path })
        } else {
            Err(super::SoundingError::RetrievalError {
                location: path,
                message: "path does not exist".to_string(),
            })
        }
    }

    pub fn read_sounding(&self) -> Result<super::SoundingProfile, super::SoundingError> {
        let lines = crate::utilities::read_lines(&self.path)?;
        parse_digicora(&lines)
    }
}

struct Row {
    time: Option<f64>,
    altitude: f64,
    pressure: f64,
    wind_direction: f64,
    wind_speed: f64,
}

pub fn parse_digicora(lines: &[String]) -> Result<super::SoundingProfile, super::SoundingError> {
    let mut rows: Vec<Row> = vec![];

    for (index, line) in lines.iter().enumerate().skip(1) {
        let values = crate::parse::parse_columns(line, index + 1, &MISSING)?;
        if values.iter().all(|value| value.is_none()) {
            continue;
        }
        if values.len() != COLUMNS {
            return Err(crate::parse::ParseError::WrongColumnCount {
                expected: COLUMNS,
                found: values.len(),
                line: index + 1,
            }
            .into());
        }

        if let (Some(altitude), Some(pressure), Some(wind_direction), Some(wind_speed)) =
            (values[1], values[2], values[6], values[7])
        {
            rows.push(Row {
                time: values[0],
                altitude,
                pressure,
                wind_direction,
                wind_speed,
            });
        }
    }

    // keep the ascent only; anything after burst is the sonde falling back through the profile
    if let Some(top) = rows
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.altitude.total_cmp(&b.altitude))
        .map(|(index, _)| index)
    {
        rows.truncate(top + 1);
    }

    if rows.is_empty() {
        return Err(super::SoundingError::ParsingError {
            message: "no complete sounding rows".to_string(),
        });
    }

    let mut points = vec![];
    for (index, row) in rows.iter().enumerate() {
        let mut point =
            super::SoundingPoint::new(row.altitude, row.pressure, row.wind_speed, row.wind_direction);
        if let Some(ascent_rate) = ascent_rate(&rows, index) {
            point = point.with_ascent_rate(ascent_rate);
        }
        points.push(point);
    }

    Ok(super::SoundingProfile::monotonic(points))
}

fn ascent_rate(rows: &[Row], index: usize) -> Option<f64> {
    let below = &rows[index.saturating_sub(ASCENT_RATE_HALF_WINDOW)];
    let above = &rows[(index + ASCENT_RATE_HALF_WINDOW).min(rows.len() - 1)];

    match (below.time, above.time) {
        (Some(start), Some(end)) if end > start => {
            Some((above.altitude - below.altitude) / (end - start))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sounding::Atmosphere;
    use crate::utilities::approx_equal;

    fn sample_path() -> String {
        format!(
            "{:}/{:}",
            env!("CARGO_MANIFEST_DIR"),
            "data/soundings/OSW20220901_02Z_DigiCora.txt"
        )
    }

    #[test]
    fn test_read_sample() {
        let file = ObservedSoundingFile::new(sample_path()).unwrap();
        let profile = file.read_sounding().unwrap();

        assert!(profile.len() > 100);
        assert!(profile.has_ascent_rates());
        assert_eq!(profile.points()[0].altitude, 75.0);
        assert!(profile.ceiling().unwrap() > 20000.0);

        // the sample climbs at a steady 5 m/s
        assert!(approx_equal(profile.ascent_rate(10000.0).unwrap(), 5.0, 6));
    }

    #[test]
    fn test_truncates_after_burst() {
        let lines: Vec<String> = [
            "Time alt Pres temp rh dew Wdir Wspd",
            "0 100 1000 10 50 0 270 5",
            "10 150 994 10 50 0 270 5",
            "20 200 988 10 50 0 ///// /////",
            "30 250 982 10 50 0 275 6",
            "40 180 990 10 50 0 280 9",
            "EOF",
        ]
        .iter()
        .map(|line| line.to_string())
        .collect();

        let profile = parse_digicora(&lines).unwrap();

        let altitudes: Vec<f64> = profile.points().iter().map(|point| point.altitude).collect();
        assert_eq!(altitudes, vec![100.0, 150.0, 250.0]);
        assert!(approx_equal(profile.points()[0].ascent_rate.unwrap(), 5.0, 9));
    }

    #[test]
    fn test_wrong_columns() {
        let lines: Vec<String> = ["header", "0 100 1000 10 50 0 270"]
            .iter()
            .map(|line| line.to_string())
            .collect();

        assert!(matches!(
            parse_digicora(&lines),
            Err(crate::sounding::SoundingError::ParsingError { .. })
        ));
    }

    #[test]
    fn test_missing_path() {
        assert!(ObservedSoundingFile::new("nonexistent_sounding.txt".to_string()).is_err());
    }
}
