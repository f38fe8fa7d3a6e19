/// grid axis values closer than this (in degrees) are treated as the same row or column
const AXIS_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Debug, PartialEq)]
pub struct TerrainCell {
    pub latitude: f64,
    pub longitude: f64,
    /// meters above mean sea level
    pub elevation: f64,
}

#[derive(serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TerrainLookup {
    #[default]
    Nearest,
    Bilinear,
}

custom_error::custom_error! {pub TerrainError
    OutOfBounds { latitude: f64, longitude: f64 } = "no terrain data at ({latitude:.4}, {longitude:.4})",
    Empty = "terrain grid has no cells",
    ParsingError { message: String } = "could not parse terrain; {message}",
    ReadFailure { message: String } = "could not read terrain; {message}",
}

impl From<crate::utilities::ReadError> for TerrainError {
    fn from(error: crate::utilities::ReadError) -> Self {
        TerrainError::ReadFailure {
            message: error.to_string(),
        }
    }
}

impl From<crate::parse::ParseError> for TerrainError {
    fn from(error: crate::parse::ParseError) -> Self {
        TerrainError::ParsingError {
            message: error.to_string(),
        }
    }
}

/// Ground elevation on a regular (or near-regular) latitude / longitude grid.
///
/// Lookups outside the grid, or at cells the grid does not define, fail with
/// `TerrainError::OutOfBounds` instead of returning a default elevation.
#[derive(Clone, Debug)]
pub struct TerrainSurface {
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    /// row-major by latitude
    elevations: Vec<Option<f64>>,
    lookup: TerrainLookup,
    minimum_elevation: f64,
}

fn axis(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup_by(|a, b| (*a - *b).abs() < AXIS_TOLERANCE);
    values
}

fn nearest_index(axis: &[f64], value: f64) -> usize {
    let index = axis.partition_point(|candidate| *candidate < value);
    if index == 0 {
        0
    } else if index == axis.len() {
        axis.len() - 1
    } else if (value - axis[index - 1]) <= (axis[index] - value) {
        index - 1
    } else {
        index
    }
}

/// half of the mean spacing, i.e. how far past the outermost row a nearest-cell lookup still applies
fn margin(axis: &[f64]) -> f64 {
    if axis.len() > 1 {
        (axis[axis.len() - 1] - axis[0]) / (axis.len() - 1) as f64 / 2.0
    } else {
        0.0
    }
}

impl TerrainSurface {
    pub fn from_cells(cells: &[TerrainCell], lookup: TerrainLookup) -> Result<Self, TerrainError> {
        if cells.is_empty() {
            return Err(TerrainError::Empty);
        }

        let latitudes = axis(cells.iter().map(|cell| cell.latitude));
        let longitudes = axis(cells.iter().map(|cell| cell.longitude));

        let mut elevations = vec![None; latitudes.len() * longitudes.len()];
        let mut minimum_elevation = f64::INFINITY;
        for cell in cells {
            let row = nearest_index(&latitudes, cell.latitude);
            let column = nearest_index(&longitudes, cell.longitude);
            elevations[row * longitudes.len() + column] = Some(cell.elevation);
            minimum_elevation = minimum_elevation.min(cell.elevation);
        }

        let missing = elevations.iter().filter(|elevation| elevation.is_none()).count();
        if missing > 0 {
            log::warn!(
                "terrain grid of {:} x {:} is missing {:} cells",
                latitudes.len(),
                longitudes.len(),
                missing
            );
        }

        Ok(Self {
            latitudes,
            longitudes,
            elevations,
            lookup,
            minimum_elevation,
        })
    }

    /// Read a whitespace-delimited `longitude latitude elevation` grid (e.g. a topex export).
    /// Longitudes in 0-360 are shifted to -180-180.
    pub fn read(path: &str, lookup: TerrainLookup) -> Result<Self, TerrainError> {
        let lines = crate::utilities::read_lines(path)?;

        let mut cells = vec![];
        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let values = crate::parse::parse_exact_columns(line, index + 1, 3, &[])?;
            if let (Some(longitude), Some(latitude), Some(elevation)) =
                (values[0], values[1], values[2])
            {
                cells.push(TerrainCell {
                    latitude,
                    longitude: if longitude > 180.0 {
                        longitude - 360.0
                    } else {
                        longitude
                    },
                    elevation,
                });
            }
        }

        let surface = Self::from_cells(&cells, lookup)?;
        log::debug!(
            "read {:} terrain cells from {:} covering {:?}",
            cells.len(),
            path,
            surface.bounds()
        );
        Ok(surface)
    }

    pub fn lookup(&self) -> TerrainLookup {
        self.lookup
    }

    pub fn minimum_elevation(&self) -> f64 {
        self.minimum_elevation
    }

    /// extent of the grid cell centers
    pub fn bounds(&self) -> geo::Rect {
        geo::Rect::new(
            geo::coord! { x: self.longitudes[0], y: self.latitudes[0] },
            geo::coord! {
                x: self.longitudes[self.longitudes.len() - 1],
                y: self.latitudes[self.latitudes.len() - 1]
            },
        )
    }

    fn covers(&self, coord: geo::Coord) -> bool {
        let bounds = self.bounds();
        let latitude_margin = margin(&self.latitudes) + AXIS_TOLERANCE;
        let longitude_margin = margin(&self.longitudes) + AXIS_TOLERANCE;

        coord.y >= bounds.min().y - latitude_margin
            && coord.y <= bounds.max().y + latitude_margin
            && coord.x >= bounds.min().x - longitude_margin
            && coord.x <= bounds.max().x + longitude_margin
    }

    fn cell(&self, row: usize, column: usize) -> Option<f64> {
        self.elevations[row * self.longitudes.len() + column]
    }

    /// ground elevation at `coord` (x = longitude, y = latitude), using the configured lookup
    pub fn elevation(&self, coord: geo::Coord) -> Result<f64, TerrainError> {
        match self.lookup {
            TerrainLookup::Nearest => self.nearest_elevation(coord),
            TerrainLookup::Bilinear => self.bilinear_elevation(coord),
        }
    }

    pub fn nearest_elevation(&self, coord: geo::Coord) -> Result<f64, TerrainError> {
        let out_of_bounds = TerrainError::OutOfBounds {
            latitude: coord.y,
            longitude: coord.x,
        };
        if !self.covers(coord) {
            return Err(out_of_bounds);
        }

        self.cell(
            nearest_index(&self.latitudes, coord.y),
            nearest_index(&self.longitudes, coord.x),
        )
        .ok_or(out_of_bounds)
    }

    pub fn bilinear_elevation(&self, coord: geo::Coord) -> Result<f64, TerrainError> {
        let out_of_bounds = TerrainError::OutOfBounds {
            latitude: coord.y,
            longitude: coord.x,
        };
        if !self.covers(coord) {
            return Err(out_of_bounds);
        }

        let (row, row_fraction) = bracket(&self.latitudes, coord.y);
        let (column, column_fraction) = bracket(&self.longitudes, coord.x);
        let next_row = (row + 1).min(self.latitudes.len() - 1);
        let next_column = (column + 1).min(self.longitudes.len() - 1);

        match (
            self.cell(row, column),
            self.cell(row, next_column),
            self.cell(next_row, column),
            self.cell(next_row, next_column),
        ) {
            (Some(south_west), Some(south_east), Some(north_west), Some(north_east)) => {
                let south = south_west + column_fraction * (south_east - south_west);
                let north = north_west + column_fraction * (north_east - north_west);
                Ok(south + row_fraction * (north - south))
            }
            _ => Err(out_of_bounds),
        }
    }
}

/// lower index and fraction toward the next value, clamped to the axis
fn bracket(axis: &[f64], value: f64) -> (usize, f64) {
    if axis.len() < 2 || value <= axis[0] {
        return (0, 0.0);
    }
    if value >= axis[axis.len() - 1] {
        return (axis.len() - 1, 0.0);
    }
    let index = axis.partition_point(|candidate| *candidate <= value) - 1;
    (
        index,
        (value - axis[index]) / (axis[index + 1] - axis[index]),
    )
}
