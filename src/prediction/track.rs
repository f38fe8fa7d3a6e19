use geo::GeodesicDistance;

/// Ordered payload states of one simulated flight, from launch to the landing point.
#[derive(Clone, Debug)]
pub struct SimulationResult {
    states: Vec<super::PayloadState>,
    launch_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl SimulationResult {
    /// `states` holds at least the start state and is ordered by elapsed time
    pub(crate) fn new(
        states: Vec<super::PayloadState>,
        launch_time: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Self {
        Self {
            states,
            launch_time,
        }
    }

    pub fn states(&self) -> &[super::PayloadState] {
        &self.states
    }

    pub fn launch(&self) -> &super::PayloadState {
        &self.states[0]
    }

    pub fn landing(&self) -> &super::PayloadState {
        &self.states[self.states.len() - 1]
    }

    /// first state past cutdown
    pub fn cutdown(&self) -> Option<&super::PayloadState> {
        self.states
            .iter()
            .find(|state| state.phase != super::FlightPhase::Ascending)
    }

    pub fn max_altitude(&self) -> f64 {
        self.states
            .iter()
            .map(|state| state.altitude)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn flight_time(&self) -> chrono::Duration {
        chrono::Duration::milliseconds((self.landing().elapsed * 1000.0).round() as i64)
    }

    /// wall-clock time of a state, if the launch time is known
    pub fn time_of(
        &self,
        state: &super::PayloadState,
    ) -> Option<chrono::DateTime<chrono::Utc>> {
        self.launch_time.map(|launch_time| {
            launch_time + chrono::Duration::milliseconds((state.elapsed * 1000.0).round() as i64)
        })
    }

    /// seconds between consecutive states
    pub fn intervals(&self) -> Vec<f64> {
        self.states
            .windows(2)
            .map(|pair| pair[1].elapsed - pair[0].elapsed)
            .collect()
    }

    pub fn ascents(&self) -> Vec<f64> {
        self.states
            .windows(2)
            .map(|pair| pair[1].altitude - pair[0].altitude)
            .collect()
    }

    pub fn ascent_rates(&self) -> Vec<f64> {
        self.ascents()
            .iter()
            .zip(self.intervals())
            .map(|(ascent, interval)| ascent / interval)
            .collect()
    }

    pub fn overground_distances(&self) -> Vec<f64> {
        self.states
            .windows(2)
            .map(|pair| {
                geo::Point::from(pair[0].coord).geodesic_distance(&geo::Point::from(pair[1].coord))
            })
            .collect()
    }

    pub fn ground_speeds(&self) -> Vec<f64> {
        self.overground_distances()
            .iter()
            .zip(self.intervals())
            .map(|(distance, interval)| distance / interval)
            .collect()
    }

    /// geodesic distance from launch to landing
    pub fn range(&self) -> f64 {
        geo::Point::from(self.launch().coord)
            .geodesic_distance(&geo::Point::from(self.landing().coord))
    }

    fn point_feature(
        &self,
        state: &super::PayloadState,
        name: &str,
    ) -> geojson::Feature {
        let mut properties = geojson::JsonObject::new();
        properties.insert(String::from("name"), serde_json::json!(name));
        properties.insert(String::from("elapsed"), serde_json::json!(state.elapsed));
        properties.insert(String::from("altitude"), serde_json::json!(state.altitude));
        if let Some(time) = self.time_of(state) {
            properties.insert(String::from("time"), serde_json::json!(time.to_rfc3339()));
        }

        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::Point(vec![
                state.coord.x,
                state.coord.y,
                state.altitude,
            ]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }

    /// the flight path as a 3D line string, plus launch, cutdown, and landing points
    pub fn to_geojson(&self, name: &str) -> geojson::FeatureCollection {
        let mut properties = geojson::JsonObject::new();
        properties.insert(String::from("name"), serde_json::json!(name));
        properties.insert(
            String::from("flight_time"),
            serde_json::json!(self.landing().elapsed),
        );
        properties.insert(String::from("range"), serde_json::json!(self.range()));

        let path = geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::LineString(
                self.states
                    .iter()
                    .map(|state| vec![state.coord.x, state.coord.y, state.altitude])
                    .collect(),
            ))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        };

        let mut features = vec![path, self.point_feature(self.launch(), "launch")];
        if let Some(cutdown) = self.cutdown() {
            if cutdown.phase == super::FlightPhase::Descending {
                features.push(self.point_feature(cutdown, "cutdown"));
            }
        }
        features.push(self.point_feature(self.landing(), "landing"));

        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::{FlightPhase, PayloadState};
    use chrono::TimeZone;

    fn straight_east() -> SimulationResult {
        let origin = geo::coord! { x: -77.0, y: 43.7 };
        let states = vec![
            PayloadState {
                elapsed: 0.0,
                coord: origin,
                altitude: 300.0,
                phase: FlightPhase::Ascending,
            },
            PayloadState {
                elapsed: 100.0,
                coord: crate::geodesy::displace(origin, 1000.0, 0.0),
                altitude: 900.0,
                phase: FlightPhase::Descending,
            },
            PayloadState {
                elapsed: 200.0,
                coord: crate::geodesy::displace(origin, 2000.0, 0.0),
                altitude: 250.0,
                phase: FlightPhase::Landed,
            },
        ];
        SimulationResult::new(
            states,
            Some(chrono::Utc.with_ymd_and_hms(2023, 12, 27, 17, 0, 0).unwrap()),
        )
    }

    #[test]
    fn test_track_statistics() {
        let result = straight_east();

        assert_eq!(result.intervals(), vec![100.0, 100.0]);
        assert_eq!(result.ascents(), vec![600.0, -650.0]);
        assert_eq!(result.ascent_rates(), vec![6.0, -6.5]);
        assert_eq!(result.max_altitude(), 900.0);
        assert_eq!(result.flight_time(), chrono::Duration::seconds(200));
        assert_eq!(result.cutdown().unwrap().altitude, 900.0);

        // equirectangular displacement agrees with the geodesic to well under a percent here
        for speed in result.ground_speeds() {
            assert!((speed - 10.0).abs() < 0.05);
        }
        assert!((result.range() - 2000.0).abs() < 10.0);
    }

    #[test]
    fn test_landing_time() {
        let result = straight_east();

        assert_eq!(
            result.time_of(result.landing()).unwrap(),
            chrono::Utc.with_ymd_and_hms(2023, 12, 27, 17, 3, 20).unwrap()
        );
    }

    #[test]
    fn test_geojson() {
        let result = straight_east();
        let collection = result.to_geojson("test flight");

        assert_eq!(collection.features.len(), 4);
        let text = geojson::GeoJson::from(collection).to_string();
        assert!(text.contains("LineString"));
        assert!(text.contains("\"landing\""));
        assert!(text.contains("2023-12-27T17:03:20+00:00"));
    }
}
