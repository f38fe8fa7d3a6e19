const GRAVITY: f64 = 9.80665;
/// specific gas constant of dry air, J/(kg K)
const GAS_CONSTANT: f64 = 287.0531;

const SEA_LEVEL_PRESSURE: f64 = 1013.25;
const SEA_LEVEL_TEMPERATURE: f64 = 288.15;
const TROPOPAUSE_PRESSURE: f64 = 226.32;
const TROPOPAUSE_TEMPERATURE: f64 = 216.65;
const STRATOPAUSE_PRESSURE: f64 = 54.7489;

/// Descent speed of the payload under its parachute, as a function of ambient pressure.
pub trait FallRate {
    /// positive downward speed in m/s at `pressure` hPa
    fn descent_rate(&self, pressure: f64) -> f64;
}

/// Empirical fit of descent speed to pressure from historical flights,
/// `numerator / (pressure + offset) + minimum`.
#[derive(serde::Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PressureFit {
    #[serde(default = "default_numerator")]
    pub numerator: f64,
    #[serde(default = "default_offset")]
    pub offset: f64,
    /// speed approached at high pressure
    #[serde(default = "default_minimum")]
    pub minimum: f64,
}

fn default_numerator() -> f64 {
    917.02
}

fn default_offset() -> f64 {
    11.0
}

fn default_minimum() -> f64 {
    5.167
}

impl Default for PressureFit {
    fn default() -> Self {
        Self {
            numerator: default_numerator(),
            offset: default_offset(),
            minimum: default_minimum(),
        }
    }
}

impl FallRate for PressureFit {
    fn descent_rate(&self, pressure: f64) -> f64 {
        self.numerator / (pressure + self.offset) + self.minimum
    }
}

/// Terminal velocity of a payload under a parachute, `sqrt(2 m g / (rho Cd A))`,
/// with air density from the standard atmosphere temperature at `pressure`.
#[derive(serde::Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ParachuteDrag {
    /// kg
    pub mass: f64,
    /// m^2
    pub area: f64,
    pub drag_coefficient: f64,
}

impl FallRate for ParachuteDrag {
    fn descent_rate(&self, pressure: f64) -> f64 {
        let density = air_density(pressure);
        (2.0 * self.mass * GRAVITY / (density * self.drag_coefficient * self.area)).sqrt()
    }
}

/// International Standard Atmosphere temperature (K) at `pressure` hPa, up to the stratopause
pub fn standard_temperature(pressure: f64) -> f64 {
    if pressure >= TROPOPAUSE_PRESSURE {
        SEA_LEVEL_TEMPERATURE * (pressure / SEA_LEVEL_PRESSURE).powf(0.190263)
    } else if pressure >= STRATOPAUSE_PRESSURE {
        TROPOPAUSE_TEMPERATURE
    } else {
        TROPOPAUSE_TEMPERATURE * (pressure / STRATOPAUSE_PRESSURE).powf(-0.029271)
    }
}

/// dry air density (kg/m^3) at `pressure` hPa
pub fn air_density(pressure: f64) -> f64 {
    pressure * 100.0 / (GAS_CONSTANT * standard_temperature(pressure))
}

#[derive(serde::Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum FallRateModel {
    PressureFit(PressureFit),
    Parachute(ParachuteDrag),
}

impl Default for FallRateModel {
    fn default() -> Self {
        Self::PressureFit(PressureFit::default())
    }
}

impl FallRate for FallRateModel {
    fn descent_rate(&self, pressure: f64) -> f64 {
        match self {
            FallRateModel::PressureFit(fit) => fit.descent_rate(pressure),
            FallRateModel::Parachute(parachute) => parachute.descent_rate(pressure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::approx_equal;

    #[test]
    fn test_pressure_fit() {
        let fit = PressureFit::default();

        assert!(approx_equal(fit.descent_rate(1000.0), 6.0740, 3));
        assert!(approx_equal(fit.descent_rate(100.0), 13.4284, 3));
        assert!(fit.descent_rate(10.0) > fit.descent_rate(500.0));
    }

    #[test]
    fn test_standard_atmosphere() {
        assert!(approx_equal(standard_temperature(1013.25), 288.15, 6));
        assert!(approx_equal(standard_temperature(100.0), 216.65, 6));
        assert!(approx_equal(air_density(1013.25), 1.225, 3));

        // continuous across layer boundaries
        assert!(approx_equal(standard_temperature(226.32), 216.65, 1));
        assert!(approx_equal(
            standard_temperature(54.7489 - 1e-9),
            standard_temperature(54.7489),
            6
        ));
    }

    #[test]
    fn test_parachute() {
        let parachute = ParachuteDrag {
            mass: 1.0,
            area: 1.0,
            drag_coefficient: 1.5,
        };

        assert!(approx_equal(parachute.descent_rate(1013.25), 3.2671, 3));
        // thinner air, faster fall
        assert!(parachute.descent_rate(50.0) > parachute.descent_rate(500.0));
    }

    #[test]
    fn test_deserialize_model() {
        let model: FallRateModel = serde_yaml::from_str("model: pressure_fit").unwrap();
        assert_eq!(model, FallRateModel::default());

        let model: FallRateModel = serde_yaml::from_str(
            "model: parachute\nmass: 1.2\narea: 0.8\ndrag_coefficient: 1.4",
        )
        .unwrap();
        assert!(matches!(model, FallRateModel::Parachute(_)));
    }
}
