pub mod configuration;
pub mod geodesy;
pub mod model;
pub mod parse;
pub mod prediction;
pub mod run;
pub mod sounding;
pub mod terrain;
pub mod utilities;

lazy_static::lazy_static! {
    pub static ref DEFAULT_INTERVAL: chrono::Duration = chrono::Duration::seconds(10);
    pub static ref DEFAULT_ASCENT_RATE: f64 = 6.09;
    pub static ref DATETIME_FORMAT: String = "%Y-%m-%d %H:%M:%S".to_string();
    pub static ref LOG_LEVEL: log::Level = log::Level::Info;
}
