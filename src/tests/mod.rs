mod attitude;
mod reader;

use log::LevelFilter;
use std::sync::Once;

use hifitime::{Epoch, Unit};

use crate::geometry::AntennaGeometry;

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::builder()
            .is_test(true)
            .filter_level(LevelFilter::Debug)
            .init();
    });
}

/// Three-antenna survey geometry shared by the scenarios: aft antenna
/// at the origin, port and starboard antennas near the bow.
pub fn survey_geometry() -> AntennaGeometry {
    AntennaGeometry::new([
        ("AFT", (0.0, 0.0, 0.0)),
        ("PORT", (-9.347, 36.276, 2.603)),
        ("STBD", (9.392, 36.405, 2.617)),
    ])
    .unwrap()
}

/// Epoch `seconds` into the reference survey day.
pub fn survey_epoch(seconds: f64) -> Epoch {
    Epoch::from_gregorian_utc_at_midnight(2025, 7, 16) + seconds * Unit::Second
}
