//! Stateful observers that replay cleaned commands into machine state:
//! travelled distance, bounding envelope, and time spent per feed rate.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::ParamMap;

/// Receives lifecycle notifications and every successfully cleaned
/// command from a stream pass.
pub trait Observer {
    /// A new pass is starting; per-run state goes back to its configured
    /// starting point.
    fn on_start(&mut self) {}
    /// One command cleaned successfully, with its canonical key and the
    /// parameters the grammar extracted.
    fn on_command(&mut self, code: &str, params: &ParamMap);
    /// The pass consumed its source to the end.
    fn on_complete(&mut self) {}
}

/// No-op observer for runs that only want the cleaned output.
impl Observer for () {
    fn on_command(&mut self, _code: &str, _params: &ParamMap) {}
}

/// Linear units of incoming coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitMode {
    #[default]
    Millimeters,
    Inches,
}

/// How coordinates are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Positioning {
    #[default]
    Absolute,
    Relative,
}

/// Starting state and conversion settings for the trackers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackConfig {
    #[serde(default)]
    pub units: UnitMode,
    #[serde(default)]
    pub positioning: Positioning,
    /// Inches per millimeter; imperial input converts to metric by
    /// dividing through this factor.
    #[serde(default = "default_inch_factor")]
    pub inch_factor: f64,
}

fn default_inch_factor() -> f64 {
    0.0393700787
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            units: UnitMode::default(),
            positioning: Positioning::default(),
            inch_factor: default_inch_factor(),
        }
    }
}

/// A point in machine space, in millimeters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Axes {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Accumulated travel: per-axis totals plus the Euclidean path total, in
/// millimeters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Travel {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub total: f64,
}

/// Reconstructs the absolute position behind every motion command and
/// adds up the distance travelled.
///
/// Arc moves are deliberately inert: their end points and radii never
/// reach the totals, so programs heavy on `G2`/`G3` under-report.
#[derive(Debug, Clone, Serialize)]
pub struct DistanceTracker {
    config: TrackConfig,
    units: UnitMode,
    positioning: Positioning,
    position: Axes,
    distance: Travel,
}

impl DistanceTracker {
    pub fn new(config: TrackConfig) -> Self {
        Self {
            config,
            units: config.units,
            positioning: config.positioning,
            position: Axes::default(),
            distance: Travel::default(),
        }
    }

    pub fn config(&self) -> TrackConfig {
        self.config
    }

    pub fn units(&self) -> UnitMode {
        self.units
    }

    pub fn positioning(&self) -> Positioning {
        self.positioning
    }

    /// Last reconstructed absolute position.
    pub fn position(&self) -> Axes {
        self.position
    }

    /// Travel accumulated so far.
    pub fn distance(&self) -> Travel {
        self.distance
    }

    /// One axis of a motion command: absent parameters carry the current
    /// value forward, present ones convert to an absolute metric target.
    fn resolve_axis(&self, params: &ParamMap, name: &str, current: f64) -> f64 {
        let Some(value) = params.get(name).and_then(|v| v.parse::<f64>().ok()) else {
            return current;
        };
        let value = match self.units {
            UnitMode::Inches => value / self.config.inch_factor,
            UnitMode::Millimeters => value,
        };
        match self.positioning {
            Positioning::Relative => current + value,
            Positioning::Absolute => value,
        }
    }

    /// Homing target: named axes go to absolute zero, unnamed ones stay;
    /// naming none homes everything.
    fn home_target(&self, params: &ParamMap) -> Axes {
        let named = ["x", "y", "z"].iter().any(|axis| params.contains_key(*axis));
        Axes {
            x: if !named || params.contains_key("x") { 0.0 } else { self.position.x },
            y: if !named || params.contains_key("y") { 0.0 } else { self.position.y },
            z: if !named || params.contains_key("z") { 0.0 } else { self.position.z },
        }
    }

    fn apply(&mut self, code: &str, params: &ParamMap) {
        match code {
            "G20" => self.units = UnitMode::Inches,
            "G21" => self.units = UnitMode::Millimeters,
            "G90" => self.positioning = Positioning::Absolute,
            "G91" => self.positioning = Positioning::Relative,
            "G2" | "G3" => {
                // Arc travel stays out of the totals, see the type docs.
            }
            "G0" | "G1" | "G92" | "G28" => {
                let target = if code == "G28" {
                    self.home_target(params)
                } else {
                    Axes {
                        x: self.resolve_axis(params, "x", self.position.x),
                        y: self.resolve_axis(params, "y", self.position.y),
                        z: self.resolve_axis(params, "z", self.position.z),
                    }
                };
                // G92 only redefines the origin, nothing moves.
                if code != "G92" {
                    let dx = (target.x - self.position.x).abs();
                    let dy = (target.y - self.position.y).abs();
                    let dz = (target.z - self.position.z).abs();
                    self.distance.x += dx;
                    self.distance.y += dy;
                    self.distance.z += dz;
                    self.distance.total += (dx * dx + dy * dy + dz * dz).sqrt();
                }
                self.position = target;
            }
            _ => {}
        }
    }
}

impl Observer for DistanceTracker {
    fn on_start(&mut self) {
        self.units = self.config.units;
        self.positioning = self.config.positioning;
        self.position = Axes::default();
        self.distance = Travel::default();
    }

    fn on_command(&mut self, code: &str, params: &ParamMap) {
        self.apply(code, params);
    }
}

/// Bounding envelope touched by motion commands. Axes stay `None` until
/// the first motion reaches them, so an empty program reports no size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Bounds {
    pub min_x: Option<f64>,
    pub min_y: Option<f64>,
    pub max_x: Option<f64>,
    pub max_y: Option<f64>,
    pub max_z: Option<f64>,
}

/// Adds bounding-envelope tracking on top of [`DistanceTracker`].
#[derive(Debug, Clone, Serialize)]
pub struct SizeTracker {
    distance: DistanceTracker,
    bounds: Bounds,
}

impl SizeTracker {
    pub fn new(config: TrackConfig) -> Self {
        Self {
            distance: DistanceTracker::new(config),
            bounds: Bounds::default(),
        }
    }

    pub fn config(&self) -> TrackConfig {
        self.distance.config()
    }

    pub fn units(&self) -> UnitMode {
        self.distance.units()
    }

    pub fn positioning(&self) -> Positioning {
        self.distance.positioning()
    }

    pub fn position(&self) -> Axes {
        self.distance.position()
    }

    pub fn distance(&self) -> Travel {
        self.distance.distance()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn touch(&mut self) {
        let p = self.distance.position();
        self.bounds.min_x = Some(self.bounds.min_x.map_or(p.x, |v| v.min(p.x)));
        self.bounds.min_y = Some(self.bounds.min_y.map_or(p.y, |v| v.min(p.y)));
        self.bounds.max_x = Some(self.bounds.max_x.map_or(p.x, |v| v.max(p.x)));
        self.bounds.max_y = Some(self.bounds.max_y.map_or(p.y, |v| v.max(p.y)));
        self.bounds.max_z = Some(self.bounds.max_z.map_or(p.z, |v| v.max(p.z)));
    }
}

impl Observer for SizeTracker {
    fn on_start(&mut self) {
        self.distance.on_start();
        self.bounds = Bounds::default();
    }

    fn on_command(&mut self, code: &str, params: &ParamMap) {
        self.distance.on_command(code, params);
        if matches!(code, "G0" | "G1" | "G2" | "G3") {
            self.touch();
        }
    }

    fn on_complete(&mut self) {
        self.distance.on_complete();
    }
}

const UNKNOWN_RATE: &str = "unknown";

/// Adds per-feed-rate travel bucketing and a duration estimate on top of
/// [`SizeTracker`].
///
/// Travel accumulates into the bucket of the feed rate active when it
/// happened; motion before the first `F` parameter lands in the
/// `"unknown"` bucket, which never contributes to the estimate.
#[derive(Debug, Clone, Serialize)]
pub struct SpeedTracker {
    size: SizeTracker,
    speeds: HashMap<String, Travel>,
    open_mark: Travel,
    rate: String,
    estimated_time: Option<Duration>,
}

impl SpeedTracker {
    pub fn new(config: TrackConfig) -> Self {
        Self {
            size: SizeTracker::new(config),
            speeds: HashMap::from([(UNKNOWN_RATE.to_string(), Travel::default())]),
            open_mark: Travel::default(),
            rate: UNKNOWN_RATE.to_string(),
            estimated_time: None,
        }
    }

    pub fn config(&self) -> TrackConfig {
        self.size.config()
    }

    pub fn position(&self) -> Axes {
        self.size.position()
    }

    pub fn distance(&self) -> Travel {
        self.size.distance()
    }

    pub fn bounds(&self) -> Bounds {
        self.size.bounds()
    }

    /// Travel per feed-rate bucket, keyed by the metric feed-rate text.
    pub fn speeds(&self) -> &HashMap<String, Travel> {
        &self.speeds
    }

    /// The feed rate travel is currently accumulating under.
    pub fn rate(&self) -> &str {
        &self.rate
    }

    /// Set once a pass completes; saturates to `Duration::MAX` when a
    /// bucket makes the estimate blow up, e.g. a zero feed rate.
    pub fn estimated_time(&self) -> Option<Duration> {
        self.estimated_time
    }

    /// Feed rates are compared and stored in metric, so the same physical
    /// rate keeps one bucket whatever units the program is in.
    fn metric_rate(&self, raw: &str) -> String {
        match self.size.units() {
            UnitMode::Millimeters => raw.to_string(),
            UnitMode::Inches => match raw.parse::<f64>() {
                Ok(value) => (value / self.config().inch_factor).to_string(),
                Err(_) => raw.to_string(),
            },
        }
    }

    /// Credit everything travelled since the bucket opened, then mark the
    /// new opening point.
    fn close_bucket(&mut self, at: Travel) {
        let bucket = self.speeds.entry(self.rate.clone()).or_default();
        bucket.x += at.x - self.open_mark.x;
        bucket.y += at.y - self.open_mark.y;
        bucket.z += at.z - self.open_mark.z;
        bucket.total += at.total - self.open_mark.total;
        self.open_mark = at;
    }
}

impl Observer for SpeedTracker {
    fn on_start(&mut self) {
        self.size.on_start();
        self.speeds = HashMap::from([(UNKNOWN_RATE.to_string(), Travel::default())]);
        self.open_mark = Travel::default();
        self.rate = UNKNOWN_RATE.to_string();
        self.estimated_time = None;
    }

    fn on_command(&mut self, code: &str, params: &ParamMap) {
        // Travel belonging to the old rate is everything up to here.
        let before = self.size.distance();
        self.size.on_command(code, params);
        if !matches!(code, "G0" | "G1" | "G2" | "G3" | "G28") {
            return;
        }
        let Some(feed) = params.get("f") else {
            return;
        };
        let rate = self.metric_rate(feed);
        if rate != self.rate {
            self.close_bucket(before);
            self.rate = rate;
        }
    }

    fn on_complete(&mut self) {
        self.size.on_complete();
        self.close_bucket(self.size.distance());
        let mut minutes = 0.0;
        for (rate, travel) in &self.speeds {
            // Non-numeric buckets, i.e. "unknown", carry no time.
            if let Ok(rate) = rate.parse::<f64>() {
                minutes += 60.0 / (rate / travel.total);
            }
        }
        self.estimated_time =
            Some(Duration::try_from_secs_f64(minutes * 60.0).unwrap_or(Duration::MAX));
    }
}
