//! Dialect-aware G-code building, cleaning, and stream statistics.
//!
//! Commands are parameter rule sets with a compiled grammar; dialects
//! layer those commands into per-machine instruction sets; a stream
//! processor replays program files through a dialect, canonicalizing
//! every line while trackers reconstruct position, travelled distance,
//! bounding size, and time spent per feed rate.
//!
//! ```
//! use std::io::Cursor;
//! use gcode_forge::{Config, Dialect};
//!
//! # fn main() -> Result<(), gcode_forge::GcodeError> {
//! let config = Config {
//!     dialect: Dialect::Printer3d,
//!     ..Config::default()
//! };
//! let program = &b"G28\nG1 X10 F1500\nG1 Y10 ; done\n"[..];
//! let mut processor = config.processor(Cursor::new(program))?;
//! let cleaned = processor.process()?;
//! assert_eq!(cleaned, ["G28\r\n", "G1 F1500 X10\r\n", "G1 Y10\r\n"]);
//! assert_eq!(processor.comments(), ["G1 Y10 ; done"]);
//! assert_eq!(processor.tracker().distance().total, 20.0);
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod dialect;
pub mod error;
pub mod instruction_set;
pub mod stream;
pub mod track;

pub use command::{ArgPolicy, Command, CommandSpec, Grammar, ParamMap};
pub use config::Config;
pub use dialect::Dialect;
pub use error::GcodeError;
pub use instruction_set::{InstructionSet, Resolution, SetBuilder};
pub use stream::{Lines, Phase, StreamProcessor};
pub use track::{
    Axes, Bounds, DistanceTracker, Observer, Positioning, SizeTracker, SpeedTracker,
    TrackConfig, Travel, UnitMode,
};
