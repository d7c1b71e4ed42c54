//! Machine dialects shipped with the crate, assembled by layering
//! overlays on the standard instruction set.

use serde::{Deserialize, Serialize};

use crate::command::{ArgPolicy, CommandSpec};
use crate::error::GcodeError;
use crate::instruction_set::{InstructionSet, SetBuilder};

/// Supported machine dialects.
///
/// `Cnc`, `LinuxCnc` and `Grbl` extend the standard set towards milling
/// controllers; `Printer3d`, `Sd`, `Marlin` and `RepRap` towards printer
/// firmware. Each later dialect is an overlay of the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    #[default]
    Standard,
    Cnc,
    LinuxCnc,
    Grbl,
    Printer3d,
    Sd,
    Marlin,
    RepRap,
}

impl Dialect {
    /// Build the immutable instruction set for this dialect.
    pub fn instruction_set(self, strict: bool) -> Result<InstructionSet, GcodeError> {
        let builder = match self {
            Dialect::Standard => standard(),
            Dialect::Cnc => cnc(),
            Dialect::LinuxCnc => linux_cnc(),
            Dialect::Grbl => grbl(),
            Dialect::Printer3d => printer3d()?,
            Dialect::Sd => sd()?,
            Dialect::Marlin => marlin()?,
            Dialect::RepRap => rep_rap()?,
        };
        builder.finish(strict)
    }
}

/// Common codes every dialect understands, see
/// <http://www.machinemate.com/StandardCodes.htm>.
fn standard() -> SetBuilder {
    let mut b = InstructionSet::builder();
    b.command(
        CommandSpec::new("G0")
            .params("xyzf")
            .alias("speed", 'f')
            .min_params(1),
    );
    b.command(
        CommandSpec::new("G1")
            .params("xyzf")
            .alias("speed", 'f')
            .min_params(1),
    );
    b.command(
        CommandSpec::new("G2")
            .params("f")
            .required("xyij")
            .alias("speed", 'f'),
    );
    b.command(
        CommandSpec::new("G3")
            .params("f")
            .required("xyij")
            .alias("speed", 'f'),
    );
    b.command(
        CommandSpec::new("G4")
            .params("ps")
            .alias("milliseconds", 'p')
            .alias("seconds", 's')
            .min_params(1),
    );
    b.command(CommandSpec::new("G28").params("xyz"));
    b.command(CommandSpec::new("G20"));
    b.command(CommandSpec::new("G21"));
    b.command(CommandSpec::new("G90"));
    b.command(CommandSpec::new("G91"));
    b.command(CommandSpec::new("G92").params("xyz").min_params(1));
    b.command(CommandSpec::new("M0"));
    b.command(CommandSpec::new("M1"));
    b.command(
        CommandSpec::new("M3")
            .params("s")
            .alias("speed", 's')
            .min_params(1),
    );
    b.command(
        CommandSpec::new("M4")
            .params("s")
            .alias("speed", 's')
            .min_params(1),
    );
    b.command(CommandSpec::new("M5"));

    b.alias("line_fast", "G0");
    b.alias("line_normal", "G1");
    b.alias("arc_normal", "G2");
    b.alias("arc_clockwise", "G3");
    b.alias("dwell", "G4");
    b.alias("home", "G28");
    b.alias("set_inches", "G20");
    b.alias("set_mm", "G21");
    b.alias("set_absolute", "G90");
    b.alias("set_relative", "G91");
    b.alias("set_position", "G92");
    b.alias("motor_stop", "M0");
    b.alias("motor_sleep", "M1");
    b.alias("spindle_on_counter_clockwise", "M3");
    b.alias("spindle_on_clockwise", "M4");
    b.alias("spindle_off", "M5");
    b
}

/// Plane selection on top of the standard set, see
/// <http://www.cncezpro.com/gcodes.cfm>.
fn cnc() -> SetBuilder {
    let mut b = standard();
    b.command(CommandSpec::new("G17"));
    b.command(CommandSpec::new("G18"));
    b.command(CommandSpec::new("G19"));
    b.alias("set_plane_xy", "G17");
    b.alias("set_plane_xz", "G18");
    b.alias("set_plane_yz", "G19");
    b
}

/// Splines and the extra planes LinuxCNC knows, see
/// <http://www.linuxcnc.org/docs/2.5/html/gcode/gcode.html>.
fn linux_cnc() -> SetBuilder {
    let mut b = cnc();
    b.command(CommandSpec::new("G5").params("xyij").required("pq"));
    b.command(CommandSpec::new("G17.1"));
    b.command(CommandSpec::new("G18.1"));
    b.command(CommandSpec::new("G19.1"));
    b.alias("cubic_spline", "G5");
    b.alias("set_plane_uv", "G17.1");
    b.alias("set_plane_wu", "G18.1");
    b.alias("set_plane_vw", "G19.1");
    b
}

/// Grbl keeps the LinuxCNC core but drops splines and the extra planes,
/// see <https://github.com/grbl/grbl/wiki>.
fn grbl() -> SetBuilder {
    let mut b = linux_cnc();
    b.mask_command("G5");
    b.mask_command("G17.1");
    b.mask_command("G18.1");
    b.mask_command("G19.1");
    b.command(CommandSpec::new("G28.1"));
    b.command(CommandSpec::new("G30"));
    b.command(CommandSpec::new("G30.1"));
    b.command(CommandSpec::new("G38.2"));
    b.command(CommandSpec::new("G43.1"));
    b.command(CommandSpec::new("G49"));
    b.command(CommandSpec::new("G53"));
    b.command(CommandSpec::new("G54"));
    b.command(CommandSpec::new("G55"));
    b.command(CommandSpec::new("G56"));
    b.command(CommandSpec::new("G57"));
    b.command(CommandSpec::new("G58"));
    b.command(CommandSpec::new("G59"));
    b.command(CommandSpec::new("G92.1"));
    b.command(CommandSpec::new("G93"));
    b.command(CommandSpec::new("G94"));
    b.command(CommandSpec::new("G80"));
    b.command(CommandSpec::new("M2"));
    b.command(CommandSpec::new("M30"));
    b.command(CommandSpec::new("M8"));
    b.command(CommandSpec::new("M9"));

    b.mask_alias("cubic_spline");
    b.mask_alias("set_plane_uv");
    b.mask_alias("set_plane_wu");
    b.mask_alias("set_plane_vw");
    b.alias("set_home", "G28.1");
    b.alias("goto_def_position", "G30");
    b.alias("set_def_position", "G30.1");
    b.alias("probing", "G38.2");
    b.alias("dynamic_tool_length_offsets1", "G43.1");
    b.alias("dynamic_tool_length_offsets2", "G49");
    b.alias("move_abs_cord", "G53");
    b.alias("work_coordinate_systems1", "G54");
    b.alias("work_coordinate_systems2", "G55");
    b.alias("work_coordinate_systems3", "G56");
    b.alias("work_coordinate_systems4", "G57");
    b.alias("work_coordinate_systems5", "G58");
    b.alias("work_coordinate_systems6", "G59");
    b.alias("clear_coordinate_system_offsets", "G92.1");
    b.alias("feedrate_modes1", "G93");
    b.alias("feedrate_modes2", "G94");
    b.alias("cancel_motion", "G80");
    b.alias("program_pause", "M2");
    b.alias("program_stop", "M30");
    b.alias("coolant_control1", "M8");
    b.alias("coolant_control2", "M9");
    b
}

/// Extrusion-aware moves plus the common printer M-codes, see
/// <http://reprap.org/wiki/G-code>.
fn printer3d() -> Result<SetBuilder, GcodeError> {
    let mut b = standard();
    b.amend("G0", |spec| spec.params("es").alias("endstop_check", 's'))?;
    b.amend("G1", |spec| spec.params("es").alias("endstop_check", 's'))?;
    b.amend("G2", |spec| spec.params("e"))?;
    b.amend("G3", |spec| spec.params("e"))?;
    b.amend("G92", |spec| spec.params("e"))?;

    b.command(CommandSpec::new("M18"));
    b.command(CommandSpec::new("M80"));
    b.command(CommandSpec::new("M81"));
    b.command(CommandSpec::new("M82"));
    b.command(CommandSpec::new("M83"));
    b.command(
        CommandSpec::new("M84")
            .params("xyzes")
            .alias("seconds", 's'),
    );
    b.command(CommandSpec::new("M92").params("xyze").min_params(1));
    b.command(
        CommandSpec::new("M104")
            .required("s")
            .alias("grade", 's'),
    );
    b.command(CommandSpec::new("M105"));
    b.command(
        CommandSpec::new("M106")
            .required("s")
            .alias("power", 's'),
    );
    b.command(CommandSpec::new("M107"));
    b.command(
        CommandSpec::new("M109")
            .required("s")
            .alias("grade", 's'),
    );
    b.command(CommandSpec::new("M112"));
    b.command(CommandSpec::new("M114"));
    b.command(CommandSpec::new("M115"));
    b.command(CommandSpec::new("M119"));
    b.command(
        CommandSpec::new("M140")
            .required("s")
            .alias("grade", 's'),
    );
    b.command(
        CommandSpec::new("M190")
            .required("s")
            .alias("grade", 's'),
    );
    b.command(CommandSpec::new("M203").params("xyze").min_params(1));
    b.command(CommandSpec::new("M301").required("pid"));
    b.command(CommandSpec::new("M400"));

    b.alias("motor_off", "M18");
    b.alias("power_on", "M80");
    b.alias("power_off", "M81");
    b.alias("extruder_absolute", "M82");
    b.alias("extruder_relative", "M83");
    b.alias("motor_idle", "M84");
    b.alias("set_axis_steps_per_unit", "M92");
    b.alias("extruder_set_temperature", "M104");
    b.alias("get_temperature", "M105");
    b.alias("fan_on", "M106");
    b.alias("fan_off", "M107");
    b.alias("extruder_wait_temperature", "M109");
    b.alias("emergency_stop", "M112");
    b.alias("get_position", "M114");
    b.alias("get_firmware", "M115");
    b.alias("get_endstop", "M119");
    b.alias("bed_set_temperature", "M140");
    b.alias("bed_wait_temperature", "M190");
    b.alias("set_max_feedrate", "M203");
    b.alias("set_PID", "M301");
    b.alias("set_pid", "M301");
    b.alias("wait_move", "M400");
    Ok(b)
}

/// SD-card handling M-codes on top of the printer set, see
/// <http://reprap.org/wiki/G-code>.
fn sd() -> Result<SetBuilder, GcodeError> {
    let mut b = printer3d()?;
    b.command(CommandSpec::new("M20"));
    b.command(CommandSpec::new("M21"));
    b.command(CommandSpec::new("M23").args(ArgPolicy::Required(1)));
    b.command(CommandSpec::new("M24"));
    b.command(CommandSpec::new("M25"));
    b.command(
        CommandSpec::new("M26")
            .params("s")
            .alias("position", 's')
            .min_params(1),
    );
    b.command(CommandSpec::new("M27"));
    b.command(CommandSpec::new("M28").args(ArgPolicy::Required(1)));
    b.command(CommandSpec::new("M29").args(ArgPolicy::Required(1)));
    b.command(CommandSpec::new("M30").args(ArgPolicy::Required(1)));
    b.command(CommandSpec::new("M31"));
    b.command(CommandSpec::new("M32").args(ArgPolicy::Required(1)));
    b.command(CommandSpec::new("M36").args(ArgPolicy::Required(1)));

    for (upper, lower, key) in [
        ("SD_list", "sd_list", "M20"),
        ("SD_init", "sd_init", "M21"),
        ("SD_select", "sd_select", "M23"),
        ("SD_print_start", "sd_print_start", "M24"),
        ("SD_print_pause", "sd_print_pause", "M25"),
        ("SD_set_position", "sd_set_position", "M26"),
        ("SD_print_status", "sd_print_status", "M27"),
        ("SD_write", "sd_write", "M28"),
        ("SD_write_stop", "sd_write_stop", "M29"),
        ("SD_delete", "sd_delete", "M30"),
        ("SD_output_time", "sd_output_time", "M31"),
        ("SD_print", "sd_print", "M32"),
        ("SD_info", "sd_info", "M36"),
    ] {
        b.alias(upper, key);
        b.alias(lower, key);
    }
    b.alias("SD_print_resume", "M24");
    Ok(b)
}

/// Marlin firmware: autotemp, display messages, logging, and no spindle,
/// see <https://github.com/MarlinFirmware/Marlin>.
fn marlin() -> Result<SetBuilder, GcodeError> {
    let mut b = sd()?;
    b.amend("M109", |spec| {
        spec.params("rbf")
            .alias("wait_cooling", 'r')
            .alias("min_t", 'b')
            .alias("max_t", 'b')
            .alias("factor", 'f')
    })?;
    b.amend("M190", |spec| spec.params("r").alias("wait_cooling", 'r'))?;
    b.command(CommandSpec::new("M22"));
    b.command(CommandSpec::new("M117").args(ArgPolicy::Required(1)));
    b.command(CommandSpec::new("M304").required("pid"));
    b.command(CommandSpec::new("M928").args(ArgPolicy::Required(1)));
    b.command(CommandSpec::new("M999"));
    b.mask_command("M36");
    b.mask_command("M3");
    b.mask_command("M4");
    b.mask_command("M5");

    b.alias("SD_release", "M22");
    b.alias("sd_release", "M22");
    b.alias("autotemp", "M109");
    b.alias("display_message", "M117");
    b.alias("bed_set_PID", "M304");
    b.alias("SD_start_log", "M928");
    b.alias("sd_start_log", "M928");
    b.alias("restart", "M999");
    b.mask_alias("SD_info");
    b.mask_alias("sd_info");
    b.mask_alias("spindle_on_counter_clockwise");
    b.mask_alias("spindle_on_clockwise");
    b.mask_alias("spindle_off");
    Ok(b)
}

/// RepRap firmware: stack handling and diagnostics, no arcs and no
/// spindle, see <https://github.com/reprappro/RepRapFirmware>.
fn rep_rap() -> Result<SetBuilder, GcodeError> {
    let mut b = sd()?;
    b.command(CommandSpec::new("M116"));
    b.command(CommandSpec::new("M120"));
    b.command(CommandSpec::new("M121"));
    b.command(CommandSpec::new("M122"));
    b.mask_command("G2");
    b.mask_command("G3");
    b.mask_command("M32");
    b.mask_command("M36");
    b.mask_command("M3");
    b.mask_command("M4");
    b.mask_command("M5");

    b.alias("wait", "M116");
    b.alias("push", "M120");
    b.alias("pop", "M121");
    b.alias("diagnose", "M122");
    b.mask_alias("arc_normal");
    b.mask_alias("arc_clockwise");
    b.mask_alias("SD_info");
    b.mask_alias("sd_info");
    b.mask_alias("SD_print");
    b.mask_alias("sd_print");
    b.mask_alias("spindle_on_counter_clockwise");
    b.mask_alias("spindle_on_clockwise");
    b.mask_alias("spindle_off");
    Ok(b)
}
