//! Instruction-set registry: the commands a machine understands, the
//! function names that reach them, and the line-cleaning entry point.

use std::collections::HashMap;

use crate::command::{Command, CommandSpec, ParamMap};
use crate::error::GcodeError;

/// Outcome of a name lookup. A masked entry is distinct from an unknown
/// one so callers can tell "this machine dropped it" from a typo.
#[derive(Debug)]
pub enum Resolution<'a> {
    Command(&'a Command),
    Unsupported,
    NotFound,
}

/// An immutable registry of compiled commands and function-name aliases.
///
/// Entries hold `None` where a dialect explicitly masks something it would
/// otherwise inherit; lookups report those as [`Resolution::Unsupported`].
#[derive(Debug, Clone)]
pub struct InstructionSet {
    commands: HashMap<String, Option<Command>>,
    aliases: HashMap<String, Option<String>>,
    strict: bool,
}

impl InstructionSet {
    /// Start an empty builder.
    pub fn builder() -> SetBuilder {
        SetBuilder::default()
    }

    /// Start a builder preloaded with this set's commands and aliases, for
    /// deriving a new dialect by overlay.
    pub fn overlay(&self) -> SetBuilder {
        SetBuilder {
            commands: self
                .commands
                .iter()
                .map(|(k, v)| (k.clone(), v.as_ref().map(|c| c.spec().clone())))
                .collect(),
            aliases: self.aliases.clone(),
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Command keys with a live definition, in no particular order.
    pub fn supported_keys(&self) -> impl Iterator<Item = &str> {
        self.commands
            .iter()
            .filter_map(|(key, entry)| entry.is_some().then_some(key.as_str()))
    }

    /// Two-stage lookup: the alias table first (verbatim), then the
    /// command table with the name upper-cased.
    pub fn resolve(&self, name: &str) -> Resolution<'_> {
        match self.aliases.get(name) {
            Some(Some(code)) => self.lookup(code),
            Some(None) => Resolution::Unsupported,
            None => self.lookup(&name.to_ascii_uppercase()),
        }
    }

    fn lookup(&self, key: &str) -> Resolution<'_> {
        match self.commands.get(key) {
            Some(Some(command)) => Resolution::Command(command),
            Some(None) => Resolution::Unsupported,
            None => Resolution::NotFound,
        }
    }

    /// The live command behind `name`, if any.
    pub fn command(&self, name: &str) -> Option<&Command> {
        match self.resolve(name) {
            Resolution::Command(command) => Some(command),
            _ => None,
        }
    }

    /// The fast or normal line-move command.
    pub fn line(&self, fast: bool) -> Option<&Command> {
        self.command(if fast { "line_fast" } else { "line_normal" })
    }

    /// The normal or clockwise arc command.
    pub fn arc(&self, clockwise: bool) -> Option<&Command> {
        self.command(if clockwise { "arc_clockwise" } else { "arc_normal" })
    }

    /// Clean one program line: look up its leading token, parse the
    /// parameters, and re-render them canonically.
    ///
    /// Returns `Ok(None)` when the token is unknown or masked. On success
    /// `observer` is fed the canonical key and parameters exactly once.
    /// The token lookup is exact, so lower-case keys do not clean.
    pub fn clean_code(
        &self,
        line: &str,
        mut observer: impl FnMut(&str, &ParamMap),
    ) -> Result<Option<String>, GcodeError> {
        let key = line.split(' ').next().unwrap_or_default();
        let Some(Some(command)) = self.commands.get(key) else {
            tracing::debug!("No supported command behind {:?}", key);
            return Ok(None);
        };
        let params = if self.strict {
            command.parse_strict(line)?
        } else {
            command.parse(line)
        };
        let cleaned =
            command.render(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
        observer(command.key(), &params);
        Ok(Some(cleaned))
    }
}

/// Accumulates command definitions and aliases, then compiles them into an
/// immutable [`InstructionSet`]. Later entries override earlier ones, so a
/// dialect overlay can replace, extend, or mask what it inherits.
#[derive(Debug, Clone, Default)]
pub struct SetBuilder {
    commands: HashMap<String, Option<CommandSpec>>,
    aliases: HashMap<String, Option<String>>,
}

impl SetBuilder {
    /// Add or replace a command definition.
    pub fn command(&mut self, spec: CommandSpec) -> &mut Self {
        self.commands.insert(spec.key().to_string(), Some(spec));
        self
    }

    /// Mask a command so lookups report it as unsupported.
    pub fn mask_command(&mut self, key: &str) -> &mut Self {
        self.commands.insert(key.to_string(), None);
        self
    }

    /// Rework an inherited definition, e.g. to accept extra parameters in
    /// a derived dialect. Fails when there is nothing live to amend.
    pub fn amend(
        &mut self,
        key: &str,
        rework: impl FnOnce(CommandSpec) -> CommandSpec,
    ) -> Result<&mut Self, GcodeError> {
        let Some(Some(spec)) = self.commands.get(key) else {
            return Err(GcodeError::AmendUnknown {
                code: key.to_string(),
            });
        };
        let reworked = rework(spec.clone());
        self.commands.insert(key.to_string(), Some(reworked));
        Ok(self)
    }

    /// Add or replace a function-name alias.
    pub fn alias(&mut self, name: &str, key: &str) -> &mut Self {
        self.aliases.insert(name.to_string(), Some(key.to_string()));
        self
    }

    /// Mask an inherited alias.
    pub fn mask_alias(&mut self, name: &str) -> &mut Self {
        self.aliases.insert(name.to_string(), None);
        self
    }

    /// Compile every definition and freeze the registry. Fails on an alias
    /// pointing at a key the table never defines, or on a grammar that
    /// does not compile.
    pub fn finish(self, strict: bool) -> Result<InstructionSet, GcodeError> {
        let mut commands = HashMap::with_capacity(self.commands.len());
        for (key, spec) in self.commands {
            commands.insert(key, spec.map(Command::compile).transpose()?);
        }
        for (name, target) in &self.aliases {
            if let Some(code) = target {
                if !commands.contains_key(code) {
                    return Err(GcodeError::DanglingAlias {
                        name: name.clone(),
                        code: code.clone(),
                    });
                }
            }
        }
        Ok(InstructionSet {
            commands,
            aliases: self.aliases,
            strict,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_set(strict: bool) -> InstructionSet {
        let mut builder = InstructionSet::builder();
        builder
            .command(CommandSpec::new("G1").params("xyzf").min_params(1))
            .command(CommandSpec::new("G28").params("xyz"))
            .command(CommandSpec::new("M5"))
            .alias("line_normal", "G1")
            .alias("home", "G28")
            .alias("spindle_off", "M5");
        builder.finish(strict).unwrap()
    }

    #[test]
    fn test_resolve_alias_then_key() {
        let set = toy_set(false);
        assert!(matches!(set.resolve("line_normal"), Resolution::Command(c) if c.key() == "G1"));
        assert!(matches!(set.resolve("G1"), Resolution::Command(_)));
        // Raw keys are upper-cased before lookup, alias names are not.
        assert!(matches!(set.resolve("g1"), Resolution::Command(_)));
        assert!(matches!(set.resolve("LINE_NORMAL"), Resolution::NotFound));
        assert!(matches!(set.resolve("G99"), Resolution::NotFound));
    }

    #[test]
    fn test_masking_reports_unsupported() {
        let set = toy_set(false);
        let mut overlay = set.overlay();
        overlay.mask_command("M5").mask_alias("spindle_off");
        let masked = overlay.finish(false).unwrap();
        assert!(matches!(masked.resolve("M5"), Resolution::Unsupported));
        assert!(matches!(masked.resolve("spindle_off"), Resolution::Unsupported));
        // A later overlay can bring the command back.
        let mut revived = masked.overlay();
        revived.command(CommandSpec::new("M5"));
        let revived = revived.finish(false).unwrap();
        assert!(matches!(revived.resolve("M5"), Resolution::Command(_)));
    }

    #[test]
    fn test_amend_extends_inherited_command() {
        let set = toy_set(false);
        let mut overlay = set.overlay();
        overlay.amend("G1", |spec| spec.params("e")).unwrap();
        let derived = overlay.finish(false).unwrap();
        let g1 = derived.command("G1").unwrap();
        assert_eq!(g1.render([("e", "0.4")]).unwrap(), "G1 E0.4");
        // The parent registry keeps its narrower rule set.
        assert!(set.command("G1").unwrap().render([("e", "0.4")]).is_err());
    }

    #[test]
    fn test_amend_unknown_key_fails() {
        let set = toy_set(false);
        let mut overlay = set.overlay();
        assert!(matches!(
            overlay.amend("G99", |spec| spec),
            Err(GcodeError::AmendUnknown { .. })
        ));
    }

    #[test]
    fn test_dangling_alias_fails_finish() {
        let mut builder = InstructionSet::builder();
        builder.alias("ghost", "G404");
        assert!(matches!(
            builder.finish(false),
            Err(GcodeError::DanglingAlias { .. })
        ));
    }

    #[test]
    fn test_clean_code_canonicalizes_and_notifies_once() {
        let set = toy_set(false);
        let mut seen = Vec::new();
        let cleaned = set
            .clean_code("G1 X10 F1500", |code, params| {
                seen.push((code.to_string(), params.clone()));
            })
            .unwrap();
        assert_eq!(cleaned.as_deref(), Some("G1 F1500 X10"));
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "G1");
        assert_eq!(seen[0].1.get("x").map(String::as_str), Some("10"));
    }

    #[test]
    fn test_clean_code_unknown_or_masked_is_silent() {
        let set = toy_set(false);
        let mut fired = false;
        assert!(set.clean_code("T0", |_, _| fired = true).unwrap().is_none());
        // Exact token lookup: a lower-case key does not clean.
        assert!(set.clean_code("g1 x10", |_, _| fired = true).unwrap().is_none());

        let mut overlay = set.overlay();
        overlay.mask_command("G1");
        let masked = overlay.finish(false).unwrap();
        assert!(masked
            .clean_code("G1 X10", |_, _| fired = true)
            .unwrap()
            .is_none());
        assert!(!fired);
    }

    #[test]
    fn test_clean_code_lenient_drops_foreign_parameters() {
        let set = toy_set(false);
        let cleaned = set.clean_code("G1 X10 Q5", |_, _| {}).unwrap();
        assert_eq!(cleaned.as_deref(), Some("G1 X10"));
    }

    #[test]
    fn test_clean_code_strict_rejects_foreign_parameters() {
        let set = toy_set(true);
        let mut fired = false;
        let err = set.clean_code("G1 X10 Q5", |_, _| fired = true).unwrap_err();
        assert!(matches!(err, GcodeError::Malformed { .. }));
        assert!(!fired);
    }

    #[test]
    fn test_clean_code_validation_failure_reaches_caller() {
        let set = toy_set(false);
        // The grammar places nothing, so the minimum-count rule trips.
        assert!(matches!(
            set.clean_code("G1 Q5", |_, _| {}),
            Err(GcodeError::TooFewParams { .. })
        ));
    }
}
