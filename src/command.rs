//! Single-command model: parameter rules, canonical rendering, and a
//! compiled grammar that pulls parameters back out of program text.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::error::GcodeError;

/// Parameters of one command, keyed by lower-case parameter letter. Values
/// keep their original spelling so a clean round-trips byte for byte.
pub type ParamMap = BTreeMap<String, String>;

/// Trailing-argument policy for commands that carry unnamed tokens, like
/// `M23 <filename>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgPolicy {
    /// No trailing tokens accepted.
    #[default]
    Forbidden,
    /// Trailing tokens accepted but not required.
    Allowed,
    /// At least this many trailing tokens required.
    Required(usize),
}

/// Rules for one command: the key, which parameter letters it accepts or
/// requires, friendly names for them, and how many must be present.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    key: String,
    valid: BTreeSet<char>,
    required: BTreeSet<char>,
    aliases: BTreeMap<String, char>,
    min_params: usize,
    args: ArgPolicy,
}

impl CommandSpec {
    /// `key` is the category letter plus code, e.g. `"G1"` or `"G17.1"`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            valid: BTreeSet::new(),
            required: BTreeSet::new(),
            aliases: BTreeMap::new(),
            min_params: 0,
            args: ArgPolicy::Forbidden,
        }
    }

    /// Accept these parameter letters.
    pub fn params(mut self, letters: &str) -> Self {
        self.valid.extend(letters.chars().map(|c| c.to_ascii_lowercase()));
        self
    }

    /// Require these parameter letters on every render (implies accepting
    /// them).
    pub fn required(mut self, letters: &str) -> Self {
        for letter in letters.chars() {
            let letter = letter.to_ascii_lowercase();
            self.valid.insert(letter);
            self.required.insert(letter);
        }
        self
    }

    /// Map a friendly parameter name onto a letter, e.g. `speed` -> `f`.
    pub fn alias(mut self, name: &str, letter: char) -> Self {
        self.aliases.insert(name.to_string(), letter.to_ascii_lowercase());
        self
    }

    /// Require at least this many accepted parameters, whichever they are.
    pub fn min_params(mut self, min: usize) -> Self {
        self.min_params = min;
        self
    }

    /// Set the trailing-argument policy.
    pub fn args(mut self, policy: ArgPolicy) -> Self {
        self.args = policy;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn arg_policy(&self) -> ArgPolicy {
        self.args
    }

    /// Resolve a caller-supplied parameter name to its letter. Aliases
    /// match verbatim, single letters match case-insensitively.
    fn resolve_name(&self, name: &str) -> Result<char, GcodeError> {
        let letter = match self.aliases.get(name) {
            Some(&letter) => letter,
            None => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c.to_ascii_lowercase(),
                    _ => {
                        return Err(GcodeError::InvalidParam {
                            code: self.key.clone(),
                            name: name.to_string(),
                        });
                    }
                }
            }
        };
        if self.valid.contains(&letter) {
            Ok(letter)
        } else {
            Err(GcodeError::InvalidParam {
                code: self.key.clone(),
                name: letter.to_string(),
            })
        }
    }

    /// Validate parameters and resolve their names, preserving supply
    /// order.
    fn accept<'a, I>(&self, params: I) -> Result<Vec<(char, &'a str)>, GcodeError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut accepted = Vec::new();
        for (name, value) in params {
            accepted.push((self.resolve_name(name)?, value));
        }
        if accepted.len() < self.min_params {
            return Err(GcodeError::TooFewParams {
                code: self.key.clone(),
                min: self.min_params,
                valid: self.valid.iter().collect(),
            });
        }
        for letter in &self.required {
            if !accepted.iter().any(|(l, _)| l == letter) {
                return Err(GcodeError::MissingParam {
                    code: self.key.clone(),
                    name: *letter,
                });
            }
        }
        Ok(accepted)
    }

    /// Build the canonical command string from `(name, value)` pairs.
    /// Parameter letters are upper-cased, values emitted verbatim, and the
    /// caller's ordering kept.
    pub fn render<'a, I>(&self, params: I) -> Result<String, GcodeError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.render_args(params, &[])
    }

    /// Like [`CommandSpec::render`], with trailing argument tokens for
    /// commands that take them.
    pub fn render_args<'a, I>(&self, params: I, args: &[&str]) -> Result<String, GcodeError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        match self.args {
            ArgPolicy::Required(required) if args.len() < required => {
                return Err(GcodeError::MissingArgs {
                    code: self.key.clone(),
                    required,
                });
            }
            ArgPolicy::Forbidden if !args.is_empty() => {
                return Err(GcodeError::UnexpectedArgs {
                    code: self.key.clone(),
                });
            }
            _ => {}
        }
        let accepted = self.accept(params)?;
        let mut out = self.key.clone();
        for (letter, value) in accepted {
            out.push(' ');
            out.push(letter.to_ascii_uppercase());
            out.push_str(value);
        }
        for arg in args {
            out.push(' ');
            out.push_str(arg);
        }
        Ok(out)
    }
}

/// Compiled matcher for one command's parameter section. Deterministic in
/// the rule sets, so equal specs always compile to the same pattern.
#[derive(Debug, Clone)]
pub struct Grammar {
    regex: Regex,
}

impl Grammar {
    pub fn compile(spec: &CommandSpec) -> Result<Self, GcodeError> {
        let mut pattern = format!("({}) ?", regex::escape(&spec.key));
        let required: Vec<String> = spec.required.iter().map(|&c| letter_piece(c)).collect();
        let optional: Vec<String> = spec
            .valid
            .difference(&spec.required)
            .map(|&c| letter_piece(c))
            .collect();
        match required.len() {
            0 => {}
            1 => pattern.push_str(&required[0]),
            n => {
                pattern.push_str(&format!("(?:{}){{{}}}", required.join("|"), n));
            }
        }
        if !optional.is_empty() {
            pattern.push_str(&format!(
                "(?:{}){{{},}}",
                optional.join("|"),
                spec.min_params
            ));
        }
        Ok(Self {
            regex: Regex::new(&pattern)?,
        })
    }

    /// Whether the pattern matches `text` from the first byte to the last.
    pub fn matches_fully(&self, text: &str) -> bool {
        self.regex
            .find(text)
            .is_some_and(|m| m.start() == 0 && m.end() == text.len())
    }

    /// Pull letter/value pairs out of the leftmost match in `text`. Never
    /// fails; text the pattern cannot place is simply left behind.
    pub fn extract(&self, text: &str) -> ParamMap {
        let mut params = ParamMap::new();
        if let Some(caps) = self.regex.captures(text) {
            for name in self.regex.capture_names().flatten() {
                if let Some(group) = caps.name(name) {
                    // Drop the leading parameter letter, keep the value text.
                    params.insert(name.to_string(), group.as_str()[1..].to_string());
                }
            }
        }
        params
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// One parameter: the letter in either case, then a signed decimal value.
fn letter_piece(letter: char) -> String {
    format!(
        "(?P<{lower}>[{lower}{upper}]-?\\d+\\.?\\d*) ?",
        lower = letter,
        upper = letter.to_ascii_uppercase()
    )
}

/// A command definition bundled with its compiled grammar.
#[derive(Debug, Clone)]
pub struct Command {
    spec: CommandSpec,
    grammar: Grammar,
}

impl Command {
    pub fn compile(spec: CommandSpec) -> Result<Self, GcodeError> {
        let grammar = Grammar::compile(&spec)?;
        Ok(Self { spec, grammar })
    }

    pub fn key(&self) -> &str {
        self.spec.key()
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Render from `(name, value)` pairs; see [`CommandSpec::render`].
    pub fn render<'a, I>(&self, params: I) -> Result<String, GcodeError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.spec.render(params)
    }

    /// Render with trailing argument tokens.
    pub fn render_args<'a, I>(&self, params: I, args: &[&str]) -> Result<String, GcodeError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.spec.render_args(params, args)
    }

    /// Best-effort parameter extraction. Text for a different command, or
    /// text the grammar cannot place, yields an empty map.
    // TODO: extract trailing tokens for ArgPolicy commands; the grammar only
    // covers lettered parameters, so cleaning `M23 <file>` loses the file
    // token today.
    pub fn parse(&self, text: &str) -> ParamMap {
        let text = text.trim();
        if !text.starts_with(self.spec.key()) {
            return ParamMap::new();
        }
        self.grammar.extract(text)
    }

    /// Parse with full validation: the text must carry this command's key
    /// and match the grammar from start to end.
    pub fn parse_strict(&self, text: &str) -> Result<ParamMap, GcodeError> {
        let text = text.trim();
        if !text.starts_with(self.spec.key()) {
            return Err(GcodeError::WrongCommand {
                code: self.spec.key().to_string(),
                text: text.to_string(),
            });
        }
        if !self.grammar.matches_fully(text) {
            return Err(GcodeError::Malformed {
                code: self.spec.key().to_string(),
                text: text.to_string(),
            });
        }
        Ok(self.grammar.extract(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_move() -> Command {
        Command::compile(
            CommandSpec::new("G1")
                .params("xyzf")
                .alias("speed", 'f')
                .min_params(1),
        )
        .unwrap()
    }

    fn arc_move() -> Command {
        Command::compile(
            CommandSpec::new("G2")
                .params("f")
                .required("xyij")
                .alias("speed", 'f'),
        )
        .unwrap()
    }

    #[test]
    fn test_render_basic() {
        let g1 = line_move();
        let code = g1.render([("x", "10"), ("f", "1500")]).unwrap();
        assert_eq!(code, "G1 X10 F1500");
    }

    #[test]
    fn test_render_resolves_aliases_and_case() {
        let g1 = line_move();
        assert_eq!(g1.render([("speed", "1500")]).unwrap(), "G1 F1500");
        assert_eq!(g1.render([("X", "-2.5")]).unwrap(), "G1 X-2.5");
    }

    #[test]
    fn test_render_preserves_caller_order() {
        let g1 = line_move();
        let code = g1.render([("z", "3"), ("x", "1")]).unwrap();
        assert_eq!(code, "G1 Z3 X1");
    }

    #[test]
    fn test_render_rejects_unknown_parameter() {
        let g1 = line_move();
        let err = g1.render([("x", "10"), ("q", "5")]).unwrap_err();
        assert!(matches!(err, GcodeError::InvalidParam { .. }));
    }

    #[test]
    fn test_render_enforces_minimum_count() {
        let g1 = line_move();
        assert!(matches!(
            g1.render([]),
            Err(GcodeError::TooFewParams { min: 1, .. })
        ));
    }

    #[test]
    fn test_render_enforces_required_parameters() {
        let g2 = arc_move();
        let err = g2
            .render([("x", "1"), ("y", "2"), ("i", "0")])
            .unwrap_err();
        assert!(matches!(err, GcodeError::MissingParam { name: 'j', .. }));
        let code = g2
            .render([("x", "1"), ("y", "2"), ("i", "0"), ("j", "4")])
            .unwrap();
        assert_eq!(code, "G2 X1 Y2 I0 J4");
    }

    #[test]
    fn test_render_args_policy() {
        let select = Command::compile(
            CommandSpec::new("M23").args(ArgPolicy::Required(1)),
        )
        .unwrap();
        assert_eq!(
            select.render_args([], &["part.gco"]).unwrap(),
            "M23 part.gco"
        );
        assert!(matches!(
            select.render([]),
            Err(GcodeError::MissingArgs { required: 1, .. })
        ));

        let bare = Command::compile(CommandSpec::new("M5")).unwrap();
        assert!(matches!(
            bare.render_args([], &["nope"]),
            Err(GcodeError::UnexpectedArgs { .. })
        ));
    }

    #[test]
    fn test_render_args_allowed_takes_or_leaves_tokens() {
        let echo = Command::compile(
            CommandSpec::new("M118").args(ArgPolicy::Allowed),
        )
        .unwrap();
        assert_eq!(echo.render([]).unwrap(), "M118");
        assert_eq!(
            echo.render_args([], &["ready", "to", "print"]).unwrap(),
            "M118 ready to print"
        );
    }

    #[test]
    fn test_parse_extracts_known_parameters() {
        let g1 = line_move();
        let params = g1.parse("G1 X10 Y-2.5 F1500");
        assert_eq!(params.get("x").map(String::as_str), Some("10"));
        assert_eq!(params.get("y").map(String::as_str), Some("-2.5"));
        assert_eq!(params.get("f").map(String::as_str), Some("1500"));
    }

    #[test]
    fn test_parse_drops_what_the_grammar_cannot_place() {
        let g1 = line_move();
        let params = g1.parse("G1 X10 Q5");
        assert_eq!(params.get("x").map(String::as_str), Some("10"));
        assert!(!params.contains_key("q"));
    }

    #[test]
    fn test_parse_other_command_yields_empty() {
        let g1 = line_move();
        assert!(g1.parse("M104 S200").is_empty());
    }

    #[test]
    fn test_parse_strict_accepts_exact_text() {
        let g1 = line_move();
        let params = g1.parse_strict("G1 X10 F1500").unwrap();
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_parse_strict_rejects_leftover_text() {
        let g1 = line_move();
        assert!(matches!(
            g1.parse_strict("G1 X10 Q5"),
            Err(GcodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_parse_strict_rejects_wrong_command() {
        let g1 = line_move();
        assert!(matches!(
            g1.parse_strict("M104 S200"),
            Err(GcodeError::WrongCommand { .. })
        ));
    }

    #[test]
    fn test_fractional_key_round_trip() {
        let plane = Command::compile(CommandSpec::new("G17.1")).unwrap();
        assert_eq!(plane.render([]).unwrap(), "G17.1");
        assert!(plane.parse_strict("G17.1").unwrap().is_empty());
        // The dot must not behave as a regex wildcard.
        assert!(plane.parse_strict("G17x1").is_err());
    }

    #[test]
    fn test_round_trip_preserves_value_text() {
        let g1 = line_move();
        let code = g1.render([("x", "10.50"), ("f", "0600")]).unwrap();
        let params = g1.parse_strict(&code).unwrap();
        assert_eq!(params.get("x").map(String::as_str), Some("10.50"));
        assert_eq!(params.get("f").map(String::as_str), Some("0600"));
        // Cleaning is idempotent once parameters sit in canonical order.
        let canonical = g1
            .render(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .unwrap();
        assert_eq!(g1.parse_strict(&canonical).unwrap(), params);
    }

    #[test]
    fn test_duplicate_letter_keeps_last_match() {
        let g1 = line_move();
        let params = g1.parse("G1 X5 X7");
        assert_eq!(params.get("x").map(String::as_str), Some("7"));
    }
}
