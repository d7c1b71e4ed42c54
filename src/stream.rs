//! Line-oriented stream pipeline: read a program, clean every line
//! against an instruction set, feed an observer, and collect what the
//! machine would ignore.

use std::io::{BufRead, Seek};

use crate::error::GcodeError;
use crate::instruction_set::InstructionSet;
use crate::track::Observer;

/// Where a processor stands in its current pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Finished,
}

/// Streams a G-code program through an instruction set.
///
/// Each pass strips comments into [`comments`](Self::comments), skips
/// blanks, cleans every remaining line, and yields the canonical
/// CRLF-terminated output. Lines the set rejects land in
/// [`errors`](Self::errors) unless the processor runs strict, in which
/// case the pass aborts with the failure. A pass that reaches the end of
/// the source rewinds it, so the next pass replays the same program; an
/// aborted pass leaves the source where it stopped.
#[derive(Debug)]
pub struct StreamProcessor<R, T> {
    set: InstructionSet,
    source: R,
    tracker: T,
    strict: bool,
    phase: Phase,
    comments: Vec<String>,
    errors: Vec<String>,
}

impl<R: BufRead + Seek, T: Observer> StreamProcessor<R, T> {
    /// Pass `()` as `tracker` for plain cleaning without statistics.
    pub fn new(set: InstructionSet, source: R, tracker: T) -> Self {
        Self {
            set,
            source,
            tracker,
            strict: false,
            phase: Phase::Idle,
            comments: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Propagate rejected lines as errors instead of recording them.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Full original lines that carried a `;` comment, latest pass only.
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Lines the instruction set rejected, latest pass only.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn into_tracker(self) -> T {
        self.tracker
    }

    /// Start a pass and iterate its canonical output lines lazily.
    pub fn lines(&mut self) -> Lines<'_, R, T> {
        self.on_start();
        Lines { processor: self }
    }

    /// Run a whole pass eagerly and collect the canonical output.
    pub fn process(&mut self) -> Result<Vec<String>, GcodeError> {
        self.lines().collect()
    }

    fn on_start(&mut self) {
        tracing::debug!("Starting pass over G-code source");
        self.comments.clear();
        self.errors.clear();
        self.tracker.on_start();
        self.phase = Phase::Running;
    }

    fn on_complete(&mut self) -> Result<(), GcodeError> {
        self.phase = Phase::Finished;
        self.tracker.on_complete();
        self.source.rewind()?;
        Ok(())
    }

    fn abort(&mut self, error: GcodeError) -> Option<Result<String, GcodeError>> {
        self.phase = Phase::Finished;
        Some(Err(error))
    }

    fn next_line(&mut self) -> Option<Result<String, GcodeError>> {
        if self.phase == Phase::Finished {
            return None;
        }
        loop {
            let mut raw = String::new();
            match self.source.read_line(&mut raw) {
                Ok(0) => {
                    return match self.on_complete() {
                        Ok(()) => None,
                        Err(error) => Some(Err(error)),
                    };
                }
                Ok(_) => {}
                Err(error) => return self.abort(error.into()),
            }
            let line = raw.trim();
            let candidate = match line.find(';') {
                Some(at) => {
                    self.comments.push(line.to_string());
                    line[..at].trim()
                }
                None => line,
            };
            if candidate.chars().count() <= 1 {
                continue;
            }
            let Self { set, tracker, .. } = self;
            let outcome =
                set.clean_code(candidate, |code, params| tracker.on_command(code, params));
            match outcome {
                Ok(Some(cleaned)) => return Some(Ok(format!("{cleaned}\r\n"))),
                Ok(None) => {
                    if self.strict {
                        return self.abort(GcodeError::UnknownCommand {
                            line: candidate.to_string(),
                        });
                    }
                    tracing::warn!("Unsupported command recorded: {}", candidate);
                    self.errors.push(candidate.to_string());
                }
                Err(error) => {
                    if self.strict {
                        return self.abort(error);
                    }
                    tracing::warn!("Rejected line recorded: {}", candidate);
                    self.errors.push(candidate.to_string());
                }
            }
        }
    }
}

/// Lazy pass over a processor's source, created by
/// [`StreamProcessor::lines`].
#[derive(Debug)]
pub struct Lines<'a, R, T> {
    processor: &'a mut StreamProcessor<R, T>,
}

impl<R: BufRead + Seek, T: Observer> Iterator for Lines<'_, R, T> {
    type Item = Result<String, GcodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.processor.next_line()
    }
}
