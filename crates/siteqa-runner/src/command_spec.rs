use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use tokio::process::Command as TokioCommand;

use crate::error::RunnerError;

// ============================================================================
// CommandSpec - argv-style process specification
// ============================================================================

/// Specification for a command to execute.
///
/// Arguments are `Vec<OsString>`, never a shell string. Commands read from
/// configuration as a single line are split with shell quoting rules by
/// [`CommandSpec::parse`] and then executed directly.
///
/// # Example
///
/// ```rust
/// use siteqa_runner::CommandSpec;
/// use std::ffi::OsString;
///
/// let cmd = CommandSpec::new("lychee")
///     .arg("--config")
///     .arg("test/lychee.toml")
///     .arg(".")
///     .cwd("/srv/site");
///
/// assert_eq!(cmd.program, OsString::from("lychee"));
/// assert_eq!(cmd.args.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    /// The program to execute
    pub program: OsString,
    /// Arguments as discrete elements (NOT shell strings)
    pub args: Vec<OsString>,
    /// Optional working directory
    pub cwd: Option<PathBuf>,
    /// Optional environment overrides
    pub env: Option<HashMap<OsString, OsString>>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: None,
        }
    }

    /// Split a configured command line into program and arguments.
    ///
    /// Quoting follows POSIX shell word rules, but the result is executed
    /// directly: `$VAR`, globs, pipes and redirects are passed through
    /// literally.
    ///
    /// ```rust
    /// use siteqa_runner::CommandSpec;
    ///
    /// let cmd = CommandSpec::parse("python3 '_scripts/serve.py'").unwrap();
    /// assert_eq!(cmd.program, "python3");
    /// assert_eq!(cmd.args, vec!["_scripts/serve.py"]);
    /// ```
    pub fn parse(line: &str) -> Result<Self, RunnerError> {
        let words = shell_words::split(line).map_err(|e| RunnerError::InvalidCommand {
            command: line.to_string(),
            reason: e.to_string(),
        })?;

        let mut words = words.into_iter();
        let program = words.next().ok_or_else(|| RunnerError::InvalidCommand {
            command: line.to_string(),
            reason: "command is empty".to_string(),
        })?;

        Ok(Self::new(program).args(words))
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Program name, lossily converted for messages.
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Human-readable command line, quoted so it can be pasted into a shell.
    #[must_use]
    pub fn display(&self) -> String {
        let words: Vec<String> = std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|w| w.to_string_lossy().into_owned())
            .collect();
        shell_words::join(words)
    }

    /// Convert this `CommandSpec` into a `tokio::process::Command`.
    #[must_use]
    pub fn to_tokio_command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        if let Some(ref env) = self.env {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        cmd
    }
}
