use std::{
    ffi::{OsStr, OsString},
    io,
    os::unix::process::ExitStatusExt,
    path::PathBuf,
    process::{Command as StdCommand, Output},
};

use log::trace;
use strum_macros::IntoStaticStr;

#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    #[error("Failed to find dependency '{dependency}': {source}")]
    NotFound {
        dependency: Dependency,
        #[source]
        source: which::Error,
    },

    #[error("Failed to execute dependency '{dependency}': {inner}")]
    CouldNotExecute {
        dependency: Dependency,
        #[source]
        inner: io::Error,
    },

    #[error("'{command}' {explanation}{}", stderr_suffix(.stderr))]
    ExecutionFailed {
        dependency: Dependency,
        command: String,
        explanation: String,
        /// Trimmed standard error of the failed run, empty if it wrote nothing.
        stderr: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// External binaries the checks rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Dependency {
    Dmidecode,
    Rpm,
    #[cfg(any(test, feature = "test-utilities"))]
    DoesNotExist,
    #[cfg(any(test, feature = "test-utilities"))]
    Echo,
    #[cfg(any(test, feature = "test-utilities"))]
    False,
    #[cfg(any(test, feature = "test-utilities"))]
    Sh,
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.into())
    }
}

impl Dependency {
    /// Locates the binary in `PATH`.
    pub fn path(&self) -> Result<PathBuf, Box<DependencyError>> {
        which::which(<&str>::from(self)).map_err(|source| {
            Box::new(DependencyError::NotFound {
                dependency: *self,
                source,
            })
        })
    }

    /// Starts building an invocation of the binary.
    pub fn cmd(&self) -> Command {
        Command {
            dependency: *self,
            args: Vec::new(),
        }
    }
}

pub struct Command {
    dependency: Dependency,
    args: Vec<OsString>,
}

impl Command {
    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn with_arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.arg(arg);
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    /// Runs the command and returns its stdout, failing on a non-zero exit.
    pub fn output_and_check(&self) -> Result<String, Box<DependencyError>> {
        self.output()?.check_output()
    }

    /// Command line as it would be typed in a shell, for logs and errors.
    fn render(&self) -> String {
        let mut rendered = self.dependency.to_string();
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.contains(char::is_whitespace) {
                rendered.push_str(&format!(" '{arg}'"));
            } else {
                rendered.push(' ');
                rendered.push_str(&arg);
            }
        }
        rendered
    }

    /// Runs the command and collects its output, whatever the exit status.
    ///
    /// The binary is located first, so a missing dependency is reported
    /// without spawning anything.
    pub fn output(&self) -> Result<CommandOutput, Box<DependencyError>> {
        let path = self.dependency.path()?;
        let command = self.render();
        trace!("Executing '{command}'");

        let inner = StdCommand::new(path)
            .args(&self.args)
            .output()
            .map_err(|inner| DependencyError::CouldNotExecute {
                dependency: self.dependency,
                inner,
            })?;
        let output = CommandOutput {
            command,
            dependency: self.dependency,
            inner,
        };
        trace!(
            "'{}' {}, stdout: {} bytes, stderr: {:?}",
            output.command,
            output.explain_exit(),
            output.inner.stdout.len(),
            output.error_output().trim(),
        );
        Ok(output)
    }
}

#[derive(Debug)]
pub struct CommandOutput {
    command: String,
    dependency: Dependency,
    inner: Output,
}

impl CommandOutput {
    /// Standard output, decoded lossily.
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.inner.stdout).into()
    }

    /// Standard error, decoded lossily.
    pub fn error_output(&self) -> String {
        String::from_utf8_lossy(&self.inner.stderr).into()
    }

    /// Fails with [`DependencyError::ExecutionFailed`] unless the process exited with 0.
    pub fn check(&self) -> Result<(), Box<DependencyError>> {
        if self.inner.status.success() {
            return Ok(());
        }

        Err(Box::new(DependencyError::ExecutionFailed {
            dependency: self.dependency,
            command: self.command.clone(),
            explanation: self.explain_exit(),
            stderr: self.error_output().trim().to_string(),
        }))
    }

    pub fn check_output(&self) -> Result<String, Box<DependencyError>> {
        self.check()?;
        Ok(self.output())
    }

    fn explain_exit(&self) -> String {
        let status = self.inner.status;
        match (status.code(), status.signal()) {
            (Some(code), _) => format!("exited with status: {code}"),
            (None, Some(signal)) => format!("terminated by signal: {signal}"),
            (None, None) => "exited with unknown status".into(),
        }
    }
}
