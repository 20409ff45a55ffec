//! Interactive setup on the controlling terminal.

use crate::console;
use lcsx::config::validation;
use lcsx::errors::{LcsxError, ValidationError};
use lcsx::runtime::constants::defaults::GOTTY_PORT;
use lcsx::{
    Distro, LcsxResult, Secret, SetupAnswers, SetupRequest, SetupSource, TerminalKind,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Attempts per field before setup gives up.
const MAX_ATTEMPTS: u32 = 5;

/// Asks the operator line by line, re-asking invalid answers.
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self, question: &str) -> LcsxResult<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(LcsxError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed during setup",
            )));
        }
        Ok(line.trim().to_string())
    }

    /// Ask until `parse` accepts the answer or attempts run out.
    fn ask<T>(
        &mut self,
        field: &'static str,
        question: &str,
        mut parse: impl FnMut(&str) -> Result<T, ValidationError>,
    ) -> LcsxResult<T> {
        for attempt in 1..=MAX_ATTEMPTS {
            let answer = self.read_line(question)?;
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::debug!(field, attempt, "Rejected answer: {}", e);
                    writeln!(self.output, "[⨯] {e}")?;
                }
            }
        }
        Err(ValidationError::Exhausted {
            field,
            attempts: MAX_ATTEMPTS,
        }
        .into())
    }

    /// Numbered menu; an empty answer picks the first entry.
    fn choose<T: Copy + std::fmt::Display>(
        &mut self,
        field: &'static str,
        title: &str,
        items: &[T],
    ) -> LcsxResult<T> {
        writeln!(self.output, "{title}")?;
        for (i, item) in items.iter().enumerate() {
            writeln!(self.output, "  {}) {}", i + 1, item)?;
        }
        let question = format!("Choice [1-{}] (1): ", items.len());
        self.ask(field, &question, |answer| {
            if answer.is_empty() {
                return Ok(items[0]);
            }
            answer
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| items.get(i).copied())
                .ok_or_else(|| ValidationError::Choice(format!("'{answer}' is not a listed option")))
        })
    }
}

impl<R: BufRead, W: Write> SetupSource for ConsolePrompt<R, W> {
    fn choose_data_dir(&mut self, default: &Path) -> LcsxResult<PathBuf> {
        let question = format!("Data directory ({}): ", default.display());
        self.ask("data_dir", &question, |answer| {
            if answer.is_empty() {
                Ok(default.to_path_buf())
            } else {
                validation::resolve_data_dir(answer)
            }
        })
    }

    fn collect(&mut self, request: &SetupRequest) -> LcsxResult<SetupAnswers> {
        let user = self.ask("user", "Username: ", |answer| {
            validation::validate_username(answer).map(|()| answer.to_string())
        })?;
        let hostname = self.ask("hostname", "Hostname: ", |answer| {
            validation::validate_hostname(answer).map(|()| answer.to_string())
        })?;
        let password = self.ask("password", "Password: ", |answer| {
            validation::validate_password(answer).map(|()| Secret::new(answer))
        })?;

        let distro = match request.distro {
            Some(distro) => distro,
            None => self.choose("distro", "Distribution:", &Distro::ALL)?,
        };
        let terminal = match request.terminal {
            Some(kind) => kind,
            None => self.choose(
                "terminal",
                "Terminal service:",
                &[TerminalKind::Native, TerminalKind::Sshx, TerminalKind::Gotty],
            )?,
        };
        let port = match (terminal, request.port) {
            (_, Some(port)) => port,
            (TerminalKind::Gotty, None) => {
                let question = format!("gotty port ({GOTTY_PORT}): ");
                self.ask("port", &question, |answer| {
                    if answer.is_empty() {
                        Ok(GOTTY_PORT)
                    } else {
                        validation::parse_port(answer)
                    }
                })?
            }
            _ => GOTTY_PORT,
        };

        Ok(SetupAnswers {
            user,
            hostname,
            password,
            distro,
            terminal,
            port,
        })
    }

    fn confirm_basic_auth(&mut self) -> LcsxResult<bool> {
        self.ask(
            "credential",
            "Require the system user and password for gotty? [y/N]: ",
            |answer| match answer.to_ascii_lowercase().as_str() {
                "" | "n" | "no" => Ok(false),
                "y" | "yes" => Ok(true),
                other => Err(ValidationError::Choice(format!(
                    "answer 'y' or 'n', not '{other}'"
                ))),
            },
        )
    }
}

/// Prints `banner` once, when setup actually begins.
///
/// Reconciling an existing record may still ask about basic auth, which
/// does not count as setup.
pub struct Announce<S> {
    inner: S,
    banner: &'static str,
    shown: bool,
}

impl<S: SetupSource> Announce<S> {
    pub fn new(inner: S, banner: &'static str) -> Self {
        Self {
            inner,
            banner,
            shown: false,
        }
    }

    fn announce(&mut self) {
        if !self.shown {
            self.shown = true;
            console::status(self.banner);
        }
    }
}

impl<S: SetupSource> SetupSource for Announce<S> {
    fn choose_data_dir(&mut self, default: &Path) -> LcsxResult<PathBuf> {
        self.announce();
        self.inner.choose_data_dir(default)
    }

    fn collect(&mut self, request: &SetupRequest) -> LcsxResult<SetupAnswers> {
        self.announce();
        self.inner.collect(request)
    }

    fn confirm_basic_auth(&mut self) -> LcsxResult<bool> {
        self.inner.confirm_basic_auth()
    }
}
