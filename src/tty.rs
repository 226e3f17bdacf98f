//! Terminal I/O utilities for CLI.
//!
//! Provides TTY detection and user prompting.

use std::io::{self, BufRead, IsTerminal, Write};

pub fn is_stdin_tty() -> bool {
    io::stdin().is_terminal()
}

/// Prompts are only shown when both ends are a terminal.
pub fn can_prompt() -> bool {
    is_stdin_tty() && is_stderr_tty()
}

fn is_stderr_tty() -> bool {
    io::stderr().is_terminal()
}

pub fn prompt(message: &str) -> infragen::Result<String> {
    eprint!("{}", message);
    io::stderr().flush().ok();

    let stdin = io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line).map_err(|e| {
        infragen::Error::new(
            infragen::ErrorCode::InternalIoError,
            format!("Failed to read input: {}", e),
            serde_json::Value::Null,
        )
    })?;

    Ok(line.trim().to_string())
}

/// Prompt for a secret; the terminal does not echo the answer.
pub fn prompt_secret(message: &str) -> infragen::Result<String> {
    let echo = EchoGuard::disable();
    let answer = prompt(message);
    drop(echo);
    eprintln!();
    answer
}

/// Restores the terminal's echo setting on drop.
#[cfg(unix)]
struct EchoGuard {
    original: Option<libc::termios>,
}

#[cfg(unix)]
impl EchoGuard {
    fn disable() -> Self {
        let fd = libc::STDIN_FILENO;
        let mut current = std::mem::MaybeUninit::<libc::termios>::uninit();
        // SAFETY: tcgetattr initialises `current` when it returns 0.
        if unsafe { libc::tcgetattr(fd, current.as_mut_ptr()) } != 0 {
            return Self { original: None };
        }
        let original = unsafe { current.assume_init() };

        let mut silent = original;
        silent.c_lflag &= !libc::ECHO;
        // SAFETY: `silent` is a valid termios copied from the terminal.
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &silent) } != 0 {
            return Self { original: None };
        }
        Self {
            original: Some(original),
        }
    }
}

#[cfg(unix)]
impl Drop for EchoGuard {
    fn drop(&mut self) {
        if let Some(original) = self.original.as_ref() {
            // SAFETY: restores the settings read in `disable`.
            unsafe {
                libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

#[cfg(not(unix))]
struct EchoGuard;

#[cfg(not(unix))]
impl EchoGuard {
    fn disable() -> Self {
        EchoGuard
    }
}

/// Prompt showing `default` in brackets; an empty answer keeps the default.
pub fn prompt_with_default(label: &str, default: &str) -> infragen::Result<String> {
    let answer = if default.is_empty() {
        prompt(&format!("{}: ", label))?
    } else {
        prompt(&format!("{} [{}]: ", label, default))?
    };

    if answer.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer)
    }
}

/// Print status message to stderr if running in a terminal.
pub fn status(message: &str) {
    if io::stderr().is_terminal() {
        eprintln!("{}", message);
    }
}

// log_status! macro is defined in lib.rs (#[macro_export]) and available crate-wide.
