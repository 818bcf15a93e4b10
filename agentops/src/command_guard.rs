//! Restricted command execution for task-validation metadata.
//!
//! A command string supplied through candidate metadata is hostile input.
//! It must name a bare allowlisted binary, carry no shell metacharacters,
//! and run in array form with no shell in between. Output is discarded;
//! only the exit status matters.

use std::process::{Command, Stdio};
use thiserror::Error;

/// Binaries a validation command may invoke.
pub const ALLOWED_BINARIES: &[&str] = &["go", "pytest", "npm", "make"];

/// Characters that end the conversation immediately.
const REJECTED_METACHARACTERS: &[char] = &[
    ';', '|', '&', '`', '$', '(', ')', '<', '>', '\'', '"', '\\', '\n',
];

/// Why a command string was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandGuardError {
    #[error("empty command")]
    Empty,

    #[error("shell metacharacter {character:?} at position {position}")]
    Metacharacter { character: char, position: usize },

    #[error("binary must be a bare name, got {binary:?}")]
    PathSeparator { binary: String },

    #[error("binary {binary:?} is not allowlisted")]
    NotAllowlisted { binary: String },
}

/// Validate a metadata-supplied command string and split it into argv.
pub fn validate_command(raw: &str) -> Result<Vec<String>, CommandGuardError> {
    for (position, character) in raw.chars().enumerate() {
        if REJECTED_METACHARACTERS.contains(&character) {
            return Err(CommandGuardError::Metacharacter {
                character,
                position,
            });
        }
    }

    let argv: Vec<String> = raw.split_whitespace().map(String::from).collect();
    let Some(binary) = argv.first() else {
        return Err(CommandGuardError::Empty);
    };

    if binary.contains('/') {
        return Err(CommandGuardError::PathSeparator {
            binary: binary.clone(),
        });
    }
    if !ALLOWED_BINARIES.contains(&binary.as_str()) {
        return Err(CommandGuardError::NotAllowlisted {
            binary: binary.clone(),
        });
    }

    Ok(argv)
}

/// Run a validated argv in array form (no shell), output discarded.
/// Returns whether the command exited zero.
pub fn run_validated(argv: &[String]) -> std::io::Result<bool> {
    let status = Command::new(&argv[0])
        .args(&argv[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    Ok(status.success())
}

/// Validate and run in one step.
pub fn run_restricted(raw: &str) -> Result<bool, RestrictedRunError> {
    let argv = validate_command(raw)?;
    Ok(run_validated(&argv)?)
}

/// Validation or spawn failure for [`run_restricted`].
#[derive(Debug, Error)]
pub enum RestrictedRunError {
    #[error(transparent)]
    Guard(#[from] CommandGuardError),

    #[error("spawn failed: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowlisted_commands_pass() {
        assert_eq!(
            validate_command("go test ./...").unwrap(),
            vec!["go", "test", "./..."]
        );
        assert!(validate_command("pytest -x tests").is_ok());
        assert!(validate_command("npm run check").is_ok());
        assert!(validate_command("make verify").is_ok());
    }

    #[test]
    fn test_metacharacters_rejected() {
        for raw in [
            "go test; rm -rf /",
            "make | tee out",
            "npm run x && evil",
            "go `evil`",
            "pytest $(evil)",
            "make < input",
            "go > out",
            "npm 'quoted'",
            "go \"quoted\"",
            "make \\ escape",
            "go test\nevil",
        ] {
            let err = validate_command(raw).unwrap_err();
            assert!(
                matches!(err, CommandGuardError::Metacharacter { .. }),
                "{raw:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_path_separators_rejected() {
        assert!(matches!(
            validate_command("/usr/bin/make test").unwrap_err(),
            CommandGuardError::PathSeparator { .. }
        ));
        assert!(matches!(
            validate_command("./go test").unwrap_err(),
            CommandGuardError::PathSeparator { .. }
        ));
    }

    #[test]
    fn test_unlisted_binaries_rejected() {
        for raw in ["cargo test", "bash -c x", "python x.py", "rm -rf tmp"] {
            assert!(matches!(
                validate_command(raw).unwrap_err(),
                CommandGuardError::NotAllowlisted { .. }
            ));
        }
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(validate_command("").unwrap_err(), CommandGuardError::Empty);
        assert_eq!(
            validate_command("   ").unwrap_err(),
            CommandGuardError::Empty
        );
    }

    #[test]
    fn test_metacharacter_position_reported() {
        let err = validate_command("go test;rm").unwrap_err();
        assert_eq!(
            err,
            CommandGuardError::Metacharacter {
                character: ';',
                position: 7
            }
        );
    }
}
