//! Resolving the single password that unlocks every key of a run.

use std::io;
use std::path::Path;

use ant_crypto::{KeyName, KeyStore};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Interactive source of secrets.
pub trait PasswordPrompt {
    /// Read one secret after showing `label`.
    fn prompt(&self, label: &str) -> io::Result<Zeroizing<String>>;

    /// Show an informational message to the operator.
    fn notice(&self, _message: &str) {}
}

/// Reads from the controlling terminal with echo disabled.
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn prompt(&self, label: &str) -> io::Result<Zeroizing<String>> {
        rpassword::prompt_password(format!("{}: ", label)).map(Zeroizing::new)
    }

    fn notice(&self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Where the password comes from, highest priority first.
#[derive(Debug, Default, Clone)]
pub struct PasswordSource<'a> {
    pub explicit: Option<&'a str>,
    pub file: Option<&'a Path>,
}

/// Explicit value, then file contents, then the terminal.
///
/// When prompting, an existing network identity key means the node has run
/// before and only the existing password is asked for. Otherwise a new
/// password is asked for twice.
pub fn acquire_password(
    source: &PasswordSource<'_>,
    store: &dyn KeyStore,
    prompt: &dyn PasswordPrompt,
) -> Result<Zeroizing<String>> {
    if let Some(password) = source.explicit.filter(|p| !p.is_empty()) {
        return Ok(Zeroizing::new(password.to_string()));
    }

    if let Some(path) = source.file {
        let contents = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            Error::Io(io::Error::new(e.kind(), format!("password file {}: {}", path.display(), e)))
        })?);
        return Ok(Zeroizing::new(contents.trim_matches('\n').to_string()));
    }

    if store.exists(KeyName::NetworkIdentity)? {
        return Ok(prompt.prompt("Password")?);
    }

    prompt_new_password(prompt)
}

fn prompt_new_password(prompt: &dyn PasswordPrompt) -> Result<Zeroizing<String>> {
    prompt.notice(
        "Ant node is booting up for the first time. \
         Please provide a password to protect your node's keys.\n\
         You will need it on every start, so keep it safe.",
    );

    let password = prompt.prompt("Password")?;
    let confirmation = prompt.prompt("Confirm password")?;

    if *password != *confirmation {
        return Err(Error::Validation("passwords are not the same".into()));
    }

    Ok(password)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use ant_crypto::MemKeyStore;

    use super::*;

    /// Replays canned answers and records the labels it was asked with.
    struct ScriptedPrompt {
        answers: RefCell<VecDeque<&'static str>>,
        asked: RefCell<Vec<String>>,
    }

    impl ScriptedPrompt {
        fn new(answers: &[&'static str]) -> Self {
            Self {
                answers: RefCell::new(answers.iter().copied().collect()),
                asked: RefCell::new(Vec::new()),
            }
        }
    }

    impl PasswordPrompt for ScriptedPrompt {
        fn prompt(&self, label: &str) -> io::Result<Zeroizing<String>> {
            self.asked.borrow_mut().push(label.to_string());
            self.answers
                .borrow_mut()
                .pop_front()
                .map(|a| Zeroizing::new(a.to_string()))
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more answers"))
        }
    }

    #[test]
    fn explicit_password_wins() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("password");
        std::fs::write(&file, "from-file\n").unwrap();

        let prompt = ScriptedPrompt::new(&[]);
        let source = PasswordSource {
            explicit: Some("explicit"),
            file: Some(&file),
        };
        let password = acquire_password(&source, &MemKeyStore::new(), &prompt).unwrap();
        assert_eq!(password.as_str(), "explicit");
        assert!(prompt.asked.borrow().is_empty());
    }

    #[test]
    fn password_file_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("password");
        std::fs::write(&file, "secret with spaces \n").unwrap();

        let prompt = ScriptedPrompt::new(&[]);
        let source = PasswordSource {
            explicit: Some(""),
            file: Some(&file),
        };
        let password = acquire_password(&source, &MemKeyStore::new(), &prompt).unwrap();
        assert_eq!(password.as_str(), "secret with spaces ");
    }

    #[test]
    fn missing_password_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("absent");
        let source = PasswordSource {
            explicit: None,
            file: Some(&file),
        };
        let err =
            acquire_password(&source, &MemKeyStore::new(), &ScriptedPrompt::new(&[])).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn first_run_asks_for_confirmation() {
        let prompt = ScriptedPrompt::new(&["new-pass", "new-pass"]);
        let password =
            acquire_password(&PasswordSource::default(), &MemKeyStore::new(), &prompt).unwrap();
        assert_eq!(password.as_str(), "new-pass");
        assert_eq!(*prompt.asked.borrow(), vec!["Password", "Confirm password"]);
    }

    #[test]
    fn confirmation_mismatch_is_validation_error() {
        let store = MemKeyStore::new();
        let prompt = ScriptedPrompt::new(&["one", "two"]);
        let err = acquire_password(&PasswordSource::default(), &store, &prompt).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(!store.exists(KeyName::NetworkIdentity).unwrap());
    }

    #[test]
    fn existing_identity_asks_once() {
        let store = MemKeyStore::new();
        store.load_or_create(KeyName::NetworkIdentity, "old-pass").unwrap();

        let prompt = ScriptedPrompt::new(&["old-pass"]);
        let password = acquire_password(&PasswordSource::default(), &store, &prompt).unwrap();
        assert_eq!(password.as_str(), "old-pass");
        assert_eq!(*prompt.asked.borrow(), vec!["Password"]);
    }
}
