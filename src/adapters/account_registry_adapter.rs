//! Plain-text account registry: one account name per line, most recently
//! used first.

use crate::domain::error::TradelogError;
use crate::ports::account_registry::{AccountRegistry, DEFAULT_ACCOUNT};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub const REGISTRY_FILE: &str = "account_names.txt";

pub struct FileAccountRegistry {
    path: PathBuf,
}

impl FileAccountRegistry {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Registry stored as [`REGISTRY_FILE`] inside `data_dir`.
    pub fn in_dir(data_dir: &std::path::Path) -> Self {
        Self::new(data_dir.join(REGISTRY_FILE))
    }

    fn read(&self) -> Result<Option<Vec<String>>, TradelogError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, names: &[String]) -> Result<(), TradelogError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let mut content = names.join("\n");
        content.push('\n');
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Names on disk, creating the registry with the default account when
    /// there is none yet.
    fn names_or_init(&self) -> Result<Vec<String>, TradelogError> {
        match self.read()? {
            Some(names) if !names.is_empty() => Ok(names),
            _ => {
                let names = vec![DEFAULT_ACCOUNT.to_string()];
                self.write(&names)?;
                tracing::info!(
                    path = %self.path.display(),
                    account = DEFAULT_ACCOUNT,
                    "no account registry found, created one with the default account"
                );
                Ok(names)
            }
        }
    }
}

fn validate_name(name: &str) -> Result<&str, TradelogError> {
    let trimmed = name.trim();
    let bad = trimmed.is_empty()
        || trimmed
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '\\' | ':'));
    if bad {
        return Err(TradelogError::InvalidInput {
            reason: format!("'{name}' is not a usable account name"),
        });
    }
    Ok(trimmed)
}

impl AccountRegistry for FileAccountRegistry {
    fn current_account_name(&self) -> Result<String, TradelogError> {
        let names = self.names_or_init()?;
        Ok(names[0].clone())
    }

    fn switch_or_create(&self, name: &str) -> Result<Vec<String>, TradelogError> {
        let name = validate_name(name)?;
        let mut names = self.read()?.unwrap_or_default();

        let existed = names.iter().any(|n| n == name);
        names.retain(|n| n != name);
        names.insert(0, name.to_string());
        self.write(&names)?;

        if existed {
            tracing::info!(account = name, "switched to existing account");
        } else {
            tracing::info!(account = name, "switched to new account");
        }
        Ok(names)
    }

    fn account_names(&self) -> Result<Vec<String>, TradelogError> {
        self.names_or_init()
    }
}
