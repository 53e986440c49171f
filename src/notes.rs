//! Localized release notes read from a directory.
//!
//! Each file named `whatsnew-<locale>`, where the locale itself contains a
//! hyphen (`whatsnew-en-US`, `whatsnew-pt-BR`), supplies the notes for that
//! locale. Other files are ignored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::PublishError;
use crate::publish::release::NotesProvider;

const WHATSNEW_PREFIX: &str = "whatsnew-";

/// Release notes directory, possibly unset.
#[derive(Debug, Clone, Default)]
pub struct ReleaseNotesDir {
    dir: Option<PathBuf>,
}

impl ReleaseNotesDir {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }
}

impl NotesProvider for ReleaseNotesDir {
    fn localized_notes(&self) -> Result<BTreeMap<String, String>, PublishError> {
        match self.dir {
            Some(ref dir) => read_localized_notes(dir),
            None => Ok(BTreeMap::new()),
        }
    }
}

/// Locale encoded in a release notes file name, if it follows the convention.
pub fn locale_from_file_name(name: &str) -> Option<&str> {
    let locale = name.strip_prefix(WHATSNEW_PREFIX)?;
    locale.contains('-').then_some(locale)
}

/// Read every `whatsnew-<locale>` file in `dir`.
///
/// A missing directory yields no notes rather than an error.
pub fn read_localized_notes(dir: &Path) -> Result<BTreeMap<String, String>, PublishError> {
    let mut notes = BTreeMap::new();
    if !dir.is_dir() {
        tracing::debug!("Release notes directory {} not found", dir.display());
        return Ok(notes);
    }

    let entries = std::fs::read_dir(dir).map_err(PublishError::io(dir))?;
    for entry in entries {
        let entry = entry.map_err(PublishError::io(dir))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(locale) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(locale_from_file_name)
        else {
            continue;
        };

        let bytes = std::fs::read(&path).map_err(PublishError::io(&path))?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    "Release notes {} are not valid UTF-8, replacing invalid bytes",
                    path.display()
                );
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        notes.insert(locale.to_string(), text);
    }

    if notes.is_empty() {
        tracing::debug!("No release notes found");
    } else {
        for (locale, text) in &notes {
            tracing::debug!(locale = %locale, "Release notes: {}", text);
        }
    }
    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_requires_hyphen() {
        assert_eq!(locale_from_file_name("whatsnew-en-US"), Some("en-US"));
        assert_eq!(locale_from_file_name("whatsnew-zh-Hant-TW"), Some("zh-Hant-TW"));
        assert_eq!(locale_from_file_name("whatsnew-en"), None);
        assert_eq!(locale_from_file_name("readme.txt"), None);
        assert_eq!(locale_from_file_name("notes-whatsnew-en-US"), None);
    }
}
