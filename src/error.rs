//! Fehlerdefinitionen für Session und Konfiguration

use crate::controller::report::ReportError;
use crate::keyboard::translator::TranslateError;
use std::path::PathBuf;
use thiserror::Error;

/// Fehler der Geräte-Session und ihres Actors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Report konnte nicht normalisiert werden
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Kein Tastaturlayout verfügbar
    #[error("No keyboard layout available")]
    LayoutUnavailable,

    /// Übersetzung abgelehnt
    #[error(transparent)]
    Translate(TranslateError),

    /// Transport-Operation fehlgeschlagen
    #[error("Transport error: {0}")]
    Transport(String),

    /// Der Actor läuft nicht mehr
    #[error("Session actor stopped")]
    Stopped,
}

impl From<TranslateError> for SessionError {
    fn from(err: TranslateError) -> Self {
        match err {
            TranslateError::LayoutUnavailable => SessionError::LayoutUnavailable,
            other => SessionError::Translate(other),
        }
    }
}

/// Fehler beim Laden und Schreiben der Konfiguration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file {0} not found")]
    NotFound(PathBuf),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("No config directory available on this system")]
    NoConfigDir,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::report::DeviceKind;

    #[test]
    fn layout_errors_are_lifted() {
        assert!(matches!(
            SessionError::from(TranslateError::LayoutUnavailable),
            SessionError::LayoutUnavailable
        ));
        assert!(matches!(
            SessionError::from(TranslateError::UnsupportedState),
            SessionError::Translate(TranslateError::UnsupportedState)
        ));
    }

    #[test]
    fn report_errors_keep_their_message() {
        let err = SessionError::from(ReportError::Malformed {
            kind: DeviceKind::AllyX,
            len: 3,
        });
        assert_eq!(err.to_string(), "Malformed ROG Ally X report (3 bytes)");
    }
}
