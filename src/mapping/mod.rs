//! Mapping-Tabelle und Key-Codes
//!
//! Enthält die Button-, Trigger- und Stick-Konfiguration, die der Diff Engine
//! sagt, welcher Key-Code oder welche Maus-Funktion ausgelöst wird.

pub mod codes;
pub mod config;

pub use codes::{Binding, CodeParseError, KeyCode, MouseFunction};
pub use config::{ButtonBindings, DirectionMode, MappingConfig, ResponseCurve, StickConfig, StickMode};
