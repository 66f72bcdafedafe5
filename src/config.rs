/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Process-wide configuration.
//!
//! Callers populate the configuration before issuing core calls; afterwards
//! it is read-mostly. The options mirror the external interface contract:
//! EOP database selection and missing-data policy, and the JPL kernel list.

use std::path::PathBuf;
use std::sync::{OnceLock, RwLock};

use crate::errors::{ConfigError, InvalidValueSnafu};

/// Behavior when no EOP record exists for a requested MJD.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Return a zero-filled EOP record silently.
    #[default]
    Pass,
    /// Return a zero-filled EOP record and log a warning.
    Warning,
    /// Surface the error.
    Error,
}

impl MissingPolicy {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "pass" => Ok(Self::Pass),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => InvalidValueSnafu {
                key: "eop.missing_policy",
                value: name,
            }
            .fail(),
        }
    }
}

/// EOP store settings.
#[derive(Clone, Debug)]
pub struct EopSettings {
    pub missing_policy: MissingPolicy,
    /// Name of the registered EOP backend to query.
    pub dbname: String,
    /// Directory holding the IERS text files for the default backend.
    pub folder: Option<PathBuf>,
    /// Variant of the finals files to read ("all", "data" or "daily").
    pub kind: String,
}

impl Default for EopSettings {
    fn default() -> Self {
        Self {
            missing_policy: MissingPolicy::default(),
            dbname: "default".to_owned(),
            folder: None,
            kind: "all".to_owned(),
        }
    }
}

/// Planetary ephemeris settings.
#[derive(Clone, Debug, Default)]
pub struct JplSettings {
    /// SPK kernel files to load.
    pub files: Vec<PathBuf>,
    /// Lazily create frames for unknown planetary frame names.
    pub dynamic_frames: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Config {
    pub eop: EopSettings,
    pub jpl: JplSettings,
}

fn store() -> &'static RwLock<Config> {
    static STORE: OnceLock<RwLock<Config>> = OnceLock::new();
    STORE.get_or_init(|| RwLock::new(Config::default()))
}

impl Config {
    /// Snapshot of the current configuration.
    pub fn get() -> Config {
        store().read().unwrap().clone()
    }

    /// Applies a mutation to the process-wide configuration.
    ///
    /// Meant for initialization; the core reads the configuration on every
    /// EOP or kernel query but never writes it.
    pub fn update(apply: impl FnOnce(&mut Config)) {
        apply(&mut store().write().unwrap())
    }
}

#[cfg(test)]
mod ut_config {
    use super::*;

    #[test]
    fn test_policy_names() {
        assert_eq!(MissingPolicy::from_name("pass").unwrap(), MissingPolicy::Pass);
        assert_eq!(
            MissingPolicy::from_name("warning").unwrap(),
            MissingPolicy::Warning
        );
        assert!(MissingPolicy::from_name("whatever").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.eop.dbname, "default");
        assert_eq!(config.eop.kind, "all");
        assert!(!config.jpl.dynamic_frames);
    }
}
