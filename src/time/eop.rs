/*
 * Orrery Astrodynamics Core
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Earth Orientation Parameters and the databases serving them.
//!
//! The default backend reads the IERS text files (`tai-utc.dat`,
//! `finals.all`, `finals2000A.all`) directly. Other backends can be
//! registered by name; the one actually queried is selected by the
//! `eop.dbname` configuration entry, and the behavior on missing data by
//! `eop.missing_policy`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use log::warn;
use snafu::prelude::*;

use crate::config::{Config, MissingPolicy};
use crate::errors::{
    BackendInitSnafu, EopError, EopParseSnafu, MissingDataSnafu, UnknownDatabaseSnafu,
};

/// Earth Orientation Parameters at a given date.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Eop {
    /// Polar motion, arcsec
    pub x: f64,
    /// Polar motion, arcsec
    pub y: f64,
    /// CIP offset correction, milliarcsec
    pub dx: f64,
    /// CIP offset correction, milliarcsec
    pub dy: f64,
    /// Nutation correction in longitude, milliarcsec
    pub dpsi: f64,
    /// Nutation correction in obliquity, milliarcsec
    pub deps: f64,
    /// Length of day offset, ms
    pub lod: f64,
    /// UT1 - UTC, seconds
    pub ut1_utc: f64,
    /// TAI - UTC, seconds
    pub tai_utc: f64,
}

/// An EOP database answering queries at a given MJD.
pub trait EopSource: Send + Sync {
    fn record(&self, mjd: f64) -> Result<Eop, EopError>;
}

enum Backend {
    Ready(Arc<dyn EopSource>),
    /// Instantiation failed once; kept so it is not retried on every query.
    Failed(String),
}

fn registry() -> &'static RwLock<HashMap<String, Backend>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, Backend>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Entry point for EOP queries, hiding which database is in use.
pub struct EopDb;

impl EopDb {
    pub const DEFAULT_DBNAME: &'static str = "default";

    /// Registers an EOP database under a name. A name already taken is kept
    /// as is, with a warning.
    pub fn register(name: &str, source: Arc<dyn EopSource>) {
        let mut dbs = registry().write().unwrap();
        if dbs.contains_key(name) {
            warn!("'{name}' is already registered for an Eop database. Skipping");
        } else {
            dbs.insert(name.to_owned(), Backend::Ready(source));
        }
    }

    /// Earth Orientation Parameters at the given MJD, following the
    /// configured missing-data policy.
    pub fn get(mjd: f64) -> Result<Eop, EopError> {
        let config = Config::get();
        match Self::lookup(mjd, &config.eop.dbname) {
            Ok(eop) => Ok(eop),
            Err(err) => match config.eop.missing_policy {
                MissingPolicy::Pass => Ok(Eop::default()),
                MissingPolicy::Warning => {
                    warn!("{err}");
                    Ok(Eop::default())
                }
                MissingPolicy::Error => Err(err),
            },
        }
    }

    fn lookup(mjd: f64, dbname: &str) -> Result<Eop, EopError> {
        {
            let dbs = registry().read().unwrap();
            match dbs.get(dbname) {
                Some(Backend::Ready(db)) => return db.record(mjd),
                Some(Backend::Failed(reason)) => {
                    return BackendInitSnafu {
                        reason: reason.clone(),
                    }
                    .fail();
                }
                None => {
                    ensure!(
                        dbname == Self::DEFAULT_DBNAME,
                        UnknownDatabaseSnafu { name: dbname }
                    );
                }
            }
        }

        // Deferred instantiation of the default file-based database. The
        // outcome, including failure, is cached: building it is expensive and
        // a failure would repeat on every single date construction.
        let built = SimpleEopDatabase::from_config();
        let mut dbs = registry().write().unwrap();
        let backend = dbs.entry(dbname.to_owned()).or_insert_with(|| match built {
            Ok(db) => Backend::Ready(Arc::new(db)),
            Err(e) => Backend::Failed(e.to_string()),
        });
        match backend {
            Backend::Ready(db) => db.record(mjd),
            Backend::Failed(reason) => BackendInitSnafu {
                reason: reason.clone(),
            }
            .fail(),
        }
    }
}

/// Parses a whitespace- or column-aligned float field.
fn field_f64(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    lexical_core::parse::<f64>(trimmed.as_bytes()).ok()
}

/// Leap second table (`tai-utc.dat`).
pub struct TaiUtc {
    data: Vec<(i64, f64)>,
}

impl TaiUtc {
    pub fn load(path: &Path) -> Result<Self, EopError> {
        let content = std::fs::read_to_string(path).map_err(|e| EopError::EopIo { kind: e.kind() })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, EopError> {
        let mut data = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let parsed = (|| {
                let jd = field_f64(fields.get(4)?)?;
                let value = field_f64(fields.get(6)?)?;
                Some(((jd - 2_400_000.5) as i64, value))
            })();
            match parsed {
                Some(entry) => data.push(entry),
                None => {
                    return EopParseSnafu {
                        what: "tai-utc.dat",
                        lineno: lineno + 1,
                    }
                    .fail()
                }
            }
        }
        Ok(Self { data })
    }

    /// TAI-UTC at the given MJD, from the latest leap second before it.
    pub fn get(&self, mjd: f64) -> Option<f64> {
        self.data
            .iter()
            .rev()
            .find(|(entry_mjd, _)| (*entry_mjd as f64) <= mjd)
            .map(|(_, value)| *value)
    }

    /// The last and next leap-second events relative to a date.
    pub fn last_next(&self, mjd: f64) -> (Option<(i64, f64)>, Option<(i64, f64)>) {
        let mut future = None;
        for &(entry_mjd, value) in self.data.iter().rev() {
            if (entry_mjd as f64) <= mjd {
                return (Some((entry_mjd, value)), future);
            }
            future = Some((entry_mjd, value));
        }
        (None, future)
    }
}

/// Partial record from a finals file; dX/dY (or dψ/dε) and LOD inherit the
/// previous day's values when absent.
#[derive(Clone, Copy, Debug, Default)]
struct FinalsRecord {
    x: f64,
    y: f64,
    ut1_utc: f64,
    lod: f64,
    d1: f64,
    d2: f64,
}

/// History of Earth orientation corrections (`finals.*` for the IAU 1980
/// model, `finals2000A.*` for IAU 2000).
pub struct Finals {
    data: HashMap<i64, FinalsRecord>,
}

impl Finals {
    pub fn load(path: &Path) -> Result<Self, EopError> {
        let content = std::fs::read_to_string(path).map_err(|e| EopError::EopIo { kind: e.kind() })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, EopError> {
        let mut data: HashMap<i64, FinalsRecord> = HashMap::new();
        for line in content.lines() {
            let col = |range: std::ops::Range<usize>| -> Option<f64> {
                line.get(range).and_then(field_f64)
            };

            let mjd = match col(7..15) {
                Some(v) => v as i64,
                None => break,
            };

            // When X, Y and UT1-UTC are no longer available the file only
            // holds predictions too far out; reading stops there.
            let (x, y, ut1_utc) = match (col(18..27), col(37..46), col(58..68)) {
                (Some(x), Some(y), Some(dut)) => (x, y, dut),
                _ => break,
            };

            let prev = data.get(&(mjd - 1)).copied().unwrap_or_default();
            let (d1, d2) = match (col(97..106), col(116..125)) {
                (Some(d1), Some(d2)) => (d1, d2),
                _ => (prev.d1, prev.d2),
            };
            let lod = col(79..86).unwrap_or(prev.lod);

            data.insert(
                mjd,
                FinalsRecord {
                    x,
                    y,
                    ut1_utc,
                    lod,
                    d1,
                    d2,
                },
            );
        }
        Ok(Self { data })
    }

    fn get(&self, mjd: i64) -> Option<&FinalsRecord> {
        self.data.get(&mjd)
    }
}

/// Direct reading of the IERS text files, without interpolation.
///
/// The folder holding `tai-utc.dat`, `finals.<kind>` and
/// `finals2000A.<kind>` comes from the `eop.folder` configuration entry, and
/// `<kind>` from `eop.type`.
pub struct SimpleEopDatabase {
    finals: Finals,
    finals2000a: Finals,
    tai_utc: TaiUtc,
}

impl SimpleEopDatabase {
    pub fn new(folder: &Path, kind: &str) -> Result<Self, EopError> {
        let finals = Finals::load(&folder.join(format!("finals.{kind}")))?;
        let finals2000a = Finals::load(&folder.join(format!("finals2000A.{kind}")))?;
        let tai_utc = TaiUtc::load(&folder.join("tai-utc.dat"))?;
        Ok(Self {
            finals,
            finals2000a,
            tai_utc,
        })
    }

    fn from_config() -> Result<Self, EopError> {
        let config = Config::get();
        let folder = config
            .eop
            .folder
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(&folder, &config.eop.kind)
    }
}

impl EopSource for SimpleEopDatabase {
    fn record(&self, mjd: f64) -> Result<Eop, EopError> {
        let day = mjd as i64;
        let f = self.finals.get(day).context(MissingDataSnafu { mjd })?;
        let f2 = self.finals2000a.get(day).context(MissingDataSnafu { mjd })?;
        let tai_utc = self.tai_utc.get(mjd).context(MissingDataSnafu { mjd })?;
        Ok(Eop {
            x: f2.x,
            y: f2.y,
            dx: f2.d1,
            dy: f2.d2,
            dpsi: f.d1,
            deps: f.d2,
            lod: f2.lod,
            ut1_utc: f2.ut1_utc,
            tai_utc,
        })
    }
}

#[cfg(test)]
mod ut_eop {
    use super::*;

    const TAI_UTC: &str = "\
 1980 JAN  1 =JD 2444239.5  TAI-UTC=  19.0       S + (MJD - 41317.) X 0.0      S
 2015 JUL  1 =JD 2457204.5  TAI-UTC=  36.0       S + (MJD - 41317.) X 0.0      S
 2017 JAN  1 =JD 2457754.5  TAI-UTC=  37.0       S + (MJD - 41317.) X 0.0      S
";

    #[test]
    fn test_tai_utc() {
        let table = TaiUtc::parse(TAI_UTC).unwrap();
        assert_eq!(table.get(57000.0), Some(36.0));
        assert_eq!(table.get(58000.0), Some(37.0));
        assert_eq!(table.get(40000.0), None);

        let (last, next) = table.last_next(57000.0);
        assert_eq!(last, Some((56839, 36.0)));
        assert_eq!(next, Some((57754, 37.0)));
    }

    #[test]
    fn test_finals_missing_columns_inherit() {
        // Two records; the second misses dX/dY and LOD and must inherit them.
        let line1 = "73 1 2 41684.00 I  0.120733 0.009786  0.136966 0.015902  I 0.8084178 0.0002710  0.0000 0.1916  P    -0.766    0.199    -0.720    0.300";
        let mut line2 = "73 1 3 41685.00 I  0.118980 0.011039  0.135656 0.013616  I 0.8056163 0.0002710  3.5563 0.1916  P    -0.751    0.199    -0.701    0.300".to_owned();
        // Truncate the second line before LOD so every optional field is gone
        line2.truncate(68);
        let content = format!("{line1}\n{line2}\n");
        let finals = Finals::parse(&content).unwrap();

        let r1 = finals.get(41684).unwrap();
        assert!((r1.x - 0.120733).abs() < 1e-9);
        assert!((r1.ut1_utc - 0.8084178).abs() < 1e-9);
        assert!((r1.d1 - -0.766).abs() < 1e-9);

        let r2 = finals.get(41685).unwrap();
        assert!((r2.x - 0.118980).abs() < 1e-9);
        // inherited from the day before
        assert!((r2.d1 - -0.766).abs() < 1e-9);
        assert!((r2.lod - 0.0).abs() < 1e-9);
    }
}
