//! Store configuration, backed by cvars.

use shaman_common::common::{com_dprintf, com_warnf};
use shaman_common::cvar::{CvarContext, CvarFlags};

pub const DEFAULT_TABLES: usize = 16;
pub const DEFAULT_ROWS: usize = 16;
/// Largest accepted value for either grid dimension.
pub const MAX_DIMENSION: usize = 1024;

const SH_TABLES: &str = "sh_tables";
const SH_ROWS: &str = "sh_rows";
const SH_WARN_ATTRIB: &str = "sh_warn_attrib";
const SH_WARN_UNIFORM: &str = "sh_warn_uniform";

/// Tunables for a [`ProgramStore`](crate::store::ProgramStore) and the name
/// lookup helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Number of tables in the store.
    pub tables: usize,
    /// Rows per table.
    pub rows: usize,
    /// Warn when an attribute name is not found in a program.
    pub warn_missing_attrib: bool,
    /// Warn when a uniform name is not found in a program.
    pub warn_missing_uniform: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            tables: DEFAULT_TABLES,
            rows: DEFAULT_ROWS,
            warn_missing_attrib: true,
            warn_missing_uniform: true,
        }
    }
}

/// Read a grid dimension. Values that are not finite fall back to `default`,
/// the rest are clamped to `1..=MAX_DIMENSION`. A corrected value is written
/// back to the cvar.
fn dimension(cvars: &mut CvarContext, name: &str, default: usize) -> usize {
    let value = cvars.variable_value(name);
    let sane = if !value.is_finite() {
        com_warnf(&format!(
            "{} must be a number, got \"{}\"; using {}\n",
            name,
            cvars.variable_string(name),
            default
        ));
        default
    } else if value < 1.0 {
        com_warnf(&format!("{} must be at least 1, got \"{}\"\n", name, cvars.variable_string(name)));
        1
    } else if value > MAX_DIMENSION as f32 {
        com_warnf(&format!(
            "{} must be at most {}, got \"{}\"\n",
            name,
            MAX_DIMENSION,
            cvars.variable_string(name)
        ));
        MAX_DIMENSION
    } else {
        return value as usize;
    };
    cvars.set_value(name, sane as f32);
    sane
}

fn flag(cvars: &CvarContext, name: &str) -> bool {
    cvars.variable_value(name) != 0.0
}

impl StoreConfig {
    pub fn new(tables: usize, rows: usize) -> Self {
        Self {
            tables,
            rows,
            ..Self::default()
        }
    }

    /// Register the store cvars with their defaults. Existing values are kept.
    pub fn register(cvars: &mut CvarContext) {
        cvars.get(SH_TABLES, &DEFAULT_TABLES.to_string(), CvarFlags::ARCHIVE);
        cvars.get(SH_ROWS, &DEFAULT_ROWS.to_string(), CvarFlags::ARCHIVE);
        cvars.get(SH_WARN_ATTRIB, "1", CvarFlags::ARCHIVE);
        cvars.get(SH_WARN_UNIFORM, "1", CvarFlags::ARCHIVE);
    }

    /// Build a config from the cvars, registering any that are missing.
    /// Out-of-range dimensions are corrected; see [`MAX_DIMENSION`].
    pub fn from_cvars(cvars: &mut CvarContext) -> Self {
        Self::register(cvars);
        let config = Self {
            tables: dimension(cvars, SH_TABLES, DEFAULT_TABLES),
            rows: dimension(cvars, SH_ROWS, DEFAULT_ROWS),
            warn_missing_attrib: flag(cvars, SH_WARN_ATTRIB),
            warn_missing_uniform: flag(cvars, SH_WARN_UNIFORM),
        };
        for name in [SH_TABLES, SH_ROWS, SH_WARN_ATTRIB, SH_WARN_UNIFORM] {
            cvars.take_modified(name);
        }
        config
    }

    /// Pick up warning switches changed since the last read. The grid of a
    /// live store cannot be resized, so dimension changes are only reported.
    /// Returns true if anything was applied.
    pub fn refresh(&mut self, cvars: &mut CvarContext) -> bool {
        let mut applied = false;
        if cvars.take_modified(SH_WARN_ATTRIB) {
            self.warn_missing_attrib = flag(cvars, SH_WARN_ATTRIB);
            applied = true;
        }
        if cvars.take_modified(SH_WARN_UNIFORM) {
            self.warn_missing_uniform = flag(cvars, SH_WARN_UNIFORM);
            applied = true;
        }
        if cvars.take_modified(SH_TABLES) | cvars.take_modified(SH_ROWS) {
            com_dprintf("store dimensions changed; they apply to the next store\n");
        }
        applied
    }

    /// Number of slots, `None` if the grid does not fit in `usize`.
    pub fn capacity(&self) -> Option<usize> {
        self.tables.checked_mul(self.rows)
    }
}
