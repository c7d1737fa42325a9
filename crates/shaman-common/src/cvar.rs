//! Console-style configuration variables.
//!
//! Settings are named string/float pairs that can be registered with a
//! default, changed at runtime, applied from `set name value` text and
//! written back out for archiving.

use crate::common::{com_dprintf, com_printf};

use std::collections::HashMap;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CvarFlags: u32 {
        /// Written out by `write_variables`.
        const ARCHIVE = 0x01;
    }
}

/// A configuration variable.
#[derive(Clone, Debug)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub flags: CvarFlags,
    pub modified: bool,
    pub value: f32,
}

/// The set of registered variables.
#[derive(Default)]
pub struct CvarContext {
    pub cvar_vars: Vec<Cvar>,
    /// O(1) lookup by name -> index in cvar_vars
    cvar_index: HashMap<String, usize>,
}

fn parse_value(s: &str) -> f32 {
    s.trim().parse::<f32>().unwrap_or(0.0)
}

impl CvarContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.cvar_index.get(name).map(|&idx| &self.cvar_vars[idx])
    }

    /// Floating-point value of a variable. Returns 0 if not found.
    pub fn variable_value(&self, name: &str) -> f32 {
        self.find_var(name).map_or(0.0, |var| var.value)
    }

    /// String value of a variable. Returns "" if not found.
    pub fn variable_string(&self, name: &str) -> &str {
        self.find_var(name).map_or("", |var| var.string.as_str())
    }

    /// Get or create a variable. An existing variable keeps its value but
    /// gains the given flags.
    pub fn get(&mut self, name: &str, value: &str, flags: CvarFlags) -> usize {
        if let Some(&idx) = self.cvar_index.get(name) {
            self.cvar_vars[idx].flags |= flags;
            return idx;
        }

        let idx = self.cvar_vars.len();
        self.cvar_vars.push(Cvar {
            name: name.to_string(),
            string: value.to_string(),
            flags,
            modified: true,
            value: parse_value(value),
        });
        self.cvar_index.insert(name.to_string(), idx);
        idx
    }

    /// Set a variable. Unknown names are created.
    pub fn set(&mut self, name: &str, value: &str) -> usize {
        let idx = match self.cvar_index.get(name) {
            Some(&idx) => idx,
            None => return self.get(name, value, CvarFlags::empty()),
        };

        let var = &mut self.cvar_vars[idx];
        if value == var.string {
            return idx; // not changed
        }

        var.modified = true;
        var.string = value.to_string();
        var.value = parse_value(value);
        idx
    }

    /// Clear a variable's `modified` flag, returning what it was. Unknown
    /// names report false.
    pub fn take_modified(&mut self, name: &str) -> bool {
        match self.cvar_index.get(name) {
            Some(&idx) => std::mem::take(&mut self.cvar_vars[idx].modified),
            None => false,
        }
    }

    /// Set a variable from a float value.
    pub fn set_value(&mut self, name: &str, value: f32) -> usize {
        let val_str = if value == (value as i32) as f32 {
            format!("{}", value as i32)
        } else {
            format!("{}", value)
        };
        self.set(name, &val_str)
    }

    /// Apply configuration text. Each non-blank line is `set <name> <value>`;
    /// the value may be quoted and `//` starts a comment. Returns the number
    /// of variables set.
    pub fn exec_text(&mut self, text: &str) -> usize {
        let mut applied = 0;

        for (lineno, raw) in text.lines().enumerate() {
            let line = match raw.find("//") {
                Some(pos) => &raw[..pos],
                None => raw,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut parts = line.splitn(3, char::is_whitespace);
            let cmd = parts.next().unwrap_or("");
            let name = parts.next().unwrap_or("");
            let value = parts.next().map(str::trim).unwrap_or("");

            if cmd != "set" || name.is_empty() || value.is_empty() {
                com_printf(&format!("line {}: usage: set <variable> <value>\n", lineno + 1));
                continue;
            }

            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            com_dprintf(&format!("set {} \"{}\"\n", name, value));
            self.set(name, value);
            applied += 1;
        }

        applied
    }

    /// Write all archived variables to a writer.
    pub fn write_variables(&self, writer: &mut dyn std::io::Write) -> std::io::Result<()> {
        for var in &self.cvar_vars {
            if var.flags.contains(CvarFlags::ARCHIVE) {
                writeln!(writer, "set {} \"{}\"", var.name, var.string)?;
            }
        }
        Ok(())
    }
}

// ============================================================
// Tests
// ============================================================
