//! The two-level configuration container: section → option → [`Value`].
//!
//! Nothing in here ever reports "not found". Reading a missing section creates
//! an empty one, and reading a missing option inserts an [`Value::Absent`]
//! placeholder, which is why the reading methods take `&mut self`. Use
//! [`Configuration::lookup`] for a read without side effects.
//!
//! Sections and options iterate in insertion order.

use serde::de::DeserializeOwned;

use crate::error::ClapscopeError;
use crate::value::Value;

/// Options of a single section, in insertion order.
///
/// Equality ignores order: two sections are equal if they hold the same
/// options with the same values.
#[derive(Debug, Clone, Default)]
pub struct Section {
    options: Vec<(String, Value)>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, option: &str) -> Option<usize> {
        self.options.iter().position(|(name, _)| name == option)
    }

    /// Get an option, inserting `Absent` if it doesn't exist yet.
    pub fn get(&mut self, option: &str) -> &Value {
        let idx = match self.position(option) {
            Some(idx) => idx,
            None => {
                self.options.push((option.to_string(), Value::Absent));
                self.options.len() - 1
            }
        };
        &self.options[idx].1
    }

    /// Get an option without creating it.
    pub fn lookup(&self, option: &str) -> Option<&Value> {
        self.position(option).map(|idx| &self.options[idx].1)
    }

    pub fn set(&mut self, option: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.position(option) {
            Some(idx) => self.options[idx].1 = value,
            None => self.options.push((option.to_string(), value)),
        }
    }

    pub fn remove(&mut self, option: &str) -> Option<Value> {
        self.position(option).map(|idx| self.options.remove(idx).1)
    }

    /// True if the option key exists, even if it only holds the `Absent`
    /// placeholder left behind by an earlier read.
    pub fn contains(&self, option: &str) -> bool {
        self.position(option).is_some()
    }

    /// True if the option holds a real (non-absent) value.
    pub fn has_value(&self, option: &str) -> bool {
        self.lookup(option).is_some_and(|v| !v.is_absent())
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.options.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|(name, _)| name.as_str())
    }
}

impl PartialEq for Section {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(option, value)| other.lookup(option) == Some(value))
    }
}

/// The running configuration: named sections of options.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    sections: Vec<(String, Section)>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|(n, _)| n == name)
    }

    /// Get a section, creating an empty one if it doesn't exist yet.
    pub fn get_section(&mut self, name: &str) -> &mut Section {
        let idx = match self.position(name) {
            Some(idx) => idx,
            None => {
                self.sections.push((name.to_string(), Section::new()));
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx].1
    }

    /// Get an option, auto-creating both the section and an `Absent` option.
    pub fn get_option(&mut self, section: &str, option: &str) -> &Value {
        self.get_section(section).get(option)
    }

    pub fn set_option(&mut self, section: &str, option: &str, value: impl Into<Value>) {
        self.get_section(section).set(option, value);
    }

    /// Side-effect free read.
    pub fn lookup(&self, section: &str, option: &str) -> Option<&Value> {
        self.section(section).and_then(|s| s.lookup(option))
    }

    /// Side-effect free section access.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.position(name).map(|idx| &self.sections[idx].1)
    }

    pub fn remove_section(&mut self, name: &str) -> Option<Section> {
        self.position(name).map(|idx| self.sections.remove(idx).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Section names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(name, _)| name.as_str())
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections.iter().map(|(name, s)| (name.as_str(), s))
    }

    /// Deserialize one section into a typed struct.
    ///
    /// Absent options are left out, so `#[serde(default)]` fields fall back to
    /// their defaults. A missing section deserializes from an empty table.
    pub fn section_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, ClapscopeError> {
        let mut table = toml::Table::new();
        if let Some(section) = self.section(name) {
            for (option, value) in section.iter() {
                if let Some(v) = value.to_toml() {
                    table.insert(option.to_string(), v);
                }
            }
        }

        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ClapscopeError::InvalidValue {
                key: name.into(),
                reason: e.to_string(),
            })
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .sections()
                .all(|(name, section)| other.section(name) == Some(section))
    }
}
