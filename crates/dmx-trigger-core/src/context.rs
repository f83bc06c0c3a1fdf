//! Shared variable store for action effects.

use std::collections::BTreeMap;

/// Variable holding the 1-based slot number of the slot being processed.
pub const SLOT_OFFSET_VARIABLE: &str = "slot_offset";

/// Variable holding the new value of the slot being processed.
pub const SLOT_VALUE_VARIABLE: &str = "slot_value";

/// Named variables available to action effects.
///
/// Values are stored as text; numbers are kept in decimal form. Lookups of
/// an unknown name return `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    variables: BTreeMap<String, String>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Set a variable, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Remove a variable, returning its old value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.variables.remove(name)
    }

    /// True if the variable is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Number of defined variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// True if no variables are defined.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterate variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Record the slot currently being processed.
    pub fn set_slot(&mut self, slot: u16, value: u8) {
        self.set(SLOT_OFFSET_VARIABLE, slot.to_string());
        self.set(SLOT_VALUE_VARIABLE, value.to_string());
    }

    /// Expand `${name}` references in `template`.
    ///
    /// Unknown variables expand to nothing. `$$` produces a single `$`. A `$`
    /// that starts no reference, or a `${` without a closing brace, is kept
    /// as written.
    pub fn interpolate(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(after) = tail.strip_prefix("$$") {
                out.push('$');
                rest = after;
            } else if let Some(body) = tail.strip_prefix("${") {
                match body.find('}') {
                    Some(end) => {
                        let name = &body[..end];
                        match self.get(name) {
                            Some(value) => out.push_str(value),
                            None => tracing::debug!("Undefined variable '{}' in template", name),
                        }
                        rest = &body[end + 1..];
                    }
                    None => {
                        out.push_str(tail);
                        rest = "";
                    }
                }
            } else {
                out.push('$');
                rest = &tail[1..];
            }
        }

        out.push_str(rest);
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Self::new();
        for (name, value) in iter {
            context.set(name, value);
        }
        context
    }
}

/// Returns true if `name` can be referenced as `${name}`: ASCII
/// alphanumerics and underscores, not starting with a digit.
pub fn is_valid_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
