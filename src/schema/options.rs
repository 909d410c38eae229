//! Per-field coercion options.

use std::fmt;
use std::sync::Arc;

use unicode_normalization::UnicodeNormalization;

/// A named string transformation applied to a cell's text before trimming and pattern matching.
///
/// Builtins are available by name through [`PreProcessor::builtin`], which is how schema
/// configuration files reference them. Custom pre-processors wrap any `Fn(&str) -> String`.
#[derive(Clone)]
pub struct PreProcessor {
    name: String,
    apply: Arc<dyn Fn(&str) -> String + Send + Sync>,
}

impl PreProcessor {
    /// Names accepted by [`PreProcessor::builtin`].
    pub const BUILTINS: [&'static str; 4] = ["upper_case", "lower_case", "trim", "enum_name"];

    pub fn new(name: impl Into<String>, apply: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            apply: Arc::new(apply),
        }
    }

    pub fn upper_case() -> Self {
        Self::new("upper_case", str::to_uppercase)
    }

    pub fn lower_case() -> Self {
        Self::new("lower_case", str::to_lowercase)
    }

    pub fn trim() -> Self {
        Self::new("trim", |s| s.trim().to_string())
    }

    /// Turn free text into a symbolic constant name: `" Rhône alpes "` → `"RHONE_ALPES"`.
    pub fn enum_name() -> Self {
        Self::new("enum_name", to_enum_name)
    }

    /// Look up a builtin by its name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "upper_case" => Some(Self::upper_case()),
            "lower_case" => Some(Self::lower_case()),
            "trim" => Some(Self::trim()),
            "enum_name" => Some(Self::enum_name()),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, input: &str) -> String {
        (self.apply)(input)
    }
}

impl fmt::Debug for PreProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreProcessor").field(&self.name).finish()
    }
}

/// Compatibility decomposition, then everything outside ASCII is dropped, so accents, ligatures
/// and fullwidth forms reduce to their base letters.
fn to_enum_name(input: &str) -> String {
    let decomposed: String = input.nfkd().collect();
    decomposed
        .trim()
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == ' ' { '_' } else { c.to_ascii_uppercase() })
        .collect()
}

/// How a single field's cells are extracted and checked.
///
/// Defaults: not required, trimmed, formulas allowed, no pattern, no pre-processing.
#[derive(Debug, Clone)]
pub struct ColumnOptions {
    /// Emit a null-value problem when the cell is missing or empty.
    pub required: bool,
    /// Trim surrounding whitespace after pre-processing.
    pub trim: bool,
    /// Accept formula cells (evaluated) instead of rejecting them.
    pub formula_allowed: bool,
    /// Full-match regex for text-like kinds; parse format (`strftime` syntax) for date/time kinds.
    pub matches: Option<String>,
    /// Applied in order to the formatted cell text.
    pub pre_process: Vec<PreProcessor>,
}

impl Default for ColumnOptions {
    fn default() -> Self {
        Self {
            required: false,
            trim: true,
            formula_allowed: true,
            matches: None,
            pre_process: Vec::new(),
        }
    }
}

impl ColumnOptions {
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn with_formula_allowed(mut self, allowed: bool) -> Self {
        self.formula_allowed = allowed;
        self
    }

    pub fn with_matches(mut self, pattern: impl Into<String>) -> Self {
        self.matches = Some(pattern.into());
        self
    }

    pub fn with_pre_process(mut self, pre: PreProcessor) -> Self {
        self.pre_process.push(pre);
        self
    }

    /// Run the pre-processors, in order.
    pub(crate) fn pre_process_text(&self, text: String) -> String {
        self.pre_process.iter().fold(text, |acc, p| p.apply(&acc))
    }
}
