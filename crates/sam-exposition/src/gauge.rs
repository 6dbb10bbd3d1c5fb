//! Declarative gauge rendering.
//!
//! A [`Gauge`] names a metric, a path into the value store and optional
//! transform, validity check and labels. Rendering yields zero to three
//! exposition lines: nothing when the path is unresolved, otherwise the
//! `HELP`/`TYPE` pair (when help is set) and the sample (when valid).

use std::fmt::{self, Write as _};

use sam_store::{PathToken, ValueStore};
use serde_json::Value;

use crate::transform::value_text;

type TransformFn<'a> = Box<dyn Fn(&Value) -> Option<String> + 'a>;
type ValidityFn<'a> = Box<dyn Fn(&Value) -> bool + 'a>;

/// One gauge to render.
pub struct Gauge<'a> {
    name: String,
    help: Option<String>,
    path: Vec<PathToken>,
    transform: Option<TransformFn<'a>>,
    validity: Option<ValidityFn<'a>>,
    labels: Vec<(String, String)>,
}

impl fmt::Debug for Gauge<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge")
            .field("name", &self.name)
            .field("help", &self.help)
            .field("path", &self.path)
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

impl<'a> Gauge<'a> {
    /// Gauge `name` reading the value at `path`.
    pub fn new(name: impl Into<String>, path: Vec<PathToken>) -> Self {
        Self {
            name: name.into(),
            help: None,
            path,
            transform: None,
            validity: None,
            labels: Vec::new(),
        }
    }

    /// Help text. An empty string means no `HELP`/`TYPE` lines.
    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        let help = help.into();
        self.help = (!help.is_empty()).then_some(help);
        self
    }

    /// Map the resolved value to its sample text.
    #[must_use]
    pub fn transform(mut self, f: impl Fn(&Value) -> Option<String> + 'a) -> Self {
        self.transform = Some(Box::new(f));
        self
    }

    /// Suppress the sample when `f` returns `false`.
    #[must_use]
    pub fn validity(mut self, f: impl Fn(&Value) -> bool + 'a) -> Self {
        self.validity = Some(Box::new(f));
        self
    }

    /// Add a label.
    #[must_use]
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }

    /// Metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `HELP`/`TYPE` lines will be emitted.
    pub fn has_help(&self) -> bool {
        self.help.is_some()
    }

    /// Drop the help text so the output can extend an existing block.
    pub(crate) fn strip_help(&mut self) {
        self.help = None;
    }

    /// Resolve the path in `store` and render.
    pub fn render(&self, store: &ValueStore) -> Vec<String> {
        let value = store.get(&self.path);
        self.render_value(value.as_ref())
    }

    /// Render an already resolved value.
    pub fn render_value(&self, value: Option<&Value>) -> Vec<String> {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Vec::new();
        };

        let mut lines = Vec::with_capacity(3);
        if let Some(help) = &self.help {
            lines.push(format!("# HELP {} {}", self.name, escape_help(help)));
            lines.push(format!("# TYPE {} gauge", self.name));
        }

        if self.validity.as_ref().is_some_and(|valid| !valid(value)) {
            return lines;
        }

        let sample = match &self.transform {
            Some(transform) => transform(value),
            None => value_text(value),
        };
        if let Some(sample) = sample {
            lines.push(format!("{}{} {sample}", self.name, self.label_block()));
        }
        lines
    }

    fn label_block(&self) -> String {
        if self.labels.is_empty() {
            return String::new();
        }
        let mut out = String::from("{");
        for (i, (key, value)) in self.labels.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            let _ = write!(out, "{key}=\"{}\"", escape_label(value));
        }
        out.push('}');
        out
    }
}

/// Escape a label value: backslash, double quote and newline.
pub fn escape_label(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// Escape help text: backslash and newline.
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
