//! Trap labels and per-store label allocation.
//!
//! Every entity written to a trap file is identified by a label. Keyed
//! entities (classes, packages, types, callables, ...) are deduplicated
//! through their textual key, so a later reference to an entity resolves to
//! the label its first reference allocated. Everything else gets a fresh
//! numeric label.

use std::collections::HashMap;
use std::fmt;

/// First numeric label handed out by a fresh [`LabelManager`].
pub const FIRST_LABEL: u32 = 100;

// ============================================================================
// Label
// ============================================================================

/// An identifier for an entity in one trap file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    /// Sequential numeric label, rendered `#123`.
    Int(u32),
    /// Pre-declared named anchor, rendered `#name` (e.g. `#compilation`).
    Str(String),
    /// Star label, rendered `*`.
    Star,
}

impl Label {
    /// The degenerate label used in place of an entity that could not be
    /// extracted. Facts referring to it are still written so that siblings
    /// keep their structure.
    pub fn placeholder() -> Self {
        Label::Int(0)
    }

    /// Whether this is the `#0` placeholder.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Label::Int(0))
    }

    /// Named anchor label.
    pub fn named(name: impl Into<String>) -> Self {
        Label::Str(name.into())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(n) => write!(f, "#{}", n),
            Label::Str(s) => write!(f, "#{}", s),
            Label::Star => write!(f, "*"),
        }
    }
}

// ============================================================================
// LabelManager
// ============================================================================

/// Outcome of a keyed label lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The key was already bound.
    Existing(Label),
    /// The key was bound to a newly allocated label; its definition line
    /// still has to be written.
    Created(Label),
}

impl Lookup {
    pub fn label(&self) -> &Label {
        match self {
            Lookup::Existing(l) | Lookup::Created(l) => l,
        }
    }

    pub fn into_label(self) -> Label {
        match self {
            Lookup::Existing(l) | Lookup::Created(l) => l,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Lookup::Created(_))
    }
}

/// Allocates labels for one fact store.
///
/// Numbering starts at [`FIRST_LABEL`] and is local to the store: external
/// class traps each get their own manager, so their numbering never depends
/// on the order in which the source walk discovered them.
#[derive(Debug)]
pub struct LabelManager {
    next_id: u32,
    keyed: HashMap<String, Label>,
}

impl Default for LabelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelManager {
    pub fn new() -> Self {
        LabelManager {
            next_id: FIRST_LABEL,
            keyed: HashMap::new(),
        }
    }

    /// Allocate a numeric label that is never deduplicated.
    pub fn fresh_label(&mut self) -> Label {
        let id = self.next_id;
        self.next_id += 1;
        Label::Int(id)
    }

    /// Look up `key`, binding it to a fresh label if it is new.
    pub fn lookup_or_create(&mut self, key: &str) -> Lookup {
        if let Some(label) = self.keyed.get(key) {
            return Lookup::Existing(label.clone());
        }
        let label = self.fresh_label();
        self.keyed.insert(key.to_string(), label.clone());
        Lookup::Created(label)
    }

    /// Non-creating lookup.
    pub fn existing(&self, key: &str) -> Option<Label> {
        self.keyed.get(key).cloned()
    }

    /// Number of keys bound so far.
    pub fn key_count(&self) -> usize {
        self.keyed.len()
    }
}
