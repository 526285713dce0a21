use crate::model::Attribute;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

///
/// Location
///
/// Source position of a node in the configuration tree. `path` is the
/// tree path (for example `Orders.CreateOrder.flow[2]`).
///

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(default)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub path: String,
}

impl Location {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            path: String::new(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file.is_empty() && self.line == 0 && self.column == 0 && self.path.is_empty()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.file.is_empty(), self.line) {
            (true, _) => Ok(()),
            (false, 0) => f.write_str(&self.file),
            (false, line) => write!(f, "{}:{line}:{}", self.file, self.column),
        }
    }
}

///
/// ChildKey
///
/// Well-known argument keys that carry nested step lists. `Cases` holds a
/// map of branch label to steps; the others hold a single list.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ChildKey {
    Do,
    Then,
    Else,
    IfNew,
    IfExists,
    Cases,
    Default,
}

impl ChildKey {
    /// Fixed traversal order shared by every pass that descends into children.
    pub const ALL: [Self; 7] = [
        Self::Do,
        Self::Then,
        Self::Else,
        Self::IfNew,
        Self::IfExists,
        Self::Cases,
        Self::Default,
    ];

    /// Argument key (`_do`, `_then`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Do => "_do",
            Self::Then => "_then",
            Self::Else => "_else",
            Self::IfNew => "_ifNew",
            Self::IfExists => "_ifExists",
            Self::Cases => "_cases",
            Self::Default => "_default",
        }
    }

    /// Label used in the configuration tree (`do`, `then`, ...).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Do => "do",
            Self::Then => "then",
            Self::Else => "else",
            Self::IfNew => "ifNew",
            Self::IfExists => "ifExists",
            Self::Cases => "cases",
            Self::Default => "default",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.label() == label)
    }

    #[must_use]
    pub fn from_arg_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// ArgValue
///
/// One flow argument: a leaf or a nested step collection.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Text(String),
    Bool(bool),
    List(Vec<String>),
    Steps(Vec<FlowStep>),
    Cases(BTreeMap<String, Vec<FlowStep>>),

    /// `entity.PatchValidated` rules: field -> rule -> value.
    Fields(BTreeMap<String, BTreeMap<String, String>>),
}

impl ArgValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_steps(&self) -> Option<&[FlowStep]> {
        match self {
            Self::Steps(steps) => Some(steps.as_slice()),
            _ => None,
        }
    }

    /// Whether the value is a non-empty string or a non-empty string list.
    #[must_use]
    pub fn is_present(&self) -> bool {
        match self {
            Self::Text(s) => !s.trim().is_empty(),
            Self::Bool(_) => true,
            Self::List(items) => items.iter().any(|s| !s.trim().is_empty()),
            Self::Steps(steps) => !steps.is_empty(),
            Self::Cases(cases) => !cases.is_empty(),
            Self::Fields(fields) => !fields.is_empty(),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<String>> for ArgValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl From<Vec<FlowStep>> for ArgValue {
    fn from(steps: Vec<FlowStep>) -> Self {
        Self::Steps(steps)
    }
}

///
/// FlowStep
///
/// A single declarative action. Nested step lists ride inside `args` under
/// the [`ChildKey`] names so every pass can recurse uniformly.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct FlowStep {
    pub action: String,
    pub args: BTreeMap<String, ArgValue>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,

    #[serde(skip_serializing_if = "Location::is_empty")]
    pub location: Location,
}

impl FlowStep {
    pub const GENERATED: &str = "generated";

    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_children(mut self, key: ChildKey, steps: Vec<Self>) -> Self {
        self.set_children(key, steps);
        self
    }

    #[must_use]
    pub fn with_case(mut self, label: impl Into<String>, steps: Vec<Self>) -> Self {
        self.set_case(label, steps);
        self
    }

    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn set_children(&mut self, key: ChildKey, steps: Vec<Self>) {
        self.args
            .insert(key.as_str().to_string(), ArgValue::Steps(steps));
    }

    pub fn set_case(&mut self, label: impl Into<String>, steps: Vec<Self>) {
        match self.args.get_mut(ChildKey::Cases.as_str()) {
            Some(ArgValue::Cases(cases)) => {
                cases.insert(label.into(), steps);
            }
            _ => {
                let cases = BTreeMap::from([(label.into(), steps)]);
                self.args
                    .insert(ChildKey::Cases.as_str().to_string(), ArgValue::Cases(cases));
            }
        }
    }

    #[must_use]
    pub fn arg(&self, key: &str) -> Option<&ArgValue> {
        self.args.get(key)
    }

    /// String argument, or `None` for missing and non-string values.
    #[must_use]
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.arg(key).and_then(ArgValue::as_str)
    }

    /// String argument trimmed, empty when absent.
    #[must_use]
    pub fn arg_text(&self, key: &str) -> &str {
        self.arg_str(key).map_or("", str::trim)
    }

    #[must_use]
    pub fn has_arg(&self, key: &str) -> bool {
        self.arg(key).is_some_and(ArgValue::is_present)
    }

    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.arg_str(Self::GENERATED) == Some("true")
    }

    /// Child list stored under a single-list key.
    #[must_use]
    pub fn children(&self, key: ChildKey) -> Option<&[Self]> {
        self.arg(key.as_str()).and_then(ArgValue::as_steps)
    }

    #[must_use]
    pub fn cases(&self) -> Option<&BTreeMap<String, Vec<Self>>> {
        match self.arg(ChildKey::Cases.as_str()) {
            Some(ArgValue::Cases(cases)) => Some(cases),
            _ => None,
        }
    }

    /// Whether the step carries a non-empty child collection under `key`.
    #[must_use]
    pub fn has_children(&self, key: ChildKey) -> bool {
        match key {
            ChildKey::Cases => self.cases().is_some_and(|c| !c.is_empty()),
            _ => self.children(key).is_some_and(|c| !c.is_empty()),
        }
    }

    /// Every nested list in [`ChildKey::ALL`] order, case branches by label.
    #[must_use]
    pub fn child_lists(&self) -> Vec<&[Self]> {
        let mut out = Vec::new();
        for key in ChildKey::ALL {
            if key == ChildKey::Cases {
                if let Some(cases) = self.cases() {
                    out.extend(cases.values().map(Vec::as_slice));
                }
            } else if let Some(steps) = self.children(key) {
                out.push(steps);
            }
        }

        out
    }

    /// Mutable access to every nested list.
    pub fn child_lists_mut(&mut self) -> Vec<&mut Vec<Self>> {
        let mut out = Vec::new();
        for (key, value) in &mut self.args {
            if ChildKey::from_arg_key(key).is_none() {
                continue;
            }
            match value {
                ArgValue::Steps(steps) => out.push(steps),
                ArgValue::Cases(cases) => out.extend(cases.values_mut()),
                _ => {}
            }
        }

        out
    }
}

/// Visit every step in pre-order, descending into all child lists.
pub fn visit_steps<'a>(steps: &'a [FlowStep], f: &mut impl FnMut(&'a FlowStep)) {
    for step in steps {
        f(step);
        for children in step.child_lists() {
            visit_steps(children, f);
        }
    }
}
