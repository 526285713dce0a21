use std::{collections::BTreeMap, fmt};

///
/// ErrorTree
///
/// Route-aware aggregation of validation failures. Messages are attached
/// either at the root or under a route (for example `endpoint GET /orders`);
/// rendering flattens the tree into one sorted line per message.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorTree {
    messages: Vec<String>,
    children: BTreeMap<String, Self>,
}

impl ErrorTree {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    /// Attach a message at the root of the tree.
    pub fn add(&mut self, message: impl ToString) {
        self.messages.push(message.to_string());
    }

    /// Attach a message under `route`.
    pub fn add_at(&mut self, route: impl Into<String>, message: impl ToString) {
        self.children
            .entry(route.into())
            .or_default()
            .add(message);
    }

    /// Merge another tree under `route`, keeping its own sub-routes.
    pub fn merge_at(&mut self, route: impl Into<String>, other: Self) {
        if other.is_empty() {
            return;
        }

        let slot = self.children.entry(route.into()).or_default();
        slot.messages.extend(other.messages);
        for (child_route, child) in other.children {
            slot.merge_at(child_route, child);
        }
    }

    /// Merge another tree into this one at the same level.
    pub fn merge(&mut self, other: Self) {
        self.messages.extend(other.messages);
        for (route, child) in other.children {
            self.merge_at(route, child);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.children.values().all(Self::is_empty)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len() + self.children.values().map(Self::len).sum::<usize>()
    }

    /// Flatten into `route: message` lines, sorted for stable output.
    #[must_use]
    pub fn flatten(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.len());
        self.flatten_into(None, &mut out);
        out.sort();

        out
    }

    fn flatten_into(&self, prefix: Option<&str>, out: &mut Vec<String>) {
        for message in &self.messages {
            match prefix {
                Some(route) => out.push(format!("{route}: {message}")),
                None => out.push(message.clone()),
            }
        }

        for (route, child) in &self.children {
            let joined = match prefix {
                Some(parent) => format!("{parent} {route}"),
                None => route.clone(),
            };
            child.flatten_into(Some(&joined), out);
        }
    }

    /// Convert into a `Result`, failing when any message was recorded.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.flatten().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, " - {line}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorTree {}

/// Append a formatted message to an [`ErrorTree`].
#[macro_export]
macro_rules! err {
    ($errs:expr, $($arg:tt)*) => {
        $errs.add(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_sorts_and_prefixes_routes() {
        let mut errs = ErrorTree::new();
        errs.add("zeta at root");
        errs.add_at("endpoint GET /a", "bad timeout");
        err!(errs, "alpha {}", 1);

        assert_eq!(
            errs.flatten(),
            vec![
                "alpha 1".to_string(),
                "endpoint GET /a: bad timeout".to_string(),
                "zeta at root".to_string(),
            ]
        );
        assert_eq!(errs.len(), 3);
    }

    #[test]
    fn empty_tree_is_ok() {
        let mut errs = ErrorTree::new();
        errs.merge_at("nothing", ErrorTree::new());

        assert!(errs.is_empty());
        assert!(errs.result().is_ok());
    }

    #[test]
    fn merge_keeps_nested_routes() {
        let mut inner = ErrorTree::new();
        inner.add_at("rate_limit", "negative");

        let mut outer = ErrorTree::new();
        outer.merge_at("endpoint POST /x", inner);

        let rendered = outer.to_string();
        assert_eq!(rendered, " - endpoint POST /x rate_limit: negative");
    }
}
