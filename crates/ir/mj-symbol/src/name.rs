//! Symbol names and their canonical lookup form

use std::fmt;
use std::hash::{Hash, Hasher};

/// Name of a symbol: optional namespace parts plus a simple name.
///
/// Lookups use the canonical form (lowercase, underscores removed), so
/// `Foo_Bar` and `foobar` are the same key. The original spelling is kept
/// for diagnostics. A name made only of underscores (the discard) keeps its
/// spelling as canonical form.
#[derive(Debug, Clone)]
pub struct SymbolName {
    namespace: Vec<String>,
    name: String,
    canonical_namespace: Vec<String>,
    canonical: String,
}

impl SymbolName {
    /// Parse possibly dotted text (`Std.Math.sqrt`). Dots inside type
    /// argument brackets do not split.
    pub fn new(text: &str) -> Self {
        let mut parts = split_outside_brackets(text);
        let name = parts.pop().unwrap_or_default();
        Self::qualified(parts, name)
    }

    pub fn qualified(namespace: Vec<String>, name: String) -> Self {
        let canonical_namespace = namespace.iter().map(|part| canonicalize(part)).collect();
        let canonical = canonicalize(&name);
        Self {
            namespace,
            name,
            canonical_namespace,
            canonical,
        }
    }

    /// Original simple name
    pub fn value(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &[String] {
        &self.namespace
    }

    pub fn canonical_namespace(&self) -> &[String] {
        &self.canonical_namespace
    }

    /// Canonical simple name, the scope lookup key
    pub fn canonical_name(&self) -> &str {
        &self.canonical
    }

    /// Canonical simple name without a type-argument suffix (`add<u8>` -> `add`)
    pub fn base_canonical_name(&self) -> &str {
        self.canonical
            .split_once('<')
            .map_or(self.canonical.as_str(), |(base, _)| base)
    }

    pub fn full_original_name(&self) -> String {
        join(&self.namespace, &self.name)
    }

    pub fn full_canonical_name(&self) -> String {
        join(&self.canonical_namespace, &self.canonical)
    }

    /// True when the name carries type arguments (`Point<U8>`)
    pub fn has_type_arguments(&self) -> bool {
        self.name.contains('<')
    }

    /// Same name with a type-argument suffix, `name<A,B>`
    #[must_use]
    pub fn with_type_arguments(&self, arguments: &[&Self]) -> Self {
        let rendered: Vec<String> = arguments.iter().map(|arg| arg.full_original_name()).collect();
        Self::qualified(
            self.namespace.clone(),
            format!("{}<{}>", self.name, rendered.join(",")),
        )
    }

    /// Same simple name under another namespace
    #[must_use]
    pub fn in_namespace(&self, namespace: Vec<String>) -> Self {
        Self::qualified(namespace, self.name.clone())
    }

    /// True for `_`
    pub fn is_discard(&self) -> bool {
        !self.name.is_empty() && self.name.chars().all(|ch| ch == '_')
    }
}

impl PartialEq for SymbolName {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical && self.canonical_namespace == other.canonical_namespace
    }
}

impl Eq for SymbolName {}

impl Hash for SymbolName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_namespace.hash(state);
        self.canonical.hash(state);
    }
}

impl fmt::Display for SymbolName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.full_original_name())
    }
}

impl From<&str> for SymbolName {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

fn canonicalize(text: &str) -> String {
    if text.chars().all(|ch| ch == '_') {
        return text.to_owned();
    }
    text.chars()
        .filter(|ch| *ch != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn join(namespace: &[String], name: &str) -> String {
    if namespace.is_empty() {
        return name.to_owned();
    }
    format!("{}.{name}", namespace.join("."))
}

fn split_outside_brackets(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0_u32;
    for ch in text.chars() {
        match ch {
            '<' => {
                depth += 1;
                current.push(ch);
            }
            '>' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            '.' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_canonical_equality() {
        let first = SymbolName::new("Foo_Bar");
        let second = SymbolName::new("foobar");

        assert_eq!(first, second);
        assert_eq!(first.canonical_name(), "foobar");
        assert_eq!(first.full_original_name(), "Foo_Bar");

        let mut set = FxHashSet::default();
        set.insert(first);
        assert!(set.contains(&second));
    }

    #[test]
    fn test_qualified_name() {
        let name = SymbolName::new("Std.Math.Square_Root");
        assert_eq!(name.namespace(), ["Std", "Math"]);
        assert_eq!(name.value(), "Square_Root");
        assert_eq!(name.full_canonical_name(), "std.math.squareroot");
        assert_ne!(name, SymbolName::new("squareroot"));
    }

    #[test]
    fn test_discard_keeps_spelling() {
        let discard = SymbolName::new("_");
        assert!(discard.is_discard());
        assert_eq!(discard.canonical_name(), "_");
    }

    #[test]
    fn test_type_arguments() {
        let point = SymbolName::new("Point");
        let instance = point.with_type_arguments(&[&SymbolName::new("U8")]);
        assert_eq!(instance.full_original_name(), "Point<U8>");
        assert_eq!(instance.canonical_name(), "point<u8>");
        assert_eq!(instance.base_canonical_name(), "point");

        let nested = SymbolName::new("Box<Std.Text>");
        assert!(nested.namespace().is_empty());
        assert!(nested.has_type_arguments());
    }
}
