//! C11 continued: the active `/Resources` dictionary stack. Form
//! XObjects and annotation appearance streams introduce a new resource
//! scope that falls back to the enclosing one when a name is missing
//! (§4.7 "Do"); the stack is an explicit `Vec` the interpreter owns and
//! pushes/pops around recursive `Do`, never a thread-local (§9 redesign
//! note, mirroring `GraphicsStateStack`).

use crate::document::Document;
use crate::error::Result;
use crate::object::{Dictionary, DictionaryExt, Object};

const CATEGORIES: &[&str] = &["Font", "XObject", "ColorSpace", "ExtGState", "Pattern", "Shading", "Properties"];

pub struct ResourceStack {
    scopes: Vec<Dictionary>,
}

impl ResourceStack {
    pub fn new(root: Dictionary) -> ResourceStack {
        ResourceStack { scopes: vec![root] }
    }

    /// Runs `f` with `scope` pushed as the active resource dictionary,
    /// then pops it regardless of how `f` returns.
    pub fn with_scope<T>(&mut self, scope: Dictionary, f: impl FnOnce(&mut ResourceStack) -> T) -> T {
        self.scopes.push(scope);
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Pushes `scope` without running a closure — paired with `pop`.
    /// Used by callers (like the interpreter's `Do` handling) that can't
    /// route a method call on their own `&mut self` through a closure
    /// borrowed from one of their fields.
    pub fn push(&mut self, scope: Dictionary) {
        self.scopes.push(scope);
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// The innermost active resource dictionary, for XObjects/annotations
    /// that omit their own `/Resources` and so inherit the caller's.
    pub fn current_scope(&self) -> &Dictionary {
        self.scopes.last().expect("resource stack is never empty")
    }

    /// Looks up `name` in `category` (e.g. `"Font"`, `"XObject"`),
    /// searching from the innermost scope outward (§4.7: an XObject
    /// without its own entry for a category inherits the caller's).
    pub fn lookup(&self, category: &str, name: &str) -> Option<&Object> {
        for scope in self.scopes.iter().rev() {
            if let Some(sub) = scope.get_dict(category) {
                if let Some(obj) = sub.get(name) {
                    return Some(obj);
                }
            }
        }
        None
    }

    pub fn lookup_resolved(&self, doc: &Document, category: &str, name: &str) -> Result<Option<Object>> {
        match self.lookup(category, name) {
            Some(obj) => Ok(Some(doc.resolve(obj)?.into_owned())),
            None => Ok(None),
        }
    }

    /// All names declared for `category` across every active scope,
    /// innermost first (diagnostic/listing use, not on the hot path).
    pub fn names_in(&self, category: &str) -> Vec<String> {
        let mut out = Vec::new();
        for scope in self.scopes.iter().rev() {
            if let Some(sub) = scope.get_dict(category) {
                for key in sub.keys() {
                    let s = key.as_str().to_string();
                    if !out.contains(&s) {
                        out.push(s);
                    }
                }
            }
        }
        out
    }
}

/// Sanity hook: every category the interpreter may query, used by
/// callers that want to validate a resource dictionary up front rather
/// than discover a typo lazily.
pub fn known_categories() -> &'static [&'static str] {
    CATEGORIES
}

/// Looks up `/Resources` on `container` and resolves it to a direct
/// dictionary, also resolving each known category sub-dictionary
/// (`/Font`, `/XObject`, ...) one level if it was itself given as an
/// indirect reference — a common real-world layout `lookup`'s direct
/// `get_dict` calls would otherwise silently miss.
pub fn resolve_resources(doc: &Document, container: &Dictionary) -> Dictionary {
    let Some(res_obj) = container.get("Resources") else { return Dictionary::new() };
    let Ok(resolved) = doc.resolve(res_obj) else { return Dictionary::new() };
    let Some(dict) = resolved.as_dict() else { return Dictionary::new() };
    let mut out = dict.clone();
    for &category in CATEGORIES {
        if let Some(Object::Reference(_)) = out.get(category) {
            if let Some(entry) = out.get(category).cloned() {
                if let Ok(resolved_entry) = doc.resolve(&entry) {
                    out.insert(crate::object::Name::new(category), resolved_entry.into_owned());
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Name, Object};

    fn dict_with(category: &str, name: &str, value: Object) -> Dictionary {
        let mut sub = Dictionary::new();
        sub.insert(Name::new(name), value);
        let mut root = Dictionary::new();
        root.insert(Name::new(category), Object::Dictionary(sub));
        root
    }

    #[test]
    fn lookup_finds_entry_in_root_scope() {
        let root = dict_with("Font", "F1", Object::Integer(7));
        let stack = ResourceStack::new(root);
        assert_eq!(stack.lookup("Font", "F1"), Some(&Object::Integer(7)));
    }

    #[test]
    fn inner_scope_shadows_outer_for_same_name() {
        let root = dict_with("Font", "F1", Object::Integer(1));
        let mut stack = ResourceStack::new(root);
        let inner = dict_with("Font", "F1", Object::Integer(2));
        let seen = stack.with_scope(inner, |s| s.lookup("Font", "F1").cloned());
        assert_eq!(seen, Some(Object::Integer(2)));
    }

    #[test]
    fn falls_back_to_outer_scope_when_inner_lacks_entry() {
        let root = dict_with("XObject", "Im1", Object::Integer(9));
        let mut stack = ResourceStack::new(root);
        let inner = dict_with("Font", "F1", Object::Integer(2));
        let seen = stack.with_scope(inner, |s| s.lookup("XObject", "Im1").cloned());
        assert_eq!(seen, Some(Object::Integer(9)));
    }

    #[test]
    fn scope_is_popped_after_with_scope_returns() {
        let root = Dictionary::new();
        let mut stack = ResourceStack::new(root);
        let inner = dict_with("Font", "F1", Object::Integer(2));
        stack.with_scope(inner, |_| ());
        assert_eq!(stack.depth(), 1);
    }
}
