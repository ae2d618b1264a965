//! Declarative sanitizing policy.
//!
//! A [`Policy`] is immutable once built and cheap to clone (filters are shared behind
//! `Arc`). It is `Send + Sync`, so one policy can serve concurrent sanitize calls on
//! different trees.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Token matching any custom element in element lists and scope keys.
pub const CUSTOM_ELEMENTS_TOKEN: &str = "*-";
/// Scope key matching every element. Only meaningful for attribute tables.
pub const GLOBAL_TOKEN: &str = "*";

/// Verdict of one attribute filter for one attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterResult {
    /// Keep the attribute with its current value and stop the chain.
    Allow,
    /// Remove the attribute and stop the chain.
    Remove,
    /// Replace the value, then continue with the next filter.
    Replace(String),
    /// No opinion; continue with the next filter.
    Pass,
}

impl From<bool> for FilterResult {
    fn from(keep: bool) -> Self {
        if keep {
            FilterResult::Allow
        } else {
            FilterResult::Remove
        }
    }
}

/// `(attribute name, attribute value) -> verdict`. Valueless attributes are seen as `""`.
pub type AttributeFilter = Arc<dyn Fn(&str, &str) -> FilterResult + Send + Sync>;

/// Forced attributes for one scope, in registration order. `None` means "do not force".
pub type ForcedAttributes = Vec<(String, Option<String>)>;

/// Key of an attribute filter or forced-attribute table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    Tag(String),
    CustomElements,
    Global,
}

impl Scope {
    pub fn parse(key: &str) -> Self {
        match key.trim() {
            GLOBAL_TOKEN => Scope::Global,
            CUSTOM_ELEMENTS_TOKEN => Scope::CustomElements,
            tag => Scope::Tag(tag.to_ascii_lowercase()),
        }
    }
}

impl From<&str> for Scope {
    fn from(key: &str) -> Self {
        Scope::parse(key)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Tag(tag) => f.write_str(tag),
            Scope::CustomElements => f.write_str(CUSTOM_ELEMENTS_TOKEN),
            Scope::Global => f.write_str(GLOBAL_TOKEN),
        }
    }
}

/// Set of lowercased tag names, plus whether `*-` was listed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementSet {
    names: HashSet<String>,
    custom_elements: bool,
}

impl ElementSet {
    fn insert(&mut self, token: &str) {
        match token.trim() {
            CUSTOM_ELEMENTS_TOKEN => self.custom_elements = true,
            name => {
                self.names.insert(name.to_ascii_lowercase());
            }
        }
    }

    /// `tag` must already be lowercased.
    pub fn matches(&self, tag: &str, is_custom: bool) -> bool {
        self.names.contains(tag) || (is_custom && self.custom_elements)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && !self.custom_elements
    }
}

/// Values keyed by [`Scope`], with an allocation-free lookup by tag.
#[derive(Clone, Debug)]
pub struct ScopedTable<T> {
    tags: HashMap<String, T>,
    custom_elements: Option<T>,
    global: Option<T>,
}

impl<T> Default for ScopedTable<T> {
    fn default() -> Self {
        Self {
            tags: HashMap::new(),
            custom_elements: None,
            global: None,
        }
    }
}

impl<T> ScopedTable<T> {
    pub fn get(&self, scope: &Scope) -> Option<&T> {
        match scope {
            Scope::Tag(tag) => self.tags.get(tag),
            Scope::CustomElements => self.custom_elements.as_ref(),
            Scope::Global => self.global.as_ref(),
        }
    }

    fn insert(&mut self, scope: Scope, value: T) {
        match scope {
            Scope::Tag(tag) => {
                self.tags.insert(tag, value);
            }
            Scope::CustomElements => self.custom_elements = Some(value),
            Scope::Global => self.global = Some(value),
        }
    }

    fn remove(&mut self, scope: &Scope) -> Option<T> {
        match scope {
            Scope::Tag(tag) => self.tags.remove(tag),
            Scope::CustomElements => self.custom_elements.take(),
            Scope::Global => self.global.take(),
        }
    }

    fn get_or_default(&mut self, scope: Scope) -> &mut T
    where
        T: Default,
    {
        match scope {
            Scope::Tag(tag) => self.tags.entry(tag).or_default(),
            Scope::CustomElements => self.custom_elements.get_or_insert_with(T::default),
            Scope::Global => self.global.get_or_insert_with(T::default),
        }
    }

    /// Entries that apply to an element, in chain order: tag, custom elements, global.
    /// `tag` must already be lowercased.
    pub fn applicable<'a>(&'a self, tag: &str, is_custom: bool) -> impl Iterator<Item = &'a T> {
        self.tags
            .get(tag)
            .into_iter()
            .chain(self.custom_elements.as_ref().filter(|_| is_custom))
            .chain(self.global.as_ref())
    }

    pub fn scopes(&self) -> impl Iterator<Item = Scope> + '_ {
        let mut tags: Vec<&String> = self.tags.keys().collect();
        tags.sort();
        tags.into_iter()
            .map(|tag| Scope::Tag(tag.clone()))
            .chain(self.custom_elements.as_ref().map(|_| Scope::CustomElements))
            .chain(self.global.as_ref().map(|_| Scope::Global))
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.custom_elements.is_none() && self.global.is_none()
    }
}

#[derive(Clone)]
pub struct Policy {
    allow_elements: ElementSet,
    block_elements: ElementSet,
    drop_elements: ElementSet,
    filters: ScopedTable<AttributeFilter>,
    forces: ScopedTable<ForcedAttributes>,
    allow_comments: bool,
}

impl Policy {
    /// A policy with no rules: every element is allowed, attributes are untouched and
    /// comments are removed.
    pub fn empty() -> Self {
        Self {
            allow_elements: ElementSet::default(),
            block_elements: ElementSet::default(),
            drop_elements: ElementSet::default(),
            filters: ScopedTable::default(),
            forces: ScopedTable::default(),
            allow_comments: false,
        }
    }

    pub fn builder() -> PolicyBuilder {
        PolicyBuilder {
            policy: Policy::empty(),
        }
    }

    /// Starts a builder pre-populated with this policy's rules.
    pub fn to_builder(&self) -> PolicyBuilder {
        PolicyBuilder {
            policy: self.clone(),
        }
    }

    pub fn allow_elements(&self) -> &ElementSet {
        &self.allow_elements
    }

    pub fn block_elements(&self) -> &ElementSet {
        &self.block_elements
    }

    pub fn drop_elements(&self) -> &ElementSet {
        &self.drop_elements
    }

    pub fn filters(&self) -> &ScopedTable<AttributeFilter> {
        &self.filters
    }

    pub fn forces(&self) -> &ScopedTable<ForcedAttributes> {
        &self.forces
    }

    pub fn allow_comments(&self) -> bool {
        self.allow_comments
    }
}

impl Default for Policy {
    /// The shipped baseline, see [`crate::default_policy`].
    fn default() -> Self {
        crate::defaults::default_policy().clone()
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filter_scopes: Vec<String> = self.filters.scopes().map(|s| s.to_string()).collect();
        let forces: Vec<(String, &ForcedAttributes)> = self
            .forces
            .scopes()
            .filter_map(|scope| {
                let entries = self.forces.get(&scope)?;
                Some((scope.to_string(), entries))
            })
            .collect();
        f.debug_struct("Policy")
            .field("allow_elements", &self.allow_elements)
            .field("block_elements", &self.block_elements)
            .field("drop_elements", &self.drop_elements)
            .field("filters", &filter_scopes)
            .field("forces", &forces)
            .field("allow_comments", &self.allow_comments)
            .finish()
    }
}

/// Builder for [`Policy`]. Element lists accumulate; a filter registered for a scope
/// replaces any earlier filter for that scope; a forced attribute replaces an earlier
/// entry with the same name in the same scope.
#[derive(Clone, Debug)]
pub struct PolicyBuilder {
    policy: Policy,
}

impl PolicyBuilder {
    pub fn allow_elements<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            self.policy.allow_elements.insert(tag.as_ref());
        }
        self
    }

    pub fn block_elements<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            self.policy.block_elements.insert(tag.as_ref());
        }
        self
    }

    pub fn drop_elements<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            self.policy.drop_elements.insert(tag.as_ref());
        }
        self
    }

    pub fn filter_attributes<F>(mut self, scope: impl Into<Scope>, filter: F) -> Self
    where
        F: Fn(&str, &str) -> FilterResult + Send + Sync + 'static,
    {
        self.policy.filters.insert(scope.into(), Arc::new(filter));
        self
    }

    /// Drops the filter registered for `scope`, if any.
    pub fn clear_filter(mut self, scope: impl Into<Scope>) -> Self {
        self.policy.filters.remove(&scope.into());
        self
    }

    /// Forces `name="value"` on every element in `scope`.
    pub fn set_attribute(
        self,
        scope: impl Into<Scope>,
        name: &str,
        value: impl Into<String>,
    ) -> Self {
        self.force(scope.into(), name, Some(value.into()))
    }

    /// Registers the "do not force" sentinel for `name` in `scope`. Because wider scopes
    /// overlay narrower ones when forces are merged, this can cancel a force from a
    /// narrower scope.
    pub fn unset_attribute(self, scope: impl Into<Scope>, name: &str) -> Self {
        self.force(scope.into(), name, None)
    }

    fn force(mut self, scope: Scope, name: &str, value: Option<String>) -> Self {
        let name = name.trim().to_ascii_lowercase();
        let entries = self.policy.forces.get_or_default(scope);
        match entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => entries.push((name, value)),
        }
        self
    }

    pub fn allow_comments(mut self, allow: bool) -> Self {
        self.policy.allow_comments = allow;
        self
    }

    pub fn build(self) -> Policy {
        log::debug!(target: "sanitizer.policy", "built {:?}", self.policy);
        self.policy
    }
}
