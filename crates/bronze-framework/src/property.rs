//! Typed command and parameter properties.
//!
//! A property is any plain type implementing [`Property`]. Builders collect
//! properties into a [`PropertyMap`]; while the tree is built each node's map
//! is flattened from its declaring scope's inheritable entries overlaid with
//! its own, so lookups at dispatch time never walk parents.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Marker trait for property types.
pub trait Property: Send + Sync + 'static {
    /// Whether nested commands and parameters see this property when it is
    /// set on an enclosing scope.
    const INHERITABLE: bool = false;
}

#[derive(Clone)]
struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    inheritable: bool,
    type_name: &'static str,
    /// Insertion sequence, for deterministic iteration.
    seq: usize,
}

/// Property storage keyed by property type.
#[derive(Clone, Default)]
pub struct PropertyMap {
    entries: HashMap<TypeId, Entry>,
    next_seq: usize,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `property`, replacing any earlier value of the same type.
    pub fn insert<P: Property>(&mut self, property: P) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            TypeId::of::<P>(),
            Entry {
                value: Arc::new(property),
                inheritable: P::INHERITABLE,
                type_name: std::any::type_name::<P>(),
                seq,
            },
        );
    }

    pub fn with<P: Property>(mut self, property: P) -> Self {
        self.insert(property);
        self
    }

    pub fn has<P: Property>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<P>())
    }

    pub fn get<P: Property>(&self) -> Option<&P> {
        self.entries
            .get(&TypeId::of::<P>())
            .and_then(|entry| entry.value.downcast_ref::<P>())
    }

    pub fn remove<P: Property>(&mut self) -> bool {
        self.entries.remove(&TypeId::of::<P>()).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Property types present, in insertion order.
    pub fn type_ids(&self) -> Vec<TypeId> {
        let mut entries: Vec<(&TypeId, &Entry)> = self.entries.iter().collect();
        entries.sort_by_key(|(_, entry)| entry.seq);
        entries.into_iter().map(|(id, _)| *id).collect()
    }

    /// The entries a nested scope inherits.
    pub fn inherited(&self) -> PropertyMap {
        let mut out = PropertyMap::new();
        out.overlay_where(self, |entry| entry.inheritable);
        out
    }

    /// `self`'s inheritable entries with `own` laid over them.
    pub fn flatten(&self, own: &PropertyMap) -> PropertyMap {
        let mut out = self.inherited();
        out.overlay_where(own, |_| true);
        out
    }

    fn overlay_where(&mut self, other: &PropertyMap, keep: impl Fn(&Entry) -> bool) {
        let mut entries: Vec<(&TypeId, &Entry)> = other.entries.iter().collect();
        entries.sort_by_key(|(_, entry)| entry.seq);
        for (id, entry) in entries {
            if keep(entry) {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.entries.insert(*id, Entry { seq, ..entry.clone() });
            }
        }
    }
}

impl fmt::Debug for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        f.debug_list()
            .entries(entries.iter().map(|entry| entry.type_name))
            .finish()
    }
}

// ============================================================================
// Command properties
// ============================================================================

/// One-line summary shown in help output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description(pub String);

impl Property for Description {}

/// Free-form usage text replacing the generated parameter synopsis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage(pub String);

impl Property for Usage {}

/// Help grouping; subcommands share their parent's category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category(pub String);

impl Property for Category {
    const INHERITABLE: bool = true;
}

/// Leaves a command out of help listings. Not inherited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hidden;

impl Property for Hidden {}

/// Restricts a command and its subcommands to guild messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuildOnly;

impl Property for GuildOnly {
    const INHERITABLE: bool = true;
}

/// Keeps one lazily created command instance for all invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persistent;

impl Property for Persistent {}

// ============================================================================
// Parameter properties
// ============================================================================

/// Explicit token position; negative counts from the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index(pub isize);

impl Property for Index {}

/// Number of tokens merged into one argument; zero or less means all
/// remaining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Width(pub isize);

impl Property for Width {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contiguous;

impl Property for Contiguous {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Optional;

impl Property for Optional {}

/// Parse integers as base 16. Set on a command to cover all its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hex;

impl Property for Hex {
    const INHERITABLE: bool = true;
}

/// Accept only resolved mentions for entity parameters. Set on a command to
/// cover all its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strict;

impl Property for Strict {
    const INHERITABLE: bool = true;
}

/// Display name of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

impl Property for Name {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_has() {
        let map = PropertyMap::new().with(Description("hello".into())).with(Hidden);
        assert!(map.has::<Hidden>());
        assert!(!map.has::<GuildOnly>());
        assert_eq!(map.get::<Description>().map(|d| d.0.as_str()), Some("hello"));
    }

    #[test]
    fn test_flatten_keeps_only_inheritable() {
        let parent = PropertyMap::new()
            .with(Category("admin".into()))
            .with(Hidden)
            .with(GuildOnly);
        let own = PropertyMap::new().with(Description("child".into()));

        let flat = parent.flatten(&own);
        assert!(flat.has::<Category>());
        assert!(flat.has::<GuildOnly>());
        assert!(!flat.has::<Hidden>());
        assert!(flat.has::<Description>());
    }

    #[test]
    fn test_own_entries_override_inherited() {
        let parent = PropertyMap::new().with(Category("admin".into()));
        let own = PropertyMap::new().with(Category("fun".into()));
        let flat = parent.flatten(&own);
        assert_eq!(flat.get::<Category>().map(|c| c.0.as_str()), Some("fun"));
    }

    #[test]
    fn test_type_ids_follow_insertion_order() {
        let map = PropertyMap::new().with(Hex).with(Strict).with(Contiguous);
        assert_eq!(
            map.type_ids(),
            vec![
                TypeId::of::<Hex>(),
                TypeId::of::<Strict>(),
                TypeId::of::<Contiguous>()
            ]
        );
    }
}
