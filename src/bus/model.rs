use std::cmp::Ordering;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::index::{DeclId, SyntaxAnchor};

macro_rules! target {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize)]
        pub struct $name {
            /// Canonical qualified name; the identity of the target
            pub fq_name: String,
            /// Declarations standing for this target, first seen first
            pub representations: IndexSet<SyntaxAnchor>,
        }

        impl $name {
            pub fn new(fq_name: impl Into<String>, representation: SyntaxAnchor) -> Self {
                let mut representations = IndexSet::new();
                representations.insert(representation);
                Self {
                    fq_name: fq_name.into(),
                    representations,
                }
            }

            pub fn simple_name(&self) -> &str {
                self.fq_name.rsplit('.').next().unwrap_or(&self.fq_name)
            }

            pub fn package(&self) -> &str {
                self.fq_name
                    .rsplit_once('.')
                    .map(|(package, _)| package)
                    .unwrap_or("")
            }

            /// Adds the other target's representations; names must match.
            pub fn merge(&mut self, other: &$name) {
                debug_assert_eq!(self.fq_name, other.fq_name);
                self.representations
                    .extend(other.representations.iter().cloned());
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.fq_name == other.fq_name
            }
        }

        impl Eq for $name {}

        impl std::hash::Hash for $name {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.fq_name.hash(state);
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.fq_name)
            }
        }
    };
}

target!(
    /// A bus instance, identified by the field through which it is reached.
    BusTarget
);

target!(
    /// An event type, identified by its class.
    EventTarget
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Post,
    Observe,
}

impl Role {
    pub fn opposite(self) -> Role {
        match self {
            Role::Post => Role::Observe,
            Role::Observe => Role::Post,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Post => "post",
            Role::Observe => "observe",
        }
    }

    /// Noun for the party playing this role (`poster`, `observer`).
    pub fn party(&self) -> &'static str {
        match self {
            Role::Post => "poster",
            Role::Observe => "observer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the event type of a call site was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Static type of the posted argument
    StaticType,
    /// `X` of a `Class<X>`/`KClass<X>` argument, or an explicit type argument
    TypeArgument,
    /// Textual `X::class.java` / `X.javaClass` fallback
    ClassLiteralPattern,
}

/// A call to a bus contract method with whatever identity could be resolved.
#[derive(Debug, Clone, Serialize)]
pub struct CallSite {
    pub role: Role,
    /// The whole call expression
    pub call: SyntaxAnchor,
    /// The callee name; where navigation markers attach
    pub location: SyntaxAnchor,
    pub bus: Option<BusTarget>,
    pub event: Option<EventTarget>,
    #[serde(skip)]
    pub bus_decl: Option<DeclId>,
    pub event_source: Option<EventSource>,
}

impl CallSite {
    pub fn is_resolved(&self) -> bool {
        self.bus.is_some() && self.event.is_some()
    }

    pub fn pair(&self) -> Option<(&BusTarget, &EventTarget)> {
        Some((self.bus.as_ref()?, self.event.as_ref()?))
    }

    /// Whether `other` is a counterpart of this site: opposite role, same
    /// bus and same event.
    pub fn pairs_with(&self, other: &CallSite) -> bool {
        if other.role != self.role.opposite() {
            return false;
        }
        let same_bus = match (self.bus_decl, other.bus_decl) {
            (Some(a), Some(b)) if a == b => true,
            _ => match (&self.bus, &other.bus) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        };
        same_bus
            && match (&self.event, &other.event) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
    }
}

/// Bus entry of the correlation index.
#[derive(Debug, Clone, Serialize)]
pub struct BusEntry {
    pub bus: BusTarget,
    pub events: IndexMap<String, EventTarget>,
}

/// Event ordering for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventOrder {
    /// First-seen order
    Scan,
    /// Package, then simple name
    #[default]
    Name,
    /// Package, then reversed simple name (groups `...Event` suffixes)
    ReverseName,
}

impl EventOrder {
    fn key(self, event: &EventTarget) -> String {
        match self {
            EventOrder::Scan => String::new(),
            EventOrder::Name => format!("{}.{}", event.package(), event.simple_name()),
            EventOrder::ReverseName => format!(
                "{}.{}",
                event.package(),
                event.simple_name().chars().rev().collect::<String>()
            ),
        }
    }
}

/// One bus with its events in presentation order.
#[derive(Debug, Clone, Serialize)]
pub struct SortedGroup<'a> {
    pub bus: &'a BusTarget,
    pub events: Vec<&'a EventTarget>,
}

/// Every (bus, event) pair with at least one resolved post or observe site.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct CorrelationIndex {
    entries: IndexMap<String, BusEntry>,
}

impl CorrelationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a pair, merging representations. Returns true for a new pair.
    pub fn insert(&mut self, bus: &BusTarget, event: &EventTarget) -> bool {
        let entry = self
            .entries
            .entry(bus.fq_name.clone())
            .or_insert_with(|| BusEntry {
                bus: BusTarget {
                    fq_name: bus.fq_name.clone(),
                    representations: IndexSet::new(),
                },
                events: IndexMap::new(),
            });
        entry.bus.merge(bus);

        match entry.events.get_mut(&event.fq_name) {
            Some(existing) => {
                existing.merge(event);
                false
            }
            None => {
                entry.events.insert(event.fq_name.clone(), event.clone());
                true
            }
        }
    }

    /// Number of buses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of (bus, event) pairs.
    pub fn pair_count(&self) -> usize {
        self.entries.values().map(|e| e.events.len()).sum()
    }

    pub fn get(&self, bus: &str) -> Option<&BusEntry> {
        self.entries.get(bus)
    }

    pub fn contains(&self, bus: &str, event: &str) -> bool {
        self.entries
            .get(bus)
            .map(|e| e.events.contains_key(event))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BusEntry> {
        self.entries.values()
    }

    pub fn bus_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn event_names<'a>(&'a self, bus: &str) -> Vec<&'a str> {
        self.entries
            .get(bus)
            .map(|e| e.events.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Buses by name, events in the requested order.
    pub fn sorted(&self, order: EventOrder) -> Vec<SortedGroup<'_>> {
        let mut groups: Vec<SortedGroup<'_>> = self
            .entries
            .values()
            .map(|entry| {
                let mut events: Vec<&EventTarget> = entry.events.values().collect();
                if order != EventOrder::Scan {
                    events.sort_by_cached_key(|e| order.key(e));
                }
                SortedGroup {
                    bus: &entry.bus,
                    events,
                }
            })
            .collect();
        groups.sort_by(|a, b| a.bus.fq_name.cmp(&b.bus.fq_name));
        groups
    }
}

/// Navigation marker for one call site.
#[derive(Debug, Clone, Serialize)]
pub struct LineMarker {
    pub role: Role,
    pub location: SyntaxAnchor,
    pub bus: String,
    pub event: String,
    pub tooltip: String,
    pub targets: Vec<SyntaxAnchor>,
}

impl LineMarker {
    pub fn tooltip_for(role: Role, event_simple_name: &str) -> String {
        format!(
            "Navigate to {} {}",
            event_simple_name,
            role.opposite().party()
        )
    }
}

impl PartialOrd for LineMarker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LineMarker {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.location.line, self.location.column).cmp(&(other.location.line, other.location.column))
    }
}

impl PartialEq for LineMarker {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location && self.role == other.role
    }
}

impl Eq for LineMarker {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::Dialect;
    use std::path::PathBuf;

    fn anchor(file: &str, line: u32) -> SyntaxAnchor {
        SyntaxAnchor {
            file: PathBuf::from(file),
            dialect: Dialect::Kotlin,
            byte_range: 0..1,
            line,
            column: 0,
            text: "x".into(),
        }
    }

    #[test]
    fn test_targets_compare_by_name_only() {
        let a = BusTarget::new("demo.Bus.INSTANCE", anchor("Bus.kt", 1));
        let b = BusTarget::new("demo.Bus.INSTANCE", anchor("Bus.java", 9));
        assert_eq!(a, b);
        assert_ne!(a, BusTarget::new("demo.Other.INSTANCE", anchor("Bus.kt", 1)));
    }

    #[test]
    fn test_role_opposite() {
        assert_eq!(Role::Post.opposite(), Role::Observe);
        assert_eq!(Role::Observe.opposite(), Role::Post);
        assert_eq!(Role::Post.opposite().opposite(), Role::Post);
    }

    #[test]
    fn test_index_insert_merges_representations() {
        let mut index = CorrelationIndex::new();
        let bus = BusTarget::new("demo.Bus.INSTANCE", anchor("Bus.kt", 1));
        let event = EventTarget::new("demo.Login", anchor("Login.kt", 1));

        assert!(index.insert(&bus, &event));
        assert!(!index.insert(&bus, &event));

        let other_rep = EventTarget::new("demo.Login", anchor("Login.java", 3));
        assert!(!index.insert(&bus, &other_rep));

        assert_eq!(index.len(), 1);
        assert_eq!(index.pair_count(), 1);
        let entry = index.get("demo.Bus.INSTANCE").unwrap();
        assert_eq!(entry.events["demo.Login"].representations.len(), 2);
        assert_eq!(entry.bus.representations.len(), 1);
        assert!(index.contains("demo.Bus.INSTANCE", "demo.Login"));
        assert!(!index.contains("demo.Bus.INSTANCE", "demo.Logout"));
    }

    #[test]
    fn test_sorted_orders() {
        let mut index = CorrelationIndex::new();
        let bus_b = BusTarget::new("demo.B.INSTANCE", anchor("B.kt", 1));
        let bus_a = BusTarget::new("demo.A.INSTANCE", anchor("A.kt", 1));
        let zed = EventTarget::new("demo.e.ZedEvent", anchor("Z.kt", 1));
        let alpha = EventTarget::new("demo.e.AlphaDone", anchor("A.kt", 1));
        index.insert(&bus_b, &zed);
        index.insert(&bus_b, &alpha);
        index.insert(&bus_a, &zed);

        let by_name = index.sorted(EventOrder::Name);
        assert_eq!(by_name[0].bus.fq_name, "demo.A.INSTANCE");
        let names: Vec<&str> = by_name[1].events.iter().map(|e| e.simple_name()).collect();
        assert_eq!(names, vec!["AlphaDone", "ZedEvent"]);

        let scan = index.sorted(EventOrder::Scan);
        let names: Vec<&str> = scan[1].events.iter().map(|e| e.simple_name()).collect();
        assert_eq!(names, vec!["ZedEvent", "AlphaDone"]);

        // "enoDahplA" < "tnevEdeZ"
        let reversed = index.sorted(EventOrder::ReverseName);
        let names: Vec<&str> = reversed[1].events.iter().map(|e| e.simple_name()).collect();
        assert_eq!(names, vec!["AlphaDone", "ZedEvent"]);
    }

    #[test]
    fn test_pairs_with() {
        let bus = BusTarget::new("demo.Bus.INSTANCE", anchor("Bus.kt", 1));
        let event = EventTarget::new("demo.Login", anchor("Login.kt", 1));
        let site = |role, event: Option<EventTarget>| CallSite {
            role,
            call: anchor("Main.kt", 5),
            location: anchor("Main.kt", 5),
            bus: Some(bus.clone()),
            event,
            bus_decl: None,
            event_source: Some(EventSource::StaticType),
        };

        let post = site(Role::Post, Some(event.clone()));
        let observe = site(Role::Observe, Some(event.clone()));
        assert!(post.pairs_with(&observe));
        assert!(observe.pairs_with(&post));
        assert!(!post.pairs_with(&post));

        let other = site(
            Role::Observe,
            Some(EventTarget::new("demo.Logout", anchor("Logout.kt", 1))),
        );
        assert!(!post.pairs_with(&other));
        assert!(!post.pairs_with(&site(Role::Observe, None)));
    }

    #[test]
    fn test_tooltip() {
        assert_eq!(
            LineMarker::tooltip_for(Role::Post, "LoginEvent"),
            "Navigate to LoginEvent observer"
        );
        assert_eq!(
            LineMarker::tooltip_for(Role::Observe, "LoginEvent"),
            "Navigate to LoginEvent poster"
        );
    }
}
