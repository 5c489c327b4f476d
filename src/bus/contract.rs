use crate::config::BusConfig;
use crate::index::{DeclId, FileScope, SymbolTable};

/// Which bus operation a callable implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contract {
    Post,
    Observe,
    /// Top-level `observe<T> { }` extension; the event is the type argument
    ExtensionObserve,
}

/// Recognises the post and observe members of the configured bus
/// interface, and their overrides.
///
/// Fails closed: if the interface is missing, ambiguous or lacks a member,
/// the corresponding predicate is always false.
#[derive(Debug, Clone)]
pub struct ContractDetector {
    interface: Option<DeclId>,
    post: Option<DeclId>,
    observe: Option<DeclId>,
    post_name: String,
    observe_name: String,
    ext_observe_function: String,
}

impl ContractDetector {
    pub fn new(table: &SymbolTable, config: &BusConfig) -> Self {
        let interface = table.find_unique_class(&config.bus_interface);
        match (interface, table.find_classes(&config.bus_interface).len()) {
            (None, 0) => tracing::debug!("Bus interface {} not found", config.bus_interface),
            (None, n) => tracing::warn!(
                "Bus interface {} is declared {} times; no calls will match",
                config.bus_interface,
                n
            ),
            _ => {}
        }

        let member = |name: &str| {
            interface.and_then(|i| {
                table
                    .direct_members(i, name, |d| d.kind.is_callable())
                    .first()
                    .copied()
            })
        };

        Self {
            interface,
            post: member(&config.post_method),
            observe: member(&config.observe_method),
            post_name: config.post_method.clone(),
            observe_name: config.observe_method.clone(),
            ext_observe_function: config.ext_observe_function.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.interface.is_some()
    }

    pub fn is_post_contract(&self, table: &SymbolTable, decl: DeclId) -> bool {
        matches_member(table, self.post, decl)
    }

    pub fn is_observe_contract(&self, table: &SymbolTable, decl: DeclId) -> bool {
        matches_member(table, self.observe, decl)
    }

    pub fn is_extension_observe(&self, table: &SymbolTable, decl: DeclId) -> bool {
        self.is_available() && {
            let d = table.get(decl);
            d.kind.is_callable() && d.owner.is_none() && d.fq_name == self.ext_observe_function
        }
    }

    /// Cheap pre-filter on the callee name, before any resolution. Import
    /// aliases of the extension function in `scope` are honoured.
    pub fn may_match(&self, scope: &FileScope, name: &str) -> bool {
        if !self.is_available() {
            return false;
        }
        let ext_simple = self
            .ext_observe_function
            .rsplit('.')
            .next()
            .unwrap_or(&self.ext_observe_function);
        name == self.post_name
            || name == self.observe_name
            || name == ext_simple
            || scope.imports.iter().any(|i| {
                i.path == self.ext_observe_function && i.alias.as_deref() == Some(name)
            })
    }

    pub fn classify(&self, table: &SymbolTable, decl: DeclId) -> Option<Contract> {
        if self.is_post_contract(table, decl) {
            Some(Contract::Post)
        } else if self.is_observe_contract(table, decl) {
            Some(Contract::Observe)
        } else if self.is_extension_observe(table, decl) {
            Some(Contract::ExtensionObserve)
        } else {
            None
        }
    }
}

fn matches_member(table: &SymbolTable, member: Option<DeclId>, decl: DeclId) -> bool {
    match member {
        Some(member) => decl == member || table.overrides(decl, member),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::Project;

    const BUS: &str = r#"
package com.nwpu.ucdp.util;

public interface IEventBus {
    void post(Object event);
    void observe(Class<?> type, Object observer);
}
"#;

    const IMPL: &str = r#"
package demo;

import com.nwpu.ucdp.util.IEventBus;

public class LoggingBus implements IEventBus {
    @Override public void post(Object event) {}
    @Override public void observe(Class<?> type, Object observer) {}
    public void post(Object event, boolean sticky) {}
}

class Unrelated {
    public void post(Object event) {}
}
"#;

    const EXT: &str = r#"
package com.nwpu.ucdp.util

inline fun <reified T> IEventBus.observe(noinline block: (T) -> Unit) {}
"#;

    fn first(project: &Project, fq: &str, arity: usize) -> DeclId {
        *project
            .table()
            .by_fq_name(fq)
            .iter()
            .find(|id| project.table().get(**id).arity() == arity)
            .unwrap()
    }

    #[test]
    fn test_interface_members_and_overrides() {
        let project = Project::from_sources([
            ("IEventBus.java", BUS),
            ("LoggingBus.java", IMPL),
            ("Ext.kt", EXT),
        ])
        .unwrap();
        let table = project.table();
        let detector = ContractDetector::new(table, &BusConfig::default());
        assert!(detector.is_available());

        let post = first(&project, "com.nwpu.ucdp.util.IEventBus.post", 1);
        let observe = first(&project, "com.nwpu.ucdp.util.IEventBus.observe", 2);
        assert!(detector.is_post_contract(table, post));
        assert!(!detector.is_observe_contract(table, post));
        assert!(detector.is_observe_contract(table, observe));

        let override_post = first(&project, "demo.LoggingBus.post", 1);
        assert_eq!(detector.classify(table, override_post), Some(Contract::Post));
        let overload = first(&project, "demo.LoggingBus.post", 2);
        assert_eq!(detector.classify(table, overload), None);
        let unrelated = first(&project, "demo.Unrelated.post", 1);
        assert_eq!(detector.classify(table, unrelated), None);

        let ext = first(&project, "com.nwpu.ucdp.util.observe", 1);
        assert_eq!(detector.classify(table, ext), Some(Contract::ExtensionObserve));
    }

    #[test]
    fn test_missing_interface_fails_closed() {
        let project = Project::from_sources([("LoggingBus.java", IMPL)]).unwrap();
        let table = project.table();
        let detector = ContractDetector::new(table, &BusConfig::default());
        assert!(!detector.is_available());
        for decl in table.iter() {
            assert_eq!(detector.classify(table, decl.id), None);
        }
    }

    #[test]
    fn test_ambiguous_interface_fails_closed() {
        let project = Project::from_sources([
            ("a/IEventBus.java", BUS),
            ("b/IEventBus.java", BUS),
        ])
        .unwrap();
        let table = project.table();
        let detector = ContractDetector::new(table, &BusConfig::default());
        assert!(!detector.is_available());
        for decl in table.iter() {
            assert_eq!(detector.classify(table, decl.id), None);
        }
    }

    #[test]
    fn test_custom_interface_name() {
        let project = Project::from_sources([(
            "Bus.kt",
            "package my.bus\n\ninterface Bus {\n    fun send(event: Any)\n    fun listen(type: Class<*>, block: (Any) -> Unit)\n}\n",
        )])
        .unwrap();
        let table = project.table();
        let config = BusConfig {
            bus_interface: "my.bus.Bus".into(),
            post_method: "send".into(),
            observe_method: "listen".into(),
            ext_observe_function: "my.bus.listen".into(),
        };
        let detector = ContractDetector::new(table, &config);
        let send = first(&project, "my.bus.Bus.send", 1);
        let listen = first(&project, "my.bus.Bus.listen", 2);
        assert_eq!(detector.classify(table, send), Some(Contract::Post));
        assert_eq!(detector.classify(table, listen), Some(Contract::Observe));
    }

    #[test]
    fn test_may_match_names_and_aliases() {
        let project = Project::from_sources([
            ("IEventBus.java", BUS),
            ("Ext.kt", EXT),
            (
                "App.kt",
                "package demo\n\nimport com.nwpu.ucdp.util.observe as listen\n",
            ),
        ])
        .unwrap();
        let table = project.table();
        let detector = ContractDetector::new(table, &BusConfig::default());
        let plain = table.scope(crate::index::FileId(0));
        assert!(detector.may_match(plain, "post"));
        assert!(detector.may_match(plain, "observe"));
        assert!(!detector.may_match(plain, "listen"));
        assert!(!detector.may_match(plain, "send"));

        let aliased = table.scope(crate::index::FileId(2));
        assert!(detector.may_match(aliased, "listen"));
    }
}
