use super::calls::{extract_calls_matching, CallExpression};
use super::contract::{Contract, ContractDetector};
use super::identity::{resolve_bus_identity, resolve_event_type};
use super::model::{CallSite, Role};
use crate::resolve::{resolver_for, FileContext};

/// Every bus contract call of a file, resolved as far as possible.
pub fn scan_file(ctx: FileContext<'_>, detector: &ContractDetector) -> Vec<CallSite> {
    if !detector.is_available() {
        return Vec::new();
    }
    let scope = ctx.table.scope(ctx.file_id);
    extract_calls_matching(ctx, move |name| detector.may_match(scope, name))
        .filter_map(|call| classify_call(&ctx, detector, &call))
        .collect()
}

/// Turns a resolved call into a call site if it targets a bus contract.
pub fn classify_call(
    ctx: &FileContext,
    detector: &ContractDetector,
    call: &CallExpression,
) -> Option<CallSite> {
    let target = call.target?;
    let contract = detector.classify(ctx.table, target)?;
    let parts = resolver_for(ctx.file.dialect).call_parts(ctx, call.node)?;

    let role = match contract {
        Contract::Post => Role::Post,
        Contract::Observe | Contract::ExtensionObserve => Role::Observe,
    };
    let bus = resolve_bus_identity(ctx, &parts);
    let event = resolve_event_type(ctx, &parts, contract);

    if bus.is_none() || event.is_none() {
        tracing::trace!(
            "Unresolved {} call at {}:{} (bus: {}, event: {})",
            role,
            ctx.file.path.display(),
            call.node.start_position().row + 1,
            bus.is_some(),
            event.is_some()
        );
    }

    let (bus_decl, bus) = match bus {
        Some((decl, target)) => (Some(decl), Some(target)),
        None => (None, None),
    };
    let (event, event_source) = match event {
        Some((target, source)) => (Some(target), Some(source)),
        None => (None, None),
    };

    Some(CallSite {
        role,
        call: ctx.file.anchor(&call.node),
        location: ctx.file.anchor(&parts.name),
        bus,
        event,
        bus_decl,
        event_source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::model::EventSource;
    use crate::config::BusConfig;
    use crate::index::FileId;
    use crate::indexer::Project;

    const BUS: &str = r#"
package com.nwpu.ucdp.util

interface IEventBus {
    fun post(event: Any)
    fun <T> observe(type: Class<T>, observer: (T) -> Unit)
}

inline fun <reified T> IEventBus.observe(noinline observer: (T) -> Unit) {
    observe(T::class.java, observer)
}
"#;

    #[test]
    fn test_scan_kotlin_file() {
        let project = Project::from_sources([
            ("IEventBus.kt", BUS),
            (
                "App.kt",
                r#"
package demo

import com.nwpu.ucdp.util.IEventBus
import com.nwpu.ucdp.util.observe

object Bus : IEventBus by Impl()

class Login

fun wire() {
    Bus.post(Login())
    Bus.observe<Login> { }
    println("unrelated")
}
"#,
            ),
        ])
        .unwrap();
        let detector = ContractDetector::new(project.table(), &BusConfig::default());
        let sites = scan_file(project.context(FileId(1)), &detector);
        assert_eq!(sites.len(), 2);

        let post = &sites[0];
        assert_eq!(post.role, Role::Post);
        assert_eq!(post.location.text, "post");
        assert_eq!(post.bus.as_ref().unwrap().fq_name, "demo.Bus.INSTANCE");
        assert_eq!(post.event.as_ref().unwrap().fq_name, "demo.Login");
        assert_eq!(post.event_source, Some(EventSource::StaticType));

        let observe = &sites[1];
        assert_eq!(observe.role, Role::Observe);
        assert!(observe.is_resolved());
        assert!(post.pairs_with(observe));
    }

    #[test]
    fn test_scan_kotlin_observe_forms() {
        let project = Project::from_sources([
            ("IEventBus.kt", BUS),
            (
                "App.kt",
                r#"
package demo

import com.nwpu.ucdp.util.IEventBus
import com.nwpu.ucdp.util.observe

object Bus : IEventBus by Impl()

class Login

fun listen() {
    Bus.observe(Login::class.java) { println(it) }
    Bus.observe<Login> { println(it) }
}
"#,
            ),
        ])
        .unwrap();
        let detector = ContractDetector::new(project.table(), &BusConfig::default());
        let sites = scan_file(project.context(FileId(1)), &detector);
        assert_eq!(sites.len(), 2);

        for site in &sites {
            assert_eq!(site.role, Role::Observe);
            assert_eq!(site.location.text, "observe");
            assert_eq!(site.bus.as_ref().unwrap().fq_name, "demo.Bus.INSTANCE");
            assert_eq!(site.event.as_ref().unwrap().fq_name, "demo.Login");
        }
        assert!(sites[0].call.text.starts_with("Bus.observe(Login::class.java) {"));
        assert_eq!(sites[1].event_source, Some(EventSource::TypeArgument));
    }

    #[test]
    fn test_unresolved_sites_are_kept_but_unpaired() {
        let project = Project::from_sources([
            ("IEventBus.kt", BUS),
            (
                "App.kt",
                r#"
package demo

import com.nwpu.ucdp.util.IEventBus

class Holder(val bus: IEventBus)

fun wire(holder: Holder) {
    holder.bus.post(Any())
}
"#,
            ),
        ])
        .unwrap();
        let detector = ContractDetector::new(project.table(), &BusConfig::default());
        let sites = scan_file(project.context(FileId(1)), &detector);
        assert_eq!(sites.len(), 1);
        assert!(sites[0].bus.is_none());
        assert!(!sites[0].is_resolved());
    }

    #[test]
    fn test_no_interface_no_sites() {
        let project = Project::from_sources([(
            "App.kt",
            "package demo\n\nobject Bus { fun post(e: Any) {} }\n\nfun f() { Bus.post(1) }\n",
        )])
        .unwrap();
        let detector = ContractDetector::new(project.table(), &BusConfig::default());
        assert!(scan_file(project.context(FileId(0)), &detector).is_empty());
    }
}
