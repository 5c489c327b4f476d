//! Point queries: counterparts of one call site and per-file line markers.

use std::ops::Range;
use std::sync::Arc;

use rayon::prelude::*;

use super::contract::ContractDetector;
use super::model::{CallSite, LineMarker};
use super::scanner::scan_file;
use crate::config::BusConfig;
use crate::index::{FileId, SyntaxAnchor};
use crate::indexer::Project;

pub struct PointQuery {
    project: Arc<Project>,
    detector: Arc<ContractDetector>,
}

impl PointQuery {
    pub fn new(project: Arc<Project>, config: &BusConfig) -> Self {
        let detector = Arc::new(ContractDetector::new(project.table(), config));
        Self { project, detector }
    }

    pub fn with_detector(project: Arc<Project>, detector: Arc<ContractDetector>) -> Self {
        Self { project, detector }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Every contract call site of a file.
    pub fn call_sites(&self, file: FileId) -> Vec<CallSite> {
        scan_file(self.project.context(file), &self.detector)
    }

    /// The innermost contract call covering `line` (1-based) and, if given,
    /// `column` (0-based).
    pub fn locate(&self, file: FileId, line: u32, column: Option<u32>) -> Option<CallSite> {
        let parsed = self.project.file(file);
        let span = match column {
            Some(column) => {
                let offset = parsed.offset_of(line, column)?;
                offset..offset + 1
            }
            None => parsed.offset_of(line, 0)?..parsed.offset_of(line, u32::MAX)? + 1,
        };
        self.call_sites(file)
            .into_iter()
            .filter(|site| overlaps(&site.call, &span))
            .min_by_key(|site| site.call.byte_range.len())
    }

    /// Call sites of the opposite role on the same bus with the same
    /// event, across the whole project, in file then position order.
    /// Unresolved sites have no counterparts.
    pub fn find_counterparts(&self, site: &CallSite) -> Vec<SyntaxAnchor> {
        if !site.is_resolved() {
            return Vec::new();
        }
        let sites = self.all_sites();
        counterparts_in(&sites, site)
    }

    /// One marker per contract call of `file`; unresolved calls get a
    /// marker without targets.
    pub fn markers(&self, file: FileId) -> Vec<LineMarker> {
        let own = self.call_sites(file);
        if own.is_empty() {
            return Vec::new();
        }
        let all = self.all_sites();

        let mut markers: Vec<LineMarker> = own
            .iter()
            .map(|site| {
                let event = site.event.as_ref();
                LineMarker {
                    role: site.role,
                    location: site.location.clone(),
                    bus: site.bus.as_ref().map(|b| b.fq_name.clone()).unwrap_or_default(),
                    event: event.map(|e| e.fq_name.clone()).unwrap_or_default(),
                    tooltip: LineMarker::tooltip_for(
                        site.role,
                        event.map(|e| e.simple_name()).unwrap_or("event"),
                    ),
                    targets: if site.is_resolved() {
                        counterparts_in(&all, site)
                    } else {
                        Vec::new()
                    },
                }
            })
            .collect();
        markers.sort();
        markers
    }

    fn all_sites(&self) -> Vec<CallSite> {
        (0..self.project.len())
            .into_par_iter()
            .flat_map_iter(|i| self.call_sites(FileId(i)))
            .collect()
    }
}

fn counterparts_in(sites: &[CallSite], site: &CallSite) -> Vec<SyntaxAnchor> {
    let mut found: Vec<SyntaxAnchor> = sites
        .iter()
        .filter(|other| site.pairs_with(other))
        .map(|other| other.location.clone())
        .collect();
    found.sort_by(|a, b| (&a.file, a.line, a.column).cmp(&(&b.file, b.line, b.column)));
    found.dedup();
    found
}

fn overlaps(anchor: &SyntaxAnchor, span: &Range<usize>) -> bool {
    anchor.byte_range.start < span.end && span.start < anchor.byte_range.end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::model::Role;

    const BUS: &str = r#"
package com.nwpu.ucdp.util;

public interface IEventBus {
    void post(Object event);
    <T> void observe(Class<T> type, Object observer);
}
"#;

    const BUSES: &str = r#"
package demo

import com.nwpu.ucdp.util.IEventBus

object BusA : IEventBus by Impl()
object BusB : IEventBus by Impl()

class Foo
class Bar
"#;

    const POSTER: &str = r#"
package demo;

public class Poster {
    void fire() {
        BusA.INSTANCE.post(new Foo());
        BusB.INSTANCE.post(new Foo());
    }
}
"#;

    const OBSERVER: &str = r#"
package demo

fun listen() {
    BusA.observe(Foo::class.java) { }
    BusA.observe(Bar::class.java) { }
}
"#;

    fn query() -> PointQuery {
        let project = Project::from_sources([
            ("IEventBus.java", BUS),
            ("Buses.kt", BUSES),
            ("Poster.java", POSTER),
            ("Observer.kt", OBSERVER),
        ])
        .unwrap();
        PointQuery::new(Arc::new(project), &BusConfig::default())
    }

    #[test]
    fn test_locate_by_line() {
        let query = query();
        let site = query.locate(FileId(2), 6, None).unwrap();
        assert_eq!(site.role, Role::Post);
        assert_eq!(site.bus.as_ref().unwrap().fq_name, "demo.BusA.INSTANCE");
        assert!(query.locate(FileId(2), 4, None).is_none());

        let by_column = query.locate(FileId(2), 7, Some(12)).unwrap();
        assert_eq!(by_column.bus.as_ref().unwrap().fq_name, "demo.BusB.INSTANCE");
        assert!(query.locate(FileId(2), 7, Some(0)).is_none());
        assert!(query.locate(FileId(2), 99, None).is_none());
    }

    #[test]
    fn test_counterparts_across_dialects() {
        let query = query();
        let post_a = query.locate(FileId(2), 6, None).unwrap();
        let targets = query.find_counterparts(&post_a);
        assert_eq!(targets.len(), 1);
        assert!(targets[0].file.ends_with("Observer.kt"));
        assert_eq!(targets[0].line, 5);

        let observe_foo = query.locate(FileId(3), 5, None).unwrap();
        let back = query.find_counterparts(&observe_foo);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].line, 6);

        // BusB has no observer.
        let post_b = query.locate(FileId(2), 7, None).unwrap();
        assert!(query.find_counterparts(&post_b).is_empty());
    }

    #[test]
    fn test_markers() {
        let query = query();
        let markers = query.markers(FileId(3));
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].tooltip, "Navigate to Foo poster");
        assert_eq!(markers[0].targets.len(), 1);
        assert_eq!(markers[1].event, "demo.Bar");
        assert!(markers[1].targets.is_empty());
        assert!(query.markers(FileId(1)).is_empty());
    }
}
