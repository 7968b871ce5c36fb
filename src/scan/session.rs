// Tue Jan 20 2026 - Alex

use crate::config::{ClassMode, Config};
use crate::graph::{CompilationUnit, GraphError, NameId, Strings, StructType, TypeId, TypeNode};
use crate::layout::{LayoutAnalyzer, LayoutKind, LayoutView};
use crate::output::Aggregate;
use crate::registry::StructureRegistry;
use crate::reorg::Repacker;
use crate::resize::WordResizer;
use crate::scan::{
    ClassFinding, Finding, Flow, PackedSize, Reorganized, ScanError, StepView, UnitOutcome,
};
use crate::select::{Candidate, Selection, Selector, UnitFilter};
use log::{debug, info, warn};

const MAX_CONTAINER_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub units_seen: usize,
    pub units_skipped: usize,
    pub structs_reported: usize,
    pub structs_resized: usize,
}

/// Owns everything that lives for one run: configuration, interned names
/// and the structure registry. Units are fed one at a time.
pub struct Session {
    config: Config,
    strings: Strings,
    registry: StructureRegistry,
    selector: Selector,
    unit_filter: UnitFilter,
    resizer: Option<WordResizer>,
    class_sname: Option<NameId>,
    stats: ScanStats,
}

impl Session {
    pub fn new(config: Config, strings: Strings) -> Result<Self, ScanError> {
        config.validate().map_err(ScanError::Config)?;
        let resizer = match config.word_size {
            Some(word_size) => Some(WordResizer::new(word_size, &strings)?),
            None => None,
        };
        let class_sname = config.class_name.as_deref().and_then(|name| strings.lookup(name));
        if let (Some(name), None) = (&config.class_name, class_sname) {
            warn!("struct {} does not appear in the input", name);
        }

        Ok(Self {
            selector: Selector::from_config(&config),
            unit_filter: UnitFilter::new(config.cu_exclude_prefix.clone()),
            registry: StructureRegistry::new(),
            config,
            strings,
            resizer,
            class_sname,
            stats: ScanStats::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn strings(&self) -> &Strings {
        &self.strings
    }

    pub fn registry(&self) -> &StructureRegistry {
        &self.registry
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Feeds units in order until one asks to stop, collecting every finding.
    pub fn scan<I>(&mut self, units: I) -> Result<Vec<Finding>, ScanError>
    where
        I: IntoIterator<Item = CompilationUnit>,
    {
        let mut findings = Vec::new();
        for mut unit in units {
            let outcome = self.process_unit(&mut unit)?;
            findings.extend(outcome.findings);
            if outcome.flow == Flow::Stop {
                break;
            }
        }
        findings.extend(self.finish());
        Ok(findings)
    }

    pub fn process_unit(&mut self, unit: &mut CompilationUnit) -> Result<UnitOutcome, ScanError> {
        if !self.unit_filter.accepts(unit) {
            info!("Skipping unit {}", unit.name());
            self.stats.units_skipped += 1;
            return Ok(UnitOutcome::proceed(Vec::new()));
        }
        self.stats.units_seen += 1;
        info!("Processing unit {} ({} types)", unit.name(), unit.len());

        if self.config.defined_in {
            return Ok(UnitOutcome::proceed(self.defined_in(unit)));
        }

        let focus = match &self.config.class_name {
            Some(_) => match self.find_focus(unit) {
                Some(id) => Some(id),
                None => return Ok(UnitOutcome::proceed(Vec::new())),
            },
            None => None,
        };

        if self.config.aggregate == Some(Aggregate::Methods) {
            self.account_methods(unit)?;
            return Ok(UnitOutcome::proceed(Vec::new()));
        }

        if let Some(resizer) = &self.resizer {
            let outcome = resizer.resize(unit)?;
            self.stats.structs_resized += outcome.nr_resized();
            debug!(
                "{}: {} types resized from word size {} to {}",
                unit.name(),
                outcome.nr_resized(),
                outcome.original_word_size,
                outcome.word_size
            );
        }

        if let Some(raw) = self.config.type_id {
            let finding = self.type_finding(unit, TypeId(raw))?;
            return Ok(UnitOutcome::stop(vec![finding]));
        }

        let mut findings = Vec::new();
        let id = match focus {
            Some(id) => id,
            None => {
                self.collect_classes(unit, &mut findings)?;
                return Ok(UnitOutcome::proceed(findings));
            }
        };

        match self.config.class_mode {
            ClassMode::Reorganize => {
                findings.push(self.reorganize(unit, id)?);
                Ok(UnitOutcome::stop(findings))
            }
            ClassMode::Containers => {
                self.containers(unit, id, 0, &mut findings)?;
                Ok(UnitOutcome::proceed(findings))
            }
            ClassMode::PointersTo => {
                self.pointers_to(unit, id, &mut findings)?;
                Ok(UnitOutcome::proceed(findings))
            }
            ClassMode::Layout => {
                let view = self.layout_view(unit, id)?;
                findings.push(Finding::Layout(Box::new(view)));
                Ok(UnitOutcome::stop(findings))
            }
        }
    }

    /// Aggregate lines, in registry insertion order. Clears the registry.
    pub fn finish(&mut self) -> Vec<Finding> {
        let findings = match self.config.aggregate {
            Some(aggregate) => self
                .registry
                .iter()
                .map(|entry| Finding::Aggregate {
                    name: self.strings.get(entry.name).to_string(),
                    count: match aggregate {
                        Aggregate::Definitions => entry.nr_files,
                        Aggregate::Methods => entry.nr_methods,
                    },
                })
                .collect(),
            None => Vec::new(),
        };
        info!(
            "Scan finished: {} units, {} skipped, {} structures registered",
            self.stats.units_seen,
            self.stats.units_skipped,
            self.registry.len()
        );
        self.registry.clear();
        findings
    }

    fn defined_in(&self, unit: &CompilationUnit) -> Vec<Finding> {
        match self.class_sname {
            Some(name) if unit.find_struct_by_name(name, false).is_some() => vec![Finding::DefinedIn {
                unit: unit.name().to_string(),
            }],
            _ => Vec::new(),
        }
    }

    fn find_focus(&self, unit: &CompilationUnit) -> Option<TypeId> {
        let include_decls = self.config.class_mode == ClassMode::PointersTo
            || self.config.aggregate == Some(Aggregate::Methods);
        unit.find_struct_by_name(self.class_sname?, include_decls)
    }

    fn collect_classes(&mut self, unit: &CompilationUnit, findings: &mut Vec<Finding>) -> Result<(), ScanError> {
        let ids: Vec<TypeId> = unit.structs().map(|(id, _)| id).collect();
        for id in ids {
            let selection = match self.selector.select(unit, id, &self.strings, &mut self.registry) {
                Ok(selection) => selection,
                Err(err) => {
                    let err = ScanError::from(err);
                    if err.is_fatal() {
                        return Err(err);
                    }
                    warn!("skipping type {} in {}: {}", id, unit.name(), err);
                    continue;
                }
            };
            let candidate = match selection {
                Selection::Candidate(candidate) => candidate,
                Selection::SeenAgain(_) | Selection::Rejected => continue,
            };
            if self.config.aggregate != Some(Aggregate::Definitions) {
                findings.push(Finding::Class(Box::new(self.class_finding(unit, &candidate)?)));
                self.stats.structs_reported += 1;
            }
            if let Some(name) = candidate.effective_name {
                self.registry.add(name).map_err(|e| {
                    warn!("insufficient memory for processing {}, skipping it", unit.name());
                    e
                })?;
            }
        }
        Ok(())
    }

    fn class_finding(&self, unit: &CompilationUnit, candidate: &Candidate) -> Result<ClassFinding, ScanError> {
        let s = unit.struct_type(candidate.id)?;
        let alias = match s.name {
            Some(_) => None,
            None => candidate.effective_name.map(|n| self.strings.get(n).to_string()),
        };
        let view = LayoutView::build(unit, s, &candidate.report, &self.strings, self.config.cacheline_size)
            .with_typedef_alias(alias);
        let name = match candidate.effective_name {
            Some(name) => self.strings.get(name).to_string(),
            None => match (unit.decl_file(candidate.id, &self.strings), unit.decl_line(candidate.id)) {
                (Some(file), Some(line)) => format!("{}({})", file, line),
                _ => format!("<anonymous:{}>", candidate.id),
            },
        };
        let packed = candidate.repacked.as_ref().map(|r| PackedSize {
            old_size: r.original_size,
            new_size: r.new_size(),
            savings: r.savings(),
        });
        Ok(ClassFinding { name, view, packed })
    }

    /// Bumps the usage count of every named struct a parameter points to,
    /// registering it first when it passes selection.
    fn account_methods(&mut self, unit: &CompilationUnit) -> Result<(), ScanError> {
        for function in unit.functions() {
            for param in &function.params {
                let target = match unit.resolve(param.type_id)? {
                    TypeNode::Pointer(Some(target)) => *target,
                    _ => continue,
                };
                let name = match unit.resolve(target)? {
                    TypeNode::Struct(StructType { name: Some(name), .. }) => *name,
                    _ => continue,
                };
                if !self.registry.contains(name) {
                    match self.selector.select(unit, target, &self.strings, &mut self.registry)? {
                        Selection::Candidate(_) => {
                            self.registry.add(name)?;
                        }
                        Selection::SeenAgain(_) | Selection::Rejected => continue,
                    }
                }
                self.registry.bump_methods(name);
            }
        }
        Ok(())
    }

    fn layout_view(&self, unit: &CompilationUnit, id: TypeId) -> Result<LayoutView, ScanError> {
        let s = unit.struct_type(id)?;
        let report = self.selector.analyzer().analyze(unit, id)?;
        let alias = match s.name {
            Some(_) => None,
            None => unit.first_typedef_of(id).map(|(_, t)| self.strings.get(t.name).to_string()),
        };
        Ok(LayoutView::build(unit, s, &report, &self.strings, self.config.cacheline_size).with_typedef_alias(alias))
    }

    fn type_finding(&self, unit: &CompilationUnit, id: TypeId) -> Result<Finding, ScanError> {
        let node = unit.resolve(id).map_err(|e| match e {
            GraphError::UnresolvedType { .. } => ScanError::UnknownTypeId(id.0),
            other => ScanError::Graph(other),
        })?;
        if node.is_composite() {
            return Ok(Finding::Layout(Box::new(self.layout_view(unit, id)?)));
        }
        Ok(Finding::TypeName(unit.type_name(Some(id), &self.strings)))
    }

    fn reorganize(&self, unit: &CompilationUnit, id: TypeId) -> Result<Finding, ScanError> {
        let kind = LayoutKind::of(unit.resolve(id)?).ok_or(GraphError::NotComposite(id))?;
        let s = unit.struct_type(id)?;
        let cacheline_size = self.config.cacheline_size;
        let repacked = Repacker::new(cacheline_size)
            .with_trace(self.config.show_reorg_steps)
            .repack_layout(unit, s, kind)?;

        let analyzer = LayoutAnalyzer::new().with_flatten_anonymous(self.config.flatten_anonymous);
        let mut steps = Vec::with_capacity(repacked.steps.len());
        for step in &repacked.steps {
            let report = analyzer.analyze_layout(unit, &step.layout, kind)?;
            let moved = s.members[step.member]
                .name
                .map(|n| self.strings.get(n).to_string())
                .unwrap_or_default();
            steps.push(StepView {
                moved,
                offset: step.offset,
                view: LayoutView::build(unit, &step.layout, &report, &self.strings, cacheline_size),
            });
        }

        let report = analyzer.analyze_layout(unit, &repacked.clone, kind)?;
        let result = LayoutView::build(unit, &repacked.clone, &report, &self.strings, cacheline_size);
        info!("Reorganized {}: saved {} bytes", result.display_name(), repacked.savings());
        Ok(Finding::Reorganized(Box::new(Reorganized {
            steps,
            result,
            savings: repacked.savings(),
            cacheline_savings: repacked.cacheline_savings(cacheline_size),
        })))
    }

    fn containers(
        &mut self,
        unit: &CompilationUnit,
        target: TypeId,
        depth: usize,
        findings: &mut Vec<Finding>,
    ) -> Result<(), ScanError> {
        if depth >= MAX_CONTAINER_DEPTH {
            warn!("container nesting deeper than {} in {}", MAX_CONTAINER_DEPTH, unit.name());
            return Ok(());
        }
        for (id, s) in unit.structs() {
            let name = match s.name {
                Some(name) => name,
                None => continue,
            };
            let count = unit.nr_members_of_type(s, target);
            if count == 0 {
                continue;
            }
            if depth == 0 {
                if self.registry.contains(name) {
                    continue;
                }
                self.registry.add(name)?;
            }
            findings.push(Finding::Container {
                name: self.strings.get(name).to_string(),
                depth,
                count,
            });
            if self.config.recursive {
                self.containers(unit, id, depth + 1, findings)?;
            }
        }
        Ok(())
    }

    fn pointers_to(&mut self, unit: &CompilationUnit, target: TypeId, findings: &mut Vec<Finding>) -> Result<(), ScanError> {
        for (_, s) in unit.structs() {
            let name = match s.name {
                Some(name) => name,
                None => continue,
            };
            for member in &s.members {
                match unit.resolve(member.type_id)? {
                    TypeNode::Pointer(Some(pointee)) if *pointee == target => {}
                    _ => continue,
                }
                if self.registry.contains(name) {
                    break;
                }
                self.registry.add(name)?;
                findings.push(Finding::PointerMember {
                    struct_name: self.strings.get(name).to_string(),
                    member: member.name.map(|n| self.strings.get(n).to_string()).unwrap_or_default(),
                });
                break;
            }
        }
        Ok(())
    }
}
