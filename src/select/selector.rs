// Tue Jan 20 2026 - Alex

use crate::config::Config;
use crate::graph::{CompilationUnit, NameId, Strings, TypeId};
use crate::layout::{LayoutAnalyzer, LayoutKind, LayoutReport};
use crate::registry::StructureRegistry;
use crate::reorg::{Repacked, Repacker, ReorgError};
use crate::select::{FilterChain, StructContext};
use log::debug;

/// A struct that passed every filter and was not seen before.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: TypeId,
    pub effective_name: Option<NameId>,
    pub report: LayoutReport,
    /// Set in packable mode: the repacked clone with positive savings.
    pub repacked: Option<Repacked>,
}

#[derive(Debug, Clone)]
pub enum Selection {
    Rejected,
    /// Already registered under this name; its definition count was bumped.
    SeenAgain(NameId),
    Candidate(Box<Candidate>),
}

impl Selection {
    pub fn is_candidate(&self) -> bool {
        matches!(self, Selection::Candidate(_))
    }
}

pub struct Selector {
    chain: FilterChain,
    analyzer: LayoutAnalyzer,
    repacker: Repacker,
    packable: bool,
}

impl Selector {
    pub fn new(chain: FilterChain, analyzer: LayoutAnalyzer, repacker: Repacker) -> Self {
        Self {
            chain,
            analyzer,
            repacker,
            packable: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            FilterChain::from_config(config),
            LayoutAnalyzer::new().with_flatten_anonymous(config.flatten_anonymous),
            Repacker::new(config.cacheline_size),
        )
        .with_packable(config.packable)
    }

    pub fn with_packable(mut self, packable: bool) -> Self {
        self.packable = packable;
        self
    }

    pub fn analyzer(&self) -> &LayoutAnalyzer {
        &self.analyzer
    }

    /// Runs the filter chain, the registry dedup and, when enabled, the
    /// packable check, in that order.
    pub fn select(
        &self,
        unit: &CompilationUnit,
        id: TypeId,
        strings: &Strings,
        registry: &mut StructureRegistry,
    ) -> Result<Selection, ReorgError> {
        let s = unit.struct_type(id)?;
        let report = self.analyzer.analyze(unit, id)?;
        let effective_name = effective_name(unit, id, s.name);

        let ctx = StructContext {
            unit,
            strings,
            id,
            s,
            report: &report,
            effective_name,
        };
        if !self.chain.accepts(&ctx) {
            return Ok(Selection::Rejected);
        }

        if let Some(name) = effective_name {
            if registry.note_definition(name) {
                debug!("struct {} seen again in {}", strings.get(name), unit.name());
                return Ok(Selection::SeenAgain(name));
            }
        }

        let repacked = if self.packable {
            if report.nr_holes() == 0 && report.nr_bit_holes() == 0 {
                return Ok(Selection::Rejected);
            }
            let repacked = self.repacker.repack_layout(unit, s, LayoutKind::Struct)?;
            if repacked.savings() == 0 {
                return Ok(Selection::Rejected);
            }
            Some(repacked)
        } else {
            None
        };

        Ok(Selection::Candidate(Box::new(Candidate {
            id,
            effective_name,
            report,
            repacked,
        })))
    }
}

/// Own name, else the first typedef aliasing the struct.
pub fn effective_name(unit: &CompilationUnit, id: TypeId, own: Option<NameId>) -> Option<NameId> {
    own.or_else(|| unit.first_typedef_of(id).map(|(_, t)| t.name))
}
