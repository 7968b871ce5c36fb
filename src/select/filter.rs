// Tue Jan 20 2026 - Alex

use crate::config::Config;
use crate::graph::{CompilationUnit, NameId, Strings, StructType, TypeId};
use crate::layout::LayoutReport;
use log::trace;

/// Everything a predicate may look at for one struct.
pub struct StructContext<'a> {
    pub unit: &'a CompilationUnit,
    pub strings: &'a Strings,
    pub id: TypeId,
    pub s: &'a StructType,
    pub report: &'a LayoutReport,
    /// Own name, else the name of the first typedef aliasing it.
    pub effective_name: Option<NameId>,
}

impl<'a> StructContext<'a> {
    pub fn effective_name_str(&self) -> Option<&'a str> {
        self.effective_name.map(|n| self.strings.get(n))
    }

    pub fn is_aliased(&self) -> bool {
        self.s.name.is_none() && self.effective_name.is_some()
    }
}

pub trait Predicate {
    fn name(&self) -> &'static str;
    fn accepts(&self, ctx: &StructContext<'_>) -> bool;
}

pub struct TopLevelDefinition;

impl Predicate for TopLevelDefinition {
    fn name(&self) -> &'static str {
        "top_level_definition"
    }

    fn accepts(&self, ctx: &StructContext<'_>) -> bool {
        ctx.s.is_top_level() && !ctx.s.is_declaration()
    }
}

pub struct AnonymousFilter {
    pub include_anonymous: bool,
    pub include_nested_anonymous: bool,
}

impl Predicate for AnonymousFilter {
    fn name(&self) -> &'static str {
        "anonymous"
    }

    fn accepts(&self, ctx: &StructContext<'_>) -> bool {
        if ctx.s.name.is_some() {
            return true;
        }
        if !self.include_anonymous {
            return false;
        }
        // without an alias it only shows up inside its container
        ctx.is_aliased() || self.include_nested_anonymous
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixMode {
    Include,
    Exclude,
}

/// Matches the effective name; structs with no name at all pass.
pub struct NamePrefixFilter {
    pub prefix: String,
    pub mode: PrefixMode,
}

impl Predicate for NamePrefixFilter {
    fn name(&self) -> &'static str {
        match self.mode {
            PrefixMode::Include => "include_prefix",
            PrefixMode::Exclude => "exclude_prefix",
        }
    }

    fn accepts(&self, ctx: &StructContext<'_>) -> bool {
        match ctx.effective_name_str() {
            Some(name) => name.starts_with(&self.prefix) == (self.mode == PrefixMode::Include),
            None => true,
        }
    }
}

/// Rejects structs declared under the prefix, or with no known file.
pub struct DeclFileExcludeFilter {
    pub prefix: String,
}

impl Predicate for DeclFileExcludeFilter {
    fn name(&self) -> &'static str {
        "decl_exclude_prefix"
    }

    fn accepts(&self, ctx: &StructContext<'_>) -> bool {
        match ctx.unit.decl_file(ctx.id, ctx.strings) {
            Some(file) => !file.starts_with(&self.prefix),
            None => false,
        }
    }
}

pub struct HoleThresholdFilter {
    pub min_holes: usize,
    pub min_bit_holes: usize,
    pub hole_size_ge: Option<u64>,
}

impl Predicate for HoleThresholdFilter {
    fn name(&self) -> &'static str {
        "hole_thresholds"
    }

    fn accepts(&self, ctx: &StructContext<'_>) -> bool {
        ctx.report.nr_holes() >= self.min_holes
            && ctx.report.nr_bit_holes() >= self.min_bit_holes
            && self.hole_size_ge.map_or(true, |size| ctx.report.has_hole_at_least(size))
    }
}

/// Predicates joined with AND, evaluated in insertion order.
#[derive(Default)]
pub struct FilterChain {
    predicates: Vec<Box<dyn Predicate>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: impl Predicate + 'static) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let mut chain = Self::new().with(TopLevelDefinition).with(AnonymousFilter {
            include_anonymous: config.include_anonymous,
            include_nested_anonymous: config.include_nested_anonymous,
        });
        if let Some(prefix) = &config.exclude_prefix {
            chain = chain.with(NamePrefixFilter {
                prefix: prefix.clone(),
                mode: PrefixMode::Exclude,
            });
        }
        if let Some(prefix) = &config.include_prefix {
            chain = chain.with(NamePrefixFilter {
                prefix: prefix.clone(),
                mode: PrefixMode::Include,
            });
        }
        if let Some(prefix) = &config.decl_exclude_prefix {
            chain = chain.with(DeclFileExcludeFilter { prefix: prefix.clone() });
        }
        if config.min_holes > 0 || config.min_bit_holes > 0 || config.hole_size_ge.is_some() {
            chain = chain.with(HoleThresholdFilter {
                min_holes: config.min_holes,
                min_bit_holes: config.min_bit_holes,
                hole_size_ge: config.hole_size_ge,
            });
        }
        chain
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn accepts(&self, ctx: &StructContext<'_>) -> bool {
        match self.predicates.iter().find(|p| !p.accepts(ctx)) {
            Some(rejecting) => {
                trace!("struct {} rejected by {}", ctx.id, rejecting.name());
                false
            }
            None => true,
        }
    }
}

/// Skips whole compilation units by name prefix; unnamed units are
/// skipped whenever a prefix is set.
#[derive(Debug, Clone, Default)]
pub struct UnitFilter {
    exclude_prefix: Option<String>,
}

impl UnitFilter {
    pub fn new(exclude_prefix: Option<String>) -> Self {
        Self { exclude_prefix }
    }

    pub fn accepts(&self, unit: &CompilationUnit) -> bool {
        match &self.exclude_prefix {
            Some(prefix) => !unit.name().is_empty() && !unit.name().starts_with(prefix.as_str()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::UnitBuilder;
    use crate::layout::LayoutAnalyzer;

    struct Fixture {
        strings: Strings,
        unit: CompilationUnit,
        named: TypeId,
        aliased: TypeId,
        bare: TypeId,
        decl: TypeId,
        nested: TypeId,
    }

    fn fixture() -> Fixture {
        let mut strings = Strings::new();
        let mut b = UnitBuilder::new("kernel/sched.c", 8, &mut strings);
        let ch = b.base("char", 1);
        let int = b.base("int", 4);
        let named = b
            .structure(Some("rq_holey"), 8)
            .member("c", ch, 0)
            .member("i", int, 4)
            .declared_at("include/linux/sched.h", 10)
            .build();
        let aliased = b.structure(None, 4).member("i", int, 0).declared_at("kernel/sched.c", 3).build();
        b.typedef("rq_t", Some(aliased));
        let bare = b.structure(None, 4).member("i", int, 0).build();
        let decl = b.structure(Some("fwd"), 0).declaration().build();
        let nested = b.structure(Some("inner"), 4).member("i", int, 0).nested().build();
        let unit = b.finish();
        Fixture {
            strings,
            unit,
            named,
            aliased,
            bare,
            decl,
            nested,
        }
    }

    fn check(f: &Fixture, chain: &FilterChain, id: TypeId) -> bool {
        let s = f.unit.struct_type(id).unwrap();
        let report = LayoutAnalyzer::new().analyze(&f.unit, id).unwrap();
        let effective_name = s
            .name
            .or_else(|| f.unit.first_typedef_of(id).map(|(_, t)| t.name));
        let ctx = StructContext {
            unit: &f.unit,
            strings: &f.strings,
            id,
            s,
            report: &report,
            effective_name,
        };
        chain.accepts(&ctx)
    }

    #[test]
    fn test_default_chain() {
        let f = fixture();
        let chain = FilterChain::from_config(&Config::default());
        assert_eq!(chain.len(), 2);
        assert!(check(&f, &chain, f.named));
        assert!(!check(&f, &chain, f.aliased));
        assert!(!check(&f, &chain, f.decl));
        assert!(!check(&f, &chain, f.nested));
    }

    #[test]
    fn test_anonymous_inclusion() {
        let f = fixture();
        let mut config = Config::default();
        config.include_anonymous = true;
        let chain = FilterChain::from_config(&config);
        assert!(check(&f, &chain, f.aliased));
        assert!(!check(&f, &chain, f.bare));

        config.include_nested_anonymous = true;
        let chain = FilterChain::from_config(&config);
        assert!(check(&f, &chain, f.bare));
    }

    #[test]
    fn test_prefixes_use_typedef_alias() {
        let f = fixture();
        let mut config = Config::default();
        config.include_anonymous = true;
        config.exclude_prefix = Some("rq_".to_string());
        let chain = FilterChain::from_config(&config);
        assert!(!check(&f, &chain, f.named));
        assert!(!check(&f, &chain, f.aliased));

        config.exclude_prefix = None;
        config.include_prefix = Some("rq_t".to_string());
        let chain = FilterChain::from_config(&config);
        assert!(!check(&f, &chain, f.named));
        assert!(check(&f, &chain, f.aliased));
    }

    #[test]
    fn test_decl_exclude() {
        let f = fixture();
        let mut config = Config::default();
        config.include_anonymous = true;
        config.include_nested_anonymous = true;
        config.decl_exclude_prefix = Some("include/".to_string());
        let chain = FilterChain::from_config(&config);
        assert!(!check(&f, &chain, f.named));
        assert!(check(&f, &chain, f.aliased));
        // no declaration site recorded
        assert!(!check(&f, &chain, f.bare));
    }

    #[test]
    fn test_hole_thresholds() {
        let f = fixture();
        let chain = FilterChain::from_config(&Config::default().with_hole_thresholds(1, 0, None));
        assert!(check(&f, &chain, f.named));

        let chain = FilterChain::from_config(&Config::default().with_hole_thresholds(0, 0, Some(4)));
        assert!(!check(&f, &chain, f.named));
        let chain = FilterChain::from_config(&Config::default().with_hole_thresholds(0, 0, Some(3)));
        assert!(check(&f, &chain, f.named));
        let chain = FilterChain::from_config(&Config::default().with_hole_thresholds(0, 1, None));
        assert!(!check(&f, &chain, f.named));
    }

    #[test]
    fn test_unit_filter() {
        let filter = UnitFilter::new(Some("drivers/".to_string()));
        assert!(!filter.accepts(&CompilationUnit::new("drivers/net/e1000.c", 8)));
        assert!(filter.accepts(&CompilationUnit::new("kernel/fork.c", 8)));
        assert!(!filter.accepts(&CompilationUnit::new("", 8)));
        assert!(UnitFilter::default().accepts(&CompilationUnit::new("", 8)));
    }
}
