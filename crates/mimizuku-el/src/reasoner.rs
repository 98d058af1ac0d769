//! EL リーナー (包摂クエリ)

use crate::config::ReasonerConfig;
use crate::graph::{CompletionGraph, IndividualId};
use crate::model::{ConceptExpr, TBox};
use crate::relevance::RelevanceIndex;
use crate::rules::{RuleEngine, RuleKind, Terminology};
use crate::trace::CompletionObserver;
use crate::ElError;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Name of the individual seeded with the query concept
pub const QUERY_INDIVIDUAL: &str = "d0";

/// Completed graph for one query
#[derive(Debug)]
pub struct Saturation {
    graph: CompletionGraph,
    root: IndividualId,
    passes: usize,
}

impl Saturation {
    pub fn graph(&self) -> &CompletionGraph {
        &self.graph
    }

    /// The query individual
    pub fn root(&self) -> IndividualId {
        self.root
    }

    /// Rule passes needed to reach the fixpoint
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Every concept entailed for the query individual, unfiltered
    pub fn concepts(&self) -> Result<&HashSet<ConceptExpr>, ElError> {
        Ok(self.graph.get(self.root)?.concepts())
    }
}

/// EL reasoner over a fixed TBox.
///
/// The TBox is compiled once; every query runs on its own fresh completion
/// graph, so one reasoner can answer any number of queries.
pub struct Reasoner {
    tbox: TBox,
    terminology: Terminology,
    config: ReasonerConfig,
    rule_order: Vec<RuleKind>,
    observer: Option<Arc<dyn CompletionObserver>>,
}

impl Reasoner {
    pub fn new(tbox: TBox) -> Self {
        Self::with_config(tbox, ReasonerConfig::default())
    }

    pub fn with_config(tbox: TBox, config: ReasonerConfig) -> Self {
        let terminology = Terminology::compile(&tbox);
        debug!(
            axioms = tbox.len(),
            relevant = terminology.index().len(),
            inclusions = terminology.inclusion_count(),
            "compiled terminology"
        );
        Self {
            tbox,
            terminology,
            config,
            rule_order: RuleKind::ALL.to_vec(),
            observer: None,
        }
    }

    /// Apply the rules in a different order within each pass
    pub fn with_rule_order(mut self, order: &[RuleKind]) -> Result<Self, ElError> {
        RuleEngine::new(&self.terminology, &self.config).with_order(order)?;
        self.rule_order = order.to_vec();
        Ok(self)
    }

    pub fn with_observer(mut self, observer: Arc<dyn CompletionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn tbox(&self) -> &TBox {
        &self.tbox
    }

    pub fn terminology(&self) -> &Terminology {
        &self.terminology
    }

    pub fn relevance_index(&self) -> &RelevanceIndex {
        self.terminology.index()
    }

    pub fn config(&self) -> &ReasonerConfig {
        &self.config
    }

    /// Run completion for the atomic concept `concept_name`
    pub fn saturate(&self, concept_name: &str) -> Result<Saturation, ElError> {
        self.saturate_with(&self.terminology, concept_name)
    }

    fn saturate_with(&self, terminology: &Terminology, concept_name: &str) -> Result<Saturation, ElError> {
        self.config.validate()?;

        let mut graph = CompletionGraph::new();
        let root = graph.create_individual(QUERY_INDIVIDUAL, ConceptExpr::name(concept_name))?;

        let mut engine = RuleEngine::new(terminology, &self.config).with_order(&self.rule_order)?;
        if let Some(observer) = &self.observer {
            engine = engine.with_observer(&**observer);
        }
        let passes = engine.saturate(&mut graph)?;

        debug!(
            concept = concept_name,
            passes,
            individuals = graph.len(),
            concepts = graph.concept_count(),
            roles = graph.role_count(),
            "fixpoint reached"
        );

        Ok(Saturation { graph, root, passes })
    }

    /// Subsumers of `concept_name`, including the concept itself.
    ///
    /// `⊤` and conjunctions are left out unless the configuration asks for them.
    pub fn subsumers_of(&self, concept_name: &str) -> Result<BTreeSet<ConceptExpr>, ElError> {
        let saturation = self.saturate(concept_name)?;
        Ok(saturation
            .concepts()?
            .iter()
            .filter(|expr| self.is_reportable(expr))
            .cloned()
            .collect())
    }

    /// Whether `concept_name ⊑ superclass` is entailed.
    ///
    /// `superclass` need not occur in the TBox: if it is not already
    /// relevant, the query runs against a terminology that also admits it and
    /// its sub-expressions.
    pub fn is_subsumed_by(&self, concept_name: &str, superclass: &ConceptExpr) -> Result<bool, ElError> {
        let saturation = if self.terminology.index().admits(superclass) {
            self.saturate(concept_name)?
        } else {
            let terminology = self.terminology.clone().with_relevant(superclass);
            self.saturate_with(&terminology, concept_name)?
        };
        holds(saturation.graph(), saturation.root(), superclass)
    }

    /// Subsumers of every concept name in the TBox signature
    pub fn classify(&self) -> Result<BTreeMap<String, BTreeSet<ConceptExpr>>, ElError> {
        let mut hierarchy = BTreeMap::new();
        for name in self.tbox.concept_names() {
            let subsumers = self.subsumers_of(&name)?;
            hierarchy.insert(name, subsumers);
        }
        debug!(classes = hierarchy.len(), "classification complete");
        Ok(hierarchy)
    }

    fn is_reportable(&self, expr: &ConceptExpr) -> bool {
        match expr {
            ConceptExpr::Top => self.config.include_top,
            ConceptExpr::And(_) => self.config.include_conjunctions,
            ConceptExpr::Name(_) | ConceptExpr::Exists { .. } => true,
        }
    }
}

/// `expr` holds at `id` if it was derived there or follows structurally.
///
/// The structural step covers conjunctions the rules never introduce
/// (`C ⊓ C`) and fillers that only hold through a successor.
fn holds(graph: &CompletionGraph, id: IndividualId, expr: &ConceptExpr) -> Result<bool, ElError> {
    let individual = graph.get(id)?;
    if individual.has_concept(expr) {
        return Ok(true);
    }

    match expr {
        ConceptExpr::Top => Ok(true),
        ConceptExpr::Name(_) => Ok(false),
        ConceptExpr::And(conjunction) => {
            Ok(holds(graph, id, conjunction.left())? && holds(graph, id, conjunction.right())?)
        }
        ConceptExpr::Exists { role, filler } => {
            for successor in individual.successors(role) {
                if holds(graph, successor, filler)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}
