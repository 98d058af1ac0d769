//! EL 完備化規則と不動点ドライバ
//!
//! 6 つの規則を固定順で繰り返し適用し、1 パスで何も変化しなくなるまで実行する。

use crate::config::ReasonerConfig;
use crate::graph::{CompletionGraph, IndividualId};
use crate::model::{ConceptExpr, TBox};
use crate::relevance::RelevanceIndex;
use crate::trace::{Change, CompletionEvent, CompletionObserver};
use crate::ElError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

/// Completion rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    /// ⊤-rule
    Top,
    /// ⊓-elimination
    ConjunctionElimination,
    /// ⊓-introduction
    ConjunctionIntroduction,
    /// ∃-expansion (creates successors)
    ExistentialExpansion,
    /// ∃-introduction (summarises successors)
    ExistentialIntroduction,
    /// ⊑-rule
    TBoxPropagation,
}

impl RuleKind {
    /// Default application order
    pub const ALL: [RuleKind; 6] = [
        RuleKind::Top,
        RuleKind::ConjunctionElimination,
        RuleKind::ConjunctionIntroduction,
        RuleKind::ExistentialExpansion,
        RuleKind::ExistentialIntroduction,
        RuleKind::TBoxPropagation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::Top => "top",
            RuleKind::ConjunctionElimination => "conjunction-elimination",
            RuleKind::ConjunctionIntroduction => "conjunction-introduction",
            RuleKind::ExistentialExpansion => "existential-expansion",
            RuleKind::ExistentialIntroduction => "existential-introduction",
            RuleKind::TBoxPropagation => "tbox-propagation",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// TBox compiled for completion: relevance index plus told subsumers
#[derive(Debug, Clone)]
pub struct Terminology {
    index: RelevanceIndex,
    /// lhs -> rhs for every inclusion (equivalences contribute both directions)
    told_subsumers: HashMap<ConceptExpr, Vec<ConceptExpr>>,
    inclusion_count: usize,
}

impl Terminology {
    pub fn compile(tbox: &TBox) -> Self {
        let index = RelevanceIndex::build(tbox);
        let mut told_subsumers: HashMap<ConceptExpr, Vec<ConceptExpr>> = HashMap::new();
        let mut inclusion_count = 0;

        for axiom in tbox.iter() {
            for (lhs, rhs) in axiom.inclusions() {
                let supers = told_subsumers.entry(lhs.clone()).or_default();
                if !supers.contains(rhs) {
                    supers.push(rhs.clone());
                    inclusion_count += 1;
                }
            }
        }

        Self {
            index,
            told_subsumers,
            inclusion_count,
        }
    }

    /// Make `expr` relevant without adding any inclusion for it
    pub fn with_relevant(mut self, expr: &ConceptExpr) -> Self {
        self.index.extend(expr);
        self
    }

    pub fn index(&self) -> &RelevanceIndex {
        &self.index
    }

    pub fn told_subsumers(&self, expr: &ConceptExpr) -> &[ConceptExpr] {
        self.told_subsumers
            .get(expr)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct inclusions after expanding equivalences
    pub fn inclusion_count(&self) -> usize {
        self.inclusion_count
    }
}

/// Drives the completion rules over a graph until nothing changes
pub struct RuleEngine<'a> {
    terminology: &'a Terminology,
    config: &'a ReasonerConfig,
    order: Vec<RuleKind>,
    observer: Option<&'a dyn CompletionObserver>,
}

impl<'a> RuleEngine<'a> {
    pub fn new(terminology: &'a Terminology, config: &'a ReasonerConfig) -> Self {
        Self {
            terminology,
            config,
            order: RuleKind::ALL.to_vec(),
            observer: None,
        }
    }

    /// Use a custom rule order. Every rule must appear at least once,
    /// otherwise the fixpoint would be incomplete.
    pub fn with_order(mut self, order: &[RuleKind]) -> Result<Self, ElError> {
        if let Some(missing) = RuleKind::ALL.iter().find(|rule| !order.contains(rule)) {
            return Err(ElError::ConfigurationError(format!(
                "rule order is missing the {} rule",
                missing
            )));
        }
        self.order = order.to_vec();
        Ok(self)
    }

    pub fn with_observer(mut self, observer: &'a dyn CompletionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn order(&self) -> &[RuleKind] {
        &self.order
    }

    /// Run every rule until a full pass changes nothing; returns the pass count
    pub fn saturate(&self, graph: &mut CompletionGraph) -> Result<usize, ElError> {
        let started = Instant::now();
        let timeout = self.config.timeout();
        let mut passes = 0;

        loop {
            if passes >= self.config.max_passes {
                return Err(ElError::ResourceExhausted(format!(
                    "no fixpoint after {} passes",
                    passes
                )));
            }
            passes += 1;

            let mut changed = false;
            for rule in &self.order {
                changed |= self.apply(*rule, graph)?;
            }

            if !changed {
                return Ok(passes);
            }

            if let Some(timeout) = timeout {
                if started.elapsed() > timeout {
                    return Err(ElError::ResourceExhausted(format!(
                        "query exceeded {}ms after {} passes",
                        timeout.as_millis(),
                        passes
                    )));
                }
            }
        }
    }

    /// Apply one rule to every individual present when the call starts
    pub fn apply(&self, rule: RuleKind, graph: &mut CompletionGraph) -> Result<bool, ElError> {
        let snapshot = graph.len();
        let mut changed = false;

        for index in 0..snapshot {
            let id = IndividualId(index);
            changed |= match rule {
                RuleKind::Top => self.top_rule(graph, id)?,
                RuleKind::ConjunctionElimination => self.conjunction_elimination(graph, id)?,
                RuleKind::ConjunctionIntroduction => self.conjunction_introduction(graph, id)?,
                RuleKind::ExistentialExpansion => self.existential_expansion(graph, id)?,
                RuleKind::ExistentialIntroduction => self.existential_introduction(graph, id)?,
                RuleKind::TBoxPropagation => self.tbox_propagation(graph, id)?,
            };
        }

        Ok(changed)
    }

    fn top_rule(&self, graph: &mut CompletionGraph, id: IndividualId) -> Result<bool, ElError> {
        self.add_concepts(RuleKind::Top, graph, id, vec![ConceptExpr::Top])
    }

    /// x : C ⊓ D  ⇒  x : C, x : D
    fn conjunction_elimination(&self, graph: &mut CompletionGraph, id: IndividualId) -> Result<bool, ElError> {
        let index = self.terminology.index();
        let individual = graph.get(id)?;

        let additions = individual
            .concepts()
            .iter()
            .filter_map(|concept| match concept {
                ConceptExpr::And(conjunction) => Some(conjunction.operands()),
                _ => None,
            })
            .flatten()
            .filter(|operand| index.admits(operand) && !individual.has_concept(operand))
            .cloned()
            .collect();

        self.add_concepts(RuleKind::ConjunctionElimination, graph, id, additions)
    }

    /// x : C, x : D, C ≠ D, C ⊓ D relevant  ⇒  x : C ⊓ D
    fn conjunction_introduction(&self, graph: &mut CompletionGraph, id: IndividualId) -> Result<bool, ElError> {
        let individual = graph.get(id)?;

        let additions = self
            .terminology
            .index()
            .conjunctions()
            .iter()
            .filter(|candidate| match candidate {
                ConceptExpr::And(conjunction) => {
                    conjunction.left() != conjunction.right()
                        && !individual.has_concept(candidate)
                        && individual.has_concept(conjunction.left())
                        && individual.has_concept(conjunction.right())
                }
                _ => false,
            })
            .cloned()
            .collect();

        self.add_concepts(RuleKind::ConjunctionIntroduction, graph, id, additions)
    }

    /// x : ∃r.C without an r-successor seeded with C  ⇒  link x to the witness of C
    fn existential_expansion(&self, graph: &mut CompletionGraph, id: IndividualId) -> Result<bool, ElError> {
        let individual = graph.get(id)?;

        let mut demands = Vec::new();
        for concept in individual.concepts() {
            if let ConceptExpr::Exists { role, filler } = concept {
                let mut witnessed = false;
                for successor in individual.successors(role) {
                    if graph.get(successor)?.initial_concept() == &**filler {
                        witnessed = true;
                        break;
                    }
                }
                if !witnessed {
                    demands.push((role.clone(), (**filler).clone()));
                }
            }
        }
        // Stable creation order keeps individual names reproducible
        demands.sort();

        let mut changed = false;
        for (role, filler) in demands {
            let successor = match graph.find_by_initial_concept(&filler) {
                Some(existing) => existing,
                None => self.create_witness(graph, filler)?,
            };
            if graph.add_role(id, role.clone(), successor)? {
                changed = true;
                if self.observer.is_some() {
                    let successor = graph.get(successor)?.name().to_string();
                    self.emit(
                        RuleKind::ExistentialExpansion,
                        graph,
                        id,
                        Change::RoleAdded {
                            relation: role,
                            successor,
                        },
                    )?;
                }
            }
        }

        Ok(changed)
    }

    fn create_witness(&self, graph: &mut CompletionGraph, filler: ConceptExpr) -> Result<IndividualId, ElError> {
        if let Some(limit) = self.config.max_individuals {
            if graph.len() >= limit {
                return Err(ElError::ResourceExhausted(format!(
                    "individual limit of {} reached",
                    limit
                )));
            }
        }

        let name = format!("d{}", graph.len());
        let created = graph.create_individual(name, filler.clone())?;
        self.emit(
            RuleKind::ExistentialExpansion,
            graph,
            created,
            Change::IndividualCreated {
                initial_concept: filler,
            },
        )?;
        Ok(created)
    }

    /// x -r-> y, y : C, ∃r.C relevant  ⇒  x : ∃r.C
    fn existential_introduction(&self, graph: &mut CompletionGraph, id: IndividualId) -> Result<bool, ElError> {
        let individual = graph.get(id)?;
        if individual.roles().is_empty() {
            return Ok(false);
        }

        let mut additions = Vec::new();
        for candidate in self.terminology.index().existentials() {
            if let ConceptExpr::Exists { role, filler } = candidate {
                if individual.has_concept(candidate) {
                    continue;
                }
                for successor in individual.successors(role) {
                    if graph.get(successor)?.has_concept(filler) {
                        additions.push(candidate.clone());
                        break;
                    }
                }
            }
        }

        self.add_concepts(RuleKind::ExistentialIntroduction, graph, id, additions)
    }

    /// x : L, L ⊑ R  ⇒  x : R
    fn tbox_propagation(&self, graph: &mut CompletionGraph, id: IndividualId) -> Result<bool, ElError> {
        let index = self.terminology.index();
        let individual = graph.get(id)?;

        let additions = individual
            .concepts()
            .iter()
            .flat_map(|concept| self.terminology.told_subsumers(concept))
            .filter(|rhs| index.admits(rhs) && !individual.has_concept(rhs))
            .cloned()
            .collect();

        self.add_concepts(RuleKind::TBoxPropagation, graph, id, additions)
    }

    fn add_concepts(
        &self,
        rule: RuleKind,
        graph: &mut CompletionGraph,
        id: IndividualId,
        mut additions: Vec<ConceptExpr>,
    ) -> Result<bool, ElError> {
        additions.sort();
        additions.dedup();

        let mut changed = false;
        for expr in additions {
            if graph.add_concept(id, expr.clone())? {
                changed = true;
                self.emit(rule, graph, id, Change::ConceptAdded(expr))?;
            }
        }
        Ok(changed)
    }

    fn emit(&self, rule: RuleKind, graph: &CompletionGraph, id: IndividualId, change: Change) -> Result<(), ElError> {
        if let Some(observer) = self.observer {
            let event = CompletionEvent {
                rule,
                individual: graph.get(id)?.name().to_string(),
                change,
            };
            observer.on_event(&event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Axiom;
    use crate::trace::EventLog;
    use std::collections::HashSet;

    fn name(n: &str) -> ConceptExpr {
        ConceptExpr::name(n)
    }

    fn seeded(concept: ConceptExpr) -> (CompletionGraph, IndividualId) {
        let mut graph = CompletionGraph::new();
        let d0 = graph.create_individual("d0", concept).unwrap();
        (graph, d0)
    }

    fn concepts_of(graph: &CompletionGraph, id: IndividualId) -> HashSet<ConceptExpr> {
        graph.get(id).unwrap().concepts().clone()
    }

    #[test]
    fn test_top_rule() {
        let terminology = Terminology::compile(&TBox::new());
        let config = ReasonerConfig::default();
        let engine = RuleEngine::new(&terminology, &config);
        let (mut graph, d0) = seeded(name("X"));

        assert!(engine.apply(RuleKind::Top, &mut graph).unwrap());
        assert!(!engine.apply(RuleKind::Top, &mut graph).unwrap());
        assert!(graph.has_concept(d0, &ConceptExpr::Top).unwrap());
    }

    #[test]
    fn test_conjunction_elimination_requires_relevance() {
        let ab = ConceptExpr::and(name("A"), name("B"));
        let tbox: TBox = vec![Axiom::inclusion(name("X"), ab.clone())].into_iter().collect();
        let terminology = Terminology::compile(&tbox);
        let config = ReasonerConfig::default();
        let engine = RuleEngine::new(&terminology, &config);

        let (mut graph, d0) = seeded(ab);
        assert!(engine.apply(RuleKind::ConjunctionElimination, &mut graph).unwrap());
        assert!(graph.has_concept(d0, &name("A")).unwrap());
        assert!(graph.has_concept(d0, &name("B")).unwrap());

        // C ⊓ D is unknown to the TBox, so neither operand is relevant
        let (mut graph, d0) = seeded(ConceptExpr::and(name("C"), name("D")));
        assert!(!engine.apply(RuleKind::ConjunctionElimination, &mut graph).unwrap());
        assert_eq!(concepts_of(&graph, d0).len(), 1);
    }

    #[test]
    fn test_conjunction_introduction() {
        let ab = ConceptExpr::and(name("B"), name("A"));
        let tbox: TBox = vec![
            Axiom::inclusion(ab.clone(), name("C")),
            Axiom::inclusion(ConceptExpr::and(name("A"), name("A")), name("D")),
            Axiom::inclusion(name("X"), name("A")),
            Axiom::inclusion(name("X"), name("B")),
        ]
        .into_iter()
        .collect();
        let terminology = Terminology::compile(&tbox);
        let config = ReasonerConfig::default();
        let engine = RuleEngine::new(&terminology, &config);

        let (mut graph, d0) = seeded(name("A"));
        // Only A: neither A ⊓ B nor the degenerate A ⊓ A is introduced
        assert!(!engine.apply(RuleKind::ConjunctionIntroduction, &mut graph).unwrap());

        graph.add_concept(d0, name("B")).unwrap();
        assert!(engine.apply(RuleKind::ConjunctionIntroduction, &mut graph).unwrap());
        assert!(graph.has_concept(d0, &ConceptExpr::and(name("A"), name("B"))).unwrap());
        assert!(!graph.has_concept(d0, &ConceptExpr::and(name("A"), name("A"))).unwrap());
    }

    #[test]
    fn test_existential_expansion_reuses_witness() {
        let diesel = ConceptExpr::exists("hasFuelType", name("Diesel"));
        let tbox: TBox = vec![Axiom::inclusion(name("Bus"), diesel.clone())].into_iter().collect();
        let terminology = Terminology::compile(&tbox);
        let config = ReasonerConfig::default();
        let engine = RuleEngine::new(&terminology, &config);

        let (mut graph, d0) = seeded(diesel);
        assert!(engine.apply(RuleKind::ExistentialExpansion, &mut graph).unwrap());
        assert_eq!(graph.len(), 2);
        let d1 = graph.id_of("d1").unwrap();
        assert!(graph.has_role(d0, "hasFuelType", d1).unwrap());
        assert_eq!(graph.get(d1).unwrap().initial_concept(), &name("Diesel"));

        // Already witnessed: no second successor
        assert!(!engine.apply(RuleKind::ExistentialExpansion, &mut graph).unwrap());
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_existential_expansion_links_existing_witness() {
        let tbox: TBox = vec![
            Axiom::inclusion(name("A"), ConceptExpr::exists("r", name("C"))),
            Axiom::inclusion(name("A"), ConceptExpr::exists("s", name("C"))),
        ]
        .into_iter()
        .collect();
        let terminology = Terminology::compile(&tbox);
        let config = ReasonerConfig::default();
        let engine = RuleEngine::new(&terminology, &config);

        let (mut graph, d0) = seeded(name("A"));
        engine.apply(RuleKind::TBoxPropagation, &mut graph).unwrap();
        engine.apply(RuleKind::ExistentialExpansion, &mut graph).unwrap();

        assert_eq!(graph.len(), 2);
        let d1 = graph.id_of("d1").unwrap();
        assert!(graph.has_role(d0, "r", d1).unwrap());
        assert!(graph.has_role(d0, "s", d1).unwrap());
    }

    #[test]
    fn test_existential_introduction() {
        let exists_b = ConceptExpr::exists("r", name("B"));
        let tbox: TBox = vec![
            Axiom::inclusion(name("A"), ConceptExpr::exists("r", name("C"))),
            Axiom::inclusion(name("C"), name("B")),
            Axiom::inclusion(exists_b.clone(), name("D")),
        ]
        .into_iter()
        .collect();
        let terminology = Terminology::compile(&tbox);
        let config = ReasonerConfig::default();
        let engine = RuleEngine::new(&terminology, &config);

        let (mut graph, d0) = seeded(name("A"));
        engine.saturate(&mut graph).unwrap();

        assert!(graph.has_concept(d0, &exists_b).unwrap());
        assert!(graph.has_concept(d0, &name("D")).unwrap());
    }

    #[test]
    fn test_snapshot_defers_new_individuals() {
        let tbox: TBox = vec![Axiom::inclusion(name("A"), ConceptExpr::exists("r", name("B")))]
            .into_iter()
            .collect();
        let terminology = Terminology::compile(&tbox);
        let config = ReasonerConfig::default();
        let engine = RuleEngine::new(&terminology, &config);

        let (mut graph, _) = seeded(ConceptExpr::exists("r", name("B")));
        engine.apply(RuleKind::ExistentialExpansion, &mut graph).unwrap();
        let d1 = graph.id_of("d1").unwrap();
        assert!(!graph.has_concept(d1, &ConceptExpr::Top).unwrap());

        engine.apply(RuleKind::Top, &mut graph).unwrap();
        assert!(graph.has_concept(d1, &ConceptExpr::Top).unwrap());
    }

    #[test]
    fn test_cyclic_tbox_terminates() {
        let tbox: TBox = vec![Axiom::inclusion(
            name("Person"),
            ConceptExpr::exists("hasParent", name("Person")),
        )]
        .into_iter()
        .collect();
        let terminology = Terminology::compile(&tbox);
        let config = ReasonerConfig::default();
        let engine = RuleEngine::new(&terminology, &config);

        let (mut graph, d0) = seeded(name("Person"));
        engine.saturate(&mut graph).unwrap();

        // d0 witnesses Person itself
        assert_eq!(graph.len(), 1);
        assert!(graph.has_role(d0, "hasParent", d0).unwrap());
    }

    #[test]
    fn test_max_passes_guard() {
        let tbox: TBox = vec![
            Axiom::inclusion(name("A"), name("B")),
            Axiom::inclusion(name("B"), name("C")),
        ]
        .into_iter()
        .collect();
        let terminology = Terminology::compile(&tbox);
        let config = ReasonerConfig::default().with_max_passes(1);
        let engine = RuleEngine::new(&terminology, &config);

        let (mut graph, _) = seeded(name("A"));
        let err = engine.saturate(&mut graph).unwrap_err();
        assert!(matches!(err, ElError::ResourceExhausted(_)));
    }

    #[test]
    fn test_max_individuals_guard() {
        let tbox: TBox = vec![
            Axiom::inclusion(name("A"), ConceptExpr::exists("r", name("B"))),
            Axiom::inclusion(name("B"), ConceptExpr::exists("r", name("C"))),
        ]
        .into_iter()
        .collect();
        let terminology = Terminology::compile(&tbox);
        let config = ReasonerConfig::default().with_max_individuals(2);
        let engine = RuleEngine::new(&terminology, &config);

        let (mut graph, _) = seeded(name("A"));
        let err = engine.saturate(&mut graph).unwrap_err();
        assert!(matches!(err, ElError::ResourceExhausted(_)));
    }

    #[test]
    fn test_incomplete_order_rejected() {
        let terminology = Terminology::compile(&TBox::new());
        let config = ReasonerConfig::default();
        let result = RuleEngine::new(&terminology, &config).with_order(&[RuleKind::Top]);
        assert!(matches!(result, Err(ElError::ConfigurationError(_))));
    }

    #[test]
    fn test_observer_sees_changes() {
        let tbox: TBox = vec![Axiom::inclusion(name("Dog"), name("Mammal"))].into_iter().collect();
        let terminology = Terminology::compile(&tbox);
        let config = ReasonerConfig::default();
        let log = EventLog::new();
        let engine = RuleEngine::new(&terminology, &config).with_observer(&log);

        let (mut graph, _) = seeded(name("Dog"));
        engine.saturate(&mut graph).unwrap();

        let events = log.events();
        assert!(events.contains(&CompletionEvent {
            rule: RuleKind::TBoxPropagation,
            individual: "d0".to_string(),
            change: Change::ConceptAdded(name("Mammal")),
        }));
        assert!(events.contains(&CompletionEvent {
            rule: RuleKind::Top,
            individual: "d0".to_string(),
            change: Change::ConceptAdded(ConceptExpr::Top),
        }));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_terminology_expands_equivalence() {
        let tbox: TBox = vec![
            Axiom::equivalence(name("A"), name("B")),
            Axiom::inclusion(name("A"), name("B")),
        ]
        .into_iter()
        .collect();
        let terminology = Terminology::compile(&tbox);

        assert_eq!(terminology.inclusion_count(), 2);
        assert_eq!(terminology.told_subsumers(&name("A")), &[name("B")]);
        assert_eq!(terminology.told_subsumers(&name("B")), &[name("A")]);
        assert!(terminology.told_subsumers(&name("C")).is_empty());
    }
}
