//! EL 完備化グラフ (completion graph)

use crate::model::ConceptExpr;
use crate::ElError;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Stable index of an individual inside one completion graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndividualId(pub usize);

impl fmt::Display for IndividualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Labeled role edge to a successor individual
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleEdge {
    pub relation: String,
    pub successor: IndividualId,
}

/// Node of the completion graph
#[derive(Debug, Clone)]
pub struct Individual {
    name: String,
    /// Expression this individual was created to witness
    initial_concept: ConceptExpr,
    concepts: HashSet<ConceptExpr>,
    roles: HashSet<RoleEdge>,
}

impl Individual {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial_concept(&self) -> &ConceptExpr {
        &self.initial_concept
    }

    pub fn concepts(&self) -> &HashSet<ConceptExpr> {
        &self.concepts
    }

    pub fn roles(&self) -> &HashSet<RoleEdge> {
        &self.roles
    }

    pub fn has_concept(&self, expr: &ConceptExpr) -> bool {
        self.concepts.contains(expr)
    }

    /// Successors reached over `relation`
    pub fn successors<'a>(&'a self, relation: &'a str) -> impl Iterator<Item = IndividualId> + 'a {
        self.roles
            .iter()
            .filter(move |edge| edge.relation == relation)
            .map(|edge| edge.successor)
    }
}

/// Append-only completion graph.
///
/// Individuals live in an arena and are never removed; their concept and role
/// sets only grow.
#[derive(Debug, Default)]
pub struct CompletionGraph {
    individuals: Vec<Individual>,
    by_name: HashMap<String, IndividualId>,
    by_initial_concept: HashMap<ConceptExpr, IndividualId>,
}

impl CompletionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of individuals
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Create an individual whose concept set is `{initial_concept}`
    pub fn create_individual(
        &mut self,
        name: impl Into<String>,
        initial_concept: ConceptExpr,
    ) -> Result<IndividualId, ElError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(ElError::DuplicateIndividual(name));
        }

        let id = IndividualId(self.individuals.len());
        let mut concepts = HashSet::new();
        concepts.insert(initial_concept.clone());

        self.by_name.insert(name.clone(), id);
        // First witness wins; later individuals with the same seed are not indexed
        self.by_initial_concept
            .entry(initial_concept.clone())
            .or_insert(id);
        self.individuals.push(Individual {
            name,
            initial_concept,
            concepts,
            roles: HashSet::new(),
        });

        Ok(id)
    }

    pub fn id_of(&self, name: &str) -> Result<IndividualId, ElError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ElError::UnknownIndividual(name.to_string()))
    }

    pub fn get(&self, id: IndividualId) -> Result<&Individual, ElError> {
        self.individuals
            .get(id.0)
            .ok_or_else(|| ElError::UnknownIndividual(id.to_string()))
    }

    fn get_mut(&mut self, id: IndividualId) -> Result<&mut Individual, ElError> {
        self.individuals
            .get_mut(id.0)
            .ok_or_else(|| ElError::UnknownIndividual(id.to_string()))
    }

    /// Individual created to witness `expr`, if any
    pub fn find_by_initial_concept(&self, expr: &ConceptExpr) -> Option<IndividualId> {
        self.by_initial_concept.get(expr).copied()
    }

    /// Add `expr` to the individual's concepts; returns whether it was new
    pub fn add_concept(&mut self, id: IndividualId, expr: ConceptExpr) -> Result<bool, ElError> {
        Ok(self.get_mut(id)?.concepts.insert(expr))
    }

    pub fn has_concept(&self, id: IndividualId, expr: &ConceptExpr) -> Result<bool, ElError> {
        Ok(self.get(id)?.has_concept(expr))
    }

    /// Add the edge `id --relation--> successor`; returns whether it was new
    pub fn add_role(
        &mut self,
        id: IndividualId,
        relation: impl Into<String>,
        successor: IndividualId,
    ) -> Result<bool, ElError> {
        self.get(successor)?;
        let edge = RoleEdge {
            relation: relation.into(),
            successor,
        };
        Ok(self.get_mut(id)?.roles.insert(edge))
    }

    pub fn has_role(
        &self,
        id: IndividualId,
        relation: &str,
        successor: IndividualId,
    ) -> Result<bool, ElError> {
        Ok(self
            .get(id)?
            .roles
            .iter()
            .any(|edge| edge.relation == relation && edge.successor == successor))
    }

    pub fn iter(&self) -> impl Iterator<Item = (IndividualId, &Individual)> {
        self.individuals
            .iter()
            .enumerate()
            .map(|(index, individual)| (IndividualId(index), individual))
    }

    /// Total number of concept assignments over all individuals
    pub fn concept_count(&self) -> usize {
        self.individuals.iter().map(|i| i.concepts.len()).sum()
    }

    /// Total number of role edges over all individuals
    pub fn role_count(&self) -> usize {
        self.individuals.iter().map(|i| i.roles.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_individual() {
        let mut graph = CompletionGraph::new();
        let id = graph.create_individual("d0", ConceptExpr::name("Dog")).unwrap();

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.id_of("d0").unwrap(), id);
        let individual = graph.get(id).unwrap();
        assert_eq!(individual.name(), "d0");
        assert_eq!(individual.initial_concept(), &ConceptExpr::name("Dog"));
        assert_eq!(individual.concepts().len(), 1);
        assert!(individual.roles().is_empty());
    }

    #[test]
    fn test_duplicate_individual() {
        let mut graph = CompletionGraph::new();
        graph.create_individual("d0", ConceptExpr::Top).unwrap();
        let err = graph.create_individual("d0", ConceptExpr::name("A")).unwrap_err();
        assert!(matches!(err, ElError::DuplicateIndividual(name) if name == "d0"));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_unknown_individual() {
        let mut graph = CompletionGraph::new();
        assert!(matches!(graph.id_of("nobody"), Err(ElError::UnknownIndividual(_))));
        assert!(matches!(
            graph.add_concept(IndividualId(3), ConceptExpr::Top),
            Err(ElError::UnknownIndividual(_))
        ));

        let d0 = graph.create_individual("d0", ConceptExpr::Top).unwrap();
        assert!(matches!(
            graph.add_role(d0, "r", IndividualId(7)),
            Err(ElError::UnknownIndividual(_))
        ));
        assert!(graph.get(d0).unwrap().roles().is_empty());
    }

    #[test]
    fn test_add_concept_reports_change() {
        let mut graph = CompletionGraph::new();
        let d0 = graph.create_individual("d0", ConceptExpr::name("A")).unwrap();

        assert!(graph.add_concept(d0, ConceptExpr::name("B")).unwrap());
        assert!(!graph.add_concept(d0, ConceptExpr::name("B")).unwrap());
        assert!(!graph.add_concept(d0, ConceptExpr::name("A")).unwrap());
        assert!(graph.has_concept(d0, &ConceptExpr::name("B")).unwrap());
    }

    #[test]
    fn test_add_role_is_idempotent() {
        let mut graph = CompletionGraph::new();
        let d0 = graph.create_individual("d0", ConceptExpr::name("A")).unwrap();
        let d1 = graph.create_individual("d1", ConceptExpr::name("B")).unwrap();

        assert!(graph.add_role(d0, "r", d1).unwrap());
        assert!(!graph.add_role(d0, "r", d1).unwrap());
        assert!(graph.add_role(d0, "s", d1).unwrap());

        assert!(graph.has_role(d0, "r", d1).unwrap());
        assert!(!graph.has_role(d1, "r", d0).unwrap());
        assert_eq!(graph.get(d0).unwrap().successors("r").collect::<Vec<_>>(), vec![d1]);
        assert_eq!(graph.role_count(), 2);
    }

    #[test]
    fn test_find_by_initial_concept() {
        let mut graph = CompletionGraph::new();
        let d0 = graph.create_individual("d0", ConceptExpr::name("A")).unwrap();
        graph.create_individual("d1", ConceptExpr::name("A")).unwrap();

        assert_eq!(graph.find_by_initial_concept(&ConceptExpr::name("A")), Some(d0));
        assert_eq!(graph.find_by_initial_concept(&ConceptExpr::name("B")), None);
    }
}
