//! 関連概念インデックス (relevance index)

use crate::model::{ConceptExpr, TBox};
use std::collections::HashSet;

/// Concept expressions that may be asserted during completion.
///
/// Built once per TBox: every axiom operand, closed under sub-expressions.
/// Immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct RelevanceIndex {
    concepts: HashSet<ConceptExpr>,
    /// Relevant conjunctions, kept separately for conjunction introduction
    conjunctions: Vec<ConceptExpr>,
    /// Relevant existentials, kept separately for existential introduction
    existentials: Vec<ConceptExpr>,
}

impl RelevanceIndex {
    pub fn build(tbox: &TBox) -> Self {
        let mut concepts = HashSet::new();

        for axiom in tbox.iter() {
            Self::collect(&axiom.lhs, &mut concepts);
            Self::collect(&axiom.rhs, &mut concepts);
        }

        let mut conjunctions: Vec<ConceptExpr> = concepts
            .iter()
            .filter(|expr| matches!(expr, ConceptExpr::And(_)))
            .cloned()
            .collect();
        conjunctions.sort();

        let mut existentials: Vec<ConceptExpr> = concepts
            .iter()
            .filter(|expr| matches!(expr, ConceptExpr::Exists { .. }))
            .cloned()
            .collect();
        existentials.sort();

        Self {
            concepts,
            conjunctions,
            existentials,
        }
    }

    fn collect(expr: &ConceptExpr, concepts: &mut HashSet<ConceptExpr>) {
        // Already seen: its sub-expressions are in as well
        if !concepts.insert(expr.clone()) {
            return;
        }
        for child in expr.children() {
            Self::collect(child, concepts);
        }
    }

    /// Add `expr` and its sub-expressions
    pub fn extend(&mut self, expr: &ConceptExpr) {
        Self::collect(expr, &mut self.concepts);

        self.conjunctions = self
            .concepts
            .iter()
            .filter(|expr| matches!(expr, ConceptExpr::And(_)))
            .cloned()
            .collect();
        self.conjunctions.sort();

        self.existentials = self
            .concepts
            .iter()
            .filter(|expr| matches!(expr, ConceptExpr::Exists { .. }))
            .cloned()
            .collect();
        self.existentials.sort();
    }

    pub fn contains(&self, expr: &ConceptExpr) -> bool {
        self.concepts.contains(expr)
    }

    /// `Top` is always admissible, whether or not the TBox mentions it
    pub fn admits(&self, expr: &ConceptExpr) -> bool {
        expr.is_top() || self.contains(expr)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConceptExpr> {
        self.concepts.iter()
    }

    pub fn conjunctions(&self) -> &[ConceptExpr] {
        &self.conjunctions
    }

    pub fn existentials(&self) -> &[ConceptExpr] {
        &self.existentials
    }
}
