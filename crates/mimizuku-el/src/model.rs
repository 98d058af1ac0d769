//! EL 概念言語データモデル

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// EL concept expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConceptExpr {
    /// owl:Thing (⊤)
    Top,

    /// Atomic concept name
    Name(String),

    /// Conjunction: C ⊓ D (unordered)
    And(Conjunction),

    /// Existential restriction: ∃r.C
    Exists {
        role: String,
        filler: Box<ConceptExpr>,
    },
}

/// Binary conjunction with operands kept in canonical order.
///
/// The only way to build one is [`Conjunction::new`], which sorts the two
/// operands. Derived equality and hashing are therefore insensitive to the
/// order the operands were written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[ConceptExpr; 2]", into = "[ConceptExpr; 2]")]
pub struct Conjunction {
    left: Box<ConceptExpr>,
    right: Box<ConceptExpr>,
}

impl Conjunction {
    pub fn new(a: ConceptExpr, b: ConceptExpr) -> Self {
        let (left, right) = if a <= b { (a, b) } else { (b, a) };
        Self {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn left(&self) -> &ConceptExpr {
        &self.left
    }

    pub fn right(&self) -> &ConceptExpr {
        &self.right
    }

    /// Both operands, left first
    pub fn operands(&self) -> [&ConceptExpr; 2] {
        [&self.left, &self.right]
    }
}

impl From<[ConceptExpr; 2]> for Conjunction {
    fn from([a, b]: [ConceptExpr; 2]) -> Self {
        Conjunction::new(a, b)
    }
}

impl From<Conjunction> for [ConceptExpr; 2] {
    fn from(conjunction: Conjunction) -> Self {
        [*conjunction.left, *conjunction.right]
    }
}

impl ConceptExpr {
    pub fn name(name: impl Into<String>) -> Self {
        ConceptExpr::Name(name.into())
    }

    pub fn and(a: ConceptExpr, b: ConceptExpr) -> Self {
        ConceptExpr::And(Conjunction::new(a, b))
    }

    pub fn exists(role: impl Into<String>, filler: ConceptExpr) -> Self {
        ConceptExpr::Exists {
            role: role.into(),
            filler: Box::new(filler),
        }
    }

    /// Fold an n-ary conjunction into nested binary conjunctions.
    ///
    /// `[A, B, C]` becomes `(A ⊓ B) ⊓ C`, a single operand is returned as is
    /// and an empty input yields `⊤`.
    pub fn conjunction_of<I>(operands: I) -> Self
    where
        I: IntoIterator<Item = ConceptExpr>,
    {
        operands
            .into_iter()
            .reduce(ConceptExpr::and)
            .unwrap_or(ConceptExpr::Top)
    }

    pub fn is_top(&self) -> bool {
        matches!(self, ConceptExpr::Top)
    }

    pub fn is_name(&self) -> bool {
        matches!(self, ConceptExpr::Name(_))
    }

    /// Direct sub-expressions (conjunction operands or existential filler)
    pub fn children(&self) -> Vec<&ConceptExpr> {
        match self {
            ConceptExpr::Top | ConceptExpr::Name(_) => Vec::new(),
            ConceptExpr::And(conjunction) => conjunction.operands().to_vec(),
            ConceptExpr::Exists { filler, .. } => vec![&**filler],
        }
    }

    fn collect_signature(&self, concepts: &mut BTreeSet<String>, roles: &mut BTreeSet<String>) {
        match self {
            ConceptExpr::Top => {}
            ConceptExpr::Name(name) => {
                concepts.insert(name.clone());
            }
            ConceptExpr::And(conjunction) => {
                conjunction.left().collect_signature(concepts, roles);
                conjunction.right().collect_signature(concepts, roles);
            }
            ConceptExpr::Exists { role, filler } => {
                roles.insert(role.clone());
                filler.collect_signature(concepts, roles);
            }
        }
    }
}

impl fmt::Display for ConceptExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConceptExpr::And(conjunction) => {
                write_nested(conjunction.left(), f)?;
                f.write_str(" ⊓ ")?;
                write_nested(conjunction.right(), f)
            }
            other => write_nested(other, f),
        }
    }
}

/// Conjunctions below the top level are parenthesised
fn write_nested(expr: &ConceptExpr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match expr {
        ConceptExpr::Top => f.write_str("⊤"),
        ConceptExpr::Name(name) => f.write_str(name),
        ConceptExpr::And(_) => write!(f, "({})", expr),
        ConceptExpr::Exists { role, filler } => {
            write!(f, "∃{}.", role)?;
            write_nested(filler, f)
        }
    }
}

/// Axiom kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxiomKind {
    /// C ⊑ D
    Inclusion,
    /// C ≡ D
    Equivalence,
}

/// Terminological axiom
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Axiom {
    pub kind: AxiomKind,
    pub lhs: ConceptExpr,
    pub rhs: ConceptExpr,
}

impl Axiom {
    pub fn inclusion(lhs: ConceptExpr, rhs: ConceptExpr) -> Self {
        Self {
            kind: AxiomKind::Inclusion,
            lhs,
            rhs,
        }
    }

    pub fn equivalence(lhs: ConceptExpr, rhs: ConceptExpr) -> Self {
        Self {
            kind: AxiomKind::Equivalence,
            lhs,
            rhs,
        }
    }

    /// The inclusions this axiom stands for: one for `⊑`, both directions for `≡`
    pub fn inclusions(&self) -> Vec<(&ConceptExpr, &ConceptExpr)> {
        match self.kind {
            AxiomKind::Inclusion => vec![(&self.lhs, &self.rhs)],
            AxiomKind::Equivalence => vec![(&self.lhs, &self.rhs), (&self.rhs, &self.lhs)],
        }
    }
}

impl fmt::Display for Axiom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operator = match self.kind {
            AxiomKind::Inclusion => "⊑",
            AxiomKind::Equivalence => "≡",
        };
        write!(f, "{} {} {}", self.lhs, operator, self.rhs)
    }
}

/// Terminology (TBox)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TBox {
    /// Axioms in load order
    pub axioms: Vec<Axiom>,
}

impl TBox {
    pub fn new() -> Self {
        Self { axioms: Vec::new() }
    }

    pub fn add_axiom(&mut self, axiom: Axiom) {
        self.axioms.push(axiom);
    }

    pub fn len(&self) -> usize {
        self.axioms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axioms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Axiom> {
        self.axioms.iter()
    }

    /// Atomic concept names mentioned anywhere in the TBox
    pub fn concept_names(&self) -> BTreeSet<String> {
        self.signature().0
    }

    /// Role names mentioned anywhere in the TBox
    pub fn role_names(&self) -> BTreeSet<String> {
        self.signature().1
    }

    fn signature(&self) -> (BTreeSet<String>, BTreeSet<String>) {
        let mut concepts = BTreeSet::new();
        let mut roles = BTreeSet::new();
        for axiom in &self.axioms {
            axiom.lhs.collect_signature(&mut concepts, &mut roles);
            axiom.rhs.collect_signature(&mut concepts, &mut roles);
        }
        (concepts, roles)
    }
}

impl FromIterator<Axiom> for TBox {
    fn from_iter<I: IntoIterator<Item = Axiom>>(iter: I) -> Self {
        Self {
            axioms: iter.into_iter().collect(),
        }
    }
}
