//! オントロジーローダー
//!
//! 推論コアはオントロジーの構文を直接扱わない。外部の表現は
//! [`ConceptFormatter`] を通じて [`ConceptExpr`] に変換され、変換できない公理は
//! スキップされる。

use crate::model::{AxiomKind, Axiom, ConceptExpr, TBox};
use crate::ElError;
use logos::Logos;
use std::borrow::Borrow;
use std::ops::Range;
use std::path::Path;
use tracing::warn;

/// Turns an externally parsed operand into a concept expression
pub trait ConceptFormatter {
    type Operand: ?Sized;

    fn format(&self, operand: &Self::Operand) -> Result<ConceptExpr, ElError>;
}

/// Ontology loader trait
pub trait OntologyLoader {
    fn load_tbox(&self, source: &str) -> Result<TBox, ElError>;

    fn load_file(&self, path: &Path) -> Result<TBox, ElError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| ElError::LoaderError(format!("{}: {}", path.display(), e)))?;
        self.load_tbox(&source)
    }
}

/// Axiom whose operands are still in the source representation
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAxiom<O> {
    /// Position in the source (line number for text sources)
    pub index: usize,
    pub kind: AxiomKind,
    pub lhs: O,
    pub rhs: O,
}

/// An axiom skipped during extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedAxiom {
    pub index: usize,
    pub reason: String,
}

impl From<MalformedAxiom> for ElError {
    fn from(malformed: MalformedAxiom) -> Self {
        ElError::MalformedAxiom {
            index: malformed.index,
            reason: malformed.reason,
        }
    }
}

impl TBox {
    /// Build a TBox from source axioms, skipping those whose operands the
    /// formatter rejects. Skipped axioms are returned alongside the TBox.
    pub fn from_source<O, F>(
        axioms: impl IntoIterator<Item = SourceAxiom<O>>,
        formatter: &F,
    ) -> (TBox, Vec<MalformedAxiom>)
    where
        F: ConceptFormatter,
        O: Borrow<F::Operand>,
    {
        let mut tbox = TBox::new();
        let mut malformed = Vec::new();

        for axiom in axioms {
            let operands = formatter
                .format(axiom.lhs.borrow())
                .and_then(|lhs| Ok((lhs, formatter.format(axiom.rhs.borrow())?)));
            match operands {
                Ok((lhs, rhs)) => tbox.add_axiom(Axiom {
                    kind: axiom.kind,
                    lhs,
                    rhs,
                }),
                Err(e) => {
                    warn!(index = axiom.index, error = %e, "skipping malformed axiom");
                    malformed.push(MalformedAxiom {
                        index: axiom.index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        (tbox, malformed)
    }
}

/// DL 構文トークン
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum Token<'a> {
    #[token("⊑")]
    #[token("<=")]
    #[token("SubClassOf")]
    SubClassOf,

    #[token("≡")]
    #[token("==")]
    #[token("EquivalentTo")]
    EquivalentTo,

    #[token("⊓")]
    #[token("&")]
    #[token("and")]
    And,

    #[token("∃")]
    #[token("exists")]
    Exists,

    #[token("⊤")]
    #[token("TOP")]
    #[token("owl:Thing")]
    Top,

    #[token(".")]
    Dot,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[regex(r"[A-Za-z_][A-Za-z0-9_:\-]*")]
    Ident(&'a str),
}

fn tokenize(text: &str) -> Result<Vec<(Token<'_>, Range<usize>)>, ElError> {
    let mut lexer = Token::lexer(text);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next() {
        let span = lexer.span();
        match token {
            Ok(token) => tokens.push((token, span)),
            Err(_) => {
                return Err(ElError::ParseError {
                    position: span.start,
                    message: format!("unexpected input {:?}", &text[span]),
                })
            }
        }
    }

    Ok(tokens)
}

/// Recursive descent over one operand.
///
/// ```text
/// concept := unary (⊓ unary)*
/// unary   := ⊤ | Name | ∃ role . unary | ( concept )
/// ```
struct ConceptParser<'a> {
    tokens: Vec<(Token<'a>, Range<usize>)>,
    pos: usize,
    end: usize,
}

impl<'a> ConceptParser<'a> {
    fn next(&mut self) -> Option<(Token<'a>, Range<usize>)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).map(|(token, _)| *token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.end)
    }

    fn error(&self, message: impl Into<String>) -> ElError {
        ElError::ParseError {
            position: self.position(),
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token<'a>, describe: &str) -> Result<(), ElError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {}", describe)))
        }
    }

    fn concept(&mut self) -> Result<ConceptExpr, ElError> {
        let mut operands = vec![self.unary()?];
        while self.peek() == Some(Token::And) {
            self.pos += 1;
            operands.push(self.unary()?);
        }
        Ok(ConceptExpr::conjunction_of(operands))
    }

    fn unary(&mut self) -> Result<ConceptExpr, ElError> {
        let position = self.position();
        match self.next() {
            Some((Token::Top, _)) => Ok(ConceptExpr::Top),
            Some((Token::Ident(name), _)) => Ok(ConceptExpr::name(name)),
            Some((Token::Exists, _)) => {
                let role = match self.next() {
                    Some((Token::Ident(role), _)) => role,
                    _ => {
                        return Err(ElError::ParseError {
                            position,
                            message: "expected role name after ∃".to_string(),
                        })
                    }
                };
                self.expect(Token::Dot, "'.' after role name")?;
                let filler = self.unary()?;
                Ok(ConceptExpr::exists(role, filler))
            }
            Some((Token::LParen, _)) => {
                let inner = self.concept()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some((token, span)) => Err(ElError::ParseError {
                position: span.start,
                message: format!("unexpected {:?}", token),
            }),
            None => Err(ElError::ParseError {
                position,
                message: "unexpected end of concept".to_string(),
            }),
        }
    }

    fn finish(&self) -> Result<(), ElError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(self.error(format!("trailing {:?}", token))),
        }
    }
}

/// Formatter for the textual DL syntax
#[derive(Debug, Default, Clone, Copy)]
pub struct DlSyntaxFormatter;

impl ConceptFormatter for DlSyntaxFormatter {
    type Operand = str;

    fn format(&self, operand: &str) -> Result<ConceptExpr, ElError> {
        let mut parser = ConceptParser {
            tokens: tokenize(operand)?,
            pos: 0,
            end: operand.len(),
        };
        let concept = parser.concept()?;
        parser.finish()?;
        Ok(concept)
    }
}

/// Line-oriented DL syntax loader.
///
/// One axiom per line, e.g. `Bus ⊑ PublicTransport ⊓ ∃hasFuelType.Diesel` or
/// `Child == Person & exists hasParent.Person`. Text after `#` is ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct DlSyntaxLoader {
    strict: bool,
}

impl DlSyntaxLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on the first malformed line instead of skipping it
    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Load and also return every line that was skipped
    pub fn load_with_report(&self, source: &str) -> Result<(TBox, Vec<MalformedAxiom>), ElError> {
        let mut axioms = Vec::new();
        let mut malformed = Vec::new();

        for (number, raw) in source.lines().enumerate() {
            let index = number + 1;
            let line = raw.split('#').next().unwrap_or_default();
            if line.trim().is_empty() {
                continue;
            }
            match split_axiom(index, line) {
                Ok(axiom) => axioms.push(axiom),
                Err(reason) => {
                    warn!(line = index, %reason, "skipping malformed axiom");
                    malformed.push(MalformedAxiom { index, reason });
                }
            }
        }

        let (tbox, rejected) = TBox::from_source(axioms, &DlSyntaxFormatter);
        malformed.extend(rejected);
        malformed.sort_by_key(|m| m.index);

        if self.strict {
            if let Some(first) = malformed.into_iter().next() {
                return Err(first.into());
            }
            return Ok((tbox, Vec::new()));
        }

        Ok((tbox, malformed))
    }
}

/// Split a line at its single axiom operator
fn split_axiom(index: usize, line: &str) -> Result<SourceAxiom<&str>, String> {
    let tokens = tokenize(line).map_err(|e| e.to_string())?;
    let mut operators = tokens.iter().filter_map(|(token, span)| match token {
        Token::SubClassOf => Some((AxiomKind::Inclusion, span.clone())),
        Token::EquivalentTo => Some((AxiomKind::Equivalence, span.clone())),
        _ => None,
    });

    let (kind, span) = operators
        .next()
        .ok_or_else(|| "missing ⊑ or ≡".to_string())?;
    if operators.next().is_some() {
        return Err("more than one axiom operator".to_string());
    }

    Ok(SourceAxiom {
        index,
        kind,
        lhs: &line[..span.start],
        rhs: &line[span.end..],
    })
}

impl OntologyLoader for DlSyntaxLoader {
    fn load_tbox(&self, source: &str) -> Result<TBox, ElError> {
        self.load_with_report(source).map(|(tbox, _)| tbox)
    }
}

/// Loads the serde JSON form of a [`TBox`]
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLoader;

impl OntologyLoader for JsonLoader {
    fn load_tbox(&self, source: &str) -> Result<TBox, ElError> {
        serde_json::from_str(source).map_err(|e| ElError::LoaderError(e.to_string()))
    }
}
