//! Query string parsing and boolean matching.
//!
//! The query language:
//!
//! - bare words, matched after running them through the index analyzer
//! - `AND` / `&`, `OR` / `|`, `NOT` / `!` and a leading `-`
//! - parentheses for grouping
//! - `"quoted phrases"`, matched by adjacency when the index keeps term
//!   positions and as an AND of their terms otherwise
//! - `prefix*` for every term starting with `prefix`
//!
//! Juxtaposed words are AND'd, or OR'd when the search asks for it. `AND`
//! binds tighter than `OR`. Words that analyze to nothing (stop words, too
//! short) are dropped from the query.

use std::collections::BTreeSet;
use std::iter::Peekable;
use std::str::Chars;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::Token;
use crate::document::DocumentId;
use crate::error::Result;
use crate::index::generation::Generation;
use crate::index::term::TermId;

/// A parsed query, before term resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Word(String),
    Prefix(String),
    Phrase(String),
    And(Vec<QueryNode>),
    Or(Vec<QueryNode>),
    Not(Box<QueryNode>),
}

#[derive(Debug, Clone, PartialEq)]
enum Lexeme {
    Word(String),
    Quoted(String),
    LParen,
    RParen,
    And,
    Or,
    Not,
}

impl Lexeme {
    fn starts_operand(&self) -> bool {
        matches!(
            self,
            Lexeme::Word(_) | Lexeme::Quoted(_) | Lexeme::LParen | Lexeme::Not
        )
    }
}

fn is_operator_char(c: char) -> bool {
    matches!(c, '(' | ')' | '&' | '|' | '!' | '"')
}

fn lex(query: &str) -> Vec<Lexeme> {
    let mut chars: Peekable<Chars<'_>> = query.chars().peekable();
    let mut lexemes = Vec::new();
    let mut at_word_start = true;

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            at_word_start = true;
            continue;
        }

        match c {
            '(' => {
                chars.next();
                lexemes.push(Lexeme::LParen);
                at_word_start = true;
                continue;
            }
            ')' => {
                chars.next();
                lexemes.push(Lexeme::RParen);
            }
            '&' => {
                chars.next();
                lexemes.push(Lexeme::And);
            }
            '|' => {
                chars.next();
                lexemes.push(Lexeme::Or);
            }
            '!' => {
                chars.next();
                lexemes.push(Lexeme::Not);
                at_word_start = true;
                continue;
            }
            '-' if at_word_start => {
                chars.next();
                lexemes.push(Lexeme::Not);
                continue;
            }
            '"' => {
                chars.next();
                let phrase: String = chars.by_ref().take_while(|&c| c != '"').collect();
                lexemes.push(Lexeme::Quoted(phrase));
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || is_operator_char(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                lexemes.push(match word.as_str() {
                    "AND" => Lexeme::And,
                    "OR" => Lexeme::Or,
                    "NOT" => Lexeme::Not,
                    _ => Lexeme::Word(word),
                });
            }
        }
        at_word_start = false;
    }

    lexemes
}

/// Parser for the query language. Malformed input never fails: dangling
/// operators and unbalanced parentheses are ignored.
#[derive(Debug)]
pub struct QueryParser {
    space_means_or: bool,
}

impl QueryParser {
    pub fn new(space_means_or: bool) -> Self {
        QueryParser { space_means_or }
    }

    /// Parse a query string. Returns `None` for an empty query.
    pub fn parse(&self, query: &str) -> Option<QueryNode> {
        let lexemes = lex(query);
        let mut state = ParseState {
            lexemes: &lexemes,
            position: 0,
            space_means_or: self.space_means_or,
        };

        let mut parts = Vec::new();
        while state.position < lexemes.len() {
            let start = state.position;
            match state.parse_or() {
                Some(node) => parts.push(node),
                // Skip whatever could not start an expression.
                None if state.position == start => state.position += 1,
                None => {}
            }
        }
        combine(parts, self.space_means_or)
    }
}

fn combine(mut parts: Vec<QueryNode>, or: bool) -> Option<QueryNode> {
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ if or => Some(QueryNode::Or(parts)),
        _ => Some(QueryNode::And(parts)),
    }
}

struct ParseState<'a> {
    lexemes: &'a [Lexeme],
    position: usize,
    space_means_or: bool,
}

impl ParseState<'_> {
    fn peek(&self) -> Option<&Lexeme> {
        self.lexemes.get(self.position)
    }

    fn parse_or(&mut self) -> Option<QueryNode> {
        let mut operands: Vec<QueryNode> = self.parse_and().into_iter().collect();

        loop {
            match self.peek() {
                Some(Lexeme::Or) => self.position += 1,
                Some(lexeme) if self.space_means_or && lexeme.starts_operand() => {}
                _ => break,
            }
            match self.parse_and() {
                Some(node) => operands.push(node),
                None => break,
            }
        }

        combine(operands, true)
    }

    fn parse_and(&mut self) -> Option<QueryNode> {
        let mut operands: Vec<QueryNode> = self.parse_unary().into_iter().collect();

        loop {
            match self.peek() {
                Some(Lexeme::And) => self.position += 1,
                Some(lexeme) if !self.space_means_or && lexeme.starts_operand() => {}
                _ => break,
            }
            match self.parse_unary() {
                Some(node) => operands.push(node),
                None => break,
            }
        }

        combine(operands, false)
    }

    fn parse_unary(&mut self) -> Option<QueryNode> {
        match self.peek()? {
            Lexeme::Not => {
                self.position += 1;
                self.parse_unary().map(|node| QueryNode::Not(Box::new(node)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Option<QueryNode> {
        let lexeme = self.peek()?.clone();
        match lexeme {
            Lexeme::LParen => {
                self.position += 1;
                let inner = self.parse_or();
                if self.peek() == Some(&Lexeme::RParen) {
                    self.position += 1;
                }
                inner
            }
            Lexeme::Quoted(phrase) => {
                self.position += 1;
                Some(QueryNode::Phrase(phrase))
            }
            Lexeme::Word(word) => {
                self.position += 1;
                match word.strip_suffix('*') {
                    Some(prefix) if !prefix.is_empty() => {
                        Some(QueryNode::Prefix(prefix.to_string()))
                    }
                    Some(_) => None,
                    None => Some(QueryNode::Word(word)),
                }
            }
            _ => None,
        }
    }
}

/// A query resolved against one generation's dictionary.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Matches no document.
    Nothing,
    Term(TermId),
    /// Any of the terms.
    AnyTerm(Vec<TermId>),
    /// Terms at fixed position offsets from each other.
    Phrase(Vec<(TermId, u32)>),
    All(Vec<Matcher>),
    Any(Vec<Matcher>),
    Not(Box<Matcher>),
}

impl Matcher {
    /// Resolve a parsed query. Returns `None` when every word analyzed to
    /// nothing.
    pub fn resolve(
        node: &QueryNode,
        generation: &Generation,
        analyzer: &dyn Analyzer,
        positions: bool,
    ) -> Result<Option<Matcher>> {
        let dictionary = generation.dictionary();

        let resolved = match node {
            QueryNode::Word(word) | QueryNode::Phrase(word) => {
                let tokens: Vec<Token> = analyzer.analyze(word)?.collect();
                if tokens.is_empty() {
                    return Ok(None);
                }

                let base = tokens[0].position;
                let mut terms = Vec::with_capacity(tokens.len());
                for token in &tokens {
                    let id = dictionary.id_for_term(&token.text);
                    if !id.is_found() {
                        return Ok(Some(Matcher::Nothing));
                    }
                    terms.push((id, (token.position - base) as u32));
                }

                match terms.len() {
                    1 => Matcher::Term(terms[0].0),
                    _ if positions => Matcher::Phrase(terms),
                    _ => Matcher::All(terms.into_iter().map(|(id, _)| Matcher::Term(id)).collect()),
                }
            }
            QueryNode::Prefix(prefix) => {
                let normalized = prefix.to_lowercase();
                let ids = dictionary.ids_with_prefix(&normalized);
                if ids.is_empty() {
                    Matcher::Nothing
                } else {
                    Matcher::AnyTerm(ids)
                }
            }
            QueryNode::And(children) | QueryNode::Or(children) => {
                let mut resolved = Vec::with_capacity(children.len());
                for child in children {
                    if let Some(matcher) = Self::resolve(child, generation, analyzer, positions)? {
                        resolved.push(matcher);
                    }
                }
                match (resolved.len(), node) {
                    (0, _) => return Ok(None),
                    (1, _) => resolved.swap_remove(0),
                    (_, QueryNode::And(_)) => Matcher::All(resolved),
                    _ => Matcher::Any(resolved),
                }
            }
            QueryNode::Not(child) => {
                match Self::resolve(child, generation, analyzer, positions)? {
                    Some(matcher) => Matcher::Not(Box::new(matcher)),
                    None => return Ok(None),
                }
            }
        };
        Ok(Some(resolved))
    }

    /// Term IDs that contribute to relevance: every term outside a `Not`.
    pub fn positive_terms(&self) -> BTreeSet<TermId> {
        let mut terms = BTreeSet::new();
        self.collect_positive(&mut terms);
        terms
    }

    fn collect_positive(&self, terms: &mut BTreeSet<TermId>) {
        match self {
            Matcher::Nothing | Matcher::Not(_) => {}
            Matcher::Term(id) => {
                terms.insert(*id);
            }
            Matcher::AnyTerm(ids) => terms.extend(ids.iter().copied()),
            Matcher::Phrase(phrase) => terms.extend(phrase.iter().map(|(id, _)| *id)),
            Matcher::All(children) | Matcher::Any(children) => {
                for child in children {
                    child.collect_positive(terms);
                }
            }
        }
    }

    /// Documents matching this query in a generation, ascending.
    pub fn matching_documents(&self, generation: &Generation) -> BTreeSet<DocumentId> {
        match self {
            Matcher::Nothing => BTreeSet::new(),
            Matcher::Term(id) => term_documents(generation, *id),
            Matcher::AnyTerm(ids) => ids
                .iter()
                .flat_map(|id| term_documents(generation, *id))
                .collect(),
            Matcher::Phrase(phrase) => phrase_documents(generation, phrase),
            Matcher::All(children) => {
                let (negative, positive): (Vec<&Matcher>, Vec<&Matcher>) = children
                    .iter()
                    .partition(|child| matches!(child, Matcher::Not(_)));

                let mut result = match positive.split_first() {
                    Some((first, rest)) => {
                        let mut acc = first.matching_documents(generation);
                        for child in rest {
                            if acc.is_empty() {
                                break;
                            }
                            let docs = child.matching_documents(generation);
                            acc.retain(|id| docs.contains(id));
                        }
                        acc
                    }
                    None => all_documents(generation),
                };

                for child in negative {
                    if let Matcher::Not(inner) = child {
                        let excluded = inner.matching_documents(generation);
                        result.retain(|id| !excluded.contains(id));
                    }
                }
                result
            }
            Matcher::Any(children) => children
                .iter()
                .flat_map(|child| child.matching_documents(generation))
                .collect(),
            Matcher::Not(inner) => {
                let excluded = inner.matching_documents(generation);
                all_documents(generation)
                    .into_iter()
                    .filter(|id| !excluded.contains(id))
                    .collect()
            }
        }
    }
}

fn all_documents(generation: &Generation) -> BTreeSet<DocumentId> {
    generation.document_ids().into_iter().collect()
}

fn term_documents(generation: &Generation, id: TermId) -> BTreeSet<DocumentId> {
    generation
        .postings(id)
        .map(|list| list.iter().map(|posting| posting.doc_id).collect())
        .unwrap_or_default()
}

fn phrase_documents(generation: &Generation, phrase: &[(TermId, u32)]) -> BTreeSet<DocumentId> {
    let Some(((first, _), rest)) = phrase.split_first() else {
        return BTreeSet::new();
    };
    let Some(first_list) = generation.postings(*first) else {
        return BTreeSet::new();
    };

    first_list
        .iter()
        .filter(|posting| {
            posting.positions.iter().any(|&start| {
                rest.iter().all(|(id, offset)| {
                    generation
                        .postings(*id)
                        .and_then(|list| list.get(posting.doc_id))
                        .is_some_and(|other| other.positions.binary_search(&(start + offset)).is_ok())
                })
            })
        })
        .map(|posting| posting.doc_id)
        .collect()
}
