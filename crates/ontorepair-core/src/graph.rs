//! Parsed triple graph used by the downstream checkers.
//!
//! Turtle is parsed with `sophia`; terms are converted from their display
//! form into a small owned model so the pitfall rules can index them freely.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sophia::api::prelude::*;
use sophia::api::triple::Triple as _;

/// Well-known vocabulary IRIs.
pub mod vocab {
    pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const RDF_PROPERTY: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Property";
    pub const RDFS_CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
    pub const RDFS_SUBCLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
    pub const RDFS_DOMAIN: &str = "http://www.w3.org/2000/01/rdf-schema#domain";
    pub const RDFS_RANGE: &str = "http://www.w3.org/2000/01/rdf-schema#range";
    pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
    pub const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";
    pub const SKOS_PREF_LABEL: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";
    pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
    pub const OWL_THING: &str = "http://www.w3.org/2002/07/owl#Thing";
    pub const OWL_NOTHING: &str = "http://www.w3.org/2002/07/owl#Nothing";
    pub const OWL_OBJECT_PROPERTY: &str = "http://www.w3.org/2002/07/owl#ObjectProperty";
    pub const OWL_DATATYPE_PROPERTY: &str = "http://www.w3.org/2002/07/owl#DatatypeProperty";
    pub const OWL_ANNOTATION_PROPERTY: &str = "http://www.w3.org/2002/07/owl#AnnotationProperty";
    pub const OWL_INVERSE_OF: &str = "http://www.w3.org/2002/07/owl#inverseOf";
    pub const OWL_SYMMETRIC_PROPERTY: &str = "http://www.w3.org/2002/07/owl#SymmetricProperty";
    pub const OWL_TRANSITIVE_PROPERTY: &str = "http://www.w3.org/2002/07/owl#TransitiveProperty";
    pub const OWL_EQUIVALENT_CLASS: &str = "http://www.w3.org/2002/07/owl#equivalentClass";
    pub const OWL_DISJOINT_WITH: &str = "http://www.w3.org/2002/07/owl#disjointWith";
    pub const OWL_ALL_DISJOINT_CLASSES: &str = "http://www.w3.org/2002/07/owl#AllDisjointClasses";
    pub const OWL_MEMBERS: &str = "http://www.w3.org/2002/07/owl#members";
    pub const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
    pub const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
    pub const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

/// An RDF term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Iri(String),
    BlankNode(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn is_iri(&self, iri: &str) -> bool {
        self.as_iri() == Some(iri)
    }
}

/// One subject-predicate-object statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

/// Position and message of a Turtle parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct TermSinkError {
    message: String,
}

/// Local name of an IRI (after the last `#` or `/`).
pub fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/'])
        .find(|part| !part.is_empty())
        .unwrap_or(iri)
}

/// In-memory triple graph with subject and object indexes.
#[derive(Debug, Clone, Default)]
pub struct OntologyGraph {
    triples: Vec<Triple>,
    by_subject: HashMap<Term, Vec<usize>>,
    by_object: HashMap<Term, Vec<usize>>,
}

impl OntologyGraph {
    /// Parse a Turtle document.
    pub fn parse_turtle(text: &str) -> Result<Self, ParseFailure> {
        let reader = std::io::BufReader::new(std::io::Cursor::new(text.as_bytes()));
        let mut triples = Vec::new();
        let mut parser = sophia::turtle::parser::turtle::parse_bufread(reader);
        parser
            .try_for_each_triple(|t| -> std::result::Result<(), TermSinkError> {
                let subject = parse_term_display(&t.s().to_string())?;
                let Term::Iri(predicate) = parse_term_display(&t.p().to_string())? else {
                    return Ok(());
                };
                let object = parse_term_display(&t.o().to_string())?;
                triples.push(Triple {
                    subject,
                    predicate,
                    object,
                });
                Ok(())
            })
            .map_err(|e| ParseFailure::from_message(e.to_string()))?;
        Ok(Self::from_triples(triples))
    }

    pub fn from_triples(triples: Vec<Triple>) -> Self {
        let mut by_subject: HashMap<Term, Vec<usize>> = HashMap::new();
        let mut by_object: HashMap<Term, Vec<usize>> = HashMap::new();
        for (i, t) in triples.iter().enumerate() {
            by_subject.entry(t.subject.clone()).or_default().push(i);
            by_object.entry(t.object.clone()).or_default().push(i);
        }
        Self {
            triples,
            by_subject,
            by_object,
        }
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    /// Triples whose subject is `subject`.
    pub fn about<'a>(&'a self, subject: &Term) -> impl Iterator<Item = &'a Triple> + 'a {
        self.by_subject
            .get(subject)
            .into_iter()
            .flatten()
            .map(move |&i| &self.triples[i])
    }

    /// Triples whose object is `object`.
    pub fn referencing<'a>(&'a self, object: &Term) -> impl Iterator<Item = &'a Triple> + 'a {
        self.by_object
            .get(object)
            .into_iter()
            .flatten()
            .map(move |&i| &self.triples[i])
    }

    pub fn objects<'a>(
        &'a self,
        subject: &Term,
        predicate: &'a str,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.about(subject)
            .filter(move |t| t.predicate == predicate)
            .map(|t| &t.object)
    }

    pub fn subjects<'a>(
        &'a self,
        predicate: &'a str,
        object: &Term,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.referencing(object)
            .filter(move |t| t.predicate == predicate)
            .map(|t| &t.subject)
    }

    pub fn contains(&self, subject: &Term, predicate: &str, object: &Term) -> bool {
        self.about(subject)
            .any(|t| t.predicate == predicate && &t.object == object)
    }

    /// Named classes (typed `owl:Class` or `rdfs:Class`), sorted by IRI.
    pub fn classes(&self) -> BTreeSet<String> {
        self.typed_iris(&[vocab::OWL_CLASS, vocab::RDFS_CLASS])
    }

    /// Declared properties, sorted by IRI.
    pub fn properties(&self) -> BTreeSet<String> {
        self.typed_iris(&[
            vocab::OWL_OBJECT_PROPERTY,
            vocab::OWL_DATATYPE_PROPERTY,
            vocab::OWL_ANNOTATION_PROPERTY,
            vocab::RDF_PROPERTY,
        ])
    }

    fn typed_iris(&self, types: &[&str]) -> BTreeSet<String> {
        types
            .iter()
            .flat_map(|ty| self.subjects(vocab::RDF_TYPE, &Term::iri(*ty)))
            .filter_map(|s| s.as_iri())
            .filter(|iri| *iri != vocab::OWL_THING && *iri != vocab::OWL_NOTHING)
            .map(str::to_string)
            .collect()
    }

    /// Elements of an RDF collection starting at `head`.
    pub fn list_items(&self, head: &Term) -> Vec<Term> {
        let mut items = Vec::new();
        let mut node = head.clone();
        let mut guard = 0usize;
        while !node.is_iri(vocab::RDF_NIL) && guard <= self.triples.len() {
            guard += 1;
            let Some(first) = self.objects(&node, vocab::RDF_FIRST).next() else {
                break;
            };
            items.push(first.clone());
            let Some(rest) = self.objects(&node, vocab::RDF_REST).next() else {
                break;
            };
            node = rest.clone();
        }
        items
    }
}

/// Candidate text together with its successfully parsed graph.
///
/// Only the syntax checker constructs one, so holding a `ParsedOntology`
/// means the text is well-formed.
#[derive(Debug, Clone)]
pub struct ParsedOntology {
    text: Arc<str>,
    graph: Arc<OntologyGraph>,
}

impl ParsedOntology {
    pub(crate) fn new(text: &str, graph: OntologyGraph) -> Self {
        Self {
            text: Arc::from(text),
            graph: Arc::new(graph),
        }
    }

    /// Parse `text`; used by tools that need a graph without a full check.
    pub fn parse(text: &str) -> Result<Self, ParseFailure> {
        let graph = OntologyGraph::parse_turtle(text)?;
        Ok(Self::new(text, graph))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn graph(&self) -> &OntologyGraph {
        &self.graph
    }
}

impl ParseFailure {
    fn from_message(message: String) -> Self {
        let (line, column) = locate(&message);
        Self {
            message,
            line,
            column,
        }
    }
}

fn locate(message: &str) -> (Option<u32>, Option<u32>) {
    let line_re = regex::Regex::new(r"(?i)line\s*:?\s*(\d+)").ok();
    let col_re = regex::Regex::new(r"(?i)(?:column|position|col)\s*:?\s*(\d+)").ok();
    let pair_re = regex::Regex::new(r"(\d+):(\d+)").ok();

    let capture = |re: &Option<regex::Regex>| {
        re.as_ref()
            .and_then(|re| re.captures(message))
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
    };

    let line = capture(&line_re);
    let column = capture(&col_re);
    if line.is_some() {
        return (line, column);
    }
    let pair = pair_re.as_ref().and_then(|re| re.captures(message)).and_then(|c| {
        let l = c.get(1)?.as_str().parse::<u32>().ok()?;
        let col = c.get(2)?.as_str().parse::<u32>().ok()?;
        Some((l, col))
    });
    match pair {
        Some((l, col)) => (Some(l), Some(col)),
        None => (None, None),
    }
}

fn parse_term_display(term: &str) -> Result<Term, TermSinkError> {
    let s = term.trim();

    if let Some(rest) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(Term::Iri(rest.to_string()));
    }

    if let Some(rest) = s.strip_prefix("_:") {
        return Ok(Term::BlankNode(rest.to_string()));
    }

    if s.starts_with('"') {
        let mut end_quote = None;
        let mut escaped = false;
        for (i, ch) in s.char_indices().skip(1) {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' => escaped = true,
                '"' => {
                    end_quote = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let Some(end) = end_quote else {
            return Err(TermSinkError {
                message: format!("invalid literal term (missing closing quote): {s}"),
            });
        };

        let lexical = unescape(&s[1..end]);
        let rest = s[end + 1..].trim();
        let mut literal = Literal {
            lexical,
            datatype: None,
            language: None,
        };
        if let Some(lang) = rest.strip_prefix('@') {
            literal.language = Some(lang.to_string());
        } else if let Some(dt) = rest.strip_prefix("^^") {
            let dt = dt.trim();
            let dt = dt
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .unwrap_or(dt);
            if !dt.is_empty() {
                literal.datatype = Some(dt.to_string());
            }
        }
        return Ok(Term::Literal(literal));
    }

    Err(TermSinkError {
        message: format!("unsupported RDF term form: {s}"),
    })
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
