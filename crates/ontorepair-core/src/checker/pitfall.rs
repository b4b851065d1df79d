//! Structural modeling heuristics.
//!
//! Every rule is stateless and runs over the full graph; findings are
//! always warnings.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;

use super::Checker;
use crate::domain::{CheckerKind, Diagnostic, ValidationReport};
use crate::graph::{local_name, vocab, OntologyGraph, ParsedOntology, Term};

const ANNOTATION_PREDICATES: &[&str] = &[
    vocab::RDFS_LABEL,
    vocab::RDFS_COMMENT,
    vocab::SKOS_PREF_LABEL,
    "http://www.w3.org/2000/01/rdf-schema#seeAlso",
    "http://www.w3.org/2000/01/rdf-schema#isDefinedBy",
    "http://www.w3.org/2004/02/skos/core#definition",
    "http://www.w3.org/2004/02/skos/core#altLabel",
    "http://purl.org/dc/terms/description",
    "http://purl.org/dc/elements/1.1/description",
];

/// One independent pitfall rule.
pub trait PitfallRule: Send + Sync {
    /// Stable rule code, e.g. `pitfall::missing_label`.
    fn code(&self) -> &'static str;

    fn detect(&self, graph: &OntologyGraph) -> Vec<Diagnostic>;
}

/// Runs a fixed set of pitfall rules.
pub struct PitfallDetector {
    rules: Vec<Box<dyn PitfallRule>>,
}

impl Default for PitfallDetector {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(MissingLabel),
                Box::new(CyclicSubclass),
                Box::new(MissingDisjointness),
                Box::new(OrphanClass),
                Box::new(InverseRelationship),
                Box::new(EquivalentClass),
                Box::new(AmbiguousNamespace),
            ],
        }
    }
}

impl PitfallDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Box<dyn PitfallRule>>) -> Self {
        Self { rules }
    }

    pub fn rule_codes(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.code()).collect()
    }

    /// Synchronous form of the check.
    pub fn detect(&self, graph: &OntologyGraph) -> Vec<Diagnostic> {
        self.rules
            .iter()
            .flat_map(|rule| {
                rule.detect(graph)
                    .into_iter()
                    .map(|d| d.with_source(CheckerKind::Pitfall.name()))
            })
            .collect()
    }
}

#[async_trait]
impl Checker for PitfallDetector {
    fn kind(&self) -> CheckerKind {
        CheckerKind::Pitfall
    }

    async fn check(&self, ontology: &ParsedOntology) -> ValidationReport {
        ValidationReport::with_diagnostics(CheckerKind::Pitfall, self.detect(ontology.graph()))
    }
}

fn is_annotation(graph: &OntologyGraph, predicate: &str) -> bool {
    ANNOTATION_PREDICATES.contains(&predicate)
        || graph.contains(
            &Term::iri(predicate),
            vocab::RDF_TYPE,
            &Term::iri(vocab::OWL_ANNOTATION_PROPERTY),
        )
}

// ---------------------------------------------------------------------------
// Missing labels
// ---------------------------------------------------------------------------

/// Classes and properties without a human-readable label.
pub struct MissingLabel;

impl PitfallRule for MissingLabel {
    fn code(&self) -> &'static str {
        "pitfall::missing_label"
    }

    fn detect(&self, graph: &OntologyGraph) -> Vec<Diagnostic> {
        let has_label = |iri: &str| {
            let term = Term::iri(iri);
            graph.objects(&term, vocab::RDFS_LABEL).next().is_some()
                || graph.objects(&term, vocab::SKOS_PREF_LABEL).next().is_some()
        };

        let classes = graph.classes();
        let properties = graph.properties();
        let mut out = Vec::new();
        for (what, iris) in [("class", &classes), ("property", &properties)] {
            for iri in iris.iter().filter(|iri| !has_label(iri)) {
                out.push(Diagnostic::pitfall(
                    self.code(),
                    iri.clone(),
                    format!("{what} {iri} has no rdfs:label"),
                ));
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Cyclic subclassing
// ---------------------------------------------------------------------------

/// Named classes that are (indirectly) subclasses of themselves.
pub struct CyclicSubclass;

impl PitfallRule for CyclicSubclass {
    fn code(&self) -> &'static str {
        "pitfall::cyclic_subclass"
    }

    fn detect(&self, graph: &OntologyGraph) -> Vec<Diagnostic> {
        let mut edges: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for t in graph.triples() {
            if t.predicate != vocab::RDFS_SUBCLASS_OF {
                continue;
            }
            if let (Some(sub), Some(sup)) = (t.subject.as_iri(), t.object.as_iri()) {
                edges.entry(sub).or_default().insert(sup);
                edges.entry(sup).or_default();
            }
        }

        strongly_connected(&edges)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || edges
                        .get(component[0])
                        .is_some_and(|next| next.contains(component[0]))
            })
            .map(|component| {
                let members = component
                    .iter()
                    .map(|iri| local_name(iri))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                Diagnostic::pitfall(
                    self.code(),
                    component[0].to_string(),
                    format!("cyclic subclass hierarchy: {members}"),
                )
            })
            .collect()
    }
}

/// Tarjan's algorithm; each component is sorted and components are sorted by first member.
///
/// Iterative, so hierarchy depth is bounded by the heap rather than the call stack.
fn strongly_connected<'a>(edges: &BTreeMap<&'a str, BTreeSet<&'a str>>) -> Vec<Vec<&'a str>> {
    let successors = |node: &str| -> std::vec::IntoIter<&'a str> {
        edges
            .get(node)
            .map(|next| next.iter().copied().collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter()
    };

    let mut next_index = 0usize;
    let mut indices: HashMap<&'a str, usize> = HashMap::new();
    let mut lowlink: HashMap<&'a str, usize> = HashMap::new();
    let mut stack: Vec<&'a str> = Vec::new();
    let mut on_stack: BTreeSet<&'a str> = BTreeSet::new();
    let mut components = Vec::new();

    for &root in edges.keys() {
        if indices.contains_key(root) {
            continue;
        }
        // Each frame holds a node and the successors it has not explored yet.
        let mut frames: Vec<(&'a str, std::vec::IntoIter<&'a str>)> = Vec::new();
        indices.insert(root, next_index);
        lowlink.insert(root, next_index);
        next_index += 1;
        stack.push(root);
        on_stack.insert(root);
        frames.push((root, successors(root)));

        while let Some((node, pending)) = frames.last_mut() {
            let node = *node;
            if let Some(next) = pending.next() {
                if !indices.contains_key(next) {
                    indices.insert(next, next_index);
                    lowlink.insert(next, next_index);
                    next_index += 1;
                    stack.push(next);
                    on_stack.insert(next);
                    frames.push((next, successors(next)));
                } else if on_stack.contains(next) {
                    let low = lowlink[node].min(indices[next]);
                    lowlink.insert(node, low);
                }
                continue;
            }

            frames.pop();
            if let Some((parent, _)) = frames.last() {
                let parent = *parent;
                let low = lowlink[parent].min(lowlink[node]);
                lowlink.insert(parent, low);
            }
            if lowlink[node] == indices[node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack.remove(member);
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                component.sort_unstable();
                components.push(component);
            }
        }
    }
    components.sort();
    components
}

// ---------------------------------------------------------------------------
// Missing disjointness
// ---------------------------------------------------------------------------

/// Sibling classes that are neither declared disjoint nor distinguished by any axiom.
pub struct MissingDisjointness;

impl MissingDisjointness {
    fn disjoint_pairs(graph: &OntologyGraph) -> BTreeSet<(String, String)> {
        let mut pairs = BTreeSet::new();
        let mut add = |a: &str, b: &str| {
            let (x, y) = if a <= b { (a, b) } else { (b, a) };
            pairs.insert((x.to_string(), y.to_string()));
        };
        for t in graph.triples() {
            if t.predicate == vocab::OWL_DISJOINT_WITH {
                if let (Some(a), Some(b)) = (t.subject.as_iri(), t.object.as_iri()) {
                    add(a, b);
                }
            }
        }
        let all_disjoint = Term::iri(vocab::OWL_ALL_DISJOINT_CLASSES);
        for axiom in graph.subjects(vocab::RDF_TYPE, &all_disjoint) {
            for head in graph.objects(axiom, vocab::OWL_MEMBERS) {
                let members: Vec<String> = graph
                    .list_items(head)
                    .iter()
                    .filter_map(|m| m.as_iri().map(str::to_string))
                    .collect();
                for (i, a) in members.iter().enumerate() {
                    for b in &members[i + 1..] {
                        add(a, b);
                    }
                }
            }
        }
        pairs
    }

    /// Axioms that could tell `class` apart from a sibling under `parent`.
    fn distinguishing_axioms(
        graph: &OntologyGraph,
        class: &str,
        parent: &str,
    ) -> BTreeSet<(String, Term)> {
        graph
            .about(&Term::iri(class))
            .filter(|t| !is_annotation(graph, &t.predicate))
            .filter(|t| t.predicate != vocab::OWL_DISJOINT_WITH)
            .filter(|t| !(t.predicate == vocab::RDF_TYPE && t.object.as_iri().is_some()))
            .filter(|t| !(t.predicate == vocab::RDFS_SUBCLASS_OF && t.object.is_iri(parent)))
            .map(|t| (t.predicate.clone(), normalize_blank(&t.object)))
            .collect()
    }
}

// Blank-node restrictions are compared by shape, not by label.
fn normalize_blank(term: &Term) -> Term {
    match term {
        Term::BlankNode(_) => Term::BlankNode(String::new()),
        other => other.clone(),
    }
}

impl PitfallRule for MissingDisjointness {
    fn code(&self) -> &'static str {
        "pitfall::missing_disjointness"
    }

    fn detect(&self, graph: &OntologyGraph) -> Vec<Diagnostic> {
        let classes = graph.classes();
        let disjoint = Self::disjoint_pairs(graph);

        let mut siblings: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for t in graph.triples() {
            if t.predicate != vocab::RDFS_SUBCLASS_OF {
                continue;
            }
            if let (Some(sub), Some(parent)) = (t.subject.as_iri(), t.object.as_iri()) {
                if parent != vocab::OWL_THING && sub != parent && classes.contains(sub) {
                    siblings.entry(parent).or_default().insert(sub);
                }
            }
        }

        let mut reported = BTreeSet::new();
        let mut out = Vec::new();
        for (parent, children) in &siblings {
            let children: Vec<&str> = children.iter().copied().collect();
            for (i, a) in children.iter().enumerate() {
                for b in &children[i + 1..] {
                    let pair = (a.to_string(), b.to_string());
                    if disjoint.contains(&pair) || reported.contains(&pair) {
                        continue;
                    }
                    if Self::distinguishing_axioms(graph, a, parent)
                        != Self::distinguishing_axioms(graph, b, parent)
                    {
                        continue;
                    }
                    out.push(Diagnostic::pitfall(
                        self.code(),
                        a.to_string(),
                        format!(
                            "sibling classes {a} and {b} under {parent} are not declared disjoint \
                             and no axiom distinguishes them"
                        ),
                    ));
                    reported.insert(pair);
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Orphan classes
// ---------------------------------------------------------------------------

/// Classes with no relation to anything else in the ontology.
pub struct OrphanClass;

impl PitfallRule for OrphanClass {
    fn code(&self) -> &'static str {
        "pitfall::orphan_class"
    }

    fn detect(&self, graph: &OntologyGraph) -> Vec<Diagnostic> {
        graph
            .classes()
            .into_iter()
            .filter(|iri| {
                let term = Term::iri(iri.as_str());
                let relates_out = graph.about(&term).any(|t| {
                    !is_annotation(graph, &t.predicate) && t.predicate != vocab::RDF_TYPE
                });
                let referenced = graph.referencing(&term).next().is_some();
                !relates_out && !referenced
            })
            .map(|iri| {
                let message = format!("class {iri} is not related to any other class or property");
                Diagnostic::pitfall(self.code(), iri, message)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Inverse relationships
// ---------------------------------------------------------------------------

/// `owl:inverseOf` declarations that contradict the rest of the property axioms.
pub struct InverseRelationship;

impl InverseRelationship {
    fn problem(graph: &OntologyGraph, prop: &str) -> Option<String> {
        let term = Term::iri(prop);
        for inverse in graph.objects(&term, vocab::OWL_INVERSE_OF) {
            let Some(other) = inverse.as_iri() else {
                return Some("its inverse is not a named property".to_string());
            };
            if other == prop
                && !graph.contains(&term, vocab::RDF_TYPE, &Term::iri(vocab::OWL_SYMMETRIC_PROPERTY))
            {
                return Some("it is its own inverse but not declared symmetric".to_string());
            }
            if !graph.contains(inverse, vocab::OWL_INVERSE_OF, &term) {
                return Some(format!("{other} does not declare it as its inverse"));
            }
            if graph.contains(&term, vocab::RDF_TYPE, &Term::iri(vocab::OWL_TRANSITIVE_PROPERTY)) {
                return Some("it is transitive and also declares an inverse".to_string());
            }

            let values = |subject: &Term, predicate: &'static str| -> BTreeSet<Term> {
                graph.objects(subject, predicate).cloned().collect()
            };
            let domains = values(&term, vocab::RDFS_DOMAIN);
            let ranges = values(&term, vocab::RDFS_RANGE);
            let inverse_domains = values(inverse, vocab::RDFS_DOMAIN);
            let inverse_ranges = values(inverse, vocab::RDFS_RANGE);
            if !domains.is_empty() && !inverse_ranges.is_empty() && domains != inverse_ranges {
                return Some(format!("its domain differs from the range of {other}"));
            }
            if !ranges.is_empty() && !inverse_domains.is_empty() && ranges != inverse_domains {
                return Some(format!("its range differs from the domain of {other}"));
            }
        }
        None
    }
}

impl PitfallRule for InverseRelationship {
    fn code(&self) -> &'static str {
        "pitfall::inverse_relationship"
    }

    fn detect(&self, graph: &OntologyGraph) -> Vec<Diagnostic> {
        let involved: BTreeSet<&str> = graph
            .triples()
            .iter()
            .filter(|t| t.predicate == vocab::OWL_INVERSE_OF)
            .flat_map(|t| [t.subject.as_iri(), t.object.as_iri()])
            .flatten()
            .collect();

        involved
            .into_iter()
            .filter_map(|prop| {
                Self::problem(graph, prop).map(|reason| {
                    Diagnostic::pitfall(
                        self.code(),
                        prop,
                        format!("inverse declaration of {prop} is wrong: {reason}"),
                    )
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Equivalent classes
// ---------------------------------------------------------------------------

/// `owl:equivalentClass` declarations that are redundant or contradicted.
pub struct EquivalentClass;

impl EquivalentClass {
    fn problem(graph: &OntologyGraph, class: &str) -> Option<String> {
        let term = Term::iri(class);
        for equivalent in graph.objects(&term, vocab::OWL_EQUIVALENT_CLASS) {
            // Anonymous class expressions are restrictions, not named equivalences.
            let Some(other) = equivalent.as_iri() else {
                continue;
            };
            if other == class {
                return Some("it is declared equivalent to itself".to_string());
            }
            if !graph.contains(equivalent, vocab::OWL_EQUIVALENT_CLASS, &term) {
                return Some(format!("{other} does not declare the equivalence back"));
            }
            if graph.contains(&term, vocab::RDFS_SUBCLASS_OF, equivalent) {
                return Some(format!("it is also declared a subclass of {other}"));
            }
            if graph.contains(equivalent, vocab::RDFS_SUBCLASS_OF, &term) {
                return Some(format!("it is also declared a superclass of {other}"));
            }
        }
        None
    }
}

impl PitfallRule for EquivalentClass {
    fn code(&self) -> &'static str {
        "pitfall::equivalent_class"
    }

    fn detect(&self, graph: &OntologyGraph) -> Vec<Diagnostic> {
        let involved: BTreeSet<&str> = graph
            .triples()
            .iter()
            .filter(|t| t.predicate == vocab::OWL_EQUIVALENT_CLASS)
            .flat_map(|t| [t.subject.as_iri(), t.object.as_iri()])
            .flatten()
            .collect();

        involved
            .into_iter()
            .filter_map(|class| {
                Self::problem(graph, class).map(|reason| {
                    Diagnostic::pitfall(
                        self.code(),
                        class,
                        format!("equivalence of {class} is wrong: {reason}"),
                    )
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Ambiguous namespaces
// ---------------------------------------------------------------------------

/// Namespaces that differ only by their trailing `#` or `/`.
pub struct AmbiguousNamespace;

/// Namespace part of an IRI, including the separator.
fn namespace_of(iri: &str) -> &str {
    match iri.rfind('#').or_else(|| iri.rfind('/')) {
        Some(at) => &iri[..=at],
        None => iri,
    }
}

impl PitfallRule for AmbiguousNamespace {
    fn code(&self) -> &'static str {
        "pitfall::ambiguous_namespace"
    }

    fn detect(&self, graph: &OntologyGraph) -> Vec<Diagnostic> {
        let mut by_base: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for t in graph.triples() {
            let iris = [t.subject.as_iri(), Some(t.predicate.as_str()), t.object.as_iri()];
            for iri in iris.into_iter().flatten() {
                let namespace = namespace_of(iri);
                by_base
                    .entry(namespace.trim_end_matches(['#', '/']))
                    .or_default()
                    .insert(namespace);
            }
        }

        let mut out = Vec::new();
        for namespaces in by_base.values().filter(|ns| ns.len() > 1) {
            for &namespace in namespaces {
                let others = namespaces
                    .iter()
                    .filter(|&&other| other != namespace)
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", ");
                out.push(Diagnostic::pitfall(
                    self.code(),
                    namespace,
                    format!("namespace {namespace} is ambiguous with {others}"),
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Triple;

    const PREFIXES: &str = "@prefix ex: <http://example.org/> .\n\
        @prefix owl: <http://www.w3.org/2002/07/owl#> .\n\
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n";

    fn graph(body: &str) -> OntologyGraph {
        OntologyGraph::parse_turtle(&format!("{PREFIXES}{body}")).expect("parse")
    }

    fn entities(diags: &[Diagnostic]) -> Vec<&str> {
        diags.iter().filter_map(|d| d.entity.as_deref()).collect()
    }

    #[test]
    fn test_missing_label_covers_classes_and_properties() {
        let g = graph(
            r#"
ex:A a owl:Class ; rdfs:label "A" .
ex:B a owl:Class .
ex:p a owl:ObjectProperty .
"#,
        );
        let diags = MissingLabel.detect(&g);
        assert_eq!(
            entities(&diags),
            vec!["http://example.org/B", "http://example.org/p"]
        );
        assert!(diags[1].message.starts_with("property"));
    }

    #[test]
    fn test_cycle_reported_once() {
        let g = graph(
            r#"
ex:A a owl:Class ; rdfs:subClassOf ex:B .
ex:B a owl:Class ; rdfs:subClassOf ex:C .
ex:C a owl:Class ; rdfs:subClassOf ex:A .
ex:D a owl:Class ; rdfs:subClassOf ex:A .
"#,
        );
        let diags = CyclicSubclass.detect(&g);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].entity.as_deref(), Some("http://example.org/A"));
        assert!(diags[0].message.contains("A -> B -> C"));
    }

    #[test]
    fn test_self_subclass_is_a_cycle() {
        let g = graph("ex:A a owl:Class ; rdfs:subClassOf ex:A .\n");
        assert_eq!(CyclicSubclass.detect(&g).len(), 1);
    }

    #[test]
    fn test_acyclic_hierarchy_is_clean() {
        let g = graph(
            r#"
ex:A a owl:Class .
ex:B a owl:Class ; rdfs:subClassOf ex:A .
ex:C a owl:Class ; rdfs:subClassOf ex:B .
"#,
        );
        assert!(CyclicSubclass.detect(&g).is_empty());
    }

    #[test]
    fn test_indistinguishable_siblings_flagged() {
        let g = graph(
            r#"
ex:Animal a owl:Class .
ex:Cat a owl:Class ; rdfs:subClassOf ex:Animal ; rdfs:label "Cat" .
ex:Dog a owl:Class ; rdfs:subClassOf ex:Animal ; rdfs:label "Dog" .
"#,
        );
        let diags = MissingDisjointness.detect(&g);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].entity.as_deref(), Some("http://example.org/Cat"));
        assert!(diags[0].message.contains("http://example.org/Dog"));
    }

    #[test]
    fn test_declared_disjoint_siblings_clean() {
        let g = graph(
            r#"
ex:Animal a owl:Class .
ex:Cat a owl:Class ; rdfs:subClassOf ex:Animal .
ex:Dog a owl:Class ; rdfs:subClassOf ex:Animal ; owl:disjointWith ex:Cat .
"#,
        );
        assert!(MissingDisjointness.detect(&g).is_empty());
    }

    #[test]
    fn test_all_disjoint_classes_axiom_counts() {
        let g = graph(
            r#"
ex:Animal a owl:Class .
ex:Cat a owl:Class ; rdfs:subClassOf ex:Animal .
ex:Dog a owl:Class ; rdfs:subClassOf ex:Animal .
[] a owl:AllDisjointClasses ; owl:members ( ex:Cat ex:Dog ) .
"#,
        );
        assert!(MissingDisjointness.detect(&g).is_empty());
    }

    #[test]
    fn test_distinguished_siblings_clean() {
        let g = graph(
            r#"
ex:Animal a owl:Class .
ex:Pet a owl:Class .
ex:Cat a owl:Class ; rdfs:subClassOf ex:Animal, ex:Pet .
ex:Dog a owl:Class ; rdfs:subClassOf ex:Animal .
"#,
        );
        assert!(MissingDisjointness.detect(&g).is_empty());
    }

    #[test]
    fn test_orphan_class_flagged() {
        let g = graph(
            r#"
ex:Animal a owl:Class ; rdfs:label "Animal" .
ex:Dog a owl:Class ; rdfs:subClassOf ex:Animal .
ex:Lonely a owl:Class ; rdfs:label "Lonely" .
"#,
        );
        let diags = OrphanClass.detect(&g);
        assert_eq!(entities(&diags), vec!["http://example.org/Lonely"]);
    }

    #[test]
    fn test_deep_hierarchy_does_not_exhaust_the_stack() {
        let depth = 200_000;
        let class = |i: usize| Term::iri(format!("http://example.org/C{i}"));
        let mut triples: Vec<Triple> = (0..depth)
            .map(|i| Triple {
                subject: class(i + 1),
                predicate: vocab::RDFS_SUBCLASS_OF.to_string(),
                object: class(i),
            })
            .collect();
        assert!(CyclicSubclass.detect(&OntologyGraph::from_triples(triples.clone())).is_empty());

        triples.push(Triple {
            subject: class(0),
            predicate: vocab::RDFS_SUBCLASS_OF.to_string(),
            object: class(depth),
        });
        let diags = CyclicSubclass.detect(&OntologyGraph::from_triples(triples));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_two_separate_cycles_are_both_reported() {
        let g = graph(
            r#"
ex:A rdfs:subClassOf ex:B .
ex:B rdfs:subClassOf ex:A .
ex:C rdfs:subClassOf ex:D .
ex:D rdfs:subClassOf ex:C .
ex:E rdfs:subClassOf ex:A .
"#,
        );
        let diags = CyclicSubclass.detect(&g);
        assert_eq!(
            entities(&diags),
            vec!["http://example.org/A", "http://example.org/C"]
        );
    }

    #[test]
    fn test_self_inverse_needs_symmetry() {
        let g = graph("ex:knows a owl:ObjectProperty ; owl:inverseOf ex:knows .\n");
        let diags = InverseRelationship.detect(&g);
        assert_eq!(entities(&diags), vec!["http://example.org/knows"]);
        assert!(diags[0].message.contains("not declared symmetric"));

        let g = graph(
            "ex:knows a owl:ObjectProperty, owl:SymmetricProperty ; owl:inverseOf ex:knows .\n",
        );
        assert!(InverseRelationship.detect(&g).is_empty());
    }

    #[test]
    fn test_inverse_must_be_reciprocated() {
        let g = graph(
            r#"
ex:hasOwner a owl:ObjectProperty ; owl:inverseOf ex:owns .
ex:owns a owl:ObjectProperty .
"#,
        );
        let diags = InverseRelationship.detect(&g);
        assert_eq!(entities(&diags), vec!["http://example.org/hasOwner"]);
    }

    #[test]
    fn test_transitive_property_with_inverse_flagged() {
        let g = graph(
            r#"
ex:partOf a owl:ObjectProperty, owl:TransitiveProperty ; owl:inverseOf ex:hasPart .
ex:hasPart a owl:ObjectProperty ; owl:inverseOf ex:partOf .
"#,
        );
        let diags = InverseRelationship.detect(&g);
        assert_eq!(entities(&diags), vec!["http://example.org/partOf"]);
        assert!(diags[0].message.contains("transitive"));
    }

    #[test]
    fn test_inverse_domain_and_range_must_line_up() {
        let consistent = graph(
            r#"
ex:owns owl:inverseOf ex:ownedBy ; rdfs:domain ex:Person ; rdfs:range ex:Pet .
ex:ownedBy owl:inverseOf ex:owns ; rdfs:domain ex:Pet ; rdfs:range ex:Person .
"#,
        );
        assert!(InverseRelationship.detect(&consistent).is_empty());

        let swapped = graph(
            r#"
ex:owns owl:inverseOf ex:ownedBy ; rdfs:domain ex:Person ; rdfs:range ex:Pet .
ex:ownedBy owl:inverseOf ex:owns ; rdfs:domain ex:Person ; rdfs:range ex:Pet .
"#,
        );
        assert_eq!(
            entities(&InverseRelationship.detect(&swapped)),
            vec!["http://example.org/ownedBy", "http://example.org/owns"]
        );
    }

    #[test]
    fn test_equivalent_class_checks() {
        let reciprocated = graph(
            r#"
ex:Human owl:equivalentClass ex:Person .
ex:Person owl:equivalentClass ex:Human .
ex:Adult owl:equivalentClass [ a owl:Restriction ] .
"#,
        );
        assert!(EquivalentClass.detect(&reciprocated).is_empty());

        let one_sided = graph("ex:Human owl:equivalentClass ex:Person .\n");
        assert_eq!(
            entities(&EquivalentClass.detect(&one_sided)),
            vec!["http://example.org/Human"]
        );

        let itself = graph("ex:Human owl:equivalentClass ex:Human .\n");
        assert!(EquivalentClass.detect(&itself)[0]
            .message
            .contains("equivalent to itself"));

        let also_subclass = graph(
            r#"
ex:Human owl:equivalentClass ex:Person ; rdfs:subClassOf ex:Person .
ex:Person owl:equivalentClass ex:Human .
"#,
        );
        let diags = EquivalentClass.detect(&also_subclass);
        assert_eq!(
            entities(&diags),
            vec!["http://example.org/Human", "http://example.org/Person"]
        );
        assert!(diags[0].message.contains("subclass"));
        assert!(diags[1].message.contains("superclass"));
    }

    #[test]
    fn test_namespaces_differing_by_separator_flagged() {
        let g = OntologyGraph::parse_turtle(
            r#"
@prefix owl: <http://www.w3.org/2002/07/owl#> .
<http://example.org/zoo#Cat> a owl:Class .
<http://example.org/zoo/Dog> a owl:Class .
<http://example.org/farm#Cow> a owl:Class .
"#,
        )
        .expect("parse");
        let diags = AmbiguousNamespace.detect(&g);
        assert_eq!(
            entities(&diags),
            vec!["http://example.org/zoo#", "http://example.org/zoo/"]
        );
        assert!(diags[0].message.contains("http://example.org/zoo/"));
    }

    #[test]
    fn test_single_namespace_is_not_ambiguous() {
        let g = graph("ex:A a owl:Class ; rdfs:subClassOf ex:B .\n");
        assert!(AmbiguousNamespace.detect(&g).is_empty());
    }

    #[test]
    fn test_detector_findings_are_warnings() {
        let g = graph("ex:Lonely a owl:Class .\n");
        let diags = PitfallDetector::new().detect(&g);
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| !d.is_fatal()));
        assert!(diags.iter().all(|d| d.sources == vec!["pitfall"]));
    }

    #[tokio::test]
    async fn test_checker_report_is_valid_even_with_pitfalls() {
        let parsed = ParsedOntology::parse(&format!("{PREFIXES}ex:Lonely a owl:Class .\n"))
            .expect("parse");
        let report = PitfallDetector::new().check(&parsed).await;
        assert!(report.is_valid());
        assert_eq!(report.pitfalls().len(), 2);
    }
}
