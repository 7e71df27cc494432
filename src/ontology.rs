use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::hash::BuildHasherDefault;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use seahash::SeaHasher;
use serde::{Deserialize, Serialize};

use crate::error::{OwlError, Result};

// we will use a fast hashing algo for hashmaps and hashsets keyed by IRIs
pub type IriHasher = BuildHasherDefault<SeaHasher>;

lazy_static! {
    // absolute IRI: scheme followed by at least one non-whitespace character
    static ref IRI_SYNTAX: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:\S+$").unwrap();
}

// ------------- Iri -------------
/// An IRI naming an ontology, class, property or individual.
///
/// Cheap to clone; the text is shared. Construction through [`Iri::new`]
/// checks the basic absolute-IRI shape so that malformed identifiers are
/// rejected at the boundary instead of surfacing later as broken axioms.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Iri(Arc<str>);

impl Iri {
    pub fn new(text: &str) -> Result<Self> {
        if !IRI_SYNTAX.is_match(text) {
            return Err(OwlError::Input(format!("not a valid IRI: '{}'", text)));
        }
        Ok(Self(Arc::from(text)))
    }

    // for IRIs assembled from parts that are already known to be well formed
    pub(crate) fn trusted(text: String) -> Self {
        Self(Arc::from(text.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fragment after `#`, if any.
    pub fn fragment(&self) -> Option<&str> {
        self.0.split_once('#').map(|(_, f)| f)
    }

    /// A new IRI with `fragment` attached to this IRI's base
    /// (replacing any existing fragment).
    pub fn with_fragment(&self, fragment: &str) -> Iri {
        let base = match self.0.split_once('#') {
            Some((base, _)) => base,
            None => &self.0,
        };
        Iri::trusted(format!("{}#{}", base, fragment))
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Iri {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

// ------------- Literal -------------
/// A typed literal constant: a lexical form paired with a datatype IRI.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    pub datatype: Iri,
}

impl Literal {
    pub fn new(lexical: String, datatype: Iri) -> Self {
        Self { lexical, datatype }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"^^{:?}", self.lexical, self.datatype)
    }
}

// ------------- Axiom -------------
/// The axiom kinds the marshalling core produces and consumes.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Axiom {
    ClassDeclaration(Iri),
    SubClassOf {
        sub: Iri,
        sup: Iri,
    },
    ClassAssertion {
        class: Iri,
        individual: Iri,
    },
    DataPropertyAssertion {
        subject: Iri,
        property: Iri,
        value: Literal,
    },
    ObjectPropertyAssertion {
        subject: Iri,
        property: Iri,
        object: Iri,
    },
    Import(Iri),
}

impl fmt::Display for Axiom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Axiom::ClassDeclaration(c) => write!(f, "Class({:?})", c),
            Axiom::SubClassOf { sub, sup } => write!(f, "SubClassOf({:?} {:?})", sub, sup),
            Axiom::ClassAssertion { class, individual } => {
                write!(f, "ClassAssertion({:?} {:?})", class, individual)
            }
            Axiom::DataPropertyAssertion { subject, property, value } => {
                write!(f, "DataPropertyAssertion({:?} {:?} {})", property, subject, value)
            }
            Axiom::ObjectPropertyAssertion { subject, property, object } => {
                write!(f, "ObjectPropertyAssertion({:?} {:?} {:?})", property, subject, object)
            }
            Axiom::Import(i) => write!(f, "Import({:?})", i),
        }
    }
}

// the shape an ontology takes on disk
#[derive(Serialize, Deserialize)]
struct OntologyDoc {
    iri: Iri,
    axioms: Vec<Axiom>,
}

// ------------- Ontology -------------
/// A named, deduplicated, insertion-ordered set of axioms.
///
/// Adding an axiom twice is a no-op, which is what makes re-discovery of an
/// object during graph traversal idempotent. Lookup indexes over subjects
/// and individuals are maintained on insert so the unmarshalling engine can
/// walk individuals without scanning the whole axiom list per individual.
pub struct Ontology {
    iri: Iri,
    axioms: Vec<Axiom>,
    kept: HashSet<Axiom, IriHasher>,
    // individuals in order of first appearance
    individuals: Vec<Iri>,
    seen_individuals: HashSet<Iri, IriHasher>,
    // positions into `axioms`, keyed by the subject individual
    by_subject: HashMap<Iri, Vec<usize>, IriHasher>,
}

impl Ontology {
    pub fn new(iri: Iri) -> Self {
        Self {
            iri,
            axioms: Vec::new(),
            kept: HashSet::default(),
            individuals: Vec::new(),
            seen_individuals: HashSet::default(),
            by_subject: HashMap::default(),
        }
    }

    pub fn iri(&self) -> &Iri {
        &self.iri
    }

    pub fn len(&self) -> usize {
        self.axioms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axioms.is_empty()
    }

    pub fn axioms(&self) -> impl Iterator<Item = &Axiom> {
        self.axioms.iter()
    }

    fn note_individual(&mut self, individual: &Iri) {
        if self.seen_individuals.insert(individual.clone()) {
            self.individuals.push(individual.clone());
        }
    }

    /// Adds an axiom. Returns `true` when the axiom was previously kept
    /// (and therefore not added again).
    pub fn add_axiom(&mut self, axiom: Axiom) -> bool {
        if self.kept.contains(&axiom) {
            return true;
        }
        let position = self.axioms.len();
        match &axiom {
            Axiom::ClassAssertion { individual, .. } => {
                self.note_individual(individual);
                self.by_subject.entry(individual.clone()).or_default().push(position);
            }
            Axiom::DataPropertyAssertion { subject, .. } => {
                self.note_individual(subject);
                self.by_subject.entry(subject.clone()).or_default().push(position);
            }
            Axiom::ObjectPropertyAssertion { subject, object, .. } => {
                self.note_individual(subject);
                self.note_individual(object);
                self.by_subject.entry(subject.clone()).or_default().push(position);
            }
            _ => {}
        }
        self.kept.insert(axiom.clone());
        self.axioms.push(axiom);
        false
    }

    /// All individuals referenced anywhere, in order of first appearance.
    pub fn individuals(&self) -> &[Iri] {
        &self.individuals
    }

    /// The classes asserted for an individual, in assertion order.
    pub fn classes_of(&self, individual: &Iri) -> Vec<Iri> {
        self.subject_axioms(individual)
            .filter_map(|axiom| match axiom {
                Axiom::ClassAssertion { class, .. } => Some(class.clone()),
                _ => None,
            })
            .collect()
    }

    /// The data property assertions for an individual as (property, literal).
    pub fn data_values_of(&self, individual: &Iri) -> Vec<(Iri, &Literal)> {
        self.subject_axioms(individual)
            .filter_map(|axiom| match axiom {
                Axiom::DataPropertyAssertion { property, value, .. } => {
                    Some((property.clone(), value))
                }
                _ => None,
            })
            .collect()
    }

    /// The object property assertions for an individual as (property, target).
    pub fn object_values_of(&self, individual: &Iri) -> Vec<(Iri, Iri)> {
        self.subject_axioms(individual)
            .filter_map(|axiom| match axiom {
                Axiom::ObjectPropertyAssertion { property, object, .. } => {
                    Some((property.clone(), object.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn imports(&self) -> Vec<Iri> {
        self.axioms
            .iter()
            .filter_map(|axiom| match axiom {
                Axiom::Import(iri) => Some(iri.clone()),
                _ => None,
            })
            .collect()
    }

    fn subject_axioms<'a>(&'a self, subject: &Iri) -> impl Iterator<Item = &'a Axiom> {
        self.by_subject
            .get(subject)
            .into_iter()
            .flatten()
            .map(|position| &self.axioms[*position])
    }

    // --- storage ---

    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        let doc = OntologyDoc {
            iri: self.iri.clone(),
            axioms: self.axioms.clone(),
        };
        serde_json::to_writer_pretty(writer, &doc)?;
        Ok(())
    }

    pub fn load<R: Read>(reader: R) -> Result<Ontology> {
        let doc: OntologyDoc = serde_json::from_reader(reader)?;
        let mut ontology = Ontology::new(doc.iri);
        for axiom in doc.axioms {
            ontology.add_axiom(axiom);
        }
        Ok(ontology)
    }

    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save(BufWriter::new(File::create(path)?))
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Ontology> {
        Ontology::load(BufReader::new(File::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(text: &str) -> Iri {
        Iri::new(text).unwrap()
    }

    #[test]
    fn malformed_iris_are_rejected() {
        assert!(Iri::new("").is_err());
        assert!(Iri::new("no scheme here").is_err());
        assert!(Iri::new("http://example.org/onto#A").is_ok());
    }

    #[test]
    fn duplicate_axioms_are_kept_once() {
        let mut ontology = Ontology::new(iri("http://example.org/onto"));
        let axiom = Axiom::ClassAssertion {
            class: iri("http://example.org/onto#A"),
            individual: iri("http://example.org/onto#a1"),
        };
        assert!(!ontology.add_axiom(axiom.clone()));
        assert!(ontology.add_axiom(axiom));
        assert_eq!(ontology.len(), 1);
        assert_eq!(ontology.individuals().len(), 1);
    }

    #[test]
    fn object_property_targets_count_as_individuals() {
        let mut ontology = Ontology::new(iri("http://example.org/onto"));
        ontology.add_axiom(Axiom::ObjectPropertyAssertion {
            subject: iri("http://example.org/onto#a"),
            property: iri("http://example.org/onto#knows"),
            object: iri("http://example.org/onto#b"),
        });
        let individuals = ontology.individuals();
        assert_eq!(individuals.len(), 2);
        assert_eq!(individuals[0].fragment(), Some("a"));
        assert_eq!(individuals[1].fragment(), Some("b"));
    }
}
