//! Owlbind – bidirectional marshalling between Rust object graphs and
//! OWL-style ontologies.
//!
//! A bound type describes itself once (see [`facade::OwlDescribed`]): which
//! ontology classes it represents, how its identifier is read and written,
//! and a descriptor per property with its IRI, multiplicity and admissible
//! datatypes. From that description the engines do the rest:
//!
//! * The [`marshal::Marshaller`] walks a graph of objects, turns each
//!   distinct object into one ontology individual and emits class, data
//!   property and object property assertions. Identity is tracked per run,
//!   so cycles terminate and shared objects appear once. Relationship
//!   emission runs off an explicit worklist, so arbitrarily deep chains do
//!   not grow the call stack.
//! * The [`unmarshal::UnMarshaller`] is the dual: registered classes are
//!   instantiated per individual, scalars are applied immediately and
//!   relationships are wired in a second pass, which makes the result
//!   independent of the order individuals appear in.
//!
//! ## Modules
//! * [`facade`] – The self-description trait, descriptors, the cached
//!   per-type [`facade::ClassFacade`] and the erased [`facade::Instance`]
//!   handle the engines exchange.
//! * [`marshal`] – Objects to axioms.
//! * [`unmarshal`] – Axioms to objects, plus the class registry.
//! * [`xsd`] – The closed set of built-in scalar datatypes and the
//!   replaceable mapping to native kinds.
//! * [`ontology`] – The in-memory axiom model: IRIs, literals, axioms and
//!   the deduplicated, insertion-ordered [`ontology::Ontology`], with JSON
//!   save/load.
//! * [`error`] – The [`error::OwlError`] taxonomy.
//!
//! ## Quick start
//! ```
//! use owlbind::facade::{ClassDescriptor, Instance, OwlDescribed, PropertyDescriptor, Value};
//! use owlbind::marshal::Marshaller;
//! use owlbind::ontology::Iri;
//! use owlbind::unmarshal::UnMarshaller;
//!
//! #[derive(Default)]
//! struct Stone {
//!     id: Option<String>,
//!     weight: Option<i64>,
//! }
//!
//! impl OwlDescribed for Stone {
//!     fn describe() -> ClassDescriptor {
//!         let base = Iri::new("http://example.org/quarry").unwrap();
//!         ClassDescriptor::new::<Stone>(base.clone())
//!             .class(base.with_fragment("Stone"))
//!             .id(|s: &Stone| s.id.clone(), |s: &mut Stone, id| s.id = Some(id))
//!             .property(
//!                 PropertyDescriptor::data::<Stone, _, _>(
//!                     base.with_fragment("weight"),
//!                     |s| Value::from_option(s.weight),
//!                     |s, v| s.weight = v.as_i64(),
//!                 )
//!                 .functional(),
//!             )
//!     }
//! }
//!
//! let stone = Instance::new(Stone { id: Some("flint".into()), weight: Some(3) });
//! let mut marshaller = Marshaller::new();
//! let ontology = marshaller
//!     .marshal_new(&[stone], "http://example.org/stones", true)
//!     .unwrap();
//!
//! let mut unmarshaller = UnMarshaller::new();
//! unmarshaller.register::<Stone>();
//! let objects = unmarshaller.unmarshal(&ontology).unwrap();
//! assert_eq!(objects.len(), 1);
//! assert_eq!(objects[0].with(|s: &Stone| s.weight).unwrap(), Some(3));
//! ```

pub mod error;
pub mod facade;
pub mod marshal;
pub mod ontology;
pub mod unmarshal;
pub mod xsd;
