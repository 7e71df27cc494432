use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::error::{OwlError, Result};
use crate::facade::{FacadeKeeper, Instance, PropertyAccessor, PtrHasher, Value};
use crate::ontology::{Axiom, Iri, Literal, Ontology};
use crate::xsd::{NativeKind, XsdType, XsdTypeMapper};

// the tables owned by one marshal invocation
struct Run {
    // object identity -> individual IRI
    visited: HashMap<usize, Iri, PtrHasher>,
    // objects whose relationships still have to be emitted, stack order
    pending: Vec<Instance>,
}

// ------------- Marshaller -------------
/// Serializes object graphs into ontology axioms.
///
/// Each distinct object becomes one individual, tracked by identity in a
/// per-run visited table so that cyclic graphs terminate and shared objects
/// are emitted once. Scalar properties are asserted as soon as an object is
/// resolved; relationship assertions are deferred onto a pending stack and
/// emitted as targets become resolvable, which keeps deep chains off the
/// call stack.
///
/// The facade cache is shared across runs of one marshaller and cleared
/// when the type mapper is replaced.
pub struct Marshaller {
    mapper: XsdTypeMapper,
    keeper: FacadeKeeper,
}

impl Marshaller {
    pub fn new() -> Self {
        Self::with_type_mapper(XsdTypeMapper::new())
    }

    pub fn with_type_mapper(mapper: XsdTypeMapper) -> Self {
        Self {
            mapper,
            keeper: FacadeKeeper::new(),
        }
    }

    /// Replaces the type mapper wholesale. Cached facades may hold datatype
    /// decisions derived from the old mapper, so the cache is dropped too.
    pub fn set_type_mapper(&mut self, mapper: XsdTypeMapper) {
        self.mapper = mapper;
        self.keeper.clear();
    }

    /// Creates an ontology named by `ontology_iri` and marshals `objects`
    /// into it. The IRI is validated before anything is mutated.
    pub fn marshal_new(
        &mut self,
        objects: &[Instance],
        ontology_iri: &str,
        deep: bool,
    ) -> Result<Ontology> {
        let iri = Iri::new(ontology_iri)?;
        let mut ontology = Ontology::new(iri);
        self.marshal(objects, &mut ontology, deep)?;
        Ok(ontology)
    }

    /// Marshals `objects` into an existing ontology, adding axioms in place.
    ///
    /// When `deep` is false, relationship targets are referenced by
    /// identifier and class assertion only; their own properties are not
    /// serialized and they are not traversed further.
    pub fn marshal(
        &mut self,
        objects: &[Instance],
        ontology: &mut Ontology,
        deep: bool,
    ) -> Result<()> {
        debug!(roots = objects.len(), deep, ontology = %ontology.iri(), "marshalling");
        let mut run = Run {
            visited: HashMap::default(),
            pending: Vec::new(),
        };
        // roots always get their relationships processed, even shallowly
        for object in objects {
            self.resolve(object, ontology, &mut run, true)?;
            run.pending.push(object.clone());
        }
        self.drain(ontology, &mut run, deep)
    }

    /// Resolves an object to its individual IRI, creating the individual on
    /// first sight: class assertions plus, when `full`, every scalar
    /// property assertion. Returns the IRI and whether the object was newly
    /// discovered.
    fn resolve(
        &mut self,
        object: &Instance,
        ontology: &mut Ontology,
        run: &mut Run,
        full: bool,
    ) -> Result<(Iri, bool)> {
        if let Some(iri) = run.visited.get(&object.key()) {
            return Ok((iri.clone(), false));
        }
        let (facade, _) = self.keeper.keep(object);
        // declare the type's namespace and classes in the destination
        if facade.base_iri() != ontology.iri() {
            ontology.add_axiom(Axiom::Import(facade.base_iri().clone()));
        }
        for import in facade.imports() {
            ontology.add_axiom(Axiom::Import(import.clone()));
        }
        let classes = facade.class_iris();
        for class in &classes {
            ontology.add_axiom(Axiom::ClassDeclaration(class.clone()));
        }

        let id = facade.id_string(object)?;
        let individual = ontology.iri().with_fragment(&id);
        trace!(individual = %individual, object = ?object, "new individual");
        run.visited.insert(object.key(), individual.clone());

        for class in classes {
            ontology.add_axiom(Axiom::ClassAssertion {
                class,
                individual: individual.clone(),
            });
        }
        if full {
            for accessor in facade.data_properties() {
                let value = accessor.value_of(object)?;
                for element in value.into_list() {
                    if element.is_null() {
                        continue;
                    }
                    let literal = self.render_literal(accessor, element)?;
                    ontology.add_axiom(Axiom::DataPropertyAssertion {
                        subject: individual.clone(),
                        property: accessor.iri().clone(),
                        value: literal,
                    });
                }
            }
        }
        Ok((individual, true))
    }

    // relationship emission, most recently discovered object first
    fn drain(&mut self, ontology: &mut Ontology, run: &mut Run, deep: bool) -> Result<()> {
        while let Some(object) = run.pending.pop() {
            let (facade, _) = self.keeper.keep(&object);
            let subject = match run.visited.get(&object.key()) {
                Some(iri) => iri.clone(),
                None => {
                    return Err(OwlError::Marshal(format!(
                        "pending object {:?} was never resolved",
                        object
                    )));
                }
            };
            for accessor in facade.object_properties() {
                let value = accessor.value_of(&object)?;
                for element in value.into_list() {
                    match element {
                        Value::Null => {}
                        Value::Object(target) => {
                            let (target_iri, newly) =
                                self.resolve(&target, ontology, run, deep)?;
                            if deep && newly {
                                run.pending.push(target);
                            }
                            ontology.add_axiom(Axiom::ObjectPropertyAssertion {
                                subject: subject.clone(),
                                property: accessor.iri().clone(),
                                object: target_iri,
                            });
                        }
                        other => {
                            return Err(OwlError::Marshal(format!(
                                "object property {} yielded a scalar value {:?}",
                                accessor.iri(),
                                other
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn render_literal(&self, accessor: &PropertyAccessor, value: Value) -> Result<Literal> {
        let lexical = value.lexical_form().ok_or_else(|| {
            OwlError::Marshal(format!(
                "data property {} yielded a non-scalar value {:?}",
                accessor.iri(),
                value
            ))
        })?;
        Ok(Literal::new(lexical, self.datatype_for(accessor, &value)))
    }

    /// The datatype IRI to stamp on a literal: the single declared range if
    /// there is exactly one, otherwise inferred from the value itself, with
    /// xsd:string as the fallback of last resort.
    fn datatype_for(&self, accessor: &PropertyAccessor, value: &Value) -> Iri {
        match accessor.ranges() {
            [range] => range.clone(),
            [] => match value_kind(value).and_then(|kind| self.mapper.xsd_for(kind)) {
                Some(xsd) => xsd.iri(),
                None => {
                    warn!(
                        property = %accessor.iri(),
                        "no datatype could be determined, encoding as xsd:string"
                    );
                    XsdType::String.iri()
                }
            },
            ranges => {
                warn!(
                    property = %accessor.iri(),
                    ranges = ranges.len(),
                    "scalar property declares several admissible datatypes, encoding as xsd:string"
                );
                XsdType::String.iri()
            }
        }
    }
}

impl Default for Marshaller {
    fn default() -> Self {
        Self::new()
    }
}

fn value_kind(value: &Value) -> Option<NativeKind> {
    match value {
        Value::Bool(_) => Some(NativeKind::Bool),
        Value::Int(_) => Some(NativeKind::I64),
        Value::UInt(_) => Some(NativeKind::U64),
        Value::Float(_) => Some(NativeKind::F64),
        Value::Decimal(_) => Some(NativeKind::Decimal),
        Value::DateTime(_) => Some(NativeKind::DateTime),
        Value::Date(_) => Some(NativeKind::Date),
        Value::Time(_) => Some(NativeKind::Time),
        Value::Str(_) => Some(NativeKind::Str),
        Value::Null | Value::Object(_) | Value::List(_) => None,
    }
}
