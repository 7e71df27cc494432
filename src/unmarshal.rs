use std::any::TypeId;
use std::collections::HashMap;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::facade::{ClassFacade, FacadeKeeper, Instance, OwlDescribed, PropertyKind, TypeHasher, Value};
use crate::ontology::{Iri, IriHasher, Literal, Ontology};
use crate::xsd::{NativeKind, XsdTypeMapper};

// ------------- Registry aggregator -------------
/// A type that registers a whole family of bound types in one call,
/// typically a factory whose creation methods return them.
pub trait OwlRegistry {
    /// Registers every bound type this registry knows about and returns the
    /// total number of class bindings added.
    fn register(unmarshaller: &mut UnMarshaller) -> usize;
}

// a relationship read during the instantiation pass, wired later
struct DeferredEdge {
    target: Iri,
    facade: Rc<ClassFacade>,
    property: Iri,
    owner: Instance,
}

// ------------- UnMarshaller -------------
/// Reconstructs object graphs from ontology axioms.
///
/// Types are registered up front; each registration binds the type's
/// ontology classes to its facade. Unmarshalling then runs in two passes so
/// that relationships may reference individuals that appear later in the
/// ontology: first every individual with a registered class is instantiated
/// and its scalars applied, then the deferred relationship edges are
/// resolved against the finished table. Individuals without a registered
/// class are skipped with a warning, never an error.
pub struct UnMarshaller {
    mapper: XsdTypeMapper,
    keeper: FacadeKeeper,
    // ontology class -> facade to instantiate; later registrations win
    registry: HashMap<Iri, Rc<ClassFacade>, IriHasher>,
}

impl UnMarshaller {
    pub fn new() -> Self {
        Self::with_type_mapper(XsdTypeMapper::new())
    }

    pub fn with_type_mapper(mapper: XsdTypeMapper) -> Self {
        Self {
            mapper,
            keeper: FacadeKeeper::new(),
            registry: HashMap::default(),
        }
    }

    /// Replaces the type mapper wholesale. The facade cache and the class
    /// registry built on top of it are dropped, so types must be registered
    /// again afterwards.
    pub fn set_type_mapper(&mut self, mapper: XsdTypeMapper) {
        self.mapper = mapper;
        self.keeper.clear();
        self.registry.clear();
    }

    /// Registers a bound type for instantiation and returns the number of
    /// class bindings added: one for a direct class binding, one per
    /// declared contract implementation, one per directly implemented bound
    /// contract.
    pub fn register<T: OwlDescribed>(&mut self) -> usize {
        let (facade, _) = self.keeper.keep_type::<T>();
        let mut count = 0;
        if let Some(class) = facade.direct_class_iri() {
            count += self.bind(class.clone(), Rc::clone(&facade));
        }
        for class in facade.implementation_iris() {
            count += self.bind(class.clone(), Rc::clone(&facade));
        }
        for class in facade.interface_iris() {
            count += self.bind(class.clone(), Rc::clone(&facade));
        }
        debug!(type_name = facade.type_name(), bindings = count, "registered");
        count
    }

    /// Registers every type known to a registry aggregator.
    pub fn register_registry<R: OwlRegistry>(&mut self) -> usize {
        R::register(self)
    }

    fn bind(&mut self, class: Iri, facade: Rc<ClassFacade>) -> usize {
        if let Some(previous) = self.registry.insert(class.clone(), facade) {
            trace!(class = %class, previous = previous.type_name(), "rebinding class");
        }
        1
    }

    pub fn is_registered(&self, class: &Iri) -> bool {
        self.registry.contains_key(class)
    }

    /// Instantiates every individual of the ontology whose asserted class
    /// is registered, returning the objects in instantiation order.
    pub fn unmarshal(&mut self, ontology: &Ontology) -> Result<Vec<Instance>> {
        debug!(individuals = ontology.individuals().len(), ontology = %ontology.iri(), "unmarshalling");
        // staged writes are per-run state; a run aborted before its commit
        // pass must not leak values into this one
        for facade in self.keeper.values() {
            facade.discard_staged();
        }
        // individual IRI -> instance, None marking seen-but-unresolvable
        let mut table: HashMap<Iri, Option<Instance>, IriHasher> = HashMap::default();
        let mut order: Vec<Iri> = Vec::new();
        let mut deferred: Vec<DeferredEdge> = Vec::new();
        let mut touched: HashMap<TypeId, Rc<ClassFacade>, TypeHasher> = HashMap::default();

        // instantiation pass
        for individual in ontology.individuals() {
            if table.contains_key(individual) {
                continue;
            }
            let Some(facade) = self.facade_for(ontology, individual) else {
                table.insert(individual.clone(), None);
                continue;
            };
            let id = individual.fragment().unwrap_or(individual.as_str());
            let instance = facade.new_instance(id)?;

            for (property, literal) in ontology.data_values_of(individual) {
                let Some(accessor) = facade.property(&property) else {
                    continue;
                };
                if accessor.kind() != PropertyKind::Data {
                    continue;
                }
                match self.parse_literal(literal) {
                    Some(value) => accessor.set_or_add(&instance, value)?,
                    None => {
                        trace!(
                            individual = %individual,
                            property = %property,
                            datatype = %literal.datatype,
                            "dropping literal with no parseable native form"
                        );
                    }
                }
            }
            for (property, target) in ontology.object_values_of(individual) {
                if !facade.has_property(&property) {
                    continue;
                }
                deferred.push(DeferredEdge {
                    target,
                    facade: Rc::clone(&facade),
                    property,
                    owner: instance.clone(),
                });
            }

            touched.insert(facade.type_id(), Rc::clone(&facade));
            table.insert(individual.clone(), Some(instance));
            order.push(individual.clone());
        }

        // resolution pass
        for edge in deferred {
            let Some(Some(target)) = table.get(&edge.target) else {
                trace!(target = %edge.target, property = %edge.property, "relationship target unresolved, leaving link absent");
                continue;
            };
            if let Some(accessor) = edge.facade.property(&edge.property) {
                accessor.set_or_add(&edge.owner, Value::Object(target.clone()))?;
            }
        }

        // commit pass, once per facade touched in this run
        for facade in touched.values() {
            facade.commit()?;
        }

        Ok(order
            .into_iter()
            .filter_map(|individual| table.remove(&individual).flatten())
            .collect())
    }

    /// The registered facade for an individual, picked from its asserted
    /// classes. With several registered matches the last asserted one wins.
    fn facade_for(&self, ontology: &Ontology, individual: &Iri) -> Option<Rc<ClassFacade>> {
        let mut matched: Option<Rc<ClassFacade>> = None;
        let mut matches = 0;
        for class in ontology.classes_of(individual) {
            if let Some(facade) = self.registry.get(&class) {
                matched = Some(Rc::clone(facade));
                matches += 1;
            }
        }
        match matched {
            Some(facade) => {
                if matches > 1 {
                    warn!(
                        individual = %individual,
                        matches,
                        resolved = facade.type_name(),
                        "several registered classes asserted, keeping the last"
                    );
                }
                Some(facade)
            }
            None => {
                warn!(individual = %individual, "no registered class asserted, skipping");
                None
            }
        }
    }

    /// Parses a literal into the native value its datatype maps to. `None`
    /// for unknown datatypes, unmapped kinds and lexical forms that do not
    /// parse; the caller skips those per value.
    fn parse_literal(&self, literal: &Literal) -> Option<Value> {
        let kind = self.mapper.native_for_iri(&literal.datatype)?;
        let lexical = literal.lexical.as_str();
        match kind {
            NativeKind::Bool => lexical.parse::<bool>().ok().map(Value::Bool),
            NativeKind::I8 | NativeKind::I16 | NativeKind::I32 | NativeKind::I64 => {
                lexical.parse::<i64>().ok().map(Value::Int)
            }
            NativeKind::U8 | NativeKind::U16 | NativeKind::U32 | NativeKind::U64 => {
                lexical.parse::<u64>().ok().map(Value::UInt)
            }
            NativeKind::F32 | NativeKind::F64 => lexical.parse::<f64>().ok().map(Value::Float),
            NativeKind::Decimal => lexical.parse::<BigDecimal>().ok().map(Value::Decimal),
            NativeKind::DateTime => {
                NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(Value::DateTime)
            }
            NativeKind::Date => NaiveDate::parse_from_str(lexical, "%Y-%m-%d")
                .ok()
                .map(Value::Date),
            NativeKind::Time => NaiveTime::parse_from_str(lexical, "%H:%M:%S%.f")
                .ok()
                .map(Value::Time),
            NativeKind::Str => Some(Value::Str(lexical.to_owned())),
        }
    }
}

impl Default for UnMarshaller {
    fn default() -> Self {
        Self::new()
    }
}
