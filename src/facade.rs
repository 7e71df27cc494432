use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::rc::Rc;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use seahash::SeaHasher;

use crate::error::{OwlError, Result};
use crate::ontology::{Iri, IriHasher};

// object identity keys and TypeId keys both go through seahash
pub type PtrHasher = BuildHasherDefault<SeaHasher>;
pub type TypeHasher = BuildHasherDefault<SeaHasher>;

// ------------- Value -------------
/// The dynamic value exchanged through property accessors.
///
/// Scalars carry their parsed native form; relationships carry an
/// [`Instance`] handle; multi-valued reads and staged writes travel as
/// [`Value::List`].
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(BigDecimal),
    Str(String),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Object(Instance),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Wraps an optional scalar, turning `None` into [`Value::Null`].
    pub fn from_option<T: Into<Value>>(value: Option<T>) -> Value {
        value.map(Into::into).unwrap_or(Value::Null)
    }

    /// The canonical lexical form of a scalar value. Calendar values render
    /// in their xsd lexical encodings (second precision for dateTime);
    /// everything else renders via its default text form. `None` for
    /// non-scalars.
    pub fn lexical_form(&self) -> Option<String> {
        match self {
            Value::Null | Value::Object(_) | Value::List(_) => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::UInt(u) => Some(u.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Decimal(d) => Some(d.to_string()),
            Value::Str(s) => Some(s.clone()),
            Value::DateTime(dt) => Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Value::Time(t) => Some(t.format("%H:%M:%S").to_string()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            Value::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<Instance> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Unpacks into elements: lists yield their elements, `Null` yields
    /// nothing, a single scalar or object yields itself.
    pub fn into_list(self) -> Vec<Value> {
        match self {
            Value::List(values) => values,
            Value::Null => Vec::new(),
            other => vec![other],
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}
impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(v as u64)
    }
}
impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
impl From<BigDecimal> for Value {
    fn from(v: BigDecimal) -> Self {
        Value::Decimal(v)
    }
}
impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}
impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}
impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}
impl From<Instance> for Value {
    fn from(v: Instance) -> Self {
        Value::Object(v)
    }
}
impl<T: Into<Value> + Clone> From<&[T]> for Value {
    fn from(values: &[T]) -> Self {
        Value::List(values.iter().cloned().map(Into::into).collect())
    }
}
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

// ------------- Instance -------------
/// The metadata provider: a type that can describe its ontology bindings.
///
/// This is the code-first equivalent of an annotation scan. Implementations
/// are usually written once per bound type (by hand or by a generator) and
/// return the full [`ClassDescriptor`] for it.
pub trait OwlDescribed: Any {
    fn describe() -> ClassDescriptor
    where
        Self: Sized;
}

/// A type-erased, shared handle to one native object.
///
/// Equality and hashing follow object identity (the shared allocation), not
/// value equality, which is exactly what the visited-object table needs:
/// two handles to the same object always collapse to one individual.
#[derive(Clone)]
pub struct Instance {
    inner: Rc<RefCell<dyn Any>>,
    type_id: TypeId,
    type_name: &'static str,
    describe: fn() -> ClassDescriptor,
}

impl Instance {
    pub fn new<T: OwlDescribed>(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            describe: T::describe,
        }
    }

    /// Identity key of the underlying object, stable for the lifetime of
    /// the handle.
    pub fn key(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The unqualified type name, used for fallback identifiers.
    pub fn short_type_name(&self) -> &'static str {
        self.type_name.rsplit("::").next().unwrap_or(self.type_name)
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub(crate) fn descriptor(&self) -> ClassDescriptor {
        (self.describe)()
    }

    /// Reads the underlying object as `T`.
    pub fn with<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let guard = self.inner.try_borrow().map_err(|_| OwlError::Access {
            message: format!("object {} is already mutably borrowed", self.type_name),
            property: None,
        })?;
        let value = guard.downcast_ref::<T>().ok_or_else(|| OwlError::Access {
            message: format!(
                "object is a {}, not a {}",
                self.type_name,
                std::any::type_name::<T>()
            ),
            property: None,
        })?;
        Ok(f(value))
    }

    /// Mutates the underlying object as `T`.
    pub fn with_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut guard = self.inner.try_borrow_mut().map_err(|_| OwlError::Access {
            message: format!("object {} is already borrowed", self.type_name),
            property: None,
        })?;
        let value = guard.downcast_mut::<T>().ok_or_else(|| OwlError::Access {
            message: format!(
                "object is a {}, not a {}",
                self.type_name,
                std::any::type_name::<T>()
            ),
            property: None,
        })?;
        Ok(f(value))
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl Eq for Instance {}
impl Hash for Instance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}
impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{:x}", self.short_type_name(), self.key())
    }
}

// ------------- Property descriptors -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// scalar-valued (individual -> literal)
    Data,
    /// relationship-valued (individual -> individual)
    Object,
}

type Getter = Box<dyn Fn(&Instance) -> Result<Value>>;
type Setter = Box<dyn Fn(&Instance, Value) -> Result<()>>;

/// Describes one property of a bound type: its IRI, multiplicity, declared
/// range IRIs and a typed getter/setter pair.
///
/// The setter contract differs by multiplicity: a functional property's
/// setter receives each scalar directly; a multi-valued property's setter
/// receives the accumulated [`Value::List`] exactly once, at commit time.
pub struct PropertyDescriptor {
    iri: Iri,
    kind: PropertyKind,
    functional: bool,
    ranges: Vec<Iri>,
    get: Getter,
    set: Setter,
}

impl PropertyDescriptor {
    fn wrap<T, G, S>(iri: Iri, kind: PropertyKind, get: G, set: S) -> Self
    where
        T: Any,
        G: Fn(&T) -> Value + 'static,
        S: Fn(&mut T, Value) + 'static,
    {
        Self {
            iri,
            kind,
            functional: false,
            ranges: Vec::new(),
            get: Box::new(move |instance| instance.with(|value: &T| get(value))),
            set: Box::new(move |instance, value| instance.with_mut(|object: &mut T| set(object, value))),
        }
    }

    pub fn data<T, G, S>(iri: Iri, get: G, set: S) -> Self
    where
        T: Any,
        G: Fn(&T) -> Value + 'static,
        S: Fn(&mut T, Value) + 'static,
    {
        Self::wrap(iri, PropertyKind::Data, get, set)
    }

    pub fn object<T, G, S>(iri: Iri, get: G, set: S) -> Self
    where
        T: Any,
        G: Fn(&T) -> Value + 'static,
        S: Fn(&mut T, Value) + 'static,
    {
        Self::wrap(iri, PropertyKind::Object, get, set)
    }

    /// Marks the property single-valued.
    pub fn functional(mut self) -> Self {
        self.functional = true;
        self
    }

    /// Adds an admissible datatype IRI (data) or class IRI (object).
    pub fn range(mut self, iri: Iri) -> Self {
        self.ranges.push(iri);
        self
    }
}

// ------------- Class descriptor -------------
/// The per-type metadata bundle handed over by [`OwlDescribed::describe`]:
/// class bindings, namespace, identifier access, constructor and property
/// descriptors. Consumed once to build the cached [`ClassFacade`].
pub struct ClassDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    base_iri: Iri,
    imports: Vec<Iri>,
    class_iri: Option<Iri>,
    implementation_of: Vec<Iri>,
    interfaces: Vec<Iri>,
    constructor: Box<dyn Fn() -> Instance>,
    id_get: Option<Box<dyn Fn(&Instance) -> Result<Option<String>>>>,
    id_set: Option<Box<dyn Fn(&Instance, &str) -> Result<()>>>,
    properties: Vec<PropertyDescriptor>,
}

impl ClassDescriptor {
    pub fn new<T: OwlDescribed + Default>(base_iri: Iri) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            base_iri,
            imports: Vec::new(),
            class_iri: None,
            implementation_of: Vec::new(),
            interfaces: Vec::new(),
            constructor: Box::new(|| Instance::new(T::default())),
            id_get: None,
            id_set: None,
            properties: Vec::new(),
        }
    }

    /// The direct ontology-class binding of the type itself.
    pub fn class(mut self, iri: Iri) -> Self {
        self.class_iri = Some(iri);
        self
    }

    /// Declares the type an implementation of a separately bound contract.
    pub fn implementation_of(mut self, iri: Iri) -> Self {
        self.implementation_of.push(iri);
        self
    }

    /// A directly implemented contract that carries its own class binding.
    pub fn interface(mut self, iri: Iri) -> Self {
        self.interfaces.push(iri);
        self
    }

    pub fn import(mut self, iri: Iri) -> Self {
        self.imports.push(iri);
        self
    }

    /// Binds the externally settable identifier field.
    pub fn id<T, G, S>(mut self, get: G, set: S) -> Self
    where
        T: Any,
        G: Fn(&T) -> Option<String> + 'static,
        S: Fn(&mut T, String) + 'static,
    {
        self.id_get = Some(Box::new(move |instance| instance.with(|object: &T| get(object))));
        self.id_set = Some(Box::new(move |instance, id| {
            let id = id.to_owned();
            instance.with_mut(|object: &mut T| set(object, id))
        }));
        self
    }

    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }
}

// ------------- Property accessor -------------
/// Runtime wrapper around a [`PropertyDescriptor`]: stateless reads, plus a
/// staging cache so multi-valued writes accumulated one assertion at a time
/// are materialized onto each instance exactly once at commit.
pub struct PropertyAccessor {
    iri: Iri,
    kind: PropertyKind,
    functional: bool,
    ranges: Vec<Iri>,
    get: Getter,
    set: Setter,
    staged: RefCell<HashMap<usize, (Instance, Vec<Value>), PtrHasher>>,
}

impl PropertyAccessor {
    fn new(descriptor: PropertyDescriptor) -> Self {
        Self {
            iri: descriptor.iri,
            kind: descriptor.kind,
            functional: descriptor.functional,
            ranges: descriptor.ranges,
            get: descriptor.get,
            set: descriptor.set,
            staged: RefCell::new(HashMap::default()),
        }
    }

    pub fn iri(&self) -> &Iri {
        &self.iri
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// `true` if this property holds at most one value per subject.
    pub fn functional(&self) -> bool {
        self.functional
    }

    pub fn ranges(&self) -> &[Iri] {
        &self.ranges
    }

    fn decorate(&self, error: OwlError) -> OwlError {
        match error {
            OwlError::Access { message, .. } => OwlError::Access {
                message,
                property: Some(self.iri.to_string()),
            },
            other => other,
        }
    }

    /// Reads the property value from an instance.
    pub fn value_of(&self, instance: &Instance) -> Result<Value> {
        (self.get)(instance).map_err(|e| self.decorate(e))
    }

    /// Sets a functional value immediately, or stages one element of a
    /// multi-valued property for the next [`PropertyAccessor::commit`].
    pub fn set_or_add(&self, instance: &Instance, value: Value) -> Result<()> {
        if self.functional {
            return (self.set)(instance, value).map_err(|e| self.decorate(e));
        }
        self.staged
            .borrow_mut()
            .entry(instance.key())
            .or_insert_with(|| (instance.clone(), Vec::new()))
            .1
            .push(value);
        Ok(())
    }

    /// Drops staged values without writing them. Staged state belongs to
    /// one run; after an aborted run it must not leak into the next.
    pub fn discard_staged(&self) {
        self.staged.borrow_mut().clear();
    }

    /// Flushes the staging cache: every instance with staged values gets
    /// one write with the accumulated list.
    pub fn commit(&self) -> Result<()> {
        let staged: Vec<(Instance, Vec<Value>)> =
            self.staged.borrow_mut().drain().map(|(_, entry)| entry).collect();
        for (instance, values) in staged {
            (self.set)(&instance, Value::List(values)).map_err(|e| self.decorate(e))?;
        }
        Ok(())
    }
}

impl fmt::Debug for PropertyAccessor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?} ({:?}{})", self.iri, self.kind, if self.functional { ", functional" } else { "" })
    }
}

// ------------- Class facade -------------
/// The cached per-type bundle both engines work against: class bindings,
/// namespace IRIs, identifier access, constructor and property accessors.
pub struct ClassFacade {
    type_id: TypeId,
    type_name: &'static str,
    base_iri: Iri,
    imports: Vec<Iri>,
    class_iri: Option<Iri>,
    implementation_of: Vec<Iri>,
    interfaces: Vec<Iri>,
    constructor: Box<dyn Fn() -> Instance>,
    id_get: Option<Box<dyn Fn(&Instance) -> Result<Option<String>>>>,
    id_set: Option<Box<dyn Fn(&Instance, &str) -> Result<()>>>,
    data: Vec<Rc<PropertyAccessor>>,
    object: Vec<Rc<PropertyAccessor>>,
    by_iri: HashMap<Iri, Rc<PropertyAccessor>, IriHasher>,
}

impl ClassFacade {
    pub fn new(descriptor: ClassDescriptor) -> Self {
        let mut data = Vec::new();
        let mut object = Vec::new();
        let mut by_iri: HashMap<Iri, Rc<PropertyAccessor>, IriHasher> = HashMap::default();
        for property in descriptor.properties {
            let accessor = Rc::new(PropertyAccessor::new(property));
            by_iri.insert(accessor.iri().clone(), Rc::clone(&accessor));
            match accessor.kind() {
                PropertyKind::Data => data.push(accessor),
                PropertyKind::Object => object.push(accessor),
            }
        }
        Self {
            type_id: descriptor.type_id,
            type_name: descriptor.type_name,
            base_iri: descriptor.base_iri,
            imports: descriptor.imports,
            class_iri: descriptor.class_iri,
            implementation_of: descriptor.implementation_of,
            interfaces: descriptor.interfaces,
            constructor: descriptor.constructor,
            id_get: descriptor.id_get,
            id_set: descriptor.id_set,
            data,
            object,
            by_iri,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn base_iri(&self) -> &Iri {
        &self.base_iri
    }

    pub fn imports(&self) -> &[Iri] {
        &self.imports
    }

    /// The direct class binding, if the type itself is bound.
    pub fn direct_class_iri(&self) -> Option<&Iri> {
        self.class_iri.as_ref()
    }

    /// Contract-class bindings declared via implementation-of.
    pub fn implementation_iris(&self) -> &[Iri] {
        &self.implementation_of
    }

    /// First-level implemented contracts carrying their own bindings.
    pub fn interface_iris(&self) -> &[Iri] {
        &self.interfaces
    }

    /// Every ontology class this type represents, direct binding first.
    pub fn class_iris(&self) -> Vec<Iri> {
        let mut iris = Vec::new();
        if let Some(iri) = &self.class_iri {
            iris.push(iri.clone());
        }
        for iri in self.implementation_of.iter().chain(self.interfaces.iter()) {
            if !iris.contains(iri) {
                iris.push(iri.clone());
            }
        }
        iris
    }

    pub fn handles_class(&self, iri: &Iri) -> bool {
        self.class_iris().contains(iri)
    }

    pub fn data_properties(&self) -> &[Rc<PropertyAccessor>] {
        &self.data
    }

    pub fn object_properties(&self) -> &[Rc<PropertyAccessor>] {
        &self.object
    }

    pub fn property(&self, iri: &Iri) -> Option<&Rc<PropertyAccessor>> {
        self.by_iri.get(iri)
    }

    pub fn has_property(&self, iri: &Iri) -> bool {
        self.by_iri.contains_key(iri)
    }

    pub fn has_settable_id(&self) -> bool {
        self.id_set.is_some()
    }

    /// The identifier of one object: the application-supplied identity if
    /// present and set, otherwise a deterministic per-object fallback.
    pub fn id_string(&self, instance: &Instance) -> Result<String> {
        if let Some(get) = &self.id_get
            && let Some(id) = get(instance)?
        {
            return Ok(id);
        }
        Ok(format!("{}_{:x}", instance.short_type_name(), instance.key()))
    }

    pub fn set_id(&self, instance: &Instance, id: &str) -> Result<()> {
        match &self.id_set {
            Some(set) => set(instance, id),
            None => Ok(()),
        }
    }

    /// Creates a fresh instance, assigning the identifier when the type
    /// supports one.
    pub fn new_instance(&self, id: &str) -> Result<Instance> {
        let instance = (self.constructor)();
        self.set_id(&instance, id)?;
        Ok(instance)
    }

    /// Flushes every accessor's staging cache.
    pub fn commit(&self) -> Result<()> {
        for accessor in self.data.iter().chain(self.object.iter()) {
            accessor.commit()?;
        }
        Ok(())
    }

    /// Drops every accessor's staged values without writing them.
    pub fn discard_staged(&self) {
        for accessor in self.data.iter().chain(self.object.iter()) {
            accessor.discard_staged();
        }
    }
}

impl fmt::Debug for ClassFacade {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ClassFacade({} -> {:?})", self.type_name, self.class_iris())
    }
}

// ------------- Facade keeper -------------
/// Owns one lazily created [`ClassFacade`] per bound type, shared for the
/// lifetime of an engine. Replacing an engine's type mapper clears it.
pub struct FacadeKeeper {
    kept: HashMap<TypeId, Rc<ClassFacade>, TypeHasher>,
}

impl FacadeKeeper {
    pub fn new() -> Self {
        Self {
            kept: HashMap::default(),
        }
    }

    /// Resolves the facade for an instance's type, creating and caching it
    /// on first use. Returns the facade and whether it was previously kept.
    pub fn keep(&mut self, instance: &Instance) -> (Rc<ClassFacade>, bool) {
        match self.kept.entry(instance.type_id()) {
            Entry::Occupied(e) => (Rc::clone(e.get()), true),
            Entry::Vacant(e) => {
                let facade = Rc::new(ClassFacade::new(instance.descriptor()));
                e.insert(Rc::clone(&facade));
                (facade, false)
            }
        }
    }

    /// Same as [`FacadeKeeper::keep`] but resolved from a type parameter.
    pub fn keep_type<T: OwlDescribed>(&mut self) -> (Rc<ClassFacade>, bool) {
        match self.kept.entry(TypeId::of::<T>()) {
            Entry::Occupied(e) => (Rc::clone(e.get()), true),
            Entry::Vacant(e) => {
                let facade = Rc::new(ClassFacade::new(T::describe()));
                e.insert(Rc::clone(&facade));
                (facade, false)
            }
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &Rc<ClassFacade>> {
        self.kept.values()
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }

    pub fn clear(&mut self) {
        self.kept.clear();
    }
}

impl Default for FacadeKeeper {
    fn default() -> Self {
        Self::new()
    }
}
