// used for the canonical two-way mapping between xsd types and native kinds
use bimap::BiMap;

use std::collections::HashMap;
use std::fmt;

use crate::ontology::Iri;

/// the base IRI for all xsd built-in types
pub const XML_SCHEMA_BASE_IRI: &str = "http://www.w3.org/2001/XMLSchema";

/// the legacy alternate base IRI for all xsd built-in types
pub const XML_SCHEMA_BASE_IRI_ALT: &str = "http://www.w3.org/2001/XMLSchema-datatypes";

/// The closed enumeration of XML Schema built-in datatypes.
///
/// Every type has two namespaces: the common one under
/// [`XML_SCHEMA_BASE_IRI`] and the alternate one under
/// [`XML_SCHEMA_BASE_IRI_ALT`]. Both resolve to the same variant through
/// [`XsdType::from_iri`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum XsdType {
    // boolean
    Boolean,
    // date and time
    DateTime,
    Date,
    Time,
    GYear,
    GDay,
    GMonth,
    GYearMonth,
    GMonthDay,
    Duration,
    // numbers
    Decimal,
    Float,
    Double,
    // integer widths
    Int,
    Short,
    Byte,
    UnsignedShort,
    UnsignedByte,
    Long,
    Integer,
    NegativeInteger,
    NonPositiveInteger,
    NonNegativeInteger,
    UnsignedLong,
    UnsignedInt,
    PositiveInteger,
    // string family
    String,
    NormalizedString,
    Token,
    Language,
    Name,
    NCName,
    Id,
    IdRef,
    IdRefs,
    Entity,
    Entities,
    NmToken,
    NmTokens,
    AnyUri,
    QName,
    Notation,
}

impl XsdType {
    /// The fragment naming this type in both xsd namespaces.
    pub fn fragment(&self) -> &'static str {
        match self {
            XsdType::Boolean => "boolean",
            XsdType::DateTime => "dateTime",
            XsdType::Date => "date",
            XsdType::Time => "time",
            XsdType::GYear => "gYear",
            XsdType::GDay => "gDay",
            XsdType::GMonth => "gMonth",
            XsdType::GYearMonth => "gYearMonth",
            XsdType::GMonthDay => "gMonthDay",
            XsdType::Duration => "duration",
            XsdType::Decimal => "decimal",
            XsdType::Float => "float",
            XsdType::Double => "double",
            XsdType::Int => "int",
            XsdType::Short => "short",
            XsdType::Byte => "byte",
            XsdType::UnsignedShort => "unsignedShort",
            XsdType::UnsignedByte => "unsignedByte",
            XsdType::Long => "long",
            XsdType::Integer => "integer",
            XsdType::NegativeInteger => "negativeInteger",
            XsdType::NonPositiveInteger => "nonPositiveInteger",
            XsdType::NonNegativeInteger => "nonNegativeInteger",
            XsdType::UnsignedLong => "unsignedLong",
            XsdType::UnsignedInt => "unsignedInt",
            XsdType::PositiveInteger => "positiveInteger",
            XsdType::String => "string",
            XsdType::NormalizedString => "normalizedString",
            XsdType::Token => "token",
            XsdType::Language => "language",
            XsdType::Name => "Name",
            XsdType::NCName => "NCName",
            XsdType::Id => "ID",
            XsdType::IdRef => "IDREF",
            XsdType::IdRefs => "IDREFS",
            XsdType::Entity => "ENTITY",
            XsdType::Entities => "ENTITIES",
            XsdType::NmToken => "NMTOKEN",
            XsdType::NmTokens => "NMTOKENS",
            XsdType::AnyUri => "anyURI",
            XsdType::QName => "QName",
            XsdType::Notation => "NOTATION",
        }
    }

    fn from_fragment(fragment: &str) -> Option<XsdType> {
        Some(match fragment {
            "boolean" => XsdType::Boolean,
            "dateTime" => XsdType::DateTime,
            "date" => XsdType::Date,
            "time" => XsdType::Time,
            "gYear" => XsdType::GYear,
            "gDay" => XsdType::GDay,
            "gMonth" => XsdType::GMonth,
            "gYearMonth" => XsdType::GYearMonth,
            "gMonthDay" => XsdType::GMonthDay,
            "duration" => XsdType::Duration,
            "decimal" => XsdType::Decimal,
            "float" => XsdType::Float,
            "double" => XsdType::Double,
            "int" => XsdType::Int,
            "short" => XsdType::Short,
            "byte" => XsdType::Byte,
            "unsignedShort" => XsdType::UnsignedShort,
            "unsignedByte" => XsdType::UnsignedByte,
            "long" => XsdType::Long,
            "integer" => XsdType::Integer,
            "negativeInteger" => XsdType::NegativeInteger,
            "nonPositiveInteger" => XsdType::NonPositiveInteger,
            "nonNegativeInteger" => XsdType::NonNegativeInteger,
            "unsignedLong" => XsdType::UnsignedLong,
            "unsignedInt" => XsdType::UnsignedInt,
            "positiveInteger" => XsdType::PositiveInteger,
            "string" => XsdType::String,
            "normalizedString" => XsdType::NormalizedString,
            "token" => XsdType::Token,
            "language" => XsdType::Language,
            "Name" => XsdType::Name,
            "NCName" => XsdType::NCName,
            "ID" => XsdType::Id,
            "IDREF" => XsdType::IdRef,
            "IDREFS" => XsdType::IdRefs,
            "ENTITY" => XsdType::Entity,
            "ENTITIES" => XsdType::Entities,
            "NMTOKEN" => XsdType::NmToken,
            "NMTOKENS" => XsdType::NmTokens,
            "anyURI" => XsdType::AnyUri,
            "QName" => XsdType::QName,
            "NOTATION" => XsdType::Notation,
            _ => return None,
        })
    }

    /// IRI of the built-in type in the common namespace.
    pub fn iri(&self) -> Iri {
        Iri::trusted(format!("{}#{}", XML_SCHEMA_BASE_IRI, self.fragment()))
    }

    /// IRI of the built-in type in the alternate namespace.
    pub fn alt_iri(&self) -> Iri {
        Iri::trusted(format!("{}#{}", XML_SCHEMA_BASE_IRI_ALT, self.fragment()))
    }

    /// Resolves an IRI in either namespace to its built-in type.
    /// Unknown IRIs yield `None`, never an error, so that callers
    /// can fall back to a string encoding.
    pub fn from_iri(iri: &Iri) -> Option<XsdType> {
        let text = iri.as_str();
        let fragment = text
            .strip_prefix(XML_SCHEMA_BASE_IRI_ALT)
            .or_else(|| text.strip_prefix(XML_SCHEMA_BASE_IRI))?
            .strip_prefix('#')?;
        XsdType::from_fragment(fragment)
    }
}

impl fmt::Display for XsdType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}#{}", XML_SCHEMA_BASE_IRI, self.fragment())
    }
}

/// The native scalar kinds a literal can be read into or printed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Decimal,
    DateTime,
    Date,
    Time,
    Str,
}

/// Maps xsd built-in types to native scalar kinds and vice versa.
///
/// One canonical xsd type is kept per native kind (the pair used when
/// printing), while the many-to-one families (string-likes, the big-integer
/// types) resolve through an alias table. The mapper is immutable once
/// handed to an engine; to extend datatype coverage build a new mapper and
/// inject it wholesale.
#[derive(Debug, Clone)]
pub struct XsdTypeMapper {
    canonical: BiMap<XsdType, NativeKind>,
    aliases: HashMap<XsdType, NativeKind>,
}

impl XsdTypeMapper {
    pub fn new() -> Self {
        let mut mapper = Self {
            canonical: BiMap::new(),
            aliases: HashMap::new(),
        };
        mapper.insert(XsdType::Boolean, NativeKind::Bool);
        mapper.insert(XsdType::Byte, NativeKind::I8);
        mapper.insert(XsdType::Short, NativeKind::I16);
        mapper.insert(XsdType::Int, NativeKind::I32);
        mapper.insert(XsdType::Long, NativeKind::I64);
        mapper.insert(XsdType::UnsignedByte, NativeKind::U8);
        mapper.insert(XsdType::UnsignedShort, NativeKind::U16);
        mapper.insert(XsdType::UnsignedInt, NativeKind::U32);
        mapper.insert(XsdType::UnsignedLong, NativeKind::U64);
        mapper.insert(XsdType::Float, NativeKind::F32);
        mapper.insert(XsdType::Double, NativeKind::F64);
        mapper.insert(XsdType::Decimal, NativeKind::Decimal);
        mapper.insert(XsdType::DateTime, NativeKind::DateTime);
        mapper.insert(XsdType::Date, NativeKind::Date);
        mapper.insert(XsdType::Time, NativeKind::Time);
        mapper.insert(XsdType::String, NativeKind::Str);
        // the unbounded integer types parse into the widest native width
        mapper.insert_alias(XsdType::Integer, NativeKind::I64);
        mapper.insert_alias(XsdType::NegativeInteger, NativeKind::I64);
        mapper.insert_alias(XsdType::NonPositiveInteger, NativeKind::I64);
        mapper.insert_alias(XsdType::NonNegativeInteger, NativeKind::U64);
        mapper.insert_alias(XsdType::PositiveInteger, NativeKind::U64);
        // the string family and the lexical-only types keep their text form
        for xsd in [
            XsdType::NormalizedString,
            XsdType::Token,
            XsdType::Language,
            XsdType::Name,
            XsdType::NCName,
            XsdType::Id,
            XsdType::IdRef,
            XsdType::IdRefs,
            XsdType::Entity,
            XsdType::Entities,
            XsdType::NmToken,
            XsdType::NmTokens,
            XsdType::AnyUri,
            XsdType::QName,
            XsdType::Notation,
            XsdType::Duration,
        ] {
            mapper.insert_alias(xsd, NativeKind::Str);
        }
        mapper
    }

    /// Declares `xsd` the canonical type for `kind` (and vice versa).
    pub fn insert(&mut self, xsd: XsdType, kind: NativeKind) {
        self.canonical.insert(xsd, kind);
    }

    /// Declares a non-canonical mapping; used for families where several
    /// xsd types share one native kind.
    pub fn insert_alias(&mut self, xsd: XsdType, kind: NativeKind) {
        self.aliases.insert(xsd, kind);
    }

    /// The native kind literals of this xsd type parse into, if any.
    pub fn native_for(&self, xsd: XsdType) -> Option<NativeKind> {
        self.canonical
            .get_by_left(&xsd)
            .or_else(|| self.aliases.get(&xsd))
            .copied()
    }

    /// Resolves a datatype IRI (either xsd namespace) straight to a native
    /// kind. `None` means the caller should treat the literal as a string.
    pub fn native_for_iri(&self, iri: &Iri) -> Option<NativeKind> {
        XsdType::from_iri(iri).and_then(|xsd| self.native_for(xsd))
    }

    /// The canonical xsd type for a native kind.
    pub fn xsd_for(&self, kind: NativeKind) -> Option<XsdType> {
        self.canonical.get_by_right(&kind).copied()
    }
}

impl Default for XsdTypeMapper {
    fn default() -> Self {
        Self::new()
    }
}
