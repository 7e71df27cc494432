use owlbind::facade::{ClassDescriptor, Instance, OwlDescribed, PropertyDescriptor, Value};
use owlbind::marshal::Marshaller;
use owlbind::ontology::{Axiom, Iri, Literal, Ontology};
use owlbind::unmarshal::UnMarshaller;
use owlbind::xsd::{NativeKind, XsdType, XsdTypeMapper};

const BASE: &str = "http://example.org/instruments";

fn base() -> Iri {
    Iri::new(BASE).unwrap()
}

#[derive(Default)]
struct Gauge {
    id: Option<String>,
    reading: Option<i64>,
    month_day: Option<String>,
}

impl OwlDescribed for Gauge {
    fn describe() -> ClassDescriptor {
        let base = base();
        ClassDescriptor::new::<Gauge>(base.clone())
            .class(base.with_fragment("Gauge"))
            .id(|g: &Gauge| g.id.clone(), |g: &mut Gauge, id| g.id = Some(id))
            .property(
                // no declared range, the datatype comes from the mapper
                PropertyDescriptor::data::<Gauge, _, _>(
                    base.with_fragment("reading"),
                    |g| Value::from_option(g.reading),
                    |g, v| g.reading = v.as_i64(),
                )
                .functional(),
            )
            .property(
                PropertyDescriptor::data::<Gauge, _, _>(
                    base.with_fragment("monthDay"),
                    |g| Value::from_option(g.month_day.clone()),
                    |g, v| g.month_day = v.into_string(),
                )
                .functional(),
            )
    }
}

fn gauge(reading: i64) -> Instance {
    Instance::new(Gauge {
        id: Some("dial".to_owned()),
        reading: Some(reading),
        ..Gauge::default()
    })
}

fn reading_datatype(ontology: &Ontology) -> Iri {
    let reading = base().with_fragment("reading");
    ontology
        .axioms()
        .find_map(|axiom| match axiom {
            Axiom::DataPropertyAssertion { property, value, .. } if *property == reading => {
                Some(value.datatype.clone())
            }
            _ => None,
        })
        .expect("the reading is asserted")
}

#[test]
fn a_replacement_mapper_changes_the_inferred_datatype() {
    let mut marshaller = Marshaller::new();
    let ontology = marshaller
        .marshal_new(&[gauge(7)], "http://example.org/panel", true)
        .expect("marshal ok");
    assert_eq!(reading_datatype(&ontology), XsdType::Long.iri());

    // rebind the canonical i64 pairing, invalidating cached facades
    let mut mapper = XsdTypeMapper::new();
    mapper.insert(XsdType::Integer, NativeKind::I64);
    marshaller.set_type_mapper(mapper);
    let ontology = marshaller
        .marshal_new(&[gauge(7)], "http://example.org/panel", true)
        .expect("marshal ok");
    assert_eq!(reading_datatype(&ontology), XsdType::Integer.iri());
}

#[test]
fn an_extended_mapper_parses_datatypes_the_default_drops() {
    let mut ontology = Ontology::new(Iri::new("http://example.org/panel").unwrap());
    let individual = ontology.iri().with_fragment("dial");
    ontology.add_axiom(Axiom::ClassAssertion {
        class: base().with_fragment("Gauge"),
        individual: individual.clone(),
    });
    ontology.add_axiom(Axiom::DataPropertyAssertion {
        subject: individual,
        property: base().with_fragment("monthDay"),
        value: Literal::new("--06-15".to_owned(), XsdType::GMonthDay.iri()),
    });

    // the stock mapper has no native kind for gMonthDay, the value is dropped
    let mut plain = UnMarshaller::new();
    plain.register::<Gauge>();
    let objects = plain.unmarshal(&ontology).expect("unmarshal ok");
    assert_eq!(objects[0].with(|g: &Gauge| g.month_day.clone()).unwrap(), None);

    // an injected mapper can widen coverage without touching the engine
    let mut mapper = XsdTypeMapper::new();
    mapper.insert_alias(XsdType::GMonthDay, NativeKind::Str);
    let mut extended = UnMarshaller::with_type_mapper(mapper);
    extended.register::<Gauge>();
    let objects = extended.unmarshal(&ontology).expect("unmarshal ok");
    assert_eq!(
        objects[0].with(|g: &Gauge| g.month_day.clone()).unwrap(),
        Some("--06-15".to_owned())
    );
}

#[test]
fn replacing_the_mapper_drops_registrations() {
    let mut ontology = Ontology::new(Iri::new("http://example.org/panel").unwrap());
    ontology.add_axiom(Axiom::ClassAssertion {
        class: base().with_fragment("Gauge"),
        individual: ontology.iri().with_fragment("dial"),
    });

    let mut unmarshaller = UnMarshaller::new();
    unmarshaller.register::<Gauge>();
    assert!(unmarshaller.is_registered(&base().with_fragment("Gauge")));
    assert_eq!(unmarshaller.unmarshal(&ontology).expect("unmarshal ok").len(), 1);

    unmarshaller.set_type_mapper(XsdTypeMapper::new());
    assert!(
        !unmarshaller.is_registered(&base().with_fragment("Gauge")),
        "registrations do not outlive the mapper they were built with"
    );
    assert_eq!(
        unmarshaller.unmarshal(&ontology).expect("unmarshal ok").len(),
        0,
        "nothing is registered until the caller registers again"
    );

    unmarshaller.register::<Gauge>();
    assert_eq!(unmarshaller.unmarshal(&ontology).expect("unmarshal ok").len(), 1);
}
