use owlbind::facade::{ClassDescriptor, Instance, OwlDescribed, PropertyDescriptor, Value};
use owlbind::marshal::Marshaller;
use owlbind::ontology::{Axiom, Iri};
use owlbind::unmarshal::UnMarshaller;
use owlbind::xsd::XsdType;

const BASE: &str = "http://example.org/bucket";

fn base() -> Iri {
    Iri::new(BASE).unwrap()
}

#[derive(Default)]
struct Bucket {
    id: Option<String>,
    material: Option<String>,
    engravings: Vec<String>,
    stones: Vec<Instance>,
}

impl OwlDescribed for Bucket {
    fn describe() -> ClassDescriptor {
        let base = base();
        ClassDescriptor::new::<Bucket>(base.clone())
            .class(base.with_fragment("Bucket"))
            .id(|b: &Bucket| b.id.clone(), |b: &mut Bucket, id| b.id = Some(id))
            .property(
                PropertyDescriptor::data::<Bucket, _, _>(
                    base.with_fragment("material"),
                    |b| Value::from_option(b.material.clone()),
                    |b, v| b.material = v.into_string(),
                )
                .functional()
                .range(XsdType::String.iri()),
            )
            .property(PropertyDescriptor::data::<Bucket, _, _>(
                base.with_fragment("engraving"),
                |b| Value::from(b.engravings.clone()),
                |b, v| {
                    b.engravings = v.into_list().into_iter().filter_map(Value::into_string).collect()
                },
            ))
            .property(PropertyDescriptor::object::<Bucket, _, _>(
                base.with_fragment("holds"),
                |b| Value::List(b.stones.iter().cloned().map(Value::Object).collect()),
                |b, v| {
                    b.stones = v.into_list().into_iter().filter_map(Value::into_object).collect()
                },
            ))
    }
}

#[derive(Default)]
struct Stone {
    id: Option<String>,
    weight: Option<i64>,
}

impl OwlDescribed for Stone {
    fn describe() -> ClassDescriptor {
        let base = base();
        ClassDescriptor::new::<Stone>(base.clone())
            .class(base.with_fragment("Stone"))
            .id(|s: &Stone| s.id.clone(), |s: &mut Stone, id| s.id = Some(id))
            .property(
                PropertyDescriptor::data::<Stone, _, _>(
                    base.with_fragment("weight"),
                    |s| Value::from_option(s.weight),
                    |s, v| s.weight = v.as_i64(),
                )
                .functional(),
            )
    }
}

fn full_bucket() -> Instance {
    Instance::new(Bucket {
        id: Some("pail".to_owned()),
        material: Some("tin".to_owned()),
        engravings: vec!["alpha".to_owned(), "omega".to_owned()],
        stones: vec![
            Instance::new(Stone {
                id: Some("flint".to_owned()),
                weight: Some(5),
            }),
            Instance::new(Stone {
                id: Some("granite".to_owned()),
                weight: Some(7),
            }),
        ],
    })
}

#[test]
fn bucket_of_stones_round_trips() {
    let mut marshaller = Marshaller::new();
    let ontology = marshaller
        .marshal_new(&[full_bucket()], "http://example.org/shed", true)
        .expect("marshal ok");

    let mut unmarshaller = UnMarshaller::new();
    unmarshaller.register::<Bucket>();
    unmarshaller.register::<Stone>();
    let objects = unmarshaller.unmarshal(&ontology).expect("unmarshal ok");
    assert_eq!(objects.len(), 3, "one bucket and two stones");
    assert!(
        ontology.imports().contains(&base()),
        "the model namespace is imported into the destination"
    );

    let bucket = objects.iter().find(|o| o.is::<Bucket>()).expect("a bucket");
    assert_eq!(
        bucket.with(|b: &Bucket| b.material.clone()).unwrap(),
        Some("tin".to_owned())
    );
    // element order within a multi-valued property is not guaranteed
    let mut engravings = bucket.with(|b: &Bucket| b.engravings.clone()).unwrap();
    engravings.sort();
    assert_eq!(engravings, vec!["alpha".to_owned(), "omega".to_owned()]);

    let stones = bucket.with(|b: &Bucket| b.stones.clone()).unwrap();
    assert_eq!(stones.len(), 2, "both stones wired back");
    let mut weights: Vec<i64> = stones
        .iter()
        .map(|s| s.with(|s: &Stone| s.weight).unwrap().unwrap())
        .collect();
    weights.sort();
    assert_eq!(weights, vec![5, 7], "integer weights identical after the round trip");
}

#[test]
fn multi_valued_scalar_emits_one_assertion_per_element() {
    let mut marshaller = Marshaller::new();
    let ontology = marshaller
        .marshal_new(&[full_bucket()], "http://example.org/shed", true)
        .expect("marshal ok");

    let engraving = base().with_fragment("engraving");
    let assertions: Vec<_> = ontology
        .axioms()
        .filter_map(|axiom| match axiom {
            Axiom::DataPropertyAssertion { subject, property, .. } if *property == engraving => {
                Some(subject.clone())
            }
            _ => None,
        })
        .collect();
    assert_eq!(assertions.len(), 2, "two engravings, two assertions");
    assert_eq!(assertions[0], assertions[1], "same subject for both");
}

#[test]
fn functional_scalar_emits_a_single_assertion() {
    let mut marshaller = Marshaller::new();
    let ontology = marshaller
        .marshal_new(&[full_bucket()], "http://example.org/shed", true)
        .expect("marshal ok");

    let material = base().with_fragment("material");
    let count = ontology
        .axioms()
        .filter(|axiom| {
            matches!(axiom, Axiom::DataPropertyAssertion { property, .. } if *property == material)
        })
        .count();
    assert_eq!(count, 1);
}

#[test]
fn shared_stone_becomes_one_individual() {
    let shared = Instance::new(Stone {
        id: Some("flint".to_owned()),
        weight: Some(5),
    });
    let bucket = Instance::new(Bucket {
        id: Some("pail".to_owned()),
        material: None,
        engravings: Vec::new(),
        stones: vec![shared.clone(), shared],
    });
    let mut marshaller = Marshaller::new();
    let ontology = marshaller
        .marshal_new(&[bucket], "http://example.org/shed", true)
        .expect("marshal ok");

    let stone_class = base().with_fragment("Stone");
    let stone_assertions = ontology
        .axioms()
        .filter(|axiom| {
            matches!(axiom, Axiom::ClassAssertion { class, .. } if *class == stone_class)
        })
        .count();
    assert_eq!(stone_assertions, 1, "the same object must not become two individuals");
}
