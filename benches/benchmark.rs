use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use owlbind::facade::{ClassDescriptor, Instance, OwlDescribed, PropertyDescriptor, Value};
use owlbind::marshal::Marshaller;
use owlbind::ontology::Iri;
use owlbind::unmarshal::UnMarshaller;

const BASE: &str = "http://example.org/abacus";

#[derive(Default)]
struct Bead {
    id: Option<String>,
    position: Option<i64>,
    next: Option<Instance>,
}

impl OwlDescribed for Bead {
    fn describe() -> ClassDescriptor {
        let base = Iri::new(BASE).unwrap();
        ClassDescriptor::new::<Bead>(base.clone())
            .class(base.with_fragment("Bead"))
            .id(|b: &Bead| b.id.clone(), |b: &mut Bead, id| b.id = Some(id))
            .property(
                PropertyDescriptor::data::<Bead, _, _>(
                    base.with_fragment("position"),
                    |b| Value::from_option(b.position),
                    |b, v| b.position = v.as_i64(),
                )
                .functional(),
            )
            .property(
                PropertyDescriptor::object::<Bead, _, _>(
                    base.with_fragment("next"),
                    |b| Value::from_option(b.next.clone()),
                    |b, v| b.next = v.into_object(),
                )
                .functional(),
            )
    }
}

fn chain(length: usize) -> Instance {
    let mut next: Option<Instance> = None;
    for i in (0..length).rev() {
        next = Some(Instance::new(Bead {
            id: Some(format!("bead{}", i)),
            position: Some(i as i64),
            next: next.take(),
        }));
    }
    next.unwrap()
}

fn marshal_deep_chain(c: &mut Criterion) {
    c.bench_function("marshal a chain of 1000 linked objects", |b| {
        b.iter(|| {
            let mut marshaller = Marshaller::new();
            let ontology = marshaller
                .marshal_new(&[chain(1000)], "http://example.org/rack", true)
                .unwrap();
            black_box(ontology.len())
        })
    });
}

fn round_trip_deep_chain(c: &mut Criterion) {
    let mut marshaller = Marshaller::new();
    let ontology = marshaller
        .marshal_new(&[chain(1000)], "http://example.org/rack", true)
        .unwrap();
    c.bench_function("unmarshal a chain of 1000 individuals", |b| {
        b.iter(|| {
            let mut unmarshaller = UnMarshaller::new();
            unmarshaller.register::<Bead>();
            black_box(unmarshaller.unmarshal(&ontology).unwrap().len())
        })
    });
}

criterion_group!(benches, marshal_deep_chain, round_trip_deep_chain);
criterion_main!(benches);
