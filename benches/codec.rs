//! Codec throughput benchmarks.
//!
//! Measures encode and decode rates for:
//! - Primitive values (identifier framing)
//! - Structured values (field-by-field codecs)
//! - Collections (per-element engine recursion)

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tagwire::buffer::Buffer;
use tagwire::{Engine, SerializationError, TypeHandle, Wireable};

#[derive(Debug, Clone, PartialEq)]
struct Record {
    id: u64,
    name: String,
    score: f64,
}

impl Wireable for Record {
    fn type_handle() -> TypeHandle {
        TypeHandle::of::<Self>().with_id(1000)
    }

    fn write_fields(&self, out: &mut Buffer, _engine: &mut Engine) -> Result<(), SerializationError> {
        out.write_u64(self.id)?;
        out.write_str(&self.name)?;
        out.write_f64(self.score)?;
        Ok(())
    }

    fn read_fields(input: &mut Buffer, _engine: &mut Engine) -> Result<Self, SerializationError> {
        Ok(Self {
            id: input.read_u64()?,
            name: input.read_str()?,
            score: input.read_f64()?,
        })
    }
}

fn bench_engine() -> Engine {
    let mut engine = Engine::new();
    engine.registry_mut().register::<Record>().unwrap();
    engine
}

fn bench_primitive_round_trip(c: &mut Criterion) {
    let mut engine = bench_engine();
    let mut group = c.benchmark_group("primitive");
    group.throughput(Throughput::Elements(1));
    group.bench_function("i64_round_trip", |b| {
        b.iter(|| {
            let copied = engine.copy(black_box(&123_456_789i64)).unwrap();
            black_box(copied)
        });
    });
    group.finish();
}

fn bench_record_round_trip(c: &mut Criterion) {
    let mut engine = bench_engine();
    let record = Record {
        id: 42,
        name: "benchmark-record".to_string(),
        score: 0.875,
    };
    let mut group = c.benchmark_group("record");
    group.throughput(Throughput::Elements(1));
    group.bench_function("round_trip", |b| {
        b.iter(|| {
            let copied = engine.copy(black_box(&record)).unwrap();
            black_box(copied)
        });
    });
    group.finish();
}

fn bench_sequence_round_trip(c: &mut Criterion) {
    let mut engine = bench_engine();
    let values: Vec<String> = (0..100).map(|i| format!("item-{i}")).collect();
    let mut group = c.benchmark_group("sequence");
    group.throughput(Throughput::Elements(values.len() as u64));
    group.bench_function("strings_x100", |b| {
        b.iter(|| {
            let copied = engine.copy(black_box(&values)).unwrap();
            black_box(copied)
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_primitive_round_trip,
    bench_record_round_trip,
    bench_sequence_round_trip
);
criterion_main!(benches);
