use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use ircode::formats::nec::NecCode;
use ircode::formats::rc5::{Rc5Code, Rc5Packet};
use std::collections::BTreeMap;

fn criterion_benchmark(c: &mut Criterion) {
    let nec = NecCode::new(
        38000,
        1,
        BTreeMap::new(),
        vec![vec![0x20, 0xdf, 0x10, 0xef]],
    )
    .unwrap();
    let nec_raw = nec.to_raw().unwrap();

    let mut nec_group = c.benchmark_group("nec");
    nec_group.throughput(Throughput::Elements(1));
    nec_group.bench_function("encode", |bencher| {
        bencher.iter(|| nec.to_raw().unwrap());
    });
    nec_group.bench_function("decode", |bencher| {
        bencher.iter(|| NecCode::from_code(&nec_raw).unwrap());
    });
    nec_group.finish();

    let rc5 = Rc5Code::new(38000, 1, BTreeMap::new(), vec![Rc5Packet::new(5, 35).unwrap()]).unwrap();
    let rc5_raw = rc5.to_raw(None).unwrap();

    let mut rc5_group = c.benchmark_group("rc5");
    rc5_group.throughput(Throughput::Elements(1));
    rc5_group.bench_function("encode", |bencher| {
        bencher.iter(|| rc5.to_raw(None).unwrap());
    });
    rc5_group.bench_function("decode", |bencher| {
        bencher.iter(|| Rc5Code::from_code(&rc5_raw).unwrap());
    });
    rc5_group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
