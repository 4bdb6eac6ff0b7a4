//! Throughput benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use stopwatch_relay::core::parser::{decode_line, parse_line};

fn parser_benchmark(c: &mut Criterion) {
    let valid: &[u8] = b"TIME:1532\r\n";
    let noise: &[u8] = b"BUTTON PRESSED, timer armed\r\n";
    let garbled: &[u8] = b"\xffTIME:\xfe15\x80\r\n";

    let mut group = c.benchmark_group("parser");
    group.throughput(Throughput::Bytes(valid.len() as u64));

    group.bench_function("time_line", |b| {
        b.iter(|| {
            let line = decode_line(black_box(valid));
            black_box(parse_line(&line))
        })
    });

    group.bench_function("rejected_line", |b| {
        b.iter(|| {
            let line = decode_line(black_box(noise));
            black_box(parse_line(&line))
        })
    });

    group.bench_function("garbled_line", |b| {
        b.iter(|| {
            let line = decode_line(black_box(garbled));
            black_box(parse_line(&line))
        })
    });

    group.finish();
}

fn encode_benchmark(c: &mut Criterion) {
    let event = stopwatch_relay::Event::now(1532);

    let mut group = c.benchmark_group("event");
    group.bench_function("to_json", |b| b.iter(|| black_box(&event).to_json()));
    group.finish();
}

criterion_group!(benches, parser_benchmark, encode_benchmark);
criterion_main!(benches);
