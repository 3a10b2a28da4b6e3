use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fulltext_inverted::codec::{Coder, Golomb, Void};

fn encode_gaps(coder: &dyn Coder, gaps: &[u32]) -> Vec<u32> {
    let mut buf = vec![0u32; 4096];
    let mut offset = 0usize;
    let mut old_value = 0u32;
    coder.append_gaps(&mut old_value, gaps, &mut buf, &mut offset);
    buf
}

fn decode_gaps(coder: &dyn Coder, buf: &[u32], count: usize) -> Vec<u32> {
    let mut offset = 0usize;
    let total_bits = buf.len() * 32;
    coder.get_gaps(0, count, buf, total_bits, &mut offset)
}

fn bench_golomb(c: &mut Criterion) {
    let gaps: Vec<u32> = (0..1000).map(|i| 1 + (i % 7)).collect();
    let coder = Golomb::for_average_gap(2);

    c.bench_function("golomb_encode_1000_gaps", |b| {
        b.iter(|| encode_gaps(&coder, black_box(&gaps)))
    });

    let buf = encode_gaps(&coder, &gaps);
    c.bench_function("golomb_decode_1000_gaps", |b| {
        b.iter(|| decode_gaps(&coder, black_box(&buf), gaps.len()))
    });
}

fn bench_void(c: &mut Criterion) {
    let gaps: Vec<u32> = (0..1000).map(|i| 1 + (i % 7)).collect();
    let coder = Void;

    c.bench_function("void_encode_1000_gaps", |b| {
        b.iter(|| encode_gaps(&coder, black_box(&gaps)))
    });

    let buf = encode_gaps(&coder, &gaps);
    c.bench_function("void_decode_1000_gaps", |b| {
        b.iter(|| decode_gaps(&coder, black_box(&buf), gaps.len()))
    });
}

criterion_group!(benches, bench_golomb, bench_void);
criterion_main!(benches);
