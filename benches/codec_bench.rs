// In benches/codec_bench.rs

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bitframe::kernels::huffman::Codebook;
use bitframe::kernels::rle;
use bitframe::{compress, decompress, BitBuffer, CodebookScope, CodecConfig, Frame, FrameSet, SymbolStream};

// --- Mock data generation ---

/// A bright bar sweeping across a dark 1-bit background.
fn generate_sweep(width: usize, height: usize, count: usize) -> FrameSet {
    let frames = (0..count)
        .map(|t| {
            let mut pixels = vec![0u8; width * height];
            let bar = t % width;
            for y in 0..height {
                pixels[bar * height + y] = 1;
            }
            Frame::new(width, height, pixels).unwrap()
        })
        .collect();
    FrameSet::from_frames(frames).unwrap()
}

/// A deterministic, run-heavy 4-bit stream.
fn generate_runs(len: usize) -> SymbolStream {
    SymbolStream::from_values(4, (0..len).map(|i| ((i / 7) % 5) as u32)).unwrap()
}

// --- Benchmark suite ---

const BENCH_BITS: usize = 65536;

fn bench_bit_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("BitBuffer");
    group.throughput(criterion::Throughput::Bytes((BENCH_BITS / 8) as u64));

    group.bench_function("append 13-bit fields", |b| {
        b.iter(|| {
            let mut buffer = BitBuffer::new();
            for i in 0..BENCH_BITS / 13 {
                buffer.append(black_box(i as u32), 13).unwrap();
            }
            buffer
        })
    });

    let mut filled = BitBuffer::new();
    for i in 0..BENCH_BITS / 32 {
        filled.append((i as u32).wrapping_mul(2_654_435_761), 32).unwrap();
    }
    group.bench_function("get unaligned 27-bit fields", |b| {
        b.iter(|| {
            let mut acc = 0u32;
            let mut index = 3;
            while index + 27 <= filled.total_bits() {
                acc ^= filled.get(black_box(index), 27).unwrap();
                index += 27;
            }
            acc
        })
    });
    group.finish();
}

fn bench_kernels(c: &mut Criterion) {
    let stream = generate_runs(BENCH_BITS / 4);
    let encoded_rle = rle::encode(&stream, 4, 3).unwrap();
    let book = Codebook::from_streams([&encoded_rle]).unwrap();
    let encoded_run = book.encode_run(&encoded_rle).unwrap();

    let mut group = c.benchmark_group("Kernels");
    group.bench_function("rle encode", |b| {
        b.iter(|| black_box(rle::encode(black_box(&stream), 4, 3)))
    });
    group.bench_function("rle decode", |b| {
        b.iter(|| black_box(rle::decode(black_box(&encoded_rle), 4, 3)))
    });
    group.bench_function("huffman build codebook", |b| {
        b.iter(|| black_box(Codebook::from_streams([black_box(&encoded_rle)])))
    });
    group.bench_function("huffman encode run", |b| {
        b.iter(|| black_box(book.encode_run(black_box(&encoded_rle))))
    });
    group.bench_function("huffman decode run", |b| {
        b.iter(|| black_box(book.decode_run(black_box(&encoded_run), 0, 7)))
    });
    group.finish();
}

fn bench_sequence(c: &mut Criterion) {
    let frames = generate_sweep(64, 48, 16);
    let config = Arc::new(CodecConfig {
        pack_count: 4,
        delta: true,
        rle_count_bits: Some(4),
        huffman: Some(CodebookScope::Session),
        ..Default::default()
    });
    let compressed = compress(&frames, Arc::clone(&config)).unwrap();

    let mut group = c.benchmark_group("Sequence");
    group.bench_function("compress 16 frames 64x48", |b| {
        b.iter(|| black_box(compress(black_box(&frames), Arc::clone(&config))))
    });
    group.bench_function("decompress 16 frames 64x48", |b| {
        b.iter(|| black_box(decompress(black_box(&compressed))))
    });
    group.finish();
}

criterion_group!(benches, bench_bit_buffer, bench_kernels, bench_sequence);
criterion_main!(benches);
