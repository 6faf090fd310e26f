use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use verivoice::audio::{RawAudio, Waveform, CANONICAL_SAMPLE_RATE};
use verivoice::config::AppConfig;
use verivoice::features::FeatureExtractor;
use verivoice::pipeline::DetectionPipeline;
use verivoice::test_fixtures::{generate_speechlike_signal, wav_bytes};

fn benchmark_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let pipeline = DetectionPipeline::new(&AppConfig::default());

    for secs in [1.0f32, 3.0, 10.0] {
        let samples = generate_speechlike_signal(secs, CANONICAL_SAMPLE_RATE);
        let bytes = wav_bytes(&samples, CANONICAL_SAMPLE_RATE, 1);

        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("classify", format!("{secs}s")),
            &bytes,
            |b, bytes| {
                b.iter(|| {
                    let raw = RawAudio::with_hint(bytes.clone(), "wav");
                    black_box(pipeline.run(raw))
                })
            },
        );
    }

    group.finish();
}

fn benchmark_feature_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("features");
    let extractor = FeatureExtractor::new(CANONICAL_SAMPLE_RATE, 0.01);
    let waveform = Waveform::new(
        generate_speechlike_signal(3.0, CANONICAL_SAMPLE_RATE),
        CANONICAL_SAMPLE_RATE,
    );

    group.bench_function("lightweight_3s", |b| {
        b.iter(|| black_box(extractor.lightweight(&waveform).unwrap()))
    });
    group.bench_function("comprehensive_3s", |b| {
        b.iter(|| black_box(extractor.comprehensive(&waveform).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, benchmark_end_to_end, benchmark_feature_extraction);
criterion_main!(benches);
