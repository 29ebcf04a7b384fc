use std::collections::HashMap;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use omniparser::{
    fingerprint, Asset, AssetStore, DedupConfig, DeduplicationOptimizer, Document, DocumentId,
    OriginalPath, StoreConfig,
};

/// `notes` notes with `refs` embeds each, drawn from `distinct` payloads.
fn corpus(
    notes: usize,
    refs: usize,
    distinct: usize,
) -> (Vec<Document>, HashMap<OriginalPath, Asset>) {
    let mut documents = Vec::with_capacity(notes);
    let mut assets = HashMap::with_capacity(notes * refs);
    for n in 0..notes {
        let doc_id = DocumentId::new(format!("note-{n:05}")).expect("valid id");
        let mut body = format!("# Note {n}\n\n");
        for r in 0..refs {
            let path = format!("export/{n}/img-{r}.png");
            body.push_str(&format!("Paragraph {r} with ![[{path}]] inline.\n"));
            let payload = ((n * refs + r) % distinct) as u32;
            let mut bytes = payload.to_le_bytes().to_vec();
            bytes.resize(4096, 0x5A);
            assets.insert(
                OriginalPath::new(&path),
                Asset::new(path.as_str(), doc_id.clone(), bytes),
            );
        }
        documents.push(Document::parse(doc_id, body));
    }
    (documents, assets)
}

/// Raw SHA-256 throughput across payload sizes
fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");
    for size in [1024usize, 64 * 1024, 1024 * 1024] {
        let bytes = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &bytes, |b, bytes| {
            b.iter(|| fingerprint(black_box(bytes)));
        });
    }
    group.finish();
}

/// Registration cost when most assets are duplicates
fn bench_register(c: &mut Criterion) {
    let (_, assets) = corpus(100, 10, 50);
    let assets: Vec<Asset> = assets.into_values().collect();

    let mut group = c.benchmark_group("store_register");
    group.throughput(Throughput::Elements(assets.len() as u64));
    group.bench_function("1000_assets_50_distinct", |b| {
        b.iter(|| {
            let store = AssetStore::new(StoreConfig::default()).expect("store");
            for asset in &assets {
                store.register(black_box(asset.clone())).expect("register");
            }
            store.len()
        });
    });
    group.finish();
}

/// Full optimize pass, parallel vs sequential
fn bench_optimize(c: &mut Criterion) {
    let (documents, assets) = corpus(500, 8, 200);
    let mut group = c.benchmark_group("optimize");
    group.sample_size(20);
    group.throughput(Throughput::Elements(documents.len() as u64));

    for (label, config) in [
        ("parallel", DedupConfig::default()),
        ("sequential", DedupConfig::default().sequential()),
    ] {
        let optimizer = DeduplicationOptimizer::new(config).expect("optimizer");
        group.bench_function(label, |b| {
            b.iter(|| {
                let store = AssetStore::new(StoreConfig::default()).expect("store");
                optimizer
                    .optimize(&store, black_box(documents.clone()), &assets)
                    .expect("optimize")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fingerprint, bench_register, bench_optimize);
criterion_main!(benches);
