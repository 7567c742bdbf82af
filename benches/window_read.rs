use std::{fs::File, io::Write};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rasterstack::{
    source::{FormatRegistry, GRID_STACK_MAGIC},
    stack::{HandlePolicy, Stack},
    window::{Indexer, Selector, Window},
};

fn write_grid(path: &std::path::Path, size: u64) {
    let header = serde_json::json!({
        "dimensions": [
            { "name": "y", "coordinates": { "range": { "start": 0, "step": 1, "len": size } } },
            { "name": "x", "coordinates": { "range": { "start": 0, "step": 1, "len": size } } }
        ],
        "layers": [
            { "name": "a", "dimensions": ["y", "x"], "data_type": "float32", "offset": 0 }
        ]
    });
    let header = serde_json::to_vec(&header).unwrap();
    let mut file = File::create(path).unwrap();
    file.write_all(GRID_STACK_MAGIC).unwrap();
    file.write_all(&(header.len() as u64).to_le_bytes()).unwrap();
    file.write_all(&header).unwrap();
    file.write_all(&vec![0u8; (size * size * 4) as usize]).unwrap();
}

fn window_read(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let registry = FormatRegistry::with_defaults();
    let mut group = c.benchmark_group("window_read");
    for size in [256u64, 1024u64, 2048u64] {
        let path = dir.path().join(format!("grid_{size}.gsf"));
        write_grid(&path, size);
        let half = usize::try_from(size / 2).unwrap();
        let window = Window::named([
            ("y", Selector::from(half / 2..half / 2 + half)),
            ("x", Selector::from(half / 2..half / 2 + half)),
        ]);
        group.throughput(Throughput::Bytes((half * half * 4) as u64));
        for handle_policy in [HandlePolicy::OpenPerRead, HandlePolicy::KeepOpen] {
            let stack = Stack::open_with_policy(&path, &registry, handle_policy)
                .unwrap()
                .with_window(Some(window.clone()));
            group.bench_with_input(
                BenchmarkId::new(handle_policy.to_string(), size),
                &stack,
                |b, stack| {
                    b.iter(|| stack.read_layer("a", &Indexer::all()).unwrap());
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, window_read);
criterion_main!(benches);
