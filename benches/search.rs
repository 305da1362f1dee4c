//! Benchmarks for picker search.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use fedimoji::catalog::Catalog;
use fedimoji::custom::CustomEmojiEntry;
use fedimoji::search::EmojiIndex;

fn custom_pool() -> Vec<CustomEmojiEntry> {
    (0..500)
        .map(|i| CustomEmojiEntry::new(format!("blob_{i}"), format!("/e/blob_{i}.png")))
        .collect()
}

fn bench_search(c: &mut Criterion) {
    let index = EmojiIndex::new(Catalog::global());
    let pool = custom_pool();
    index.add_custom_to_pool(&pool);

    c.bench_function("search_keystroke", |b| {
        b.iter(|| index.search(black_box("hea"), 5, Some(pool.as_slice())))
    });
}

fn bench_re_register(c: &mut Criterion) {
    let index = EmojiIndex::new(Catalog::global());
    let pool = custom_pool();
    c.bench_function("add_custom_to_pool", |b| {
        b.iter(|| index.add_custom_to_pool(black_box(&pool)))
    });
}

criterion_group!(benches, bench_search, bench_re_register);
criterion_main!(benches);
