//! # vgsplay Performance Benchmarks
//!
//! Benchmarks for the parts of a session that scale with library size.
//!
//! ## Benchmark Categories
//!
//! - **Catalog**: Parsing song indexes and interning games
//! - **Ratings**: Aggregating play history
//! - **Selection**: Shuffling and filtering the catalog
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Run specific benchmark group
//! cargo bench selection
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::hint::black_box;
use std::path::Path;
use vgsplay::catalog::{parse_descriptors, Catalog, SongDescriptor};
use vgsplay::rating::{InMemoryRatingRepository, Play, PlayedSong, RatingSource};
use vgsplay::selector::{shuffled_indices, Filters, InMemorySongRepository, SongRepository};

/// 20 games of 50 songs each
fn create_descriptors(count: usize) -> Vec<SongDescriptor> {
    (1..=count)
        .map(|i| SongDescriptor {
            path: format!("game{:02}/song{i:04}.brstm", (i - 1) / 50 + 1),
            title: format!("Song {i:04}"),
            game_title: format!("Game {}", (i - 1) / 50 + 1),
            duration: 30.0 + (i % 180) as f64,
            loop_start: 1_000_000,
            loop_end: 25_000_000,
            size: 4096,
            error: i % 97 == 0,
        })
        .collect()
}

/// Every third song rated, a few plays each.
fn create_ratings(descriptors: &[SongDescriptor]) -> InMemoryRatingRepository {
    let played_songs = descriptors
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 3 == 0)
        .map(|(i, descriptor)| PlayedSong {
            path: descriptor.path.clone(),
            plays: (0..4)
                .map(|n| Play {
                    timestamp: 1_700_000_000 + n,
                    rating: (i as i32 + n as i32) % 6,
                })
                .collect(),
        })
        .collect();
    InMemoryRatingRepository::from_played_songs(played_songs)
}

fn benchmark_catalog(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog");
    let descriptors = create_descriptors(1000);
    let json = serde_json::to_string(
        &descriptors
            .iter()
            .map(|d| {
                serde_json::json!({
                    "path": d.path, "title": d.title, "game_title": d.game_title,
                    "duration": d.duration, "loop_start": d.loop_start, "loop_end": d.loop_end,
                    "size": d.size, "error": d.error,
                })
            })
            .collect::<Vec<_>>(),
    )
    .expect("serializable descriptors");

    group.bench_function("parse_1000_descriptors", |b| {
        b.iter(|| black_box(parse_descriptors(json.as_bytes()).expect("valid index")))
    });

    group.bench_function("build_1000_song_catalog", |b| {
        b.iter_batched(
            || descriptors.clone(),
            |descriptors| black_box(Catalog::from_descriptors(Path::new("/music"), descriptors)),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn benchmark_ratings(c: &mut Criterion) {
    let mut group = c.benchmark_group("ratings");
    let descriptors = create_descriptors(1000);
    let ratings = create_ratings(&descriptors);

    group.bench_function("rating_lookup_all", |b| {
        b.iter(|| {
            descriptors
                .iter()
                .filter_map(|d| ratings.rating(black_box(&d.path)))
                .count()
        })
    });

    group.bench_function("serialize_history", |b| {
        b.iter(|| {
            let mut out = Vec::new();
            ratings.write_json(&mut out).expect("in-memory write");
            black_box(out)
        })
    });

    group.finish();
}

fn benchmark_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection");

    for size in [100, 1000, 10_000] {
        group.bench_with_input(BenchmarkId::new("shuffled_indices", size), &size, |b, &n| {
            b.iter(|| black_box(shuffled_indices(n, black_box(42))))
        });
    }

    let descriptors = create_descriptors(1000);
    let catalog = Catalog::from_descriptors(Path::new("/music"), descriptors.clone());
    let ratings = create_ratings(&descriptors);

    let filters = [
        ("no_filters", Filters::default()),
        (
            "min_rating",
            Filters {
                min_rating: 3.0,
                only_has_rating: true,
                ..Default::default()
            },
        ),
        (
            "game_title",
            Filters {
                game_title_contains: "Game 7".to_string(),
                min_duration: 60,
                ..Default::default()
            },
        ),
    ];

    for (name, filters) in &filters {
        group.bench_function(BenchmarkId::new("random_song", name), |b| {
            b.iter_batched(
                || InMemorySongRepository::new(catalog.clone(), ratings.clone()),
                |mut songs| black_box(songs.random_song(filters, 7).expect("in-memory selection")),
                BatchSize::SmallInput,
            )
        });
    }

    group.bench_function("drain_1000_songs", |b| {
        b.iter_batched(
            || InMemorySongRepository::new(catalog.clone(), ratings.clone()),
            |mut songs| {
                let mut seed = 0;
                while let Ok(Some(track)) = songs.random_song(&Filters::default(), seed) {
                    black_box(track);
                    seed += 1;
                }
                seed
            },
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, benchmark_catalog, benchmark_ratings, benchmark_selection);

criterion_main!(benches);
