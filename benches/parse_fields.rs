use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use neo_loader::conversion::parse_float;
use neo_loader::csv_source::row::orbit_from_row;
use neo_loader::csv_source::RawRow;
use neo_loader::orb_elem::{complete_epoch, derive_missing_elements};
use neo_loader::time::{mpc_packed_to_date, parse_date};

const FLOATS: [&str; 8] = [
    "1.458045729",
    " 0.2228 ",
    "1,0e-3",
    "-",
    "NaN",
    "6.9e+01",
    "",
    "not a number",
];

const DATES: [&str; 6] = [
    "2024-06-01",
    "2024-06-01 12:30:00",
    "2024/06/01",
    "20240601",
    "01/06/2024",
    "garbage",
];

const PACKED: [&str; 5] = ["K2467", "J9611", "K24AV", "I0001", "Z0000"];

fn bench_scalars(c: &mut Criterion) {
    c.bench_function("parse_float/mixed", |b| {
        b.iter(|| {
            for field in FLOATS {
                black_box(parse_float(black_box(field)));
            }
        })
    });

    c.bench_function("parse_date/mixed", |b| {
        b.iter(|| {
            for field in DATES {
                black_box(parse_date(black_box(field)));
            }
        })
    });

    c.bench_function("mpc_packed_to_date", |b| {
        b.iter(|| {
            for field in PACKED {
                black_box(mpc_packed_to_date(black_box(field)));
            }
        })
    });
}

/// Field mapping and element completion of one Eros-like row
fn bench_orbit_row(c: &mut Criterion) {
    let row = RawRow::from_pairs(
        2,
        [
            ("id", "a0000433"),
            ("spkid", "2000433"),
            ("epoch_mpc", "K2467"),
            ("e", "0.2228"),
            ("a", "1.458"),
            ("i", "10.83"),
            ("om", "304.3"),
            ("w", "178.9"),
            ("ma", "310.6"),
            ("n", "0.5597"),
            ("rms", "0.29"),
            ("class", "AMO"),
        ],
    );

    c.bench_function("orbit_from_row/complete", |b| {
        b.iter_batched(
            || row.clone(),
            |row| {
                let mut orbit = orbit_from_row(&row, "JPL 659");
                complete_epoch(&mut orbit, row.get("epoch_mpc"));
                derive_missing_elements(&mut orbit);
                black_box(orbit)
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_scalars, bench_orbit_row);
criterion_main!(benches);
