use criterion::{Criterion, black_box, criterion_group, criterion_main};

use moldraw::{LayoutOptions, depict_smiles};

const BUTANE: &str = "CCCC";
const CYCLOHEXANE: &str = "C1CCCCC1";
const CAFFEINE: &str = "Cn1cnc2c1c(=O)n(C)c(=O)n2C";
const NORBORNANE: &str = "C1CC2CC1CC2";
const IBUPROFEN: &str = "CC(C)Cc1ccc(cc1)C(C)C(=O)O";

fn bench_depict(c: &mut Criterion) {
    let opts = LayoutOptions::default();
    let mut group = c.benchmark_group("depict");

    group.bench_function("butane", |b| {
        b.iter(|| black_box(depict_smiles(black_box(BUTANE), &opts).unwrap()))
    });
    group.bench_function("cyclohexane", |b| {
        b.iter(|| black_box(depict_smiles(black_box(CYCLOHEXANE), &opts).unwrap()))
    });
    group.bench_function("caffeine", |b| {
        b.iter(|| black_box(depict_smiles(black_box(CAFFEINE), &opts).unwrap()))
    });
    group.bench_function("norbornane", |b| {
        b.iter(|| black_box(depict_smiles(black_box(NORBORNANE), &opts).unwrap()))
    });
    group.bench_function("ibuprofen", |b| {
        b.iter(|| black_box(depict_smiles(black_box(IBUPROFEN), &opts).unwrap()))
    });

    group.finish();
}

fn bench_rings(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_perception");

    group.bench_function("norbornane", |b| {
        b.iter(|| {
            let tree = moldraw::smiles::parse(black_box(NORBORNANE)).unwrap();
            let mut graph = moldraw::MolGraph::from_tree(&tree).unwrap();
            black_box(moldraw::RingModel::analyze(&mut graph))
        })
    });
    group.bench_function("caffeine", |b| {
        b.iter(|| {
            let tree = moldraw::smiles::parse(black_box(CAFFEINE)).unwrap();
            let mut graph = moldraw::MolGraph::from_tree(&tree).unwrap();
            black_box(moldraw::RingModel::analyze(&mut graph))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_depict, bench_rings);
criterion_main!(benches);
