//! # Generation Benchmarks
//!
//! Performance benchmarks for classification, the suppression ledger and
//! full generation runs.
//!
//! Run with: `cargo bench -p depsync-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use depsync_core::suppression::{LedgerInput, SuppressionLedger};
use depsync_core::{
    AllowAllLibraries, ContentModuleName, ContentSource, DependencyGraph, DependencyScope,
    DependencySource, DescriptorRoot, DescriptorSet, DescriptorSnapshot, GenerationInputs,
    GraphStore, ModuleLoading, PlanningContext, RawDependency, SuppressionConfig, TargetName,
    classify_dependencies, generate,
};
use std::collections::BTreeSet;
use std::hint::black_box;
use std::sync::Arc;

fn module_name(i: usize) -> String {
    format!("intellij.bench.m{i}")
}

/// Each module depends on the next three, the last one in TEST scope.
fn create_layered_graph(size: usize) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for i in 0..size {
        let dependencies = (1..=3)
            .filter(|step| i + step < size)
            .map(|step| {
                let scope = if step == 3 {
                    DependencyScope::Test
                } else {
                    DependencyScope::Compile
                };
                RawDependency::new(module_name(i + step), scope)
            })
            .collect();
        let name = module_name(i);
        graph
            .add_target(TargetName::new(&name), dependencies)
            .expect("target");
        graph
            .add_content_module(
                ContentModuleName::new(&name),
                Some(TargetName::new(&name)),
                vec![ContentSource::product("IDEA", ModuleLoading::Required)],
            )
            .expect("module");
    }
    graph
}

fn create_descriptors(size: usize) -> DescriptorSet {
    let mut set = DescriptorSet::new();
    for i in 0..size {
        let name = module_name(i);
        set.insert_module(
            ContentModuleName::new(&name),
            DescriptorSnapshot {
                path: format!("{name}.xml"),
                content: String::new(),
                root: DescriptorRoot::Standard,
                module_dependencies: BTreeSet::new(),
                plugin_dependencies: BTreeSet::new(),
            },
        );
    }
    set
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");

    for size in [100, 1000, 10000].iter() {
        let graph = create_layered_graph(*size);
        let names: Vec<ContentModuleName> = (0..*size)
            .map(|i| ContentModuleName::new(module_name(i)))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                for name in &names {
                    let target = TargetName::new(name);
                    black_box(classify_dependencies(
                        &graph,
                        DependencySource::ContentModule(name),
                        &target,
                        true,
                        &AllowAllLibraries,
                    ));
                }
            });
        });
    }

    group.finish();
}

fn bench_ledger(c: &mut Criterion) {
    let mut group = c.benchmark_group("suppression_ledger");

    for size in [10, 100, 1000].iter() {
        let computed: BTreeSet<String> = (0..*size).map(|i| format!("c{i}")).collect();
        let existing: BTreeSet<String> = (0..*size).step_by(2).map(|i| format!("c{i}")).collect();
        let persisted: BTreeSet<String> = (0..*size).step_by(3).map(|i| format!("c{i}")).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                black_box(SuppressionLedger::apply(LedgerInput {
                    computed: &computed,
                    existing: &existing,
                    persisted: &persisted,
                    update_mode: true,
                }))
            });
        });
    }

    group.finish();
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");
    group.sample_size(20);
    let runtime = tokio::runtime::Runtime::new().expect("runtime");

    for size in [100, 1000].iter() {
        let descriptors = Arc::new(create_descriptors(*size));
        let inputs = GenerationInputs::new(PlanningContext::new(
            SuppressionConfig::new(),
            Arc::new(AllowAllLibraries),
            descriptors,
        ));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let store = GraphStore::new(create_layered_graph(size));
                let report = runtime
                    .block_on(generate(&store, &inputs))
                    .expect("generation");
                black_box(report)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_classification, bench_ledger, bench_generation);
criterion_main!(benches);
