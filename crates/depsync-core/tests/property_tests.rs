//! # Property-Based Tests
//!
//! Ledger soundness and determinism of full generation runs.

use depsync_core::suppression::{LedgerInput, SuppressionLedger};
use depsync_core::{
    AllowAllLibraries, ContentModuleName, ContentSource, DependencyGraph, DependencyScope,
    DescriptorRoot, DescriptorSet, DescriptorSnapshot, GenerationInputs, GenerationReport,
    GraphStore, ModuleLoading, PlanningContext, RawDependency, SuppressionConfig, SuppressionType,
    TargetName, generate,
};
use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

const MODULES: [&str; 6] = ["m0", "m1", "m2", "m3", "m4", "m5"];

fn entries() -> impl Strategy<Value = BTreeSet<String>> {
    btree_set(prop::sample::select(vec!["a", "b", "c", "d", "e", "f"]), 0..6)
        .prop_map(|set| set.into_iter().map(str::to_string).collect())
}

fn scope() -> impl Strategy<Value = DependencyScope> {
    prop_oneof![
        Just(DependencyScope::Compile),
        Just(DependencyScope::Runtime),
        Just(DependencyScope::Test),
        Just(DependencyScope::Provided),
    ]
}

/// Edges between the fixed module set, as `(from, to, scope)` indices.
fn edges() -> impl Strategy<Value = Vec<(usize, usize, DependencyScope)>> {
    vec((0..MODULES.len(), 0..MODULES.len(), scope()), 0..20)
}

fn build_graph(edges: &[(usize, usize, DependencyScope)]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for (index, module) in MODULES.iter().enumerate() {
        let dependencies = edges
            .iter()
            .filter(|(from, _, _)| *from == index)
            .map(|(_, to, scope)| RawDependency::new(MODULES[*to], *scope))
            .collect();
        graph
            .add_target(TargetName::new(module), dependencies)
            .expect("target");
        graph
            .add_content_module(
                ContentModuleName::new(module),
                Some(TargetName::new(module)),
                vec![ContentSource::product("IDEA", ModuleLoading::Required)],
            )
            .expect("module");
    }
    graph
}

fn descriptors() -> DescriptorSet {
    let mut set = DescriptorSet::new();
    for module in MODULES {
        set.insert_module(
            ContentModuleName::new(module),
            DescriptorSnapshot {
                path: format!("{module}.xml"),
                content: String::new(),
                root: DescriptorRoot::Standard,
                module_dependencies: BTreeSet::new(),
                plugin_dependencies: BTreeSet::new(),
            },
        );
    }
    set
}

fn run(edges: &[(usize, usize, DependencyScope)]) -> GenerationReport {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .build()
        .expect("runtime");
    let inputs = GenerationInputs::new(PlanningContext::new(
        SuppressionConfig::new(),
        Arc::new(AllowAllLibraries),
        Arc::new(descriptors()),
    ));
    let store = GraphStore::new(build_graph(edges));
    runtime
        .block_on(generate(&store, &inputs))
        .expect("generation")
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// A suppressed computed entry never reaches the descriptor.
    #[test]
    fn suppressed_entries_are_never_written(
        computed in entries(),
        existing in entries(),
        persisted in entries(),
    ) {
        let outcome = SuppressionLedger::apply(LedgerInput {
            computed: &computed,
            existing: &existing,
            persisted: &persisted,
            update_mode: false,
        });
        prop_assert!(outcome.written.is_disjoint(&outcome.suppressed_computed));
        prop_assert!(outcome.suppressed_computed.is_subset(&persisted));
        prop_assert!(outcome.preserved.is_subset(&existing));
    }

    /// Update mode writes back exactly what the descriptor declares.
    #[test]
    fn update_mode_freezes_existing(
        computed in entries(),
        existing in entries(),
        persisted in entries(),
    ) {
        let outcome = SuppressionLedger::apply(LedgerInput {
            computed: &computed,
            existing: &existing,
            persisted: &persisted,
            update_mode: true,
        });
        prop_assert_eq!(&outcome.written, &existing);
        prop_assert!(outcome.unexplained_removals.is_empty());
    }

    /// One usage per exercised suppression, no duplicates.
    #[test]
    fn usages_are_unique_per_dependency(
        computed in entries(),
        existing in entries(),
        persisted in entries(),
        update_mode in any::<bool>(),
    ) {
        let outcome = SuppressionLedger::apply(LedgerInput {
            computed: &computed,
            existing: &existing,
            persisted: &persisted,
            update_mode,
        });
        let usages = outcome.usages("m", SuppressionType::ModuleDep);
        let distinct: BTreeSet<&str> = usages.iter().map(|u| u.dependency.as_str()).collect();
        prop_assert_eq!(distinct.len(), usages.len());
        prop_assert_eq!(
            usages.len(),
            outcome.suppressed_computed.len() + outcome.preserved.len()
        );
    }

    /// Re-running the captured suppressions in check mode reproduces the
    /// descriptor without reporting anything stale.
    #[test]
    fn captured_suppressions_replay_cleanly(
        computed in entries(),
        existing in entries(),
    ) {
        let captured = SuppressionLedger::apply(LedgerInput {
            computed: &computed,
            existing: &existing,
            persisted: &BTreeSet::new(),
            update_mode: true,
        });
        let replay = SuppressionLedger::apply(LedgerInput {
            computed: &computed,
            existing: &existing,
            persisted: &captured.effective,
            update_mode: false,
        });
        prop_assert_eq!(&replay.written, &existing);
        let used: BTreeSet<String> = replay
            .usages("m", SuppressionType::ModuleDep)
            .into_iter()
            .map(|u| u.dependency)
            .collect();
        prop_assert_eq!(used, captured.effective);
    }
}

proptest! {
    /// A production pass followed by a wider test pass documents every
    /// exercised suppression exactly once.
    #[test]
    fn two_pass_usages_are_unique(
        production in entries(),
        test_only in entries(),
        existing in entries(),
        persisted in entries(),
        update in any::<bool>(),
    ) {
        let narrower = SuppressionLedger::apply(LedgerInput {
            computed: &production,
            existing: &existing,
            persisted: &persisted,
            update_mode: update,
        });
        let wider_computed: BTreeSet<String> = production.union(&test_only).cloned().collect();
        let wider = SuppressionLedger::apply(LedgerInput {
            computed: &wider_computed,
            existing: &existing,
            persisted: &narrower.effective,
            update_mode: false,
        });

        let mut usages = narrower.usages("m", SuppressionType::ModuleDep);
        usages.extend(wider.usages_outside("m", SuppressionType::ModuleDep, &narrower));
        let distinct: BTreeSet<&str> = usages.iter().map(|u| u.dependency.as_str()).collect();
        prop_assert_eq!(distinct.len(), usages.len());

        let exercised: BTreeSet<&str> = narrower
            .suppressed_computed
            .iter()
            .chain(&narrower.preserved)
            .chain(&wider.suppressed_computed)
            .chain(&wider.preserved)
            .map(String::as_str)
            .collect();
        prop_assert_eq!(distinct, exercised);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The test view is always a superset of the production view.
    #[test]
    fn test_dependencies_cover_production(edges in edges()) {
        let report = run(&edges);
        for plan in &report.content_module_plans {
            let test: BTreeSet<&ContentModuleName> = plan.test_dependencies.iter().collect();
            for dependency in &plan.module_dependencies {
                prop_assert!(test.contains(dependency), "{} missing {}", plan.name, dependency);
            }
        }
    }

    /// Same graph, same plans, same fingerprint.
    #[test]
    fn generation_is_deterministic(edges in edges()) {
        let first = run(&edges);
        let mut shuffled = edges.clone();
        shuffled.reverse();
        let second = run(&shuffled);
        prop_assert_eq!(&first.fingerprint, &second.fingerprint);
        prop_assert_eq!(first.content_module_plans, second.content_module_plans);
    }
}
