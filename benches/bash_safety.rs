use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

use planlock::core::bash_safety::is_read_only;
use planlock::core::plan_diff::diff;
use planlock::core::tasks::{Task, parse_tasks};

const COMMANDS: &[(&str, &str)] = &[
    ("simple", "ls -la"),
    ("pipeline", "cat Cargo.toml | grep -n version | head -5"),
    ("git", "git -C ../repo log --oneline -20 && git status --short"),
    ("redirect", "echo hi > out.txt"),
    ("xargs", "find . -name '*.rs' -print0 | xargs -0 grep -l TODO"),
    (
        "long_chain",
        "cd src && ls && cat lib.rs | wc -l; git diff --stat; rg -n 'fn main' --type rust | sort | uniq -c",
    ),
];

fn bench_classifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("bash_safety");
    group.measurement_time(Duration::from_secs(5));

    for (name, command) in COMMANDS {
        group.bench_with_input(BenchmarkId::new("is_read_only", name), command, |b, cmd| {
            b.iter(|| black_box(is_read_only(black_box(cmd), true)));
        });
    }
    group.finish();
}

fn plan_document(n: usize) -> String {
    (0..n)
        .map(|i| format!("- [{}] Task number {i} touching `src/module_{i}.rs`\n", if i % 3 == 0 { "x" } else { " " }))
        .collect()
}

fn bench_plan_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_diff");

    for size in [10usize, 100, 1000] {
        let approved = parse_tasks(&plan_document(size));
        let mut proposed: Vec<Task> = approved
            .iter()
            .map(|t| Task::new(t.content.clone(), true))
            .collect();
        proposed.push(Task::new("Unplanned work", false));

        group.bench_with_input(BenchmarkId::new("diff", size), &size, |b, _| {
            b.iter(|| black_box(diff(black_box(&approved), black_box(&proposed))));
        });
        group.bench_with_input(BenchmarkId::new("parse", size), &size, |b, &n| {
            let doc = plan_document(n);
            b.iter(|| black_box(parse_tasks(black_box(&doc))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_classifier, bench_plan_diff);
criterion_main!(benches);
