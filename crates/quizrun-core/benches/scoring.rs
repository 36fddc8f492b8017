use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use quizrun_core::answers::AnswerSheet;
use quizrun_core::bank::{QuestionBank, QuestionFilter};
use quizrun_core::store::merge;

fn make_bank(n: usize) -> QuestionBank {
    let records: Vec<_> = (0..n)
        .map(|i| {
            json!({
                "id": i,
                "question": format!("question {i}"),
                "options": ["a", "b", "c", "d"],
                "correct": i % 4,
                "category": format!("cat-{}", i % 5),
            })
        })
        .collect();
    QuestionBank::normalize(&records).bank
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");

    for n in [10usize, 1000] {
        let bank = make_bank(n);
        let mut sheet = AnswerSheet::new(n);
        for i in 0..n {
            sheet.set(i, (i * 7) % 4).unwrap();
        }
        group.bench_function(format!("n={n}"), |b| {
            b.iter(|| black_box(&sheet).score(black_box(&bank)))
        });
    }

    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let bank = make_bank(1000);
    let filter = QuestionFilter::category("cat-3");

    c.bench_function("filter/1000", |b| {
        b.iter(|| bank.filter(black_box(&filter)).unwrap())
    });
}

fn bench_merge(c: &mut Criterion) {
    let existing: Vec<_> = make_bank(500).iter().cloned().collect();
    let incoming: Vec<_> = make_bank(750).iter().skip(250).cloned().collect();

    c.bench_function("wrong_answer_merge/500+500", |b| {
        b.iter(|| merge(black_box(&existing), black_box(&incoming)))
    });
}

criterion_group!(benches, bench_score, bench_filter, bench_merge);
criterion_main!(benches);
