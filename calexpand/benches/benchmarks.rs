use calexpand::{
    generate, parse, ExceptionRecord, Expander, MasterRecord, RecurrencePattern, RecurrenceRange,
    TimezoneBias, Weekday, WeekdaySet,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jiff::civil::{date, DateTime};

const WEEKLY: &str = r#"<recurrence><rule><firstDayOfWeek>su</firstDayOfWeek>
    <repeat><weekly mo="TRUE" we="TRUE" fr="TRUE" weekFrequency="1" /></repeat>
    <repeatForever>FALSE</repeatForever></rule></recurrence>"#;

const MONTHLY_BY_DAY: &str = r#"<recurrence><rule><firstDayOfWeek>su</firstDayOfWeek>
    <repeat><monthlyByDay tu="TRUE" weekdayOfMonth="third" monthFrequency="1" /></repeat>
    <windowEnd>2030-12-31T00:00:00Z</windowEnd></rule></recurrence>"#;

fn anchor() -> DateTime {
    date(2026, 1, 5).at(9, 0, 0, 0)
}

// ---------------------------------------------------------------------------
// Parse benchmarks
// ---------------------------------------------------------------------------

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    group.bench_function("weekly", |b| {
        b.iter(|| parse(black_box(WEEKLY), anchor()).unwrap());
    });

    group.bench_function("monthly_by_day", |b| {
        b.iter(|| parse(black_box(MONTHLY_BY_DAY), anchor()).unwrap());
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Generator benchmarks
// ---------------------------------------------------------------------------

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    let end = date(2026, 1, 5).at(10, 0, 0, 0);

    let daily = RecurrencePattern::Daily { interval: 1 };
    group.bench_function("daily_1000", |b| {
        b.iter(|| {
            generate(anchor(), end, black_box(&daily), &RecurrenceRange::NoEnd)
                .take(1000)
                .count()
        });
    });

    let weekly = RecurrencePattern::Weekly {
        interval: 2,
        days: [Weekday::Monday, Weekday::Thursday]
            .into_iter()
            .collect::<WeekdaySet>(),
        week_start: Weekday::Sunday,
    };
    group.bench_function("weekly_1000", |b| {
        b.iter(|| {
            generate(anchor(), end, black_box(&weekly), &RecurrenceRange::NoEnd)
                .take(1000)
                .count()
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Expansion benchmarks
// ---------------------------------------------------------------------------

fn batch(n: i64) -> (Vec<MasterRecord>, Vec<ExceptionRecord>) {
    let masters = (0..n)
        .map(|id| {
            let description = if id % 2 == 0 { WEEKLY } else { MONTHLY_BY_DAY };
            MasterRecord::recurring(id, anchor(), date(2026, 1, 5).at(10, 0, 0, 0), description)
        })
        .collect();
    let exceptions = (0..n)
        .step_by(3)
        .map(|id| ExceptionRecord::deleted(id, date(2026, 1, 7).at(9, 0, 0, 0)))
        .collect();
    (masters, exceptions)
}

fn bench_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand");
    let (masters, exceptions) = batch(200);
    let expander = Expander::new(TimezoneBias::new(-60, -60))
        .with_window(date(2026, 1, 1).at(0, 0, 0, 0), date(2027, 1, 1).at(0, 0, 0, 0));

    group.bench_function("200_masters_one_year", |b| {
        b.iter(|| expander.expand(black_box(&masters), black_box(&exceptions)));
    });

    let parallel = expander.clone().with_workers(4);
    group.bench_function("200_masters_one_year_4_workers", |b| {
        b.iter(|| parallel.expand(black_box(&masters), black_box(&exceptions)));
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_generate, bench_expand);
criterion_main!(benches);
