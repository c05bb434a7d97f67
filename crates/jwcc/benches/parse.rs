use std::io::Read;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};

static ACL_POLICY: &str = r#"
// Example access policy.
{
	"groups": {
		"group:ops": ["alice@example.com", "bob@example.com"],
		"group:dev": ["carol@example.com"], // rotating membership
	},
	/* Rules are evaluated first-match. */
	"rules": [
		{"action": "accept", "users": ["group:ops"], "ports": ["*:22"]},
		{"action": "accept", "users": ["group:dev"], "ports": ["tag:dev:443"]},
		{"action": "drop", "users": ["*"], "ports": ["*:*"]},
	],
}
"#;

fn bench_parse(c: &mut Criterion) {
    let input = ACL_POLICY.as_bytes();
    let mut group = c.benchmark_group("jwcc");
    group.throughput(Throughput::Bytes(input.len() as u64));

    group.bench_function("parse", |b| {
        b.iter(|| jwcc::parse(input).expect("valid input"));
    });

    let tree = jwcc::parse(input).expect("valid input");
    group.bench_function("pack", |b| {
        b.iter(|| tree.pack());
    });

    group.bench_function("standardize", |b| {
        b.iter_batched(
            || tree.clone(),
            |mut tree| {
                tree.standardize();
                tree
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("format", |b| {
        b.iter_batched(
            || tree.clone(),
            |mut tree| {
                tree.format();
                tree
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("standardizer", |b| {
        let mut out = Vec::with_capacity(input.len());
        b.iter(|| {
            out.clear();
            jwcc::Standardizer::new(input)
                .read_to_end(&mut out)
                .expect("valid input")
        });
    });

    group.finish();
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
