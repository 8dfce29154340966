use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;
use std::hint::black_box;
use wrapped_core::{AccountId, Normalizer, RawSummaryRow};

fn bench_row() -> RawSummaryRow {
    RawSummaryRow::try_from(json!({
        "total_transactions": "1843",
        "total_sent_xlm": 182_733.918_273,
        "total_received_xlm": 99_120.004_1,
        "net_pnl_xlm": -412.556,
        "first_txn_time": "2021-02-11 08:12:44.123 UTC",
        "last_txn_time": "2024-12-01T23:59:01Z",
        "last_transaction_id": "219873459813",
        "last_transaction_type_int": 13,
        "last_transaction_type_str": "path_payment_strict_send",
        "last_transaction_timestamp": "2024-12-01 23:59:01 UTC",
        "last_transaction_asset_code": "USDC",
        "last_transaction_amount": 125.123_456,
        "top_1_largest_nonxlm": [{"asset_code": "USDC", "nonxlm_amount": 50_000.75}],
        "top_1_nonxlm_sent": "[{\"asset_code\":\"AQUA\",\"total_sent\":1234.5}]",
        "most_active_day": "2023-10-01",
        "most_active_month": "2023-10-01",
        "token_balance": 12.345_6
    }))
    .expect("bench row is an object")
}

fn bench_shape(c: &mut Criterion) {
    let normalizer = Normalizer::new();
    let account = AccountId::parse("GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7")
        .expect("valid account");
    let row = bench_row();

    c.bench_function("normalize/shape_full_row", |b| {
        b.iter(|| {
            let summary = normalizer.shape(black_box(&account), black_box(&row));
            black_box(summary.total_transactions);
        });
    });
}

criterion_group!(benches, bench_shape);
criterion_main!(benches);
