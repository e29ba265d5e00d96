use criterion::{Criterion, criterion_group, criterion_main};
use dex_aggregator::logic::{HistoryOrder, datetime_from_epoch};
use dex_aggregator::storage::{IntervalStorage, MarketStorage};
use dex_aggregator::{IntervalQueryService, IntervalLength, IntervalsMap, MarketDescriptor, MemoryStorage, OrderSide, Trade};
use lazy_static::lazy_static;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::runtime::Runtime;

const START: i64 = 1_699_920_000;

lazy_static! {
    static ref TRADES: Vec<Trade> = (0..10_000i64)
        .map(|i| {
            let order = HistoryOrder {
                market_id: "ubze/uusdc".to_string(),
                side: if i % 2 == 0 { OrderSide::Buy } else { OrderSide::Sell },
                amount: Decimal::new(100 + i % 50, 0),
                price: Decimal::new(1_000 + (i * 7) % 300, 3),
                executed_at: START + i * 37,
                maker: "maker".to_string(),
                taker: "taker".to_string(),
            };
            Trade::from_history_order(&order).unwrap()
        })
        .collect();
}

fn fold_trades() -> usize {
    let map = IntervalsMap::with_default_lengths("ubze/uusdc");
    for trade in TRADES.iter() {
        map.add_trade(trade).unwrap();
    }
    map.elements().len()
}

fn benchmark_interval_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("intervals");
    group.sample_size(20);

    group.bench_function("fold_10k_trades", |b| b.iter(fold_trades));
    group.finish();
}

fn benchmark_gap_fill(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let storage = Arc::new(MemoryStorage::new());
    runtime.block_on(async {
        let market = MarketDescriptor::new("ubze", "uusdc", datetime_from_epoch(START - 86_400));
        storage.save_markets_if_absent(vec![market]).await.unwrap();

        let map = IntervalsMap::with_default_lengths("ubze/uusdc");
        for trade in TRADES.iter() {
            map.add_trade(trade).unwrap();
        }
        storage.upsert_intervals(&map.elements()).await.unwrap();
    });
    let service = IntervalQueryService::new(storage.clone(), storage, IntervalLength::DEFAULTS.to_vec());
    let now = datetime_from_epoch(START + 10_000 * 37);

    let mut group = c.benchmark_group("query");
    group.sample_size(20);
    group.bench_function("five_minute_series_500", |b| {
        b.to_async(&runtime).iter(|| async { service.get_intervals_at("ubze/uusdc", 5, 500, now).await.unwrap() })
    });
    group.bench_function("daily_trading_view_30", |b| {
        b.to_async(&runtime)
            .iter(|| async { service.get_trading_view_intervals_at("ubze/uusdc", 1440, 30, now).await.unwrap() })
    });
    group.finish();
}

criterion_group!(benches, benchmark_interval_fold, benchmark_gap_fill);
criterion_main!(benches);
