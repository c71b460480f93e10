use chrono::{Duration, TimeZone, Utc};
use common::{Category, OrderType, Unit};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use domain::{
    DelegatedReduction, Ledger, LocalReduction, Order, OrderLine, OrderService, StockService,
    ValuationMode, ValuationStrategy,
};
use rust_decimal::Decimal;
use stock_store::{DishRecord, InMemoryStockStore, IngredientRecord, StockMovement, StockStore};

fn make_movements(count: i64) -> Vec<StockMovement> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let at = base + Duration::minutes(i);
            if i % 3 == 0 {
                StockMovement::outbound(at, Decimal::new(25, 2), Unit::Kg).unwrap()
            } else {
                StockMovement::inbound(at, Decimal::new(150, 2), Unit::Kg).unwrap()
            }
        })
        .collect()
}

fn bench_ledger_value_at(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger/value_at");
    for size in [10, 100, 1_000, 10_000] {
        let movements = make_movements(size);
        let at = movements[movements.len() / 2].created_at();
        let ledger = Ledger::new(
            IngredientRecord::new("Laitue", Category::Vegetable, Decimal::ZERO),
            movements,
        );

        group.bench_with_input(BenchmarkId::from_parameter(size), &ledger, |b, ledger| {
            b.iter(|| ledger.value_at(at).unwrap());
        });
    }
    group.finish();
}

fn bench_strategies(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStockStore::new();
    let ingredient = IngredientRecord::new("Laitue", Category::Vegetable, Decimal::ZERO);
    let movements = make_movements(1_000);
    let at = movements[500].created_at();

    rt.block_on(async {
        let mut tx = store.begin().await.unwrap();
        tx.upsert_ingredient(&ingredient).await.unwrap();
        tx.append_movements(ingredient.id, &movements).await.unwrap();
        tx.commit().await.unwrap();
    });

    let strategies: [&dyn ValuationStrategy; 2] = [&LocalReduction, &DelegatedReduction];
    for strategy in strategies {
        c.bench_function(&format!("valuation/{}_1000_movements", strategy.name()), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let mut tx = store.begin().await.unwrap();
                    strategy
                        .value_at(tx.as_mut(), &ingredient, at)
                        .await
                        .unwrap();
                    tx.rollback().await.unwrap();
                });
            });
        });
    }
}

fn bench_place_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStockStore::new();
    let stock = StockService::with_mode(store.clone(), ValuationMode::Local);
    let service = OrderService::with_mode(store.clone(), ValuationMode::Local);

    let dish = rt.block_on(async {
        let ingredient = IngredientRecord::new("Laitue", Category::Vegetable, Decimal::ZERO);
        stock
            .save_ingredient(ingredient.clone(), make_movements(100))
            .await
            .unwrap();
        let dish = DishRecord::new("Salade", Decimal::new(2500, 0))
            .with_ingredient(ingredient.id, Decimal::new(1, 2))
            .unwrap();
        stock.save_dish(dish).await.unwrap()
    });

    c.bench_function("order/place_one_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                let order =
                    Order::create(OrderType::EatIn, vec![OrderLine::new(dish.id, 1).unwrap()]);
                // Generated references may collide over many iterations.
                let _ = service.place_order(order).await;
            });
        });
    });
}

criterion_group!(
    benches,
    bench_ledger_value_at,
    bench_strategies,
    bench_place_order,
);
criterion_main!(benches);
