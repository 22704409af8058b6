use chrono::{DateTime, Duration, TimeZone, Utc};
use client_ledger::{Amount, ClientId, Entry, Ledger, MemoryStore, TxId};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// One submission as passed to [`Ledger::submit`].
type Op = (ClientId, TxId, DateTime<Utc>, Entry);

/// Generates valid submission sequences for benchmarking.
///
/// Pattern per client (repeating):
/// 1. Debit 100
/// 2. Debit 50
/// 3. Credit 30
///
/// Credits never exceed the balance and effective times only move forward.
pub struct OpGenerator {
    clients: Vec<ClientId>,
    ops_per_client: u32,
    current_client: usize,
    current_step: u32,
    start: DateTime<Utc>,
}

impl OpGenerator {
    pub fn new(num_clients: usize, ops_per_client: u32) -> Self {
        Self {
            clients: (0..num_clients).map(|_| ClientId::new_v4()).collect(),
            ops_per_client,
            current_client: 0,
            current_step: 0,
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }
}

impl Iterator for OpGenerator {
    type Item = Op;

    fn next(&mut self) -> Option<Self::Item> {
        let client = *self.clients.get(self.current_client)?;

        let entry = match self.current_step % 3 {
            0 => Entry::debit(Amount::from_scaled(1000, 1)), // 100.0
            1 => Entry::debit(Amount::from_scaled(500, 1)),  // 50.0
            _ => Entry::credit(Amount::from_scaled(300, 1)), // 30.0
        }
        .unwrap();
        let time = self.start + Duration::seconds(i64::from(self.current_step));

        self.current_step += 1;
        if self.current_step >= self.ops_per_client {
            self.current_step = 0;
            self.current_client += 1;
        }

        Some((client, TxId::new_v4(), time, entry))
    }
}

fn runtime() -> Runtime {
    Runtime::new().unwrap()
}

fn bench_single_client(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("single_client");

    for count in [1_000u32, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.to_async(&rt).iter(|| async move {
                let ledger = Ledger::new(MemoryStore::new());
                for (client, tx, time, entry) in OpGenerator::new(1, count) {
                    let _ = black_box(ledger.submit(client, tx, time, entry).await);
                }
                ledger
            });
        });
    }

    group.finish();
}

fn bench_parallel_clients(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("parallel_clients");

    for (clients, ops_per) in [(10, 1_000), (100, 100)] {
        let label = format!("{clients}c_{ops_per}ops");
        group.bench_with_input(
            BenchmarkId::from_parameter(&label),
            &(clients, ops_per),
            |b, &(clients, ops_per)| {
                b.to_async(&rt).iter(|| async move {
                    let ledger = Arc::new(Ledger::new(MemoryStore::new()));
                    let ops: Vec<Op> = OpGenerator::new(clients, ops_per).collect();

                    // one task per client, each submitting its own sequence in order
                    let tasks: Vec<_> = ops
                        .chunks(ops_per as usize)
                        .map(|chunk| {
                            let ledger = ledger.clone();
                            let chunk = chunk.to_vec();
                            tokio::spawn(async move {
                                for (client, tx, time, entry) in chunk {
                                    let _ = black_box(ledger.submit(client, tx, time, entry).await);
                                }
                            })
                        })
                        .collect();
                    for task in tasks {
                        let _ = task.await;
                    }
                    ledger
                });
            },
        );
    }

    group.finish();
}

fn bench_reverts(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("with_reverts");

    // revert every 10th debit after the sequence is recorded
    group.bench_function("10k_revert_10pct", |b| {
        b.to_async(&rt).iter(|| async {
            let ledger = Ledger::new(MemoryStore::new());
            let mut reverts = Vec::new();
            for (i, (client, tx, time, entry)) in OpGenerator::new(10, 1_000).enumerate() {
                if ledger.submit(client, tx, time, entry).await.is_ok() && i % 10 == 0 {
                    reverts.push((client, tx));
                }
            }
            for (client, tx) in reverts {
                let _ = black_box(ledger.revert(tx, client).await);
            }
            ledger
        });
    });

    group.finish();
}

criterion_group!(benches, bench_single_client, bench_parallel_clients, bench_reverts);
criterion_main!(benches);
