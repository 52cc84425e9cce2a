use core::hash::Hash;
use core::hash::Hasher;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::hash_table::Entry as HashbrownEntry;
use hashbrown::hash_table::HashTable as HashbrownHashTable;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use robin_hash::HashTable as RobinHashTable;
use siphasher::sip::SipHasher;

trait KeyValuePair: Clone {
    fn new(key: u64) -> Self;

    fn hash_key(&self) -> u64;
    fn eq_key(&self, other: &Self) -> bool;
}

#[derive(Clone)]
struct TestItem {
    key: String,
    _value: u64,
}

impl KeyValuePair for TestItem {
    fn new(key: u64) -> Self {
        black_box(Self {
            key: format!("key_{:016X}", key),
            _value: key,
        })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

#[derive(Clone)]
struct SmallTestItem {
    key: u64,
}

impl KeyValuePair for SmallTestItem {
    fn new(key: u64) -> Self {
        black_box(Self { key })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

const SIZES: &[usize] = &[(1 << 10), (1 << 12), (1 << 14), (1 << 16)];

fn bench_insert_random<TestItem: KeyValuePair>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_random_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    let mut rng = OsRng;

    for size in SIZES {
        let hash_and_item = (0..*size)
            .map(|_| {
                let key = rng.try_next_u64().unwrap();
                let item = TestItem::new(key);
                let hash = item.hash_key();
                (hash, item)
            })
            .collect::<Vec<(u64, TestItem)>>();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("robin_hash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item.clone();
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    hash_and_item
                },
                |hash_and_item| {
                    let mut table = RobinHashTable::<TestItem>::with_capacity(0);
                    for (hash, item) in hash_and_item {
                        match table.entry(hash, |v| v.eq_key(&item)) {
                            robin_hash::hash_table::Entry::Vacant(entry) => {
                                black_box(entry.insert(item));
                            }
                            robin_hash::hash_table::Entry::Occupied(_) => unreachable!(),
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item.clone();
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    hash_and_item
                },
                |hash_and_item| {
                    let mut table = HashbrownHashTable::with_capacity(0);
                    for (hash, item) in hash_and_item {
                        match table.entry(hash, |v: &TestItem| v.eq_key(&item), |v| v.hash_key()) {
                            HashbrownEntry::Vacant(entry) => {
                                black_box(entry.insert(item));
                            }
                            HashbrownEntry::Occupied(_) => unreachable!(),
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_collect_find<TestItem: KeyValuePair>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "collect_find_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES {
        let hash_and_item = (0..*size)
            .map(|i| {
                let item = TestItem::new(i as u64);
                let hash = item.hash_key();
                (hash, item)
            })
            .collect::<Vec<(u64, TestItem)>>();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("robin_hash/{size}"), |b| {
            b.iter_batched(
                || hash_and_item.clone(),
                |hash_and_item| {
                    let mut table = RobinHashTable::<TestItem>::with_capacity(0);
                    for (hash, item) in hash_and_item.iter().cloned() {
                        table.entry(hash, |v| v.eq_key(&item)).or_insert(item);
                    }

                    for (hash, item) in hash_and_item.iter() {
                        black_box(table.find(*hash, |v| v.eq_key(item)));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || hash_and_item.clone(),
                |hash_and_item| {
                    let mut table = HashbrownHashTable::<TestItem>::with_capacity(0);
                    for (hash, item) in hash_and_item.iter().cloned() {
                        match table.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
                            HashbrownEntry::Vacant(entry) => {
                                entry.insert(item);
                            }
                            HashbrownEntry::Occupied(_) => unreachable!(),
                        }
                    }

                    for (hash, item) in hash_and_item.iter() {
                        black_box(table.find(*hash, |v| v.eq_key(item)));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Zipf-distributed read-heavy churn: mostly lookups of hot keys, with a
/// small fraction of remove/reinsert pairs to generate tombstones.
fn bench_zipf_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("zipf_churn");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES {
        let zipf = Zipf::new(*size as f64, 1.03).unwrap();
        let mut rng = SmallRng::from_os_rng();
        let ops: Vec<(u64, u64, bool)> = (0..*size * 4)
            .map(|_| {
                let key = rng.sample(&zipf) as u64;
                let item = SmallTestItem::new(key);
                (item.hash_key(), key, rng.random_ratio(1, 16))
            })
            .collect();

        let base: Vec<(u64, SmallTestItem)> = (1..=*size as u64)
            .map(|key| {
                let item = SmallTestItem::new(key);
                (item.hash_key(), item)
            })
            .collect();

        group.throughput(Throughput::Elements(ops.len() as u64));
        group.bench_function(format!("robin_hash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut table = RobinHashTable::<SmallTestItem>::with_capacity(*size);
                    for (hash, item) in base.iter().cloned() {
                        table.entry(hash, |v| v.eq_key(&item)).or_insert(item);
                    }
                    table
                },
                |mut table| {
                    for &(hash, key, mutate) in &ops {
                        if mutate {
                            black_box(table.remove(hash, |v| v.key == key));
                            table
                                .entry(hash, |v| v.key == key)
                                .or_insert(SmallTestItem { key });
                        } else {
                            black_box(table.find(hash, |v| v.key == key));
                        }
                    }
                    table
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut table = HashbrownHashTable::<SmallTestItem>::with_capacity(*size);
                    for (hash, item) in base.iter().cloned() {
                        if let HashbrownEntry::Vacant(entry) =
                            table.entry(hash, |v| v.eq_key(&item), |v| v.hash_key())
                        {
                            entry.insert(item);
                        }
                    }
                    table
                },
                |mut table| {
                    for &(hash, key, mutate) in &ops {
                        if mutate {
                            if let Ok(entry) = table.find_entry(hash, |v| v.key == key) {
                                black_box(entry.remove());
                            }
                            if let HashbrownEntry::Vacant(entry) =
                                table.entry(hash, |v| v.key == key, |v| v.hash_key())
                            {
                                entry.insert(SmallTestItem { key });
                            }
                        } else {
                            black_box(table.find(hash, |v| v.key == key));
                        }
                    }
                    table
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_small(c: &mut Criterion) {
    bench_insert_random::<SmallTestItem>(c);
    bench_collect_find::<SmallTestItem>(c);
}

fn bench_string_keys(c: &mut Criterion) {
    bench_insert_random::<TestItem>(c);
    bench_collect_find::<TestItem>(c);
}

criterion_group!(benches, bench_small, bench_string_keys, bench_zipf_churn);
criterion_main!(benches);
