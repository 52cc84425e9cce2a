use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use robin_hash::HashTable;
use robin_hash::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Fraction of the inserted values to remove afterwards, to show the
    /// effect of tombstones on probe distances.
    #[arg(short = 'r', long = "remove_fraction", default_value_t = 0.25)]
    remove_fraction: f64,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let mut table: HashTable<u64> = HashTable::with_capacity(args.target_capacity);

    println!("Actual capacity: {}", table.capacity());
    println!("Filling table to the growth threshold...");

    // Stop one short of the fill threshold so the table does not double.
    let num_values = table.capacity() * 9 / 10;
    for i in 0..num_values {
        let value = i as u64;
        let hash = hash_u64(value);

        match table.entry(hash, |&v| v == value) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(_) => {
                panic!("Value already exists in table: {}", value);
            }
        }
    }

    println!("Inserted {} values into table", table.len());
    table.probe_stats().print();

    let num_removed = (num_values as f64 * args.remove_fraction) as u64;
    println!("\nRemoving {} values...", num_removed);
    for value in 0..num_removed {
        table.remove(hash_u64(value), |&v| v == value);
    }
    table.probe_stats().print();

    println!("\nAfter shrink_to_fit:");
    table.shrink_to_fit();
    table.probe_stats().print();
}
