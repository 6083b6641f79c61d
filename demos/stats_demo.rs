use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use grouped_hash::HashTable;
use grouped_hash::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Build the table in one pass from distinct values instead of
    /// inserting them one at a time.
    #[arg(short = 'b', long = "bulk")]
    bulk: bool,
}

fn hash_u64(value: u64) -> u32 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    let hash = hasher.finish();
    (hash ^ (hash >> 32)) as u32
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let table = if args.bulk {
        let values: Vec<u64> = (0..args.target_capacity as u64).collect();
        HashTable::build_unique(values, |&v| hash_u64(v))
    } else {
        let mut table: HashTable<u64> = HashTable::with_capacity(args.target_capacity);
        println!("Initial capacity: {}", table.capacity());

        for value in 0..args.target_capacity as u64 {
            let hash = hash_u64(value);
            match table.entry(hash, |&v| v == value) {
                Entry::Vacant(entry) => {
                    entry.insert(value, |&v| hash_u64(v));
                }
                Entry::Occupied(_) => {
                    panic!("Value already exists in table: {}", value);
                }
            }
        }
        table
    };

    println!("Inserted {} values into table", table.len());
    println!(
        "Final capacity: {} ({} groups)",
        table.capacity(),
        table.group_count()
    );
    println!(
        "Final load factor: {:.2}%",
        (table.len() as f64 / table.capacity() as f64) * 100.0
    );

    table.print_group_fill_histogram();
    table.debug_stats().print();
}
