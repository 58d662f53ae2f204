//! Order pipeline - SPSC (1 Producer, 1 Consumer)
//!
//! Producer streams owned order records, consumer checks they arrive in
//! sequence. Shows `Full` handing the item back and a blocking wrapper
//! built from a wait strategy.

use ringlane::{read_blocking, spsc, write_blocking, Yielding};
use std::thread;
use std::time::{Duration, Instant};

const RING_SIZE: usize = 1024;
const ORDERS: u64 = 500_000;

#[derive(Debug)]
struct Order {
    id: u64,
    symbol: String,
    quantity: u32,
}

fn main() {
    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  Order Pipeline - SPSC                                  ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    let (mut producer, mut consumer) = match spsc::channel::<Order>(RING_SIZE) {
        Ok(handles) => handles,
        Err(e) => {
            eprintln!("failed to create ring: {e}");
            return;
        }
    };

    let start = Instant::now();

    let producer_thread = thread::spawn(move || {
        let strategy = Yielding::default();
        for id in 0..ORDERS {
            let order = Order {
                id,
                symbol: format!("SYM{}", id % 16),
                quantity: (id % 100) as u32 + 1,
            };
            if let Err(full) = write_blocking(&mut producer, order, &strategy, None) {
                eprintln!("order {} dropped", full.into_inner().id);
            }
        }
        producer.metrics()
    });

    let strategy = Yielding::new(256);
    let mut expected = 0u64;
    let mut quantity = 0u64;
    let mut out_of_order = 0u64;
    while expected < ORDERS {
        match read_blocking(&mut consumer, &strategy, Some(Duration::from_secs(5))) {
            Ok(order) => {
                if order.id != expected || order.symbol.is_empty() {
                    out_of_order += 1;
                }
                quantity += order.quantity as u64;
                expected += 1;
            }
            Err(_) => {
                eprintln!("timed out after {} orders", expected);
                break;
            }
        }
    }

    let producer_metrics = producer_thread.join().ok();
    let duration = start.elapsed();

    println!("  Orders received:   {}", expected);
    println!("  Out of order:      {}", out_of_order);
    println!("  Total quantity:    {}", quantity);
    if let Some(metrics) = producer_metrics {
        println!("  Producer metrics:  {}", metrics);
    }
    println!("  Time taken:        {:.3}s", duration.as_secs_f64());
    println!(
        "  Throughput:        {:.2}M orders/sec\n",
        expected as f64 / duration.as_secs_f64() / 1_000_000.0
    );

    if out_of_order == 0 && expected == ORDERS {
        println!("  ✅ VERIFICATION PASSED!");
    } else {
        println!("  ❌ VERIFICATION FAILED!");
    }
}
