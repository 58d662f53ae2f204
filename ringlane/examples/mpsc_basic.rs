//! Average Calculator - MPSC (4 Producers, 1 Consumer)
//!
//! Each producer sends 250k numbers, consumer calculates average of all 1M

use ringlane::constants::DEFAULT_BATCH_SIZE;
use ringlane::{mpsc, EventHandler, Sequence};
use std::thread;
use std::time::Instant;

const RING_SIZE: usize = 64 * 1024;
const MESSAGES_PER_PRODUCER: u64 = 250_000;
const NUM_PRODUCERS: usize = 4;
const MAX_NUMBER: u64 = 1_000_000;

struct AverageHandler {
    sum: u64,
    count: u64,
    first_value: Option<u64>,
    last_value: Option<u64>,
}

impl EventHandler<u64> for AverageHandler {
    fn on_event(&mut self, value: u64, _seq: Sequence, _end_of_batch: bool) {
        if self.first_value.is_none() {
            self.first_value = Some(value);
        }
        self.last_value = Some(value);
        self.sum += value;
        self.count += 1;
    }
}

fn main() {
    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  Average Calculator - MPSC (4 Producers)               ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    println!("Task: Calculate average of numbers 1 to {}", MAX_NUMBER);
    println!("Strategy: 4 producers each send 250k sequential numbers\n");

    let (producer, mut consumer) = match mpsc::channel::<u64>(RING_SIZE) {
        Ok(handles) => handles,
        Err(e) => {
            eprintln!("failed to create ring: {e}");
            return;
        }
    };

    let start = Instant::now();

    let mut producer_threads = vec![];
    for producer_id in 0..NUM_PRODUCERS {
        let producer = producer.clone();

        let handle = thread::spawn(move || {
            let start_num = producer_id as u64 * MESSAGES_PER_PRODUCER + 1;
            let end_num = start_num + MESSAGES_PER_PRODUCER;

            let mut sent = 0u64;
            let mut rejected = 0u64;
            for number in start_num..end_num {
                let mut item = number;
                while let Err(full) = producer.try_write(item) {
                    item = full.into_inner();
                    rejected += 1;
                    std::thread::yield_now();
                }
                sent += 1;
            }

            println!(
                "Producer {}: Sent {} numbers (range {} to {}), {} full rejections",
                producer_id,
                sent,
                start_num,
                end_num - 1,
                rejected
            );
            sent
        });

        producer_threads.push(handle);
    }
    // Only the clones stay alive
    drop(producer);

    let consumer_thread = thread::spawn(move || {
        let mut handler = AverageHandler {
            sum: 0,
            count: 0,
            first_value: None,
            last_value: None,
        };

        while handler.count < MAX_NUMBER {
            if consumer.process_events(&mut handler, DEFAULT_BATCH_SIZE) == 0 {
                std::hint::spin_loop();
            }
        }

        println!(
            "Consumer: Received {} numbers (first={:?}, last={:?})",
            handler.count, handler.first_value, handler.last_value
        );
        println!("Consumer metrics: {}", consumer.metrics());
        (handler.sum, handler.count)
    });

    let mut total_sent = 0;
    for handle in producer_threads {
        total_sent += handle.join().unwrap_or(0);
    }

    let (sum, count) = consumer_thread.join().unwrap_or((0, 0));
    let duration = start.elapsed();

    let calculated_average = sum as f64 / count as f64;
    let expected_average = (MAX_NUMBER as f64 + 1.0) / 2.0;
    let expected_sum = (MAX_NUMBER * (MAX_NUMBER + 1)) / 2;

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  RESULTS                                                ║");
    println!("╚════════════════════════════════════════════════════════╝");
    println!("  Numbers sent:         {}", total_sent);
    println!("  Numbers processed:    {}", count);
    println!("  Sum (calculated):     {}", sum);
    println!("  Sum (expected):       {}", expected_sum);
    println!("  Average (calculated): {:.1}", calculated_average);
    println!("  Average (expected):   {:.1}", expected_average);
    println!("  Time taken:           {:.3}s", duration.as_secs_f64());
    println!();

    if count == total_sent && sum == expected_sum {
        println!("  ✅ VERIFICATION PASSED!");
        println!("  ✨ All {} numbers transmitted correctly", count);
    } else {
        println!("  ❌ VERIFICATION FAILED!");
        if count != total_sent {
            println!("  ⚠️  Count mismatch: got {}, expected {}", count, total_sent);
        }
        if sum != expected_sum {
            println!("  ⚠️  Sum mismatch: got {}, expected {}", sum, expected_sum);
        }
    }

    let throughput = count as f64 / duration.as_secs_f64();
    println!("\n  Performance: {:.2}M numbers/sec", throughput / 1_000_000.0);
    println!(
        "  Per producer: {:.2}M numbers/sec\n",
        throughput / 1_000_000.0 / NUM_PRODUCERS as f64
    );
}
