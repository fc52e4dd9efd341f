use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use pipeline::{BatchSink, MessageBatcher};

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_added_record_is_delivered_once_in_order(
        items in prop::collection::vec(any::<u32>(), 0..200),
        interval_ms in 1u64..500,
    ) {
        let delivered = paused_runtime().block_on(async {
            let seen = Arc::new(Mutex::new(Vec::<Vec<u32>>::new()));
            let sink_seen = seen.clone();
            let sink: Arc<dyn BatchSink<u32>> = Arc::new(move |batch: Vec<u32>| {
                sink_seen.lock().unwrap().push(batch);
            });
            let (batcher, _task) = MessageBatcher::spawn(
                Duration::from_millis(interval_ms),
                sink,
                CancellationToken::new(),
            );

            for item in &items {
                batcher.add(*item).unwrap();
            }
            batcher.flush_and_wait().await.unwrap();

            let batches = seen.lock().unwrap().clone();
            batches
        });

        prop_assert!(delivered.iter().all(|b| !b.is_empty()));
        let flat: Vec<u32> = delivered.into_iter().flatten().collect();
        prop_assert_eq!(flat, items);
    }
}
