use super::Batch;
use crate::common::*;
use std::thread;

/// Runs `consume` over batches produced by a background thread through a
/// bounded queue. With zero workers the batches are produced in line.
pub fn with_prefetch<I, F, T>(source: I, workers: usize, queue_size: usize, consume: F) -> Result<T>
where
    I: Iterator<Item = Result<Batch>> + Send,
    F: FnOnce(&mut dyn Iterator<Item = Result<Batch>>) -> Result<T>,
{
    if workers == 0 {
        let mut source = source;
        return consume(&mut source);
    }
    if workers > 1 {
        debug!("batches come from a single iterator, using one prefetch thread");
    }

    let (tx, rx) = flume::bounded(queue_size.max(1));

    thread::scope(|scope| {
        scope.spawn(move || {
            for item in source {
                if tx.send(item).is_err() {
                    break;
                }
            }
        });

        // dropping the receiver stops the producer
        let mut iter = rx.into_iter();
        consume(&mut iter)
    })
}
