use crate::job::Job;

/// Pending jobs of one pool, ordered by dynamic priority.
///
/// Priorities are re-evaluated on every pop, so a heap would go stale the
/// moment an evaluator changed its mind; a brute-force scan is correct by
/// construction and fast for the queue depths pools see in practice. Ties
/// break FIFO via per-queue sequence numbers, which survive the
/// `swap_remove` shuffling below.
#[derive(Debug, Default)]
pub(crate) struct PendingQueue {
    jobs: Vec<Job>,
    next_seq: u64,
}

impl PendingQueue {
    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub(crate) fn push(&mut self, mut job: Job) {
        job.seq = self.next_seq;
        self.next_seq += 1;
        self.jobs.push(job);
    }

    /// Remove and return the best job: highest priority, oldest within a
    /// priority. Each job's evaluator runs once per call.
    pub(crate) fn pop_best(&mut self) -> Option<Job> {
        if self.jobs.is_empty() {
            return None;
        }

        let mut best = 0;
        let mut best_priority = self.jobs[0].priority_value();
        let mut best_seq = self.jobs[0].seq;
        for (index, job) in self.jobs.iter().enumerate().skip(1) {
            let priority = job.priority_value();
            if priority > best_priority || (priority == best_priority && job.seq < best_seq) {
                best = index;
                best_priority = priority;
                best_seq = job.seq;
            }
        }

        Some(self.jobs.swap_remove(best))
    }

    /// Take every pending job out, leaving the queue empty.
    pub(crate) fn drain(&mut self) -> Vec<Job> {
        std::mem::take(&mut self.jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::context::Context;
    use crate::job::JobOutcome;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn job_with_priority(priority: Option<f32>) -> Job {
        let ctx = match priority {
            Some(p) => Context::new().with_priority(move || p),
            None => Context::new(),
        };
        Job::new(&ctx, CancelToken::new(), Box::new(|| JobOutcome::Completed))
    }

    #[test]
    fn pop_on_empty_queue_is_none() {
        let mut queue = PendingQueue::default();
        assert!(queue.pop_best().is_none());
    }

    #[test]
    fn higher_priority_pops_first() {
        let mut queue = PendingQueue::default();
        queue.push(job_with_priority(Some(1.0)));
        queue.push(job_with_priority(Some(10.0)));
        queue.push(job_with_priority(Some(5.0)));

        let order: Vec<f32> = std::iter::from_fn(|| queue.pop_best())
            .map(|j| j.priority_value())
            .collect();
        assert_eq!(order, vec![10.0, 5.0, 1.0]);
    }

    #[test]
    fn equal_priorities_pop_fifo() {
        let mut queue = PendingQueue::default();
        for _ in 0..4 {
            queue.push(job_with_priority(None));
        }

        let seqs: Vec<u64> = std::iter::from_fn(|| queue.pop_best())
            .map(|j| j.seq)
            .collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);
    }

    #[test]
    fn fifo_survives_interleaved_priorities() {
        let mut queue = PendingQueue::default();
        queue.push(job_with_priority(None)); // seq 0
        queue.push(job_with_priority(Some(9.0))); // seq 1
        queue.push(job_with_priority(None)); // seq 2

        assert_eq!(queue.pop_best().unwrap().seq, 1);
        assert_eq!(queue.pop_best().unwrap().seq, 0);
        assert_eq!(queue.pop_best().unwrap().seq, 2);
    }

    #[test]
    fn priorities_are_reevaluated_each_pop() {
        // Two jobs sharing one evaluator whose answer flips between pops.
        let calls = Arc::new(AtomicUsize::new(0));

        let mut queue = PendingQueue::default();
        let flipping = {
            let calls = Arc::clone(&calls);
            move || {
                if calls.fetch_add(1, Ordering::Relaxed) >= 2 {
                    100.0
                } else {
                    0.0
                }
            }
        };
        let ctx = Context::new().with_priority(flipping);
        queue.push(Job::new(
            &ctx,
            CancelToken::new(),
            Box::new(|| JobOutcome::Completed),
        )); // seq 0
        queue.push(job_with_priority(Some(50.0))); // seq 1

        // First pop: evaluator says 0.0, static 50.0 wins.
        assert_eq!(queue.pop_best().unwrap().seq, 1);
        // The evaluator ran at least once during the first scan.
        assert!(calls.load(Ordering::Relaxed) >= 1);

        queue.push(job_with_priority(Some(50.0))); // seq 2
        calls.store(2, Ordering::Relaxed);
        // Now the dynamic job outranks the fresh static one.
        assert_eq!(queue.pop_best().unwrap().seq, 0);
    }

    #[test]
    fn drain_empties_the_queue() {
        let mut queue = PendingQueue::default();
        queue.push(job_with_priority(None));
        queue.push(job_with_priority(None));

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }
}
