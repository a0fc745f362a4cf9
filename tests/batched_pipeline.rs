use anyhow::{Result, anyhow, bail};
use receiptflow::hook::{FixedDelay, NoDelay, from_fn};
use receiptflow::testing::*;
use receiptflow::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

fn engine(workers: usize, batch_size: usize, max_in_flight: usize) -> BatchedEngine {
    let cfg = EngineConfig::default()
        .with_workers(workers)
        .with_batch_size(batch_size)
        .with_max_in_flight(max_in_flight);
    BatchedEngine::new(&cfg).unwrap()
}

#[test]
fn never_emits_more_than_requested() -> Result<()> {
    let records = ReceiptGenerator::seeded(9).generate(3_000);
    let engine = engine(3, 16, 2);
    let limit = engine.in_flight_limit();

    let pulled = AtomicUsize::new(0);
    let started = AtomicUsize::new(0);
    let widest_gap = AtomicUsize::new(0);

    let source = records.iter().map(|r| {
        pulled.fetch_add(1, Ordering::SeqCst);
        anyhow::Ok(r)
    });
    let hook = from_fn(|_: &Receipt| {
        let before = started.fetch_add(1, Ordering::SeqCst);
        let gap = pulled.load(Ordering::SeqCst).saturating_sub(before);
        widest_gap.fetch_max(gap, Ordering::SeqCst);
        Ok(())
    });

    let done = engine.run_source(source, &ReceiptStatsFn::default(), &hook, &CancelToken::new())?;

    assert!(
        widest_gap.load(Ordering::SeqCst) <= limit,
        "producer ran {} records ahead of the workers (limit {limit})",
        widest_gap.load(Ordering::SeqCst)
    );
    assert_eq!(done.flow.emitted, records.len());
    assert!(done.flow.emitted <= done.flow.requested);
    assert_eq!(done.flow.batches_dispatched, done.flow.batches_merged);
    assert_eq!(done.output.total_orders, 3_000);
    Ok(())
}

#[test]
fn producer_failure_is_fatal() {
    let records = ReceiptGenerator::seeded(1).generate(200);
    let source = records.iter().enumerate().map(|(i, r)| {
        if i == 50 {
            Err(anyhow!("disk on fire"))
        } else {
            Ok(r)
        }
    });

    let err = engine(2, 16, 2)
        .run_source(source, &ReceiptStatsFn::default(), &NoDelay, &CancelToken::new())
        .unwrap_err();

    match err {
        PipelineError::Producer { emitted, source } => {
            assert_eq!(emitted, 50);
            assert_eq!(source.to_string(), "disk on fire");
        }
        other => panic!("expected producer failure, got {other:?}"),
    }
}

#[test]
fn worker_failure_discards_partial_results() {
    let records = ReceiptGenerator::seeded(2).generate(400);
    let poisoned = records[100].id.clone();
    let hook = from_fn(|r: &Receipt| {
        if r.id == poisoned {
            bail!("rejected {}", r.id);
        }
        Ok(())
    });

    let err = engine(4, 16, 3)
        .run(&records, &ReceiptStatsFn::default(), &hook)
        .unwrap_err();

    match err {
        PipelineError::Worker { batch, source } => {
            assert_eq!(batch, 100 / 16);
            assert_eq!(source.to_string(), format!("rejected {poisoned}"));
        }
        other => panic!("expected worker failure, got {other:?}"),
    }
}

#[test]
fn worker_panic_is_reported() {
    let records = ReceiptGenerator::seeded(3).generate(64);
    let hook = from_fn(|r: &Receipt| {
        assert!(r.id != "gen-00000010", "boom at {}", r.id);
        Ok(())
    });

    let err = engine(2, 8, 2)
        .run(&records, &ReceiptStatsFn::default(), &hook)
        .unwrap_err();

    match err {
        PipelineError::WorkerPanic { batch, message } => {
            assert_eq!(batch, 1);
            assert!(message.contains("boom at gen-00000010"), "{message}");
        }
        other => panic!("expected worker panic, got {other:?}"),
    }
}

#[mark_flaky_tests::flaky]
#[test]
fn timeout_is_distinct_from_success_and_failure() {
    let records = ReceiptGenerator::seeded(4).generate(200);
    let cfg = EngineConfig::default()
        .with_workers(1)
        .with_batch_size(4)
        .with_max_in_flight(1)
        .with_completion_timeout(Duration::from_millis(50));
    let engine = BatchedEngine::new(&cfg).unwrap();

    let started = Instant::now();
    let err = engine
        .run(&records, &ReceiptStatsFn::default(), &FixedDelay::from_millis(20))
        .unwrap_err();

    assert!(err.is_timeout(), "{err:?}");
    assert!(matches!(err, PipelineError::TimedOut(d) if d == Duration::from_millis(50)));
    assert!(started.elapsed() < Duration::from_secs(2), "cancellation did not release workers");
}

#[mark_flaky_tests::flaky]
#[test]
fn timeout_interrupts_a_long_item_delay() {
    let records = ReceiptGenerator::seeded(8).generate(16);
    let cfg = EngineConfig::default()
        .with_workers(1)
        .with_batch_size(4)
        .with_max_in_flight(1)
        .with_completion_timeout(Duration::from_millis(50));
    let engine = BatchedEngine::new(&cfg).unwrap();

    let started = Instant::now();
    let err = engine
        .run(&records, &ReceiptStatsFn::default(), &FixedDelay::from_millis(3_000))
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout(), "{err:?}");
    assert!(elapsed < Duration::from_secs(1), "run held open for {elapsed:?}");
}

#[test]
fn runner_surfaces_timeout_through_anyhow() {
    let cfg = EngineConfig::default()
        .with_workers(1)
        .with_batch_size(1)
        .with_completion_timeout(Duration::from_millis(10));
    let records = ReceiptGenerator::seeded(5).generate(50);
    let err = Runner::batched(cfg)
        .run_with_hook(&records, &FixedDelay::from_millis(5))
        .unwrap_err();
    let pipeline = err.downcast_ref::<PipelineError>().expect("typed pipeline error");
    assert!(pipeline.is_timeout());
}

#[test]
fn external_cancel_stops_the_run() {
    let records = ReceiptGenerator::seeded(6).generate(500);
    let token = CancelToken::new();
    let seen = AtomicUsize::new(0);
    let hook = from_fn(|_: &Receipt| {
        if seen.fetch_add(1, Ordering::SeqCst) == 20 {
            token.cancel();
        }
        Ok(())
    });

    let err = engine(2, 8, 2)
        .run_source(slice_source(&records), &ReceiptStatsFn::default(), &hook, &token)
        .unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled), "{err:?}");
    assert!(token.is_cancelled());
    assert!(seen.load(Ordering::SeqCst) < records.len());
}
