use anyhow::Result;
use receiptflow::testing::*;
use receiptflow::*;

fn mixed_records() -> Vec<Receipt> {
    let mut records = ReceiptGenerator::seeded(2024).generate(2_000);
    records.extend(malformed_receipts());
    records.extend(sample_receipts());
    records
}

#[test]
fn parallel_matches_sequential_for_any_min_batch() -> Result<()> {
    let records = mixed_records();
    let expected = Runner::sequential().run(&records)?;

    for workers in [1, 4] {
        for min in [1, 2, 7, 100, 256, 10_000] {
            let cfg = EngineConfig::default()
                .with_workers(workers)
                .with_min_batch_size(min);
            let actual = Runner::parallel(cfg).run(&records)?;
            assert_statistics_close(&actual, &expected, 1e-9);
        }
    }
    Ok(())
}

#[test]
fn batched_matches_sequential_for_any_batch_shape() -> Result<()> {
    let records = mixed_records();
    let expected = Runner::sequential().run(&records)?;

    for workers in [1, 3] {
        for batch_size in [1, 16, 256, 5_000] {
            for max_in_flight in [1, 4] {
                let cfg = EngineConfig::default()
                    .with_workers(workers)
                    .with_batch_size(batch_size)
                    .with_max_in_flight(max_in_flight);
                let actual = Runner::batched(cfg).run(&records)?;
                assert_statistics_close(&actual, &expected, 1e-9);
            }
        }
    }
    Ok(())
}

#[test]
fn merge_is_associative_across_partitions() -> Result<()> {
    let records = mixed_records();
    let expected = records.iter().collect::<ReceiptAccumulator>().finalize();

    for cuts in [vec![0], vec![1, 2, 3], vec![17, 999, 1_000, 1_500], vec![2_000]] {
        let mut parts = Vec::new();
        let mut start = 0;
        for &cut in cuts.iter().chain(std::iter::once(&records.len())) {
            parts.push(records[start..cut].iter().collect::<ReceiptAccumulator>());
            start = cut;
        }

        let left = parts
            .iter()
            .cloned()
            .fold(ReceiptAccumulator::empty(), ReceiptAccumulator::merged);
        let right = parts
            .iter()
            .rev()
            .cloned()
            .fold(ReceiptAccumulator::empty(), |acc, p| p.merged(acc));
        let shuffled = parts
            .iter()
            .skip(1)
            .step_by(2)
            .chain(parts.iter().step_by(2))
            .cloned()
            .fold(ReceiptAccumulator::empty(), ReceiptAccumulator::merged);

        for merged in [left, right, shuffled] {
            assert_eq!(merged.receipt_count(), expected.total_orders);
            assert_statistics_close(&merged.finalize(), &expected, 1e-9);
        }
    }
    Ok(())
}

#[test]
fn engines_agree_with_custom_top_n() -> Result<()> {
    let records = ReceiptGenerator::seeded(8).generate(600);
    let cfg = EngineConfig::default()
        .with_top_n(2)
        .with_min_batch_size(10)
        .with_batch_size(32);
    let expected = Runner::new(ExecMode::Sequential, cfg.clone()).run(&records)?;
    assert_eq!(expected.top_customers_by_spending.len(), 2);
    for mode in [ExecMode::Parallel, ExecMode::Batched] {
        let actual = Runner::new(mode, cfg.clone()).run(&records)?;
        assert_statistics_close(&actual, &expected, 1e-9);
    }
    Ok(())
}
