use anyhow::Result;
use receiptflow::testing::*;
use receiptflow::*;

#[test]
fn ties_resolve_the_same_way_in_every_mode() -> Result<()> {
    // Every customer spends exactly 12.0 over one order, so only names decide.
    let names = ["Hal", "Ada", "Kay", "Bea", "Eve", "Dan", "Cat", "Gus"];
    let records: Vec<_> = names
        .iter()
        .enumerate()
        .map(|(i, first)| {
            ReceiptBuilder::new(format!("t{i}"))
                .customer(*first, "Tie")
                .item("pencil", 3, 4.0)
                .build()
        })
        .collect();

    let cfg = EngineConfig::default()
        .with_min_batch_size(1)
        .with_batch_size(3)
        .with_workers(4);
    for mode in ExecMode::ALL {
        let stats = Runner::new(mode, cfg.clone()).run(&records)?;
        let spenders: Vec<_> = stats
            .top_customers_by_spending
            .iter()
            .map(|c| c.customer_name.as_str())
            .collect();
        assert_eq!(spenders, ["Ada Tie", "Bea Tie", "Cat Tie", "Dan Tie", "Eve Tie"], "{mode:?}");
        assert_eq!(stats.top_customers_by_order_count[0].customer_name, "Ada Tie");
        assert_eq!(stats.unique_customers, 8);
    }
    Ok(())
}

#[test]
fn items_rank_by_quantity_then_revenue_then_name() -> Result<()> {
    let records = vec![
        ReceiptBuilder::new("a").item("bolt", 4, 1.0).item("nut", 4, 1.0).build(),
        ReceiptBuilder::new("b").item("gear", 4, 3.0).item("axle", 1, 50.0).build(),
    ];
    let stats = Runner::sequential().run(&records)?;
    let order: Vec<_> = stats
        .top_items_by_quantity
        .iter()
        .map(|i| i.item_name.as_str())
        .collect();
    assert_eq!(order, ["gear", "bolt", "nut", "axle"]);
    Ok(())
}

#[test]
fn multi_unit_average_lists_every_qualifying_item() -> Result<()> {
    let mut records = Vec::new();
    for i in 0..10 {
        records.push(
            ReceiptBuilder::new(format!("m{i}"))
                .item(format!("item-{i}"), 2, 1.0)
                .item("filler", 1, f64::from(i))
                .build(),
        );
    }
    let stats = Runner::sequential().run(&records)?;

    // More than the top-N limit: this list is never truncated.
    assert_eq!(stats.item_average_receipts.len(), 10);
    assert_eq!(stats.item_average_receipts[0].item_name, "item-9");
    assert!(relative_eq(stats.item_average_receipts[0].average_receipt_amount, 11.0, 1e-12));
    assert!(stats.item_average_receipts.iter().all(|e| e.item_name != "filler"));
    Ok(())
}

#[test]
fn status_ranking_carries_average_order_value() -> Result<()> {
    let records = vec![
        ReceiptBuilder::new("p1").status(ReceiptStatus::Paid).item("x", 1, 10.0).build(),
        ReceiptBuilder::new("p2").status(ReceiptStatus::Paid).item("x", 1, 30.0).build(),
        ReceiptBuilder::new("r1").status(ReceiptStatus::Refunded).item("x", 1, 40.0).build(),
    ];
    let stats = Runner::sequential().run(&records)?;
    let ranking = &stats.revenue_by_status_ranking;
    assert_eq!(ranking[0].status, ReceiptStatus::Paid);
    assert_eq!(ranking[0].orders_count, 2);
    assert!(relative_eq(ranking[0].average_order_value, 20.0, 1e-12));
    assert_eq!(ranking[1].status, ReceiptStatus::Refunded);
    Ok(())
}
