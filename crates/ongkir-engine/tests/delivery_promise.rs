use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ongkir_engine::shipping::{
    DeliveryPromiseEngine, EtaRange, InMemoryCalendar, InMemoryCutoffs, InMemoryDeliveryHistory,
    PromiseConfidence,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, d).expect("valid date")
}

fn new_year_afternoon() -> NaiveDateTime {
    day(1).and_hms_opt(16, 30, 0).expect("valid timestamp")
}

/// Jakarta closes at 15:00, one closed day falls inside the window, and ten
/// past jne REG deliveries each ran `delay_days` late.
fn engine(delay_days: u64) -> DeliveryPromiseEngine {
    let cutoffs = InMemoryCutoffs::new()
        .with_cutoff(1, NaiveTime::from_hms_opt(15, 0, 0).expect("valid time"));
    let calendar = InMemoryCalendar::new().with_closed_day(day(3));
    let history = InMemoryDeliveryHistory::new();
    for _ in 0..10 {
        let delivered = day(10)
            .checked_add_days(chrono::Days::new(delay_days))
            .expect("valid date");
        history
            .record("jne", "REG", day(10), delivered)
            .expect("delivery recorded");
    }

    DeliveryPromiseEngine::new(Arc::new(cutoffs), Arc::new(calendar), Arc::new(history))
}

#[test]
fn late_order_stacks_cutoff_calendar_and_sla() {
    let promise = engine(1).build_promise("jne", "REG", "2-3 hari", 1, new_year_afternoon());

    assert_eq!((promise.eta_min_days, promise.eta_max_days), (5, 6));
    assert_eq!(promise.eta_label, "5-6 hari");
    assert_eq!(promise.baseline_eta_label, "2-3 hari");
    assert_eq!(promise.confidence, PromiseConfidence::Low);
    assert_eq!(
        promise.reasons,
        vec![
            "ETA dasar kurir: 2-3 hari",
            "Pesanan masuk setelah jam cutoff gudang.",
            "+1 hari karena hari libur operasional.",
            "Koreksi riwayat SLA +1 hari (n=10).",
        ]
    );
}

#[test]
fn two_day_history_delay_pushes_window_further() {
    let promise = engine(2).build_promise("jne", "REG", "2-3 hari", 1, new_year_afternoon());

    assert_eq!(promise.eta_label, "6-7 hari");
    assert_eq!(promise.confidence, PromiseConfidence::Low);
    assert_eq!(promise.reasons.len(), 4);
}

#[test]
fn other_services_ignore_foreign_history() {
    let morning = day(1).and_hms_opt(9, 0, 0).expect("valid timestamp");
    let promise = engine(2).build_promise("sicepat", "REG", "1-2 hari", 1, morning);

    // The closed day on the 3rd still sits inside a two-day window.
    assert_eq!(promise.eta_label, "2-3 hari");
    assert_eq!(promise.confidence, PromiseConfidence::Low);
}

#[test]
fn single_number_label_is_a_fixed_window() {
    let parsed = EtaRange::parse("Estimasi 4 hari");
    assert_eq!((parsed.min_days, parsed.max_days), (4, 4));

    let morning = day(5).and_hms_opt(8, 0, 0).expect("valid timestamp");
    let promise = DeliveryPromiseEngine::default().build_promise(
        "pos",
        "Kilat",
        "Estimasi 4 hari",
        9,
        morning,
    );
    assert_eq!(promise.eta_label, "4 hari");
}
