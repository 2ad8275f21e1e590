use chrono::NaiveDate;
use croquettes_shop::entity::subscriptions::Frequency;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn weekly_and_biweekly_add_days() {
    assert_eq!(
        Frequency::Weekly.next_after(date(2025, 3, 28)),
        Some(date(2025, 4, 4))
    );
    assert_eq!(
        Frequency::Biweekly.next_after(date(2025, 12, 25)),
        Some(date(2026, 1, 8))
    );
}

#[test]
fn monthly_keeps_the_day_of_month() {
    assert_eq!(
        Frequency::Monthly.next_after(date(2025, 5, 15)),
        Some(date(2025, 6, 15))
    );
}

#[test]
fn monthly_clamps_to_end_of_shorter_months() {
    assert_eq!(
        Frequency::Monthly.next_after(date(2025, 1, 31)),
        Some(date(2025, 2, 28))
    );
    assert_eq!(
        Frequency::Monthly.next_after(date(2024, 1, 31)),
        Some(date(2024, 2, 29))
    );
}

#[test]
fn frequency_uses_snake_case_on_the_wire() {
    assert_eq!(
        serde_json::to_value(Frequency::Biweekly).expect("serialize"),
        serde_json::json!("biweekly")
    );
}
