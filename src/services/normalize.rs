// src/services/normalize.rs

//! Normalization of raw grid cells into records.
//!
//! Everything here is pure: the same cell text always yields the same record
//! and, in particular, byte-identical fingerprints.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Category, Record};
use crate::utils::digits_only;

/// Number of `td` cells in a payment row.
pub const ROW_CELLS: usize = 5;

static CLAIM_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)[.\s\-]*(\d{4}|\d{2})(?:\D|$)",
    )
    .expect("claim month pattern is valid")
});

/// Ordered category rules; the first match wins.
static CATEGORY_RULES: LazyLock<Vec<(Regex, Category)>> = LazyLock::new(|| {
    [
        (r"\bchps\b", Category::Chps),
        (r"\bpoly\w*", Category::Polyclinic),
        (r"\bclinic\w*", Category::Clinic),
        (r"\bhealth\b", Category::HealthCentre),
        (r"\bmedical\b", Category::MedicalCentre),
        (r"\bhospital\b", Category::Hospital),
        (r"\bwellness\b", Category::WellnessCentre),
        (r"\bmaternity\b", Category::MaternityHome),
    ]
    .into_iter()
    .map(|(pattern, category)| {
        let regex = Regex::new(pattern).expect("category pattern is valid");
        (regex, category)
    })
    .collect()
});

fn month_number(name: &str) -> Option<&'static str> {
    let month = match name.get(..3)?.to_ascii_lowercase().as_str() {
        "jan" => "01",
        "feb" => "02",
        "mar" => "03",
        "apr" => "04",
        "may" => "05",
        "jun" => "06",
        "jul" => "07",
        "aug" => "08",
        "sep" => "09",
        "oct" => "10",
        "nov" => "11",
        "dec" => "12",
        _ => return None,
    };
    Some(month)
}

/// Read a claim month such as `"Dec.24"` or `"December 2023"` as
/// `"01/MM/YYYY"`. Returns an empty string when no month/year is present.
pub fn parse_claim_month(raw: &str) -> String {
    let Some(caps) = CLAIM_MONTH.captures(raw) else {
        return String::new();
    };
    let Some(month) = month_number(&caps[1]) else {
        return String::new();
    };
    let year = &caps[2];
    if year.len() == 4 {
        format!("01/{month}/{year}")
    } else {
        format!("01/{month}/20{year}")
    }
}

/// Classify a facility by the first matching rule, in fixed priority order.
pub fn classify_category(facility_name: &str) -> Category {
    let lowered = facility_name.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(regex, _)| regex.is_match(&lowered))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Unknown)
}

/// Parse an amount cell, ignoring thousands separators, currency markers and
/// whitespace.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|amount| amount.is_finite())
}

/// Build the dedup key: first word of the facility name, the amount in minor
/// units, then the digits of the payment date.
///
/// District, claim month and page are deliberately not part of the key.
pub fn compute_fingerprint(facility_name: &str, amount_paid: f64, payment_date: &str) -> String {
    let first_token = facility_name.split_whitespace().next().unwrap_or("");
    let minor_units = (amount_paid * 100.0).round() as i64;
    format!("{}{}{}", first_token, minor_units, digits_only(payment_date))
}

/// Turn the five cells of a grid row into a record.
///
/// Returns `None` for rows that are not payment rows: wrong cell count, empty
/// facility name, or an amount that cannot be read.
pub fn build_record(cells: &[String], page_number: u32) -> Option<Record> {
    if cells.len() != ROW_CELLS {
        log::debug!(
            "Skipping row with {} cells on page {}",
            cells.len(),
            page_number
        );
        return None;
    }

    let facility_name = cells[0].trim();
    if facility_name.is_empty() {
        log::debug!("Skipping row without facility name on page {}", page_number);
        return None;
    }

    let Some(amount_paid) = parse_amount(&cells[2]) else {
        log::debug!(
            "Skipping row for '{}' on page {}: unreadable amount '{}'",
            facility_name,
            page_number,
            cells[2]
        );
        return None;
    };

    let category = classify_category(facility_name);
    if category == Category::Unknown {
        log::debug!("No category for '{}'", facility_name);
    }

    let claim_month = parse_claim_month(&cells[3]);
    if claim_month.is_empty() {
        log::debug!(
            "Unparseable claim month '{}' for '{}'",
            cells[3],
            facility_name
        );
    }

    let payment_date = cells[4].trim().to_string();
    let fingerprint = compute_fingerprint(facility_name, amount_paid, &payment_date);

    Some(Record {
        facility_name: facility_name.to_string(),
        category,
        district: cells[1].trim().to_string(),
        amount_paid,
        claim_month,
        payment_date,
        page_number,
        fingerprint,
    })
}
