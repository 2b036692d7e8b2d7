//! Payment record data structures.

use std::fmt;

use serde::Deserialize;

/// Column header of the record log, in write order.
pub const LOG_HEADER: [&str; 8] = [
    "Facility Name",
    "Category",
    "District",
    "Amount Paid",
    "Claim Month",
    "Payment Date",
    "Page",
    "Hash",
];

/// Facility category derived from the facility name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Chps,
    Polyclinic,
    Clinic,
    HealthCentre,
    MedicalCentre,
    Hospital,
    WellnessCentre,
    MaternityHome,
    Unknown,
}

impl Category {
    /// Label written to the record log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Chps => "CHPS",
            Category::Polyclinic => "Polyclinic",
            Category::Clinic => "Clinic",
            Category::HealthCentre => "Health Centre",
            Category::MedicalCentre => "Medical Centre",
            Category::Hospital => "Hospital",
            Category::WellnessCentre => "Wellness Centre",
            Category::MaternityHome => "Maternity Home",
            Category::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One payment line item observed on the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Facility name, trimmed
    pub facility_name: String,

    /// Category derived from the facility name
    pub category: Category,

    /// District as shown
    pub district: String,

    /// Amount paid
    pub amount_paid: f64,

    /// `01/MM/YYYY`, or empty when the claim month could not be read
    pub claim_month: String,

    /// Payment date as shown
    pub payment_date: String,

    /// Page the record was observed on (1-based)
    pub page_number: u32,

    /// Dedup key, see `services::normalize::compute_fingerprint`
    pub fingerprint: String,
}

impl Record {
    /// Render the record as a log row matching [`LOG_HEADER`].
    pub fn to_row(&self) -> [String; 8] {
        [
            self.facility_name.clone(),
            self.category.to_string(),
            self.district.clone(),
            format!("{:.2}", self.amount_paid),
            self.claim_month.clone(),
            self.payment_date.clone(),
            self.page_number.to_string(),
            self.fingerprint.clone(),
        ]
    }
}

/// The two columns needed to resume: read back from every log row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "Page")]
    pub page_number: u32,

    #[serde(rename = "Hash")]
    pub fingerprint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_follows_header_order() {
        let record = Record {
            facility_name: "Tema General Hospital".to_string(),
            category: Category::Hospital,
            district: "Tema Metro".to_string(),
            amount_paid: 1520.5,
            claim_month: "01/12/2024".to_string(),
            payment_date: "15/01/2025".to_string(),
            page_number: 7,
            fingerprint: "Tema15205015012025".to_string(),
        };

        let row = record.to_row();
        assert_eq!(row.len(), LOG_HEADER.len());
        assert_eq!(row[1], "Hospital");
        assert_eq!(row[3], "1520.50");
        assert_eq!(row[6], "7");
        assert_eq!(row[7], "Tema15205015012025");
    }

    #[test]
    fn category_labels() {
        assert_eq!(Category::HealthCentre.to_string(), "Health Centre");
        assert_eq!(Category::Chps.as_str(), "CHPS");
    }
}
