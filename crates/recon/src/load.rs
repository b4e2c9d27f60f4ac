use std::path::Path;

use log::{debug, warn};
use serde::de::DeserializeOwned;

use crate::error::ReconError;
use crate::model::ReconInput;

/// Read canonical-header CSV into raw rows. Headers must already use the
/// canonical column names; cells stay text so malformed values can be
/// reported per record later.
pub fn read_rows<T: DeserializeOwned>(csv_data: &str) -> Result<Vec<T>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv_data.as_bytes());

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

pub fn read_rows_from_path<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ReconError> {
    let text = std::fs::read_to_string(path)?;
    let rows = read_rows(&text)?;
    debug!("read {} row(s) from {}", rows.len(), path.display());
    Ok(rows)
}

fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ReconError> {
    if !path.exists() {
        warn!("{} not found, treating the source as empty", path.display());
        return Ok(Vec::new());
    }
    read_rows_from_path(path)
}

/// Load `trips.csv`, `payments.csv`, `bank.csv` and `receipts.csv` from a
/// directory. A missing file yields an empty table, which the engine reports
/// as an unavailable source.
pub fn load_input_dir(dir: &Path) -> Result<ReconInput, ReconError> {
    Ok(ReconInput {
        trips: read_optional(&dir.join("trips.csv"))?,
        payments: read_optional(&dir.join("payments.csv"))?,
        bank: read_optional(&dir.join("bank.csv"))?,
        receipts: read_optional(&dir.join("receipts.csv"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PaymentRow, TripRow};

    #[test]
    fn empty_cells_are_absent() {
        let csv = "\
claim_id,trip_id,reported_at,description,fare,tip,instant_pay_fee
c1,t1,2025-09-01 22:49:20 CDT,Trip,10.00,,0.85
c2,,2025-09-02,Quest,,,
";
        let rows: Vec<PaymentRow> = read_rows(csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fare.as_deref(), Some("10.00"));
        assert_eq!(rows[0].tip, None);
        assert_eq!(rows[1].trip_id, None);
        // Columns absent from the header default to None.
        assert_eq!(rows[1].refund_toll, None);
    }

    #[test]
    fn missing_required_column_is_csv_error() {
        let csv = "trip_id,status\nt1,completed\n";
        let err = read_rows::<TripRow>(csv).unwrap_err();
        assert!(matches!(err, ReconError::Csv(_)));
    }

    #[test]
    fn directory_with_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("trips.csv"),
            "trip_id,completed_at,pickup,dropoff,distance,status\nt1,2025-09-01 08:00:00,A,B,2.5,completed\n",
        )
        .unwrap();
        let input = load_input_dir(dir.path()).unwrap();
        assert_eq!(input.trips.len(), 1);
        assert!(input.payments.is_empty());
        assert!(input.bank.is_empty());
        assert!(input.receipts.is_empty());
    }
}
