//! Output ordering of result rows.

use crate::models::ResultRow;
use std::cmp::Ordering;

/// Output order: date, value, measure, then border, all descending.
pub fn compare_rows(a: &ResultRow, b: &ResultRow) -> Ordering {
    b.at.cmp(&a.at)
        .then_with(|| b.value.cmp(&a.value))
        .then_with(|| b.measure.cmp(&a.measure))
        .then_with(|| b.border.cmp(&a.border))
}

/// Sort rows into output order. Full ties keep their relative order.
pub fn rank(rows: &mut [ResultRow]) {
    rows.sort_by(compare_rows);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, m, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn row(border: &str, m: u32, measure: &str, value: u64) -> ResultRow {
        ResultRow {
            border: border.to_string(),
            date: format!("01/{:02}/2019", m),
            measure: measure.to_string(),
            value,
            average: 0,
            at: at(m),
        }
    }

    fn order(rows: &[ResultRow]) -> Vec<(String, String, u64)> {
        rows.iter()
            .map(|r| (r.date.clone(), r.measure.clone(), r.value))
            .collect()
    }

    #[test]
    fn test_later_date_first() {
        let mut rows = vec![row("B", 2, "Trucks", 900), row("B", 3, "Trucks", 1)];
        rank(&mut rows);
        assert_eq!(rows[0].at, at(3));

        let mut flipped = vec![row("B", 3, "Trucks", 1), row("B", 2, "Trucks", 900)];
        rank(&mut flipped);
        assert_eq!(rows, flipped);
    }

    #[test]
    fn test_larger_value_first_on_equal_dates() {
        let mut rows = vec![row("B", 3, "Trucks", 5), row("B", 3, "Buses", 50)];
        rank(&mut rows);
        assert_eq!(rows[0].value, 50);
    }

    #[test]
    fn test_measure_then_border_descending() {
        let mut rows = vec![
            row("US-Canada Border", 3, "Buses", 5),
            row("US-Canada Border", 3, "Trucks", 5),
            row("US-Mexico Border", 3, "Buses", 5),
        ];
        rank(&mut rows);

        assert_eq!(rows[0].measure, "Trucks");
        assert_eq!(rows[1].border, "US-Mexico Border");
        assert_eq!(rows[2].border, "US-Canada Border");
    }

    #[test]
    fn test_date_compares_chronologically_not_textually() {
        // "01/12/2018" sorts after "01/02/2019" as text but is older.
        let mut older = row("B", 12, "Trucks", 1);
        older.at = NaiveDate::from_ymd_opt(2018, 12, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        older.date = "01/12/2018".to_string();
        let mut rows = vec![older, row("B", 2, "Trucks", 1)];
        rank(&mut rows);

        assert_eq!(
            order(&rows),
            vec![
                ("01/02/2019".to_string(), "Trucks".to_string(), 1),
                ("01/12/2018".to_string(), "Trucks".to_string(), 1),
            ]
        );
    }
}
