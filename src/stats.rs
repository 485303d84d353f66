use statrs::statistics::Statistics;
use crate::matrix::MarginMatrix;
use crate::model::{CustomerSize, CustomerType, SalesRecord};
use std::collections::HashMap;

/// Mean margin % per (customer type, customer size). Combinations with no
/// records stay undefined rather than zero.
pub fn build_actual_matrix<'a, I>(records: I) -> MarginMatrix
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    let mut map: HashMap<(CustomerType, CustomerSize), Vec<f64>> = HashMap::new();

    for rec in records {
        map.entry((rec.customer_type, rec.customer_size))
            .or_default()
            .push(rec.margin_pct);
    }

    MarginMatrix::from_fn(|ctype, csize| match map.get(&(ctype, csize)) {
        Some(margins) if !margins.is_empty() => Some(margins.mean()),
        _ => None,
    })
}

/// Record count per cell, used for tooltips and the table view.
pub fn count_matrix<'a, I>(records: I) -> [[usize; 5]; 5]
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    let mut counts = [[0usize; 5]; 5];
    for rec in records {
        counts[rec.customer_type.index()][rec.customer_size.index()] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(ctype: CustomerType, csize: CustomerSize, sell: f64, cost: f64) -> SalesRecord {
        SalesRecord {
            customer_type: ctype,
            customer_size: csize,
            sell_price: sell,
            item_cost: cost,
            margin_pct: (sell - cost) / sell * 100.0,
            supplier_name: "Acme".into(),
            discount_group: "100".into(),
        }
    }

    #[test]
    fn mean_per_cell() {
        let records = vec![
            rec(CustomerType::Jobber, CustomerSize::Small, 100.0, 55.0),
            rec(CustomerType::Jobber, CustomerSize::Small, 100.0, 65.0),
            rec(CustomerType::User, CustomerSize::Huge, 200.0, 100.0),
        ];
        let m = build_actual_matrix(&records);

        let js = m.get(CustomerType::Jobber, CustomerSize::Small).unwrap();
        assert!((js - 40.0).abs() < 1e-9);
        let uh = m.get(CustomerType::User, CustomerSize::Huge).unwrap();
        assert!((uh - 50.0).abs() < 1e-9);
    }

    #[test]
    fn empty_cells_are_undefined_not_zero() {
        let records = vec![rec(CustomerType::Tp, CustomerSize::Tiny, 10.0, 9.0)];
        let m = build_actual_matrix(&records);
        assert_eq!(m.defined_count(), 1);
        assert_eq!(m.get(CustomerType::IndOem, CustomerSize::Huge), None);
    }

    #[test]
    fn no_records_gives_all_undefined() {
        let m = build_actual_matrix(&Vec::<SalesRecord>::new());
        assert!(m.is_all_undefined());
    }

    #[test]
    fn counts_follow_records() {
        let records = vec![
            rec(CustomerType::Jobber, CustomerSize::Small, 100.0, 55.0),
            rec(CustomerType::Jobber, CustomerSize::Small, 100.0, 65.0),
        ];
        let counts = count_matrix(&records);
        assert_eq!(counts[CustomerType::Jobber.index()][CustomerSize::Small.index()], 2);
        assert_eq!(counts.iter().flatten().sum::<usize>(), 2);
    }
}
