use serde::{Deserialize, Deserializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CustomerType {
    IndOem,
    MobOem,
    Jobber,
    User,
    Tp,
}

impl CustomerType {
    /// Matrix row order.
    pub const ALL: [CustomerType; 5] = [
        CustomerType::IndOem,
        CustomerType::MobOem,
        CustomerType::Jobber,
        CustomerType::User,
        CustomerType::Tp,
    ];

    pub fn code(self) -> &'static str {
        match self {
            CustomerType::IndOem => "IND_OEM",
            CustomerType::MobOem => "MOB_OEM",
            CustomerType::Jobber => "JOBBER",
            CustomerType::User => "USER",
            CustomerType::Tp => "TP",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CustomerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CustomerSize {
    Huge,
    Large,
    Med,
    Small,
    Tiny,
}

impl CustomerSize {
    /// Matrix column order.
    pub const ALL: [CustomerSize; 5] = [
        CustomerSize::Huge,
        CustomerSize::Large,
        CustomerSize::Med,
        CustomerSize::Small,
        CustomerSize::Tiny,
    ];

    pub fn code(self) -> &'static str {
        match self {
            CustomerSize::Huge => "HUGE",
            CustomerSize::Large => "LARGE",
            CustomerSize::Med => "MED",
            CustomerSize::Small => "SMALL",
            CustomerSize::Tiny => "TINY",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CustomerSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Splits a `price_library_id` such as `IND_OEM_SMALL` into its customer type
/// and size. The size is the final `_<SIZE>` suffix, the type is everything in
/// front of it and must be one of the known types.
pub fn classify(price_library_id: &str) -> Option<(CustomerType, CustomerSize)> {
    CustomerSize::ALL.into_iter().find_map(|size| {
        let prefix = price_library_id.strip_suffix(size.code())?.strip_suffix('_')?;
        CustomerType::from_code(prefix).map(|ctype| (ctype, size))
    })
}

/// `None` when the sell price is zero: a zero denominator has no meaningful
/// percentage.
pub fn margin_pct(sell_price: f64, item_cost: f64) -> Option<f64> {
    if sell_price == 0.0 {
        return None;
    }
    Some((sell_price - item_cost) / sell_price * 100.0)
}

/// A typed cell from a JSON value or a spreadsheet. CSV fields always arrive
/// as `Text` so their spelling survives (`007` stays `007`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse().ok(),
            Cell::Bool(_) => None,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }
}

fn deserialize_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let cell = Option::<Cell>::deserialize(deserializer)?;
    Ok(cell.and_then(|c| c.as_f64()))
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let cell = Option::<Cell>::deserialize(deserializer)?;
    Ok(cell.map(|c| c.as_text()))
}

/// One sales-order row as it arrives from a file or the sales API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "Sell Price", default, deserialize_with = "deserialize_number")]
    pub sell_price: Option<f64>,
    #[serde(rename = "Item Cost", default, deserialize_with = "deserialize_number")]
    pub item_cost: Option<f64>,
    #[serde(rename = "price_library_id", default, deserialize_with = "deserialize_text")]
    pub price_library_id: Option<String>,
    #[serde(rename = "Supplier Name", default, deserialize_with = "deserialize_text")]
    pub supplier_name: Option<String>,
    #[serde(rename = "Sales Discount Group", default, deserialize_with = "deserialize_text")]
    pub discount_group: Option<String>,
}

impl RawRecord {
    /// Builds a row from cells given in `REQUIRED_COLUMNS` order.
    pub fn from_cells(cells: [Option<Cell>; 5]) -> Self {
        let [sell_price, item_cost, price_library_id, supplier_name, discount_group] = cells;
        RawRecord {
            sell_price: sell_price.and_then(|c| c.as_f64()),
            item_cost: item_cost.and_then(|c| c.as_f64()),
            price_library_id: price_library_id.map(|c| c.as_text()),
            supplier_name: supplier_name.map(|c| c.as_text()),
            discount_group: discount_group.map(|c| c.as_text()),
        }
    }
}

pub const REQUIRED_COLUMNS: [&str; 5] = [
    "Sell Price",
    "Item Cost",
    "price_library_id",
    "Supplier Name",
    "Sales Discount Group",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectReason {
    MissingSellPrice,
    NegativeSellPrice,
    ZeroSellPrice,
    MissingItemCost,
    NegativeItemCost,
    MissingIdentifier,
    UnparseableIdentifier,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::MissingSellPrice => "missing sell price",
            RejectReason::NegativeSellPrice => "negative sell price",
            RejectReason::ZeroSellPrice => "zero sell price",
            RejectReason::MissingItemCost => "missing item cost",
            RejectReason::NegativeItemCost => "negative item cost",
            RejectReason::MissingIdentifier => "missing price_library_id",
            RejectReason::UnparseableIdentifier => "unparseable price_library_id",
        };
        f.write_str(text)
    }
}

/// A validated, classified row. Only these take part in aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub customer_type: CustomerType,
    pub customer_size: CustomerSize,
    pub sell_price: f64,
    pub item_cost: f64,
    pub margin_pct: f64,
    pub supplier_name: String,
    pub discount_group: String,
}

impl SalesRecord {
    pub fn from_raw(raw: &RawRecord) -> Result<Self, RejectReason> {
        let sell_price = match raw.sell_price {
            None => return Err(RejectReason::MissingSellPrice),
            Some(p) if p.is_nan() => return Err(RejectReason::MissingSellPrice),
            Some(p) if p < 0.0 => return Err(RejectReason::NegativeSellPrice),
            Some(p) => p,
        };
        let item_cost = match raw.item_cost {
            None => return Err(RejectReason::MissingItemCost),
            Some(c) if c.is_nan() => return Err(RejectReason::MissingItemCost),
            Some(c) if c < 0.0 => return Err(RejectReason::NegativeItemCost),
            Some(c) => c,
        };
        let id = match raw.price_library_id.as_deref() {
            None | Some("") => return Err(RejectReason::MissingIdentifier),
            Some(id) => id,
        };
        let (customer_type, customer_size) =
            classify(id).ok_or(RejectReason::UnparseableIdentifier)?;
        let margin_pct = margin_pct(sell_price, item_cost).ok_or(RejectReason::ZeroSellPrice)?;

        Ok(SalesRecord {
            customer_type,
            customer_size,
            sell_price,
            item_cost,
            margin_pct,
            supplier_name: raw.supplier_name.clone().unwrap_or_default(),
            discount_group: raw.discount_group.clone().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, sell: Option<f64>, cost: Option<f64>) -> RawRecord {
        RawRecord {
            sell_price: sell,
            item_cost: cost,
            price_library_id: Some(id.to_string()),
            supplier_name: Some("Acme".to_string()),
            discount_group: Some("100".to_string()),
        }
    }

    #[test]
    fn classify_splits_on_final_size_suffix() {
        assert_eq!(classify("JOBBER_SMALL"), Some((CustomerType::Jobber, CustomerSize::Small)));
        assert_eq!(classify("IND_OEM_HUGE"), Some((CustomerType::IndOem, CustomerSize::Huge)));
        assert_eq!(classify("MOB_OEM_TINY"), Some((CustomerType::MobOem, CustomerSize::Tiny)));
        assert_eq!(classify("TP_MED"), Some((CustomerType::Tp, CustomerSize::Med)));
    }

    #[test]
    fn classify_rejects_unknown_shapes() {
        assert_eq!(classify("JOBBER"), None);
        assert_eq!(classify("JOBBER_XL"), None);
        assert_eq!(classify("_SMALL"), None);
        assert_eq!(classify("RETAIL_SMALL"), None);
        assert_eq!(classify("jobber_small"), None);
        assert_eq!(classify("JOBBER_SMALL_X"), None);
        // Prefix up to the final suffix must itself be a known type.
        assert_eq!(classify("JOBBER_SMALL_SMALL"), None);
    }

    #[test]
    fn margin_example() {
        let m = margin_pct(100.0, 55.0).unwrap();
        assert!((m - 45.0).abs() < 1e-9);
    }

    #[test]
    fn margin_never_exceeds_one_hundred() {
        for (sell, cost) in [(1.0, 0.0), (10.0, 3.0), (5.0, 50.0), (0.01, 0.0)] {
            let m = margin_pct(sell, cost).unwrap();
            assert!(m <= 100.0);
            assert!((m - (sell - cost) / sell * 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_sell_price_has_no_margin() {
        assert_eq!(margin_pct(0.0, 10.0), None);
        let err = SalesRecord::from_raw(&raw("JOBBER_SMALL", Some(0.0), Some(1.0))).unwrap_err();
        assert_eq!(err, RejectReason::ZeroSellPrice);
    }

    #[test]
    fn from_raw_reports_first_failing_field() {
        let cases = [
            (raw("JOBBER_SMALL", None, Some(1.0)), RejectReason::MissingSellPrice),
            (raw("JOBBER_SMALL", Some(-1.0), Some(1.0)), RejectReason::NegativeSellPrice),
            (raw("JOBBER_SMALL", Some(10.0), None), RejectReason::MissingItemCost),
            (raw("JOBBER_SMALL", Some(10.0), Some(-2.0)), RejectReason::NegativeItemCost),
            (raw("", Some(10.0), Some(2.0)), RejectReason::MissingIdentifier),
            (raw("JOBBER_BIG", Some(10.0), Some(2.0)), RejectReason::UnparseableIdentifier),
        ];
        for (row, expected) in cases {
            assert_eq!(SalesRecord::from_raw(&row).unwrap_err(), expected);
        }
    }

    #[test]
    fn from_raw_classifies_valid_row() {
        let rec = SalesRecord::from_raw(&raw("JOBBER_SMALL", Some(100.0), Some(55.0))).unwrap();
        assert_eq!(rec.customer_type, CustomerType::Jobber);
        assert_eq!(rec.customer_size, CustomerSize::Small);
        assert!((rec.margin_pct - 45.0).abs() < 1e-9);
        assert_eq!(rec.supplier_name, "Acme");
    }

    #[test]
    fn raw_record_accepts_numbers_and_text() {
        let json = r#"[
            {"Sell Price": 100, "Item Cost": "55.5", "price_library_id": "USER_LARGE",
             "Supplier Name": "Acme", "Sales Discount Group": 120},
            {"Sell Price": null, "Item Cost": "n/a", "price_library_id": "USER_LARGE"}
        ]"#;
        let rows: Vec<RawRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(rows[0].sell_price, Some(100.0));
        assert_eq!(rows[0].item_cost, Some(55.5));
        assert_eq!(rows[0].discount_group.as_deref(), Some("120"));
        assert_eq!(rows[1].sell_price, None);
        assert_eq!(rows[1].item_cost, None);
        assert_eq!(rows[1].supplier_name, None);
    }

    #[test]
    fn json_booleans_are_not_numbers() {
        let json = r#"[{"Sell Price": true, "Item Cost": 1, "price_library_id": "TP_MED",
                        "Supplier Name": "Acme", "Sales Discount Group": false}]"#;
        let rows: Vec<RawRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(rows[0].sell_price, None);
        assert_eq!(rows[0].discount_group.as_deref(), Some("false"));
    }

    #[test]
    fn text_cells_keep_their_spelling() {
        let text = |s: &str| Some(Cell::Text(s.to_string()));
        let row = RawRecord::from_cells([text("100"), text(" 55 "), text("TP_MED"), text("0042"), text("007")]);
        assert_eq!(row.sell_price, Some(100.0));
        assert_eq!(row.item_cost, Some(55.0));
        assert_eq!(row.supplier_name.as_deref(), Some("0042"));
        assert_eq!(row.discount_group.as_deref(), Some("007"));

        let row = RawRecord::from_cells([text("true"), Some(Cell::Number(1.0)), text("TP_MED"), None, Some(Cell::Number(7.0))]);
        assert_eq!(row.sell_price, None);
        assert_eq!(row.supplier_name, None);
        assert_eq!(row.discount_group.as_deref(), Some("7"));
    }
}
