use crate::model::{CustomerSize, CustomerType};

/// Customer type × customer size table. `None` marks a cell with no data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarginMatrix {
    cells: [[Option<f64>; 5]; 5],
}

impl MarginMatrix {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a matrix by evaluating `f` for every (type, size) pair.
    pub fn from_fn(mut f: impl FnMut(CustomerType, CustomerSize) -> Option<f64>) -> Self {
        let mut cells = [[None; 5]; 5];
        for ctype in CustomerType::ALL {
            for csize in CustomerSize::ALL {
                cells[ctype.index()][csize.index()] = f(ctype, csize);
            }
        }
        Self { cells }
    }

    pub fn get(&self, ctype: CustomerType, csize: CustomerSize) -> Option<f64> {
        self.cells[ctype.index()][csize.index()]
    }

    /// Row-major iteration in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (CustomerType, CustomerSize, Option<f64>)> + '_ {
        CustomerType::ALL.into_iter().flat_map(move |ctype| {
            CustomerSize::ALL
                .into_iter()
                .map(move |csize| (ctype, csize, self.get(ctype, csize)))
        })
    }

    pub fn defined_count(&self) -> usize {
        self.iter().filter(|(_, _, v)| v.is_some()).count()
    }

    pub fn is_all_undefined(&self) -> bool {
        self.defined_count() == 0
    }

    /// Smallest and largest defined value, if any.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.iter()
            .filter_map(|(_, _, v)| v)
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Cell-wise `self - other`; undefined wherever either side is.
    pub fn difference(&self, other: &MarginMatrix) -> MarginMatrix {
        MarginMatrix::from_fn(|ctype, csize| {
            match (self.get(ctype, csize), other.get(ctype, csize)) {
                (Some(a), Some(b)) => Some(a - b),
                _ => None,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fn_fills_in_enumeration_order() {
        let m = MarginMatrix::from_fn(|t, s| Some((t.index() * 10 + s.index()) as f64));
        let values: Vec<f64> = m.iter().filter_map(|(_, _, v)| v).collect();
        assert_eq!(values.len(), 25);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[6], 11.0);
        assert_eq!(values[24], 44.0);
    }

    #[test]
    fn difference_propagates_missing_cells() {
        let actual = MarginMatrix::from_fn(|t, s| {
            (t == CustomerType::Jobber && s == CustomerSize::Small).then_some(45.0)
        });
        let ideal = MarginMatrix::from_fn(|_, _| Some(46.0));
        let diff = actual.difference(&ideal);

        assert_eq!(diff.get(CustomerType::Jobber, CustomerSize::Small), Some(-1.0));
        assert_eq!(diff.get(CustomerType::Jobber, CustomerSize::Huge), None);
        assert_eq!(diff.defined_count(), 1);
    }

    #[test]
    fn value_range_ignores_undefined() {
        assert_eq!(MarginMatrix::empty().value_range(), None);
        let m = MarginMatrix::from_fn(|t, _| match t {
            CustomerType::IndOem => Some(-3.0),
            CustomerType::Tp => Some(12.5),
            _ => None,
        });
        assert_eq!(m.value_range(), Some((-3.0, 12.5)));
    }
}
