//! Minimum-margin policy: a base margin per customer type plus an offset per
//! customer size.

use crate::matrix::MarginMatrix;
use crate::model::{CustomerSize, CustomerType};

pub fn minimum_margin(ctype: CustomerType) -> f64 {
    match ctype {
        CustomerType::IndOem => 35.0,
        CustomerType::MobOem => 28.0,
        CustomerType::Jobber => 40.0,
        CustomerType::User => 35.0,
        CustomerType::Tp => 42.0,
    }
}

pub fn size_offset(csize: CustomerSize) -> f64 {
    match csize {
        CustomerSize::Huge => 0.0,
        CustomerSize::Large => 2.0,
        CustomerSize::Med => 4.0,
        CustomerSize::Small => 6.0,
        CustomerSize::Tiny => 8.0,
    }
}

pub fn ideal_margin(ctype: CustomerType, csize: CustomerSize) -> f64 {
    minimum_margin(ctype) + size_offset(csize)
}

/// The policy as a fully defined 5×5 matrix.
pub fn ideal_margin_matrix() -> MarginMatrix {
    MarginMatrix::from_fn(|ctype, csize| Some(ideal_margin(ctype, csize)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ideal_is_base_plus_offset_everywhere() {
        let m = ideal_margin_matrix();
        assert_eq!(m.defined_count(), 25);
        for (ctype, csize, value) in m.iter() {
            assert_eq!(value, Some(minimum_margin(ctype) + size_offset(csize)));
        }
    }

    #[test]
    fn ideal_is_deterministic() {
        assert_eq!(ideal_margin_matrix(), ideal_margin_matrix());
    }

    #[test]
    fn known_policy_values() {
        assert_eq!(ideal_margin(CustomerType::Jobber, CustomerSize::Small), 46.0);
        assert_eq!(ideal_margin(CustomerType::MobOem, CustomerSize::Huge), 28.0);
        assert_eq!(ideal_margin(CustomerType::Tp, CustomerSize::Tiny), 50.0);
    }
}
