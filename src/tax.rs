pub const DEFAULT_TAX_RATE_PERCENT: f64 = 19.0;

/// Tax figures as the source provided them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaxInput {
    pub net: Option<f64>,
    pub tax: Option<f64>,
    pub gross: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxSplit {
    pub excl_tax: i64,
    pub incl_tax: i64,
}

fn round_currency(v: f64) -> i64 {
    if v.is_finite() {
        v.round() as i64
    } else {
        0
    }
}

/// Derives tax-exclusive and tax-inclusive amounts, whole currency units.
///
/// An explicit gross is trusted as-is. A separate tax figure is subtracted
/// from the amount present. With no tax information the flat `rate_percent`
/// is applied on top of the net amount.
pub fn split_tax(input: TaxInput, rate_percent: f64) -> TaxSplit {
    let net = input.net.unwrap_or(0.0);
    match (input.gross, input.tax) {
        (Some(gross), _) => TaxSplit {
            excl_tax: round_currency(net),
            incl_tax: round_currency(gross),
        },
        (None, Some(tax)) => TaxSplit {
            excl_tax: round_currency(net - tax),
            incl_tax: round_currency(net),
        },
        (None, None) => TaxSplit {
            excl_tax: round_currency(net),
            incl_tax: round_currency(net * (1.0 + rate_percent / 100.0)),
        },
    }
}
