// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Fixed-rate amount conversion.
//!
//! Amounts are [`Decimal`]s. The product is rounded to the ledger's native
//! precision of 7 decimal places, half away from zero, so
//! `0.00000005 -> 0.0000001` and `0.00000004 -> 0.0000000`.
//!
//! # Example
//!
//! ```
//! use remit_monitor::Converter;
//! use rust_decimal_macros::dec;
//!
//! let converter = Converter::new(dec!(248.73)).unwrap();
//! assert_eq!(converter.convert(dec!(10.0000000)).unwrap().to_string(), "2487.3000000");
//! ```

use crate::error::ConversionError;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Converts source amounts to target amounts at a static rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Converter {
    rate: Decimal,
}

impl Converter {
    /// Decimal places supported by the ledger for any asset.
    pub const DECIMAL_PRECISION: u32 = 7;

    /// Smallest representable amount (one stroop).
    pub const MINIMUM_UNIT: Decimal = dec!(0.0000001);

    pub fn new(rate: Decimal) -> Result<Self, ConversionError> {
        if rate <= Decimal::ZERO {
            return Err(ConversionError::NonPositiveRate);
        }
        Ok(Self { rate })
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Returns `round(amount * rate)` at [`Self::DECIMAL_PRECISION`] places.
    ///
    /// # Errors
    ///
    /// - [`ConversionError::NonPositiveAmount`] - source amount is zero or negative.
    /// - [`ConversionError::Overflow`] - the product does not fit a `Decimal`.
    /// - [`ConversionError::BelowMinimum`] - the result rounds to zero.
    pub fn convert(&self, amount: Decimal) -> Result<Decimal, ConversionError> {
        if amount <= Decimal::ZERO {
            return Err(ConversionError::NonPositiveAmount);
        }
        let product = amount
            .checked_mul(self.rate)
            .ok_or(ConversionError::Overflow)?;
        let mut rounded = product.round_dp_with_strategy(
            Self::DECIMAL_PRECISION,
            RoundingStrategy::MidpointAwayFromZero,
        );
        if rounded < Self::MINIMUM_UNIT {
            return Err(ConversionError::BelowMinimum);
        }
        rounded.rescale(Self::DECIMAL_PRECISION);
        Ok(rounded)
    }
}

/// Converts a 7-place amount to integer stroops.
pub(crate) fn to_stroops(amount: Decimal) -> Result<i64, ConversionError> {
    let mut scaled = amount
        .checked_mul(Decimal::from(10_000_000i64))
        .ok_or(ConversionError::Overflow)?;
    scaled = scaled.trunc();
    i64::try_from(scaled).map_err(|_| ConversionError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_example_scenario() {
        let converter = Converter::new(dec!(248.73)).unwrap();
        let issued = converter.convert(dec!(10.0000000)).unwrap();
        assert_eq!(issued, dec!(2487.3));
        assert_eq!(issued.to_string(), "2487.3000000");
    }

    #[test]
    fn smallest_unit_converts() {
        let converter = Converter::new(dec!(248.73)).unwrap();
        assert_eq!(converter.convert(dec!(0.0000001)).unwrap(), dec!(0.0000249));
    }

    #[test]
    fn rounds_half_away_from_zero() {
        let converter = Converter::new(dec!(0.5)).unwrap();
        // 0.0000003 * 0.5 = 0.00000015
        assert_eq!(converter.convert(dec!(0.0000003)).unwrap(), dec!(0.0000002));
        // 0.0000005 * 0.5 = 0.00000025
        assert_eq!(converter.convert(dec!(0.0000005)).unwrap(), dec!(0.0000003));
    }

    #[test]
    fn truncates_extra_precision_below_midpoint() {
        let converter = Converter::new(dec!(1)).unwrap();
        assert_eq!(converter.convert(dec!(1.23456784)).unwrap(), dec!(1.2345678));
        assert_eq!(converter.convert(dec!(1.23456785)).unwrap(), dec!(1.2345679));
    }

    #[test]
    fn below_minimum_is_rejected() {
        let converter = Converter::new(dec!(0.4)).unwrap();
        assert_eq!(
            converter.convert(dec!(0.0000001)),
            Err(ConversionError::BelowMinimum)
        );
    }

    #[test]
    fn non_positive_inputs_are_rejected() {
        assert_eq!(Converter::new(dec!(0)), Err(ConversionError::NonPositiveRate));
        assert_eq!(Converter::new(dec!(-1)), Err(ConversionError::NonPositiveRate));

        let converter = Converter::new(dec!(2)).unwrap();
        assert_eq!(converter.convert(dec!(0)), Err(ConversionError::NonPositiveAmount));
    }

    #[test]
    fn overflow_is_reported() {
        let converter = Converter::new(Decimal::MAX).unwrap();
        assert_eq!(converter.convert(dec!(2)), Err(ConversionError::Overflow));
    }

    #[test]
    fn stroops_conversion() {
        assert_eq!(to_stroops(dec!(2487.3000000)).unwrap(), 24_873_000_000);
        assert_eq!(to_stroops(dec!(0.0000001)).unwrap(), 1);
        assert_eq!(
            to_stroops(dec!(922337203685.4775808)),
            Err(ConversionError::Overflow)
        );
    }
}
