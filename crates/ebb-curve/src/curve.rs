//! The decaying rate curve.
//!
//! Maps cumulative contributed volume to a per-batch rate that decays
//! geometrically, and averages that rate over volume ranges.
//! All arithmetic is integer-only with 256-bit intermediates for overflow safety.

use ebb_core::constants::FACTOR_PRECISION;
use ebb_core::error::CurveError;
use ebb_core::types::{Amount, Rate, RateParameters};
use ebb_core::wide::{mul_div_floor, U256};
use tracing::trace;

/// Fixed-point exponentiation: computes `(base/precision)^exp` in fixed-point.
///
/// Uses binary exponentiation for O(log n) multiplications.
/// `base` and return value are in fixed-point with `precision` as denominator.
fn fixed_pow(base: u128, exp: u64, precision: u128) -> Result<u128, CurveError> {
    if exp == 0 {
        return Ok(precision); // (base/precision)^0 = 1.0
    }

    let mut result = precision;
    let mut b = base;
    let mut e = exp;

    while e > 0 {
        if e & 1 == 1 {
            result = mul_div_floor(result, b, precision).ok_or(CurveError::Overflow)?;
            if result == 0 {
                return Ok(0);
            }
        }
        e >>= 1;
        if e > 0 {
            b = mul_div_floor(b, b, precision).ok_or(CurveError::Overflow)?;
        }
    }

    Ok(result)
}

/// A validated decaying rate curve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateCurve {
    params: RateParameters,
    /// `decay_numerator / decay_denominator` at [`FACTOR_PRECISION`].
    factor: u128,
}

impl RateCurve {
    /// Validate `params` and precompute the fixed-point decay factor.
    pub fn new(params: RateParameters) -> Result<Self, CurveError> {
        params.validate()?;
        let factor = mul_div_floor(
            params.decay_numerator,
            FACTOR_PRECISION,
            params.decay_denominator,
        )
        .ok_or(CurveError::Overflow)?;
        Ok(Self { params, factor })
    }

    pub fn params(&self) -> &RateParameters {
        &self.params
    }

    /// Per-batch decay factor at [`FACTOR_PRECISION`].
    pub fn decay_factor(&self) -> u128 {
        self.factor
    }

    /// Batch containing cumulative `volume`: `floor(volume / batch_size)`.
    pub fn batch_index(&self, volume: Amount) -> Result<u64, CurveError> {
        u64::try_from(volume / self.params.batch_size).map_err(|_| CurveError::Overflow)
    }

    /// First cumulative volume belonging to `batch`.
    pub fn batch_start(&self, batch: u64) -> Result<Amount, CurveError> {
        (batch as u128)
            .checked_mul(self.params.batch_size)
            .ok_or(CurveError::Overflow)
    }

    /// Rate at `batch`: `initial_rate * (num/den)^batch`, truncated.
    pub fn rate_at(&self, batch: u64) -> Result<Rate, CurveError> {
        let retention = fixed_pow(self.factor, batch, FACTOR_PRECISION)?;
        mul_div_floor(self.params.initial_rate, retention, FACTOR_PRECISION)
            .ok_or(CurveError::Overflow)
    }

    /// Rate of the batch containing cumulative `volume`.
    pub fn spot_rate(&self, volume: Amount) -> Result<Rate, CurveError> {
        self.rate_at(self.batch_index(volume)?)
    }

    /// `Σ w_b * rate_at(b)` over the batches overlapping `[start, end)`.
    ///
    /// No division happens here, so sums over adjacent sub-ranges add up to
    /// exactly the sum over their union. An empty range sums to zero.
    pub fn weighted_sum(&self, start: Amount, end: Amount) -> Result<U256, CurveError> {
        if end < start {
            return Err(CurveError::InvalidRange { start, end });
        }

        let mut acc = U256::ZERO;
        let mut cursor = start;
        while cursor < end {
            let (upper, term) = self.batch_slice(cursor, end)?;
            acc = acc.checked_add(term).ok_or(CurveError::Overflow)?;
            cursor = upper;
        }
        Ok(acc)
    }

    /// Weighted term of the leading slice of the non-empty range `[start, end)`.
    ///
    /// Returns the slice's exclusive upper bound and `w * rate`. A slice
    /// normally stops at the next batch boundary; on a constant curve, or once
    /// the rate has decayed to zero, the rest of the range is one slice.
    pub fn batch_slice(&self, start: Amount, end: Amount) -> Result<(Amount, U256), CurveError> {
        if end <= start {
            return Err(CurveError::InvalidRange { start, end });
        }
        if self.params.decay_numerator == self.params.decay_denominator {
            return Ok((end, U256::widening_mul(end - start, self.params.initial_rate)));
        }

        let rate = self.spot_rate(start)?;
        if rate == 0 {
            // Non-increasing curve: every later batch is zero too.
            return Ok((end, U256::ZERO));
        }
        let size = self.params.batch_size;
        let upper = (start - start % size)
            .checked_add(size)
            .map_or(end, |boundary| boundary.min(end));
        Ok((upper, U256::widening_mul(upper - start, rate)))
    }

    /// Volume-weighted average rate over `[start, end)`, truncated.
    pub fn average_rate(&self, start: Amount, end: Amount) -> Result<Rate, CurveError> {
        if end <= start {
            return Err(CurveError::InvalidRange { start, end });
        }
        let sum = self.weighted_sum(start, end)?;
        let avg = sum
            .checked_div_u128(end - start)
            .ok_or(CurveError::Overflow)?;
        trace!(start, end, avg, "average rate");
        Ok(avg)
    }

    /// Cumulative volume at which the curve first falls below `min_rate`,
    /// searching from the batch containing `from_volume`.
    ///
    /// Returns the start of the first batch whose rate is below `min_rate`
    /// (which may be at or before `from_volume` when the current batch is
    /// already too cheap). Returns `None` when the curve never drops below
    /// `min_rate` within the representable volume.
    pub fn volume_cap_for_rate(
        &self,
        min_rate: Rate,
        from_volume: Amount,
    ) -> Result<Option<Amount>, CurveError> {
        if min_rate == 0 {
            return Ok(None);
        }

        let mut lo = self.batch_index(from_volume)?;
        if self.rate_at(lo)? < min_rate {
            return self.batch_start(lo).map(Some);
        }
        if self.params.decay_numerator == self.params.decay_denominator {
            return Ok(None);
        }

        // Gallop to bracket the first batch below `min_rate` in (lo, hi].
        let mut step: u64 = 1;
        let mut hi = loop {
            let candidate = lo.saturating_add(step);
            if self.rate_at(candidate)? < min_rate {
                break candidate;
            }
            if candidate == u64::MAX {
                return Ok(None);
            }
            lo = candidate;
            step = step.saturating_mul(2);
        };

        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if self.rate_at(mid)? >= min_rate {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        Ok((hi as u128).checked_mul(self.params.batch_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebb_core::constants::{RATE_PRECISION, UNIT};
    use proptest::prelude::*;

    fn curve() -> RateCurve {
        RateCurve::new(RateParameters::default()).unwrap()
    }

    fn float_rate(batch: i32) -> f64 {
        100.0 * 0.99f64.powi(batch) * RATE_PRECISION as f64
    }

    fn rel_err(expected: f64, got: u128) -> f64 {
        ((got as f64) - expected).abs() / expected
    }

    /// Brute-force reference: walk every overlapped batch with explicit
    /// overlap bounds.
    fn reference_average(c: &RateCurve, start: u128, end: u128) -> u128 {
        let size = c.params().batch_size;
        let first = start / size;
        let last = (end - 1) / size;
        let mut sum = U256::ZERO;
        for b in first..=last {
            let lo = start.max(b * size);
            let hi = end.min((b + 1) * size);
            let r = c.rate_at(b as u64).unwrap();
            sum = sum.checked_add(U256::widening_mul(hi - lo, r)).unwrap();
        }
        sum.checked_div_u128(end - start).unwrap()
    }

    // --- fixed_pow ---

    #[test]
    fn pow_zero_exponent_is_one() {
        assert_eq!(fixed_pow(12345, 0, FACTOR_PRECISION).unwrap(), FACTOR_PRECISION);
    }

    #[test]
    fn pow_of_one_is_one() {
        assert_eq!(
            fixed_pow(FACTOR_PRECISION, 1_000_000, FACTOR_PRECISION).unwrap(),
            FACTOR_PRECISION
        );
    }

    #[test]
    fn pow_of_half() {
        let half = FACTOR_PRECISION / 2;
        assert_eq!(fixed_pow(half, 3, FACTOR_PRECISION).unwrap(), FACTOR_PRECISION / 8);
    }

    #[test]
    fn pow_underflows_to_zero() {
        assert_eq!(fixed_pow(FACTOR_PRECISION / 2, 200, FACTOR_PRECISION).unwrap(), 0);
    }

    // --- construction ---

    #[test]
    fn new_rejects_invalid_parameters() {
        let params = RateParameters { batch_size: 0, ..RateParameters::default() };
        assert!(matches!(RateCurve::new(params), Err(CurveError::InvalidParameters(_))));
    }

    #[test]
    fn decay_factor_exact_for_decimal_fraction() {
        assert_eq!(curve().decay_factor(), FACTOR_PRECISION / 100 * 99);
    }

    // --- rate_at ---

    #[test]
    fn rate_at_zero_is_initial_rate() {
        assert_eq!(curve().rate_at(0).unwrap(), 100 * RATE_PRECISION);
    }

    #[test]
    fn rate_at_one_exact() {
        assert_eq!(curve().rate_at(1).unwrap(), 99 * RATE_PRECISION);
    }

    #[test]
    fn rate_at_two_exact() {
        assert_eq!(curve().rate_at(2).unwrap(), 9801 * RATE_PRECISION / 100);
    }

    #[test]
    fn rate_at_seven_matches_float() {
        let got = curve().rate_at(7).unwrap();
        assert!(rel_err(float_rate(7), got) < 1e-8, "rate_at(7) = {got}");
    }

    #[test]
    fn rate_at_seventeen_matches_float() {
        let got = curve().rate_at(17).unwrap();
        assert!(rel_err(float_rate(17), got) < 1e-8, "rate_at(17) = {got}");
    }

    #[test]
    fn rate_at_far_batch_decays_to_zero() {
        assert_eq!(curve().rate_at(100_000).unwrap(), 0);
        assert_eq!(curve().rate_at(u64::MAX).unwrap(), 0);
    }

    #[test]
    fn rate_constant_with_unit_factor() {
        let params = RateParameters {
            decay_numerator: 3,
            decay_denominator: 3,
            ..RateParameters::default()
        };
        let c = RateCurve::new(params).unwrap();
        assert_eq!(c.rate_at(0).unwrap(), c.rate_at(1_000_000).unwrap());
    }

    #[test]
    fn batch_index_floors() {
        let c = curve();
        assert_eq!(c.batch_index(0).unwrap(), 0);
        assert_eq!(c.batch_index(20 * UNIT - 1).unwrap(), 0);
        assert_eq!(c.batch_index(20 * UNIT).unwrap(), 1);
        assert_eq!(c.batch_index(85 * UNIT).unwrap(), 4);
    }

    #[test]
    fn batch_index_overflow_for_tiny_batches() {
        let params = RateParameters { batch_size: 1, ..RateParameters::default() };
        let c = RateCurve::new(params).unwrap();
        assert_eq!(c.batch_index(u128::MAX), Err(CurveError::Overflow));
    }

    // --- average_rate ---

    #[test]
    fn average_rejects_empty_and_inverted_ranges() {
        let c = curve();
        assert_eq!(
            c.average_rate(5, 5),
            Err(CurveError::InvalidRange { start: 5, end: 5 })
        );
        assert_eq!(
            c.average_rate(6, 5),
            Err(CurveError::InvalidRange { start: 6, end: 5 })
        );
    }

    #[test]
    fn average_within_one_batch_is_spot_rate() {
        let c = curve();
        let avg = c.average_rate(21 * UNIT, 39 * UNIT).unwrap();
        assert_eq!(avg, c.rate_at(1).unwrap());
    }

    #[test]
    fn average_31_to_85_matches_float() {
        let c = curve();
        let f = 0.99f64;
        let expected = 100.0 * (9.0 * f + 20.0 * f.powi(2) + 20.0 * f.powi(3) + 5.0 * f.powi(4))
            / 54.0
            * RATE_PRECISION as f64;
        let got = c.average_rate(31 * UNIT, 85 * UNIT).unwrap();
        assert!(rel_err(expected, got) < 1e-8, "average = {got}");
    }

    #[test]
    fn weighted_sum_empty_range_is_zero() {
        assert_eq!(curve().weighted_sum(7, 7).unwrap(), U256::ZERO);
    }

    #[test]
    fn weighted_sum_splits_exactly() {
        let c = curve();
        let whole = c.weighted_sum(3 * UNIT, 97 * UNIT).unwrap();
        let left = c.weighted_sum(3 * UNIT, 41 * UNIT).unwrap();
        let right = c.weighted_sum(41 * UNIT, 97 * UNIT).unwrap();
        assert_eq!(left.checked_add(right).unwrap(), whole);
    }

    #[test]
    fn weighted_sum_full_width_term_fits_accumulator() {
        let params = RateParameters {
            initial_rate: u128::MAX,
            decay_numerator: 1,
            decay_denominator: 1,
            batch_size: u128::MAX,
        };
        let c = RateCurve::new(params).unwrap();
        // Two full-width terms of (2^128 - 1)^2 each exceed 2^256.
        let single = c.weighted_sum(0, u128::MAX).unwrap();
        assert_eq!(single.checked_add(single), None);
    }

    #[test]
    fn slice_stops_at_batch_boundary() {
        let c = curve();
        let (upper, term) = c.batch_slice(15 * UNIT, 31 * UNIT).unwrap();
        assert_eq!(upper, 20 * UNIT);
        assert_eq!(term, U256::widening_mul(5 * UNIT, 100 * RATE_PRECISION));
        assert_eq!(c.batch_slice(31 * UNIT, 35 * UNIT).unwrap().0, 35 * UNIT);
        assert!(matches!(c.batch_slice(4, 4), Err(CurveError::InvalidRange { .. })));
    }

    #[test]
    fn slice_covers_range_on_exhausted_curve() {
        let c = curve();
        let start = 100_000 * 20 * UNIT;
        assert_eq!(
            c.batch_slice(start, start + 7_000 * UNIT).unwrap(),
            (start + 7_000 * UNIT, U256::ZERO)
        );
    }

    #[test]
    fn constant_curve_sums_in_closed_form() {
        let params = RateParameters {
            batch_size: 1,
            decay_numerator: 7,
            decay_denominator: 7,
            ..RateParameters::default()
        };
        let c = RateCurve::new(params).unwrap();
        // Far more batches than a per-batch walk could cover.
        let end = 1u128 << 100;
        assert_eq!(
            c.weighted_sum(0, end).unwrap(),
            U256::widening_mul(end, 100 * RATE_PRECISION)
        );
        assert_eq!(c.average_rate(3, end).unwrap(), 100 * RATE_PRECISION);
    }

    // --- volume_cap_for_rate ---

    #[test]
    fn cap_for_zero_rate_is_unbounded() {
        assert_eq!(curve().volume_cap_for_rate(0, 0).unwrap(), None);
    }

    #[test]
    fn cap_at_first_batch_below_limit() {
        let c = curve();
        // 99.95 is below batch 0 (100) and above batch 1 (99).
        let min = 9995 * RATE_PRECISION / 100;
        assert_eq!(c.volume_cap_for_rate(min, 0).unwrap(), Some(20 * UNIT));
    }

    #[test]
    fn cap_when_current_batch_already_too_cheap() {
        let c = curve();
        let min = 99 * RATE_PRECISION + 1;
        assert_eq!(c.volume_cap_for_rate(min, 30 * UNIT).unwrap(), Some(20 * UNIT));
    }

    #[test]
    fn cap_far_along_the_curve() {
        let c = curve();
        let min = 50 * RATE_PRECISION;
        let cap = c.volume_cap_for_rate(min, 0).unwrap().unwrap();
        let batch = c.batch_index(cap).unwrap();
        assert!(c.rate_at(batch).unwrap() < min);
        assert!(c.rate_at(batch - 1).unwrap() >= min);
    }

    #[test]
    fn cap_never_reached_with_unit_factor() {
        let params = RateParameters {
            decay_numerator: 1,
            decay_denominator: 1,
            ..RateParameters::default()
        };
        let c = RateCurve::new(params).unwrap();
        assert_eq!(c.volume_cap_for_rate(RATE_PRECISION, 0).unwrap(), None);
    }

    // --- proptest ---

    proptest! {
        #[test]
        fn rate_step_matches_decay_factor(batch in 0u64..3_000) {
            let c = curve();
            let here = c.rate_at(batch).unwrap();
            let next = c.rate_at(batch + 1).unwrap();
            let expected = here * 99 / 100;
            prop_assert!(next.abs_diff(expected) <= 2, "b={} next={} expected={}", batch, next, expected);
        }

        #[test]
        fn rate_non_increasing(a in 0u64..5_000, b in 0u64..5_000) {
            let c = curve();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(c.rate_at(lo).unwrap() >= c.rate_at(hi).unwrap());
        }

        #[test]
        fn single_batch_average_is_exact(batch in 0u64..500, off_a in 0u128..20, off_b in 0u128..20) {
            let c = curve();
            let (a, b) = if off_a <= off_b { (off_a, off_b + 1) } else { (off_b, off_a + 1) };
            let base = batch as u128 * 20 * UNIT;
            let start = base + a * UNIT;
            let end = base + b * UNIT;
            prop_assert_eq!(c.average_rate(start, end).unwrap(), c.rate_at(batch).unwrap());
        }

        #[test]
        fn multi_batch_average_matches_reference(start in 0u128..2_000u128, len in 1u128..400u128) {
            let c = curve();
            let s = start * UNIT / 3;
            let e = s + len * UNIT / 2 + 1;
            prop_assert_eq!(c.average_rate(s, e).unwrap(), reference_average(&c, s, e));
        }

        #[test]
        fn average_between_endpoint_rates(start in 0u128..1_000u128, len in 1u128..400u128) {
            let c = curve();
            let s = start * UNIT;
            let e = s + len * UNIT;
            let avg = c.average_rate(s, e).unwrap();
            prop_assert!(avg <= c.spot_rate(s).unwrap());
            prop_assert!(avg >= c.spot_rate(e - 1).unwrap());
        }
    }
}
