//! Indicator engine
//!
//! Pure functions over a full bar window. Every call recomputes from the first
//! bar; nothing is carried between calls, so the output always reflects
//! whatever window the history currently holds.
use crate::types::{Bar, EPSILON};

/// Default RSI lookback
pub const RSI_PERIOD: usize = 14;

/// Exponential Moving Average (EMA)
///
/// Seeded with the first value, then `v = x*k + v*(1-k)` with `k = 2/(period+1)`.
/// Returns one value per input.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let Some((&first, rest)) = values.split_first() else {
        return Vec::new();
    };

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut value = first;
    out.push(value);

    for &x in rest {
        value = x * k + value * (1.0 - k);
        out.push(value);
    }

    out
}

/// Final EMA value, without materialising the series
pub fn ema_last(values: &[f64], period: usize) -> Option<f64> {
    let (&first, rest) = values.split_first()?;
    let k = 2.0 / (period as f64 + 1.0);
    Some(rest.iter().fold(first, |value, &x| x * k + value * (1.0 - k)))
}

/// Relative Strength Index (RSI) with Wilder smoothing
///
/// Indices `0..period` are undefined. Index `period` is seeded with the simple
/// average gain/loss over the first `period` deltas, later indices use
/// `avg = (avg*(period-1) + x)/period`.
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() <= period {
        return out;
    }

    let (mut gains, mut losses) = (0.0, 0.0);
    for window in values[..=period].windows(2) {
        let delta = window[1] - window[0];
        if delta >= 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }

    let p = period as f64;
    let mut avg_gain = gains / p;
    let mut avg_loss = losses / p;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for i in (period + 1)..values.len() {
        let delta = values[i] - values[i - 1];
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }

    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    let avg_loss = if avg_loss == 0.0 { EPSILON } else { avg_loss };
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

/// Volume-Weighted Average Price (VWAP), cumulative over the whole window
///
/// VWAP = Σ(TypicalPrice × Volume) / Σ(Volume), one running value per bar.
pub fn vwap(bars: &[Bar]) -> Vec<f64> {
    let mut sum_pv = 0.0;
    let mut sum_v = 0.0;

    bars.iter()
        .map(|bar| {
            sum_pv += bar.typical_price() * bar.v;
            sum_v += bar.v;
            sum_pv / sum_v.max(EPSILON)
        })
        .collect()
}

/// Close prices of `bars`
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|bar| bar.c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(h: f64, l: f64, c: f64, v: f64) -> Bar {
        Bar { t: 0, o: c, h, l, c, v }
    }

    #[test]
    fn test_ema_empty() {
        assert!(ema(&[], 9).is_empty());
        assert_eq!(ema_last(&[], 9), None);
    }

    #[test]
    fn test_ema_constant_series() {
        let values = vec![42.5; 50];
        let out = ema(&values, 21);
        assert_eq!(out.len(), 50);
        assert_eq!(out[0], 42.5);
        assert!(out.iter().all(|v| (v - 42.5).abs() < 1e-9));
    }

    #[test]
    fn test_ema_known_values() {
        // k = 0.5 for period 3
        let out = ema(&[100.0, 102.0, 104.0], 3);
        assert_eq!(out, vec![100.0, 101.0, 102.5]);
        assert_eq!(ema_last(&[100.0, 102.0, 104.0], 3), Some(102.5));
    }

    #[test]
    fn test_rsi_warmup_is_undefined() {
        let values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let out = rsi(&values, RSI_PERIOD);
        assert!(out[..RSI_PERIOD].iter().all(Option::is_none));
        assert!(out[RSI_PERIOD..].iter().all(Option::is_some));
    }

    #[test]
    fn test_rsi_too_short_is_all_undefined() {
        let values = vec![1.0; RSI_PERIOD];
        assert!(rsi(&values, RSI_PERIOD).iter().all(Option::is_none));
    }

    #[test]
    fn test_rsi_extremes() {
        let rising: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let falling: Vec<f64> = (0..60).map(|i| 100.0 - i as f64).collect();

        let up = rsi(&rising, RSI_PERIOD).last().copied().flatten().unwrap();
        let down = rsi(&falling, RSI_PERIOD).last().copied().flatten().unwrap();

        assert!(up > 99.9, "rising RSI was {up}");
        assert!(down < 0.1, "falling RSI was {down}");
    }

    #[test]
    fn test_rsi_seed_matches_simple_average() {
        // deltas: +1, -1, +2 -> avg gain 1.0, avg loss 1/3 -> RSI 75
        let out = rsi(&[10.0, 11.0, 10.0, 12.0], 3);
        assert!((out[3].unwrap() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_vwap_single_bar_is_typical_price() {
        let out = vwap(&[bar(11.0, 9.0, 10.5, 100.0)]);
        assert!((out[0] - (11.0 + 9.0 + 10.5) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_vwap_weights_by_volume() {
        let out = vwap(&[bar(100.0, 100.0, 100.0, 1.0), bar(101.0, 101.0, 101.0, 3.0)]);
        assert!((out[1] - 100.75).abs() < 1e-12);
    }

    #[test]
    fn test_vwap_zero_volume_does_not_divide_by_zero() {
        let out = vwap(&[bar(1.0, 1.0, 1.0, 0.0)]);
        assert_eq!(out[0], 0.0);
    }
}
