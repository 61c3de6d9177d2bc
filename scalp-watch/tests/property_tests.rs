//! Property tests for the bar pipeline.
//!
//! Uses proptest to verify:
//! 1. History ordering: bars stay strictly increasing by `t` and never exceed the cap
//! 2. Replace vs append semantics of live updates
//! 3. EMA over a constant series is that constant
//! 4. RSI stays within [0, 100]
//! 5. VWAP stays within the window's typical-price range

use proptest::prelude::*;
use scalp_watch::{
    indicators::{closes, ema, rsi, vwap, RSI_PERIOD},
    Bar, BarHistory, LiveUpdate, Signal, Symbol, MAX_BARS,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (0.0001..100_000.0_f64).prop_map(|p| (p * 1e4).round() / 1e4)
}

fn arb_volume() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), 1.0..1e6_f64]
}

fn arb_bar(t: i64) -> impl Strategy<Value = Bar> {
    (arb_price(), arb_price(), arb_price(), arb_volume()).prop_map(move |(a, b, c, v)| {
        let h = a.max(b).max(c);
        let l = a.min(b).min(c);
        Bar { t, o: a, h, l, c: b, v }
    })
}

fn arb_bars(max_len: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec(arb_bar(0), 0..max_len).prop_map(|bars| {
        bars.into_iter()
            .enumerate()
            .map(|(i, bar)| Bar { t: i as i64 * 60_000, ..bar })
            .collect()
    })
}

// ── 1. History ordering and cap ──────────────────────────────────────

proptest! {
    /// Any sequence of live updates keeps the history strictly increasing and bounded.
    #[test]
    fn history_stays_ordered_and_bounded(steps in prop::collection::vec(-2i64..3, 1..1500)) {
        let mut history = BarHistory::default();
        let mut t = 0i64;

        for step in steps {
            t = (t + step * 60_000).max(0);
            history.apply_live(Bar { t, o: 1.0, h: 1.0, l: 1.0, c: 1.0, v: 1.0 });

            prop_assert!(history.len() <= MAX_BARS);
            prop_assert!(history.bars().windows(2).all(|w| w[0].t < w[1].t));
        }
    }
}

// ── 2. Replace vs append ─────────────────────────────────────────────

proptest! {
    /// Same `t` as the last bar replaces it; a later `t` appends, evicting at the cap.
    #[test]
    fn replace_and_append(len in 1usize..=MAX_BARS, close in arb_price(), gap in 1i64..10) {
        let mut history = BarHistory::default();
        history.reset((0..len as i64).map(|i| Bar { t: i, o: 1.0, h: 1.0, l: 1.0, c: 1.0, v: 1.0 }).collect());
        let last_t = len as i64 - 1;

        let outcome = history.apply_live(Bar { t: last_t, o: 1.0, h: close, l: 0.0, c: close, v: 2.0 });
        prop_assert_eq!(outcome, LiveUpdate::Replaced);
        prop_assert_eq!(history.len(), len);
        prop_assert_eq!(history.last().map(|b| b.c), Some(close));
        if len > 1 {
            prop_assert_eq!(history.bars()[len - 2].c, 1.0);
        }

        let outcome = history.apply_live(Bar { t: last_t + gap, o: 1.0, h: 1.0, l: 1.0, c: 1.0, v: 1.0 });
        prop_assert_eq!(outcome, LiveUpdate::Appended);
        prop_assert_eq!(history.len(), (len + 1).min(MAX_BARS));
        prop_assert_eq!(history.last().map(|b| b.t), Some(last_t + gap));
    }
}

// ── 3-5. Indicators ──────────────────────────────────────────────────

proptest! {
    /// EMA of a constant series equals that constant.
    #[test]
    fn ema_constant_series(x in arb_price(), len in 1usize..300, period in 1usize..60) {
        let values = vec![x; len];
        let out = ema(&values, period);

        prop_assert_eq!(out.len(), len);
        prop_assert_eq!(out[0], x);
        for v in out {
            prop_assert!((v - x).abs() <= x.abs() * 1e-12 + 1e-12);
        }
    }

    /// RSI is undefined during warmup and bounded afterwards.
    #[test]
    fn rsi_is_bounded(bars in arb_bars(300)) {
        let closes = closes(&bars);
        let out = rsi(&closes, RSI_PERIOD);

        prop_assert_eq!(out.len(), closes.len());
        for (i, value) in out.iter().enumerate() {
            match value {
                Some(v) => {
                    prop_assert!(i >= RSI_PERIOD);
                    prop_assert!((0.0..=100.0).contains(v), "RSI {} out of range", v);
                }
                None => prop_assert!(i < RSI_PERIOD),
            }
        }
    }

    /// Cumulative VWAP never leaves the range of typical prices seen so far.
    #[test]
    fn vwap_within_typical_range(bars in arb_bars(200)) {
        let out = vwap(&bars);
        prop_assert_eq!(out.len(), bars.len());

        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        let mut any_volume = false;
        for (bar, value) in bars.iter().zip(out) {
            lo = lo.min(bar.typical_price());
            hi = hi.max(bar.typical_price());
            any_volume |= bar.v > 0.0;
            if any_volume {
                let tolerance = hi.abs() * 1e-9 + 1e-9;
                prop_assert!(value >= lo - tolerance && value <= hi + tolerance);
            }
        }
    }

    /// Fewer than 25 bars never produces a signal; 25 or more always does.
    #[test]
    fn signal_requires_history(bars in arb_bars(60)) {
        let symbol = Symbol::parse("BTCUSDT").unwrap();
        let signal = Signal::evaluate(&symbol, &bars);

        prop_assert_eq!(signal.is_some(), bars.len() >= 25);
        if let Some(signal) = signal {
            prop_assert!((0.5..=0.99).contains(&signal.confidence));
        }
    }
}
