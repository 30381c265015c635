pub mod analysis;
pub mod detector;
pub mod indicators;

// Re-export the indicator engine
pub use indicators::{
    bollinger, ema, historical_volatility, macd, pct_change, rsi, sma, Bollinger,
    IndicatorSet, IndicatorSnapshot, Macd,
};

// Re-export the detector
pub use detector::{rank_signals, SignalDetector};
