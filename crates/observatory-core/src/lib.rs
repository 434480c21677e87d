pub mod clock;
pub mod entities;
pub mod enums;
pub mod error;
pub mod notify;
pub mod store;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use entities::{
    FxWatchConfig, Guru, GuruFiling, GuruHolding, Holding, InvestmentProfile, PortfolioSnapshot,
    PriceAlert, RemovalLog, ScanLog, ThesisLog, TrackedTicker,
};
pub use enums::{
    AlertMetric, AlertOperator, FearGreedLevel, HoldingAction, MarketSentiment, MoatStatus,
    PainLevel, ScanSignal, TickerCategory,
};
pub use error::EngineError;
pub use notify::Notifier;
pub use types::{
    BetaValue, BiasDistribution, Candle, DividendInfo, EarningsInfo, EtfConstituent, EtfHoldings,
    FearGreedComponents, FearGreedReport, FearGreedSource, FxHistory, FxRate, MoatReport,
    QuoteDay, SectorInfo, SectorWeight, SectorWeights, TechnicalSignals,
};
