//! External interfaces (spec.md §6): the Exchange REST surface, the
//! streaming feed, and the optional market scanner. Each is specified
//! here purely as a narrow trait boundary plus a thin `reqwest` /
//! `tokio-tungstenite` implementation; request signing is delegated to
//! an injected `Signer` rather than embedded, per spec.md §1's
//! out-of-scope collaborators.

pub mod backoff;
pub mod feed;
pub mod rest;
pub mod scanner;
pub mod types;

pub use feed::{Feed, FeedClient};
pub use rest::{ExchangeRest, NoopSigner, RestClient, Signer};
pub use scanner::{InMemoryScanner, ScanResult, Scanner};
pub use types::{Balance, FeedCommand, FeedEvent, MarketRecord, OrderRecord, Page, PositionRecord};
