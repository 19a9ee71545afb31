//! The ranking core of a multi-season competitive-game ladder.
//!
//! This crate implements the four tightly coupled subsystems that make up the hard
//! engineering of a ladder ranking service: incremental ingest of ladder snapshots
//! ([`merger`]), tie-aware rank computation ([`rank_compute`]), a packed binary ranking
//! blob with a random-access reader ([`codec`], [`lookup`]), and the paged/filtered/sorted
//! read path ([`query`]).
//!
//! The SQL store and the RPC/socket server that would normally sit around this crate are
//! out of scope: [`identity::IdentityStore`] and [`store::RankingStore`] are the contracts
//! this crate consumes from its persistence layer, and [`error::ApiError`] is the contract
//! it produces for an outer request boundary. Nothing here opens a socket or a database
//! connection.

#![warn(missing_docs)]

pub mod codec;
pub mod comparators;
pub mod error;
pub mod identity;
pub mod lookup;
pub mod merger;
pub mod query;
pub mod rank_compute;
pub mod stats;
pub mod store;
pub mod types;

pub use error::{ApiError, LadderError, LadderResult};
pub use merger::{LadderInput, LadderMember, MergeStats, Merger};
pub use query::{HistoryEntry, LadderHandler, Page, Pagination, TeamRow};
pub use types::{Player, PlayerKey, Ranking, SortKey, StatsBucket, Team, TeamKey, TeamRank};
