pub mod config;
pub mod entries;
pub mod error;
pub mod jobs;
pub mod provider;
pub mod sync;

pub use config::{ActiveHours, Config, PollSettings};
pub use entries::{EntryImport, ImportReport, RebuyReport, apply_rebuys, import_entries};
pub use error::{PollerError, Result};
pub use jobs::{DriverExit, JobRegistry, PollContext, PollOutcome, StoreSource, poll_once, run_driver};
pub use provider::{
    Fixture, FixtureProvider, LeaderboardProvider, ProviderLeaderboard, ProviderTournament,
    SlashGolfClient, TournamentKey,
};
pub use sync::{RecheckReport, SyncReport, SyncService};
