//! P(Doom) Simulation Core
//!
//! Deterministic, platform-agnostic turn engine for the P(Doom) lab
//! management game: doom momentum, risk pools, staff, events, and the
//! versioned persistence record. No UI or I/O lives here.

pub mod actions;
pub mod config;
pub mod constants;
pub mod data;
pub mod doom;
pub mod economy;
pub mod effects;
pub mod error;
pub mod events;
pub mod numbers;
pub mod researcher;
pub mod risk;
pub mod rng;
pub mod seed;
pub mod state;
pub mod turn;

use std::sync::Arc;

// Re-export commonly used types
pub use config::{
    ConfigError, DoomConfig, EconomyConfig, RiskConfig, SimConfig, StaffConfig, StartConfig,
    StartingHire,
};
pub use data::{
    ActionDef, CatalogError, Comparison, Condition, Effect, EventDef, EventOption, GameData,
    RiskEventTable, StateField, Trigger,
};
pub use doom::{DoomInputs, DoomModel, DoomSource, DoomTrend, DoomTurnReport};
pub use economy::{ActionPoints, ResourceCost, ResourceKind, Resources};
pub use effects::{ActionParams, EffectOutcome};
pub use error::{
    ErrorCategory, ErrorContext, ErrorReport, SerializationError, Severity, SimError, StateError,
    ValidationError,
};
pub use events::{EventPresentation, EventSource, PendingEvent, Resolution, SelectionTrace};
pub use researcher::{Researcher, ResearcherTrait, Specialization, StaffSummary, WorkStatus};
pub use risk::{RiskPoolId, RiskPools, RiskSeverity, RiskTier, RiskTrigger, TriggerCause};
pub use rng::GameRng;
pub use seed::{generate_code_from_entropy, normalize_seed, parse_share_code};
pub use state::{Ending, Phase, QueuedAction, SessionState};
pub use turn::{
    FailedAction, GameSession, NoRivals, Notification, RivalContribution, RivalLab, RivalLabs,
    RivalModel, TurnController, TurnReport, TurnStartReport,
};

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the action and event catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    fn load_game_data(&self) -> Result<GameData, Self::Error>;

    /// Load configuration data for a specific system
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Trait for abstracting save/load operations
/// Platform-specific implementations should provide this
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a persistence record
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be saved.
    fn save_game(&self, save_name: &str, record: &serde_json::Value) -> Result<(), Self::Error>;

    /// Load a persistence record
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be loaded.
    fn load_game(&self, save_name: &str) -> Result<Option<serde_json::Value>, Self::Error>;

    /// Delete saved game
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error>;
}

/// Config name passed to [`DataLoader::load_config`].
pub const SIM_CONFIG_NAME: &str = "sim";

/// Main game engine for managing a session
pub struct GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    data_loader: L,
    storage: S,
    active: Option<GameSession>,
}

impl<L, S> GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
    L::Error: Into<anyhow::Error>,
    S::Error: Into<anyhow::Error>,
{
    /// Create a new game engine with the provided data loader and storage
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
            active: None,
        }
    }

    fn load_inputs(&self) -> anyhow::Result<(Arc<GameData>, SimConfig)> {
        let data = self.data_loader.load_game_data().map_err(Into::into)?;
        data.validate().map_err(SimError::from)?;
        let config: SimConfig = self
            .data_loader
            .load_config(SIM_CONFIG_NAME)
            .map_err(Into::into)?;
        config.validate().map_err(SimError::from)?;
        Ok((Arc::new(data), config))
    }

    /// Start a new session, replacing any active one.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog or configuration cannot be loaded or
    /// fails validation.
    pub fn create_session(
        &mut self,
        seed: &str,
        rival: Box<dyn RivalModel>,
    ) -> anyhow::Result<&mut GameSession> {
        let (data, config) = self.load_inputs()?;
        log::info!("creating session for seed {seed}");
        Ok(self.active.insert(GameSession::new(seed, data, config, rival)))
    }

    /// Borrow the active session.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NotInitialized`] before any session exists.
    pub fn session(&self) -> Result<&GameSession, StateError> {
        self.active.as_ref().ok_or(StateError::NotInitialized)
    }

    /// Mutably borrow the active session.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NotInitialized`] before any session exists.
    pub fn session_mut(&mut self) -> Result<&mut GameSession, StateError> {
        self.active.as_mut().ok_or(StateError::NotInitialized)
    }

    /// Persist the active session
    ///
    /// # Errors
    ///
    /// Returns an error if no session is active or the record cannot be saved.
    pub fn save_game(&self, save_name: &str) -> anyhow::Result<()> {
        let record = self.session().map_err(SimError::from)?.to_record()?;
        self.storage
            .save_game(save_name, &record)
            .map_err(Into::into)?;
        log::debug!("saved session to {save_name}");
        Ok(())
    }

    /// Restore a saved session as the active one
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be read or the record is rejected.
    pub fn load_game(
        &mut self,
        save_name: &str,
        rival: Box<dyn RivalModel>,
    ) -> anyhow::Result<Option<&mut GameSession>> {
        let Some(record) = self.storage.load_game(save_name).map_err(Into::into)? else {
            return Ok(None);
        };
        let (data, config) = self.load_inputs()?;
        let session = GameSession::from_record(&record, data, config, rival)
            .inspect_err(|err| log::warn!("rejected save {save_name}: {err}"))?;
        Ok(Some(self.active.insert(session)))
    }

    /// Delete a saved game
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    pub fn delete_save(&self, save_name: &str) -> anyhow::Result<()> {
        self.storage.delete_save(save_name).map_err(Into::into)
    }
}
