//! Mind Wellness Core Library
//!
//! Client data layer for Mind Wellness applications: owner-scoped collection
//! access with optimistic mutations, the feature record types, and daily
//! water intake tracking.

pub mod auth;
pub mod config;
pub mod models;
pub mod store;
pub mod water;

pub use auth::AuthSession;
pub use config::{Config, ConfigError, ConfigSource, ConfigValue, RemoteConfig};
pub use models::{FoodItem, MealEntry, MealType, MeditationSession, MoodEntry};
pub use store::{
    CollectionStore, DocumentId, DocumentIdError, DocumentStore, Entry, Filter, HttpDocumentStore,
    InsertReceipt, MemoryStore, OwnerId, Query, ReadFilter, ReadOptions, RemoteDocument,
    SortOrder, StoreError,
};
pub use water::{WaterIntake, WaterTracker};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
