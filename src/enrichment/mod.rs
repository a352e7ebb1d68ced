//! Tempo enrichment - backfills feature records from an external lookup service.
//!
//! # Architecture
//!
//! This module follows a clean separation between:
//! - **Domain models** (`domain.rs`) - queries, candidates and [`LookupError`]
//! - **API DTOs** (`getsongbpm/dto.rs`) - exact API response shapes
//! - **Adapters** - convert DTOs to domain models
//! - **Clients** - HTTP client for the lookup API
//! - **Matching** (`matching.rs`) - title cleaning and title/artist scoring
//! - **Pipeline** (`pipeline.rs`) - the rate-limited background worker
//!
//! # Usage
//!
//! ```ignore
//! use enrichment::{EnrichmentPipeline, GetSongBpmClient, PipelineConfig};
//!
//! let client = GetSongBpmClient::new(api_key)?;
//! let pipeline = EnrichmentPipeline::new(Arc::new(client), feature_cache, PipelineConfig::default());
//! pipeline.start(library.missing_tracks());
//! let status = pipeline.wait().await;
//! ```

pub mod domain;
pub mod getsongbpm;
pub mod matching;
pub mod pipeline;
pub mod traits;

pub use domain::{LookupError, LookupQuery, SongCandidate};
pub use getsongbpm::GetSongBpmClient;
pub use matching::{clean_search_term, find_best_match};
pub use pipeline::{
    EnrichmentEvent, EnrichmentPipeline, EnrichmentStatus, FatalCondition, PipelineConfig, PipelineState,
};
pub use traits::FeatureLookup;
