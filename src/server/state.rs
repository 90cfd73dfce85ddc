use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;
use crate::enrichment::Enricher;
use crate::generation::PlaylistGenerator;

pub type GuardedGenerator = Arc<PlaylistGenerator>;
pub type GuardedEnricher = Arc<Enricher>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub generator: GuardedGenerator,
    pub enricher: GuardedEnricher,
    pub hash: String,
}

impl ServerState {
    pub fn new(config: ServerConfig, generator: PlaylistGenerator, enricher: Enricher) -> Self {
        ServerState {
            config,
            start_time: Instant::now(),
            generator: Arc::new(generator),
            enricher: Arc::new(enricher),
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

impl FromRef<ServerState> for GuardedGenerator {
    fn from_ref(input: &ServerState) -> Self {
        input.generator.clone()
    }
}

impl FromRef<ServerState> for GuardedEnricher {
    fn from_ref(input: &ServerState) -> Self {
        input.enricher.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
