use parrainage::ceremony::{
    Ceremony, CeremonyBlueprint, JsonDirectoryStore, MatchEngine, SessionTimings,
};
use parrainage::config::AppConfig;
use parrainage::error::AppError;
use parrainage::telemetry;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub(crate) struct Context {
    pub(crate) config: AppConfig,
}

impl Context {
    pub(crate) fn load() -> Result<Self, AppError> {
        let config = AppConfig::load()?;
        telemetry::init(&config.telemetry)?;
        debug!(
            environment = ?config.environment,
            data_dir = %config.storage.data_dir.display(),
            "configuration loaded"
        );
        Ok(Self { config })
    }

    pub(crate) fn open(&self) -> Result<Ceremony<JsonDirectoryStore>, AppError> {
        self.open_with(self.config.draw.timings())
    }

    pub(crate) fn open_with(
        &self,
        timings: SessionTimings,
    ) -> Result<Ceremony<JsonDirectoryStore>, AppError> {
        let store = JsonDirectoryStore::new(&self.config.storage.data_dir);
        let engine = MatchEngine::with_optional_seed(self.config.draw.seed);
        let blueprint = CeremonyBlueprint::standard().with_timings(timings);
        Ok(Ceremony::open(blueprint, store, engine)?)
    }
}

/// Files are taken as given; directories contribute their direct entries,
/// sorted by name.
pub(crate) fn expand_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, AppError> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries = list_files(input)?;
            entries.sort();
            paths.extend(entries);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}
