use super::layout::DataLayout;
use super::platform::Architecture;
use crate::errors::LcsxResult;
use crate::net::Fetcher;

/// Everything a component needs from the process: where data lives, how
/// to download, and which architecture to provision for.
///
/// Created once at startup and handed to component constructors by
/// reference. Components hold no other process-wide state.
#[derive(Debug, Clone)]
pub struct LcsxContext {
    layout: DataLayout,
    fetcher: Fetcher,
    arch: Architecture,
}

impl LcsxContext {
    pub fn new(layout: DataLayout, fetcher: Fetcher, arch: Architecture) -> Self {
        Self {
            layout,
            fetcher,
            arch,
        }
    }

    /// Context for the running host with the default HTTP(S) fetcher.
    pub fn for_host(layout: DataLayout) -> LcsxResult<Self> {
        Ok(Self::new(layout, Fetcher::with_defaults()?, Architecture::host()?))
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn arch(&self) -> Architecture {
        self.arch
    }

    /// Same fetcher and architecture over another data directory.
    pub fn relocated(&self, layout: DataLayout) -> Self {
        Self {
            layout,
            fetcher: self.fetcher.clone(),
            arch: self.arch,
        }
    }
}
