//! # Pose/Jacobian cache
//!
//! Holds the last successfully decoded link pose/Jacobian data. A failed
//! refresh, whether the provider or the decode failed, leaves the previous
//! contents untouched so the safety boundary keeps working with the last
//! good data.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use thiserror::Error;

// Internal
use arm_if::{
    eqpt::arm::{PoseJacDecodeError, PoseJacMap},
    svc::{PoseJacProvider, SvcError},
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors raised by a cache refresh.
#[derive(Debug, Error)]
pub enum PoseJacCacheError {
    #[error("Failed to get pose/Jacobian data from the provider: {0}")]
    ProviderError(#[from] SvcError),

    #[error("Failed to decode the pose/Jacobian response: {0}")]
    DecodeError(#[from] PoseJacDecodeError),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Cache of the most recent good pose/Jacobian data for the monitored links.
pub struct PoseJacCache {
    /// The arm the provider is queried for.
    arm_id: String,

    /// The links decoded out of each response, in declaration order.
    link_names: Vec<String>,

    /// The last successfully decoded map, `None` until the first refresh
    /// succeeds.
    map: Option<PoseJacMap>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PoseJacCache {
    /// Create an empty cache for the given arm and links.
    pub fn new(arm_id: &str, link_names: &[String]) -> Self {
        Self {
            arm_id: arm_id.to_string(),
            link_names: link_names.to_vec(),
            map: None,
        }
    }

    /// Query the provider and replace the cached map.
    ///
    /// The new map only replaces the old one once the whole response has
    /// decoded, there is never a half-updated map to read.
    pub fn refresh<P: PoseJacProvider>(&mut self, provider: &mut P) -> Result<(), PoseJacCacheError> {
        let response = provider.get_pose_jac(&self.arm_id)?;
        let map = response.unpack(&self.link_names)?;

        trace!("Pose/Jacobian cache refreshed for {} links", map.len());
        self.map = Some(map);

        Ok(())
    }

    /// The last successfully decoded map, if any refresh has succeeded yet.
    pub fn get(&self) -> Option<&PoseJacMap> {
        self.map.as_ref()
    }
}
