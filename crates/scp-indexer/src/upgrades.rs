use crate::constants::FIRST_SCP_BLOCK;

/// Answers whether height-gated protocol upgrades are active.
pub trait UpgradeOracle: Send + Sync {
    /// Indexed contract addressing (`id<index>`).
    fn is_token_indexing_active(&self, height: u32) -> bool;

    /// SCP-4 NFT collections.
    fn is_scp4_active(&self, height: u32) -> bool;
}

/// [`UpgradeOracle`] driven by fixed activation heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationHeights {
    pub token_indexing: u32,
    pub scp4: u32,
}

impl Default for ActivationHeights {
    fn default() -> Self {
        Self {
            token_indexing: FIRST_SCP_BLOCK,
            scp4: FIRST_SCP_BLOCK,
        }
    }
}

impl UpgradeOracle for ActivationHeights {
    fn is_token_indexing_active(&self, height: u32) -> bool {
        height >= self.token_indexing
    }

    fn is_scp4_active(&self, height: u32) -> bool {
        height >= self.scp4
    }
}
