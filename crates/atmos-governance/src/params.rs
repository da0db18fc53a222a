//! Governance parameters.
//!
//! Admin-controlled configuration read by voting, delegation and AtmosPay.
//! Loadable from TOML so hosts can ship a parameter file per network.

use std::path::Path;
use serde::{Deserialize, Serialize};
use borsh::BorshSerialize;
use atmos_types::Address;
use crate::error::GovernanceError;
use crate::{BPS_DENOMINATOR, MS_PER_DAY};

/// Burn rate ceiling (10%).
pub const MAX_BURN_RATE_BPS: u16 = 1_000;

/// Delegation fee ceiling (20%).
pub const MAX_DELEGATION_FEE_CAP_BPS: u16 = 2_000;

/// Mutable protocol configuration.
///
/// Fields are read through accessors; a live parameter set changes only via
/// [`GovernanceParams::update_params`]:
///
/// ```compile_fail
/// let mut params = atmos_governance::GovernanceParams::default();
/// params.burn_rate_bps = 0;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(default)]
pub struct GovernanceParams {
    /// Address allowed to update parameters
    admin: Address,
    /// Quorum as basis points of `quorum_reference_weight`
    quorum_bps: u16,
    /// Share of each agent transaction that is burned
    burn_rate_bps: u16,
    /// Highest fee a delegation may carry
    max_delegation_fee_bps: u16,
    /// Voting window used when a proposal does not specify one
    default_proposal_window_ms: u64,
    /// Reference total vote weight the quorum is measured against
    quorum_reference_weight: u64,
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            admin: Address::ZERO,
            quorum_bps: 400,   // 4%
            burn_rate_bps: 50, // 0.5%
            max_delegation_fee_bps: MAX_DELEGATION_FEE_CAP_BPS,
            default_proposal_window_ms: 7 * MS_PER_DAY,
            quorum_reference_weight: 100_000,
        }
    }
}

impl GovernanceParams {
    /// Default parameters administered by `admin`.
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            ..Self::default()
        }
    }

    pub fn with_quorum_bps(mut self, quorum_bps: u16) -> Self {
        self.quorum_bps = quorum_bps;
        self
    }

    pub fn with_burn_rate_bps(mut self, burn_rate_bps: u16) -> Self {
        self.burn_rate_bps = burn_rate_bps;
        self
    }

    pub fn with_max_delegation_fee_bps(mut self, max_delegation_fee_bps: u16) -> Self {
        self.max_delegation_fee_bps = max_delegation_fee_bps;
        self
    }

    pub fn with_default_proposal_window_ms(mut self, window_ms: u64) -> Self {
        self.default_proposal_window_ms = window_ms;
        self
    }

    pub fn with_quorum_reference_weight(mut self, weight: u64) -> Self {
        self.quorum_reference_weight = weight;
        self
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn quorum_bps(&self) -> u16 {
        self.quorum_bps
    }

    pub fn burn_rate_bps(&self) -> u16 {
        self.burn_rate_bps
    }

    pub fn max_delegation_fee_bps(&self) -> u16 {
        self.max_delegation_fee_bps
    }

    pub fn default_proposal_window_ms(&self) -> u64 {
        self.default_proposal_window_ms
    }

    pub fn quorum_reference_weight(&self) -> u64 {
        self.quorum_reference_weight
    }

    /// Minimum total vote weight a proposal needs to pass.
    pub fn quorum_threshold(&self) -> u64 {
        (self.quorum_reference_weight as u128 * self.quorum_bps as u128 / BPS_DENOMINATOR as u128) as u64
    }

    /// Check parameter bounds.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.quorum_bps as u64 > BPS_DENOMINATOR {
            return Err(GovernanceError::InvalidParameter(format!(
                "quorum_bps {} exceeds 10000",
                self.quorum_bps
            )));
        }
        if self.burn_rate_bps > MAX_BURN_RATE_BPS {
            return Err(GovernanceError::InvalidParameter(format!(
                "burn_rate_bps {} exceeds {}",
                self.burn_rate_bps, MAX_BURN_RATE_BPS
            )));
        }
        if self.max_delegation_fee_bps > MAX_DELEGATION_FEE_CAP_BPS {
            return Err(GovernanceError::InvalidParameter(format!(
                "max_delegation_fee_bps {} exceeds {}",
                self.max_delegation_fee_bps, MAX_DELEGATION_FEE_CAP_BPS
            )));
        }
        if self.default_proposal_window_ms == 0 {
            return Err(GovernanceError::InvalidParameter(
                "default_proposal_window_ms cannot be 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Replace all parameters. Only the current admin may do this.
    pub fn update_params(&mut self, caller: Address, new: GovernanceParams) -> Result<(), GovernanceError> {
        if caller != self.admin {
            return Err(GovernanceError::NotAdmin);
        }
        new.validate()?;

        tracing::info!(
            quorum_bps = new.quorum_bps,
            burn_rate_bps = new.burn_rate_bps,
            max_delegation_fee_bps = new.max_delegation_fee_bps,
            "Governance parameters updated"
        );
        *self = new;
        Ok(())
    }

    /// Parse and validate parameters from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self, GovernanceError> {
        let params: GovernanceParams =
            toml::from_str(s).map_err(|e| GovernanceError::Config(format!("Failed to parse parameters: {}", e)))?;
        params.validate()?;
        Ok(params)
    }

    /// Load parameters from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, GovernanceError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GovernanceError::Config(format!("Failed to read parameter file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, GovernanceError> {
        toml::to_string_pretty(self).map_err(|e| GovernanceError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn admin() -> Address {
        Address::from_bytes([9u8; 20])
    }

    #[test]
    fn test_default_params_valid() {
        let params = GovernanceParams::new(admin());
        assert!(params.validate().is_ok());
        assert_eq!(params.quorum_threshold(), 4_000);
    }

    #[test]
    fn test_update_requires_admin() {
        let mut params = GovernanceParams::new(admin());
        let next = params.clone().with_burn_rate_bps(100);

        let stranger = Address::from_bytes([1u8; 20]);
        assert_eq!(params.update_params(stranger, next.clone()), Err(GovernanceError::NotAdmin));

        params.update_params(admin(), next).unwrap();
        assert_eq!(params.burn_rate_bps(), 100);
    }

    #[test]
    fn test_update_rejects_out_of_bounds() {
        let mut params = GovernanceParams::new(admin());
        let next = params.clone().with_burn_rate_bps(1_001);
        assert!(params.update_params(admin(), next).is_err());

        let next = params.clone().with_max_delegation_fee_bps(2_001);
        assert!(params.update_params(admin(), next).is_err());

        // Unchanged after rejection
        assert_eq!(params, GovernanceParams::new(admin()));
    }

    #[test]
    fn test_toml_partial_uses_defaults() {
        let params = GovernanceParams::from_toml_str("quorum_bps = 1000\n").unwrap();
        assert_eq!(params.quorum_bps(), 1_000);
        assert_eq!(params.burn_rate_bps(), 50);
    }

    #[test]
    fn test_toml_admin_hex_or_bech32() {
        let hex_admin = format!("admin = \"0x{}\"\n", "09".repeat(20));
        assert_eq!(GovernanceParams::from_toml_str(&hex_admin).unwrap().admin(), admin());

        let bech_admin = format!("admin = \"{}\"\n", admin());
        assert_eq!(GovernanceParams::from_toml_str(&bech_admin).unwrap().admin(), admin());
    }

    #[test]
    fn test_toml_roundtrip_file() {
        let params = GovernanceParams::new(admin());
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(params.to_toml_string().unwrap().as_bytes()).unwrap();

        let loaded = GovernanceParams::from_file(file.path()).unwrap();
        assert_eq!(loaded, params);
    }

    #[test]
    fn test_toml_invalid_rejected() {
        assert!(matches!(
            GovernanceParams::from_toml_str("burn_rate_bps = 5000\n"),
            Err(GovernanceError::InvalidParameter(_))
        ));
        assert!(matches!(
            GovernanceParams::from_toml_str("quorum_bps = \"lots\"\n"),
            Err(GovernanceError::Config(_))
        ));
    }
}
