//! # Authorization Policy
//!
//! Which endpoints require a bearer credential, and which additionally
//! require the caller to own the `email` they query for. Deployments choose a
//! preset and may override single endpoints from a TOML file:
//!
//! ```toml
//! preset = "legacy"
//!
//! [gates]
//! create_parcel = "bearer"
//! record_payment = "bearer"
//! ```

use crate::error::{DeliveryError, DeliveryResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Requirement attached to one endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gate {
    /// No credential needed
    #[default]
    Open,
    /// Valid bearer token
    Bearer,
    /// Valid bearer token whose email matches the `email` query parameter
    Owner,
}

/// Named starting points for a policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyPreset {
    /// Email-scoped lists and single-parcel reads are gated, writes are open
    #[default]
    Legacy,
    /// Nothing is gated
    Open,
    /// Everything is gated
    Strict,
}

impl FromStr for PolicyPreset {
    type Err = DeliveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(PolicyPreset::Legacy),
            "open" => Ok(PolicyPreset::Open),
            "strict" => Ok(PolicyPreset::Strict),
            other => Err(DeliveryError::Configuration(format!(
                "unknown auth preset '{}' (expected legacy, open or strict)",
                other
            ))),
        }
    }
}

/// Gate-able endpoints. `GET /` and `GET /health` are always open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    UpsertUser,
    ListParcels,
    GetParcel,
    CreateParcel,
    DeleteParcel,
    ListRiders,
    CreateRider,
    UpdateRiderStatus,
    CreatePaymentIntent,
    RecordPayment,
    ListPayments,
    TrackingHistory,
    AddTracking,
}

impl Endpoint {
    pub const ALL: [Endpoint; 13] = [
        Endpoint::UpsertUser,
        Endpoint::ListParcels,
        Endpoint::GetParcel,
        Endpoint::CreateParcel,
        Endpoint::DeleteParcel,
        Endpoint::ListRiders,
        Endpoint::CreateRider,
        Endpoint::UpdateRiderStatus,
        Endpoint::CreatePaymentIntent,
        Endpoint::RecordPayment,
        Endpoint::ListPayments,
        Endpoint::TrackingHistory,
        Endpoint::AddTracking,
    ];

    /// Key used in policy files
    pub fn key(&self) -> &'static str {
        match self {
            Endpoint::UpsertUser => "upsert_user",
            Endpoint::ListParcels => "list_parcels",
            Endpoint::GetParcel => "get_parcel",
            Endpoint::CreateParcel => "create_parcel",
            Endpoint::DeleteParcel => "delete_parcel",
            Endpoint::ListRiders => "list_riders",
            Endpoint::CreateRider => "create_rider",
            Endpoint::UpdateRiderStatus => "update_rider_status",
            Endpoint::CreatePaymentIntent => "create_payment_intent",
            Endpoint::RecordPayment => "record_payment",
            Endpoint::ListPayments => "list_payments",
            Endpoint::TrackingHistory => "tracking_history",
            Endpoint::AddTracking => "add_tracking",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|endpoint| endpoint.key() == key)
    }

    /// Lists that take an `email` query parameter
    pub fn is_email_scoped(&self) -> bool {
        matches!(self, Endpoint::ListParcels | Endpoint::ListPayments)
    }
}

/// Per-endpoint gates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPolicy {
    preset: PolicyPreset,
    gates: HashMap<Endpoint, Gate>,
}

/// On-disk shape of a policy file
#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    preset: PolicyPreset,
    #[serde(default)]
    gates: HashMap<String, Gate>,
}

impl AuthPolicy {
    /// Build the gates for a preset
    pub fn preset(preset: PolicyPreset) -> Self {
        let gates = Endpoint::ALL
            .into_iter()
            .map(|endpoint| (endpoint, Self::preset_gate(preset, endpoint)))
            .collect();

        Self { preset, gates }
    }

    fn preset_gate(preset: PolicyPreset, endpoint: Endpoint) -> Gate {
        match preset {
            PolicyPreset::Open => Gate::Open,
            PolicyPreset::Legacy => match endpoint {
                Endpoint::ListParcels | Endpoint::ListPayments => Gate::Owner,
                Endpoint::GetParcel => Gate::Bearer,
                _ => Gate::Open,
            },
            PolicyPreset::Strict if endpoint.is_email_scoped() => Gate::Owner,
            PolicyPreset::Strict => Gate::Bearer,
        }
    }

    pub fn legacy() -> Self {
        Self::preset(PolicyPreset::Legacy)
    }

    pub fn open() -> Self {
        Self::preset(PolicyPreset::Open)
    }

    pub fn strict() -> Self {
        Self::preset(PolicyPreset::Strict)
    }

    /// Gate for one endpoint
    pub fn gate(&self, endpoint: Endpoint) -> Gate {
        self.gates.get(&endpoint).copied().unwrap_or_default()
    }

    /// Preset this policy started from
    pub fn base_preset(&self) -> PolicyPreset {
        self.preset
    }

    /// Override one endpoint with builder pattern
    pub fn with_gate(mut self, endpoint: Endpoint, gate: Gate) -> Self {
        self.gates.insert(endpoint, gate);
        self
    }

    /// Number of endpoints that need a credential
    pub fn gated_count(&self) -> usize {
        self.gates.values().filter(|g| **g != Gate::Open).count()
    }

    /// Parse a policy file. Unknown endpoint keys are configuration errors.
    pub fn from_toml_str(content: &str) -> DeliveryResult<Self> {
        Self::from_toml_with_preset(content, None)
    }

    /// Parse a policy file, replacing its preset when `preset` is given.
    /// Per-endpoint overrides still apply on top.
    pub fn from_toml_with_preset(
        content: &str,
        preset: Option<PolicyPreset>,
    ) -> DeliveryResult<Self> {
        let file: PolicyFile = toml::from_str(content)
            .map_err(|e| DeliveryError::Configuration(format!("invalid auth policy: {}", e)))?;

        let mut policy = Self::preset(preset.unwrap_or(file.preset));
        for (key, gate) in file.gates {
            let endpoint = Endpoint::from_key(&key).ok_or_else(|| {
                DeliveryError::Configuration(format!("unknown endpoint '{}' in auth policy", key))
            })?;
            policy.gates.insert(endpoint, gate);
        }

        Ok(policy)
    }
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self::legacy()
    }
}
