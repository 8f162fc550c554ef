//! Identifier helpers

use bech32::Bech32m;
use uuid7::uuid7;

use crate::error::LifecycleError;

pub const JOB_HRP: &str = "jc";
pub const INSPECTION_HRP: &str = "insp";
pub const HISTORY_HRP: &str = "hist";
pub const RETREAD_HRP: &str = "rt";
pub const REPAIR_HRP: &str = "rep";
pub const VEHICLE_HRP: &str = "veh";

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Mints an entity id for use inside a transition.
pub(crate) fn mint_id(hrp: &str) -> Result<String, LifecycleError> {
    new_uuid_to_bech32(hrp).map_err(|e| LifecycleError::Identifier(e.to_string()))
}

/// Mock TPMS sensor id, `TPMS-` followed by four hex digits.
pub fn new_sensor_id() -> String {
    let id = uuid7();
    let bytes = id.as_bytes();
    format!("TPMS-{}", hex::encode_upper(&bytes[14..16]))
}

/// Short random suffix for generated serials.
pub(crate) fn short_suffix() -> String {
    let id = uuid7();
    hex::encode_upper(&id.as_bytes()[10..13])
}
