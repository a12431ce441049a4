//! Hardware/OS descriptors captured on launch, cached locally and upserted
//! on the server.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::ApiClient,
    error::ClientError,
    session::Session,
    utils::storage::{keys, StorageError},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub os_name: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub os_build_id: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub total_memory: Option<u64>,
    #[serde(default)]
    pub supported_cpu_architectures: Vec<String>,
    #[serde(default)]
    pub device_year_class: Option<i32>,
    #[serde(default)]
    pub is_device: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_id: Option<String>,
}

impl DeviceInfo {
    /// Display grouping: (category, [(label, value)]). Empty fields are skipped.
    pub fn categories(&self) -> Vec<(&'static str, Vec<(&'static str, String)>)> {
        fn push(out: &mut Vec<(&'static str, String)>, label: &'static str, value: Option<String>) {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                out.push((label, value));
            }
        }

        let mut device = Vec::new();
        push(&mut device, "brand", self.brand.clone());
        push(&mut device, "manufacturer", self.manufacturer.clone());
        push(&mut device, "modelName", self.model_name.clone());
        push(&mut device, "deviceName", self.device_name.clone());
        push(&mut device, "deviceType", self.device_type.clone());
        device.push(("isDevice", self.is_device.to_string()));

        let mut system = Vec::new();
        push(&mut system, "osName", self.os_name.clone());
        push(&mut system, "osVersion", self.os_version.clone());
        push(&mut system, "osBuildId", self.os_build_id.clone());

        let mut hardware = Vec::new();
        push(
            &mut hardware,
            "deviceYearClass",
            self.device_year_class.map(|y| y.to_string()),
        );
        push(
            &mut hardware,
            "totalMemory",
            self.total_memory.map(|m| m.to_string()),
        );
        push(
            &mut hardware,
            "supportedCpuArchitectures",
            Some(self.supported_cpu_architectures.join(", ")),
        );

        vec![("Device", device), ("System", system), ("Hardware", hardware)]
            .into_iter()
            .filter(|(_, entries)| !entries.is_empty())
            .collect()
    }
}

pub trait DeviceInfoSource: Send + Sync {
    fn capture(&self) -> DeviceInfo;
}

/// Descriptors of the machine the process runs on.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostDevice;

impl DeviceInfoSource for HostDevice {
    fn capture(&self) -> DeviceInfo {
        let device_name = ["HOSTNAME", "COMPUTERNAME"]
            .iter()
            .find_map(|key| std::env::var(key).ok())
            .filter(|name| !name.is_empty());
        DeviceInfo {
            device_name,
            os_name: Some(std::env::consts::OS.to_string()),
            os_version: None,
            device_type: Some("desktop".to_string()),
            supported_cpu_architectures: vec![std::env::consts::ARCH.to_string()],
            is_device: true,
            ..DeviceInfo::default()
        }
    }
}

/// Stable per-install identifier, created on first use.
pub async fn ensure_install_id(session: &Session) -> Result<String, StorageError> {
    let store = session.store();
    if let Some(existing) = store
        .get_item(keys::INSTALL_ID)
        .await?
        .filter(|id| !id.is_empty())
    {
        return Ok(existing);
    }
    let generated = Uuid::new_v4().to_string();
    store.set_item(keys::INSTALL_ID, &generated).await?;
    Ok(generated)
}

pub async fn cached_device_info(session: &Session) -> Result<Option<DeviceInfo>, StorageError> {
    let Some(raw) = session.store().get_item(keys::DEVICE_INFO).await? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::Corrupt {
            key: keys::DEVICE_INFO.to_string(),
            source,
        })
}

/// Capture, cache locally, then upsert on the server. The local cache is
/// written before the request so the device screen has data even when the
/// upload fails.
pub async fn register_device(
    api: &ApiClient,
    source: &dyn DeviceInfoSource,
) -> Result<DeviceInfo, ClientError> {
    let mut info = source.capture();
    info.install_id = Some(ensure_install_id(api.session()).await?);

    let raw = serde_json::to_string(&info).map_err(|source| StorageError::Corrupt {
        key: keys::DEVICE_INFO.to_string(),
        source,
    })?;
    api.session()
        .store()
        .set_item(keys::DEVICE_INFO, &raw)
        .await?;

    api.save_device_info(&info).await?;
    tracing::debug!(install_id = ?info.install_id, "Device info registered");
    Ok(info)
}
