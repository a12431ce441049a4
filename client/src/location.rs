//! Device position plus reverse geocoding, folded into the single location
//! payload that check-in and check-out require.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Notice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placemark {
    pub name: Option<String>,
    pub street: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl Placemark {
    /// Non-empty components joined with ", ", or `None` when nothing is left.
    pub fn to_address(&self) -> Option<String> {
        let parts: Vec<&str> = [
            &self.name,
            &self.street,
            &self.district,
            &self.city,
            &self.region,
            &self.postal_code,
            &self.country,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref().map(str::trim))
        .filter(|part| !part.is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Location payload posted with check-in/check-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location provider failed: {0}")]
    Provider(String),

    #[error("Reverse geocoding failed: {0}")]
    Geocode(String),
}

impl LocationError {
    pub fn code(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied => "PERMISSION_DENIED",
            LocationError::Provider(_) => "LOCATION_UNAVAILABLE",
            LocationError::Geocode(_) => "GEOCODE_FAILED",
        }
    }

    pub fn notice(&self) -> Notice {
        match self {
            LocationError::PermissionDenied => Notice::new(
                "Permission Denied",
                "Please grant location permissions to use this feature",
            ),
            _ => Notice::error("Failed to get your location"),
        }
    }
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_foreground_permission(&self) -> Result<PermissionStatus, LocationError>;
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse_geocode(&self, at: Coordinates) -> Result<Vec<Placemark>, LocationError>;
}

#[derive(Clone)]
pub struct LocationResolver {
    provider: Arc<dyn LocationProvider>,
    geocoder: Arc<dyn Geocoder>,
}

impl LocationResolver {
    pub fn new(provider: Arc<dyn LocationProvider>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { provider, geocoder }
    }

    pub async fn resolve(&self) -> Result<ResolvedLocation, LocationError> {
        let status = self.provider.request_foreground_permission().await?;
        if status != PermissionStatus::Granted {
            tracing::warn!(?status, "Location permission not granted");
            return Err(LocationError::PermissionDenied);
        }

        let at = self.provider.current_position().await?;

        // An empty lookup still yields coordinates; a failed one aborts.
        let places = self.geocoder.reverse_geocode(at).await.map_err(|err| {
            tracing::warn!(error = %err, "Reverse geocoding failed");
            err
        })?;
        let address = places.first().and_then(Placemark::to_address);

        Ok(ResolvedLocation {
            latitude: at.latitude,
            longitude: at.longitude,
            address,
        })
    }
}

/// A position known up front, e.g. passed on the command line. Serves as
/// both provider and geocoder.
#[derive(Debug, Clone)]
pub struct FixedPosition {
    pub coordinates: Coordinates,
    pub address: Option<String>,
}

impl FixedPosition {
    pub fn new(latitude: f64, longitude: f64, address: Option<String>) -> Self {
        Self {
            coordinates: Coordinates {
                latitude,
                longitude,
            },
            address,
        }
    }

    pub fn resolver(self) -> LocationResolver {
        let shared = Arc::new(self);
        LocationResolver::new(shared.clone(), shared)
    }
}

#[async_trait]
impl LocationProvider for FixedPosition {
    async fn request_foreground_permission(&self) -> Result<PermissionStatus, LocationError> {
        Ok(PermissionStatus::Granted)
    }

    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.coordinates)
    }
}

#[async_trait]
impl Geocoder for FixedPosition {
    async fn reverse_geocode(&self, _at: Coordinates) -> Result<Vec<Placemark>, LocationError> {
        Ok(self
            .address
            .iter()
            .map(|address| Placemark {
                name: Some(address.clone()),
                ..Placemark::default()
            })
            .collect())
    }
}
