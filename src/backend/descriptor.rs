//! Backend descriptors: everything the dispatch core knows about a backend

use super::native::NativeRef;
use crate::device::{Device, DeviceKind};
use crate::dtype::{DType, DTypeCategory, DTypeSet};
use crate::error::{Error, Result};
use crate::ops::{OpEntry, OpId, OperatorTable, REQUIRED};
use crate::tensor::HostArray;
use std::fmt;

/// Wrap host data as the backend's native array
pub type FromHostFn = fn(HostArray, &Device) -> NativeRef;

/// Map an invalid dtype to the closest dtype the backend accepts
pub type ClosestValidFn = fn(DType) -> DType;

/// Capability flags
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Features {
    /// Arrays can be mutated in place by the backend
    pub native_inplace_support: bool,
    /// Gradient operators are available
    pub supports_gradients: bool,
}

/// Frozen per-backend capability table
pub struct BackendDescriptor {
    name: &'static str,
    native_types: Vec<(DType, &'static str)>,
    invalid_dtypes: DTypeSet,
    valid_devices: Vec<Device>,
    invalid_device_kinds: Vec<DeviceKind>,
    features: Features,
    closest_valid: Option<ClosestValidFn>,
    from_host: FromHostFn,
    table: OperatorTable,
}

impl BackendDescriptor {
    /// Start describing a backend
    pub fn builder(name: &'static str, from_host: FromHostFn) -> BackendBuilder {
        BackendBuilder {
            name,
            native_types: Vec::new(),
            invalid_dtypes: DTypeSet::EMPTY,
            valid_devices: vec![Device::cpu()],
            invalid_device_kinds: Vec::new(),
            features: Features::default(),
            closest_valid: None,
            from_host,
            table: OperatorTable::default(),
        }
    }

    /// Backend name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Capability flags
    #[inline]
    pub fn features(&self) -> Features {
        self.features
    }

    /// Whether gradient operators are available
    #[inline]
    pub fn supports_gradients(&self) -> bool {
        self.features.supports_gradients
    }

    /// Backend-native alias of a canonical dtype
    pub fn native_type(&self, dtype: DType) -> Option<&'static str> {
        if self.invalid_dtypes.contains(dtype) {
            return None;
        }
        self.native_types
            .iter()
            .find(|(d, _)| *d == dtype)
            .map(|(_, alias)| *alias)
            .or(Some(dtype.name()))
    }

    /// Canonical dtype of a backend-native alias or canonical name
    pub fn canonical_dtype(&self, name: &str) -> Option<DType> {
        self.native_types
            .iter()
            .find(|(_, alias)| *alias == name)
            .map(|(d, _)| *d)
            .or_else(|| DType::from_name(name))
    }

    /// Dtypes the backend cannot represent
    #[inline]
    pub fn invalid_dtypes(&self) -> DTypeSet {
        self.invalid_dtypes
    }

    /// Dtypes the backend can represent
    #[inline]
    pub fn valid_dtypes(&self) -> DTypeSet {
        DTypeSet::ALL.difference(self.invalid_dtypes)
    }

    /// Valid dtypes of one category
    pub fn valid_dtypes_of(&self, category: DTypeCategory) -> Vec<DType> {
        self.valid_dtypes()
            .iter()
            .filter(|d| d.category() == category)
            .collect()
    }

    /// Whether `dtype` is representable
    #[inline]
    pub fn is_valid_dtype(&self, dtype: DType) -> bool {
        !self.invalid_dtypes.contains(dtype)
    }

    /// `dtype` itself when valid, else the backend's closest valid dtype
    pub fn closest_valid_dtype(&self, dtype: DType) -> DType {
        if self.is_valid_dtype(dtype) {
            return dtype;
        }
        match self.closest_valid {
            Some(f) => f(dtype),
            None => self.valid_dtypes().nearest(dtype).unwrap_or(DType::F32),
        }
    }

    /// Devices arrays can be placed on
    #[inline]
    pub fn valid_devices(&self) -> &[Device] {
        &self.valid_devices
    }

    /// Device kinds the backend explicitly cannot use
    #[inline]
    pub fn invalid_device_kinds(&self) -> &[DeviceKind] {
        &self.invalid_device_kinds
    }

    /// First valid device
    pub fn default_device(&self) -> Device {
        self.valid_devices.first().copied().unwrap_or_default()
    }

    /// Fail with `DeviceUnavailable` unless `device` is valid
    pub fn check_device(&self, device: &Device) -> Result<()> {
        if self.valid_devices.contains(device) {
            Ok(())
        } else {
            Err(Error::DeviceUnavailable {
                device: device.to_string(),
                backend: self.name,
            })
        }
    }

    /// Bound entry for `op`
    #[inline]
    pub fn entry(&self, op: OpId) -> Option<&OpEntry> {
        self.table.get(op)
    }

    /// Bound entry, or `BackendMissingOperator`
    pub fn require(&self, op: OpId) -> Result<&OpEntry> {
        self.entry(op).ok_or_else(|| Error::BackendMissingOperator {
            op: op.name().to_string(),
            backend: self.name,
        })
    }

    /// Whether `op` is bound
    #[inline]
    pub fn has_operator(&self, op: OpId) -> bool {
        self.table.contains(op)
    }

    /// The operator table
    #[inline]
    pub fn table(&self) -> &OperatorTable {
        &self.table
    }

    /// Wrap host data as this backend's native array
    #[inline]
    pub fn wrap(&self, data: HostArray, device: &Device) -> NativeRef {
        (self.from_host)(data, device)
    }
}

impl fmt::Debug for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendDescriptor")
            .field("name", &self.name)
            .field("invalid_dtypes", &self.invalid_dtypes)
            .field("valid_devices", &self.valid_devices)
            .field("features", &self.features)
            .field("operators", &self.table.len())
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`BackendDescriptor`]
pub struct BackendBuilder {
    name: &'static str,
    native_types: Vec<(DType, &'static str)>,
    invalid_dtypes: DTypeSet,
    valid_devices: Vec<Device>,
    invalid_device_kinds: Vec<DeviceKind>,
    features: Features,
    closest_valid: Option<ClosestValidFn>,
    from_host: FromHostFn,
    table: OperatorTable,
}

impl BackendBuilder {
    /// Register a native alias for a dtype
    pub fn native_type(mut self, dtype: DType, alias: &'static str) -> Self {
        self.native_types.push((dtype, alias));
        self
    }

    /// Dtypes the backend cannot represent
    pub fn invalid_dtypes(mut self, dtypes: DTypeSet) -> Self {
        self.invalid_dtypes = dtypes;
        self
    }

    /// Devices arrays can be placed on
    pub fn devices(mut self, devices: &[Device]) -> Self {
        self.valid_devices = devices.to_vec();
        self
    }

    /// Device kinds the backend cannot use
    pub fn invalid_device_kinds(mut self, kinds: &[DeviceKind]) -> Self {
        self.invalid_device_kinds = kinds.to_vec();
        self
    }

    /// Capability flags
    pub fn features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    /// Closest-valid-dtype function; defaults to `DTypeSet::nearest`
    pub fn closest_valid(mut self, f: ClosestValidFn) -> Self {
        self.closest_valid = Some(f);
        self
    }

    /// Export a callable under a name; names outside the operator whitelist
    /// are ignored with a warning
    pub fn export(mut self, name: &str, entry: OpEntry) -> Self {
        match OpId::from_name(name) {
            Some(op) => self.table.insert(op, entry),
            None => {
                tracing::warn!(backend = self.name, export = name, "ignoring export with unknown operator name");
            }
        }
        self
    }

    /// Export several callables
    pub fn exports<'n>(self, entries: impl IntoIterator<Item = (&'n str, OpEntry)>) -> Self {
        entries
            .into_iter()
            .fold(self, |b, (name, entry)| b.export(name, entry))
    }

    /// Bind an operator by id
    pub fn bind(mut self, op: OpId, entry: OpEntry) -> Self {
        self.table.insert(op, entry);
        self
    }

    /// Unbind an operator
    pub fn unbind(mut self, op: OpId) -> Self {
        self.table.remove(op);
        self
    }

    /// Adjust the flags of a bound operator
    pub fn modify(mut self, op: OpId, f: impl FnOnce(OpEntry) -> OpEntry) -> Self {
        if let Some(entry) = self.table.get_mut(op) {
            *entry = f(*entry);
        }
        self
    }

    /// Validate and freeze the descriptor
    pub fn build(self) -> Result<BackendDescriptor> {
        if let Some(op) = REQUIRED.iter().find(|op| !self.table.contains(**op)) {
            return Err(Error::BackendMissingOperator {
                op: op.name().to_string(),
                backend: self.name,
            });
        }
        if self.valid_devices.is_empty() {
            return Err(Error::invalid_argument("devices", format!(
                "backend '{}' declares no valid device",
                self.name
            )));
        }
        if let Some(device) = self
            .valid_devices
            .iter()
            .find(|d| self.invalid_device_kinds.contains(&d.kind()))
        {
            return Err(Error::invalid_argument("devices", format!(
                "backend '{}' lists {device} as both valid and invalid",
                self.name
            )));
        }
        let descriptor = BackendDescriptor {
            name: self.name,
            native_types: self.native_types,
            invalid_dtypes: self.invalid_dtypes,
            valid_devices: self.valid_devices,
            invalid_device_kinds: self.invalid_device_kinds,
            features: self.features,
            closest_valid: self.closest_valid,
            from_host: self.from_host,
            table: self.table,
        };
        if let Some(bad) = descriptor
            .invalid_dtypes
            .iter()
            .find(|d| !descriptor.is_valid_dtype(descriptor.closest_valid_dtype(*d)))
        {
            return Err(Error::invalid_argument("closest_valid", format!(
                "backend '{}' maps invalid {bad} to another invalid dtype",
                descriptor.name
            )));
        }
        Ok(descriptor)
    }
}
