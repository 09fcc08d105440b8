use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::AdminConfig;
use crate::domain::customer::normalize_phone;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminLevel {
    SuperAdmin,
    Admin,
    User,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminPermission {
    Products,
    Orders,
}

impl AdminPermission {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "products" | "product" => Some(Self::Products),
            "orders" | "order" => Some(Self::Orders),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminAccess {
    pub level: AdminLevel,
    pub permissions: BTreeSet<AdminPermission>,
}

impl AdminAccess {
    pub fn user() -> Self {
        Self { level: AdminLevel::User, permissions: BTreeSet::new() }
    }

    pub fn super_admin() -> Self {
        Self {
            level: AdminLevel::SuperAdmin,
            permissions: [AdminPermission::Products, AdminPermission::Orders].into_iter().collect(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.level != AdminLevel::User
    }

    pub fn can(&self, permission: AdminPermission) -> bool {
        self.level == AdminLevel::SuperAdmin || self.permissions.contains(&permission)
    }
}

impl Default for AdminAccess {
    fn default() -> Self {
        Self::user()
    }
}

/// Phone-keyed admin roster built from configuration.
#[derive(Clone, Debug, Default)]
pub struct AdminDirectory {
    super_admins: BTreeSet<String>,
    grants: BTreeMap<String, BTreeSet<AdminPermission>>,
}

impl AdminDirectory {
    pub fn from_config(config: &AdminConfig) -> Self {
        let mut directory = Self::default();

        for phone in &config.super_admins {
            directory.super_admins.insert(normalize_phone(phone));
        }
        for phone in &config.product_admins {
            directory.grant(phone, AdminPermission::Products);
        }
        for phone in &config.order_admins {
            directory.grant(phone, AdminPermission::Orders);
        }
        for (phone, permissions) in &config.permissions {
            for permission in permissions.iter().filter_map(|raw| AdminPermission::parse(raw)) {
                directory.grant(phone, permission);
            }
        }

        directory
    }

    fn grant(&mut self, phone: &str, permission: AdminPermission) {
        self.grants.entry(normalize_phone(phone)).or_default().insert(permission);
    }

    pub fn access_for(&self, phone: &str) -> AdminAccess {
        let phone = normalize_phone(phone);
        if self.super_admins.contains(&phone) {
            return AdminAccess::super_admin();
        }

        match self.grants.get(&phone) {
            Some(permissions) if !permissions.is_empty() => {
                AdminAccess { level: AdminLevel::Admin, permissions: permissions.clone() }
            }
            _ => AdminAccess::user(),
        }
    }

    pub fn admin_count(&self) -> usize {
        let mut phones: BTreeSet<&String> = self.super_admins.iter().collect();
        phones.extend(self.grants.keys());
        phones.len()
    }
}
