//! Entity-kind descriptors for the device management GraphQL schema.
//!
//! Every family (device, asset, area, customer) exposes the same seven roles
//! with names derived from one pattern, e.g. `DeviceGroupRelationshipType`
//! has `deviceGroupRelationshipTypeByToken`, `createDeviceGroupRelationshipType`
//! and `DeviceGroupRelationshipTypeCreateRequest`.

use std::fmt;

/// Top-level domain family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Device,
    Asset,
    Area,
    Customer,
}

impl Family {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Device => "Device",
            Self::Asset => "Asset",
            Self::Area => "Area",
            Self::Customer => "Customer",
        }
    }

    /// Lower camel form, as used in field names.
    #[must_use]
    pub fn field(self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Asset => "asset",
            Self::Area => "area",
            Self::Customer => "customer",
        }
    }
}

/// Role of an entity within its family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Type,
    Entity,
    RelationshipType,
    Relationship,
    Group,
    GroupRelationshipType,
    GroupRelationship,
}

impl Role {
    fn suffix(self) -> &'static str {
        match self {
            Self::Type => "Type",
            Self::Entity => "",
            Self::RelationshipType => "RelationshipType",
            Self::Relationship => "Relationship",
            Self::Group => "Group",
            Self::GroupRelationshipType => "GroupRelationshipType",
            Self::GroupRelationship => "GroupRelationship",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Type => " type",
            Self::Entity => "",
            Self::RelationshipType => " relationship type",
            Self::Relationship => " relationship",
            Self::Group => " group",
            Self::GroupRelationshipType => " group relationship type",
            Self::GroupRelationship => " group relationship",
        }
    }

    /// Relationships are identified by token only; everything else is named.
    fn is_named(self) -> bool {
        !matches!(self, Self::Relationship | Self::GroupRelationship)
    }
}

/// A family/role pair from which all remote operation names derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKind {
    pub family: Family,
    pub role: Role,
}

impl EntityKind {
    #[must_use]
    pub const fn new(family: Family, role: Role) -> Self {
        Self { family, role }
    }

    /// Schema type name, e.g. `AssetGroup`.
    #[must_use]
    pub fn type_name(&self) -> String {
        format!("{}{}", self.family.name(), self.role.suffix())
    }

    fn field_stem(&self) -> String {
        format!("{}{}", self.family.field(), self.role.suffix())
    }

    #[must_use]
    pub fn by_token_field(&self) -> String {
        format!("{}ByToken", self.field_stem())
    }

    #[must_use]
    pub fn create_field(&self) -> String {
        format!("create{}", self.type_name())
    }

    #[must_use]
    pub fn request_type(&self) -> String {
        format!("{}CreateRequest", self.type_name())
    }

    fn selection(&self) -> &'static str {
        if self.role.is_named() {
            "id token name description"
        } else {
            "id token"
        }
    }

    #[must_use]
    pub fn by_token_query(&self) -> String {
        format!(
            "query ($token: String!) {{ {}(token: $token) {{ {} }} }}",
            self.by_token_field(),
            self.selection()
        )
    }

    #[must_use]
    pub fn create_mutation(&self) -> String {
        format!(
            "mutation ($request: {}!) {{ {}(request: $request) {{ {} }} }}",
            self.request_type(),
            self.create_field(),
            self.selection()
        )
    }
}

impl fmt::Display for EntityKind {
    /// Human label, e.g. `device group relationship type`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.family.field(), self.role.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names() {
        let kind = EntityKind::new(Family::Device, Role::GroupRelationshipType);
        assert_eq!(kind.type_name(), "DeviceGroupRelationshipType");
        assert_eq!(kind.by_token_field(), "deviceGroupRelationshipTypeByToken");
        assert_eq!(kind.create_field(), "createDeviceGroupRelationshipType");
        assert_eq!(kind.request_type(), "DeviceGroupRelationshipTypeCreateRequest");
        assert_eq!(kind.to_string(), "device group relationship type");
    }

    #[test]
    fn test_entity_role_has_no_suffix() {
        let kind = EntityKind::new(Family::Asset, Role::Entity);
        assert_eq!(kind.type_name(), "Asset");
        assert_eq!(kind.by_token_field(), "assetByToken");
        assert_eq!(kind.to_string(), "asset");
    }

    #[test]
    fn test_relationship_selection_is_token_only() {
        let query = EntityKind::new(Family::Customer, Role::Relationship).by_token_query();
        assert_eq!(
            query,
            "query ($token: String!) { customerRelationshipByToken(token: $token) { id token } }"
        );
        let mutation = EntityKind::new(Family::Area, Role::Type).create_mutation();
        assert!(mutation.starts_with("mutation ($request: AreaTypeCreateRequest!)"));
        assert!(mutation.contains("createAreaType(request: $request) { id token name description }"));
    }
}
