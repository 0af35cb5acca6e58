//! Construction equipment sample data: Cat machines as assets and devices.

use chrono::Local;
use dc_k8s::Result;
use serde_json::json;
use uuid::Uuid;

use super::{metadata, text, Seeder};
use crate::graphql::{CreateRequest, EntityKind, Family, Role};

const IMAGE: &str = "https://devicechain.s3.amazonaws.com/datasets/construction/catd1.jpg";

/// Assets generated per asset type.
const ASSETS_PER_TYPE: usize = 3;

/// Entities assured by one full run.
#[cfg(test)]
pub(super) const ENTITY_COUNT: usize = ASSET_TYPES.len()
    + ASSET_GROUPS.len()
    + 1
    + 2 * ASSETS_PER_TYPE * ASSET_ALLOCATION.len()
    + 1
    + DEVICES.len()
    + 2
    + 1
    + 1
    + 1
    + 2;

struct Styled {
    token: &'static str,
    name: &'static str,
    description: &'static str,
    metadata: &'static [(&'static str, &'static str)],
}

impl Styled {
    fn request(&self) -> CreateRequest {
        let request = CreateRequest::new(self.token)
            .name(self.name)
            .description(self.description)
            .image_url(IMAGE);
        if self.metadata.is_empty() {
            request
        } else {
            request.metadata(&metadata(self.metadata))
        }
    }
}

const ASSET_TYPES: &[Styled] = &[
    Styled {
        token: "catd6",
        name: "Cat D6",
        description: "Move material at a lower cost with a fully automatic transmission, outstanding \
            fuel efficiency and reduced service/maintenance costs.",
        metadata: &[
            ("engineModel", "Cat C9.3B"),
            ("netPower", "215 HP"),
            ("operatingWeight", "50733 lb"),
        ],
    },
    Styled {
        token: "cat725",
        name: "Cat 725 Articulated Truck",
        description: "The Cat 725 features a world-class cab design, re-engineered using global \
            operator feedback to advance comfort and ease of operation.",
        metadata: &[
            ("engineModel", "Cat C9.3"),
            ("ratedPayload", "26.5 ton"),
            ("heaped", "9.6 yd³"),
        ],
    },
    Styled {
        token: "cat730",
        name: "Cat 730 Articulated Truck",
        description: "The Cat 730 adds hoist-assist, advanced automatic traction control and a fuel \
            saving ECO mode to a redesigned cab.",
        metadata: &[
            ("engineModel", "Cat C13"),
            ("ratedPayload", "31 ton"),
            ("heaped", "23 yd³"),
        ],
    },
    Styled {
        token: "cat313",
        name: "Cat 313 Small Excavator",
        description: "The 313 excavator offers superior performance and operator efficiency with low \
            fuel and maintenance costs.",
        metadata: &[
            ("netPower", "108 HP"),
            ("operatingWeight", "30400 lb"),
            ("maxDigDepth", "19.8 ft"),
        ],
    },
    Styled {
        token: "cat317",
        name: "Cat 317 Small Excavator",
        description: "The 317 Hydraulic Excavator boosts productivity on your jobsite with standard, \
            easy-to-use Cat technologies.",
        metadata: &[
            ("netPower", "130 HP"),
            ("operatingWeight", "40200 lb"),
            ("maxDigDepth", "21 ft"),
        ],
    },
    Styled {
        token: "catd1",
        name: "Cat D1",
        description: "The Cat D1 is nimble and responsive, with power for dozing and finesse for \
            grading.",
        metadata: &[
            ("engineModel", "Cat C3.6"),
            ("netPower", "80 HP"),
            ("operatingWeight", "17855 lb"),
        ],
    },
    Styled {
        token: "cat302cr",
        name: "Cat 302 CR Mini Excavator",
        description: "The Cat 302 CR Mini Excavator delivers power and performance in a compact size.",
        metadata: &[
            ("netPower", "21 HP"),
            ("operatingWeight", "3913 lb"),
            ("maxDigDepth", "100 in"),
        ],
    },
    Styled {
        token: "cat305cr",
        name: "Cat 305 CR Mini Excavator",
        description: "The Cat 305 CR Mini Excavator delivers power and performance in a compact size.",
        metadata: &[
            ("netPower", "45 HP"),
            ("operatingWeight", "12688 lb"),
            ("maxDigDepth", "144.5 in"),
        ],
    },
    Styled {
        token: "cat415il",
        name: "Cat 415 IL Backhoe Loader",
        description: "The Cat 415 IL Industrial Loader delivers improved fuel efficiency and a \
            superior hydraulic system.",
        metadata: &[
            ("netPower", "69 HP"),
            ("operatingWeight", "17637 lb"),
            ("engineModel", "Cat C3.6"),
        ],
    },
    Styled {
        token: "cat416",
        name: "Cat 416 Backhoe Loader",
        description: "The Cat 416 Backhoe Loader delivers exceptional performance and an updated \
            operator station.",
        metadata: &[
            ("netPower", "86 HP"),
            ("operatingWeight", "24251 lb"),
            ("engineModel", "Cat C3.6"),
        ],
    },
];

const ASSET_GROUPS: &[Styled] = &[
    Styled {
        token: "bulldoz",
        name: "Bulldozers",
        description: "Group which includes bulldozers of various types",
        metadata: &[],
    },
    Styled {
        token: "truck",
        name: "Trucks",
        description: "Group which includes trucks of various types",
        metadata: &[],
    },
    Styled {
        token: "excavator",
        name: "Excavators",
        description: "Group which includes excavators of various types",
        metadata: &[],
    },
    Styled {
        token: "wloaders",
        name: "Wheel Loaders",
        description: "Group which includes wheel loaders of various types",
        metadata: &[],
    },
];

/// Asset type token and the group its generated assets join.
const ASSET_ALLOCATION: &[(&str, &str)] = &[
    ("catd6", "bulldoz"),
    ("cat725", "truck"),
    ("cat730", "truck"),
    ("cat313", "excavator"),
    ("cat317", "excavator"),
    ("catd1", "bulldoz"),
    ("cat302cr", "excavator"),
    ("cat305cr", "excavator"),
    ("cat415il", "wloaders"),
    ("cat416", "wloaders"),
];

/// Device token, owner and purchase date.
const DEVICES: &[(&str, &str, &str)] = &[
    ("SDK7GV3WXZ3FBXZ", "CatCorp", "2022/01/01"),
    ("WDVM4L7YPRM7HU2", "CatCorp", "2022/02/01"),
];

const fn kind(family: Family, role: Role) -> EntityKind {
    EntityKind::new(family, role)
}

pub(super) async fn seed(seeder: &mut Seeder) -> Result<()> {
    seed_assets(seeder).await?;
    seed_devices(seeder).await
}

async fn seed_assets(seeder: &mut Seeder) -> Result<()> {
    seeder.header("Asset Types");
    for asset_type in ASSET_TYPES {
        seeder
            .assure(kind(Family::Asset, Role::Type), asset_type.request())
            .await?;
    }

    seeder.header("Asset Groups");
    for group in ASSET_GROUPS {
        seeder
            .assure(kind(Family::Asset, Role::Group), group.request())
            .await?;
    }

    seeder.header("Asset Group Relationship Types");
    seeder
        .assure(
            kind(Family::Asset, Role::GroupRelationshipType),
            CreateRequest::new("contains")
                .name("Contains")
                .description("The group contains the target asset"),
        )
        .await?;

    seeder.header("Assets");
    for (type_token, group_token) in ASSET_ALLOCATION {
        seed_assets_of_type(seeder, type_token, group_token).await?;
    }
    Ok(())
}

/// Create assets with generated VINs and add each to a group.
async fn seed_assets_of_type(seeder: &mut Seeder, type_token: &str, group_token: &str) -> Result<()> {
    let asset_type = seeder
        .require(kind(Family::Asset, Role::Type), type_token)
        .await?;
    let group = seeder
        .require(kind(Family::Asset, Role::Group), group_token)
        .await?;
    let group_token = text(&group, "token");

    for _ in 0..ASSETS_PER_TYPE {
        let vin = random_vin();
        let asset = CreateRequest::entity(Family::Asset, &vin, type_token)
            .name(&format!("{} VIN:{vin}", text(&asset_type, "name")))
            .description(&format!("{} VIN:{vin}", text(&asset_type, "description")))
            .metadata(&json!({
                "vin": vin,
                "purchaseDate": Local::now().format("%Y-%m-%d").to_string(),
            }));
        seeder.assure(kind(Family::Asset, Role::Entity), asset).await?;

        let membership = CreateRequest::group_relationship(
            Family::Asset,
            &format!("{group_token}-contains-{vin}"),
            group_token,
            &vin,
            "contains",
        );
        seeder
            .assure(kind(Family::Asset, Role::GroupRelationship), membership)
            .await?;
    }
    Ok(())
}

async fn seed_devices(seeder: &mut Seeder) -> Result<()> {
    seeder.header("Device Types");
    let cat_d1 = Styled {
        token: "catd1",
        name: "Cat D1",
        description: "The Cat D1 is nimble and responsive, with power for dozing and finesse for \
            grading.",
        metadata: &[
            ("engineModel", "Cat C3.6"),
            ("powerNet", "80 HP"),
            ("operatingWeight", "17855 lb"),
        ],
    };
    seeder
        .assure(kind(Family::Device, Role::Type), cat_d1.request())
        .await?;

    seeder.header("Devices");
    for (vin, owner, purchased) in DEVICES {
        let device = CreateRequest::entity(Family::Device, vin, "catd1")
            .name(&format!("Cat D1 VIN:{vin}"))
            .description(&format!("This is a Cat D1 with VIN {vin}"))
            .metadata(&metadata(&[
                ("vin", *vin),
                ("owner", *owner),
                ("purchaseDate", *purchased),
            ]));
        seeder.assure(kind(Family::Device, Role::Entity), device).await?;
    }

    seeder.header("Device Relationship Types");
    for (token, name, description, accuracy) in [
        (
            "tracksLocationOf",
            "Tracks location of",
            "The source device tracks the location of the target device",
            "1 meter",
        ),
        (
            "tracksTempOf",
            "Tracks temperature of",
            "The source device tracks the temperature of the target device",
            "1 degree C",
        ),
    ] {
        let request = CreateRequest::new(token)
            .name(name)
            .description(description)
            .metadata(&metadata(&[("accuracy", accuracy)]));
        seeder
            .assure(kind(Family::Device, Role::RelationshipType), request)
            .await?;
    }

    seeder.header("Device Relationships");
    let (source, target) = (DEVICES[0].0, DEVICES[1].0);
    let relationship = CreateRequest::relationship(
        Family::Device,
        &format!("{source}-tracksLocationOf-{target}"),
        source,
        target,
        "tracksLocationOf",
    )
    .metadata(&metadata(&[("accuracy", "1 meter")]));
    seeder
        .assure(kind(Family::Device, Role::Relationship), relationship)
        .await?;

    seeder.header("Device Groups");
    let small_dozers = Styled {
        token: "smalldoz",
        name: "Small Dozers",
        description: "Under 105 hp, the Cat small dozers are designed to optimize speed, \
            transportability, maneuverability, versatility and finish grading accuracy.",
        metadata: &[("maxWeight", "20000 lb")],
    };
    seeder
        .assure(kind(Family::Device, Role::Group), small_dozers.request())
        .await?;

    seeder.header("Device Group Relationship Types");
    seeder
        .assure(
            kind(Family::Device, Role::GroupRelationshipType),
            CreateRequest::new("contains")
                .name("Contains")
                .description("The group contains the target device"),
        )
        .await?;

    seeder.header("Device Group Relationships");
    for (vin, _, _) in DEVICES {
        let membership = CreateRequest::group_relationship(
            Family::Device,
            &format!("smalldoz-contains-{vin}"),
            "smalldoz",
            vin,
            "contains",
        );
        seeder
            .assure(kind(Family::Device, Role::GroupRelationship), membership)
            .await?;
    }
    Ok(())
}

/// Random 15 character identifier in upper-case hex.
fn random_vin() -> String {
    Uuid::new_v4().simple().to_string()[..15].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_vin_shape() {
        let vin = random_vin();
        assert_eq!(vin.len(), 15);
        assert!(vin.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_ne!(vin, random_vin());
    }

    #[test]
    fn test_every_allocation_references_known_entities() {
        for (type_token, group_token) in ASSET_ALLOCATION {
            assert!(ASSET_TYPES.iter().any(|t| t.token == *type_token));
            assert!(ASSET_GROUPS.iter().any(|g| g.token == *group_token));
        }
    }

    #[test]
    fn test_entity_count() {
        assert_eq!(ENTITY_COUNT, 85);
    }
}
