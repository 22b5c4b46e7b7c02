//! Entity encoders for the demo arena kinds.
//!
//! Every kind gets the common pose shape (`id`, `type`, `position`,
//! `orientation`) plus whatever kind-specific fields the entity's
//! `extra` payload carries.

use arenaviz_core::encode::EncoderRegistry;
use arenaviz_core::engine::EntityRecord;

/// Registry covering the demo arena's entity kinds.
pub fn demo_registry() -> EncoderRegistry {
    let mut registry = EncoderRegistry::new();
    registry.register("floor", encode_entity);
    registry.register("box", encode_entity);
    registry.register("light", encode_entity);
    registry.register("bot", encode_entity);
    registry
}

/// The common entity shape, merged with the record's extra fields.
fn encode_entity(record: &EntityRecord) -> serde_json::Value {
    let mut value = serde_json::json!({
        "id": record.id,
        "type": record.kind,
        "position": {
            "x": record.position.x,
            "y": record.position.y,
            "z": record.position.z,
        },
        "orientation": {
            "x": record.orientation.x,
            "y": record.orientation.y,
            "z": record.orientation.z,
            "w": record.orientation.w,
        },
    });

    if let (Some(object), Some(extra)) = (value.as_object_mut(), record.extra.as_object()) {
        for (key, field) in extra {
            object.insert(key.clone(), field.clone());
        }
    }
    value
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use arenaviz_types::{Quaternion, Vec3};

    #[test]
    fn registry_covers_every_demo_kind() {
        let registry = demo_registry();
        for kind in ["floor", "box", "light", "bot"] {
            let record = EntityRecord {
                id: format!("{kind}_0"),
                kind: String::from(kind),
                position: Vec3::default(),
                orientation: Quaternion::identity(),
                extra: serde_json::Value::Null,
            };
            assert!(registry.encode(&record).is_some(), "no encoder for {kind}");
        }
    }

    #[test]
    fn encodes_pose_and_merges_extra() {
        let record = EntityRecord {
            id: String::from("light_1"),
            kind: String::from("light"),
            position: Vec3::new(1.0, 2.0, 3.0),
            orientation: Quaternion::identity(),
            extra: serde_json::json!({ "intensity": 0.8 }),
        };
        let value = encode_entity(&record);
        assert_eq!(value.get("id").unwrap(), "light_1");
        assert_eq!(value.get("type").unwrap(), "light");
        assert_eq!(value.pointer("/position/y").unwrap(), 2.0);
        assert_eq!(value.get("intensity").unwrap(), 0.8);
    }
}
