use egui::Color32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// Serialize a Color32 as [r, g, b, a] in 0..=1, the engine's UI-state layout.
pub fn serialize_color<S>(color: &Color32, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    [r, g, b, a].map(|c| c as f32 / 255.0).serialize(serializer)
}

pub fn deserialize_color<'de, D>(deserializer: D) -> Result<Color32, D::Error>
where
    D: Deserializer<'de>,
{
    let channels = <[f32; 4]>::deserialize(deserializer)?;
    let [r, g, b, a] = channels.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    Ok(Color32::from_rgba_unmultiplied(r, g, b, a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize)]
    struct Swatch {
        #[serde(
            serialize_with = "serialize_color",
            deserialize_with = "deserialize_color"
        )]
        color: Color32,
    }

    #[test]
    fn test_color_as_unit_floats() {
        let json = serde_json::to_string(&Swatch {
            color: Color32::BLACK,
        })
        .unwrap();
        assert_eq!(json, r#"{"color":[0.0,0.0,0.0,1.0]}"#);

        let white: Swatch = serde_json::from_str(r#"{"color":[1,1,1,1]}"#).unwrap();
        assert_eq!(white.color, Color32::WHITE);
    }
}
