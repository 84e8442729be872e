//! Prompt construction and image preparation for the multimodal models.

use std::io::Cursor;

use base64::Engine;
use image::{DynamicImage, GrayImage, ImageFormat};
use volview_insight_common::{finite_range, PromptContext, WireImage};

use super::AdapterError;
use crate::dispatch::ModelId;

const ROLE_INSTRUCTION: &str = "You are an expert radiologist.";
const PHYSICIAN_INSTRUCTION: &str = "Please speak as an intelligent, concise physician short of time.";
const DEFAULT_CXR_QUESTION: &str = "Find abnormalities and support devices.";

const MEDGEMMA_MAX_NEW_TOKENS: u32 = 300;
const CLARA_MAX_NEW_TOKENS: u32 = 2048;

/// One message of the conversation sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: &'static str,
    pub text: String,
    /// Whether the request image is attached to this turn.
    pub with_image: bool,
}

/// Everything a chat engine needs besides the image bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPlan {
    pub turns: Vec<ChatTurn>,
    pub max_new_tokens: u32,
}

impl PromptPlan {
    /// Build the conversation for `model` from the client's context.
    pub fn for_model(model: ModelId, context: &PromptContext, has_image: bool) -> Result<Self, AdapterError> {
        match model {
            ModelId::MedGemma => Self::medgemma(context, has_image),
            ModelId::ClaraNvReasonCxr3b => Self::clara(context, has_image),
        }
    }

    fn medgemma(context: &PromptContext, has_image: bool) -> Result<Self, AdapterError> {
        let question = context
            .prompt()
            .ok_or_else(|| AdapterError::InvalidContext("missing 'prompt' question".to_string()))?;
        let vitals = context.vital_signs_summary();

        let text = if has_image {
            format!(
                "Analyze the provided chest X-ray and the patient's most recent vital signs: {}. \
                 Based on this data, answer the following question: {}",
                vitals, question
            )
        } else {
            format!(
                "Analyze the patient's most recent vital signs: {}. \
                 Based on this data, answer the following question: {}",
                vitals, question
            )
        };

        Ok(Self {
            turns: vec![
                ChatTurn {
                    role: "system",
                    text: format!("{} {}", PHYSICIAN_INSTRUCTION, ROLE_INSTRUCTION),
                    with_image: false,
                },
                ChatTurn {
                    role: "user",
                    text,
                    with_image: has_image,
                },
            ],
            max_new_tokens: MEDGEMMA_MAX_NEW_TOKENS,
        })
    }

    fn clara(context: &PromptContext, has_image: bool) -> Result<Self, AdapterError> {
        if !has_image {
            return Err(AdapterError::ImageRequired(ModelId::ClaraNvReasonCxr3b));
        }

        let question = context.prompt().unwrap_or(DEFAULT_CXR_QUESTION);
        Ok(Self {
            turns: vec![ChatTurn {
                role: "user",
                text: question.to_string(),
                with_image: true,
            }],
            max_new_tokens: CLARA_MAX_NEW_TOKENS,
        })
    }
}

/// Turn a single-plane wire image into a base64 PNG.
///
/// Unit axes are squeezed away; what remains must be at most 2D. Values are
/// min-max normalised to 8 bits, and a flat image becomes all zeros.
pub fn encode_png_base64(image: &WireImage) -> Result<String, AdapterError> {
    let values = &image.point_data.values;
    if image.voxel_count() != Some(values.len()) {
        return Err(AdapterError::InvalidImage(format!(
            "{} values for dimensions {:?}",
            values.len(),
            image.dimensions
        )));
    }

    let axes: Vec<usize> = image.dimensions.iter().copied().filter(|d| *d != 1).collect();
    let (width, height) = match axes.as_slice() {
        [] => (1, 1),
        [w] => (*w, 1),
        [w, h] => (*w, *h),
        _ => {
            return Err(AdapterError::InvalidImage(format!(
                "expected a single plane, got dimensions {:?}",
                image.dimensions
            )))
        }
    };

    let (lo, range) = match finite_range(values) {
        Some((lo, hi)) => (lo, hi - lo),
        None => (0.0, 0.0),
    };

    let pixels: Vec<u8> = values
        .iter()
        .map(|v| {
            if range > 0.0 && v.is_finite() {
                (255.0 * (v - lo) / range) as u8
            } else {
                0
            }
        })
        .collect();

    let gray = GrayImage::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| AdapterError::InvalidImage("pixel buffer does not fit image size".to_string()))?;

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| AdapterError::InvalidImage(e.to_string()))?;

    Ok(base64::engine::general_purpose::STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use volview_insight_common::PointData;

    fn wire(dimensions: [usize; 3], values: Vec<f32>) -> WireImage {
        WireImage {
            dimensions,
            origin: [0.0; 3],
            spacing: [1.0; 3],
            point_data: PointData {
                number_of_components: 1,
                values,
            },
        }
    }

    fn decode(encoded: &str) -> GrayImage {
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .unwrap()
            .to_luma8()
    }

    #[test]
    fn test_medgemma_with_image() {
        let context = PromptContext::new()
            .with("prompt", "Any effusion?")
            .with("heart_rate", json!([88]));

        let plan = PromptPlan::for_model(ModelId::MedGemma, &context, true).unwrap();

        assert_eq!(plan.max_new_tokens, 300);
        assert_eq!(plan.turns[0].role, "system");
        assert!(plan.turns[0].text.ends_with("You are an expert radiologist."));
        assert!(plan.turns[1].with_image);
        assert!(plan.turns[1].text.starts_with("Analyze the provided chest X-ray"));
        assert!(plan.turns[1].text.contains("Heart Rate: 88 bpm"));
        assert!(plan.turns[1].text.ends_with("answer the following question: Any effusion?"));
    }

    #[test]
    fn test_medgemma_text_only() {
        let context = PromptContext::new().with("prompt", "Is the patient stable?");
        let plan = PromptPlan::for_model(ModelId::MedGemma, &context, false).unwrap();

        assert!(!plan.turns[1].with_image);
        assert!(plan.turns[1].text.starts_with("Analyze the patient's most recent vital signs"));
    }

    #[test]
    fn test_medgemma_requires_question() {
        let err = PromptPlan::for_model(ModelId::MedGemma, &PromptContext::new(), true).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidContext(_)));
    }

    #[test]
    fn test_clara_requires_image() {
        let err = PromptPlan::for_model(ModelId::ClaraNvReasonCxr3b, &PromptContext::new(), false).unwrap_err();
        assert_eq!(err, AdapterError::ImageRequired(ModelId::ClaraNvReasonCxr3b));
    }

    #[test]
    fn test_clara_default_question() {
        let plan = PromptPlan::for_model(ModelId::ClaraNvReasonCxr3b, &PromptContext::new(), true).unwrap();
        assert_eq!(plan.max_new_tokens, 2048);
        assert_eq!(plan.turns.len(), 1);
        assert_eq!(plan.turns[0].text, "Find abnormalities and support devices.");
    }

    #[test]
    fn test_png_is_normalised() {
        let encoded = encode_png_base64(&wire([2, 2, 1], vec![-100.0, 0.0, 100.0, 300.0])).unwrap();
        let gray = decode(&encoded);

        assert_eq!(gray.dimensions(), (2, 2));
        assert_eq!(gray.as_raw(), &vec![0, 63, 127, 255]);
    }

    #[test]
    fn test_flat_image_is_black() {
        let gray = decode(&encode_png_base64(&wire([3, 1, 1], vec![5.0; 3])).unwrap());
        assert!(gray.as_raw().iter().all(|p| *p == 0));
    }

    #[test]
    fn test_rejects_volumes() {
        let err = encode_png_base64(&wire([2, 2, 2], vec![0.0; 8])).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidImage(_)));
    }

    #[test]
    fn test_rejects_overflowing_dimensions() {
        let err = encode_png_base64(&wire([usize::MAX, 2, 1], vec![])).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidImage(_)));
    }
}
