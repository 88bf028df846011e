use serde_json::Value;

use super::{IdentifyError, NutritionRecord};

const DEFAULT_DISH_NAME: &str = "Unknown Dish";
const DEFAULT_CONFIDENCE: f64 = 0.85;

/// Pull a [`NutritionRecord`] out of a raw model reply. The model is asked
/// for JSON only but routinely wraps it in prose, so we take the first
/// balanced object substring and ignore everything around it.
///
/// Unrecognized keys are dropped. A field that is missing or cannot be
/// coerced falls back to its default instead of failing the extraction;
/// only the absence of a parseable object is an error.
pub fn extract_nutrition(raw: &str) -> Result<NutritionRecord, IdentifyError> {
    let candidate = first_json_object(raw).ok_or(IdentifyError::MalformedResponse)?;
    let value: Value =
        serde_json::from_str(candidate).map_err(|_| IdentifyError::MalformedResponse)?;
    if !value.is_object() {
        return Err(IdentifyError::MalformedResponse);
    }

    let dish_name = value
        .get("dish_name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_DISH_NAME)
        .to_string();

    let confidence = coerce_f64(value.get("confidence"))
        .filter(|c| (0.0..=1.0).contains(c))
        .unwrap_or(DEFAULT_CONFIDENCE);

    let calories = coerce_f64(value.get("estimated_calories"))
        .or_else(|| coerce_f64(value.get("calories")))
        .map(|c| c.round().max(0.0) as i32)
        .unwrap_or(0);

    Ok(NutritionRecord {
        dish_name,
        confidence,
        calories,
        protein_g: coerce_grams(value.get("protein_g")),
        carbs_g: coerce_grams(value.get("carbs_g")),
        fat_g: coerce_grams(value.get("fat_g")),
    })
}

/// First balanced `{...}` substring, tracking nesting depth and skipping
/// braces inside string literals (including escaped quotes).
fn first_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in raw[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Numbers arrive as numbers or as numeric-looking strings ("350").
fn coerce_f64(v: Option<&Value>) -> Option<f64> {
    match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn coerce_grams(v: Option<&Value>) -> f64 {
    coerce_f64(v).map(|g| g.max(0.0)).unwrap_or(0.0)
}
