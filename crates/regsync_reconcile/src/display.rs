//! Display formatting for diff reports.

use regsync_model::Entity;
use serde_json::Value;

/// Maximum rendered length before truncation.
const MAX_DISPLAY_CHARS: usize = 50;

/// Renders a field value for human review.
///
/// Booleans become "Yes"/"No", null becomes the empty string, long text
/// is truncated with an ellipsis, and composite values render via their
/// canonical (sorted-key) JSON serialization.
#[must_use]
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => truncate(s),
        composite => truncate(&composite.to_string()),
    }
}

/// Picks a human-readable name for an entity in a diff report.
///
/// Person-like records display by their `name` field; two-party union
/// records (e.g. marriages) display as `"<groom> & <bride>"`; anything
/// else falls back to `"<Kind> #<id>"` derived from the collection name.
#[must_use]
pub fn display_name(collection: &str, entity: &Entity) -> String {
    if let Some(Value::String(name)) = entity.field("name") {
        if !name.is_empty() {
            return truncate(name);
        }
    }

    if let (Some(Value::String(groom)), Some(Value::String(bride))) =
        (entity.field("groom"), entity.field("bride"))
    {
        return truncate(&format!("{groom} & {bride}"));
    }

    format!("{} #{}", singular_kind(collection), entity.id)
}

/// Truncates to [`MAX_DISPLAY_CHARS`] characters, appending an ellipsis.
fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_DISPLAY_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_DISPLAY_CHARS).collect();
    out.push('…');
    out
}

/// "members" -> "Member", "marriages" -> "Marriage".
fn singular_kind(collection: &str) -> String {
    let singular = collection.strip_suffix('s').unwrap_or(collection);
    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Record".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regsync_model::EntityId;
    use serde_json::json;

    #[test]
    fn booleans_render_as_yes_no() {
        assert_eq!(format_value(&json!(true)), "Yes");
        assert_eq!(format_value(&json!(false)), "No");
    }

    #[test]
    fn null_renders_empty() {
        assert_eq!(format_value(&Value::Null), "");
    }

    #[test]
    fn long_text_is_truncated_with_ellipsis() {
        let long = "x".repeat(80);
        let rendered = format_value(&json!(long));
        assert_eq!(rendered.chars().count(), 51);
        assert!(rendered.ends_with('…'));
    }

    #[test]
    fn composite_values_render_as_canonical_json() {
        // serde_json's map is BTreeMap-backed, so keys come out sorted.
        let value = json!({"b": 2, "a": 1});
        assert_eq!(format_value(&value), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn person_records_display_by_name() {
        let entity = Entity::new(EntityId::new(1)).with_field("name", json!("Asha"));
        assert_eq!(display_name("members", &entity), "Asha");
    }

    #[test]
    fn union_records_display_both_parties() {
        let entity = Entity::new(EntityId::new(4))
            .with_field("groom", json!("Omar"))
            .with_field("bride", json!("Asha"));
        assert_eq!(display_name("marriages", &entity), "Omar & Asha");
    }

    #[test]
    fn fallback_uses_kind_and_id() {
        let entity = Entity::new(EntityId::new(9));
        assert_eq!(display_name("certificates", &entity), "Certificate #9");
    }
}
