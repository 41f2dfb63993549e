//! Request-shape validation. Rules are declarative per-field constraints;
//! evaluation records the first violation per field but keeps checking the
//! remaining fields, so one response carries every failing field.

use crate::resource::{CrossRule, FieldRule, ResourceSpec};
use crate::store::get_path;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// One failed constraint. Only `message` reaches the wire; `field` and
/// `rejected_value` drive de-duplication and diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldViolation {
    pub field: String,
    pub rejected_value: Option<Value>,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &str, value: Option<&Value>, message: String) -> Self {
        FieldViolation {
            field: field.to_string(),
            rejected_value: value.cloned(),
            message,
        }
    }
}

/// Create enforces `required` and create-only cross rules; Update treats
/// every rule as optional (absent is valid, present must still satisfy).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mode {
    Create,
    Update,
}

/// Validate a body against a resource's rules.
pub fn validate(
    body: &Map<String, Value>,
    spec: &ResourceSpec,
    mode: Mode,
) -> Result<(), Vec<FieldViolation>> {
    let mut violations = Vec::new();
    let mut flagged: HashSet<&str> = HashSet::new();

    for rule in &spec.field_rules {
        if let Some(v) = check_field(body, rule, mode) {
            flagged.insert(rule.field.as_str());
            violations.push(v);
        }
    }

    for cross in &spec.cross_rules {
        if let Some(v) = check_cross(body, cross, mode) {
            if flagged.contains(v.field.as_str()) {
                continue;
            }
            violations.push(v);
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check_field(body: &Map<String, Value>, rule: &FieldRule, mode: Mode) -> Option<FieldViolation> {
    let value = get_path(body, &rule.field);
    let missing = value.map_or(true, Value::is_null);
    if missing {
        if mode == Mode::Create && rule.required {
            return Some(FieldViolation::new(
                &rule.field,
                None,
                format!("{} is required", rule.field),
            ));
        }
        return None;
    }
    let v = value?;

    if let Some(min) = rule.min_length {
        if v.as_str().map_or(false, |s| s.chars().count() < min) {
            return Some(FieldViolation::new(
                &rule.field,
                value,
                format!("{} must be at least {} characters", rule.field, min),
            ));
        }
    }
    if let Some(max) = rule.max_length {
        if v.as_str().map_or(false, |s| s.chars().count() > max) {
            return Some(FieldViolation::new(
                &rule.field,
                value,
                format!("{} must be at most {} characters", rule.field, max),
            ));
        }
    }
    if let Some(pattern) = &rule.pattern {
        if let Some(s) = v.as_str() {
            let matched = Regex::new(pattern).map_or(false, |re| re.is_match(s));
            if !matched {
                return Some(FieldViolation::new(
                    &rule.field,
                    value,
                    format!("{} does not match the required pattern", rule.field),
                ));
            }
        }
    }
    if rule.email {
        if let Some(s) = v.as_str() {
            if !looks_like_email(s) {
                return Some(FieldViolation::new(
                    &rule.field,
                    value,
                    format!("{} must be a valid email", rule.field),
                ));
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        let ok = v.as_str().map_or(false, |s| allowed.iter().any(|a| a == s));
        if !ok {
            return Some(FieldViolation::new(
                &rule.field,
                value,
                format!("{} must be one of: {}", rule.field, allowed.join(", ")),
            ));
        }
    }
    if let Some(min) = rule.minimum {
        match v.as_f64() {
            Some(n) if n >= min => {}
            _ => {
                return Some(FieldViolation::new(
                    &rule.field,
                    value,
                    format!("{} must be a number of at least {}", rule.field, min),
                ));
            }
        }
    }
    None
}

fn check_cross(body: &Map<String, Value>, rule: &CrossRule, mode: Mode) -> Option<FieldViolation> {
    match rule {
        CrossRule::GteField {
            field,
            other,
            message,
        } => {
            let a = get_path(body, field)?.as_f64()?;
            let b = get_path(body, other)?.as_f64()?;
            if a < b {
                return Some(FieldViolation::new(
                    field,
                    get_path(body, field),
                    message.clone(),
                ));
            }
            None
        }
        CrossRule::NeField {
            field,
            other,
            message,
        } => {
            let a = get_path(body, field)?;
            let b = get_path(body, other)?;
            if a == b {
                return Some(FieldViolation::new(field, Some(a), message.clone()));
            }
            None
        }
        CrossRule::EqFieldOnCreate {
            field,
            other,
            message,
        } => {
            if mode != Mode::Create {
                return None;
            }
            let a = get_path(body, field).unwrap_or(&Value::Null);
            let b = get_path(body, other).unwrap_or(&Value::Null);
            if a != b {
                return Some(FieldViolation::new(field, Some(a), message.clone()));
            }
            None
        }
    }
}

fn looks_like_email(s: &str) -> bool {
    let Some(at) = s.find('@') else { return false };
    let (local, domain) = s.split_at(at);
    let domain = &domain[1..];
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Search terms must be present and at least 2 characters after trimming.
pub fn validate_search_term(term: Option<&str>) -> Result<String, Vec<FieldViolation>> {
    let trimmed = term.unwrap_or("").trim();
    if trimmed.chars().count() < 2 {
        return Err(vec![FieldViolation::new(
            "term",
            term.map(|t| Value::String(t.to_string())).as_ref(),
            "term must be at least 2 characters".to_string(),
        )]);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Catalog;
    use serde_json::json;

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn spec(path: &str) -> crate::resource::ResourceSpec {
        Catalog::builtin().by_path(path).unwrap().clone()
    }

    #[test]
    fn accumulates_violations_across_fields() {
        let spec = spec("suppliers");
        let b = body(json!({
            "name": "",
            "contact": {"email": "not-an-email"}
        }));
        let violations = validate(&b, &spec, Mode::Create).unwrap_err();
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert!(fields.contains(&"name"), "{:?}", fields);
        assert!(fields.contains(&"contact.email"), "{:?}", fields);
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn one_violation_per_field() {
        let spec = spec("suppliers");
        // Empty name violates both min_length and (on a different reading)
        // presence; only the first check for the field is reported.
        let b = body(json!({"name": ""}));
        let violations = validate(&b, &spec, Mode::Create).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "name");
    }

    #[test]
    fn update_mode_makes_required_optional() {
        let spec = spec("suppliers");
        assert!(validate(&body(json!({})), &spec, Mode::Update).is_ok());
        // Present fields must still satisfy their constraints.
        let violations = validate(
            &body(json!({"contact": {"phone": "123"}})),
            &spec,
            Mode::Update,
        )
        .unwrap_err();
        assert_eq!(violations[0].field, "contact.phone");
    }

    #[test]
    fn enum_membership_is_case_sensitive() {
        let spec = spec("suppliers");
        let violations = validate(
            &body(json!({"name": "A", "status": "active"})),
            &spec,
            Mode::Create,
        )
        .unwrap_err();
        assert_eq!(violations[0].field, "status");
        assert!(validate(
            &body(json!({"name": "A", "status": "Active"})),
            &spec,
            Mode::Create
        )
        .is_ok());
    }

    #[test]
    fn phone_must_be_digits_of_bounded_length() {
        let spec = spec("suppliers");
        let ok = body(json!({"name": "A", "contact": {"phone": "1234567890"}}));
        assert!(validate(&ok, &spec, Mode::Create).is_ok());
        let bad = body(json!({"name": "A", "contact": {"phone": "12-34"}}));
        let violations = validate(&bad, &spec, Mode::Create).unwrap_err();
        assert_eq!(violations[0].field, "contact.phone");
    }

    #[test]
    fn stock_levels_cross_rule() {
        let spec = spec("inventory");
        let inventory_id = "665f1c2b9d3e4a5b6c7d8e9f";
        let ok = body(json!({
            "product": inventory_id,
            "warehouse": inventory_id,
            "quantity": 5,
            "minStockLevel": 2,
            "maxStockLevel": 10
        }));
        assert!(validate(&ok, &spec, Mode::Create).is_ok());
        let bad = body(json!({
            "product": inventory_id,
            "warehouse": inventory_id,
            "quantity": 5,
            "minStockLevel": 10,
            "maxStockLevel": 2
        }));
        let violations = validate(&bad, &spec, Mode::Create).unwrap_err();
        assert_eq!(violations[0].field, "maxStockLevel");
    }

    #[test]
    fn transfer_warehouses_must_differ() {
        let spec = spec("inventory-transfers");
        let id = "665f1c2b9d3e4a5b6c7d8e9f";
        let bad = body(json!({
            "inventory": id,
            "fromWarehouse": id,
            "toWarehouse": id,
            "quantity": 1
        }));
        let violations = validate(&bad, &spec, Mode::Create).unwrap_err();
        assert_eq!(violations[0].field, "toWarehouse");
    }

    #[test]
    fn password_confirmation_checked_on_create_only() {
        let spec = spec("users");
        let bad = body(json!({
            "name": "Sam",
            "email": "sam@acme.com",
            "password": "supersecret",
            "confirmPassword": "different"
        }));
        let violations = validate(&bad, &spec, Mode::Create).unwrap_err();
        assert!(violations.iter().any(|v| v.field == "confirmPassword"));
        // Updates do not carry the confirmation rule.
        let patch = body(json!({"password": "anothersecret"}));
        assert!(validate(&patch, &spec, Mode::Update).is_ok());
    }

    #[test]
    fn search_term_minimum_length() {
        assert!(validate_search_term(None).is_err());
        assert!(validate_search_term(Some(" a ")).is_err());
        assert_eq!(validate_search_term(Some(" ab ")).unwrap(), "ab");
    }
}
