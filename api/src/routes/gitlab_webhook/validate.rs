//! Flat schema checks over the raw webhook payload.
//!
//! Returns human-readable reasons so the 400 body names exactly which
//! field was missing or malformed.

use serde_json::Value;

/// Checks the fields every webhook must carry.
pub fn validate_payload(payload: &Value) -> Result<(), String> {
    if !payload.is_object() {
        return Err("invalid payload: expected object".into());
    }
    if !payload.get("object_kind").is_some_and(Value::is_string) {
        return Err("missing or invalid field: object_kind".into());
    }
    if !payload.get("project").is_some_and(Value::is_object) {
        return Err("missing field: project".into());
    }
    Ok(())
}

/// Extra checks for `object_kind == "merge_request"` events.
pub fn validate_merge_request_payload(payload: &Value) -> Result<(), String> {
    let Some(attrs) = payload.get("object_attributes") else {
        return Err("missing field: object_attributes".into());
    };
    if !attrs.get("iid").is_some_and(Value::is_u64) {
        return Err("missing or invalid field: object_attributes.iid".into());
    }
    if !attrs.get("action").is_some_and(Value::is_string) {
        return Err("missing or invalid field: object_attributes.action".into());
    }
    if !attrs.get("state").is_some_and(Value::is_string) {
        return Err("missing or invalid field: object_attributes.state".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_objects_and_missing_fields() {
        assert!(validate_payload(&json!("nope")).is_err());
        assert!(validate_payload(&json!({})).unwrap_err().contains("object_kind"));
        assert!(
            validate_payload(&json!({ "object_kind": "merge_request" }))
                .unwrap_err()
                .contains("project")
        );
        assert!(
            validate_payload(&json!({ "object_kind": "merge_request", "project": { "id": 1 } }))
                .is_ok()
        );
    }

    #[test]
    fn merge_request_payload_needs_iid_action_state() {
        let base = json!({
            "object_kind": "merge_request",
            "project": { "id": 1 },
        });
        assert!(
            validate_merge_request_payload(&base)
                .unwrap_err()
                .contains("object_attributes")
        );

        let mut p = base.clone();
        p["object_attributes"] = json!({ "action": "open", "state": "opened" });
        assert!(validate_merge_request_payload(&p).unwrap_err().contains("iid"));

        p["object_attributes"] = json!({ "iid": "5", "action": "open", "state": "opened" });
        assert!(validate_merge_request_payload(&p).unwrap_err().contains("iid"));

        p["object_attributes"] = json!({ "iid": 5, "state": "opened" });
        assert!(validate_merge_request_payload(&p).unwrap_err().contains("action"));

        p["object_attributes"] = json!({ "iid": 5, "action": "open" });
        assert!(validate_merge_request_payload(&p).unwrap_err().contains("state"));

        p["object_attributes"] = json!({ "iid": 5, "action": "open", "state": "opened" });
        assert!(validate_merge_request_payload(&p).is_ok());
    }
}
