//! Input validation for authorization requests

use crate::errors::ValidationError;
use crate::models::AuthorizationRequest;

/// Hard cap on batch size; larger batches are rejected wholesale, never truncated.
pub const MAX_BATCH_SIZE: usize = 50;

const MAX_JSON_DEPTH: usize = 10;

/// Validate a single authorization request.
///
/// Field checks run in a fixed order so the caller always learns the first
/// missing field by its JSON path and can repair the request.
pub fn validate_request(request: &AuthorizationRequest) -> Result<(), ValidationError> {
    if let Some(field) = missing_field(request) {
        return Err(ValidationError::MissingField { field });
    }
    check_depth_guard(request)
}

/// Validate every item of a batch before any evaluation begins.
///
/// One invalid item rejects the whole batch with its index reported; there
/// are no partial batches.
pub fn validate_batch(requests: &[AuthorizationRequest]) -> Result<(), ValidationError> {
    if requests.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }
    if requests.len() > MAX_BATCH_SIZE {
        return Err(ValidationError::BatchTooLarge {
            count: requests.len(),
            max: MAX_BATCH_SIZE,
        });
    }
    for (index, request) in requests.iter().enumerate() {
        if let Some(field) = missing_field(request) {
            return Err(ValidationError::InvalidItem { index, field });
        }
        check_depth_guard(request)?;
    }
    Ok(())
}

/// First missing required field of a request, by JSON path
fn missing_field(request: &AuthorizationRequest) -> Option<&'static str> {
    if request.user.id.trim().is_empty() {
        return Some("user.id");
    }
    if request.resource.id.trim().is_empty() {
        return Some("resource.id");
    }
    if request.resource.resource_type.trim().is_empty() {
        return Some("resource.type");
    }
    if request.action.name.trim().is_empty() {
        return Some("action.name");
    }
    None
}

/// Guard untrusted attribute/context maps against excessive nesting
pub fn check_depth_guard(request: &AuthorizationRequest) -> Result<(), ValidationError> {
    if let Some(attributes) = &request.user.attributes {
        check_map_depth(attributes, "user.attributes")?;
    }
    if let Some(attributes) = &request.resource.attributes {
        check_map_depth(attributes, "resource.attributes")?;
    }
    if let Some(context) = &request.context {
        check_map_depth(context, "context")?;
    }
    Ok(())
}

fn check_map_depth(
    map: &serde_json::Map<String, serde_json::Value>,
    field: &'static str,
) -> Result<(), ValidationError> {
    for value in map.values() {
        check_depth(value, field, 1)?;
    }
    Ok(())
}

fn check_depth(
    value: &serde_json::Value,
    field: &'static str,
    current: usize,
) -> Result<(), ValidationError> {
    if current > MAX_JSON_DEPTH {
        return Err(ValidationError::TooDeep { field });
    }
    match value {
        serde_json::Value::Object(obj) => {
            for val in obj.values() {
                check_depth(val, field, current + 1)?;
            }
        }
        serde_json::Value::Array(arr) => {
            for val in arr {
                check_depth(val, field, current + 1)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionSpec, Principal, Resource};

    fn valid_request() -> AuthorizationRequest {
        AuthorizationRequest {
            user: Principal {
                id: "u1".into(),
                attributes: None,
                roles: None,
                permissions: None,
            },
            resource: Resource {
                id: "r1".into(),
                resource_type: "api".into(),
                attributes: None,
                owner: None,
            },
            action: ActionSpec {
                name: "read".into(),
                attributes: None,
            },
            context: None,
        }
    }

    #[test]
    fn accepts_valid_request() {
        assert_eq!(validate_request(&valid_request()), Ok(()));
    }

    #[test]
    fn names_the_first_missing_field() {
        let mut req = valid_request();
        req.user.id = String::new();
        assert_eq!(
            validate_request(&req),
            Err(ValidationError::MissingField { field: "user.id" })
        );

        let mut req = valid_request();
        req.resource.resource_type = "  ".into();
        assert_eq!(
            validate_request(&req),
            Err(ValidationError::MissingField {
                field: "resource.type"
            })
        );

        let mut req = valid_request();
        req.action.name = String::new();
        assert_eq!(
            validate_request(&req),
            Err(ValidationError::MissingField {
                field: "action.name"
            })
        );
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert_eq!(validate_batch(&[]), Err(ValidationError::EmptyBatch));
    }

    #[test]
    fn oversized_batch_is_rejected_wholesale() {
        let items: Vec<_> = (0..51).map(|_| valid_request()).collect();
        assert_eq!(
            validate_batch(&items),
            Err(ValidationError::BatchTooLarge { count: 51, max: 50 })
        );
    }

    #[test]
    fn batch_at_the_cap_is_accepted() {
        let items: Vec<_> = (0..50).map(|_| valid_request()).collect();
        assert_eq!(validate_batch(&items), Ok(()));
    }

    #[test]
    fn invalid_item_reports_its_index() {
        let mut bad = valid_request();
        bad.resource.id = String::new();
        let items = vec![valid_request(), bad, valid_request()];
        assert_eq!(
            validate_batch(&items),
            Err(ValidationError::InvalidItem {
                index: 1,
                field: "resource.id"
            })
        );
    }

    #[test]
    fn deeply_nested_context_is_rejected() {
        let mut nested = serde_json::json!("leaf");
        for _ in 0..12 {
            nested = serde_json::json!({ "inner": nested });
        }
        let mut req = valid_request();
        let mut ctx = serde_json::Map::new();
        ctx.insert("deep".into(), nested);
        req.context = Some(ctx);
        assert_eq!(
            validate_batch(std::slice::from_ref(&req)),
            Err(ValidationError::TooDeep { field: "context" })
        );
    }
}
