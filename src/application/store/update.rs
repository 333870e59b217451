use serde_json::Value;

use super::{Document, FieldPath, ID_FIELD, Projection, PullMatcher, StoreError, UpdateOp, UpdateOutcome};

/// Applies `ops` to `document` in order. Either every operator applies or the
/// document is left as it was: an unresolved element path yields
/// [`UpdateOutcome::UNMATCHED`], a type mismatch yields an error.
pub fn apply_update(document: &mut Document, ops: &[UpdateOp]) -> Result<UpdateOutcome, StoreError> {
    let mut working = document.clone();
    let mut modified = false;

    for op in ops {
        let Some((parent, field)) = resolve(&mut working, op.path())? else {
            return Ok(UpdateOutcome::UNMATCHED);
        };
        modified |= apply_op(parent, field, op)?;
    }

    if modified {
        *document = working;
    }
    Ok(UpdateOutcome {
        matched: 1,
        modified: u64::from(modified),
    })
}

/// Keeps the projected top-level fields (and the id) of `document`.
pub fn project(document: Document, projection: &Projection) -> Document {
    document
        .into_iter()
        .filter(|(field, _)| projection.includes(field))
        .collect()
}

fn resolve<'a>(
    document: &'a mut Document,
    path: &'a FieldPath,
) -> Result<Option<(&'a mut Document, &'a str)>, StoreError> {
    match path {
        FieldPath::Field(field) => Ok(Some((document, field.as_str()))),
        FieldPath::Element {
            array,
            element_id,
            field,
        } => match document.get_mut(array) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(items
                .iter_mut()
                .find_map(|item| match item {
                    Value::Object(element) if has_id(element, element_id) => Some(element),
                    _ => None,
                })
                .map(|element| (element, field.as_str()))),
            Some(_) => Err(StoreError::invalid_document(format!(
                "field `{array}` is not an array"
            ))),
        },
    }
}

fn apply_op(parent: &mut Document, field: &str, op: &UpdateOp) -> Result<bool, StoreError> {
    match op {
        UpdateOp::Set { value, .. } => {
            let previous = parent.insert(field.to_string(), value.clone());
            Ok(previous.as_ref() != Some(value))
        }
        UpdateOp::Push { value, .. } => {
            array_mut(parent, field)?.push(value.clone());
            Ok(true)
        }
        UpdateOp::AddToSet { value, .. } => {
            let items = array_mut(parent, field)?;
            if items.contains(value) {
                return Ok(false);
            }
            items.push(value.clone());
            Ok(true)
        }
        UpdateOp::Pull { matcher, .. } => match parent.get_mut(field) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Array(items)) => {
                let before = items.len();
                items.retain(|item| !matcher.matches(item));
                Ok(items.len() != before)
            }
            Some(_) => Err(StoreError::invalid_document(format!(
                "field `{field}` is not an array"
            ))),
        },
    }
}

fn array_mut<'a>(parent: &'a mut Document, field: &str) -> Result<&'a mut Vec<Value>, StoreError> {
    let slot = parent
        .entry(field)
        .or_insert_with(|| Value::Array(Vec::new()));
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    match slot {
        Value::Array(items) => Ok(items),
        _ => Err(StoreError::invalid_document(format!(
            "field `{field}` is not an array"
        ))),
    }
}

fn has_id(element: &serde_json::Map<String, Value>, id: &str) -> bool {
    element.get(ID_FIELD).and_then(Value::as_str) == Some(id)
}

impl PullMatcher {
    fn matches(&self, item: &Value) -> bool {
        match self {
            PullMatcher::Value(value) => item == value,
            PullMatcher::Id(id) => match item {
                Value::Object(element) => has_id(element, id),
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn post() -> Document {
        match json!({
            "id": "p1",
            "title": "Staring problem",
            "likes": ["u1"],
            "comments": [
                { "id": "c1", "text": "first", "likes": [] },
                { "id": "c2", "text": "second", "likes": ["u2"] }
            ]
        }) {
            Value::Object(document) => document,
            _ => unreachable!(),
        }
    }

    #[test]
    fn positional_set_targets_one_element() {
        let mut document = post();
        let outcome = apply_update(
            &mut document,
            &[UpdateOp::Set {
                path: FieldPath::element("comments", "c2", "text"),
                value: json!("edited"),
            }],
        )
        .expect("update");

        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 1 });
        assert_eq!(document["comments"][1]["text"], "edited");
        assert_eq!(document["comments"][0]["text"], "first");
    }

    #[test]
    fn unresolved_element_leaves_document_untouched() {
        let mut document = post();
        let before = document.clone();
        let outcome = apply_update(
            &mut document,
            &[
                UpdateOp::Set {
                    path: FieldPath::field("title"),
                    value: json!("changed"),
                },
                UpdateOp::AddToSet {
                    path: FieldPath::element("comments", "missing", "likes"),
                    value: json!("u9"),
                },
            ],
        )
        .expect("update");

        assert_eq!(outcome, UpdateOutcome::UNMATCHED);
        assert_eq!(document, before);
    }

    #[test]
    fn add_to_set_dedupes() {
        let mut document = post();
        let op = UpdateOp::AddToSet {
            path: FieldPath::field("likes"),
            value: json!("u1"),
        };
        let outcome = apply_update(&mut document, &[op]).expect("update");
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 0 });
        assert_eq!(document["likes"], json!(["u1"]));
    }

    #[test]
    fn pull_by_id_and_by_value() {
        let mut document = post();
        apply_update(
            &mut document,
            &[
                UpdateOp::Pull {
                    path: FieldPath::field("comments"),
                    matcher: PullMatcher::Id("c1".into()),
                },
                UpdateOp::Pull {
                    path: FieldPath::element("comments", "c2", "likes"),
                    matcher: PullMatcher::Value(json!("u2")),
                },
            ],
        )
        .expect("update");

        assert_eq!(document["comments"], json!([{ "id": "c2", "text": "second", "likes": [] }]));
    }

    #[test]
    fn pull_of_absent_member_is_a_noop() {
        let mut document = post();
        let outcome = apply_update(
            &mut document,
            &[UpdateOp::Pull {
                path: FieldPath::field("likes"),
                matcher: PullMatcher::Value(json!("nobody")),
            }],
        )
        .expect("update");
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 0 });
    }

    #[test]
    fn push_creates_missing_array() {
        let mut document = post();
        apply_update(
            &mut document,
            &[UpdateOp::Push {
                path: FieldPath::field("tags"),
                value: json!("cats"),
            }],
        )
        .expect("update");
        assert_eq!(document["tags"], json!(["cats"]));
    }

    #[test]
    fn push_onto_scalar_is_rejected() {
        let mut document = post();
        let err = apply_update(
            &mut document,
            &[UpdateOp::Push {
                path: FieldPath::field("title"),
                value: json!("x"),
            }],
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument { .. }));
    }

    #[test]
    fn projection_keeps_id() {
        let projected = project(post(), &Projection::fields(["likes"]));
        assert_eq!(Value::Object(projected), json!({ "id": "p1", "likes": ["u1"] }));
    }
}
