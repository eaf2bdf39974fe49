//! Filter helpers for chunk queries.

use serde_json::{Value, json};

use super::types::QueryFilterArgs;

/// Compose the Qdrant filter payload from optional query arguments.
///
/// The character filter matches the lowercase name against the
/// `people_mentioned` payload array, so a query scoped to a character only
/// sees chunks that actually mention them.
pub fn build_query_filter(args: &QueryFilterArgs) -> Option<Value> {
    let mut must: Vec<Value> = Vec::new();

    if let Some(character) = args.character.as_ref().and_then(|value| non_empty(value)) {
        must.push(json!({
            "key": "people_mentioned",
            "match": { "value": character.to_lowercase() }
        }));
    }

    if let Some(document) = args.document.as_ref().and_then(|value| non_empty(value)) {
        must.push(json!({
            "key": "document",
            "match": { "value": document }
        }));
    }

    if must.is_empty() {
        None
    } else {
        Some(json!({ "must": must }))
    }
}

fn non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_filter_is_lowercased() {
        let filter = build_query_filter(&QueryFilterArgs {
            character: Some("Hermione Granger".into()),
            ..Default::default()
        })
        .expect("filter");

        assert_eq!(
            filter,
            json!({
                "must": [
                    {
                        "key": "people_mentioned",
                        "match": { "value": "hermione granger" }
                    }
                ]
            })
        );
    }

    #[test]
    fn document_filter_is_exact() {
        let filter = build_query_filter(&QueryFilterArgs {
            document: Some("stone_garden.pdf".into()),
            ..Default::default()
        })
        .expect("filter");

        assert_eq!(
            filter,
            json!({
                "must": [
                    {
                        "key": "document",
                        "match": { "value": "stone_garden.pdf" }
                    }
                ]
            })
        );
    }

    #[test]
    fn blank_arguments_yield_no_filter() {
        assert!(build_query_filter(&QueryFilterArgs::default()).is_none());
        assert!(
            build_query_filter(&QueryFilterArgs {
                character: Some("   ".into()),
                document: Some(String::new()),
            })
            .is_none()
        );
    }
}
