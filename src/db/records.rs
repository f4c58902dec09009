

use serde_json::{Map, Value};
use thiserror::Error;

use crate::search::models::Candidate;


/// A profile document that could not be turned into a [`Candidate`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{reason} (id={})", .id.as_deref().unwrap_or("<unknown>"))]
pub struct MalformedCandidate {
    pub id: Option<String>,
    pub reason: String,
}

impl MalformedCandidate {
    fn new(id: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            id: id.map(str::to_string),
            reason: reason.into(),
        }
    }
}


/// Decodes one stored profile. `fallback_id` is the document id, used when
/// the record carries no `user_id` of its own.
pub fn decode_profile(record: &Value, fallback_id: Option<&str>) -> Result<Candidate, MalformedCandidate> {
    let Some(fields) = record.as_object() else {
        return Err(MalformedCandidate::new(fallback_id, "record is not an object"));
    };

    let id = match fields.get("user_id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
        Some(Value::String(_)) | Some(Value::Null) | None => match fallback_id {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => return Err(MalformedCandidate::new(None, "missing user_id")),
        },
        Some(_) => return Err(MalformedCandidate::new(fallback_id, "user_id is not a string")),
    };
    let id_ref = Some(id.as_str());

    let name = text_field(fields, "name", id_ref)?.unwrap_or_default();
    let role = text_field(fields, "role", id_ref)?.unwrap_or_default();
    let summary = text_field(fields, "summary", id_ref)?.unwrap_or_default();
    let location = text_field(fields, "location", id_ref)?;
    let skills = skills_field(fields, id_ref)?;
    let embedding = embedding_field(fields, id_ref)?;

    Ok(Candidate {
        id,
        name,
        role,
        skills,
        embedding,
        summary,
        location,
    })
}

fn text_field(
    fields: &Map<String, Value>,
    key: &str,
    id: Option<&str>,
) -> Result<Option<String>, MalformedCandidate> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(MalformedCandidate::new(id, format!("{key} is not a string"))),
    }
}

fn skills_field(fields: &Map<String, Value>, id: Option<&str>) -> Result<Vec<String>, MalformedCandidate> {
    match fields.get("skills") {
        None | Some(Value::Null) => Ok(Vec::new()),
        // profiles saved from the manual form before the list format
        Some(Value::String(s)) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| MalformedCandidate::new(id, "skills contains a non-string entry"))
            })
            .collect(),
        Some(_) => Err(MalformedCandidate::new(id, "skills is neither a list nor a string")),
    }
}

fn embedding_field(fields: &Map<String, Value>, id: Option<&str>) -> Result<Option<Vec<f32>>, MalformedCandidate> {
    match fields.get("embedding") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item.as_f64() {
                Some(x) if x.is_finite() && (x as f32).is_finite() => Ok(x as f32),
                _ => Err(MalformedCandidate::new(id, "embedding contains a non-numeric entry")),
            })
            .collect::<Result<Vec<f32>, _>>()
            .map(Some),
        Some(_) => Err(MalformedCandidate::new(id, "embedding is not a list")),
    }
}
