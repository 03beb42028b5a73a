pub mod core;
pub mod grades;
pub mod words;

use crate::ipc::error::err;
use crate::ipc::types::Request;
use serde::de::DeserializeOwned;

/// Missing and `null` are the same thing to callers.
pub(crate) fn optional_param<T>(req: &Request, key: &str) -> Result<Option<T>, serde_json::Value>
where
    T: DeserializeOwned,
{
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|e| {
            err(
                &req.id,
                "bad_params",
                format!("invalid {}: {}", key, e),
                None,
            )
        }),
    }
}

pub(crate) fn required_param<T>(req: &Request, key: &str) -> Result<T, serde_json::Value>
where
    T: DeserializeOwned,
{
    optional_param(req, key)?
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub(crate) fn flag(req: &Request, key: &str) -> bool {
    req.params
        .get(key)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}
