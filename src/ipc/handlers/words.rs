use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::words;
use serde_json::json;

fn handle_words_to_arabic(_state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(values) = req.params.get("values") {
        let Some(values) = values.as_array() else {
            return err(&req.id, "bad_params", "values must be an array", None);
        };
        let out: Vec<String> = values.iter().map(words::words_for_value).collect();
        return ok(&req.id, json!({ "words": out }));
    }

    let value = req.params.get("value").cloned().unwrap_or(serde_json::Value::Null);
    ok(&req.id, json!({ "words": words::words_for_value(&value) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "words.toArabic" => Some(handle_words_to_arabic(state, req)),
        _ => None,
    }
}
