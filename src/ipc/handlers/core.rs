use crate::calc::StageCategory;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_health(_state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "stageRules": state.config.stage_rules,
            "defaultSettings": state.config.default_settings,
        }),
    )
}

fn handle_stages_classify(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(stage) = req.params.get("stage").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.stage", None);
    };
    let category: StageCategory = state.config.stage_rules.classify(stage);
    ok(
        &req.id,
        json!({
            "stage": stage,
            "category": category.as_str(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "config.get" => Some(handle_config_get(state, req)),
        "stages.classify" => Some(handle_stages_classify(state, req)),
        _ => None,
    }
}
