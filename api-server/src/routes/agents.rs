//! Scheduled-agent endpoints

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppContext;
use scheduled_agents::{
    schedule, AgentRecord, AgentStatus, RunOutcome, Schedule, ScheduleKind, SourceQuery,
};

#[derive(Debug, Deserialize)]
pub struct AgentCreateRequest {
    pub name: String,

    #[serde(flatten)]
    pub query: SourceQuery,

    #[serde(flatten)]
    pub schedule: Schedule,
}

#[derive(Debug, Deserialize)]
pub struct AgentUpdateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub schedule: Option<ScheduleKind>,
    #[serde(default)]
    pub schedule_time: Option<String>,
    #[serde(default)]
    pub status: Option<AgentStatus>,
}

pub async fn create(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<AgentCreateRequest>,
) -> ApiResult<Json<Value>> {
    request
        .schedule
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let now = schedule::now_in(ctx.offset);
    let next_run = request
        .schedule
        .next_run(now)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let record = AgentRecord {
        id: Uuid::new_v4(),
        name: request.name.clone(),
        query: request.query,
        schedule: request.schedule,
        status: AgentStatus::Active,
        next_run: Some(next_run),
        last_run: None,
        created_at: now,
    };
    let agent_id = record.id;

    ctx.store.insert(record)?;

    Ok(Json(json!({
        "success": true,
        "agent_id": agent_id,
        "next_run": next_run,
        "message": format!("Agent '{}' created successfully", request.name),
    })))
}

pub async fn list(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    Json(json!({ "agents": ctx.store.load() }))
}

pub async fn get_one(
    State(ctx): State<Arc<AppContext>>,
    Path(agent_id): Path<Uuid>,
) -> ApiResult<Json<AgentRecord>> {
    ctx.store
        .get(agent_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Agent not found"))
}

pub async fn update(
    State(ctx): State<Arc<AppContext>>,
    Path(agent_id): Path<Uuid>,
    Json(request): Json<AgentUpdateRequest>,
) -> ApiResult<Json<Value>> {
    let schedule_changed = request.schedule.is_some() || request.schedule_time.is_some();
    let now = schedule::now_in(ctx.offset);

    let Some(mut agent) = ctx.store.get(agent_id) else {
        return Err(ApiError::not_found("Agent not found"));
    };

    if let Some(name) = request.name {
        agent.name = name;
    }
    if let Some(kind) = request.schedule {
        agent.schedule.kind = kind;
    }
    if let Some(time) = request.schedule_time {
        agent.schedule.time = time;
    }
    if let Some(status) = request.status {
        agent.status = status;
    }

    if schedule_changed {
        agent
            .schedule
            .validate()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        agent.next_run = agent
            .schedule
            .next_run(now)
            .map_err(|e| ApiError::bad_request(e.to_string()))
            .map(Some)?;
    }

    let stored = agent.clone();
    ctx.store.update(agent_id, move |record| *record = stored)?;

    Ok(Json(json!({ "success": true, "agent": agent })))
}

pub async fn remove(
    State(ctx): State<Arc<AppContext>>,
    Path(agent_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    if !ctx.store.remove(agent_id)? {
        return Err(ApiError::not_found("Agent not found"));
    }
    Ok(Json(json!({
        "success": true,
        "message": "Agent deleted successfully",
    })))
}

pub async fn run_now(
    State(ctx): State<Arc<AppContext>>,
    Path(agent_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let agent = ctx
        .store
        .get(agent_id)
        .ok_or_else(|| ApiError::not_found("Agent not found"))?;
    let name = agent.name.clone();

    let response = match ctx.gate.submit(agent, ctx.runner.clone()) {
        RunOutcome::Started => json!({
            "success": true,
            "message": format!("Agent '{name}' execution started"),
            "status": "started",
            "agent_id": agent_id,
        }),
        RunOutcome::Queued => json!({
            "success": true,
            "message": format!("Agent '{name}' queued for execution (another agent is running)"),
            "status": "queued",
            "agent_id": agent_id,
        }),
        RunOutcome::AlreadyRunning => json!({
            "success": false,
            "message": format!("Agent '{name}' is already running"),
            "status": "running",
            "agent_id": agent_id,
        }),
    };

    Ok(Json(response))
}
