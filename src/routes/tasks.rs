use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use tracing::info;
use validator::Validate;

use super::{invalid, list, message, required, single, with_data};
use crate::db::DatabaseOperations;
use crate::models::{AppState, CreateTaskDto, IdQuery, TaskFilter, UpdateTaskDto};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/tasks",
            get(get_tasks).post(create_task).put(update_task).delete(delete_task),
        )
        .with_state(state)
}

async fn get_tasks(State(state): State<AppState>, Query(filter): Query<TaskFilter>) -> Response {
    if let Some(id) = filter.id {
        return match DatabaseOperations::get_task(&state.pool, id).await {
            Ok(Some(task)) => single(task),
            Ok(None) => message(StatusCode::NOT_FOUND, "Task not found"),
            Err(e) => e.respond("Error fetching task"),
        };
    }

    match DatabaseOperations::list_tasks(&state.pool, &filter).await {
        Ok(tasks) => list(tasks),
        Err(e) => e.respond("Error fetching tasks"),
    }
}

async fn create_task(State(state): State<AppState>, Json(body): Json<CreateTaskDto>) -> Response {
    let (Some(action), Some(summary), Some(proposed_by)) = (
        required(&body.action),
        required(&body.summary),
        body.proposed_by,
    ) else {
        return message(
            StatusCode::BAD_REQUEST,
            "Missing required fields: action, summary, and proposed_by are required",
        );
    };
    if let Err(errors) = body.validate() {
        return invalid(&errors);
    }

    match DatabaseOperations::create_task(&state.pool, action, summary, proposed_by, &body).await {
        Ok(task) => {
            info!(task_id = %task.id, action = %task.action, "Task created");
            with_data(StatusCode::CREATED, "Task created successfully", task)
        }
        Err(e) => e.respond("Error creating task"),
    }
}

async fn update_task(State(state): State<AppState>, Json(body): Json<UpdateTaskDto>) -> Response {
    let Some(id) = body.id else {
        return message(StatusCode::BAD_REQUEST, "Task id is required");
    };
    if let Err(errors) = body.validate() {
        return invalid(&errors);
    }

    match DatabaseOperations::update_task(&state.pool, id, &body).await {
        Ok(Some(task)) => with_data(StatusCode::OK, "Task updated successfully", task),
        Ok(None) => message(StatusCode::NOT_FOUND, "Task not found"),
        Err(e) => e.respond("Error updating task"),
    }
}

async fn delete_task(State(state): State<AppState>, Query(query): Query<IdQuery>) -> Response {
    let Some(id) = query.id else {
        return message(StatusCode::BAD_REQUEST, "Task id is required as query parameter");
    };

    match DatabaseOperations::delete_task(&state.pool, id).await {
        Ok(0) => message(StatusCode::NOT_FOUND, "Task not found"),
        Ok(_) => message(StatusCode::OK, "Task deleted successfully"),
        Err(e) => e.respond("Error deleting task"),
    }
}
