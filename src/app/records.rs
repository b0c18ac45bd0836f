use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Json;
use serde::Serialize;

use crate::app::{ApiError, AppState};
use crate::records::{
    Department, Formation, NewDepartment, NewFormation, NewStudent, RecordsError, Student,
};

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

pub async fn list_departments(
    State(state): State<AppState>,
) -> Result<Json<Vec<Department>>, ApiError> {
    Ok(Json(state.records.list_departments().await?))
}

pub async fn create_department(
    State(state): State<AppState>,
    new: Result<Json<NewDepartment>, JsonRejection>,
) -> Result<Json<Department>, ApiError> {
    let Json(new) = new?;
    let department = state.records.create_department(new).await?;
    tracing::info!(id = department.id, name = %department.name, "created department");
    Ok(Json(department))
}

pub async fn create_student(
    State(state): State<AppState>,
    new: Result<Json<NewStudent>, JsonRejection>,
) -> Result<Json<Student>, ApiError> {
    let Json(new) = new?;
    let student = state.records.create_student(new).await?;
    tracing::info!(id = student.id, "created student");
    Ok(Json(student))
}

pub async fn list_students(
    State(state): State<AppState>,
) -> Result<Json<Vec<Student>>, ApiError> {
    Ok(Json(state.records.list_students().await?))
}

pub async fn get_student(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Student>, ApiError> {
    let Path(id) = id?;
    let student = state
        .records
        .get_student(id)
        .await?
        .ok_or(RecordsError::StudentNotFound)?;
    Ok(Json(student))
}

pub async fn create_formation(
    State(state): State<AppState>,
    new: Result<Json<NewFormation>, JsonRejection>,
) -> Result<Json<Formation>, ApiError> {
    let Json(new) = new?;
    let formation = state.records.create_formation(new).await?;
    tracing::info!(id = formation.id, title = %formation.title, "created formation");
    Ok(Json(formation))
}

pub async fn list_formations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Formation>>, ApiError> {
    Ok(Json(state.records.list_formations().await?))
}

pub async fn enroll_student(
    State(state): State<AppState>,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Json<Message>, ApiError> {
    let Path((id, formation_id)) = ids?;
    state.records.enroll(id, formation_id).await?;
    tracing::info!(student_id = id, formation_id, "enrolled student");
    Ok(Json(Message {
        message: "Enrolled successfully",
    }))
}

pub async fn student_formations(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Formation>>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.records.student_formations(id).await?))
}
