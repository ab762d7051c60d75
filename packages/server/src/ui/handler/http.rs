//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Path, State, rejection::JsonRejection},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use crate::{
    domain::{
        AnswerText, DisplayName, ParticipantId, Question, RoomId, RoomKind, RoomName, RoomPin,
        ValueObjectError,
    },
    infrastructure::dto::{
        http::{
            AdvanceResponse, AnswerResultDto, CreateRoomRequest, EndQuestionRequest, ErrorBody,
            RoomDetailDto, RoomStateDto, RoomSummaryDto, StartQuestionRequest, StatusChangeRequest,
            SubmitAnswerRequest,
        },
        websocket::ScoreDto,
    },
    ui::state::AppState,
    usecase::{ErrorKind, RoomBlueprint, UseCaseError},
};

/// Header carrying the caller's participant ID
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Rejection of an HTTP request
#[derive(Debug)]
pub enum ApiError {
    MissingCaller,
    BadRequest(String),
    UseCase(UseCaseError),
}

impl From<UseCaseError> for ApiError {
    fn from(error: UseCaseError) -> Self {
        ApiError::UseCase(error)
    }
}

impl From<ValueObjectError> for ApiError {
    fn from(error: ValueObjectError) -> Self {
        ApiError::UseCase(error.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::MissingCaller => (
                StatusCode::UNAUTHORIZED,
                "missing_client_id",
                format!("Send your participant ID in the {CLIENT_ID_HEADER} header"),
            ),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
            ApiError::UseCase(error) => {
                let status = match error.kind() {
                    ErrorKind::Validation => StatusCode::BAD_REQUEST,
                    ErrorKind::Authorization => StatusCode::FORBIDDEN,
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::State => StatusCode::CONFLICT,
                    ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, error.code(), error.to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(code, "{}", message);
        } else {
            tracing::debug!(status = %status, code, "{}", message);
        }
        let body = ErrorBody {
            code: code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Caller identity taken from the `x-client-id` header
#[derive(Debug, Clone)]
pub struct CallerId(pub ParticipantId);

impl<S: Send + Sync> FromRequestParts<S> for CallerId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CLIENT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::MissingCaller)?;
        ParticipantId::new(value.to_string())
            .map(CallerId)
            .map_err(|_| ApiError::MissingCaller)
    }
}

fn parse_room_id(room_id: String) -> Result<RoomId, ApiError> {
    Ok(RoomId::new(room_id)?)
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.rooms.list_rooms().await;
    Json(rooms.iter().map(RoomSummaryDto::from).collect())
}

/// Create a buzzer or quiz room. The caller becomes its host.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    CallerId(caller): CallerId,
    payload: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RoomDetailDto>), ApiError> {
    let Json(request) = payload?;

    let name = RoomName::new(request.name)?;
    let host_display_name = DisplayName::new(request.host_display_name)?;
    let blueprint = match request.kind {
        RoomKind::Buzzer => RoomBlueprint::Buzzer,
        RoomKind::Quiz => {
            let default_time_limit = state.config.default_time_limit_secs;
            let questions = request
                .questions
                .into_iter()
                .map(|q| {
                    Question::new(
                        q.text,
                        q.options,
                        q.correct_answer,
                        q.points,
                        q.time_limit.unwrap_or(default_time_limit),
                    )
                })
                .collect::<Result<Vec<_>, _>>()?;
            RoomBlueprint::Quiz { questions }
        }
    };

    let room = state
        .create_room()
        .execute(caller, host_display_name, name, blueprint)
        .await?;
    Ok((StatusCode::CREATED, Json(RoomDetailDto::from(&room))))
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomStateDto>, ApiError> {
    let room_id = parse_room_id(room_id)?;
    let room = state
        .rooms
        .get_room(&room_id)
        .await
        .ok_or_else(|| UseCaseError::RoomNotFound(room_id.clone()))?;
    let connection_count = state.connections().count_for_room(&room_id).await;

    Ok(Json(RoomStateDto {
        room: RoomDetailDto::from(&room),
        connection_count,
    }))
}

/// Resolve a join pin to its room
pub async fn get_room_by_pin(
    State(state): State<Arc<AppState>>,
    Path(pin): Path<String>,
) -> Result<Json<RoomSummaryDto>, ApiError> {
    let pin = RoomPin::new(pin)?;
    let room = state
        .rooms
        .get_room_by_pin(&pin)
        .await
        .ok_or(UseCaseError::PinNotFound(pin))?;
    Ok(Json(RoomSummaryDto::from(&room)))
}

pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    CallerId(caller): CallerId,
    Path(room_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let room_id = parse_room_id(room_id)?;
    state.host_control().delete_room(&caller, &room_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_status(
    State(state): State<Arc<AppState>>,
    CallerId(caller): CallerId,
    Path(room_id): Path<String>,
    payload: Result<Json<StatusChangeRequest>, JsonRejection>,
) -> Result<Json<RoomDetailDto>, ApiError> {
    let Json(request) = payload?;
    let room_id = parse_room_id(room_id)?;
    let room = state
        .host_control()
        .change_status(&caller, &room_id, request.status)
        .await?;
    Ok(Json(RoomDetailDto::from(&room)))
}

pub async fn reset_room(
    State(state): State<Arc<AppState>>,
    CallerId(caller): CallerId,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailDto>, ApiError> {
    let room_id = parse_room_id(room_id)?;
    let room = state.host_control().reset_buzzer_room(&caller, &room_id).await?;
    Ok(Json(RoomDetailDto::from(&room)))
}

pub async fn start_question(
    State(state): State<Arc<AppState>>,
    CallerId(caller): CallerId,
    Path(room_id): Path<String>,
    payload: Result<Json<StartQuestionRequest>, JsonRejection>,
) -> Result<Json<RoomDetailDto>, ApiError> {
    let Json(request) = payload?;
    let room_id = parse_room_id(room_id)?;
    let started = state
        .host_control()
        .start_question(&caller, &room_id, request.question_index, request.time_limit)
        .await?;
    Ok(Json(RoomDetailDto::from(&started.room)))
}

pub async fn end_question(
    State(state): State<Arc<AppState>>,
    CallerId(caller): CallerId,
    Path(room_id): Path<String>,
    payload: Result<Json<EndQuestionRequest>, JsonRejection>,
) -> Result<Json<RoomDetailDto>, ApiError> {
    let Json(request) = payload?;
    let room_id = parse_room_id(room_id)?;
    let room = state
        .host_control()
        .end_question(&caller, &room_id, request.question_index)
        .await?;
    Ok(Json(RoomDetailDto::from(&room)))
}

pub async fn next_question(
    State(state): State<Arc<AppState>>,
    CallerId(caller): CallerId,
    Path(room_id): Path<String>,
) -> Result<Json<AdvanceResponse>, ApiError> {
    let room_id = parse_room_id(room_id)?;
    let result = state
        .host_control()
        .advance_to_next_question(&caller, &room_id)
        .await?;
    Ok(Json(AdvanceResponse {
        advanced: result.advanced,
        current_question_index: result.current_question_index,
    }))
}

pub async fn finish_quiz(
    State(state): State<Arc<AppState>>,
    CallerId(caller): CallerId,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailDto>, ApiError> {
    let room_id = parse_room_id(room_id)?;
    let room = state.host_control().finish_quiz(&caller, &room_id).await?;
    Ok(Json(RoomDetailDto::from(&room)))
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    CallerId(caller): CallerId,
    Path(room_id): Path<String>,
    payload: Result<Json<SubmitAnswerRequest>, JsonRejection>,
) -> Result<Json<AnswerResultDto>, ApiError> {
    let Json(request) = payload?;
    let room_id = parse_room_id(room_id)?;
    let answer = AnswerText::new(request.answer)?;
    let result = state
        .submit_answer()
        .execute(
            &room_id,
            &caller,
            request.question_index,
            answer,
            request.time_taken_ms,
        )
        .await?;
    Ok(Json(AnswerResultDto {
        is_correct: result.is_correct,
        points_earned: result.points_earned,
        total_score: result.score.score,
    }))
}

/// Current scores, best first
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<ScoreDto>>, ApiError> {
    let room_id = parse_room_id(room_id)?;
    if state.rooms.get_room(&room_id).await.is_none() {
        return Err(UseCaseError::RoomNotFound(room_id).into());
    }
    let scores = state.quiz.leaderboard(&room_id).await;
    Ok(Json(scores.iter().map(ScoreDto::from).collect()))
}
