use crate::error::ApiError;
use crate::models::{Chapter, Notices, QuizOutcome, QuizQuestion};
use crate::services::llm::AiGateway;
use crate::session::{Session, SessionStore};
use crate::utils::{decode_upload, preview};
use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    response::{Html, Json},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

const UPLOAD_FIELD: &str = "text_file";
const BOOK_PREVIEW_CHARS: usize = 2000;
const CHAPTER_PREVIEW_CHARS: usize = 5000;

const NO_CHAPTERS_FOUND: &str = "No chapters found. Chapter detection works best with clear headings like 'Chapter 1', 'CHAPTER TWO', 'Part 1', etc.";
const NO_BOOK_TEXT: &str = "Please upload a book first.";
const NO_CHAPTER_TEXT: &str = "No text available for the selected chapter to generate a quiz.";
const QUIZ_UNUSABLE: &str = "Could not generate quiz. The AI might not have found enough context or the response was not structured as expected.";

#[derive(Clone)]
pub struct AppState {
    pub gateway: AiGateway,
    pub sessions: SessionStore,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/upload", post(upload_file))
        .route("/sessions/:id", delete(delete_session))
        .route("/sessions/:id/summary", post(generate_summary))
        .route("/sessions/:id/chapters", get(list_chapters))
        .route("/sessions/:id/chapters/:index", get(show_chapter))
        .route("/sessions/:id/chapters/:index/quiz", post(generate_quiz))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::AllowMethods::any())
                .allow_headers(tower_http::cors::AllowHeaders::any()),
        )
}

#[derive(Debug, Serialize)]
pub struct ChapterEntry {
    pub index: usize,
    pub title: String,
    pub start_line: usize,
    pub end_line: usize,
}

fn chapter_entries(chapters: &[Chapter]) -> Vec<ChapterEntry> {
    chapters
        .iter()
        .enumerate()
        .map(|(index, chapter)| ChapterEntry {
            index,
            title: chapter.title.clone(),
            start_line: chapter.start_line,
            end_line: chapter.end_line,
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub session_id: Uuid,
    pub preview: String,
    pub char_count: usize,
    pub line_count: usize,
    pub chapters: Vec<ChapterEntry>,
    pub notices: Notices,
}

#[derive(Debug, Serialize)]
pub struct ChaptersResponse {
    pub chapters: Vec<ChapterEntry>,
    pub selected_chapter: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ChapterResponse {
    #[serde(flatten)]
    pub chapter: ChapterEntry,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryRequest {
    #[serde(default)]
    pub length_percent: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub length_percent: u8,
    pub summary: Option<String>,
    pub notices: Notices,
}

#[derive(Debug, Serialize)]
pub struct QuizItem {
    pub question: String,
    pub options: Vec<String>,
    pub labelled_options: Vec<String>,
    pub correct_answer: String,
}

impl From<QuizQuestion> for QuizItem {
    fn from(question: QuizQuestion) -> Self {
        QuizItem {
            labelled_options: question.labelled_options(),
            question: question.question,
            options: question.options,
            correct_answer: question.correct_answer,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub chapter: String,
    pub questions: Vec<QuizItem>,
    pub notices: Notices,
}

async fn index() -> Html<&'static str> {
    Html(
        r#"
    <!DOCTYPE html>
    <html>
    <head>
        <title>Book Assistant</title>
        <meta charset="utf-8">
        <style>
            body { font-family: Arial, sans-serif; margin: 40px; }
            .info-box { background-color: #f0f8ff; padding: 20px; border-radius: 8px; margin: 20px 0; }
            .endpoint { background-color: #f5f5f5; padding: 10px; margin: 10px 0; border-radius: 4px; font-family: monospace; }
        </style>
    </head>
    <body>
        <h1>Book Assistant</h1>

        <div class="info-box">
            <p>Upload a plain-text book to preview it, find its chapters, summarize it and
            generate a quiz from any chapter.</p>
        </div>

        <h2>Available Endpoints:</h2>
        <div class="endpoint">GET /health - Health check</div>
        <div class="endpoint">POST /upload - Multipart form with a 'text_file' field (UTF-8 text)</div>
        <div class="endpoint">POST /sessions/{id}/summary - JSON body {"length_percent": 10..80}</div>
        <div class="endpoint">DELETE /sessions/{id} - Discard an uploaded book</div>
        <div class="endpoint">GET /sessions/{id}/chapters - Detected chapters</div>
        <div class="endpoint">GET /sessions/{id}/chapters/{index} - Select a chapter and view its text</div>
        <div class="endpoint">POST /sessions/{id}/chapters/{index}/quiz - Multiple-choice quiz for a chapter</div>
    </body>
    </html>
    "#,
    )
}

async fn health_check() -> &'static str {
    "OK"
}

async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadUpload(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadUpload(e.to_string()))?;
        let text = decode_upload(&data)
            .ok_or_else(|| ApiError::BadUpload("file is not UTF-8 text".to_string()))?;

        let session = Session::new(text);
        let mut notices = Notices::new();
        // locate() always yields at least the sentinel chapter, so this only
        // fires if that ever changes
        if session.chapters.is_empty() {
            notices.info(NO_CHAPTERS_FOUND);
        }

        let preview = preview(&session.text, BOOK_PREVIEW_CHARS);
        let char_count = session.text.chars().count();
        let line_count = session.line_count();
        let chapters = chapter_entries(&session.chapters);

        let session_id = state.sessions.insert(session).await;
        tracing::info!(
            "Session {} created: {} characters, {} chapters",
            session_id,
            char_count,
            chapters.len()
        );

        return Ok(Json(UploadResponse {
            success: true,
            session_id,
            preview,
            char_count,
            line_count,
            chapters,
            notices,
        }));
    }

    Err(ApiError::BadUpload(format!(
        "missing '{}' field",
        UPLOAD_FIELD
    )))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.sessions.remove(id).await {
        return Err(ApiError::SessionNotFound(id));
    }
    tracing::info!("Session {} deleted", id);
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn list_chapters(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChaptersResponse>, ApiError> {
    let session = state
        .sessions
        .get(id)
        .await
        .ok_or(ApiError::SessionNotFound(id))?;

    Ok(Json(ChaptersResponse {
        chapters: chapter_entries(&session.chapters),
        selected_chapter: session.selected_chapter,
    }))
}

async fn show_chapter(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<ChapterResponse>, ApiError> {
    let session = state
        .sessions
        .select_chapter(id, index)
        .await
        .ok_or(ApiError::SessionNotFound(id))?;
    let chapter = session
        .chapters
        .get(index)
        .ok_or(ApiError::ChapterNotFound(index))?;

    Ok(Json(ChapterResponse {
        content: preview(&chapter.text(&session.text), CHAPTER_PREVIEW_CHARS),
        chapter: ChapterEntry {
            index,
            title: chapter.title.clone(),
            start_line: chapter.start_line,
            end_line: chapter.end_line,
        },
    }))
}

async fn generate_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<SummaryRequest>>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let length_percent = request.and_then(|Json(request)| request.length_percent);
    let session = match length_percent {
        Some(percent) => {
            let percent = u8::try_from(percent).unwrap_or(u8::MAX);
            state.sessions.set_summary_percent(id, percent).await
        }
        None => state.sessions.get(id).await,
    }
    .ok_or(ApiError::SessionNotFound(id))?;

    let mut notices = Notices::new();
    let summary = if session.text.trim().is_empty() {
        notices.warning(NO_BOOK_TEXT);
        None
    } else {
        state
            .gateway
            .summarize(&session.text, session.summary_percent, &mut notices)
            .await
    };

    Ok(Json(SummaryResponse {
        length_percent: session.summary_percent,
        summary,
        notices,
    }))
}

async fn generate_quiz(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<QuizResponse>, ApiError> {
    let session = state
        .sessions
        .get(id)
        .await
        .ok_or(ApiError::SessionNotFound(id))?;
    let chapter = session
        .chapters
        .get(index)
        .ok_or(ApiError::ChapterNotFound(index))?;
    let chapter_text = chapter.text(&session.text);

    let mut notices = Notices::new();
    let questions = if chapter_text.trim().is_empty() {
        notices.warning(NO_CHAPTER_TEXT);
        Vec::new()
    } else {
        match state.gateway.generate_quiz(&chapter_text, &mut notices).await {
            QuizOutcome::Questions(questions) => {
                questions.into_iter().map(QuizItem::from).collect()
            }
            QuizOutcome::Rejected { error } => {
                notices.error(error);
                Vec::new()
            }
            QuizOutcome::Unusable => {
                tracing::warn!("Quiz reply for chapter {} was not usable", index);
                notices.warning(QUIZ_UNUSABLE);
                Vec::new()
            }
            QuizOutcome::Failed => Vec::new(),
        }
    };

    Ok(Json(QuizResponse {
        chapter: chapter.title.clone(),
        questions,
        notices,
    }))
}
