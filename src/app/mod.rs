pub mod books;
pub mod error;
pub mod records;
pub mod state;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

/// Browser origins allowed by default (local frontend dev servers).
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://localhost:8008",
    "https://localhost:3000",
    "https://localhost:5173",
    "https://localhost:8008",
];

pub fn router(state: AppState, cors_origins: &[String]) -> anyhow::Result<Router> {
    let origins = cors_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|err| anyhow::anyhow!("invalid CORS origin {origin:?}: {err}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let app = Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/scrape-books", get(books::scrape_books))
        .route("/recommendations", get(books::recommendations))
        .route("/scrape-status", get(books::scrape_status))
        .route("/books/summary", get(books::book_summary))
        .route(
            "/departments/",
            get(records::list_departments).post(records::create_department),
        )
        .route(
            "/departments",
            get(records::list_departments).post(records::create_department),
        )
        .route(
            "/students/",
            get(records::list_students).post(records::create_student),
        )
        .route(
            "/students",
            get(records::list_students).post(records::create_student),
        )
        .route("/students/:id", get(records::get_student))
        .route("/students/:id/", get(records::get_student))
        .route(
            "/students/:id/enroll/:formation_id",
            post(records::enroll_student),
        )
        .route(
            "/students/:id/enroll/:formation_id/",
            post(records::enroll_student),
        )
        .route("/students/:id/formations", get(records::student_formations))
        .route("/students/:id/formations/", get(records::student_formations))
        .route(
            "/formations/",
            get(records::list_formations).post(records::create_formation),
        )
        .route(
            "/formations",
            get(records::list_formations).post(records::create_formation),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);
    Ok(app)
}
