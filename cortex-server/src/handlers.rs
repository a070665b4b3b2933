use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use cortex::schema::{DatabasePatch, FieldPatch, NewDatabase, NewField, NewView, ViewPatch};
use cortex::{CortexError, ImportMode, MetadataCandidate, Snapshot, Store, Values};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Configure all API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Status
            .route("/status", web::get().to(status))
            // Snapshot
            .route("/snapshot", web::get().to(export_snapshot))
            .route("/snapshot", web::post().to(import_snapshot))
            // Databases
            .route("/databases", web::get().to(list_databases))
            .route("/databases", web::post().to(create_database))
            .route("/databases/{id}", web::get().to(get_database))
            .route("/databases/{id}", web::patch().to(update_database))
            .route("/databases/{id}", web::delete().to(delete_database))
            // Fields
            .route("/databases/{id}/fields", web::post().to(add_field))
            .route("/databases/{id}/fields/{field}", web::patch().to(update_field))
            .route("/databases/{id}/fields/{field}", web::delete().to(delete_field))
            // Records
            .route("/databases/{id}/records", web::get().to(list_records))
            .route("/databases/{id}/records", web::post().to(add_record))
            .route("/databases/{id}/records/reorder", web::post().to(reorder_records))
            .route("/databases/{id}/records/metadata", web::post().to(add_record_from_metadata))
            .route("/databases/{id}/records/{record}", web::get().to(get_record))
            .route("/databases/{id}/records/{record}", web::patch().to(update_record))
            .route("/databases/{id}/records/{record}", web::delete().to(delete_record))
            // Views
            .route("/databases/{id}/views", web::get().to(list_views))
            .route("/databases/{id}/views", web::post().to(add_view))
            .route("/databases/{id}/views/{view}", web::get().to(get_view))
            .route("/databases/{id}/views/{view}", web::patch().to(update_view))
            .route("/databases/{id}/views/{view}", web::delete().to(delete_view))
            .route("/databases/{id}/views/{view}/state", web::get().to(view_state))
            .route(
                "/databases/{id}/views/{view}/todo/{record}/toggle",
                web::post().to(toggle_todo),
            )
            .route(
                "/databases/{id}/views/{view}/habits/{record}/toggle",
                web::post().to(toggle_habit),
            )
            .route(
                "/databases/{id}/views/{view}/cards/{parent}/children",
                web::post().to(quick_add_card),
            ),
    );
}

// ── Helpers ─────────────────────────────────────────────────────────

fn ok_json<T: Serialize>(value: T) -> HttpResponse {
    HttpResponse::Ok().json(value)
}

fn created_json<T: Serialize>(value: T) -> HttpResponse {
    HttpResponse::Created().json(value)
}

fn err_response(e: CortexError) -> HttpResponse {
    match &e {
        CortexError::NotFound { .. } => HttpResponse::NotFound().json(serde_json::json!({
            "error": e.to_string()
        })),
        CortexError::Validation(_) | CortexError::Snapshot(_) => {
            HttpResponse::BadRequest().json(serde_json::json!({
                "error": e.to_string()
            }))
        }
        CortexError::InvalidOperation(_) => HttpResponse::Conflict().json(serde_json::json!({
            "error": e.to_string()
        })),
        _ => {
            log::error!("Internal error: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal server error"
            }))
        }
    }
}

/// Run `f` against the locked store and shape the response.
fn with_store<T, F>(state: &AppState, created: bool, f: F) -> HttpResponse
where
    T: Serialize,
    F: FnOnce(&Store) -> cortex::Result<T>,
{
    let store = match state.store.lock() {
        Ok(store) => store,
        Err(_) => {
            log::error!("store mutex poisoned");
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal server error"
            }));
        }
    };
    match f(&store) {
        Ok(v) if created => created_json(v),
        Ok(v) => ok_json(v),
        Err(e) => err_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct DayQuery {
    today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct ImportQuery {
    #[serde(default)]
    mode: ImportMode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReorderBody {
    ids: Vec<String>,
    #[serde(default)]
    view_id: Option<String>,
}

// ── Status & Snapshot ───────────────────────────────────────────────

async fn status(state: web::Data<AppState>) -> HttpResponse {
    with_store(&state, false, |store| store.status())
}

async fn export_snapshot(state: web::Data<AppState>) -> HttpResponse {
    with_store(&state, false, |store| store.export_snapshot())
}

async fn import_snapshot(
    state: web::Data<AppState>,
    query: web::Query<ImportQuery>,
    body: web::Json<Snapshot>,
) -> HttpResponse {
    with_store(&state, false, |store| {
        store.import_snapshot(&body, query.mode)
    })
}

// ── Databases ───────────────────────────────────────────────────────

async fn list_databases(state: web::Data<AppState>) -> HttpResponse {
    with_store(&state, false, |store| store.list_databases())
}

async fn create_database(
    state: web::Data<AppState>,
    body: web::Json<NewDatabase>,
) -> HttpResponse {
    with_store(&state, true, |store| store.create_database(body.into_inner()))
}

async fn get_database(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    with_store(&state, false, |store| store.get_database(&path))
}

async fn update_database(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<DatabasePatch>,
) -> HttpResponse {
    with_store(&state, false, |store| {
        store.update_database(&path, body.into_inner())
    })
}

async fn delete_database(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    with_store(&state, false, |store| {
        store.delete_database(&id)?;
        Ok(serde_json::json!({ "ok": true, "deleted": id }))
    })
}

// ── Fields ──────────────────────────────────────────────────────────

async fn add_field(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<NewField>,
) -> HttpResponse {
    with_store(&state, true, |store| store.add_field(&path, body.into_inner()))
}

async fn update_field(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<FieldPatch>,
) -> HttpResponse {
    let (db, field) = path.into_inner();
    with_store(&state, false, |store| {
        store.update_field(&db, &field, body.into_inner())
    })
}

async fn delete_field(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (db, field) = path.into_inner();
    with_store(&state, false, |store| {
        store.delete_field(&db, &field)?;
        Ok(serde_json::json!({ "ok": true, "deleted": field }))
    })
}

// ── Records ─────────────────────────────────────────────────────────

async fn list_records(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    with_store(&state, false, |store| {
        store.get_database(&path).map(|db| db.records)
    })
}

async fn get_record(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (db, record) = path.into_inner();
    with_store(&state, false, |store| {
        store
            .get_database(&db)?
            .records
            .into_iter()
            .find(|r| r.id == record)
            .ok_or_else(|| CortexError::NotFound {
                entity: "Record",
                id: record.clone(),
            })
    })
}

async fn add_record(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<Values>,
) -> HttpResponse {
    with_store(&state, true, |store| store.add_record(&path, body.into_inner()))
}

async fn add_record_from_metadata(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<MetadataCandidate>,
) -> HttpResponse {
    with_store(&state, true, |store| {
        store.add_record_from_metadata(&path, &body)
    })
}

async fn update_record(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<Values>,
) -> HttpResponse {
    let (db, record) = path.into_inner();
    with_store(&state, false, |store| {
        store.update_record(&db, &record, body.into_inner())
    })
}

async fn delete_record(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (db, record) = path.into_inner();
    with_store(&state, false, |store| {
        store.delete_record(&db, &record)?;
        Ok(serde_json::json!({ "ok": true, "deleted": record }))
    })
}

async fn reorder_records(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ReorderBody>,
) -> HttpResponse {
    let db = path.into_inner();
    let body = body.into_inner();
    with_store(&state, false, |store| {
        match &body.view_id {
            Some(view) => store.reorder_view_records(&db, view, &body.ids)?,
            None => store.reorder_records(&db, &body.ids)?,
        }
        Ok(serde_json::json!({ "ok": true, "order": body.ids }))
    })
}

// ── Views ───────────────────────────────────────────────────────────

async fn list_views(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    with_store(&state, false, |store| {
        store.get_database(&path).map(|db| db.views)
    })
}

async fn get_view(state: web::Data<AppState>, path: web::Path<(String, String)>) -> HttpResponse {
    let (db, view) = path.into_inner();
    with_store(&state, false, |store| store.get_view(&db, &view))
}

async fn add_view(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<NewView>,
) -> HttpResponse {
    with_store(&state, true, |store| store.add_view(&path, body.into_inner()))
}

async fn update_view(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<ViewPatch>,
) -> HttpResponse {
    let (db, view) = path.into_inner();
    with_store(&state, false, |store| {
        store.update_view(&db, &view, body.into_inner())
    })
}

async fn delete_view(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (db, view) = path.into_inner();
    with_store(&state, false, |store| {
        store.delete_view(&db, &view)?;
        Ok(serde_json::json!({ "ok": true, "deleted": view }))
    })
}

async fn view_state(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    query: web::Query<DayQuery>,
) -> HttpResponse {
    let (db, view) = path.into_inner();
    with_store(&state, false, |store| match query.today {
        Some(today) => store.compute_view_on(&db, &view, today),
        None => store.compute_view(&db, &view),
    })
}

async fn toggle_todo(
    state: web::Data<AppState>,
    path: web::Path<(String, String, String)>,
) -> HttpResponse {
    let (db, view, record) = path.into_inner();
    with_store(&state, false, |store| store.toggle_todo(&db, &view, &record))
}

async fn toggle_habit(
    state: web::Data<AppState>,
    path: web::Path<(String, String, String)>,
    query: web::Query<DayQuery>,
) -> HttpResponse {
    let (db, view, record) = path.into_inner();
    with_store(&state, false, |store| match query.today {
        Some(today) => store.toggle_habit_on(&db, &view, &record, today),
        None => store.toggle_habit(&db, &view, &record),
    })
}

async fn quick_add_card(
    state: web::Data<AppState>,
    path: web::Path<(String, String, String)>,
    body: web::Json<Values>,
) -> HttpResponse {
    let (db, view, parent) = path.into_inner();
    with_store(&state, true, |store| {
        store.quick_add_card(&db, &view, &parent, body.into_inner())
    })
}
