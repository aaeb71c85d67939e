//! # API REST
//!
//! REST API implementation for the Medical Records Bridge.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, the API key gate)
//!
//! Uses `api-shared` for common types and utilities. Enrichment calls block on provider HTTP
//! requests, so they run on tokio's blocking pool.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{FromRequestParts, Path as AxumPath, Query, State},
    http::{request::Parts, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::auth::{self, AuthError, API_KEY_HEADER, USER_ID_HEADER};
use api_shared::{
    check_health, ChatReq, CreateMedicationReq, CreateRecordReq, EnrichmentRes,
    ExplainQuery, ExtractMedicationsReq, ExtractMedicationsRes, HealthRes, ListMedicationsQuery,
    ListMedicationsRes, ListRecordsQuery, ListRecordsRes, MedicationMentionRes, MedicationRes,
    MedicationSummaryRes, RecordRes, RecordSummaryRes, SearchMedicationsQuery, SuggestionsReq,
    TranslateReq, UpdateRecordReq,
};
use mrb_core::constants::{DEFAULT_LIST_LIMIT, DEFAULT_MEDICATION_SEARCH_LIMIT};
use mrb_core::medications::load_catalogue;
use mrb_core::{
    CoreConfig, EnrichmentError, EnrichmentResult, EnrichmentService, FallbackOrchestrator,
    FileMedicationStore, FileRecordStore, InMemoryMedicationStore, MedicalRecord, Medication,
    MedicationError, MedicationMention, MedicationService, MedicationStore, NewMedication,
    NewRecord, RecordError, RecordId, RecordService, RecordStore, RecordSummary, RecordUpdate,
};

type ApiError = (StatusCode, &'static str);

/// Application state for the REST API server
///
/// Shared by every request handler: the record CRUD layer, the enrichment service writing
/// through the same store, the medication catalogue and the API key resolved at startup.
#[derive(Clone)]
pub struct AppState {
    records: RecordService,
    enrichment: EnrichmentService,
    medications: MedicationService,
    api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        orchestrator: FallbackOrchestrator,
        api_key: Option<String>,
    ) -> Self {
        Self {
            records: RecordService::new(store.clone()),
            enrichment: EnrichmentService::new(store, orchestrator),
            medications: MedicationService::new(Arc::new(InMemoryMedicationStore::new())),
            api_key: api_key.filter(|k| !k.is_empty()).map(Arc::from),
        }
    }

    /// Replaces the (initially empty, in-memory) medication catalogue.
    pub fn with_medications(mut self, store: Arc<dyn MedicationStore>) -> Self {
        self.medications = MedicationService::new(store);
        self
    }

    /// Opens the file stores under `cfg` and builds the production provider chain.
    ///
    /// When `MEDICATIONS_SEED_FILE` is configured its entries are merged into the medication
    /// catalogue before the state is returned.
    ///
    /// # Errors
    /// Returns an error if a storage directory cannot be created or the seed file cannot be
    /// loaded.
    pub fn from_config(cfg: &CoreConfig, api_key: Option<String>) -> anyhow::Result<Self> {
        let store = Arc::new(FileRecordStore::open(cfg.records_dir())?);
        let medication_store = Arc::new(FileMedicationStore::open(cfg.medications_file())?);
        let orchestrator = FallbackOrchestrator::from_config(cfg.ai());
        if orchestrator.has_available_provider() {
            tracing::info!(
                "AI provider chain: {}",
                orchestrator.provider_ids().join(" -> ")
            );
        } else {
            tracing::warn!("no AI providers configured; AI features will be unavailable");
        }
        if api_key.as_deref().map_or(true, str::is_empty) {
            tracing::warn!("API_KEY not set; every /api request will be rejected");
        }
        let state = Self::new(store, orchestrator, api_key).with_medications(medication_store);
        if let Some(seed_file) = cfg.medications_seed_file() {
            tracing::info!("seeding medications from {}", seed_file.display());
            state.medications.seed(load_catalogue(seed_file)?)?;
        }
        Ok(state)
    }

    /// Resolves configuration from the process environment.
    ///
    /// # Environment Variables
    /// - `RECORDS_DATA_DIR`, `API_KEY`, `MEDICATIONS_SEED_FILE`, and the `GROQ_*`,
    ///   `HUGGINGFACE_*`, `OLLAMA_*` and `AI_*` provider settings.
    pub fn from_env() -> anyhow::Result<Self> {
        let cfg = CoreConfig::from_lookup(|key| std::env::var(key).ok())?;
        Self::from_config(&cfg, std::env::var("API_KEY").ok())
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        create_record,
        list_records,
        get_record,
        update_record,
        delete_record,
        translate,
        suggestions,
        explain,
        chat,
        list_medications,
        create_medication,
        search_medications,
        get_medication,
        get_medication_by_name,
        extract_medications,
    ),
    components(schemas(
        HealthRes,
        CreateRecordReq,
        UpdateRecordReq,
        RecordRes,
        RecordSummaryRes,
        ListRecordsRes,
        TranslateReq,
        SuggestionsReq,
        ChatReq,
        EnrichmentRes,
        MedicationRes,
        MedicationSummaryRes,
        ListMedicationsRes,
        CreateMedicationReq,
        ExtractMedicationsReq,
        MedicationMentionRes,
        ExtractMedicationsRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with CORS and Swagger UI.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/records", get(list_records).post(create_record))
        .route(
            "/api/records/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
        .route("/api/ai/translate", post(translate))
        .route("/api/ai/suggestions", post(suggestions))
        .route("/api/ai/explain/:record_id", post(explain))
        .route("/api/ai/chat", post(chat))
        .route(
            "/api/medications",
            get(list_medications).post(create_medication),
        )
        .route("/api/medications/search", get(search_medications))
        .route("/api/medications/extract", post(extract_medications))
        .route("/api/medications/name/:name", get(get_medication_by_name))
        .route("/api/medications/:id", get(get_medication))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The authenticated caller of an `/api` route.
///
/// Requires a valid `x-api-key` and a non-blank `x-user-id`; the user id scopes every record
/// operation.
pub struct Caller {
    pub user_id: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        auth::validate_api_key(header(parts, API_KEY_HEADER), state.api_key.as_deref())
            .map_err(auth_rejection)?;
        let user_id = auth::validate_user_id(header(parts, USER_ID_HEADER)).map_err(auth_rejection)?;
        Ok(Caller { user_id })
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

fn auth_rejection(err: AuthError) -> ApiError {
    match err {
        AuthError::NotConfigured => {
            tracing::error!("Rejecting request: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "API key not configured")
        }
        AuthError::MissingKey => (StatusCode::UNAUTHORIZED, "Missing x-api-key header"),
        AuthError::InvalidKey => (StatusCode::UNAUTHORIZED, "Invalid API key"),
        AuthError::MissingUser => (StatusCode::UNAUTHORIZED, "Missing x-user-id header"),
    }
}

fn record_error(err: RecordError) -> ApiError {
    match err {
        RecordError::InvalidInput(_) => {
            tracing::debug!("Rejected record input: {}", err);
            (StatusCode::BAD_REQUEST, "Invalid input")
        }
        RecordError::NotFound(_) => (StatusCode::NOT_FOUND, "Record not found"),
        other => {
            tracing::error!("Record store error: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

fn enrichment_error(err: EnrichmentError) -> ApiError {
    match err {
        EnrichmentError::Unavailable { attempts } => {
            tracing::error!("AI enrichment unavailable after {} attempt(s)", attempts.len());
            for attempt in &attempts {
                tracing::error!("  {}", attempt);
            }
            (StatusCode::SERVICE_UNAVAILABLE, "AI features unavailable")
        }
        EnrichmentError::InvalidRequest(msg) => {
            tracing::debug!("Rejected enrichment request: {}", msg);
            (StatusCode::BAD_REQUEST, "Invalid request")
        }
    }
}

fn medication_error(err: MedicationError) -> ApiError {
    match err {
        MedicationError::InvalidInput(_) => {
            tracing::debug!("Rejected medication input: {}", err);
            (StatusCode::BAD_REQUEST, "Invalid input")
        }
        MedicationError::NotFound(_) => (StatusCode::NOT_FOUND, "Medication not found"),
        MedicationError::AlreadyExists(_) => (
            StatusCode::CONFLICT,
            "Medication with this name already exists",
        ),
        other => {
            tracing::error!("Medication store error: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

fn parse_record_id(id: &str) -> Result<RecordId, ApiError> {
    RecordId::parse(id).map_err(|e| {
        tracing::debug!("Invalid record id {:?}: {}", id, e);
        (StatusCode::BAD_REQUEST, "Invalid record id")
    })
}

/// Runs blocking enrichment work off the async executor.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        tracing::error!("Enrichment task failed: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    })?
}

fn timestamp(at: &chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn record_res(record: &MedicalRecord) -> RecordRes {
    RecordRes {
        id: record.id.to_string(),
        title: record.title.clone(),
        original_text: record.original_text.clone(),
        record_type: record.record_type.clone(),
        translated_text: record.translation().map(str::to_string),
        lifestyle_suggestions: record.suggestions().map(str::to_string),
        suggestions_condition: record
            .lifestyle_suggestions
            .as_ref()
            .and_then(|s| s.condition.clone()),
        created_at: timestamp(&record.created_at),
        updated_at: timestamp(&record.updated_at),
    }
}

fn summary_res(summary: RecordSummary) -> RecordSummaryRes {
    RecordSummaryRes {
        id: summary.id.to_string(),
        title: summary.title,
        record_type: summary.record_type,
        created_at: timestamp(&summary.created_at),
        has_translation: summary.has_translation,
        has_suggestions: summary.has_suggestions,
    }
}

fn medication_res(medication: Medication) -> MedicationRes {
    MedicationRes {
        id: medication.id,
        name: medication.name,
        url: medication.url,
        uses: medication.uses,
        side_effects: medication.side_effects,
        discontinued: medication.discontinued,
        discontinuation_reason: medication.discontinuation_reason,
        created_at: timestamp(&medication.created_at),
        updated_at: medication.updated_at.as_ref().map(timestamp),
    }
}

fn medication_summary_res(medication: Medication) -> MedicationSummaryRes {
    MedicationSummaryRes {
        id: medication.id,
        name: medication.name,
        uses: medication.uses,
        discontinued: medication.discontinued,
    }
}

fn mention_res(mention: MedicationMention) -> MedicationMentionRes {
    MedicationMentionRes {
        name: mention.name,
        uses: mention.uses,
        side_effects: mention.side_effects,
        discontinued: mention.discontinued,
        discontinuation_reason: mention.discontinuation_reason,
        warning: mention.warning.map(str::to_string),
    }
}

fn enrichment_res(result: EnrichmentResult) -> EnrichmentRes {
    EnrichmentRes {
        content: result.content,
        cached: result.cached,
        provider_used: result.provider_used,
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks. Does not require an API key.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(check_health())
}

#[utoipa::path(
    post,
    path = "/api/records",
    request_body = CreateRecordReq,
    responses(
        (status = 201, description = "Record created", body = RecordRes),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorised"),
        (status = 500, description = "Internal server error")
    )
)]
/// Create a medical record owned by the caller
///
/// # Errors
/// Returns `400 Bad Request` if the title is blank or longer than 200 characters, or the text
/// is blank.
#[axum::debug_handler]
async fn create_record(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<CreateRecordReq>,
) -> Result<(StatusCode, Json<RecordRes>), ApiError> {
    let record = state
        .records
        .create(
            &caller.user_id,
            NewRecord {
                title: req.title,
                original_text: req.original_text,
                record_type: req.record_type,
            },
        )
        .map_err(record_error)?;
    Ok((StatusCode::CREATED, Json(record_res(&record))))
}

#[utoipa::path(
    get,
    path = "/api/records",
    params(ListRecordsQuery),
    responses(
        (status = 200, description = "The caller's records", body = ListRecordsRes),
        (status = 401, description = "Unauthorised"),
        (status = 500, description = "Internal server error")
    )
)]
/// List the caller's records, oldest first
#[axum::debug_handler]
async fn list_records(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<ListRecordsRes>, ApiError> {
    let records = state
        .records
        .list(&caller.user_id, query.skip.unwrap_or(0), query.limit)
        .map_err(record_error)?;
    Ok(Json(ListRecordsRes {
        records: records.into_iter().map(summary_res).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/records/{id}",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Record retrieved", body = RecordRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Record not found")
    )
)]
#[axum::debug_handler]
async fn get_record(
    State(state): State<AppState>,
    caller: Caller,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<RecordRes>, ApiError> {
    let id = parse_record_id(&id)?;
    let record = state
        .records
        .get(&caller.user_id, &id)
        .map_err(record_error)?;
    Ok(Json(record_res(&record)))
}

#[utoipa::path(
    put,
    path = "/api/records/{id}",
    params(("id" = String, Path, description = "Record id")),
    request_body = UpdateRecordReq,
    responses(
        (status = 200, description = "Record updated", body = RecordRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Record not found")
    )
)]
/// Update a record
///
/// Changing `original_text` clears the cached translation and suggestions.
#[axum::debug_handler]
async fn update_record(
    State(state): State<AppState>,
    caller: Caller,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<UpdateRecordReq>,
) -> Result<Json<RecordRes>, ApiError> {
    let id = parse_record_id(&id)?;
    let record = state
        .records
        .update(
            &caller.user_id,
            &id,
            RecordUpdate {
                title: req.title,
                original_text: req.original_text,
                record_type: req.record_type,
            },
        )
        .map_err(record_error)?;
    Ok(Json(record_res(&record)))
}

#[utoipa::path(
    delete,
    path = "/api/records/{id}",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "Record not found")
    )
)]
#[axum::debug_handler]
async fn delete_record(
    State(state): State<AppState>,
    caller: Caller,
    AxumPath(id): AxumPath<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_record_id(&id)?;
    state
        .records
        .delete(&caller.user_id, &id)
        .map_err(record_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/ai/translate",
    request_body = TranslateReq,
    responses(
        (status = 200, description = "Plain-language translation", body = EnrichmentRes),
        (status = 400, description = "Neither text nor record_id given"),
        (status = 404, description = "Record not found"),
        (status = 503, description = "AI features unavailable")
    )
)]
/// Translate medical text into plain language
///
/// With `record_id` the record's text is translated and the result cached on the record;
/// otherwise the free `text` is translated without caching.
#[axum::debug_handler]
async fn translate(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<TranslateReq>,
) -> Result<Json<EnrichmentRes>, ApiError> {
    let result = run_blocking(move || match (req.record_id, req.text) {
        (Some(id), _) => {
            let id = parse_record_id(&id)?;
            let mut record = state
                .records
                .get(&caller.user_id, &id)
                .map_err(record_error)?;
            state
                .enrichment
                .translate(&mut record, req.force_refresh)
                .map_err(enrichment_error)
        }
        (None, Some(text)) => state
            .enrichment
            .translate_text(&text)
            .map_err(enrichment_error),
        (None, None) => Err((StatusCode::BAD_REQUEST, "Either text or record_id is required")),
    })
    .await?;
    Ok(Json(enrichment_res(result)))
}

#[utoipa::path(
    post,
    path = "/api/ai/suggestions",
    request_body = SuggestionsReq,
    responses(
        (status = 200, description = "Lifestyle suggestions", body = EnrichmentRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Record not found"),
        (status = 503, description = "AI features unavailable")
    )
)]
/// Lifestyle suggestions for a condition
///
/// With `record_id` the suggestions are grounded in the record's text and cached on it.
#[axum::debug_handler]
async fn suggestions(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<SuggestionsReq>,
) -> Result<Json<EnrichmentRes>, ApiError> {
    let result = run_blocking(move || match req.record_id {
        Some(id) => {
            let id = parse_record_id(&id)?;
            let mut record = state
                .records
                .get(&caller.user_id, &id)
                .map_err(record_error)?;
            state
                .enrichment
                .suggest(&mut record, &req.condition, req.force_refresh)
                .map_err(enrichment_error)
        }
        None => state
            .enrichment
            .suggest_for_condition(&req.condition)
            .map_err(enrichment_error),
    })
    .await?;
    Ok(Json(enrichment_res(result)))
}

#[utoipa::path(
    post,
    path = "/api/ai/explain/{record_id}",
    params(("record_id" = String, Path, description = "Record id"), ExplainQuery),
    responses(
        (status = 200, description = "Explanation of the record", body = EnrichmentRes),
        (status = 404, description = "Record not found"),
        (status = 503, description = "AI features unavailable")
    )
)]
/// Explain a stored record in plain language
#[axum::debug_handler]
async fn explain(
    State(state): State<AppState>,
    caller: Caller,
    AxumPath(record_id): AxumPath<String>,
    Query(query): Query<ExplainQuery>,
) -> Result<Json<EnrichmentRes>, ApiError> {
    let id = parse_record_id(&record_id)?;
    let result = run_blocking(move || {
        let mut record = state
            .records
            .get(&caller.user_id, &id)
            .map_err(record_error)?;
        state
            .enrichment
            .explain(&mut record, query.force_refresh)
            .map_err(enrichment_error)
    })
    .await?;
    Ok(Json(enrichment_res(result)))
}

#[utoipa::path(
    post,
    path = "/api/ai/chat",
    request_body = ChatReq,
    responses(
        (status = 200, description = "Assistant reply", body = EnrichmentRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Record not found"),
        (status = 503, description = "AI features unavailable")
    )
)]
/// Ask the assistant a question, optionally about one of the caller's records
#[axum::debug_handler]
async fn chat(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<ChatReq>,
) -> Result<Json<EnrichmentRes>, ApiError> {
    let result = run_blocking(move || {
        let context = match req.record_id {
            Some(id) => {
                let id = parse_record_id(&id)?;
                let record = state
                    .records
                    .get(&caller.user_id, &id)
                    .map_err(record_error)?;
                Some(record.original_text)
            }
            None => None,
        };
        state
            .enrichment
            .chat(&req.message, context.as_deref())
            .map_err(enrichment_error)
    })
    .await?;
    Ok(Json(enrichment_res(result)))
}

#[utoipa::path(
    get,
    path = "/api/medications",
    params(ListMedicationsQuery),
    responses(
        (status = 200, description = "One page of the catalogue", body = ListMedicationsRes),
        (status = 401, description = "Unauthorised")
    )
)]
/// List the medication catalogue, ordered by id
#[axum::debug_handler]
async fn list_medications(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<ListMedicationsQuery>,
) -> Result<Json<ListMedicationsRes>, ApiError> {
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let page = state
        .medications
        .list(skip, Some(limit), query.discontinued_only)
        .map_err(medication_error)?;
    Ok(Json(ListMedicationsRes {
        medications: page
            .medications
            .into_iter()
            .map(medication_summary_res)
            .collect(),
        total: page.total,
        skip,
        limit,
    }))
}

#[utoipa::path(
    post,
    path = "/api/medications",
    request_body = CreateMedicationReq,
    responses(
        (status = 201, description = "Medication added", body = MedicationRes),
        (status = 400, description = "Bad request"),
        (status = 409, description = "Name already in the catalogue")
    )
)]
/// Add a medication to the catalogue
#[axum::debug_handler]
async fn create_medication(
    State(state): State<AppState>,
    _caller: Caller,
    Json(req): Json<CreateMedicationReq>,
) -> Result<(StatusCode, Json<MedicationRes>), ApiError> {
    let medication = state
        .medications
        .create(NewMedication {
            name: req.name,
            url: req.url,
            uses: req.uses,
            side_effects: req.side_effects,
            discontinued: req.discontinued,
            discontinuation_reason: req.discontinuation_reason,
        })
        .map_err(medication_error)?;
    Ok((StatusCode::CREATED, Json(medication_res(medication))))
}

#[utoipa::path(
    get,
    path = "/api/medications/search",
    params(SearchMedicationsQuery),
    responses(
        (status = 200, description = "Matching medications", body = [MedicationSummaryRes]),
        (status = 400, description = "Missing query")
    )
)]
/// Search medications by name or uses
///
/// Discontinued medications are hidden unless `include_discontinued=true`.
#[axum::debug_handler]
async fn search_medications(
    State(state): State<AppState>,
    _caller: Caller,
    Query(query): Query<SearchMedicationsQuery>,
) -> Result<Json<Vec<MedicationSummaryRes>>, ApiError> {
    let q = query
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "Query parameter \"q\" is required"))?;
    let found = state
        .medications
        .search(
            &q,
            query.skip.unwrap_or(0),
            Some(query.limit.unwrap_or(DEFAULT_MEDICATION_SEARCH_LIMIT)),
            query.include_discontinued,
        )
        .map_err(medication_error)?;
    Ok(Json(found.into_iter().map(medication_summary_res).collect()))
}

#[utoipa::path(
    get,
    path = "/api/medications/{id}",
    params(("id" = u64, Path, description = "Medication id")),
    responses(
        (status = 200, description = "Medication retrieved", body = MedicationRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Medication not found")
    )
)]
#[axum::debug_handler]
async fn get_medication(
    State(state): State<AppState>,
    _caller: Caller,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<MedicationRes>, ApiError> {
    let id = id.parse::<u64>().map_err(|_| {
        tracing::debug!("Invalid medication id {:?}", id);
        (StatusCode::BAD_REQUEST, "Invalid medication id")
    })?;
    let medication = state.medications.get(id).map_err(medication_error)?;
    Ok(Json(medication_res(medication)))
}

#[utoipa::path(
    get,
    path = "/api/medications/name/{name}",
    params(("name" = String, Path, description = "Medication name, any case")),
    responses(
        (status = 200, description = "Medication retrieved", body = MedicationRes),
        (status = 404, description = "Medication not found")
    )
)]
#[axum::debug_handler]
async fn get_medication_by_name(
    State(state): State<AppState>,
    _caller: Caller,
    AxumPath(name): AxumPath<String>,
) -> Result<Json<MedicationRes>, ApiError> {
    let medication = state
        .medications
        .get_by_name(&name)
        .map_err(medication_error)?;
    Ok(Json(medication_res(medication)))
}

#[utoipa::path(
    post,
    path = "/api/medications/extract",
    request_body = ExtractMedicationsReq,
    responses(
        (status = 200, description = "Mentioned medications", body = ExtractMedicationsRes),
        (status = 400, description = "Neither text nor record_id given"),
        (status = 404, description = "Record not found")
    )
)]
/// Find catalogue medications mentioned in free text or in one of the caller's records
///
/// Discontinued medications carry a `DISCONTINUED` warning.
#[axum::debug_handler]
async fn extract_medications(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<ExtractMedicationsReq>,
) -> Result<Json<ExtractMedicationsRes>, ApiError> {
    let text = match (req.record_id, req.text) {
        (Some(id), _) => {
            let id = parse_record_id(&id)?;
            state
                .records
                .get(&caller.user_id, &id)
                .map_err(record_error)?
                .original_text
        }
        (None, Some(text)) => text,
        (None, None) => {
            return Err((StatusCode::BAD_REQUEST, "Either text or record_id is required"))
        }
    };
    let found: Vec<MedicationMentionRes> = state
        .medications
        .mentions_in(&text)
        .map_err(medication_error)?
        .into_iter()
        .map(mention_res)
        .collect();
    Ok(Json(ExtractMedicationsRes {
        count: found.len(),
        medications_found: found,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use mrb_core::enrichment::{EnrichmentRequest, Provider, ProviderError};
    use mrb_core::InMemoryRecordStore;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    const KEY: &str = "test-key";

    /// Answers every request with a fixed prefix and the request text.
    struct EchoProvider {
        calls: AtomicUsize,
    }

    impl Provider for EchoProvider {
        fn id(&self) -> &str {
            "echo"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn enrich(
            &self,
            request: &EnrichmentRequest,
            _timeout: Duration,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("plain: {}", request.text))
        }
    }

    fn app_with(providers: Vec<Arc<dyn Provider>>) -> Router {
        let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
        let orchestrator =
            FallbackOrchestrator::new(providers, Duration::from_secs(2), Duration::ZERO);
        router(AppState::new(store, orchestrator, Some(KEY.to_string())))
    }

    fn app() -> (Router, Arc<EchoProvider>) {
        let echo = Arc::new(EchoProvider {
            calls: AtomicUsize::new(0),
        });
        (app_with(vec![echo.clone() as Arc<dyn Provider>]), echo)
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(API_KEY_HEADER, KEY)
            .header(USER_ID_HEADER, "user-1")
            .header("content-type", "application/json");
        match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn create(app: &Router, text: &str) -> String {
        let (status, body) = send(
            app,
            request(
                "POST",
                "/api/records",
                Some(json!({"title": "Blood panel", "original_text": text})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_needs_no_key() {
        let (app, _) = app();
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
    }

    #[tokio::test]
    async fn test_api_routes_require_key_and_user() {
        let (app, _) = app();

        let no_key = Request::builder()
            .uri("/api/records")
            .header(USER_ID_HEADER, "user-1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, no_key).await.0, StatusCode::UNAUTHORIZED);

        let bad_key = Request::builder()
            .uri("/api/records")
            .header(API_KEY_HEADER, "nope")
            .header(USER_ID_HEADER, "user-1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, bad_key).await.0, StatusCode::UNAUTHORIZED);

        let no_user = Request::builder()
            .uri("/api/records")
            .header(API_KEY_HEADER, KEY)
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, no_user).await.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_record_crud_round() {
        let (app, _) = app();
        let id = create(&app, "WBC: 7.5, RBC: 4.8").await;

        let (status, body) = send(&app, request("GET", &format!("/api/records/{id}"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["original_text"], json!("WBC: 7.5, RBC: 4.8"));
        assert_eq!(body["record_type"], json!("doctor_note"));
        assert_eq!(body["translated_text"], Value::Null);

        let (status, body) = send(
            &app,
            request(
                "PUT",
                &format!("/api/records/{id}"),
                Some(json!({"title": "Renamed"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], json!("Renamed"));

        let (status, body) = send(&app, request("GET", "/api/records", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["records"].as_array().unwrap().len(), 1);

        let (status, _) =
            send(&app, request("DELETE", &format!("/api/records/{id}"), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, request("GET", &format!("/api/records/{id}"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_record_input_and_id() {
        let (app, _) = app();
        let (status, _) = send(
            &app,
            request(
                "POST",
                "/api/records",
                Some(json!({"title": "  ", "original_text": "x"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, request("GET", "/api/records/not-an-id", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_translate_record_then_cached() {
        let (app, echo) = app();
        let id = create(&app, "WBC: 7.5, RBC: 4.8").await;

        let (status, body) = send(
            &app,
            request("POST", "/api/ai/translate", Some(json!({"record_id": id}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], json!("plain: WBC: 7.5, RBC: 4.8"));
        assert_eq!(body["cached"], json!(false));
        assert_eq!(body["provider_used"], json!("echo"));

        let (_, body) = send(
            &app,
            request("POST", "/api/ai/translate", Some(json!({"record_id": id}))),
        )
        .await;
        assert_eq!(body["cached"], json!(true));
        assert!(body.get("provider_used").is_none());
        assert_eq!(echo.calls.load(Ordering::SeqCst), 1);

        let (_, body) = send(&app, request("GET", &format!("/api/records/{id}"), None)).await;
        assert_eq!(body["translated_text"], json!("plain: WBC: 7.5, RBC: 4.8"));

        let (_, body) = send(&app, request("GET", "/api/records", None)).await;
        assert_eq!(body["records"][0]["has_translation"], json!(true));
    }

    #[tokio::test]
    async fn test_text_edit_invalidates_translation() {
        let (app, echo) = app();
        let id = create(&app, "WBC: 7.5").await;
        send(
            &app,
            request("POST", &format!("/api/ai/explain/{id}"), None),
        )
        .await;

        let (_, body) = send(
            &app,
            request(
                "PUT",
                &format!("/api/records/{id}"),
                Some(json!({"original_text": "WBC: 12.0"})),
            ),
        )
        .await;
        assert_eq!(body["translated_text"], Value::Null);

        let (_, body) = send(
            &app,
            request("POST", &format!("/api/ai/explain/{id}"), None),
        )
        .await;
        assert_eq!(body["content"], json!("plain: WBC: 12.0"));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_explain_force_refresh_calls_again() {
        let (app, echo) = app();
        let id = create(&app, "WBC: 7.5").await;
        send(&app, request("POST", &format!("/api/ai/explain/{id}"), None)).await;
        let (_, body) = send(
            &app,
            request(
                "POST",
                &format!("/api/ai/explain/{id}?force_refresh=true"),
                None,
            ),
        )
        .await;
        assert_eq!(body["cached"], json!(false));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_translate_free_text_and_missing_input() {
        let (app, _) = app();
        let (status, body) = send(
            &app,
            request("POST", "/api/ai/translate", Some(json!({"text": "BP 120/80"}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], json!("plain: BP 120/80"));

        let (status, _) = send(&app, request("POST", "/api/ai/translate", Some(json!({})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_suggestions_and_chat() {
        let (app, echo) = app();
        let id = create(&app, "BP 150/95").await;

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/api/ai/suggestions",
                Some(json!({"condition": "hypertension", "record_id": id})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cached"], json!(false));

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/api/ai/chat",
                Some(json!({"message": "What is BP?", "record_id": id})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], json!("plain: What is BP?"));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 2);

        let (status, _) = send(
            &app,
            request("POST", "/api/ai/suggestions", Some(json!({"condition": " "}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_no_providers_is_service_unavailable_and_crud_still_works() {
        let app = app_with(Vec::new());
        let id = create(&app, "WBC: 7.5").await;

        let (status, body) = send(
            &app,
            request("POST", "/api/ai/translate", Some(json!({"record_id": id}))),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!("AI features unavailable"));

        let (status, body) = send(&app, request("GET", &format!("/api/records/{id}"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["translated_text"], Value::Null);
    }

    #[tokio::test]
    async fn test_foreign_record_is_not_found() {
        let (app, _) = app();
        let id = create(&app, "WBC: 7.5").await;
        let req = Request::builder()
            .method("POST")
            .uri("/api/ai/translate")
            .header(API_KEY_HEADER, KEY)
            .header(USER_ID_HEADER, "someone-else")
            .header("content-type", "application/json")
            .body(Body::from(json!({"record_id": id}).to_string()))
            .unwrap();
        assert_eq!(send(&app, req).await.0, StatusCode::NOT_FOUND);
    }

    async fn add_medication(app: &Router, body: Value) -> (StatusCode, Value) {
        send(app, request("POST", "/api/medications", Some(body))).await
    }

    async fn with_catalogue() -> Router {
        let (app, _) = app();
        for body in [
            json!({"name": "Metformin", "uses": "Type 2 diabetes"}),
            json!({"name": "Lisinopril", "uses": "Hypertension"}),
            json!({
                "name": "Ranitidine",
                "uses": "Heartburn",
                "discontinued": true,
                "discontinuation_reason": "NDMA contamination"
            }),
        ] {
            assert_eq!(add_medication(&app, body).await.0, StatusCode::CREATED);
        }
        app
    }

    #[tokio::test]
    async fn test_medication_catalogue_routes() {
        let app = with_catalogue().await;

        let (status, _) = add_medication(&app, json!({"name": "metformin"})).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) =
            send(&app, request("GET", "/api/medications/search?q=hyper", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], json!("Lisinopril"));

        let (_, body) = send(
            &app,
            request(
                "GET",
                "/api/medications/search?q=ranitidine&include_discontinued=true",
                None,
            ),
        )
        .await;
        assert_eq!(body[0]["discontinued"], json!(true));

        let (status, _) = send(&app, request("GET", "/api/medications/search", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, request("GET", "/api/medications/1", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], json!("Metformin"));
        assert_eq!(body["updated_at"], Value::Null);

        let (status, body) =
            send(&app, request("GET", "/api/medications/name/RANITIDINE", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["discontinuation_reason"], json!("NDMA contamination"));

        let (status, _) = send(&app, request("GET", "/api/medications/99", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, request("GET", "/api/medications/abc", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            request("GET", "/api/medications?discontinued_only=true", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], json!(1));
        assert_eq!(body["limit"], json!(100));
        assert_eq!(body["medications"][0]["name"], json!("Ranitidine"));
    }

    #[tokio::test]
    async fn test_extract_medications_from_record_and_text() {
        let app = with_catalogue().await;
        let id = create(&app, "Continue metformin 500mg. Stopped Ranitidine last year.").await;

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/api/medications/extract",
                Some(json!({"record_id": id})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], json!(2));
        assert_eq!(body["medications_found"][0]["name"], json!("Metformin"));
        assert_eq!(body["medications_found"][0]["warning"], Value::Null);
        assert_eq!(body["medications_found"][1]["warning"], json!("DISCONTINUED"));

        let (_, body) = send(
            &app,
            request(
                "POST",
                "/api/medications/extract",
                Some(json!({"text": "lisinopril 10mg daily"})),
            ),
        )
        .await;
        assert_eq!(body["count"], json!(1));

        let (status, _) = send(
            &app,
            request("POST", "/api/medications/extract", Some(json!({}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_file_backed_state_seeds_medications() {
        let tmp = tempfile::TempDir::new().unwrap();
        let seed = tmp.path().join("medications_data.json");
        std::fs::write(
            &seed,
            r#"[{"name": "Ranitidine", "discontinued": true}, {"name": "Metformin"}]"#,
        )
        .unwrap();
        let cfg = CoreConfig::new(tmp.path().join("data"), mrb_core::AiConfig::default())
            .with_medications_seed_file(Some(seed));

        let state = AppState::from_config(&cfg, Some(KEY.into())).unwrap();

        assert!(state.medications.check_discontinued("ranitidine").unwrap());
        assert!(cfg.medications_file().is_file());
        let reopened = AppState::from_config(&cfg, Some(KEY.into())).unwrap();
        assert_eq!(reopened.medications.list(0, None, false).unwrap().total, 2);
    }

    #[test]
    fn test_file_backed_state_from_config() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = CoreConfig::new(tmp.path().to_path_buf(), mrb_core::AiConfig::default());
        let state = AppState::from_config(&cfg, Some(KEY.into())).unwrap();
        assert_eq!(state.api_key.as_deref(), Some(KEY));
        assert!(cfg.records_dir().is_dir());
    }
}
