use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use axum::{
    Extension, Form, Router,
    extract::{Query, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Local;
use handlebars::Handlebars;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::access::{
    FilterSelection, filter_options, narrow, roster_identities, summary_counts, view_rows,
};
use crate::config::Config;
use crate::downloader;
use crate::error::DashboardError;
use crate::loader::Workbook;
use crate::persister;
use crate::presenter::{apply_edits, collect_edits, present};
use crate::schema::{CSM_COLUMN, Role, View};
use crate::session::{SessionContext, SessionStore};
use crate::sheets::SheetClient;
use crate::table::Table;

const SESSION_COOKIE: &str = "session";

pub struct AppState {
    client: Arc<dyn SheetClient>,
    workbook: RwLock<Workbook>,
    sessions: SessionStore,
    templates: Handlebars<'static>,
}

impl AppState {
    pub fn new(client: Arc<dyn SheetClient>, workbook: Workbook) -> Result<Self, AppError> {
        let mut templates = Handlebars::new();
        templates.set_strict_mode(false);
        templates
            .register_template_string("login", include_str!("./static/login.hbs"))
            .map_err(|e| AppError::Setup(e.to_string()))?;
        templates
            .register_template_string("dashboard", include_str!("./static/dashboard.hbs"))
            .map_err(|e| AppError::Setup(e.to_string()))?;

        Ok(AppState {
            client,
            workbook: RwLock::new(workbook),
            sessions: SessionStore::new(),
            templates,
        })
    }

    fn workbook(&self) -> RwLockReadGuard<'_, Workbook> {
        self.workbook.read().unwrap_or_else(|e| e.into_inner())
    }

    fn replace_workbook(&self, workbook: Workbook) {
        *self.workbook.write().unwrap_or_else(|e| e.into_inner()) = workbook;
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("export failed: {0}")]
    Export(String),

    #[error("setup failed: {0}")]
    Setup(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        warn!("{}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Authenticated session attached to the request by [`require_auth`].
#[derive(Clone, Debug)]
pub struct AuthSession {
    pub id: String,
    pub context: SessionContext,
}

#[derive(Deserialize)]
struct LoginForm {
    role: String,
    #[serde(default)]
    logic_id: String,
}

#[derive(Deserialize, Default)]
struct LoginQuery {
    role: Option<String>,
}

#[derive(Deserialize, Default)]
struct DashboardQuery {
    view: Option<String>,
    nation: Option<String>,
    zone: Option<String>,
    csm: Option<String>,
    summary_csm: Option<String>,
}

#[derive(Serialize, Clone)]
struct Flash {
    kind: &'static str,
    message: String,
}

impl Flash {
    fn success(message: String) -> Self {
        Flash {
            kind: "success",
            message,
        }
    }

    fn error(message: String) -> Self {
        Flash {
            kind: "error",
            message,
        }
    }
}

pub fn router(state: Arc<AppState>, static_dir: &std::path::Path) -> Router {
    let protected = Router::new()
        .route("/", get(|| async { Redirect::to("/dashboard") }))
        .route("/dashboard", get(serve_dashboard))
        .route("/dashboard/save", post(handle_save))
        .route("/dashboard/refresh", post(handle_refresh))
        .route("/dashboard/export.csv", get(export_csv))
        .route("/dashboard/export.xlsx", get(export_xlsx))
        .route("/logout", post(handle_logout))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/login", get(serve_login_page).post(handle_login))
        .merge(protected)
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

pub async fn run(
    config: Config,
    client: Arc<dyn SheetClient>,
) -> Result<(), Box<dyn std::error::Error>> {
    let loader = client.clone();
    let workbook = tokio::task::spawn_blocking(move || Workbook::load(loader.as_ref())).await?;

    let state = Arc::new(AppState::new(client, workbook)?);
    let app = router(state, &config.static_dir);

    let listener = TcpListener::bind(config.bind).await?;
    info!("Listening on http://{}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Authentication middleware
///
/// Resolves the `session` cookie to a logged-in [`SessionContext`] and
/// attaches it to the request; anything else is sent to the login page.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Some(context) = state.sessions.get(cookie.value()) {
            if context.is_authenticated() {
                request.extensions_mut().insert(AuthSession {
                    id: cookie.value().to_string(),
                    context,
                });
                return next.run(request).await;
            }
        }
    }
    Redirect::to("/login").into_response()
}

fn render_login(
    state: &AppState,
    role: Role,
    error: Option<String>,
) -> Result<Html<String>, AppError> {
    let workbook = state.workbook();
    let no_users = roster_identities(&workbook.roster, role.column()).is_empty();
    let roles: Vec<_> = Role::ALL
        .iter()
        .map(|r| json!({ "label": r.label(), "selected": *r == role }))
        .collect();

    let page = state.templates.render(
        "login",
        &json!({
            "roles": roles,
            "no_users": no_users,
            "error": error,
            "warnings": workbook.warnings,
        }),
    )?;
    Ok(Html(page))
}

async fn serve_login_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
) -> Result<Html<String>, AppError> {
    let role = query
        .role
        .as_deref()
        .and_then(Role::from_label)
        .unwrap_or(Role::CsmUpdated);
    render_login(&state, role, None)
}

async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let Some(role) = Role::from_label(&form.role) else {
        let message = Some("Unknown login type.".to_string());
        let page = render_login(&state, Role::CsmUpdated, message)?;
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    };

    let mut context = SessionContext::new();
    let outcome = {
        let workbook = state.workbook();
        context.login(&workbook.roster, role, &form.logic_id)
    };

    match outcome {
        Ok(()) => {
            let session_id = state.sessions.create(context);
            let cookie = Cookie::build((SESSION_COOKIE, session_id))
                .path("/")
                .http_only(true);
            Ok((jar.add(cookie), Redirect::to("/dashboard")).into_response())
        }
        Err(e) => {
            let status = match e {
                DashboardError::AuthFailure => StatusCode::UNAUTHORIZED,
                _ => StatusCode::BAD_REQUEST,
            };
            let page = render_login(&state, role, Some(e.to_string()))?;
            Ok((status, page).into_response())
        }
    }
}

async fn handle_logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    state.sessions.remove(&auth.id);
    let cookie = Cookie::build(SESSION_COOKIE).path("/");
    (jar.remove(cookie), Redirect::to("/login"))
}

/// Rows currently on screen: owned rows, sorted, then narrowed.
fn displayed_rows(workbook: &Workbook, context: &SessionContext) -> Result<Table, String> {
    let rows = view_rows(workbook, context);
    match rows.blocking {
        Some(message) => Err(message),
        None => Ok(narrow(&rows.table, &context.filters)),
    }
}

fn options_with_selection(
    values: &[String],
    selected: &Option<String>,
) -> Vec<serde_json::Value> {
    values
        .iter()
        .map(|v| json!({ "value": v, "selected": selected.as_deref() == Some(v.as_str()) }))
        .collect()
}

fn render_dashboard(
    state: &AppState,
    context: &SessionContext,
    summary_csm: Option<String>,
    flash: Option<Flash>,
) -> Result<Html<String>, AppError> {
    let workbook = state.workbook();
    let (role, identity) = context
        .principal()
        .map(|(r, i)| (r.label(), i.to_string()))
        .unwrap_or_default();

    let views: Vec<_> = View::ALL
        .iter()
        .map(|v| json!({ "slug": v.slug(), "label": v.label(), "active": *v == context.view }))
        .collect();

    let rows = view_rows(&workbook, context);
    let today = Local::now().date_naive();

    let mut filters = json!(null);
    let mut summary = json!(null);
    let mut presentation = json!(null);

    if rows.blocking.is_none() {
        let options = filter_options(&rows.table, &context.filters);
        filters = json!({
            "nations": options_with_selection(&options.nations, &context.filters.nation),
            "zones": options_with_selection(&options.zones, &context.filters.zone),
            "csms": options_with_selection(&options.csms, &context.filters.csm),
        });

        // In order of first appearance, like the rows on screen.
        let mut csms: Vec<String> = Vec::new();
        for value in rows.table.column_values(CSM_COLUMN).unwrap_or_default() {
            if !value.is_empty() && !csms.iter().any(|c| c == value) {
                csms.push(value.to_string());
            }
        }
        let chosen = summary_csm
            .filter(|c| csms.contains(c))
            .or_else(|| csms.first().cloned());
        if let Some(csm) = chosen {
            let counts: Vec<_> = summary_counts(&workbook, &csm)
                .into_iter()
                .map(|(view, count)| json!({ "label": view.label(), "count": count }))
                .collect();
            summary = json!({
                "csms": options_with_selection(&csms, &Some(csm.clone())),
                "counts": counts,
            });
        }

        let displayed = narrow(&rows.table, &context.filters);
        presentation = serde_json::to_value(present(context.view, &displayed, today))
            .map_err(|e| AppError::Export(e.to_string()))?;
    }

    let page = state.templates.render(
        "dashboard",
        &json!({
            "identity": identity,
            "role": role,
            "view_label": context.view.label(),
            "view_slug": context.view.slug(),
            "views": views,
            "warnings": workbook.warnings,
            "blocking": rows.blocking,
            "notices": rows.notices,
            "filters": filters,
            "current_filters": context.filters,
            "summary": summary,
            "presentation": presentation,
            "flash": flash,
            "refreshed_at": workbook.refreshed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }),
    )?;
    Ok(Html(page))
}

async fn serve_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, AppError> {
    let mut context = auth.context;

    match query.view.as_deref().and_then(View::from_slug) {
        Some(view) if view != context.view => context.select_view(view),
        _ => context.set_filters(FilterSelection {
            nation: query.nation,
            zone: query.zone,
            csm: query.csm,
        }),
    }
    state.sessions.update(&auth.id, context.clone());

    render_dashboard(&state, &context, query.summary_csm, None)
}

async fn handle_save(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Html<String>, AppError> {
    let context = auth.context;
    let view = context.view;

    let displayed = {
        let workbook = state.workbook();
        displayed_rows(&workbook, &context)
    };

    let flash = match displayed {
        Err(message) => Flash::error(message),
        Ok(table) if form.get("row_count") != Some(&table.len().to_string()) => Flash::error(
            "The table changed since it was displayed. Refresh and try again.".to_string(),
        ),
        Ok(table) => {
            let today = Local::now().date_naive();
            let checked = collect_edits(&table, &form)
                .and_then(|edits| apply_edits(&table, &edits, today));
            match checked {
                Err(e) => Flash::error(e.to_string()),
                Ok(edited) => {
                    let client = state.client.clone();
                    let outcome = tokio::task::spawn_blocking(move || {
                        persister::save(client.as_ref(), &edited, view.source_tab())
                    })
                    .await?;
                    match outcome {
                        Ok(report) => Flash::success(report.message()),
                        Err(e) => Flash::error(e.to_string()),
                    }
                }
            }
        }
    };

    render_dashboard(&state, &context, None, Some(flash))
}

async fn handle_refresh(State(state): State<Arc<AppState>>) -> Result<Redirect, AppError> {
    let client = state.client.clone();
    let workbook = tokio::task::spawn_blocking(move || Workbook::load(client.as_ref())).await?;
    state.replace_workbook(workbook);
    Ok(Redirect::to("/dashboard"))
}

fn export_table(state: &AppState, context: &SessionContext) -> Table {
    let workbook = state.workbook();
    displayed_rows(&workbook, context).unwrap_or_default()
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
) -> Response {
    let table = export_table(&state, &auth.context);
    let filename = format!("{}.csv", auth.context.view.slug());
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        downloader::to_csv(&table),
    )
        .into_response()
}

async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
) -> Result<Response, AppError> {
    let table = export_table(&state, &auth.context);
    let view = auth.context.view;
    let bytes =
        downloader::to_xlsx(&table, view.label()).map_err(|e| AppError::Export(e.to_string()))?;
    let filename = format!("{}.xlsx", view.slug());
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}
