use super::*;

use axum::extract::{Form, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tower_http::cors::{Any, CorsLayer};

pub(super) const SESSION_COOKIE: &str = "sid";

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
const LOGIN_TEMPLATE: &str = include_str!("../templates/login.html");
const LOGIN_ERROR_TEMPLATE: &str = include_str!("../templates/login-error.html");
const REGISTER_TEMPLATE: &str = include_str!("../templates/register.html");

type SharedState = std::sync::Arc<AppState>;

/// Handler failure. Logged, then reported as a bare 500.
pub(super) struct WebError(anyhow::Error);

impl<E> From<E> for WebError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        WebError(err.into())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        error!("request failed: {:#}", self.0);
        let from_store = self
            .0
            .chain()
            .any(|cause| cause.is::<StoreError>() || cause.is::<sqlx::Error>());
        let message = if from_store {
            "Database error"
        } else {
            "Internal server error"
        };
        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}

#[derive(Deserialize)]
struct Credentials {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct AddForm {
    #[serde(default)]
    text: String,
}

// Malformed or missing ids redirect home like any other no-op.
#[derive(Deserialize)]
struct DeleteForm {
    #[serde(default)]
    id: String,
}

#[derive(Deserialize)]
struct EditForm {
    #[serde(default)]
    id: String,
    #[serde(default)]
    text: String,
}

pub(super) fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(index))
        .route("/login", get(login_page).post(submit_login))
        .route("/login-error", get(login_error_page))
        .route("/register", get(register_page).post(submit_register))
        .route("/add", post(add_task))
        .route("/delete", post(delete_task))
        .route("/edit", post(edit_task))
        .route("/logout", get(logout).post(logout))
        .fallback(not_found)
        .layer(cors)
        .with_state(state)
}

pub(super) async fn serve(listener: tokio::net::TcpListener, state: SharedState) -> Result<()> {
    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("run web server")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
    info!("web server shutting down");
}

async fn index(State(state): State<SharedState>, jar: CookieJar) -> Result<Response, WebError> {
    let Some(session) = current_session(&state, &jar).await else {
        return Ok(Redirect::to("/login").into_response());
    };
    let list = engine::list_items(state.store.as_ref(), session.account_id).await?;
    let username = escape_html(&session.username);
    let auth_token = escape_html(&session.auth_token);
    let rows = render_rows(&list);
    let html = render_template(
        INDEX_TEMPLATE,
        &[
            ("username", username.as_str()),
            ("auth_token", auth_token.as_str()),
            ("rows", rows.as_str()),
        ],
    );
    Ok(Html(html).into_response())
}

async fn login_page() -> Html<&'static str> {
    Html(LOGIN_TEMPLATE)
}

async fn login_error_page() -> Html<&'static str> {
    Html(LOGIN_ERROR_TEMPLATE)
}

async fn register_page() -> Html<&'static str> {
    Html(REGISTER_TEMPLATE)
}

async fn submit_login(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<Credentials>,
) -> Result<Response, WebError> {
    let account = accounts::authenticate(state.store.as_ref(), &form.username, &form.password).await?;
    let Some(account) = account else {
        info!("failed sign-in for {:?}", form.username.trim());
        return Ok(Redirect::to("/login-error").into_response());
    };
    let sid = state.sessions.create(&account).await;
    info!("user {} signed in", account.username);
    Ok((jar.add(session_cookie(sid)), Redirect::to("/")).into_response())
}

async fn submit_register(
    State(state): State<SharedState>,
    Form(form): Form<Credentials>,
) -> Result<Response, WebError> {
    let registered = accounts::register(
        state.store.as_ref(),
        &form.username,
        &form.password,
        state.bcrypt_cost(),
    )
    .await;
    match registered {
        Ok(_) => Ok(Redirect::to("/login").into_response()),
        Err(AccountError::MissingCredentials) => {
            Ok((StatusCode::BAD_REQUEST, "Username and password are required").into_response())
        }
        Err(AccountError::AlreadyExists) => {
            Ok((StatusCode::CONFLICT, "Username is already taken").into_response())
        }
        Err(err) => Err(err.into()),
    }
}

async fn add_task(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<AddForm>,
) -> Result<Response, WebError> {
    let Some(session) = current_session(&state, &jar).await else {
        return Ok(Redirect::to("/login").into_response());
    };
    match engine::add_item(state.store.as_ref(), session.account_id, &form.text).await {
        Ok(_) => {}
        Err(CommandError::EmptyText) => debug!("ignored empty task from {}", session.username),
        Err(err) => return Err(err.into()),
    }
    Ok(Redirect::to("/").into_response())
}

async fn delete_task(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<DeleteForm>,
) -> Result<Response, WebError> {
    let Some(session) = current_session(&state, &jar).await else {
        return Ok(Redirect::to("/login").into_response());
    };
    let Some(id) = parse_item_id(&form.id) else {
        debug!("ignored delete with bad id {:?} from {}", form.id, session.username);
        return Ok(Redirect::to("/").into_response());
    };
    if !engine::delete_by_id(state.store.as_ref(), session.account_id, id).await? {
        debug!("item {} not found for {}", id, session.username);
    }
    Ok(Redirect::to("/").into_response())
}

async fn edit_task(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<EditForm>,
) -> Result<Response, WebError> {
    let Some(session) = current_session(&state, &jar).await else {
        return Ok(Redirect::to("/login").into_response());
    };
    let Some(id) = parse_item_id(&form.id) else {
        debug!("ignored edit with bad id {:?} from {}", form.id, session.username);
        return Ok(Redirect::to("/").into_response());
    };
    match engine::edit_by_id(state.store.as_ref(), session.account_id, id, &form.text).await {
        Ok(true) => {}
        Ok(false) => debug!("item {} not found for {}", id, session.username),
        Err(CommandError::EmptyText) => debug!("ignored empty edit from {}", session.username),
        Err(err) => return Err(err.into()),
    }
    Ok(Redirect::to("/").into_response())
}

async fn logout(State(state): State<SharedState>, jar: CookieJar) -> Response {
    if let Some(sid) = session_id(&jar) {
        state.sessions.destroy(&sid).await;
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/login")).into_response()
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Page not found")
}

async fn current_session(state: &AppState, jar: &CookieJar) -> Option<Session> {
    let sid = session_id(jar);
    state.sessions.resolve(sid.as_deref()).await
}

fn parse_item_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

pub(super) fn session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_string())
}

fn session_cookie(sid: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, sid))
        .http_only(true)
        .path("/")
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64))
        .build()
}

pub(super) fn render_rows(list: &ItemList) -> String {
    match list {
        ItemList::Empty => {
            r#"<tr><td colspan="3" class="empty">No tasks yet.</td></tr>"#.to_string()
        }
        ItemList::Items(items) => items
            .iter()
            .map(render_row)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn render_row(listed: &ListedItem) -> String {
    let text = escape_html(&listed.item.text);
    format!(
        r#"<tr>
  <td>{position}</td>
  <td>{text}</td>
  <td>
    <form method="POST" action="/edit" style="display: inline;">
      <input type="hidden" name="id" value="{id}">
      <input type="text" name="text" value="{text}" required>
      <button type="submit" class="btn btn-edit">Save</button>
    </form>
    <form method="POST" action="/delete" style="display: inline;">
      <input type="hidden" name="id" value="{id}">
      <button type="submit" class="btn btn-delete">Delete</button>
    </form>
  </td>
</tr>"#,
        position = listed.position,
        text = text,
        id = listed.item.id,
    )
}
