//! End-to-end checks of the HTTP surface: sessions, role gates, and JSON views.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use el_correo::identity::{NewIdentity, PasswordConfig, PasswordHasher};
use el_correo::seed::Seeder;
use el_correo::store::{IdentityRepository, MemoryStore};
use el_correo::web::{router, AppContext};
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

fn hasher() -> Arc<PasswordHasher> {
    Arc::new(PasswordHasher::new(
        SecretString::from("http-surface".to_string()),
        PasswordConfig::low_cost(),
    ))
}

/// Router over a store holding the administrator (`admin`) and HR chief (`leo`) accounts.
async fn app_and_store() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let hasher = hasher();
    Seeder::new(store.clone(), hasher.clone())
        .seed_rrhh()
        .await
        .expect("seeded accounts");
    let app = router(Arc::new(AppContext::new(store.clone(), hasher)));
    (app, store)
}

async fn app() -> Router {
    app_and_store().await.0
}

struct Reply {
    status: StatusCode,
    location: Option<String>,
    session: Option<String>,
    body: Value,
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let session = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    Reply {
        status,
        location,
        session,
        body,
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

fn post(uri: &str, cookie: Option<&str>, payload: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder
        .body(Body::from(payload.to_string()))
        .expect("request")
}

fn post_raw(uri: &str, cookie: Option<&str>, content_type: &str, body: &str) -> Request<Body> {
    let mut builder = Request::post(uri).header(CONTENT_TYPE, content_type);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let reply = send(
        app,
        post(
            "/login",
            None,
            json!({ "username": username, "password": password }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location.as_deref(), Some("/dashboard"));
    reply.session.expect("session cookie")
}

async fn signup(app: &Router, username: &str) -> String {
    let reply = send(
        app,
        post(
            "/signup",
            None,
            json!({
                "username": username,
                "email": format!("{username}@ejemplo.cl"),
                "password1": "Clave-segura-2024",
                "password2": "Clave-segura-2024",
                "nombres": "Camila",
                "apellidos": "Pérez",
                "sexo": "F",
            }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location.as_deref(), Some("/dashboard"));
    reply.session.expect("session cookie")
}

mod sessions {
    use super::*;

    #[tokio::test]
    async fn anonymous_requests_are_sent_to_login() {
        let app = app().await;
        for uri in ["/", "/dashboard", "/perfil", "/trabajadores", "/api/dashboard"] {
            let reply = send(&app, get(uri, None)).await;
            assert_eq!(reply.status, StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(reply.location.as_deref(), Some("/login"), "{uri}");
        }
    }

    #[tokio::test]
    async fn bad_credentials_report_a_form_error() {
        let app = app().await;
        let reply = send(
            &app,
            post("/login", None, json!({ "username": "admin", "password": "nope" })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(reply.body["errors"]["__all__"].is_array());
        assert!(reply.session.is_none());
    }

    #[tokio::test]
    async fn login_then_logout_ends_the_session() {
        let app = app().await;
        let cookie = login(&app, "admin", "admin123").await;

        let root = send(&app, get("/", Some(&cookie))).await;
        assert_eq!(root.location.as_deref(), Some("/dashboard"));

        let dashboard = send(&app, get("/dashboard", Some(&cookie))).await;
        assert_eq!(dashboard.status, StatusCode::OK);
        assert_eq!(dashboard.body["username"], "admin");
        assert_eq!(dashboard.body["total_usuarios"], 2);
        assert_eq!(dashboard.body["can_manage_catalog"], true);

        let logout = send(&app, get("/logout", Some(&cookie))).await;
        assert_eq!(logout.location.as_deref(), Some("/login"));
        assert_eq!(logout.session.as_deref(), Some("sessionid="));

        let after = send(&app, get("/dashboard", Some(&cookie))).await;
        assert_eq!(after.location.as_deref(), Some("/login"));
    }

    #[tokio::test]
    async fn login_accepts_a_urlencoded_form() {
        let app = app().await;
        let reply = send(
            &app,
            post_raw(
                "/login",
                None,
                "application/x-www-form-urlencoded",
                "username=leo&password=leo123",
            ),
        )
        .await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location.as_deref(), Some("/dashboard"));
        let cookie = reply.session.expect("session cookie");

        let dashboard = send(&app, get("/dashboard", Some(&cookie))).await;
        assert_eq!(dashboard.body["username"], "leo");
    }

    #[tokio::test]
    async fn malformed_bodies_are_reported_as_form_errors() {
        let app = app().await;
        let reply = send(
            &app,
            post_raw("/login", None, "application/json", "{not json"),
        )
        .await;
        assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(reply.body["errors"]["__all__"].is_array());
        assert!(reply.session.is_none());
    }

    #[tokio::test]
    async fn misspelled_dashboard_path_redirects() {
        let app = app().await;
        let reply = send(&app, get("/deshboard", None)).await;
        assert_eq!(reply.location.as_deref(), Some("/dashboard"));
    }
}

mod role_gates {
    use super::*;

    #[tokio::test]
    async fn signup_logs_in_and_lands_on_an_own_profile() {
        let app = app().await;
        let cookie = signup(&app, "camila").await;

        let profile = send(&app, get("/perfil", Some(&cookie))).await;
        assert_eq!(profile.status, StatusCode::OK);
        assert_eq!(profile.body["trabajador"]["nombres"], "Camila");
        assert_eq!(profile.body["trabajador"]["sexo"], "F");
        assert_eq!(profile.body["can_view_trabajadores"], false);

        let again = send(&app, get("/signup", Some(&cookie))).await;
        assert_eq!(again.location.as_deref(), Some("/dashboard"));
    }

    #[tokio::test]
    async fn plain_worker_is_turned_away_from_staff_pages() {
        let app = app().await;
        let cookie = signup(&app, "camila").await;

        let listing = send(&app, get("/trabajadores", Some(&cookie))).await;
        assert_eq!(listing.status, StatusCode::SEE_OTHER);
        assert_eq!(listing.location.as_deref(), Some("/perfil"));

        let users = send(&app, get("/lista/", Some(&cookie))).await;
        assert_eq!(users.location.as_deref(), Some("/perfil"));

        let intake = send(&app, get("/trabajadores/nuevo", Some(&cookie))).await;
        assert_eq!(intake.location.as_deref(), Some("/dashboard"));

        let garbage = send(
            &app,
            post_raw(
                "/trabajadores/nuevo",
                Some(&cookie),
                "application/json",
                "{not json",
            ),
        )
        .await;
        assert_eq!(garbage.status, StatusCode::SEE_OTHER);
        assert_eq!(garbage.location.as_deref(), Some("/dashboard"));

        let catalog = send(
            &app,
            post_raw("/cargos", Some(&cookie), "application/json", "{not json"),
        )
        .await;
        assert_eq!(catalog.status, StatusCode::OK);
        assert_eq!(catalog.body["form_status"], "error");
        assert_eq!(
            catalog.body["form_message"],
            "No tiene permisos para gestionar cargos."
        );
    }

    #[tokio::test]
    async fn catalog_writes_need_the_administrator_role() {
        let app = app().await;
        let chief = login(&app, "leo", "leo123").await;
        let refused = send(
            &app,
            post("/areas", Some(&chief), json!({ "action": "create", "nombre": "TI" })),
        )
        .await;
        assert_eq!(refused.status, StatusCode::OK);
        assert_eq!(refused.body["form_status"], "error");
        assert_eq!(refused.body["can_manage_catalog"], false);
        assert_eq!(refused.body["total_count"], 1);

        let admin = login(&app, "admin", "admin123").await;
        let created = send(
            &app,
            post("/areas", Some(&admin), json!({ "action": "create", "nombre": "TI" })),
        )
        .await;
        assert_eq!(created.body["form_status"], "success");
        assert_eq!(created.body["total_count"], 2);

        let repeated = send(&app, post("/areas", Some(&admin), json!({ "nombre": "TI" }))).await;
        assert_eq!(repeated.body["form_status"], "info");
        assert_eq!(repeated.body["total_count"], 2);
    }

    #[tokio::test]
    async fn hr_chief_lists_and_registers_workers() {
        let app = app().await;
        signup(&app, "camila").await;
        let chief = login(&app, "leo", "leo123").await;

        let listing = send(&app, get("/trabajadores?q=sistema&page=abc", Some(&chief))).await;
        assert_eq!(listing.status, StatusCode::OK);
        assert_eq!(listing.body["filtered_count"], 1);
        assert_eq!(listing.body["total_count"], 3);
        assert_eq!(listing.body["page"]["number"], 1);

        let workers = send(&app, get("/api/trabajadores", Some(&chief))).await;
        let names: Vec<&str> = workers.body["trabajadores"]
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|worker| worker["nombre"].as_str())
            .collect();
        assert_eq!(names, vec!["Camila Pérez", "Leo RRHH", "Admin Sistema"]);

        let admin = login(&app, "admin", "admin123").await;
        let created = send(
            &app,
            post(
                "/usuarios/nuevo",
                Some(&admin),
                json!({
                    "username": "nuevo",
                    "email": "nuevo@ejemplo.cl",
                    "password1": "Clave-segura-2024",
                    "password2": "Clave-segura-2024",
                    "group": "Trabajador",
                }),
            ),
        )
        .await;
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.body["usuario"]["username"], "nuevo");
    }

    #[tokio::test]
    async fn intake_accepts_catalog_ids_sent_as_text() {
        let (app, store) = app_and_store().await;
        let identity = store
            .insert_identity(NewIdentity {
                username: "sinficha".to_string(),
                email: "sinficha@ejemplo.cl".to_string(),
                password_hash: String::new(),
                is_superuser: false,
                is_staff: false,
                groups: BTreeSet::new(),
                date_joined: NaiveDate::from_ymd_opt(2024, 4, 1).expect("valid date"),
            })
            .await
            .expect("identity");
        let chief = login(&app, "leo", "leo123").await;

        let page = send(&app, get("/trabajadores/nuevo", Some(&chief))).await;
        let area = page.body["areas"][0]["id"].as_i64().expect("seeded area");

        let created = send(
            &app,
            post(
                "/trabajadores/nuevo",
                Some(&chief),
                json!({
                    "identity": identity.id.0.to_string(),
                    "nombres": "Sin",
                    "apellidos": "Ficha",
                    "sexo": "O",
                    "area": area.to_string(),
                    "departamento": "",
                }),
            ),
        )
        .await;
        assert_eq!(created.status, StatusCode::CREATED);
        assert_eq!(created.body["trabajador"]["area_id"], area);
        assert!(created.body["trabajador"]["departamento_id"].is_null());

        let bogus = send(
            &app,
            post(
                "/trabajadores/nuevo",
                Some(&chief),
                json!({ "nombres": "Sin", "area": "finanzas" }),
            ),
        )
        .await;
        assert_eq!(bogus.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(bogus.body["errors"]["__all__"].is_array());
    }
}
