/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! REST API server and resources.

mod http_resources {
    //! API resources

    pub mod increment_resource;
    pub mod latest_resource;
}
mod common {
    //! Common RESP API resources and utils.

    mod api_error_mapper;

    pub use api_error_mapper::*;
}

use actix_web::App;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use actix_web::get;
use actix_web::http::header::ContentType;
use actix_web::web;
use counter_core::CounterService;
use counter_core::conf::AppConfig;
use counter_core::util::ShutdownSignal;
use std::sync::Arc;
use utoipa::OpenApi;

/// Seconds that in-flight requests get to complete once shutdown is requested.
pub const SHUTDOWN_GRACE_PERIOD_SECONDS: u64 = 60;

/// Shared state between requests.
#[derive(Clone)]
struct AppState {
    counter: Arc<CounterService>,
}

/** Run HTTP server until shutdown is signaled.

Once `shutdown` is triggered the server stops accepting connections and gives
in-flight requests [SHUTDOWN_GRACE_PERIOD_SECONDS] to complete.
*/
pub async fn run_http_server(
    app_config: &Arc<AppConfig>,
    counter: &Arc<CounterService>,
    shutdown: &Arc<ShutdownSignal>,
) -> Result<(), Box<dyn core::error::Error>> {
    log::info!(
        "API described by http://{}:{}/openapi.json",
        &app_config.api.bind_address(),
        &app_config.api.bind_port(),
    );
    let app_state = AppState {
        counter: Arc::clone(counter),
    };
    let app_data = web::Data::<AppState>::new(app_state);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_data.clone())
            .configure(configure_services)
    })
    .bind((app_config.api.bind_address(), app_config.api.bind_port()))?
    .disable_signals()
    .shutdown_timeout(SHUTDOWN_GRACE_PERIOD_SECONDS)
    .run();
    let server_handle = server.handle();
    counter.begin_serving();
    let counter = Arc::clone(counter);
    let shutdown = Arc::clone(shutdown);
    tokio::spawn(async move {
        shutdown.wait().await;
        counter.begin_shutdown();
        log::info!(
            "Stopping HTTP server. In-flight requests have {SHUTDOWN_GRACE_PERIOD_SECONDS} seconds to complete."
        );
        server_handle.stop(true).await;
    });
    server.await?;
    Ok(())
}

/// Register all API resources.
fn configure_services(config: &mut web::ServiceConfig) {
    config
        .service(get_openapi)
        .service(http_resources::latest_resource::latest_counter)
        .service(http_resources::increment_resource::increment_counter);
}

/// Serve Open API documentation.
#[get("/openapi.json")]
async fn get_openapi() -> impl Responder {
    HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(openapi_as_string())
}

/// Get the OpenAPI definition as a pretty JSON String.
pub fn openapi_as_string() -> String {
    #[derive(OpenApi)]
    #[openapi(
        // Use Cargo.toml as source for the "info" section
        paths(
            http_resources::latest_resource::latest_counter,
            http_resources::increment_resource::increment_counter,
        )
    )]
    struct ApiDoc;
    ApiDoc::openapi()
        .to_pretty_json()
        .unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use counter_core::counter::CounterStore;
    use counter_core::lockfile::FcntlLockfile;
    use std::fs;
    use tempfile::TempDir;

    fn initialize_env_logger() {
        env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init()
            .map_err(|e| {
                log::trace!("Env logger for testing was probably already initialized: {e:?}")
            })
            .ok();
    }

    /// GET `uri` and return status and body text.
    macro_rules! get_text {
        ($app:expr, $uri:expr) => {{
            let request = test::TestRequest::get().uri($uri).to_request();
            let response = test::call_service(&$app, request).await;
            let status = response.status();
            let body = test::read_body(response).await;
            (status, String::from_utf8(body.to_vec()).unwrap())
        }};
    }

    #[actix_web::test]
    async fn increments_are_persisted_and_failures_roll_back() {
        initialize_env_logger();
        let dir = TempDir::new().unwrap();
        let staging = dir.path().join("staging");
        fs::create_dir(&staging).unwrap();
        let store = CounterStore::new(dir.path().join("counter.txt"), Some(staging.clone()));
        let locker = FcntlLockfile::new(dir.path().join("counter.lock"));
        let counter = CounterService::start(Box::new(locker), store).unwrap();
        let app_data = web::Data::new(AppState {
            counter: Arc::clone(&counter),
        });
        let app =
            test::init_service(App::new().app_data(app_data).configure(configure_services)).await;

        assert_eq!(get_text!(app, "/latest"), (StatusCode::OK, "0".to_owned()));
        assert_eq!(get_text!(app, "/hostname"), (StatusCode::OK, "1".to_owned()));
        assert_eq!(get_text!(app, "/latest"), (StatusCode::OK, "1".to_owned()));
        assert_eq!(counter.store().load().unwrap().get(), 1);

        fs::remove_dir(&staging).unwrap();
        let (status, body) = get_text!(app, "/hostname");
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.contains(&staging.display().to_string()));
        assert_eq!(get_text!(app, "/latest"), (StatusCode::OK, "1".to_owned()));
        assert_eq!(counter.store().load().unwrap().get(), 1);

        counter.release().unwrap();
    }

    #[actix_web::test]
    async fn openapi_describes_counter_resources() {
        let dir = TempDir::new().unwrap();
        let store = CounterStore::new(dir.path().join("counter.txt"), None);
        let locker = FcntlLockfile::new(dir.path().join("counter.lock"));
        let counter = CounterService::start(Box::new(locker), store).unwrap();
        let app_data = web::Data::new(AppState {
            counter: Arc::clone(&counter),
        });
        let app =
            test::init_service(App::new().app_data(app_data).configure(configure_services)).await;

        let (status, body) = get_text!(app, "/openapi.json");

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/latest"));
        assert!(body.contains("/hostname"));
        counter.release().unwrap();
    }
}
